//! Pulls the handful of fields BUILD file generation needs out of `.proto`,
//! `.yaml`, and `.json` sources with anchored line patterns. This is not a
//! grammar parser for any of those languages and does not try to be one.

pub mod json;
pub mod proto;
pub mod yaml;
