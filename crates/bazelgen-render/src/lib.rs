//! Rendering of BUILD.bazel files from directory aggregates.
//!
//! A [`BuildFileView`] turns an aggregate into a flat token table, a
//! [`Template`] expands `{{token}}` placeholders, and [`reconcile`] replays
//! preserved hand edits onto the freshly rendered content through a
//! [`bazelgen_editor::BuildFileEditor`].

pub mod labels;
mod preserve;
mod template;
mod view;

pub use preserve::reconcile;
pub use template::Template;
pub use view::{BuildFileView, ViewParams};

/// Template bodies bundled with the generator, used unless the caller
/// supplies replacements.
pub mod templates {
    /// Versioned directory with services: full per-language client targets.
    pub const GAPIC: &str = include_str!("../templates/gapic.tmpl");
    /// Directory with protos but no services: per-language proto targets.
    pub const RAW: &str = include_str!("../templates/raw.tmpl");
    /// Unversioned API root directory: visibility declaration only.
    pub const ROOT: &str = include_str!("../templates/root.tmpl");
}
