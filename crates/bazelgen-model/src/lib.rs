//! Per-directory aggregates built up during the read pass over an API
//! source tree. [`ApiDir`] summarizes an unversioned API directory,
//! [`ApiVersionedDir`] a versioned one (`.../library/v1`). The write pass
//! renders BUILD files from these and nothing else.

use std::collections::BTreeMap;

mod api_dir;
mod versioned_dir;

pub use api_dir::ApiDir;
pub use versioned_dir::ApiVersionedDir;

/// String attributes of `*_gapic_library` rules that survive regeneration.
pub const PRESERVED_STRING_ATTRIBUTES: &[&str] = &[
    "package_name",
    "transport",
    "main_service",
    "bundle_config",
    "iam_service",
    "mixins",
    "ruby_cloud_title",
    "ruby_cloud_description",
    "generate_nongapic_package",
];

/// Non-string attributes that survive regeneration, with the value recorded
/// when the rule exists but the attribute is absent.
pub const PRESERVED_NONSTRING_ATTRIBUTES: &[(&str, &str)] = &[("rest_numeric_enums", "False")];

/// List attributes that survive regeneration as a whole.
pub const PRESERVED_LIST_ATTRIBUTES: &[&str] =
    &["extra_protoc_parameters", "extra_protoc_file_parameters", "opt_args"];

/// Package segments too generic to qualify an assembly name.
pub const GENERIC_TOP_SEGMENTS: &[&str] = &["google", "cloud"];

/// Hand-edited build file state carried across a regeneration.
///
/// The first three maps are keyed by rule name, then attribute name.
/// `assembly_names` maps a `*_gapic_assembly_*` rule kind to the name the
/// rule should keep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreservedAttributes {
    pub string_attrs: BTreeMap<String, BTreeMap<String, String>>,
    pub nonstring_attrs: BTreeMap<String, BTreeMap<String, String>>,
    pub list_attrs: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub assembly_names: BTreeMap<String, String>,
}

impl PreservedAttributes {
    pub fn is_empty(&self) -> bool {
        self.string_attrs.is_empty()
            && self.nonstring_attrs.is_empty()
            && self.list_attrs.is_empty()
            && self.assembly_names.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
