use std::sync::OnceLock;

use regex::Regex;

const CLOUD_AUTH_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const LOCATIONS_MIXIN: &str = "name: google.cloud.location.Locations";
const IAM_POLICY_MIXIN: &str = "name: google.iam.v1.IAMPolicy";
const LRO_MIXIN: &str = "name: google.longrunning.Operations";

/// True for a GAPIC codegen config (`type: com.google.api.codegen.ConfigProto`).
pub fn is_gapic_config(body: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?m)^type\s*:\s*com\.google\.api\.codegen\.ConfigProto\s*$").unwrap()
    });
    re.is_match(body)
}

/// True for a service definition (`type: google.api.Service`).
pub fn is_service_config(body: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^type\s*:\s*google\.api\.Service\s*$").unwrap());
    re.is_match(body)
}

/// API version embedded in a service yaml file name, such as the `v1` in
/// `library_example_v1.yaml`. Versionless names yield `None`.
pub fn service_config_version(file_name: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"_(?P<version>[a-zA-Z]+\d+\w*)\.yaml").unwrap());
    re.captures(file_name).map(|c| c["version"].to_string())
}

/// Service behaviors a service yaml advertises that influence generated deps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfigMarkers {
    pub cloud_scope: bool,
    pub has_locations: bool,
    pub has_iam_policy: bool,
    pub has_lro: bool,
}

pub fn service_config_markers(body: &str) -> ServiceConfigMarkers {
    ServiceConfigMarkers {
        cloud_scope: body.contains(CLOUD_AUTH_SCOPE),
        has_locations: body.contains(LOCATIONS_MIXIN),
        has_iam_policy: body.contains(IAM_POLICY_MIXIN),
        has_lro: body.contains(LRO_MIXIN),
    }
}

/// One `language_settings` entry from a GAPIC codegen config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapicLangPackage {
    pub lang: String,
    pub package: String,
    /// `full.proto.Interface -> ShortName` rename pairs, in document order.
    pub interface_names: Vec<(String, String)>,
}

/// Per-language package names and interface renames from a GAPIC codegen
/// config. Line matching, not a yaml parser; it reads the two-level
/// `lang: / package_name: / interface_names:` shape and nothing else.
pub fn gapic_lang_packages(body: &str) -> Vec<GapicLangPackage> {
    static LANG_RE: OnceLock<Regex> = OnceLock::new();
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let lang_re = LANG_RE.get_or_init(|| {
        Regex::new(
            r"(?m)\b(?P<lang>java|python|go|csharp|ruby|php|nodejs)\s*:\s*$\s+package_name\s*:\s*(?P<package>[\w./:\\]*)\s*$\s+(?:interface_names:(?P<interface_names>(?:\s*$\s+\w+\.[\w.]*\s*:\s*\w+\s*$)*))?",
        )
        .unwrap()
    });
    let name_re =
        NAME_RE.get_or_init(|| Regex::new(r"\s*(?P<name>[\w.]*)\s*:\s*(?P<short>\w+)\s*").unwrap());

    lang_re
        .captures_iter(body)
        .map(|c| {
            let interface_names = c
                .name("interface_names")
                .map(|block| {
                    name_re
                        .captures_iter(block.as_str())
                        .map(|n| (n["name"].to_string(), n["short"].to_string()))
                        .collect()
                })
                .unwrap_or_default();
            GapicLangPackage {
                lang: c["lang"].to_string(),
                package: c["package"].to_string(),
                interface_names,
            }
        })
        .collect()
}
