use std::collections::BTreeMap;

use bazelgen_extract::yaml;

/// Aggregate for an unversioned API directory such as `google/example/library`.
///
/// Versioned service yamls often live here rather than next to the protos,
/// so everything is keyed by the version read from the file name
/// (`library_example_v1.yaml` files under `""` when versionless) and handed
/// down to versioned child directories after the read pass.
#[derive(Debug, Default)]
pub struct ApiDir {
    pub service_yaml_paths: BTreeMap<String, String>,
    pub cloud_scopes: BTreeMap<String, bool>,
    pub locations_mixins: BTreeMap<String, bool>,
    pub iam_policy_mixins: BTreeMap<String, bool>,
}

impl ApiDir {
    pub fn parse_yaml_file(&mut self, file_name: &str, body: &str) {
        if !yaml::is_service_config(body) {
            return;
        }
        let version = yaml::service_config_version(file_name).unwrap_or_default();
        self.service_yaml_paths.insert(version.clone(), file_name.to_string());

        let markers = yaml::service_config_markers(body);
        if markers.cloud_scope {
            self.cloud_scopes.insert(version.clone(), true);
        }
        if markers.has_locations {
            self.locations_mixins.insert(version.clone(), true);
        }
        if markers.has_iam_policy {
            self.iam_policy_mixins.insert(version, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE_YAML: &str = r#"type: google.api.Service
name: library-example.googleapis.com
apis:
- name: google.cloud.location.Locations
authentication:
  rules:
  - oauth:
      canonical_scopes: https://www.googleapis.com/auth/cloud-platform
"#;

    #[test]
    fn keys_records_by_file_name_version() {
        let mut dir = ApiDir::default();
        dir.parse_yaml_file("library_example_v1.yaml", SERVICE_YAML);

        assert_eq!(
            dir.service_yaml_paths.get("v1").map(String::as_str),
            Some("library_example_v1.yaml")
        );
        assert_eq!(dir.cloud_scopes.get("v1"), Some(&true));
        assert_eq!(dir.locations_mixins.get("v1"), Some(&true));
        assert!(dir.iam_policy_mixins.is_empty());
    }

    #[test]
    fn versionless_file_names_use_empty_key() {
        let mut dir = ApiDir::default();
        dir.parse_yaml_file("library.yaml", "type: google.api.Service\n");

        assert_eq!(dir.service_yaml_paths.get("").map(String::as_str), Some("library.yaml"));
        assert!(dir.cloud_scopes.is_empty());
    }

    #[test]
    fn ignores_non_service_yamls() {
        let mut dir = ApiDir::default();
        dir.parse_yaml_file("library_gapic.yaml", "type: com.google.api.codegen.ConfigProto\n");
        assert!(dir.service_yaml_paths.is_empty());
    }
}
