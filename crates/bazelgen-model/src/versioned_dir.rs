use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use bazelgen_core::{BazelGenError, Result, Transport};
use bazelgen_editor::BuildFileEditor;
use bazelgen_extract::{json, proto, yaml};

use crate::{
    ApiDir, PreservedAttributes, GENERIC_TOP_SEGMENTS, PRESERVED_LIST_ATTRIBUTES,
    PRESERVED_NONSTRING_ATTRIBUTES, PRESERVED_STRING_ATTRIBUTES,
};

/// Aggregate for a versioned API directory such as `google/example/library/v1`.
///
/// The read pass feeds every file of the directory through one of the
/// `parse_*` methods; the collected state is all the write pass needs to
/// render the directory's BUILD file.
#[derive(Debug, Default)]
pub struct ApiVersionedDir {
    /// Proto package shared by the directory's protos, e.g.
    /// `google.example.library.v1`.
    pub proto_package: Option<String>,
    /// Short API name inferred from the package, e.g. `library`.
    pub name: Option<String>,
    /// Name used in assembly rule names. Differs from `name` for sub-APIs:
    /// `google.example.library.admin.v1` yields `library-admin`.
    pub assembly_name: Option<String>,
    /// Version segment of the package, e.g. `v1`.
    pub version: Option<String>,

    /// Proto file names seen in this directory.
    pub protos: BTreeSet<String>,
    /// Import paths collected from all protos.
    pub imports: BTreeSet<String>,
    /// Declared service names collected from all protos.
    pub services: BTreeSet<String>,

    /// Language -> package option from proto files (first file wins).
    pub lang_proto_packages: BTreeMap<String, String>,
    /// Language -> package name from a GAPIC codegen config.
    pub lang_gapic_packages: BTreeMap<String, String>,
    /// Language -> interface renames from a GAPIC codegen config.
    pub lang_gapic_name_overrides: BTreeMap<String, BTreeMap<String, String>>,

    pub service_yaml: Option<String>,
    pub gapic_yaml: Option<String>,
    pub grpc_service_config: Option<String>,

    pub cloud_scope: bool,
    pub has_locations: bool,
    pub has_iam_policy: bool,
    pub has_lro: bool,

    /// Transport a hand-edited `java_gapic_library` rule asked for.
    pub java_transport_override: Option<Transport>,
    pub preserved: PreservedAttributes,
}

impl ApiVersionedDir {
    pub fn parse_proto_file(&mut self, file_name: &str, body: &str) {
        self.protos.insert(file_name.to_string());

        // Inference stops once package, name, and version are all known, so
        // the first versioned proto in the directory settles them.
        if self.proto_package.is_none() || self.name.is_none() || self.version.is_none() {
            if let Some(package) = proto::package(body) {
                self.infer_from_package(&package);
            }
        }

        for import in proto::imports(body) {
            self.imports.insert(import);
        }
        for (lang, value) in proto::lang_options(body) {
            self.lang_proto_packages.entry(lang).or_insert(value);
        }
        for service in proto::services(body) {
            self.services.insert(service);
        }
    }

    fn infer_from_package(&mut self, package: &str) {
        let segments: Vec<&str> = package.split('.').collect();
        self.proto_package = Some(package.to_string());

        if self.name.is_none() {
            if let Some(last) = segments.last() {
                self.name = Some((*last).to_string());
                self.assembly_name = self.name.clone();
            }
        }

        // The last segment counts as a version when it looks like v1, v2beta1
        // and so on. The segment before it is the API name, and for sub-APIs
        // (at least three segments with a non-generic head before the name)
        // the assembly name is qualified with it.
        if segments.len() >= 2 {
            let candidate = segments[segments.len() - 1];
            if is_version_segment(candidate) {
                let name = segments[segments.len() - 2];
                self.version = Some(candidate.to_string());
                self.name = Some(name.to_string());
                self.assembly_name = Some(name.to_string());
                if segments.len() >= 3 {
                    let top = segments[segments.len() - 3];
                    if !GENERIC_TOP_SEGMENTS.contains(&top) {
                        self.assembly_name = Some(format!("{top}-{name}"));
                    }
                }
            }
        }
    }

    /// Dispatches a yaml file to either the GAPIC codegen config or the
    /// service config fields. The first file of each kind wins; later
    /// matches are ignored.
    pub fn parse_yaml_file(&mut self, file_name: &str, body: &str) {
        if yaml::is_gapic_config(body) {
            if self.gapic_yaml.is_some() {
                return;
            }
            self.gapic_yaml = Some(file_name.to_string());
            for lang in yaml::gapic_lang_packages(body) {
                self.lang_gapic_packages.insert(lang.lang.clone(), lang.package);
                self.lang_gapic_name_overrides
                    .insert(lang.lang, lang.interface_names.into_iter().collect());
            }
            return;
        }

        if yaml::is_service_config(body) {
            if self.service_yaml.is_some() {
                return;
            }
            self.service_yaml = Some(file_name.to_string());
            let markers = yaml::service_config_markers(body);
            self.cloud_scope = markers.cloud_scope;
            if markers.has_locations {
                self.has_locations = true;
            }
            if markers.has_iam_policy {
                self.has_iam_policy = true;
            }
            if markers.has_lro {
                self.has_lro = true;
            }
        }
    }

    pub fn parse_json_file(&mut self, file_name: &str, body: &str) {
        if self.grpc_service_config.is_none() && json::is_grpc_service_config(body) {
            self.grpc_service_config = Some(file_name.to_string());
        }
    }

    /// Reads the attributes worth keeping out of an existing BUILD file.
    ///
    /// Editor and I/O failures are not fatal: the directory regenerates
    /// from scratch with empty preservation state. A duplicated assembly
    /// rule kind is fatal because renames could no longer be applied
    /// unambiguously.
    pub fn parse_build_file(&mut self, file: &Path, editor: &dyn BuildFileEditor) -> Result<()> {
        match self.extract_preserved(file, editor) {
            Ok(()) => Ok(()),
            Err(err) => {
                let fatal = err
                    .downcast_ref::<BazelGenError>()
                    .is_some_and(|e| matches!(e, BazelGenError::DuplicateAssemblyRule { .. }));
                if fatal {
                    return Err(err);
                }
                tracing::warn!(file = %file.display(), error = %err, "could not read preserved attributes");
                eprintln!("Error parsing BUILD.bazel file in {}: {err}", file.display());
                self.preserved.clear();
                Ok(())
            }
        }
    }

    fn extract_preserved(&mut self, file: &Path, editor: &dyn BuildFileEditor) -> Result<()> {
        for rule in editor.list_rules(file)? {
            if rule.kind.contains("_gapic_assembly_") {
                if self.preserved.assembly_names.contains_key(&rule.kind) {
                    return Err(BazelGenError::DuplicateAssemblyRule {
                        kind: rule.kind,
                        file: file.to_path_buf(),
                    }
                    .into());
                }
                self.preserved.assembly_names.insert(rule.kind, rule.name);
            } else if rule.kind.ends_with("_gapic_library") {
                let mut strings = BTreeMap::new();
                for attr in PRESERVED_STRING_ATTRIBUTES {
                    if let Some(value) = editor.get_attribute(file, &rule.name, attr)? {
                        strings.insert((*attr).to_string(), value);
                    }
                }

                let mut nonstrings = BTreeMap::new();
                for (attr, absent_value) in PRESERVED_NONSTRING_ATTRIBUTES {
                    let value = editor
                        .get_attribute(file, &rule.name, attr)?
                        .unwrap_or_else(|| (*absent_value).to_string());
                    nonstrings.insert((*attr).to_string(), value);
                }

                let mut lists = BTreeMap::new();
                for attr in PRESERVED_LIST_ATTRIBUTES {
                    if let Some(value) = editor.get_attribute(file, &rule.name, attr)? {
                        if let Some(inner) =
                            value.strip_prefix('[').and_then(|rest| rest.strip_suffix(']'))
                        {
                            let elements: Vec<String> = inner
                                .split(' ')
                                .filter(|e| !e.is_empty())
                                .map(str::to_string)
                                .collect();
                            lists.insert((*attr).to_string(), elements);
                        }
                    }
                }

                if rule.kind == "java_gapic_library" {
                    if let Some(transport) = strings.get("transport") {
                        match transport.parse::<Transport>() {
                            Ok(parsed) => self.java_transport_override = Some(parsed),
                            Err(err) => {
                                tracing::warn!(rule = %rule.name, error = %err, "ignoring unparseable transport")
                            }
                        }
                    }
                }

                if !strings.is_empty() {
                    self.preserved.string_attrs.insert(rule.name.clone(), strings);
                }
                if !nonstrings.is_empty() {
                    self.preserved.nonstring_attrs.insert(rule.name.clone(), nonstrings);
                }
                if !lists.is_empty() {
                    self.preserved.list_attrs.insert(rule.name, lists);
                }
            }
        }
        Ok(())
    }

    /// Pulls the service yaml recorded for this version, plus its behavior
    /// flags, down from the parent directory. A directory that carries its
    /// own service yaml keeps it.
    pub fn inherit_from_parent(&mut self, parent: &ApiDir) {
        if self.service_yaml.is_some() {
            return;
        }

        let top_yaml = self
            .version
            .as_deref()
            .and_then(|v| parent.service_yaml_paths.get(v))
            .or_else(|| parent.service_yaml_paths.get(""));
        if let (Some(yaml), Some(version)) = (top_yaml, self.version.as_deref()) {
            // Recorded relative to this directory; the label conversion
            // folds the version segment back into the parent package path.
            self.service_yaml = Some(format!("{version}/{yaml}"));
        }

        if let Some(version) = self.version.as_deref() {
            if parent.cloud_scopes.get(version).copied().unwrap_or(false) {
                self.cloud_scope = true;
            }
            if parent.locations_mixins.get(version).copied().unwrap_or(false) {
                self.has_locations = true;
            }
            if parent.iam_policy_mixins.get(version).copied().unwrap_or(false) {
                self.has_iam_policy = true;
            }
        }
    }
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit())
}
