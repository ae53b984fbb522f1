use std::collections::{BTreeMap, BTreeSet};

use bazelgen_core::{BazelGenError, Result, Transport};
use bazelgen_model::{ApiVersionedDir, PreservedAttributes};

use crate::labels;

const COMMON_RESOURCES_PROTO: &str = "//google/cloud:common_resources_proto";

/// Per-run knobs the token table depends on.
#[derive(Debug, Clone)]
pub struct ViewParams {
    pub transport: Transport,
    /// Transport came from the command line and beats any transport a
    /// hand-edited java rule recorded.
    pub transport_forced: bool,
    /// Rendered verbatim into `rest_numeric_enums` attributes.
    pub rest_numeric_enums: String,
}

/// Flat substitution table for one directory's BUILD file, plus the
/// preserved hand edits to replay after expansion.
///
/// Built in one pass over the aggregate. A directory without a proto
/// package yields an empty view, which leaves a tokenless template (the
/// API root) untouched.
#[derive(Debug, Default)]
pub struct BuildFileView {
    tokens: BTreeMap<String, String>,
    preserved: PreservedAttributes,
}

impl BuildFileView {
    pub fn tokens(&self) -> &BTreeMap<String, String> {
        &self.tokens
    }

    pub fn preserved(&self) -> &PreservedAttributes {
        &self.preserved
    }

    pub fn build(dir: &ApiVersionedDir, params: &ViewParams) -> Result<Self> {
        let mut view = Self::default();
        let Some(package) = dir.proto_package.as_deref() else {
            return Ok(view);
        };
        let name = dir.name.as_deref().unwrap_or_default();

        view.put("name", name);
        if let Some(assembly_name) = &dir.assembly_name {
            view.put("assembly_name", assembly_name);
        }
        view.put("proto_srcs", join_with_indentation(&dir.protos));
        if let Some(version) = &dir.version {
            view.put("version", version);
        }
        view.put("package", package);

        // A transport preserved from a hand-edited java rule wins over the
        // configured default, but never over an explicit command line value.
        let java_transport = if params.transport_forced {
            params.transport
        } else {
            dir.java_transport_override.unwrap_or(params.transport)
        };

        let pack_prefix = format!("{}/", package.replace('.', "/"));
        let mut actual_imports = BTreeSet::new();
        let mut extra_protos_nodejs = BTreeSet::new();
        for import in &dir.imports {
            if import.strip_prefix(&pack_prefix).is_some_and(|rest| !rest.contains('/')) {
                // Protos of one package share a single proto_library
                // target, so in-package imports are not dependencies.
                continue;
            }

            let import = import.replace(".proto", "_proto");
            let label = if let Some(rest) = import.strip_prefix("google/protobuf/") {
                format!("@com_google_protobuf//:{rest}")
            } else if import == "google/cloud/common/operation_metadata_proto" {
                let label = "//google/cloud/common:common_proto".to_string();
                extra_protos_nodejs.insert(label.clone());
                label
            } else {
                labels::convert_path_to_label("", &import)
            };
            actual_imports.insert(label);
        }

        let mut extra_imports = BTreeSet::new();
        extra_imports.insert(COMMON_RESOURCES_PROTO.to_string());
        if dir.has_locations && package != "google.cloud.location" {
            extra_imports.insert("//google/cloud/location:location_proto".to_string());
        }
        if dir.has_iam_policy && package != "google.iam.v1" {
            extra_imports.insert("//google/iam/v1:iam_policy_proto".to_string());
        }
        if dir.has_lro && package != "google.longrunning" {
            // Declared mixins usually come with a proto-level dependency
            // already; when they do not, pretend the protos imported it.
            actual_imports.insert("//google/longrunning:operations_proto".to_string());
        }
        view.put("extra_imports", join_with_indentation(&extra_imports));
        view.put("proto_deps", join_with_indentation(&actual_imports));
        view.put("extra_protos_nodejs", join_with_indentation_nl(&extra_protos_nodejs));

        let go_package = dir.lang_proto_packages.get("go").ok_or_else(|| {
            BazelGenError::MissingGoPackage { package: package.to_string() }
        })?;
        view.put("go_proto_importpath", go_package.split(';').next().unwrap_or(""));
        view.put("go_proto_deps", join_with_indentation(&labels::map_go_proto_deps(&actual_imports)));

        // Only the proto_library_with_info target wants common resources.
        extra_imports.remove(COMMON_RESOURCES_PROTO);

        view.preserved = dir.preserved.clone();

        if dir.services.is_empty() {
            view.put("type_only_assembly_name", labels::type_only_assembly_name(package));
            let csharp_namespace = dir.lang_proto_packages.get("csharp").ok_or_else(|| {
                BazelGenError::MissingCsharpNamespace { package: package.to_string() }
            })?;
            view.put("csharp_namespace", csharp_namespace);
            return Ok(view);
        }

        view.put("grpc_service_config", quoted_label_or_none(package, dir.grpc_service_config.as_deref()));
        view.put("service_yaml", quoted_label_or_none(package, dir.service_yaml.as_deref()));
        // The gapic yaml only exists for legacy overrides; an empty path
        // counts as absent.
        let gapic_yaml = dir.gapic_yaml.as_deref().filter(|p| !p.is_empty());
        view.put("gapic_yaml", quoted_label_or_none(package, gapic_yaml));

        let mut java_tests = BTreeSet::new();
        for service in &dir.services {
            // The gapic yaml override predates protobuf options and wins
            // over them where both exist.
            let java_package = dir
                .lang_gapic_packages
                .get("java")
                .or_else(|| dir.lang_proto_packages.get("java"));
            let Some(java_package) = java_package else {
                continue;
            };

            let service = dir
                .lang_gapic_name_overrides
                .get("java")
                .and_then(|renames| renames.get(&format!("{package}.{service}")))
                .unwrap_or(service);

            if java_transport.has_grpc() || java_transport == Transport::Rest {
                java_tests.insert(format!("{java_package}.{service}ClientTest"));
            }
            // With both transports the rest tests carry the transport name.
            if java_transport.has_grpc() && java_transport.has_rest() {
                java_tests.insert(format!("{java_package}.{service}ClientHttpJsonTest"));
            }
        }

        actual_imports.extend(extra_imports.iter().cloned());

        view.put("java_tests", join_with_indentation(&java_tests));
        view.put(
            "java_gapic_deps",
            join_with_indentation_nl(&labels::map_java_gapic_deps(&actual_imports)),
        );
        view.put(
            "java_gapic_test_deps",
            join_with_indentation(&labels::map_java_gapic_test_deps(
                &actual_imports,
                java_transport,
                name,
            )),
        );
        view.put(
            "java_gapic_assembly_gradle_pkg_deps",
            join_with_indentation(&labels::java_assembly_deps(java_transport, name)),
        );
        view.put(
            "java_loads",
            join_with_custom_indentation(&labels::java_load_statements(java_transport), 4),
        );
        view.put("java_transport", format!("\"{java_transport}\""));
        view.put(
            "java_grpc",
            if java_transport.has_grpc() { labels::java_grpc_target(name) } else { String::new() },
        );

        let is_cloud = dir.cloud_scope || package.contains("cloud");
        let go_import = labels::assemble_go_import_path(is_cloud, package, go_package);
        view.put("go_gapic_test_importpath", go_import.split(';').next().unwrap_or(""));
        view.put("go_gapic_importpath", go_import);
        view.put(
            "go_gapic_deps",
            join_with_indentation_nl(&labels::map_go_gapic_deps(&actual_imports)),
        );

        view.put("py_gapic_deps", join_with_indentation(&labels::map_py_gapic_deps(&actual_imports)));

        view.put("transport", format!("\"{}\"", params.transport));
        view.put("rest_numeric_enums", params.rest_numeric_enums.as_str());
        view.put("csharp_proto_extra_opts", "");

        Ok(view)
    }

    fn put(&mut self, key: &str, value: impl Into<String>) {
        self.tokens.insert(key.to_string(), value.into());
    }
}

fn quoted_label_or_none(package: &str, path: Option<&str>) -> String {
    match path {
        // Quoted here because the template cannot carry the quotes: the
        // absent case renders the bare builtin None.
        Some(path) => format!("\"{}\"", labels::convert_path_to_label(package, path)),
        None => "None".to_string(),
    }
}

fn join_with_indentation(items: &BTreeSet<String>) -> String {
    if items.is_empty() {
        return String::new();
    }
    let joined = items.iter().map(String::as_str).collect::<Vec<_>>().join("\",\n        \"");
    format!("\"{joined}\",")
}

fn join_with_indentation_nl(items: &BTreeSet<String>) -> String {
    let joined = join_with_indentation(items);
    if joined.is_empty() {
        joined
    } else {
        format!("\n        {joined}")
    }
}

fn join_with_custom_indentation(items: &BTreeSet<String>, spaces: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let indent = " ".repeat(spaces);
    let joined =
        items.iter().map(String::as_str).collect::<Vec<_>>().join(&format!("\",\n{indent}\""));
    format!("{indent}\"{joined}\",")
}
