//! Conversion of proto import paths to build labels, plus the static
//! per-language dependency remapping tables.
//!
//! Proto imports only name the generated proto targets. Each language's
//! generated library depends on differently named counterparts (or on
//! nothing at all), so the view funnels the normalized import set through
//! the `map_*` functions below before joining them into template tokens.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use bazelgen_core::Transport;
use regex::Regex;

/// Converts a slash separated file path into a build label, merging away
/// the overlap between the end of `package` and the start of `path`.
///
/// A path without a separator refers to a file next to the BUILD file and
/// is returned unchanged. Otherwise the longest package suffix matching a
/// path prefix is dropped from the path and the remaining package segments
/// are prepended, so `v1/library_v1.yaml` seen from `google.example.library.v1`
/// becomes `//google/example/library:library_v1.yaml`.
pub fn convert_path_to_label(package: &str, path: &str) -> String {
    if !path.contains('/') {
        return path.to_string();
    }

    let pkg_tokens: Vec<&str> =
        if package.is_empty() { Vec::new() } else { package.split('.').collect() };
    let path_tokens: Vec<&str> = path.split('/').collect();

    let mut overlap = 0;
    while overlap < pkg_tokens.len() && overlap < path_tokens.len() {
        if path_tokens[overlap] != pkg_tokens[pkg_tokens.len() - overlap - 1] {
            break;
        }
        overlap += 1;
    }

    let mut tokens: Vec<&str> = Vec::new();
    tokens.extend(&pkg_tokens[..pkg_tokens.len() - overlap]);
    tokens.extend(&path_tokens[overlap..]);

    match tokens.split_last() {
        Some((name, dirs)) => format!("//{}:{}", dirs.join("/"), name),
        None => String::new(),
    }
}

/// Import path for a generated Go client package.
///
/// Cloud APIs live under `cloud.google.com/go`; packages already migrated
/// there keep their option path minus the trailing stubs segment, older
/// ones get `/v<N>` rewritten to `/apiv<N>`. Everything else derives the
/// path from the proto package under `google.golang.org`.
pub fn assemble_go_import_path(is_cloud: bool, proto_package: &str, go_package: &str) -> String {
    let is_migrated = go_package.starts_with("cloud.google.com/go/");
    let mut go_pkg = go_package.to_string();
    for prefix in ["google.golang.org/genproto/googleapis/", "cloud.google.com/go/", "cloud/"] {
        go_pkg = go_pkg.replacen(prefix, "", 1);
    }

    if is_cloud && is_migrated {
        let (path, name) = match go_pkg.split_once(';') {
            Some((path, name)) => (path, name),
            None => (go_pkg.as_str(), ""),
        };
        // The option points at the stubs directory and a pb-suffixed
        // package name; the client package is one level up.
        let name = name.strip_suffix("pb").unwrap_or(name);
        let path = path.rsplit_once('/').map_or(path, |(head, _)| head);
        format!("cloud.google.com/go/{path};{name}")
    } else if is_cloud {
        static VERSION_DIR: OnceLock<Regex> = OnceLock::new();
        let re = VERSION_DIR.get_or_init(|| Regex::new(r"/v([a-z0-9]+);").unwrap());
        format!("cloud.google.com/go/{}", re.replace(&go_pkg, "/apiv${1};"))
    } else {
        let name = go_pkg.split(';').nth(1).unwrap_or("");
        format!("google.golang.org/{};{}", proto_package.replace('.', "/"), name)
    }
}

/// Assembly rule name for a directory carrying only proto types, derived
/// from the package with the `google.` head dropped when there is more
/// than one segment behind it: `google.geo.type` becomes `geo-type`,
/// `google.type` stays `google-type`.
pub fn type_only_assembly_name(package: &str) -> String {
    let segments: Vec<&str> = package.split('.').collect();
    if segments.len() >= 3 && segments[0] == "google" {
        segments[1..].join("-")
    } else {
        segments.join("-")
    }
}

fn replace_label_name(label: &str, new_name: &str) -> String {
    static LABEL_NAME: OnceLock<Regex> = OnceLock::new();
    let re = LABEL_NAME.get_or_init(|| Regex::new(r":\w+$").unwrap());
    re.replace(label, new_name).into_owned()
}

fn is_iam_dep(label: &str) -> bool {
    label.ends_with(":iam_policy_proto")
        || label.ends_with(":policy_proto")
        || label.ends_with(":options_proto")
}

/// Proto labels whose Go counterpart does not follow the usual
/// `_proto` -> `_go_proto` renaming, mostly because several protos
/// compile into one Go package.
fn go_proto_dep(label: &str) -> Option<&'static str> {
    static MAPPING: OnceLock<BTreeMap<&'static str, &'static str>> = OnceLock::new();
    let mapping = MAPPING.get_or_init(|| {
        BTreeMap::from([
            // annotations package
            ("//google/api:client_proto", "//google/api:annotations_go_proto"),
            ("//google/api:field_behavior_proto", "//google/api:annotations_go_proto"),
            ("//google/api:field_proto", "//google/api:annotations_go_proto"),
            ("//google/api:http_proto", "//google/api:annotations_go_proto"),
            ("//google/api:resource_proto", "//google/api:annotations_go_proto"),
            ("//google/api:routing_proto", "//google/api:annotations_go_proto"),
            // iam package
            ("//google/iam/v1:iam_policy_proto", "//google/iam/v1:iam_go_proto"),
            ("//google/iam/v1:policy_proto", "//google/iam/v1:iam_go_proto"),
            ("//google/iam/v1:options_proto", "//google/iam/v1:iam_go_proto"),
            // serviceconfig package
            ("//google/api:auth_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:backend_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:billing_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:context_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:control_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:documentation_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:endpoint_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:log_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:logging_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:monitoring_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:policy_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:quota_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:service_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:source_info_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:system_parameter_proto", "//google/api/serviceconfig_go_proto"),
            ("//google/api:usage_proto", "//google/api/serviceconfig_go_proto"),
            // single proto remappings
            ("//google/api:config_change_proto", "//google/api:configchange_go_proto"),
            ("//google/api:monitored_resource_proto", "//google/api:monitoredres_go_proto"),
            ("//google/api:launch_stage_proto", "//google/api:api_go_proto"),
            ("//google/longrunning:operations_proto", "//google/longrunning:longrunning_go_proto"),
            ("//google/type:postal_address_proto", "//google/type:postaladdress_go_proto"),
            ("//google/rpc:error_details_proto", "//google/rpc:errdetails_go_proto"),
        ])
    });
    mapping.get(label).copied()
}

pub fn map_go_proto_deps(proto_imports: &BTreeSet<String>) -> BTreeSet<String> {
    static PROTO_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = PROTO_SUFFIX.get_or_init(|| Regex::new(r"_proto$").unwrap());

    let mut go_imports = BTreeSet::new();
    for import in proto_imports {
        if import.starts_with("@com_google_protobuf//") {
            continue;
        }
        match go_proto_dep(import) {
            Some(mapped) => go_imports.insert(mapped.to_string()),
            None => go_imports.insert(re.replace(import, "_go_proto").into_owned()),
        };
    }
    go_imports
}

pub fn map_go_gapic_deps(proto_imports: &BTreeSet<String>) -> BTreeSet<String> {
    let mut go_imports = BTreeSet::new();
    for import in proto_imports {
        if import.starts_with("@com_google_protobuf//") {
            if import.ends_with(":duration_proto") {
                go_imports.insert("@io_bazel_rules_go//proto/wkt:duration_go_proto".to_string());
            }
            continue;
        }

        if import.ends_with(":operations_proto") {
            go_imports.insert(replace_label_name(import, ":longrunning_go_proto"));
            go_imports.insert("@com_google_cloud_go_longrunning//:go_default_library".to_string());
            go_imports
                .insert("@com_google_cloud_go_longrunning//autogen:go_default_library".to_string());
            // Long-running operation messages embed these well-known types.
            for other in proto_imports {
                if other.starts_with("@com_google_protobuf//") {
                    if other.ends_with(":struct_proto") {
                        go_imports
                            .insert("@io_bazel_rules_go//proto/wkt:struct_go_proto".to_string());
                    } else if other.ends_with(":any_proto") {
                        go_imports.insert("@io_bazel_rules_go//proto/wkt:any_go_proto".to_string());
                    }
                }
            }
        } else if is_iam_dep(import) {
            go_imports.insert(replace_label_name(import, ":iam_go_proto"));
        } else if import.ends_with(":service_proto") {
            go_imports.insert(replace_label_name(import, ":serviceconfig_go_proto"));
        } else if import.ends_with(":httpbody_proto") {
            go_imports.insert(replace_label_name(import, ":httpbody_go_proto"));
        } else if import.ends_with(":monitored_resource_proto") {
            go_imports.insert(replace_label_name(import, ":monitoredres_go_proto"));
        } else if import.ends_with(":metric_proto") {
            go_imports.insert(replace_label_name(import, ":metric_go_proto"));
        } else if import.ends_with(":location_proto") {
            go_imports.insert(replace_label_name(import, ":location_go_proto"));
        } else if import.ends_with(":common_proto") {
            go_imports.insert(replace_label_name(import, ":common_go_proto"));
        }
    }
    go_imports
}

pub fn map_java_gapic_deps(proto_imports: &BTreeSet<String>) -> BTreeSet<String> {
    let mut java_imports = BTreeSet::new();
    for import in proto_imports {
        if is_iam_dep(import) {
            java_imports.insert(replace_label_name(import, ":iam_java_proto"));
        } else if import.starts_with("//google/api:") {
            java_imports.insert(replace_label_name(import, ":api_java_proto"));
        } else if import.ends_with(":location_proto") {
            java_imports.insert("//google/cloud/location:location_java_proto".to_string());
        } else if import.ends_with(":common_proto") {
            java_imports.insert(replace_label_name(import, ":common_java_proto"));
        }
    }
    java_imports
}

pub fn map_java_gapic_test_deps(
    proto_imports: &BTreeSet<String>,
    transport: Transport,
    name: &str,
) -> BTreeSet<String> {
    let mut java_imports = BTreeSet::new();
    if transport.has_grpc() {
        java_imports.insert(format!(":{name}_java_grpc"));
        for import in proto_imports {
            if is_iam_dep(import) {
                java_imports.insert(replace_label_name(import, ":iam_java_grpc"));
            } else if import.ends_with(":location_proto") {
                java_imports.insert("//google/cloud/location:location_java_grpc".to_string());
            }
        }
    }
    java_imports
}

pub fn map_py_gapic_deps(proto_imports: &BTreeSet<String>) -> BTreeSet<String> {
    let mut py_imports = BTreeSet::new();
    for import in proto_imports {
        if is_iam_dep(import) {
            py_imports.insert(replace_label_name(import, ":iam_policy_py_proto"));
        }
    }
    py_imports
}

pub fn java_assembly_deps(transport: Transport, name: &str) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    if transport.has_grpc() {
        deps.insert(format!(":{name}_java_grpc"));
    }
    deps.insert(format!(":{name}_java_gapic"));
    deps.insert(format!(":{name}_java_proto"));
    deps.insert(format!(":{name}_proto"));
    deps
}

/// Names loaded in the Java section's load statement. The `.bzl` file path
/// sorts ahead of the rule names, so the joined set forms the complete
/// argument list of `load()`.
pub fn java_load_statements(transport: Transport) -> BTreeSet<String> {
    let mut loads = BTreeSet::new();
    if transport.has_grpc() {
        loads.insert("java_grpc_library".to_string());
    }
    loads.insert("@com_google_googleapis_imports//:imports.bzl".to_string());
    loads.insert("java_gapic_assembly_gradle_pkg".to_string());
    loads.insert("java_gapic_library".to_string());
    loads.insert("java_gapic_test".to_string());
    loads.insert("java_proto_library".to_string());
    loads
}

pub fn java_grpc_target(name: &str) -> String {
    format!(
        "java_grpc_library(\n    name = \"{name}_java_grpc\",\n    srcs = [\":{name}_proto\"],\n    deps = [\":{name}_java_proto\"],\n)"
    )
}
