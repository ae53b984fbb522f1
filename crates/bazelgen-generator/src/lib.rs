//! The generation drive: two passes over an API proto source tree.
//!
//! The read pass walks the tree top-down and summarizes every directory
//! into [`bazelgen_model`] aggregates, including the attributes preserved
//! from existing BUILD.bazel files. The write pass walks bottom-up, picks
//! a template per directory (full GAPIC targets, raw proto targets, or the
//! API root stub), expands it, replays preserved edits, and writes the
//! result under the destination root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bazelgen_core::{BazelGenError, Result, Transport};
use bazelgen_editor::BuildFileEditor;
use bazelgen_model::{ApiDir, ApiVersionedDir};
use bazelgen_render::{reconcile, templates, BuildFileView, Template, ViewParams};
use serde::Serialize;
use walkdir::WalkDir;

/// Template bodies for the three directory shapes a tree can contain.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub gapic: String,
    pub root: String,
    pub raw: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            gapic: templates::GAPIC.to_string(),
            root: templates::ROOT.to_string(),
            raw: templates::RAW.to_string(),
        }
    }
}

/// Everything one generation run needs to know.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root of the proto source tree to scan.
    pub src: PathBuf,
    /// Root the generated files land under. Usually equal to `src`.
    pub dest: PathBuf,
    /// Regenerate from scratch instead of preserving hand edits found in
    /// existing BUILD.bazel files.
    pub overwrite: bool,
    pub transport: Transport,
    /// True when the transport was given explicitly, in which case it also
    /// overrides a transport preserved from a hand-edited java rule.
    pub transport_forced: bool,
    /// Written verbatim into `rest_numeric_enums` attributes.
    pub rest_numeric_enums: String,
    pub templates: TemplateSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Written,
    /// An API root BUILD file already existed and was left alone.
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    /// Template the directory selected: `GAPIC_VERSIONED`, `RAW`, or
    /// `API_ROOT`.
    pub template: &'static str,
    pub status: FileStatus,
}

/// Tally of one generation run.
#[derive(Debug, Default, Serialize)]
pub struct GenerateSummary {
    pub scanned: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<GeneratedFile>,
}

/// Runs both passes and writes the generated BUILD.bazel files.
///
/// The editor is required unless `overwrite` is set: without it existing
/// hand edits could not be read back or replayed. Missing language options
/// in the protos surface as errors and stop the run; a directory whose
/// existing BUILD file cannot be parsed merely regenerates from scratch.
pub fn generate(
    opts: &GenerateOptions,
    mut editor: Option<&mut dyn BuildFileEditor>,
) -> Result<GenerateSummary> {
    if !opts.overwrite && editor.is_none() {
        return Err(BazelGenError::EditorRequired.into());
    }

    let mut summary = GenerateSummary::default();
    let mut api_dirs: BTreeMap<PathBuf, ApiDir> = BTreeMap::new();
    let mut versioned_dirs: BTreeMap<PathBuf, ApiVersionedDir> = BTreeMap::new();

    println!("\n\n========== READING INPUT DIRECTORY ==========");
    for entry in WalkDir::new(&opts.src).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            println!("Scan Directory: {}", path.display());
            api_dirs.insert(path.to_path_buf(), ApiDir::default());
            versioned_dirs.insert(path.to_path_buf(), ApiVersionedDir::default());
            summary.scanned += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(parent) = path.parent() else {
            continue;
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".yaml") && !name.ends_with(".legacy.yaml") {
            println!("    Read File: {}", path.display());
            let body = read_lossy(path)?;
            if let Some(api_dir) = api_dirs.get_mut(parent) {
                api_dir.parse_yaml_file(&name, &body);
            }
            if let Some(dir) = versioned_dirs.get_mut(parent) {
                dir.parse_yaml_file(&name, &body);
            }
        } else if name.ends_with(".proto") {
            println!("    Read File: {}", path.display());
            let body = read_lossy(path)?;
            if let Some(dir) = versioned_dirs.get_mut(parent) {
                dir.parse_proto_file(&name, &body);
            }
        } else if name.ends_with(".bazel") {
            if !opts.overwrite {
                println!("    Read File: {}", path.display());
                if let (Some(dir), Some(editor)) = (versioned_dirs.get_mut(parent), editor.as_deref())
                {
                    dir.parse_build_file(path, editor)?;
                }
            }
        } else if name.ends_with(".json") {
            println!("    Read File: {}", path.display());
            let body = read_lossy(path)?;
            if let Some(dir) = versioned_dirs.get_mut(parent) {
                dir.parse_json_file(&name, &body);
            }
        }
    }

    let gapic = Template::new(opts.templates.gapic.as_str());
    let root = Template::new(opts.templates.root.as_str());
    let raw = Template::new(opts.templates.raw.as_str());
    let params = ViewParams {
        transport: opts.transport,
        transport_forced: opts.transport_forced,
        rest_numeric_enums: opts.rest_numeric_enums.clone(),
    };

    println!("\n\n========== WRITING GENERATED FILES ==========");
    for entry in WalkDir::new(&opts.src).sort_by_file_name().contents_first(true) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        let Some(versioned) = versioned_dirs.get_mut(dir) else {
            continue;
        };

        // Directories with a proto package get per-language targets, full
        // GAPIC ones when a service is declared. A directory without protos
        // but with a service yaml is the API root.
        let (template, label) = if versioned.proto_package.is_some() {
            if !versioned.services.is_empty() {
                if let Some(parent) = dir.parent().and_then(|p| api_dirs.get(p)) {
                    versioned.inherit_from_parent(parent);
                }
                (&gapic, "GAPIC_VERSIONED")
            } else if !versioned.lang_proto_packages.is_empty() {
                (&raw, "RAW")
            } else {
                continue;
            }
        } else if versioned.service_yaml.is_some() {
            (&root, "API_ROOT")
        } else {
            continue;
        };

        let out_dir = opts.dest.join(dir.strip_prefix(&opts.src)?);
        let out_file = out_dir.join("BUILD.bazel");

        let view = BuildFileView::build(versioned, &params)?;
        let mut content = template.expand(view.tokens());
        if !view.preserved().is_empty() {
            let Some(editor) = editor.as_deref_mut() else {
                return Err(BazelGenError::EditorRequired.into());
            };
            content = match reconcile(&content, view.preserved(), editor) {
                Ok(reconciled) => reconciled,
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), error = %err, "could not replay preserved edits");
                    eprintln!("Error applying preserved attributes in {}: {err}", dir.display());
                    summary.failed += 1;
                    summary.files.push(GeneratedFile {
                        path: out_file,
                        template: label,
                        status: FileStatus::Failed,
                    });
                    continue;
                }
            };
        }

        if let Err(err) = fs::create_dir_all(&out_dir) {
            tracing::warn!(dir = %out_dir.display(), error = %err, "could not create output directory");
            println!("WARNING: Could not create directory: {}", out_dir.display());
            summary.failed += 1;
            summary.files.push(GeneratedFile {
                path: out_file,
                template: label,
                status: FileStatus::Failed,
            });
            continue;
        }

        // Root BUILD files are commonly extended by hand, so an existing
        // one is only replaced when overwriting.
        if label == "API_ROOT" && !opts.overwrite && out_file.exists() {
            summary.skipped += 1;
            summary.files.push(GeneratedFile {
                path: out_file,
                template: label,
                status: FileStatus::Skipped,
            });
            continue;
        }

        println!("Write File [{}]: {}", label, out_file.display());
        fs::write(&out_file, &content)?;
        summary.written += 1;
        summary.files.push(GeneratedFile {
            path: out_file,
            template: label,
            status: FileStatus::Written,
        });
    }

    println!("\nBUILD.bazel file generation completed successfully\n");
    Ok(summary)
}

fn read_lossy(path: &Path) -> Result<String> {
    Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazelgen_editor::FakeEditor;

    const LIBRARY_PROTO: &str = r#"syntax = "proto3";

package google.example.library.v1;

import "google/api/annotations.proto";

option csharp_namespace = "Google.Example.Library.V1";
option go_package = "google.golang.org/genproto/googleapis/example/library/v1;library";
option java_package = "com.google.example.library.v1";

service LibraryService {
  rpc GetBook(GetBookRequest) returns (Book) {
  }
}
"#;

    const SERVICE_YAML: &str = r#"type: google.api.Service
config_version: 3
name: library-example.googleapis.com
title: Example Library API

apis:
- name: google.example.library.v1.LibraryService
- name: google.cloud.location.Locations
- name: google.iam.v1.IAMPolicy
- name: google.longrunning.Operations

authentication:
  rules:
  - selector: '*'
    oauth:
      canonical_scopes: |-
        https://www.googleapis.com/auth/cloud-platform
"#;

    const GRPC_SERVICE_CONFIG: &str = r#"{
  "methodConfig": [
    {
      "name": [{ "service": "google.example.library.v1.LibraryService" }],
      "timeout": "60s"
    }
  ]
}
"#;

    const COLOR_PROTO: &str = r#"syntax = "proto3";

package google.type;

import "google/protobuf/wrappers.proto";

option csharp_namespace = "Google.Type";
option go_package = "google.golang.org/genproto/googleapis/type/color;color";
option java_package = "com.google.type";

message Color {
  float red = 1;
}
"#;

    fn write_tree(root: &Path) {
        let library = root.join("google/example/library");
        let versioned = library.join("v1");
        let types = root.join("google/type");
        fs::create_dir_all(&versioned).unwrap();
        fs::create_dir_all(&types).unwrap();

        fs::write(library.join("library_example_v1.yaml"), SERVICE_YAML).unwrap();
        fs::write(versioned.join("library.proto"), LIBRARY_PROTO).unwrap();
        fs::write(versioned.join("library_grpc_service_config.json"), GRPC_SERVICE_CONFIG).unwrap();
        fs::write(types.join("color.proto"), COLOR_PROTO).unwrap();
    }

    fn options(src: &Path, dest: &Path, overwrite: bool) -> GenerateOptions {
        GenerateOptions {
            src: src.to_path_buf(),
            dest: dest.to_path_buf(),
            overwrite,
            transport: Transport::default(),
            transport_forced: false,
            rest_numeric_enums: "True".to_string(),
            templates: TemplateSet::default(),
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn generates_all_three_template_kinds() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_tree(src.path());

        let summary = generate(&options(src.path(), dest.path(), true), None).unwrap();

        // src root, google, google/example, google/example/library, .../v1,
        // google/type.
        assert_eq!(summary.scanned, 6);
        assert_eq!(summary.written, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);

        let root = read(&dest.path().join("google/example/library/BUILD.bazel"));
        assert_eq!(root, templates::ROOT);

        let gapic = read(&dest.path().join("google/example/library/v1/BUILD.bazel"));
        assert!(!gapic.contains("{{"));
        assert!(gapic.contains("name = \"library_proto\","));
        assert!(gapic.contains("java_gapic_library("));
        assert!(gapic.contains("grpc_service_config = \"library_grpc_service_config.json\","));
        // The service yaml lives one level up and resolves to a label there.
        assert!(gapic.contains("service_yaml = \"//google/example/library:library_example_v1.yaml\","));
        assert!(gapic.contains("name = \"google-cloud-example-library-v1-java\","));
        assert!(gapic.contains("name = \"gapi-cloud-example-library-v1-go\","));
        assert!(gapic.contains("importpath = \"cloud.google.com/go/example/library/apiv1;library\","));
        assert!(gapic.contains("\"//google/iam/v1:iam_policy_py_proto\","));
        assert!(gapic.contains("transport = \"grpc+rest\","));

        let raw = read(&dest.path().join("google/type/BUILD.bazel"));
        assert!(!raw.contains("{{"));
        assert!(raw.contains("name = \"type_proto\","));
        assert!(raw.contains("name = \"google-type-csharp\","));
        assert!(raw.contains("package_name = \"Google.Type\","));
        assert!(!raw.contains("java_gapic_library("));

        // Directories without protos or a service yaml produce nothing.
        assert!(!dest.path().join("google/BUILD.bazel").exists());
        assert!(!dest.path().join("google/example/BUILD.bazel").exists());
        assert!(!dest.path().join("BUILD.bazel").exists());
    }

    #[test]
    fn regenerating_an_untouched_tree_is_byte_identical() {
        let tree = tempfile::tempdir().unwrap();
        write_tree(tree.path());
        let opts = options(tree.path(), tree.path(), false);

        let mut editor = FakeEditor::new();
        generate(&opts, Some(&mut editor)).unwrap();

        let files = [
            tree.path().join("google/example/library/v1/BUILD.bazel"),
            tree.path().join("google/type/BUILD.bazel"),
        ];
        let before: Vec<String> = files.iter().map(|f| read(f)).collect();

        let mut editor = FakeEditor::new();
        let summary = generate(&opts, Some(&mut editor)).unwrap();
        assert_eq!(summary.failed, 0);

        let after: Vec<String> = files.iter().map(|f| read(f)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn hand_edits_survive_regeneration() {
        let tree = tempfile::tempdir().unwrap();
        write_tree(tree.path());
        let opts = options(tree.path(), tree.path(), false);
        let build_file = tree.path().join("google/example/library/v1/BUILD.bazel");

        let mut editor = FakeEditor::new();
        generate(&opts, Some(&mut editor)).unwrap();

        let mut hand = FakeEditor::new();
        hand.queue_set_attribute(&build_file, "library_nodejs_gapic", "package_name", "@google-cloud/books");
        hand.queue_remove_attribute(&build_file, "library_nodejs_gapic", "extra_protoc_parameters");
        hand.queue_add_list_element(&build_file, "library_nodejs_gapic", "extra_protoc_parameters", "custom-param");
        hand.queue_rename_rule(&build_file, "java_gapic_assembly_gradle_pkg", "custom-java-pkg");
        hand.queue_set_attribute(&build_file, "library_java_gapic", "transport", "rest");
        hand.queue_set_raw_attribute(&build_file, "library_java_gapic", "rest_numeric_enums", "False");
        hand.queue_set_attribute(&build_file, "library_java_gapic", "grpc_service_config", "hacked.json");
        hand.commit().unwrap();

        let mut editor = FakeEditor::new();
        generate(&opts, Some(&mut editor)).unwrap();
        let body = read(&build_file);

        assert!(body.contains("package_name = \"@google-cloud/books\","));
        assert!(body.contains("extra_protoc_parameters = [\"custom-param\"],"));
        assert!(!body.contains("\"metadata\""));
        assert!(body.contains("name = \"custom-java-pkg\","));
        assert!(!body.contains("google-cloud-example-library-v1-java"));

        // The hand-chosen java transport drops the grpc targets from the
        // regenerated java section but leaves the other languages alone.
        assert!(body.contains("transport = \"rest\","));
        assert!(!body.contains("java_grpc_library("));
        assert_eq!(body.matches("rest_numeric_enums = False,").count(), 1);
        assert_eq!(body.matches("rest_numeric_enums = True,").count(), 6);

        // The grpc service config is recomputed, never preserved.
        assert!(!body.contains("hacked.json"));
        assert!(body.contains("grpc_service_config = \"library_grpc_service_config.json\","));
    }

    #[test]
    fn overwrite_discards_hand_edits() {
        let tree = tempfile::tempdir().unwrap();
        write_tree(tree.path());
        let opts = options(tree.path(), tree.path(), false);
        let build_file = tree.path().join("google/example/library/v1/BUILD.bazel");

        let mut editor = FakeEditor::new();
        generate(&opts, Some(&mut editor)).unwrap();
        let fresh = read(&build_file);

        let mut hand = FakeEditor::new();
        hand.queue_set_attribute(&build_file, "library_nodejs_gapic", "package_name", "@google-cloud/books");
        hand.queue_rename_rule(&build_file, "java_gapic_assembly_gradle_pkg", "custom-java-pkg");
        hand.commit().unwrap();

        generate(&options(tree.path(), tree.path(), true), None).unwrap();
        let body = read(&build_file);
        assert_eq!(body, fresh);
        assert!(body.contains("package_name = \"@google-cloud/library\","));
        assert!(!body.contains("custom-java-pkg"));
    }

    #[test]
    fn existing_root_build_file_is_kept() {
        let tree = tempfile::tempdir().unwrap();
        write_tree(tree.path());
        let root_file = tree.path().join("google/example/library/BUILD.bazel");
        fs::write(&root_file, "# Hello\n").unwrap();

        let mut editor = FakeEditor::new();
        let summary = generate(&options(tree.path(), tree.path(), false), Some(&mut editor)).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(read(&root_file), "# Hello\n");

        generate(&options(tree.path(), tree.path(), true), None).unwrap();
        assert_eq!(read(&root_file), templates::ROOT);
    }

    #[test]
    fn requires_an_editor_unless_overwriting() {
        let tree = tempfile::tempdir().unwrap();
        write_tree(tree.path());

        let err = generate(&options(tree.path(), tree.path(), false), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BazelGenError>(),
            Some(BazelGenError::EditorRequired)
        ));
    }

    #[test]
    fn unwritable_destination_is_reported_not_fatal() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        write_tree(src.path());
        let dest = scratch.path().join("dest");
        fs::write(&dest, "not a directory").unwrap();

        let summary = generate(&options(src.path(), &dest, true), None).unwrap();
        assert_eq!(summary.written, 0);
        assert_eq!(summary.failed, 3);
        assert!(summary.files.iter().all(|f| f.status == FileStatus::Failed));
    }

    #[test]
    fn protos_without_a_package_are_ignored() {
        let tree = tempfile::tempdir().unwrap();
        let dir = tree.path().join("fragments");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("anonymous.proto"), "syntax = \"proto3\";\nmessage M {}\n").unwrap();

        let summary = generate(&options(tree.path(), tree.path(), true), None).unwrap();
        assert_eq!(summary.written, 0);
        assert!(!dir.join("BUILD.bazel").exists());
    }
}
