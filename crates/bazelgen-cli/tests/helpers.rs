use std::path::{Path, PathBuf};
use std::process::Command;

pub const LIBRARY_PROTO: &str = r#"syntax = "proto3";

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

pub const SERVICE_YAML: &str = r#"type: google.api.Service
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

pub const GRPC_SERVICE_CONFIG: &str = r#"{
  "methodConfig": [
    {
      "name": [{ "service": "google.example.library.v1.LibraryService" }],
      "timeout": "60s"
    }
  ]
}
"#;

pub const COLOR_PROTO: &str = r#"syntax = "proto3";

package google.type;

import "google/protobuf/wrappers.proto";

option csharp_namespace = "Google.Type";
option go_package = "google.golang.org/genproto/googleapis/type/color;color";
option java_package = "com.google.type";

message Color {
  float red = 1;
}
"#;

/// Lays out a small API tree: one versioned GAPIC directory, its API root
/// directory, and one proto-only type directory.
pub fn write_tree(root: &Path) {
    let library = root.join("google/example/library");
    let versioned = library.join("v1");
    let types = root.join("google/type");
    std::fs::create_dir_all(&versioned).expect("create fixture dirs");
    std::fs::create_dir_all(&types).expect("create fixture dirs");

    std::fs::write(library.join("library_example_v1.yaml"), SERVICE_YAML).expect("write yaml");
    std::fs::write(versioned.join("library.proto"), LIBRARY_PROTO).expect("write proto");
    std::fs::write(
        versioned.join("library_grpc_service_config.json"),
        GRPC_SERVICE_CONFIG,
    )
    .expect("write json");
    std::fs::write(types.join("color.proto"), COLOR_PROTO).expect("write proto");
}

/// A buildozer stand-in that accepts every command and prints nothing, which
/// reads back as "no rules, no preserved attributes".
pub fn write_stub_buildozer(dir: &Path) -> PathBuf {
    let path = dir.join("buildozer");
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write stub buildozer");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub buildozer");
    }
    path
}

pub fn run_cli(args: &[&str]) -> (i32, String, String) {
    let tmp = tempfile::tempdir().expect("tempdir for cli run");
    run_cli_in(tmp.path(), args)
}

pub fn run_cli_in(cwd: &Path, args: &[&str]) -> (i32, String, String) {
    run_cli_env(cwd, args, &[])
}

pub fn run_cli_env(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> (i32, String, String) {
    let bin = env!("CARGO_BIN_EXE_bazelgen-cli");
    let mut cmd = Command::new(bin);
    cmd.current_dir(cwd).args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("failed to spawn bazelgen-cli");
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

/// Substring assertion with enough context to debug a failure from the log.
pub fn assert_contains_with_context(haystack: &str, needle: &str, context_msg: &str) {
    if haystack.contains(needle) {
        return;
    }
    let head = haystack.lines().take(12).collect::<Vec<_>>().join("\n");
    panic!(
        "{}\n--- needle ---\n{}\n--- head(12) ---\n{}",
        context_msg, needle, head
    );
}

pub fn assert_no_ansi(s: &str, context_msg: &str) {
    if s.bytes().any(|b| b == 0x1B) {
        let sample = s.lines().take(8).collect::<Vec<_>>().join("\n");
        panic!("{}\nANSI escapes detected\n--- sample ---\n{}", context_msg, sample);
    }
}
