use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub type Result<T> = color_eyre::eyre::Result<T>;

#[derive(Debug, Error)]
pub enum BazelGenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("more than one rule of kind {kind} in {file}; rerun with --overwrite to regenerate from scratch")]
    DuplicateAssemblyRule { kind: String, file: PathBuf },
    #[error("missing required option csharp_namespace in {package}: https://google.aip.dev/191#packaging-annotations")]
    MissingCsharpNamespace { package: String },
    #[error("missing required option go_package in {package}")]
    MissingGoPackage { package: String },
    #[error("unsupported transport {0:?}: expected grpc, rest, or grpc+rest")]
    UnsupportedTransport(String),
    #[error("a buildozer binary is required to preserve existing BUILD.bazel edits; pass --buildozer or rerun with --overwrite")]
    EditorRequired,
}

/// Wire transports a generated client library can speak.
///
/// `GrpcRest` is the default and produces both a gRPC and a REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    Grpc,
    Rest,
    #[default]
    GrpcRest,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Grpc => "grpc",
            Transport::Rest => "rest",
            Transport::GrpcRest => "grpc+rest",
        }
    }

    pub fn has_grpc(self) -> bool {
        matches!(self, Transport::Grpc | Transport::GrpcRest)
    }

    pub fn has_rest(self) -> bool {
        matches!(self, Transport::Rest | Transport::GrpcRest)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = BazelGenError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(Transport::Grpc),
            "rest" => Ok(Transport::Rest),
            "grpc+rest" => Ok(Transport::GrpcRest),
            other => Err(BazelGenError::UnsupportedTransport(other.to_string())),
        }
    }
}

impl Serialize for Transport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Transport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
