use std::path::PathBuf;

use bazelgen_core::Transport;
use serde::Deserialize;
use thiserror::Error;

/// Optional defaults read from `bazelgen.toml`.
///
/// Command line flags always win over file values. A file in the current
/// working directory wins over the per-user file.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BazelGenConfig {
    pub transport: Option<Transport>,
    pub rest_numeric_enums: Option<String>,
    pub buildozer: Option<String>,
    pub generate: Option<GenerateConfig>,
    pub templates: Option<TemplatesConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct GenerateConfig {
    pub dest: Option<String>,
    pub overwrite: Option<bool>,
}

/// Paths to template files that replace the bundled ones.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TemplatesConfig {
    pub gapic: Option<String>,
    pub root: Option<String>,
    pub raw: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

const CONFIG_FILE_NAME: &str = "bazelgen.toml";

/// Loads and merges configuration from the working directory and the
/// per-user config directory. Missing files are not an error.
pub fn load_config() -> Result<BazelGenConfig, ConfigError> {
    let mut merged = BazelGenConfig::default();

    if let Some(user_path) = user_config_path() {
        if let Some(cfg) = read_config(&user_path)? {
            merged = cfg;
        }
    }

    let cwd_path = PathBuf::from(CONFIG_FILE_NAME);
    if let Some(cfg) = read_config(&cwd_path)? {
        merged = merge(cfg, merged);
    }

    Ok(merged)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bazelgen").join(CONFIG_FILE_NAME))
}

fn read_config(path: &PathBuf) -> Result<Option<BazelGenConfig>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&raw)?))
}

/// Field-wise merge where `a` wins over `b`.
pub fn merge(a: BazelGenConfig, b: BazelGenConfig) -> BazelGenConfig {
    BazelGenConfig {
        transport: a.transport.or(b.transport),
        rest_numeric_enums: a.rest_numeric_enums.or(b.rest_numeric_enums),
        buildozer: a.buildozer.or(b.buildozer),
        generate: merge_opt(a.generate, b.generate, |a, b| GenerateConfig {
            dest: a.dest.or(b.dest),
            overwrite: a.overwrite.or(b.overwrite),
        }),
        templates: merge_opt(a.templates, b.templates, |a, b| TemplatesConfig {
            gapic: a.gapic.or(b.gapic),
            root: a.root.or(b.root),
            raw: a.raw.or(b.raw),
        }),
    }
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg: BazelGenConfig = toml::from_str(
            r#"
            transport = "grpc"
            rest_numeric_enums = "False"
            buildozer = "/usr/local/bin/buildozer"

            [generate]
            dest = "out"
            overwrite = true

            [templates]
            gapic = "templates/gapic.tmpl"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.transport, Some(Transport::Grpc));
        assert_eq!(cfg.rest_numeric_enums.as_deref(), Some("False"));
        assert_eq!(cfg.generate.as_ref().unwrap().dest.as_deref(), Some("out"));
        assert_eq!(cfg.generate.as_ref().unwrap().overwrite, Some(true));
        assert_eq!(
            cfg.templates.as_ref().unwrap().gapic.as_deref(),
            Some("templates/gapic.tmpl")
        );
        assert!(cfg.templates.as_ref().unwrap().root.is_none());
    }

    #[test]
    fn rejects_unknown_transport() {
        let err = toml::from_str::<BazelGenConfig>(r#"transport = "soap""#);
        assert!(err.is_err());
    }

    #[test]
    fn merge_prefers_first_config() {
        let a: BazelGenConfig = toml::from_str(
            r#"
            transport = "rest"
            [generate]
            dest = "a-dest"
            "#,
        )
        .unwrap();
        let b: BazelGenConfig = toml::from_str(
            r#"
            transport = "grpc"
            buildozer = "bin/buildozer"
            [generate]
            dest = "b-dest"
            overwrite = true
            "#,
        )
        .unwrap();

        let merged = merge(a, b);
        assert_eq!(merged.transport, Some(Transport::Rest));
        assert_eq!(merged.buildozer.as_deref(), Some("bin/buildozer"));
        let gen = merged.generate.unwrap();
        assert_eq!(gen.dest.as_deref(), Some("a-dest"));
        assert_eq!(gen.overwrite, Some(true));
    }
}
