use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use bazelgen_core::Result;
use color_eyre::eyre::WrapErr;

use crate::{BuildFileEditor, Rule};

/// [`BuildFileEditor`] backed by the external `buildozer` binary.
///
/// Edits are collected into a batch and flushed in one `buildozer -f -`
/// invocation on commit, one command per line on stdin.
pub struct Buildozer {
    binary: PathBuf,
    batch: Vec<String>,
}

impl Buildozer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), batch: Vec::new() }
    }

    fn run(&self, args: &[String], stdin_lines: &[String]) -> Result<Vec<String>> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .wrap_err_with(|| format!("failed to spawn {}", self.binary.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            for line in stdin_lines {
                writeln!(stdin, "{line}")?;
            }
        }

        let output = child.wait_with_output()?;
        // buildozer exits 3 when a command made no changes, so the status
        // code carries no usable signal and is not checked.
        Ok(String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect())
    }

    fn target(file: &Path, target: &str) -> String {
        format!("{}:{}", file.display(), target)
    }

    fn escape(value: &str) -> String {
        value.replace(' ', "\\ ")
    }

    #[cfg(test)]
    fn queued(&self) -> &[String] {
        &self.batch
    }
}

impl BuildFileEditor for Buildozer {
    fn list_rules(&self, file: &Path) -> Result<Vec<Rule>> {
        let lines = self.run(&["print kind name".to_string(), Self::target(file, "*")], &[])?;
        // Nameless declarations such as package() print a single token and
        // are skipped.
        Ok(lines
            .iter()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(kind), Some(name), None) => {
                        Some(Rule { kind: kind.to_string(), name: name.to_string() })
                    }
                    _ => None,
                }
            })
            .collect())
    }

    fn get_attribute(&self, file: &Path, target: &str, attribute: &str) -> Result<Option<String>> {
        let lines = self.run(&[format!("print {attribute}"), Self::target(file, target)], &[])?;
        let first = match lines.first() {
            Some(line) => line.trim(),
            None => return Ok(None),
        };
        if first == "(missing)" {
            return Ok(None);
        }
        let unquoted = first
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(first);
        Ok(Some(unquoted.to_string()))
    }

    fn queue_set_attribute(&mut self, file: &Path, target: &str, attribute: &str, value: &str) {
        self.batch.push(format!(
            "set {attribute} \"{}\"|{}",
            Self::escape(value),
            Self::target(file, target)
        ));
    }

    fn queue_set_raw_attribute(&mut self, file: &Path, target: &str, attribute: &str, value: &str) {
        self.batch.push(format!("set {attribute} {value}|{}", Self::target(file, target)));
    }

    fn queue_add_list_element(&mut self, file: &Path, target: &str, attribute: &str, value: &str) {
        self.batch.push(format!(
            "add {attribute} \"{}\"|{}",
            Self::escape(value),
            Self::target(file, target)
        ));
    }

    fn queue_remove_attribute(&mut self, file: &Path, target: &str, attribute: &str) {
        self.batch.push(format!("remove {attribute}|{}", Self::target(file, target)));
    }

    fn commit(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        tracing::debug!(commands = self.batch.len(), "flushing buildozer batch");
        self.run(&["-f".to_string(), "-".to_string()], &self.batch)?;
        self.batch.clear();
        Ok(())
    }
}
