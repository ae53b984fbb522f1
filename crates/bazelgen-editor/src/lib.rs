//! Attribute-level editing of BUILD.bazel files.
//!
//! Generation never parses Starlark. Everything that has to read or change
//! an existing build file goes through a [`BuildFileEditor`], normally the
//! [`Buildozer`] wrapper around the external binary. [`FakeEditor`] is an
//! in-memory drop-in used by tests.

use std::path::Path;

use bazelgen_core::Result;

mod buildozer;
mod fake;

pub use buildozer::Buildozer;
pub use fake::FakeEditor;

/// A named top-level rule declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: String,
    pub name: String,
}

/// Batched attribute edits against BUILD.bazel files.
///
/// Targets are rule names, or `%kind` to address a rule by its kind.
/// Queued edits stay invisible to `get_attribute` until [`commit`] runs.
///
/// [`commit`]: BuildFileEditor::commit
pub trait BuildFileEditor {
    /// Lists the named top-level rules declared in `file`.
    fn list_rules(&self, file: &Path) -> Result<Vec<Rule>>;

    /// Reads the current value of `attribute` on `target`, `None` when the
    /// rule or the attribute does not exist. List values come back
    /// bracketed and space separated, e.g. `[param1 param2]`.
    fn get_attribute(&self, file: &Path, target: &str, attribute: &str) -> Result<Option<String>>;

    /// Queues `attribute = "value"`.
    fn queue_set_attribute(&mut self, file: &Path, target: &str, attribute: &str, value: &str);

    /// Queues `attribute = value` without quoting, for booleans and other
    /// non-string literals.
    fn queue_set_raw_attribute(&mut self, file: &Path, target: &str, attribute: &str, value: &str);

    /// Queues appending `value` to a list attribute, creating the list when
    /// it does not exist yet.
    fn queue_add_list_element(&mut self, file: &Path, target: &str, attribute: &str, value: &str);

    /// Queues removal of `attribute` from `target`.
    fn queue_remove_attribute(&mut self, file: &Path, target: &str, attribute: &str);

    /// Queues renaming the rule of kind `kind` to `new_name`.
    fn queue_rename_rule(&mut self, file: &Path, kind: &str, new_name: &str) {
        self.queue_set_attribute(file, &format!("%{kind}"), "name", new_name);
    }

    /// Applies all queued edits in order, then clears the queue.
    fn commit(&mut self) -> Result<()>;
}
