use std::fs;

use bazelgen_core::Result;
use bazelgen_editor::BuildFileEditor;
use bazelgen_model::PreservedAttributes;

/// Replays preserved hand edits onto freshly rendered BUILD file content.
///
/// The content goes through a scratch file so the editor can work on it.
/// Renames commit first: every later edit addresses rules by name, and a
/// renamed assembly rule must already carry its preserved name by then.
pub fn reconcile(
    rendered: &str,
    preserved: &PreservedAttributes,
    editor: &mut dyn BuildFileEditor,
) -> Result<String> {
    if preserved.is_empty() {
        return Ok(rendered.to_string());
    }

    let scratch = tempfile::tempdir()?;
    let path = scratch.path().join("BUILD.bazel");
    fs::write(&path, rendered)?;

    for (kind, new_name) in &preserved.assembly_names {
        match editor.get_attribute(&path, &format!("%{kind}"), "name")? {
            Some(current) => {
                if current != *new_name {
                    editor.queue_rename_rule(&path, kind, new_name);
                }
            }
            None => {
                tracing::debug!(kind, "fresh render has no rule of this kind, dropping rename")
            }
        }
    }
    editor.commit()?;

    for (rule, attrs) in &preserved.string_attrs {
        for (attribute, value) in attrs {
            editor.queue_set_attribute(&path, rule, attribute, value);
        }
    }
    for (rule, attrs) in &preserved.nonstring_attrs {
        for (attribute, value) in attrs {
            editor.queue_set_raw_attribute(&path, rule, attribute, value);
        }
    }
    for (rule, attrs) in &preserved.list_attrs {
        for (attribute, values) in attrs {
            editor.queue_remove_attribute(&path, rule, attribute);
            for value in values {
                editor.queue_add_list_element(&path, rule, attribute, value);
            }
        }
    }
    editor.commit()?;

    Ok(fs::read_to_string(&path)?)
}
