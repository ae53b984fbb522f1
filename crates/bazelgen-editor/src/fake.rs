use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bazelgen_core::Result;
use regex::Regex;

use crate::{BuildFileEditor, Rule};

/// In-memory [`BuildFileEditor`] used by tests in place of the buildozer
/// binary.
///
/// It reads files from disk on every lookup and rewrites them on commit,
/// so batched edits stay invisible until committed, like the real tool.
/// It only understands the regular layout generation itself emits: top
/// level `kind(` blocks, four-space attribute lines, eight-space list
/// elements. Anything else passes through as opaque text.
#[derive(Default)]
pub struct FakeEditor {
    batch: Vec<PendingOp>,
}

struct PendingOp {
    file: PathBuf,
    target: String,
    attribute: String,
    action: Action,
}

enum Action {
    SetString(String),
    SetRaw(String),
    AddListElement(String),
    Remove,
}

#[derive(Debug, Clone)]
enum AttrValue {
    Str(String),
    Raw(String),
    List { elems: Vec<String>, inline: bool },
    /// A removed attribute keeps its slot until the file renders, so a
    /// later add in the same batch lands back in the original position.
    Removed,
}

#[derive(Debug, Clone)]
enum RuleItem {
    Attr { name: String, value: AttrValue },
    Opaque(String),
}

#[derive(Debug, Clone)]
struct ParsedRule {
    kind: String,
    items: Vec<RuleItem>,
}

#[derive(Debug, Clone)]
enum Chunk {
    Text(String),
    Rule(ParsedRule),
}

#[derive(Debug, Clone)]
struct ParsedFile {
    chunks: Vec<Chunk>,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&self, file: &Path) -> Result<ParsedFile> {
        let content = std::fs::read_to_string(file)?;
        Ok(parse(&content))
    }
}

impl BuildFileEditor for FakeEditor {
    fn list_rules(&self, file: &Path) -> Result<Vec<Rule>> {
        let parsed = self.load(file)?;
        Ok(parsed
            .chunks
            .iter()
            .filter_map(|chunk| match chunk {
                Chunk::Rule(rule) => rule
                    .name()
                    .map(|name| Rule { kind: rule.kind.clone(), name: name.to_string() }),
                Chunk::Text(_) => None,
            })
            .collect())
    }

    fn get_attribute(&self, file: &Path, target: &str, attribute: &str) -> Result<Option<String>> {
        let parsed = self.load(file)?;
        let Some(rule) = parsed.find(target) else {
            return Ok(None);
        };
        Ok(rule.attr(attribute).and_then(|value| match value {
            AttrValue::Str(s) => Some(s.clone()),
            AttrValue::Raw(r) => Some(r.clone()),
            AttrValue::List { elems, .. } => Some(format!("[{}]", elems.join(" "))),
            AttrValue::Removed => None,
        }))
    }

    fn queue_set_attribute(&mut self, file: &Path, target: &str, attribute: &str, value: &str) {
        self.batch.push(PendingOp {
            file: file.to_path_buf(),
            target: target.to_string(),
            attribute: attribute.to_string(),
            action: Action::SetString(value.to_string()),
        });
    }

    fn queue_set_raw_attribute(&mut self, file: &Path, target: &str, attribute: &str, value: &str) {
        self.batch.push(PendingOp {
            file: file.to_path_buf(),
            target: target.to_string(),
            attribute: attribute.to_string(),
            action: Action::SetRaw(value.to_string()),
        });
    }

    fn queue_add_list_element(&mut self, file: &Path, target: &str, attribute: &str, value: &str) {
        self.batch.push(PendingOp {
            file: file.to_path_buf(),
            target: target.to_string(),
            attribute: attribute.to_string(),
            action: Action::AddListElement(value.to_string()),
        });
    }

    fn queue_remove_attribute(&mut self, file: &Path, target: &str, attribute: &str) {
        self.batch.push(PendingOp {
            file: file.to_path_buf(),
            target: target.to_string(),
            attribute: attribute.to_string(),
            action: Action::Remove,
        });
    }

    fn commit(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.batch);
        let mut files: Vec<(PathBuf, ParsedFile)> = Vec::new();
        for op in &batch {
            let idx = match files.iter().position(|(path, _)| path == &op.file) {
                Some(idx) => idx,
                None => {
                    let content = std::fs::read_to_string(&op.file)?;
                    files.push((op.file.clone(), parse(&content)));
                    files.len() - 1
                }
            };
            apply(&mut files[idx].1, op);
        }
        for (path, parsed) in &files {
            std::fs::write(path, render(parsed))?;
        }
        Ok(())
    }
}

impl ParsedFile {
    fn find(&self, target: &str) -> Option<&ParsedRule> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Rule(rule) if rule.matches(target) => Some(rule),
            _ => None,
        })
    }

    fn find_mut(&mut self, target: &str) -> Option<&mut ParsedRule> {
        self.chunks.iter_mut().find_map(|chunk| match chunk {
            Chunk::Rule(rule) if rule.matches(target) => Some(rule),
            _ => None,
        })
    }
}

impl ParsedRule {
    fn matches(&self, target: &str) -> bool {
        match target.strip_prefix('%') {
            Some(kind) => self.kind == kind,
            None => self.name() == Some(target),
        }
    }

    fn name(&self) -> Option<&str> {
        match self.attr("name") {
            Some(AttrValue::Str(name)) => Some(name),
            _ => None,
        }
    }

    fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.items.iter().find_map(|item| match item {
            RuleItem::Attr { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    fn remove_attr(&mut self, name: &str) {
        if let Some(slot) = self.attr_mut(name) {
            *slot = AttrValue::Removed;
        }
    }

    fn attr_mut(&mut self, name: &str) -> Option<&mut AttrValue> {
        self.items.iter_mut().find_map(|item| match item {
            RuleItem::Attr { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) {
        match self.attr_mut(name) {
            Some(slot) => *slot = value,
            None => self.items.push(RuleItem::Attr { name: name.to_string(), value }),
        }
    }
}

fn apply(file: &mut ParsedFile, op: &PendingOp) {
    let Some(rule) = file.find_mut(&op.target) else {
        tracing::warn!(target = %op.target, "edit target not found, dropping edit");
        return;
    };
    match &op.action {
        Action::SetString(value) => rule.set_attr(&op.attribute, AttrValue::Str(value.clone())),
        Action::SetRaw(value) => rule.set_attr(&op.attribute, AttrValue::Raw(value.clone())),
        // Lists created by an add render inline, the shape short lists
        // take in freshly rendered content.
        Action::AddListElement(value) => match rule.attr_mut(&op.attribute) {
            Some(AttrValue::List { elems, .. }) => {
                if !elems.contains(value) {
                    elems.push(value.clone());
                }
            }
            Some(other) => {
                *other = AttrValue::List { elems: vec![value.clone()], inline: true };
            }
            None => rule.set_attr(
                &op.attribute,
                AttrValue::List { elems: vec![value.clone()], inline: true },
            ),
        },
        Action::Remove => rule.remove_attr(&op.attribute),
    }
}

fn rule_start(line: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(?P<kind>[a-z_][a-zA-Z0-9_]*)\($").unwrap());
    re.captures(line).map(|c| c["kind"].to_string())
}

fn attr_line(line: &str) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"^ {4}(?P<name>[a-z_][a-zA-Z0-9_]*) = (?P<raw>.*)$").unwrap());
    re.captures(line).map(|c| (c["name"].to_string(), c["raw"].to_string()))
}

fn quoted_strings(line: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#""(?P<s>[^"]*)""#).unwrap());
    re.captures_iter(line).map(|c| c["s"].to_string()).collect()
}

fn scalar_value(raw: &str) -> AttrValue {
    let value = raw.trim_end_matches(',');
    if let Some(inner) = value.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        AttrValue::Str(inner.to_string())
    } else if value.starts_with('[') && value.ends_with(']') {
        AttrValue::List { elems: quoted_strings(value), inline: true }
    } else {
        AttrValue::Raw(value.to_string())
    }
}

fn parse(content: &str) -> ParsedFile {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some(kind) = rule_start(lines[i]) {
            let (rule, next) = parse_rule(kind, &lines, i + 1);
            chunks.push(Chunk::Rule(rule));
            i = next;
        } else {
            chunks.push(Chunk::Text(lines[i].to_string()));
            i += 1;
        }
    }
    ParsedFile { chunks }
}

fn parse_rule(kind: String, lines: &[&str], mut i: usize) -> (ParsedRule, usize) {
    let mut items = Vec::new();
    while i < lines.len() {
        let line = lines[i];
        if line == ")" {
            i += 1;
            break;
        }
        if let Some((name, raw)) = attr_line(line) {
            if raw == "[" {
                let mut elems = Vec::new();
                i += 1;
                while i < lines.len() && !matches!(lines[i].trim(), "]," | "]") {
                    elems.extend(quoted_strings(lines[i]));
                    i += 1;
                }
                if i < lines.len() {
                    i += 1;
                }
                items.push(RuleItem::Attr { name, value: AttrValue::List { elems, inline: false } });
                continue;
            }
            items.push(RuleItem::Attr { name, value: scalar_value(&raw) });
        } else {
            items.push(RuleItem::Opaque(line.to_string()));
        }
        i += 1;
    }
    (ParsedRule { kind, items }, i)
}

fn render(file: &ParsedFile) -> String {
    let mut out = String::new();
    for chunk in &file.chunks {
        match chunk {
            Chunk::Text(line) => {
                out.push_str(line);
                out.push('\n');
            }
            Chunk::Rule(rule) => render_rule(&mut out, rule),
        }
    }
    out
}

fn render_rule(out: &mut String, rule: &ParsedRule) {
    out.push_str(&rule.kind);
    out.push_str("(\n");
    for item in &rule.items {
        match item {
            RuleItem::Opaque(line) => {
                out.push_str(line);
                out.push('\n');
            }
            RuleItem::Attr { name, value } => match value {
                AttrValue::Removed => {}
                AttrValue::Str(s) => out.push_str(&format!("    {name} = \"{s}\",\n")),
                AttrValue::Raw(r) => out.push_str(&format!("    {name} = {r},\n")),
                AttrValue::List { elems, inline } => {
                    if *inline || elems.is_empty() {
                        let joined =
                            elems.iter().map(|e| format!("\"{e}\"")).collect::<Vec<_>>().join(", ");
                        out.push_str(&format!("    {name} = [{joined}],\n"));
                    } else {
                        out.push_str(&format!("    {name} = [\n"));
                        for elem in elems {
                            out.push_str(&format!("        \"{elem}\",\n"));
                        }
                        out.push_str("    ],\n");
                    }
                }
            },
        }
    }
    out.push_str(")\n");
}
