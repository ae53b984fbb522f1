use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// A BUILD file template with `{{token}}` placeholders.
///
/// Tokens missing from the substitution table are left in place verbatim,
/// so an optional section that got no value stays visibly unexpanded
/// instead of silently collapsing.
#[derive(Debug, Clone)]
pub struct Template {
    body: String,
}

impl Template {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn expand(&self, tokens: &BTreeMap<String, String>) -> String {
        static TOKEN: OnceLock<Regex> = OnceLock::new();
        let re = TOKEN.get_or_init(|| Regex::new(r"\{\{(.+?)\}\}").unwrap());

        let mut out = String::with_capacity(self.body.len());
        let mut last = 0;
        for caps in re.captures_iter(&self.body) {
            let whole = caps.get(0).unwrap();
            out.push_str(&self.body[last..whole.start()]);
            match tokens.get(&caps[1]) {
                Some(value) => out.push_str(value),
                None => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        out.push_str(&self.body[last..]);
        out
    }
}
