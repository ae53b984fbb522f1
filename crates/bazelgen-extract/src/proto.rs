use std::sync::OnceLock;

use regex::Regex;

/// First `package foo.bar.v1;` declaration, if any.
pub fn package(body: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^package\s+(?P<pkg>[\w.]+)\s*;\s*$").unwrap());
    re.captures(body).map(|c| c["pkg"].to_string())
}

/// All plain `import "path/to/file.proto";` statements in document order.
/// Public and weak imports are left alone.
pub fn imports(body: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"(?m)^import\s+"(?P<path>[\w./]+)"\s*;\s*$"#).unwrap());
    re.captures_iter(body).map(|c| c["path"].to_string()).collect()
}

/// Per-language packaging options, as `(language, value)` pairs in document
/// order. The language key is the option name up to its first underscore,
/// so both `go_package` and `csharp_namespace` map to their language.
pub fn lang_options(body: &str) -> Vec<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^option\s+(?P<name>(?:java|go|csharp|ruby|php|javascript)_(?:namespace|package))\s+=\s+"(?P<value>[\w./;\\-]+)"\s*;\s*$"#,
        )
        .unwrap()
    });
    re.captures_iter(body)
        .map(|c| {
            let name = &c["name"];
            let lang = name.split('_').next().unwrap_or(name).to_string();
            (lang, c["value"].to_string())
        })
        .collect()
}

/// Names of all top-level `service` declarations.
pub fn services(body: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^service\s+(?P<name>\w+)\s+(?:\{)*\s*$").unwrap());
    re.captures_iter(body).map(|c| c["name"].to_string()).collect()
}
