use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// `@Annotation`
fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"))
}

/// PascalCase word of at least three characters
fn pascal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]{2,}\b").expect("valid regex"))
}

/// `name(` or `receiver.name(`
fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\(")
            .expect("valid regex")
    })
}

/// Identifiers a snippet and the code it claims to quote should share.
pub fn extract_identifiers<S: AsRef<str>>(lines: &[S]) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for line in lines {
        let line = line.as_ref();
        for hit in annotation_re().find_iter(line) {
            found.insert(hit.as_str().to_string());
        }
        for hit in pascal_re().find_iter(line) {
            found.insert(hit.as_str().to_string());
        }
        for caps in call_re().captures_iter(line) {
            found.insert(caps[1].to_string());
        }
    }
    found
}
