use std::path::Path;

/// Relative, forward-slash form of `path` under `root`.
pub fn normalize_relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let rel = rel.to_string_lossy().into_owned();
    let rel = normalize_path_str(&rel);
    if rel.is_empty() {
        None
    } else {
        Some(rel)
    }
}

/// Normalize a listing entry: `\` becomes `/`, leading `./` and trailing `/` are dropped.
pub fn normalize_path_str(raw: &str) -> String {
    let mut rel = raw.trim().replace('\\', "/");
    while let Some(stripped) = rel.strip_prefix("./") {
        rel = stripped.to_string();
    }
    rel.trim_end_matches('/').to_string()
}

/// Final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory part of a relative path (`""` for files at the root).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// File name without its last extension. Dotfiles keep their full name.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Last extension without the dot, or `""`.
pub fn file_extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx + 1..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_names() {
        assert_eq!(file_stem("src/foo.test.ts"), "foo.test");
        assert_eq!(file_extension("src/foo.test.ts"), "ts");
        assert_eq!(file_stem(".gitignore"), ".gitignore");
        assert_eq!(file_extension(".gitignore"), "");
        assert_eq!(file_stem("Makefile"), "Makefile");
        assert_eq!(parent_dir("Makefile"), "");
        assert_eq!(parent_dir("a/b/c.rs"), "a/b");
    }

    #[test]
    fn normalizes_listing_entries() {
        assert_eq!(normalize_path_str("./src\\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path_str("  docs/ "), "docs");
    }
}
