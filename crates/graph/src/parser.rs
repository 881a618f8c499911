use crate::error::Result;
use crate::types::ModuleGraph;
use crate::{cargo, golang, gradle, maven, npm, python};
use std::fs;
use std::path::{Path, PathBuf};

type DetectFn = fn(&Path) -> Result<Option<ModuleGraph>>;

/// Detectors in priority order. The first one that yields at least one module wins.
const DETECTORS: &[(&str, DetectFn)] = &[
    ("pom.xml", maven::detect),
    ("settings.gradle", gradle::detect_settings),
    ("build.gradle", gradle::detect_build),
    ("package.json", npm::detect),
    ("go.mod", golang::detect),
    ("pyproject.toml", python::detect_pyproject),
    ("setup.cfg", python::detect_setup_cfg),
    ("setup.py", python::detect_setup_py),
    ("Cargo.toml", cargo::detect),
];

/// Detects the build system of a repository and extracts its module graph.
pub struct ManifestParser {
    root: PathBuf,
}

impl ManifestParser {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Never fails: malformed manifests are logged and the next detector is tried.
    pub fn parse(&self) -> ModuleGraph {
        for (marker, detect) in DETECTORS {
            match detect(&self.root) {
                Ok(Some(graph)) if !graph.is_empty() => {
                    log::debug!(
                        "Detected {} project via {marker}: {} modules, {} edges",
                        graph.project_type,
                        graph.modules.len(),
                        graph.edges.len()
                    );
                    return graph;
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("Skipping {marker} in {}: {err}", self.root.display());
                }
            }
        }
        ModuleGraph::unknown()
    }
}

/// Name of the repository directory, used whenever a manifest does not declare one.
pub(crate) fn dir_name(dir: &Path) -> String {
    let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "root".to_string())
}

/// Last component of a relative module directory.
pub(crate) fn last_component(rel: &str) -> String {
    rel.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(rel)
        .to_string()
}

pub(crate) fn normalize_rel(raw: &str) -> String {
    let mut rel = raw.trim().replace('\\', "/");
    while let Some(stripped) = rel.strip_prefix("./") {
        rel = stripped.to_string();
    }
    rel.trim_end_matches('/').to_string()
}

pub(crate) fn first_existing<'a>(dir: &Path, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|name| dir.join(name).is_file())
}

/// Immediate subdirectories of `root/rel` that contain `manifest`, sorted by name.
pub(crate) fn subdirs_with_manifest(root: &Path, rel: &str, manifest: &str) -> Vec<String> {
    let base = if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    };
    let Ok(entries) = fs::read_dir(&base) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().join(manifest).is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            if rel.is_empty() {
                name
            } else {
                format!("{rel}/{name}")
            }
        })
        .collect()
}

/// Expand a workspace member entry (`dir/*` or an exact directory) into directories.
pub(crate) fn expand_member(root: &Path, entry: &str, manifest: &str) -> Vec<String> {
    let entry = normalize_rel(entry);
    if entry.is_empty() {
        return Vec::new();
    }
    if let Some(star) = entry.find('*') {
        let head = &entry[..star];
        let (dir, name_prefix) = match head.rfind('/') {
            Some(idx) => (&head[..idx], &head[idx + 1..]),
            None => ("", head),
        };
        return subdirs_with_manifest(root, dir, manifest)
            .into_iter()
            .filter(|path| last_component(path).starts_with(name_prefix))
            .collect();
    }
    if root.join(&entry).is_dir() {
        vec![entry]
    } else {
        log::debug!("Workspace entry '{entry}' is not a directory");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expands_star_entries_to_manifest_dirs() {
        let temp = tempdir().unwrap();
        for dir in ["packages/a", "packages/b", "packages/empty"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        fs::write(temp.path().join("packages/a/package.json"), "{}").unwrap();
        fs::write(temp.path().join("packages/b/package.json"), "{}").unwrap();

        assert_eq!(
            expand_member(temp.path(), "packages/*", "package.json"),
            vec!["packages/a", "packages/b"]
        );
        assert_eq!(
            expand_member(temp.path(), "./packages/a", "package.json"),
            vec!["packages/a"]
        );
        assert!(expand_member(temp.path(), "missing", "package.json").is_empty());
    }

    #[test]
    fn unknown_when_no_marker_matches() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("README.md"), "# hi").unwrap();

        let graph = ManifestParser::new(temp.path()).parse();
        assert_eq!(graph, ModuleGraph::unknown());
    }
}
