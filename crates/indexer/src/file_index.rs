use crate::error::{IndexerError, Result};
use crate::paths::{file_extension, file_name, file_stem, normalize_path_str};
use crate::scanner::{FileScanner, ListingSource};
use globset::GlobBuilder;
use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// In-memory snapshot of a repository's files with precomputed lookup tables.
///
/// Built once per discovery session and immutable afterwards. The existence set and the glob
/// cache are filled lazily on first use, so lookups only need `&self`; the index is therefore
/// meant for single-threaded use within one session.
#[derive(Debug)]
pub struct FileIndex {
    root: PathBuf,
    paths: Vec<String>,
    by_stem: HashMap<String, Vec<String>>,
    by_extension: HashMap<String, Vec<String>>,
    path_set: OnceCell<HashSet<String>>,
    glob_cache: RefCell<HashMap<String, Vec<String>>>,
}

impl FileIndex {
    /// Enumerate `root` through `git ls-files`.
    ///
    /// Fails only when `root` cannot be resolved. A listing failure yields an empty index.
    pub fn build(root: impl AsRef<Path>, max_files: usize) -> Result<Self> {
        Self::build_with_source(root, max_files, ListingSource::Git)
    }

    pub fn build_with_source(
        root: impl AsRef<Path>,
        max_files: usize,
        source: ListingSource,
    ) -> Result<Self> {
        let root = resolve_root(root.as_ref())?;

        let paths = match FileScanner::new(&root)
            .with_source(source)
            .with_max_files(max_files)
            .scan()
        {
            Ok(paths) => paths,
            Err(err) => {
                log::warn!(
                    "File listing unavailable for {}: {err}; continuing with an empty index",
                    root.display()
                );
                Vec::new()
            }
        };

        Ok(Self::from_paths(root, paths))
    }

    /// Build from an explicit listing. Entries are normalized and deduplicated.
    pub fn from_paths<I, S>(root: impl Into<PathBuf>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        let mut by_stem: HashMap<String, Vec<String>> = HashMap::new();
        let mut by_extension: HashMap<String, Vec<String>> = HashMap::new();

        for raw in paths {
            let rel = normalize_path_str(raw.as_ref());
            if rel.is_empty() || !seen.insert(rel.clone()) {
                continue;
            }
            by_stem
                .entry(file_stem(&rel).to_lowercase())
                .or_default()
                .push(rel.clone());
            let ext = file_extension(&rel);
            if !ext.is_empty() {
                by_extension
                    .entry(ext.to_lowercase())
                    .or_default()
                    .push(rel.clone());
            }
            all.push(rel);
        }

        Self {
            root: root.into(),
            paths: all,
            by_stem,
            by_extension,
            path_set: OnceCell::new(),
            glob_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn file_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Case-insensitive exact stem lookup.
    pub fn find_by_stem(&self, stem: &str) -> Vec<String> {
        self.by_stem
            .get(&stem.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Case-insensitive extension lookup; a leading dot is accepted.
    pub fn find_by_extension(&self, ext: &str) -> Vec<String> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.by_extension.get(&ext).cloned().unwrap_or_default()
    }

    /// Shell-style glob over every indexed path, cached per pattern string.
    ///
    /// `*` also crosses `/`, like `fnmatch`. An invalid pattern matches nothing.
    pub fn find_by_glob(&self, pattern: &str) -> Vec<String> {
        if let Some(hit) = self.glob_cache.borrow().get(pattern) {
            return hit.clone();
        }

        let matches: Vec<String> = match compile_glob(pattern) {
            Ok(matcher) => self
                .paths
                .iter()
                .filter(|path| matcher.is_match(path.as_str()))
                .cloned()
                .collect(),
            Err(err) => {
                log::warn!("Ignoring glob '{pattern}': {err}");
                Vec::new()
            }
        };

        self.glob_cache
            .borrow_mut()
            .insert(pattern.to_string(), matches.clone());
        matches
    }

    /// Resolve a bare file name to exactly one indexed path.
    ///
    /// First a unique (stem, extension) match, then a unique stem-only match. Any stage with
    /// more than one candidate ends the lookup with `None`.
    pub fn fuzzy_find(&self, filename: &str) -> Option<String> {
        let name = file_name(filename.trim());
        if name.is_empty() {
            return None;
        }
        let stem = file_stem(name).to_lowercase();
        let ext = file_extension(name).to_lowercase();
        let by_stem = self.by_stem.get(&stem)?;

        if !ext.is_empty() {
            let exact: Vec<&String> = by_stem
                .iter()
                .filter(|path| file_extension(path).eq_ignore_ascii_case(&ext))
                .collect();
            match exact.len() {
                0 => {}
                1 => return Some(exact[0].clone()),
                n => {
                    log::debug!("'{filename}' is ambiguous: {n} files share its name");
                    return None;
                }
            }
        }

        match by_stem.as_slice() {
            [only] => Some(only.clone()),
            [] => None,
            many => {
                log::debug!(
                    "'{filename}' is ambiguous: {} files share its stem",
                    many.len()
                );
                None
            }
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        let set = self
            .path_set
            .get_or_init(|| self.paths.iter().cloned().collect());
        set.contains(normalize_path_str(path).as_str())
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(IndexerError::InvalidPath(format!(
            "Path is not a directory: {}",
            root.display()
        )));
    }
    root.canonicalize().map_err(|err| {
        IndexerError::InvalidPath(format!("Cannot resolve {}: {err}", root.display()))
    })
}

fn compile_glob(pattern: &str) -> Result<globset::GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()?;
    Ok(glob.compile_matcher())
}
