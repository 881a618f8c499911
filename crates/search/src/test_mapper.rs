use discovery_indexer::paths::{file_extension, file_stem, parent_dir};
use discovery_indexer::FileIndex;
use std::collections::{BTreeMap, HashSet};

/// Test file name templates per source extension, most conventional first.
const TEST_NAME_CONVENTIONS: &[(&str, &[&str])] = &[
    ("py", &["test_{stem}", "{stem}_test"]),
    ("java", &["{stem}Test", "{stem}Tests", "{stem}Spec", "{stem}IT"]),
    ("kt", &["{stem}Test", "{stem}Tests", "{stem}Spec"]),
    ("ts", &["{stem}.test", "{stem}.spec"]),
    ("tsx", &["{stem}.test", "{stem}.spec"]),
    ("js", &["{stem}.test", "{stem}.spec"]),
    ("jsx", &["{stem}.test", "{stem}.spec"]),
    ("go", &["{stem}_test"]),
    ("rb", &["{stem}_spec", "test_{stem}", "{stem}_test"]),
    ("rs", &["{stem}_test", "test_{stem}", "{stem}_tests"]),
    ("cs", &["{stem}Tests", "{stem}Test"]),
    ("swift", &["{stem}Tests", "{stem}Test"]),
];

/// Extensions that may test each other.
const COMPATIBLE_EXTENSIONS: &[&[&str]] = &[&["ts", "tsx"], &["js", "jsx"]];

const TEST_DIR_NAMES: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

/// Languages whose package path starts after a `main`/`test` source-set directory.
const SOURCE_SET_LANGUAGES: &[&str] = &["java", "kt", "kts", "scala", "groovy"];
const SOURCE_SET_MARKERS: &[&str] = &["main", "test"];

const TIER_SAME_DIR: u8 = 0;
const TIER_MIRRORED_PACKAGE: u8 = 1;
const TIER_TEST_DIR: u8 = 2;
const TIER_OTHER: u8 = 3;

/// Maps source files to the test files that conventionally exercise them.
pub struct TestMapper<'a> {
    index: &'a FileIndex,
}

impl<'a> TestMapper<'a> {
    pub fn new(index: &'a FileIndex) -> Self {
        Self { index }
    }

    /// Ranked candidate tests for `source`, best first.
    ///
    /// Ranking: tier (same directory, mirrored package path, test directory, other), then the
    /// number of directory components shared with the source, then the path itself.
    pub fn find_tests(&self, source: &str) -> Vec<String> {
        let ext = file_extension(source).to_lowercase();
        let Some(templates) = templates_for(&ext) else {
            return Vec::new();
        };
        let stem = file_stem(source);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for template in templates {
            let wanted = template.replace("{stem}", stem);
            for candidate in self.index.find_by_stem(&wanted) {
                if candidate == source {
                    continue;
                }
                if !extensions_compatible(&ext, &file_extension(&candidate).to_lowercase()) {
                    continue;
                }
                if seen.insert(candidate.clone()) {
                    candidates.push(candidate);
                }
            }
        }

        let mut ranked: Vec<(u8, usize, String)> = candidates
            .into_iter()
            .map(|candidate| {
                let tier = tier(source, &ext, &candidate);
                let shared = shared_components(source, &candidate);
                (tier, shared, candidate)
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        ranked.into_iter().map(|(_, _, path)| path).collect()
    }

    /// `find_tests` for every source; sources without candidates are left out.
    pub fn map_all<S: AsRef<str>>(&self, sources: &[S]) -> BTreeMap<String, Vec<String>> {
        let mut mapping = BTreeMap::new();
        for source in sources {
            let source = source.as_ref();
            let tests = self.find_tests(source);
            if !tests.is_empty() {
                mapping.insert(source.to_string(), tests);
            }
        }
        mapping
    }
}

fn templates_for(ext: &str) -> Option<&'static [&'static str]> {
    TEST_NAME_CONVENTIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, templates)| *templates)
}

fn extensions_compatible(source: &str, candidate: &str) -> bool {
    source == candidate
        || COMPATIBLE_EXTENSIONS
            .iter()
            .any(|group| group.contains(&source) && group.contains(&candidate))
}

fn dir_components(path: &str) -> Vec<&str> {
    parent_dir(path)
        .split('/')
        .filter(|part| !part.is_empty())
        .collect()
}

/// Directory components identifying the package a file belongs to.
fn package_path<'p>(path: &'p str, ext: &str) -> Vec<&'p str> {
    let dirs = dir_components(path);
    if SOURCE_SET_LANGUAGES.contains(&ext) {
        if let Some(pos) = dirs
            .iter()
            .position(|part| SOURCE_SET_MARKERS.contains(part))
        {
            return dirs[pos + 1..].to_vec();
        }
    }
    dirs.last().map(|last| vec![*last]).unwrap_or_default()
}

fn tier(source: &str, ext: &str, candidate: &str) -> u8 {
    if parent_dir(source) == parent_dir(candidate) {
        return TIER_SAME_DIR;
    }

    let source_pkg = package_path(source, ext);
    if !source_pkg.is_empty() && source_pkg == package_path(candidate, ext) {
        return TIER_MIRRORED_PACKAGE;
    }

    if dir_components(candidate)
        .iter()
        .any(|part| TEST_DIR_NAMES.contains(part))
    {
        return TIER_TEST_DIR;
    }

    TIER_OTHER
}

fn shared_components(source: &str, candidate: &str) -> usize {
    let candidate_dirs: HashSet<&str> = dir_components(candidate).into_iter().collect();
    let source_dirs: HashSet<&str> = dir_components(source).into_iter().collect();
    source_dirs.intersection(&candidate_dirs).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn package_path_after_source_set_marker() {
        assert_eq!(
            package_path("src/main/java/com/example/Foo.java", "java"),
            vec!["java", "com", "example"]
        );
        assert_eq!(
            package_path("src/test/java/com/example/FooTest.java", "java"),
            vec!["java", "com", "example"]
        );
        assert_eq!(package_path("tests/FooTest.java", "java"), vec!["tests"]);
        assert_eq!(package_path("app/models/user.rb", "rb"), vec!["models"]);
        assert!(package_path("Foo.java", "java").is_empty());
    }

    #[test]
    fn compatible_extension_groups() {
        assert!(extensions_compatible("ts", "tsx"));
        assert!(extensions_compatible("jsx", "js"));
        assert!(!extensions_compatible("ts", "js"));
        assert!(extensions_compatible("py", "py"));
    }

    #[test]
    fn tiers() {
        assert_eq!(tier("src/foo.py", "py", "src/test_foo.py"), TIER_SAME_DIR);
        assert_eq!(
            tier("app/models/user.rb", "rb", "spec/models/user_spec.rb"),
            TIER_MIRRORED_PACKAGE
        );
        assert_eq!(tier("src/foo.py", "py", "tests/test_foo.py"), TIER_TEST_DIR);
        assert_eq!(tier("src/foo.py", "py", "misc/foo_test.py"), TIER_OTHER);
    }

    #[test]
    fn unknown_extension_has_no_tests() {
        let index = FileIndex::from_paths("/repo", ["README.md", "test_README.md"]);
        assert!(TestMapper::new(&index).find_tests("README.md").is_empty());
    }
}
