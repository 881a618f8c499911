use crate::config::DiscoveryConfig;
use crate::keywords::extract_keywords;
use crate::report::LocalDiscoveryReport;
use discovery_graph::ManifestParser;
use discovery_indexer::paths::parent_dir;
use discovery_indexer::FileIndex;
use discovery_search::{GrepEngine, PatternMatches, TestMapper};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Runs indexing, manifest parsing, keyword search and test mapping for one repository.
///
/// Never fails: a step that cannot run leaves its part of the report empty and adds a line to
/// [`LocalDiscoveryReport::diagnostics`].
pub struct ContextBuilder {
    root: PathBuf,
    config: DiscoveryConfig,
}

impl ContextBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_config(root, DiscoveryConfig::default())
    }

    pub fn with_config(root: impl AsRef<Path>, config: DiscoveryConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Build the index, or reuse `index` when the caller already has one.
    pub fn build<S: AsRef<str>>(
        &self,
        keywords: &[S],
        index: Option<&FileIndex>,
    ) -> LocalDiscoveryReport {
        let owned;
        let index = match index {
            Some(index) => index,
            None => match FileIndex::build_with_source(
                &self.root,
                self.config.max_files,
                self.config.listing,
            ) {
                Ok(built) => {
                    owned = built;
                    &owned
                }
                Err(err) => {
                    log::warn!("Discovery skipped for {}: {err}", self.root.display());
                    return LocalDiscoveryReport::empty(format!("File index unavailable: {err}"));
                }
            },
        };

        if index.is_empty() {
            log::info!("No files indexed under {}", index.root().display());
            return LocalDiscoveryReport::empty("No files indexed");
        }

        let mut report = LocalDiscoveryReport {
            file_count: index.file_count(),
            module_graph: ManifestParser::new(index.root()).parse(),
            ..LocalDiscoveryReport::default()
        };

        let keywords = clean_keywords(keywords);
        if keywords.is_empty() {
            return report;
        }
        report.keywords = keywords;

        let scope = self.search_scope(index, &report.keywords);
        report.scoped_search = scope.is_some();
        let paths = scope.unwrap_or_else(|| index.paths().to_vec());

        let patterns: Vec<String> = report.keywords.iter().map(|k| regex::escape(k)).collect();
        let mut grep = GrepEngine::new(index.root(), paths, self.config.grep.to_options());
        let batch = grep.search_batch_with_meta(&patterns, false);
        if batch.meta.was_truncated {
            report.diagnostics.push(format!(
                "Keyword search truncated ({}) after {} of {} files",
                batch.meta.truncation_reason.as_str(),
                batch.meta.files_searched,
                batch.meta.files_total
            ));
        }
        report.matches = report
            .keywords
            .iter()
            .zip(batch.results)
            .map(|(keyword, found)| PatternMatches {
                pattern: keyword.clone(),
                matches: found.matches,
            })
            .collect();
        report.search_meta = Some(batch.meta);

        let mut sources = report.matched_files();
        if sources.len() > self.config.max_mapped_sources {
            report.diagnostics.push(format!(
                "Test mapping limited to the first {} of {} matched files",
                self.config.max_mapped_sources,
                sources.len()
            ));
            sources.truncate(self.config.max_mapped_sources);
        }
        report.test_mappings = TestMapper::new(index).map_all(&sources);

        log::debug!(
            "Discovery: {} files, {} modules, {} matches, {} mapped sources",
            report.file_count,
            report.module_graph.modules.len(),
            report.total_matches(),
            report.test_mappings.len()
        );
        report
    }

    /// Extract keywords from free text (ticket, plan, question) and build.
    pub fn build_from_text(&self, text: &str, index: Option<&FileIndex>) -> LocalDiscoveryReport {
        let keywords = extract_keywords(text, self.config.max_keywords);
        self.build(&keywords, index)
    }

    /// Narrowed path list for large repositories, `None` to search everything.
    fn search_scope(&self, index: &FileIndex, keywords: &[String]) -> Option<Vec<String>> {
        if index.file_count() <= self.config.large_repo_threshold {
            return None;
        }

        let named: Vec<String> = keywords
            .iter()
            .flat_map(|keyword| index.find_by_stem(keyword))
            .collect();
        let mut dirs: BTreeSet<&str> = BTreeSet::new();
        for path in &named {
            let parent = parent_dir(path);
            if parent.is_empty() {
                continue;
            }
            dirs.insert(parent);
            let grandparent = parent_dir(parent);
            if !grandparent.is_empty() {
                dirs.insert(grandparent);
            }
        }

        let scoped: Vec<String> = index
            .paths()
            .iter()
            .filter(|path| {
                dirs.iter().any(|dir| {
                    path.len() > dir.len()
                        && path.starts_with(*dir)
                        && path.as_bytes()[dir.len()] == b'/'
                })
            })
            .cloned()
            .collect();

        if scoped.is_empty() {
            log::debug!("No keyword directories found; searching all {} files", index.file_count());
            None
        } else {
            log::info!(
                "Large repository ({} files): searching {} files under {} keyword directories",
                index.file_count(),
                scoped.len(),
                dirs.len()
            );
            Some(scoped)
        }
    }
}

/// Trimmed, non-empty, exact duplicates removed, order kept.
fn clean_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.as_ref().trim();
        if !keyword.is_empty() && !cleaned.iter().any(|seen| seen == keyword) {
            cleaned.push(keyword.to_string());
        }
    }
    cleaned
}
