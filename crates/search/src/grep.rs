use crate::reader;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Limits applied to every search call of a [`GrepEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepOptions {
    /// Lines of context captured before and after each match
    pub context_lines: usize,

    /// Matches kept per file (per pattern in batch mode)
    pub max_matches_per_file: usize,

    /// Matches kept across all files and patterns of one call
    pub max_total_matches: usize,

    /// Files larger than this are skipped without being opened
    pub max_file_size: u64,

    /// Wall-clock budget of one call, checked between files and between lines
    pub timeout: Duration,
}

impl Default for GrepOptions {
    fn default() -> Self {
        Self {
            context_lines: 2,
            max_matches_per_file: 20,
            max_total_matches: 200,
            max_file_size: 5 * 1024 * 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepMatch {
    pub file: String,
    /// 1-based
    pub line_number: usize,
    pub line: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_after: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    #[default]
    None,
    MaxTotal,
    Timeout,
}

impl TruncationReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::MaxTotal => "max_total",
            Self::Timeout => "timeout",
        }
    }
}

/// Bookkeeping for one search call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMeta {
    pub total_matches_found: usize,
    pub files_searched: usize,
    pub files_total: usize,
    pub was_truncated: bool,
    pub truncation_reason: TruncationReason,
}

impl SearchMeta {
    fn for_files(files_total: usize) -> Self {
        Self {
            files_total,
            ..Self::default()
        }
    }

    fn truncate(&mut self, reason: TruncationReason) {
        self.was_truncated = true;
        self.truncation_reason = reason;
    }
}

/// Matches of one pattern from a batch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatches {
    pub pattern: String,
    pub matches: Vec<GrepMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// One entry per distinct input pattern, in input order
    pub results: Vec<PatternMatches>,
    pub meta: SearchMeta,
}

impl BatchResult {
    pub fn matches_for(&self, pattern: &str) -> &[GrepMatch] {
        self.results
            .iter()
            .find(|entry| entry.pattern == pattern)
            .map(|entry| entry.matches.as_slice())
            .unwrap_or(&[])
    }
}

type CacheKey = (String, bool);

/// Regex search over a fixed list of repository-relative paths.
///
/// Files are scanned in the order of the path list, which decides what survives when the
/// total cap truncates a search. Single-pattern results are cached per (pattern, case) for the
/// engine's lifetime. The timeout is cooperative: a single long line or a pathological
/// pattern can overrun it before the next check.
pub struct GrepEngine {
    root: PathBuf,
    paths: Vec<String>,
    options: GrepOptions,
    cache: HashMap<CacheKey, (Vec<GrepMatch>, SearchMeta)>,
}

impl GrepEngine {
    pub fn new(root: impl AsRef<Path>, paths: Vec<String>, options: GrepOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            paths,
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &GrepOptions {
        &self.options
    }

    pub fn search(&mut self, pattern: &str, ignore_case: bool) -> Vec<GrepMatch> {
        self.search_with_meta(pattern, ignore_case).0
    }

    /// At most one match per line. An invalid pattern yields no matches.
    pub fn search_with_meta(
        &mut self,
        pattern: &str,
        ignore_case: bool,
    ) -> (Vec<GrepMatch>, SearchMeta) {
        let key = (pattern.to_string(), ignore_case);
        if let Some((matches, meta)) = self.cache.get(&key) {
            return (matches.clone(), meta.clone());
        }

        let Some(regex) = compile(pattern, ignore_case) else {
            return (Vec::new(), SearchMeta::for_files(self.paths.len()));
        };

        let (matches, meta) = self.scan_first_match(&[regex]);
        self.cache.insert(key, (matches.clone(), meta.clone()));
        (matches, meta)
    }

    pub fn search_batch<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        ignore_case: bool,
    ) -> Vec<PatternMatches> {
        self.search_batch_with_meta(patterns, ignore_case).results
    }

    /// Read every file once and test every pattern on every line.
    ///
    /// A line can match several patterns. The per-file cap applies per pattern; the total cap
    /// is shared. Truncation happens either before a new file is opened (total already
    /// reached) or mid-file (a match would exceed the total). Untruncated per-pattern results
    /// seed the single-pattern cache.
    pub fn search_batch_with_meta<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        ignore_case: bool,
    ) -> BatchResult {
        let mut distinct: Vec<String> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if !distinct.iter().any(|seen| seen == pattern) {
                distinct.push(pattern.to_string());
            }
        }

        let compiled: Vec<Option<Regex>> = distinct
            .iter()
            .map(|pattern| compile(pattern, ignore_case))
            .collect();
        let active: Vec<(usize, &Regex)> = compiled
            .iter()
            .enumerate()
            .filter_map(|(slot, regex)| regex.as_ref().map(|re| (slot, re)))
            .collect();

        let limits = &self.options;
        let deadline = Deadline::after(limits.timeout);
        let mut meta = SearchMeta::for_files(self.paths.len());
        let mut found: Vec<Vec<GrepMatch>> = vec![Vec::new(); distinct.len()];

        'files: for rel in &self.paths {
            if active.is_empty() {
                break;
            }
            if meta.total_matches_found >= limits.max_total_matches {
                meta.truncate(TruncationReason::MaxTotal);
                break;
            }
            if deadline.expired() {
                meta.truncate(TruncationReason::Timeout);
                break;
            }
            meta.files_searched += 1;

            let Some(lines) = self.load(rel) else {
                continue;
            };

            let mut per_file = vec![0usize; distinct.len()];
            for (idx, line) in lines.iter().enumerate() {
                if deadline.expired() {
                    meta.truncate(TruncationReason::Timeout);
                    break 'files;
                }
                for &(slot, regex) in &active {
                    if per_file[slot] >= limits.max_matches_per_file || !regex.is_match(line) {
                        continue;
                    }
                    if meta.total_matches_found >= limits.max_total_matches {
                        meta.truncate(TruncationReason::MaxTotal);
                        break 'files;
                    }
                    found[slot].push(self.make_match(rel, &lines, idx));
                    per_file[slot] += 1;
                    meta.total_matches_found += 1;
                }
                if active
                    .iter()
                    .all(|&(slot, _)| per_file[slot] >= limits.max_matches_per_file)
                {
                    break;
                }
            }
        }

        if !meta.was_truncated {
            for &(slot, _) in &active {
                let pattern_meta = SearchMeta {
                    total_matches_found: found[slot].len(),
                    files_searched: meta.files_searched,
                    files_total: meta.files_total,
                    was_truncated: false,
                    truncation_reason: TruncationReason::None,
                };
                self.cache.insert(
                    (distinct[slot].clone(), ignore_case),
                    (found[slot].clone(), pattern_meta),
                );
            }
        }

        let results = distinct
            .into_iter()
            .zip(found)
            .map(|(pattern, matches)| PatternMatches { pattern, matches })
            .collect();

        BatchResult { results, meta }
    }

    /// Record the first matching pattern per line.
    fn scan_first_match(&self, patterns: &[Regex]) -> (Vec<GrepMatch>, SearchMeta) {
        let limits = &self.options;
        let deadline = Deadline::after(limits.timeout);
        let mut meta = SearchMeta::for_files(self.paths.len());
        let mut matches = Vec::new();

        'files: for rel in &self.paths {
            if meta.total_matches_found >= limits.max_total_matches {
                meta.truncate(TruncationReason::MaxTotal);
                break;
            }
            if deadline.expired() {
                meta.truncate(TruncationReason::Timeout);
                break;
            }
            meta.files_searched += 1;

            let Some(lines) = self.load(rel) else {
                continue;
            };

            let mut in_file = 0usize;
            for (idx, line) in lines.iter().enumerate() {
                if in_file >= limits.max_matches_per_file {
                    break;
                }
                if deadline.expired() {
                    meta.truncate(TruncationReason::Timeout);
                    break 'files;
                }
                if !patterns.iter().any(|re| re.is_match(line)) {
                    continue;
                }
                if meta.total_matches_found >= limits.max_total_matches {
                    meta.truncate(TruncationReason::MaxTotal);
                    break 'files;
                }
                matches.push(self.make_match(rel, &lines, idx));
                in_file += 1;
                meta.total_matches_found += 1;
            }
        }

        (matches, meta)
    }

    /// Admit and decode one file. Oversized, binary and unreadable files yield `None`.
    fn load(&self, rel: &str) -> Option<Vec<String>> {
        let path = self.root.join(rel);
        let meta = fs::metadata(&path).ok()?;
        if !meta.is_file() {
            return None;
        }
        if meta.len() > self.options.max_file_size {
            log::debug!(
                "Skipping {rel}: {} bytes exceeds limit of {}",
                meta.len(),
                self.options.max_file_size
            );
            return None;
        }

        match reader::read_lines(&path, meta.len()) {
            Ok(Some(decoded)) => {
                if decoded.replaced {
                    log::debug!("Replaced undecodable bytes while reading {rel}");
                }
                Some(decoded.lines)
            }
            Ok(None) => {
                log::debug!("Skipping binary file {rel}");
                None
            }
            Err(_) => None,
        }
    }

    fn make_match(&self, rel: &str, lines: &[String], idx: usize) -> GrepMatch {
        let n = self.options.context_lines;
        let (context_before, context_after) = if n == 0 {
            (Vec::new(), Vec::new())
        } else {
            let before = lines[idx.saturating_sub(n)..idx].to_vec();
            let end = lines.len().min(idx + 1 + n);
            let after = lines[idx + 1..end].to_vec();
            (before, after)
        };

        GrepMatch {
            file: rel.to_string(),
            line_number: idx + 1,
            line: lines[idx].clone(),
            context_before,
            context_after,
        }
    }
}

/// Search deadline; a timeout too large to represent never expires.
#[derive(Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    fn expired(self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

fn compile(pattern: &str, ignore_case: bool) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("Invalid search pattern '{pattern}': {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn context_is_clamped_to_file_bounds() {
        let engine = GrepEngine::new(
            "/unused",
            Vec::new(),
            GrepOptions {
                context_lines: 2,
                ..GrepOptions::default()
            },
        );
        let lines: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let first = engine.make_match("f.txt", &lines, 0);
        assert!(first.context_before.is_empty());
        assert_eq!(first.context_after, vec!["b", "c"]);

        let last = engine.make_match("f.txt", &lines, 2);
        assert_eq!(last.context_before, vec!["a", "b"]);
        assert!(last.context_after.is_empty());
        assert_eq!(last.line_number, 3);
    }

    #[test]
    fn batch_result_lookup_by_pattern() {
        let result = BatchResult {
            results: vec![PatternMatches {
                pattern: "Foo".to_string(),
                matches: Vec::new(),
            }],
            meta: SearchMeta::default(),
        };
        assert!(result.matches_for("Foo").is_empty());
        assert!(result.matches_for("Bar").is_empty());
    }
}
