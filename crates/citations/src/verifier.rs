use crate::identifiers::extract_identifiers;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Marker prefix shared by every annotation this verifier writes.
pub const MARKER_PREFIX: &str = "<!-- CITATION_";

/// How far below a citation its code fence may start.
const FENCE_WINDOW: usize = 3;

/// Identifiers listed per side in a mismatch marker.
const MARKER_LIST_LIMIT: usize = 5;

pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.5;

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w*])\*{0,2}Source:\*{0,2}\s*`?([^\s`:]+):(\d+)(?:\s*-\s*(\d+))?`?")
            .expect("valid regex")
    })
}

/// Outcome of checking one citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationCheck {
    pub file: String,
    /// 1-based, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub verified: bool,
    /// Identifiers found in the quoted snippet
    pub expected: BTreeSet<String>,
    /// Identifiers found in the cited range on disk
    pub found: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CitationCheck {
    fn line_label(&self) -> String {
        if self.start_line == self.end_line {
            format!("{}:{}", self.file, self.start_line)
        } else {
            format!("{}:{}-{}", self.file, self.start_line, self.end_line)
        }
    }

    /// Inline HTML comment appended to the citation line.
    pub fn marker(&self) -> String {
        if let Some(reason) = &self.reason {
            return format!("{MARKER_PREFIX}UNREADABLE: {reason} -->");
        }
        if self.verified {
            return format!("{MARKER_PREFIX}VERIFIED -->");
        }
        format!(
            "{MARKER_PREFIX}MISMATCH: expected [{}] at {} but found [{}] -->",
            preview(&self.expected),
            self.line_label(),
            preview(&self.found)
        )
    }
}

fn preview(ids: &BTreeSet<String>) -> String {
    ids.iter()
        .take(MARKER_LIST_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Annotated text plus one record per checked citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub text: String,
    pub checks: Vec<CitationCheck>,
}

impl VerificationReport {
    pub fn verified_count(&self) -> usize {
        self.checks.iter().filter(|check| check.verified).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CitationCheck> {
        self.checks.iter().filter(|check| !check.verified)
    }
}

#[derive(Debug, Error)]
enum ReadFailure {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("{0} is outside the repository root")]
    OutsideRoot(String),

    #[error("line {start} is beyond end of file ({len} lines)")]
    BeyondEnd { start: usize, len: usize },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Re-reads cited line ranges from disk and compares them with the quoted snippets.
pub struct CitationVerifier {
    root: PathBuf,
    overlap_threshold: f64,
}

impl CitationVerifier {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }

    pub fn with_overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    pub fn overlap_threshold(&self) -> f64 {
        self.overlap_threshold
    }

    /// Check every `Source: path:start[-end]` line that is followed by a code fence.
    ///
    /// Citations without a fence in the next few lines are left untouched, as are lines that
    /// already carry a marker.
    pub fn verify_citations(&self, text: &str) -> VerificationReport {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let mut checks = Vec::new();

        for idx in 0..lines.len() {
            if lines[idx].contains(MARKER_PREFIX) {
                continue;
            }
            let Some((file, start, end)) = parse_citation(&lines[idx]) else {
                continue;
            };
            let Some(snippet) = snippet_after(&lines, idx) else {
                log::debug!("Citation {file}:{start} has no code block nearby; skipping");
                continue;
            };

            let check = self.check(file, start, end, &snippet);
            append_marker(&mut lines[idx], &check.marker());
            checks.push(check);
        }

        VerificationReport {
            text: lines.join("\n"),
            checks,
        }
    }

    fn check(&self, file: String, start: usize, end: usize, snippet: &[String]) -> CitationCheck {
        let expected = extract_identifiers(snippet);
        let mut check = CitationCheck {
            file,
            start_line: start,
            end_line: end,
            verified: false,
            expected,
            found: BTreeSet::new(),
            reason: None,
        };

        match self.read_range(&check.file, start, end) {
            Ok(cited) => {
                check.found = extract_identifiers(&cited);
                check.verified = self.overlap_ok(&check.expected, &check.found);
            }
            Err(failure) => {
                log::debug!("Citation {}:{start} unreadable: {failure}", check.file);
                check.reason = Some(failure.to_string());
            }
        }
        check
    }

    fn overlap_ok(&self, expected: &BTreeSet<String>, found: &BTreeSet<String>) -> bool {
        if expected.is_empty() {
            return true;
        }
        let shared = expected.intersection(found).count();
        shared as f64 / expected.len() as f64 >= self.overlap_threshold
    }

    /// Lines `start..=end` of `file`, clamped to the end of the file.
    fn read_range(
        &self,
        file: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<String>, ReadFailure> {
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let path = root
            .join(file)
            .canonicalize()
            .map_err(|_| ReadFailure::NotFound(file.to_string()))?;
        if !path.starts_with(&root) {
            return Err(ReadFailure::OutsideRoot(file.to_string()));
        }
        if !path.is_file() {
            return Err(ReadFailure::NotFound(file.to_string()));
        }

        let bytes = fs::read(&path).map_err(|source| ReadFailure::Io {
            path: file.to_string(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let all: Vec<&str> = content.lines().collect();
        if start > all.len() {
            return Err(ReadFailure::BeyondEnd {
                start,
                len: all.len(),
            });
        }

        let last = end.min(all.len());
        Ok(all[start - 1..last].iter().map(|line| line.to_string()).collect())
    }
}

/// Citation target of a line, with the range normalized to `1 <= start <= end`.
fn parse_citation(line: &str) -> Option<(String, usize, usize)> {
    let caps = citation_re().captures(line)?;
    let file = caps[1].to_string();
    let start: usize = caps[2].parse().ok()?;
    let end: usize = match caps.get(3) {
        Some(end) => end.as_str().parse().ok()?,
        None => start,
    };
    let start = start.max(1);
    Some((file, start, end.max(start)))
}

/// Body of the first code fence opening within the window below `citation`.
fn snippet_after(lines: &[String], citation: usize) -> Option<Vec<String>> {
    let last = lines.len().min(citation + 1 + FENCE_WINDOW);
    let fence = (citation + 1..last).find(|&idx| lines[idx].trim_start().starts_with("```"))?;

    Some(
        lines[fence + 1..]
            .iter()
            .take_while(|line| !line.trim_start().starts_with("```"))
            .cloned()
            .collect(),
    )
}

fn append_marker(line: &mut String, marker: &str) {
    let had_cr = line.ends_with('\r');
    if had_cr {
        line.pop();
    }
    line.push(' ');
    line.push_str(marker);
    if had_cr {
        line.push('\r');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_citation_forms() {
        assert_eq!(
            parse_citation("**Source:** `src/app.py:10-20`"),
            Some(("src/app.py".to_string(), 10, 20))
        );
        assert_eq!(
            parse_citation("Source: lib/a.rs:7"),
            Some(("lib/a.rs".to_string(), 7, 7))
        );
        assert_eq!(
            parse_citation("Source: lib/a.rs:9-3"),
            Some(("lib/a.rs".to_string(), 9, 9))
        );
        assert_eq!(parse_citation("See lib/a.rs:7"), None);
        assert_eq!(parse_citation("The DataSource: config.py:3 wiring"), None);
        assert_eq!(
            parse_citation("Details in - Source: lib/a.rs:7"),
            Some(("lib/a.rs".to_string(), 7, 7))
        );
    }

    #[test]
    fn markers_never_look_like_citations() {
        let check = CitationCheck {
            file: "src/app.py".to_string(),
            start_line: 1,
            end_line: 3,
            verified: false,
            expected: ["Alpha".to_string()].into_iter().collect(),
            found: BTreeSet::new(),
            reason: None,
        };
        let marker = check.marker();
        assert_eq!(
            marker,
            "<!-- CITATION_MISMATCH: expected [Alpha] at src/app.py:1-3 but found [] -->"
        );
        assert!(parse_citation(&marker).is_none());
    }

    #[test]
    fn fence_must_open_within_window() {
        let lines: Vec<String> = ["Source: a.py:1", "", "", "", "```", "x", "```"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(snippet_after(&lines, 0).is_none());
        assert_eq!(snippet_after(&lines, 1), Some(vec!["x".to_string()]));
    }
}
