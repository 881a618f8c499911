use discovery_graph::ModuleGraph;
use discovery_search::{GrepMatch, PatternMatches, SearchMeta};
use serde::Serialize;
use std::collections::BTreeMap;

const MATCHES_SHOWN_PER_KEYWORD: usize = 5;
const TESTS_SHOWN_PER_SOURCE: usize = 3;
const LINE_PREVIEW_CHARS: usize = 160;

/// Everything one discovery pass learned about a repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocalDiscoveryReport {
    pub file_count: usize,
    pub module_graph: ModuleGraph,
    pub keywords: Vec<String>,
    /// Matches per keyword, in keyword order
    pub matches: Vec<PatternMatches>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_meta: Option<SearchMeta>,
    /// Source file -> ranked candidate tests
    pub test_mappings: BTreeMap<String, Vec<String>>,
    /// Search was narrowed to keyword directories because the repository is large
    pub scoped_search: bool,
    /// One line per step that degraded
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl LocalDiscoveryReport {
    pub(crate) fn empty(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![diagnostic.into()],
            ..Self::default()
        }
    }

    pub fn total_matches(&self) -> usize {
        self.matches.iter().map(|entry| entry.matches.len()).sum()
    }

    /// Files with at least one match, in first-seen order.
    pub fn matched_files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for entry in &self.matches {
            for hit in &entry.matches {
                if !files.contains(&hit.file) {
                    files.push(hit.file.clone());
                }
            }
        }
        files
    }

    /// Render as markdown of at most `budget` characters plus a truncation note.
    pub fn to_markdown(&self, budget: usize) -> String {
        let mut doc = MarkdownDoc::new();
        doc.push_line("# Local Discovery");
        doc.push_blank();
        doc.push_line(&format!("Indexed files: {}", self.file_count));

        self.push_modules(&mut doc);
        self.push_matches(&mut doc);
        self.push_tests(&mut doc);

        if !self.diagnostics.is_empty() {
            doc.push_blank();
            doc.push_line("## Notes");
            doc.push_blank();
            for line in &self.diagnostics {
                doc.push_line(&format!("- {line}"));
            }
        }

        doc.finish_bounded(budget)
    }

    fn push_modules(&self, doc: &mut MarkdownDoc) {
        let graph = &self.module_graph;
        doc.push_blank();
        doc.push_line("## Module Structure");
        doc.push_blank();
        if graph.is_empty() {
            doc.push_line("_No build manifest detected._");
            return;
        }
        doc.push_line(&format!(
            "Project type: {} ({} modules)",
            graph.project_type,
            graph.modules.len()
        ));
        doc.push_blank();
        for module in &graph.modules {
            let deps = graph.dependencies_of(&module.name);
            if deps.is_empty() {
                doc.push_line(&format!("- `{}` at `{}`", module.name, module.path));
            } else {
                doc.push_line(&format!(
                    "- `{}` at `{}` -> depends on {}",
                    module.name,
                    module.path,
                    deps.iter()
                        .map(|dep| format!("`{dep}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }
    }

    fn push_matches(&self, doc: &mut MarkdownDoc) {
        if self.keywords.is_empty() {
            return;
        }
        doc.push_blank();
        doc.push_line("## Keyword Matches");
        doc.push_blank();

        if let Some(meta) = &self.search_meta {
            let mut summary = format!(
                "Searched {} of {} files, {} matches",
                meta.files_searched, meta.files_total, meta.total_matches_found
            );
            if meta.was_truncated {
                summary.push_str(&format!(
                    " (truncated: {})",
                    meta.truncation_reason.as_str()
                ));
            }
            doc.push_line(&summary);
        }
        if self.scoped_search {
            doc.push_line("_Large repository: search limited to directories named after keywords._");
        }

        for entry in &self.matches {
            doc.push_blank();
            doc.push_line(&format!(
                "### `{}` ({} matches)",
                entry.pattern,
                entry.matches.len()
            ));
            if entry.matches.is_empty() {
                doc.push_line("_No matches._");
                continue;
            }
            for hit in entry.matches.iter().take(MATCHES_SHOWN_PER_KEYWORD) {
                doc.push_line(&match_line(hit));
            }
            let hidden = entry.matches.len().saturating_sub(MATCHES_SHOWN_PER_KEYWORD);
            if hidden > 0 {
                doc.push_line(&format!("- _+{hidden} more_"));
            }
        }
    }

    fn push_tests(&self, doc: &mut MarkdownDoc) {
        if self.test_mappings.is_empty() {
            return;
        }
        doc.push_blank();
        doc.push_line("## Test Mappings");
        doc.push_blank();
        for (source, tests) in &self.test_mappings {
            let shown = tests
                .iter()
                .take(TESTS_SHOWN_PER_SOURCE)
                .map(|test| format!("`{test}`"))
                .collect::<Vec<_>>()
                .join(", ");
            let hidden = tests.len().saturating_sub(TESTS_SHOWN_PER_SOURCE);
            if hidden > 0 {
                doc.push_line(&format!("- `{source}` -> {shown} (+{hidden} more)"));
            } else {
                doc.push_line(&format!("- `{source}` -> {shown}"));
            }
        }
    }
}

fn match_line(hit: &GrepMatch) -> String {
    let text = hit.line.trim();
    let preview: String = text.chars().take(LINE_PREVIEW_CHARS).collect();
    let ellipsis = if text.chars().count() > LINE_PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    format!(
        "- `{}:{}`: `{}{ellipsis}`",
        hit.file,
        hit.line_number,
        preview.replace('`', "'")
    )
}

struct MarkdownDoc {
    out: String,
}

impl MarkdownDoc {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn push_line(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn push_blank(&mut self) {
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out.push('\n');
    }

    /// Cut at the last line break within `max_chars` (characters, not bytes).
    fn finish_bounded(self, max_chars: usize) -> String {
        let raw = self.out;
        if raw.chars().count() <= max_chars {
            return raw;
        }
        let cut = raw
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(raw.len());
        let head = &raw[..cut];
        let head = match head.rfind('\n') {
            Some(idx) => &head[..idx],
            None => head,
        };
        format!("{head}\n_[truncated: report exceeded {max_chars} characters]_")
    }
}
