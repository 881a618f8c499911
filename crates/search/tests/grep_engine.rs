use discovery_search::{GrepEngine, GrepOptions, TruncationReason};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn repo(files: &[(&str, &[u8])]) -> TempDir {
    let temp = tempdir().unwrap();
    for (rel, content) in files {
        let path = temp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    temp
}

fn engine(root: &Path, paths: &[&str], options: GrepOptions) -> GrepEngine {
    GrepEngine::new(
        root,
        paths.iter().map(|p| p.to_string()).collect(),
        options,
    )
}

#[test]
fn finds_one_match_per_file_with_line_numbers() {
    let temp = repo(&[
        ("src/foo.py", b"class FooService:\n    pass\n"),
        ("src/bar.py", b"import os\nfrom foo import FooService\n"),
    ]);
    let mut grep = engine(
        temp.path(),
        &["src/foo.py", "src/bar.py"],
        GrepOptions::default(),
    );

    let matches = grep.search("FooService", false);

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].file, "src/foo.py");
    assert_eq!(matches[0].line_number, 1);
    assert_eq!(matches[0].line, "class FooService:");
    assert_eq!(matches[1].file, "src/bar.py");
    assert_eq!(matches[1].line_number, 2);
    assert_eq!(matches[1].context_before, vec!["import os"]);
}

#[test]
fn ignore_case_flag_is_honoured() {
    let temp = repo(&[("a.txt", b"FooService\n")]);
    let mut grep = engine(temp.path(), &["a.txt"], GrepOptions::default());

    assert!(grep.search("fooservice", false).is_empty());
    assert_eq!(grep.search("fooservice", true).len(), 1);
}

#[test]
fn binary_files_never_match() {
    let temp = repo(&[
        ("blob.bin", b"FooService\x00\nFooService\n"),
        ("text.txt", b"FooService\n"),
    ]);
    let mut grep = engine(
        temp.path(),
        &["blob.bin", "text.txt"],
        GrepOptions::default(),
    );

    let (matches, meta) = grep.search_with_meta("FooService", false);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].file, "text.txt");
    assert_eq!(meta.files_searched, 2);
}

#[test]
fn marker_straddling_lead_chunk_boundary_stays_intact() {
    let marker = "UNIQUE_MARKER_STRADDLING_THE_BOUNDARY";
    let mut content = "a".repeat(8180);
    content.push('\n');
    let marker_start = content.len();
    content.push_str(marker);
    content.push('\n');
    assert!(marker_start < 8192 && marker_start + marker.len() > 8192);
    while content.len() <= 1_100_000 {
        content.push_str("filler line without the needle\n");
    }

    let temp = repo(&[("big.log", content.as_bytes())]);
    let mut grep = engine(temp.path(), &["big.log"], GrepOptions::default());

    let matches = grep.search(marker, false);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].line_number, 2);
    assert_eq!(matches[0].line, marker);
}

#[test]
fn batch_matches_each_pattern_independently() {
    let temp = repo(&[("a.txt", b"Foo and Bar together\nonly Foo\n")]);
    let mut grep = engine(temp.path(), &["a.txt"], GrepOptions::default());

    let batch = grep.search_batch_with_meta(&["Foo", "Bar", "Foo"], false);

    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.matches_for("Foo").len(), 2);
    assert_eq!(batch.matches_for("Bar").len(), 1);
    assert_eq!(batch.matches_for("Bar")[0].line_number, 1);
    assert_eq!(batch.meta.total_matches_found, 3);
    assert!(!batch.meta.was_truncated);

    // Single-pattern mode records at most one match per line.
    assert_eq!(grep.search("Foo|Bar", false).len(), 2);
}

#[test]
fn batch_truncates_before_opening_next_file() {
    let temp = repo(&[("a.txt", b"hit\nhit\n"), ("b.txt", b"hit\n")]);
    let options = GrepOptions {
        max_total_matches: 2,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt", "b.txt"], options);

    let batch = grep.search_batch_with_meta(&["hit"], false);

    assert_eq!(batch.meta.total_matches_found, 2);
    assert_eq!(batch.meta.files_searched, 1);
    assert_eq!(batch.meta.files_total, 2);
    assert!(batch.meta.was_truncated);
    assert_eq!(batch.meta.truncation_reason, TruncationReason::MaxTotal);
    assert!(batch
        .matches_for("hit")
        .iter()
        .all(|m| m.file == "a.txt"));
}

#[test]
fn batch_truncates_mid_file() {
    let temp = repo(&[("a.txt", b"hit\nhit\n"), ("b.txt", b"hit\nhit\n")]);
    let options = GrepOptions {
        max_total_matches: 3,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt", "b.txt"], options);

    let batch = grep.search_batch_with_meta(&["hit"], false);

    assert_eq!(batch.meta.total_matches_found, 3);
    assert_eq!(batch.meta.files_searched, 2);
    assert_eq!(batch.meta.truncation_reason, TruncationReason::MaxTotal);
    let in_b: Vec<usize> = batch
        .matches_for("hit")
        .iter()
        .filter(|m| m.file == "b.txt")
        .map(|m| m.line_number)
        .collect();
    assert_eq!(in_b, vec![1]);
}

#[test]
fn single_pattern_total_cap_truncates() {
    let temp = repo(&[("a.txt", b"hit\nhit\nhit\n")]);
    let options = GrepOptions {
        max_total_matches: 2,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt"], options);

    let (matches, meta) = grep.search_with_meta("hit", false);

    assert_eq!(matches.len(), 2);
    assert!(meta.was_truncated);
    assert_eq!(meta.truncation_reason, TruncationReason::MaxTotal);
}

#[test]
fn expired_deadline_truncates_with_timeout() {
    let temp = repo(&[("a.txt", b"hit\n")]);
    let options = GrepOptions {
        timeout: Duration::ZERO,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt"], options);

    let batch = grep.search_batch_with_meta(&["hit"], false);

    assert!(batch.matches_for("hit").is_empty());
    assert_eq!(batch.meta.files_searched, 0);
    assert!(batch.meta.was_truncated);
    assert_eq!(batch.meta.truncation_reason, TruncationReason::Timeout);
}

#[test]
fn deadline_is_checked_between_lines() {
    let mut big = Vec::new();
    for _ in 0..200_000 {
        big.extend_from_slice(b"filler line\n");
    }
    let temp = repo(&[("big.txt", big.as_slice()), ("small.txt", b"hit\n")]);
    let options = GrepOptions {
        timeout: Duration::from_millis(1),
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["big.txt", "small.txt"], options);

    let batch = grep.search_batch_with_meta(&["hit"], false);

    assert!(batch.matches_for("hit").is_empty());
    assert_eq!(batch.meta.files_searched, 1);
    assert_eq!(batch.meta.truncation_reason, TruncationReason::Timeout);
}

#[test]
fn unbounded_timeout_searches_everything() {
    let temp = repo(&[("a.txt", b"hit\n"), ("b.txt", b"hit again\n")]);
    let options = GrepOptions {
        timeout: Duration::MAX,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt", "b.txt"], options);

    let batch = grep.search_batch_with_meta(&["hit"], false);
    let (single, meta) = grep.search_with_meta("again", false);

    assert_eq!(batch.matches_for("hit").len(), 2);
    assert!(!batch.meta.was_truncated);
    assert_eq!(single.len(), 1);
    assert_eq!(meta.files_searched, 2);
}

#[test]
fn per_file_cap_applies_per_pattern() {
    let temp = repo(&[
        ("a.txt", b"x y\nx y\nx y\nx y\nx y\n"),
        ("b.txt", b"x\n"),
    ]);
    let options = GrepOptions {
        max_matches_per_file: 2,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt", "b.txt"], options);

    let batch = grep.search_batch_with_meta(&["x", "y"], false);

    assert_eq!(batch.matches_for("x").len(), 3);
    assert_eq!(batch.matches_for("y").len(), 2);
    assert!(!batch.meta.was_truncated);

    let single = grep.search("y", false);
    assert_eq!(single.len(), 2);
}

#[test]
fn completed_batch_fills_single_pattern_cache() {
    let temp = repo(&[("a.txt", b"Foo\n")]);
    let mut grep = engine(temp.path(), &["a.txt"], GrepOptions::default());

    grep.search_batch(&["Foo"], false);
    fs::write(temp.path().join("a.txt"), b"nothing here\n").unwrap();

    // Served from the cache, so the rewrite is not observed.
    assert_eq!(grep.search("Foo", false).len(), 1);
    // Different case-sensitivity is a different cache key.
    assert!(grep.search("Foo", true).is_empty());
}

#[test]
fn truncated_batch_leaves_cache_empty() {
    let temp = repo(&[("a.txt", b"Foo\n"), ("b.txt", b"Foo\n")]);
    let options = GrepOptions {
        max_total_matches: 1,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["a.txt", "b.txt"], options);

    assert!(grep.search_batch_with_meta(&["Foo"], false).meta.was_truncated);
    fs::write(temp.path().join("a.txt"), b"nothing\n").unwrap();

    let matches = grep.search("Foo", false);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].file, "b.txt");
}

#[test]
fn context_lines_are_captured() {
    let temp = repo(&[("a.txt", b"l1\nl2\nhit\nl4\nl5\nl6\n")]);
    let mut grep = engine(temp.path(), &["a.txt"], GrepOptions::default());

    let matches = grep.search("hit", false);
    assert_eq!(matches[0].context_before, vec!["l1", "l2"]);
    assert_eq!(matches[0].context_after, vec!["l4", "l5"]);

    let options = GrepOptions {
        context_lines: 0,
        ..GrepOptions::default()
    };
    let mut bare = engine(temp.path(), &["a.txt"], options);
    let matches = bare.search("hit", false);
    assert!(matches[0].context_before.is_empty());
    assert!(matches[0].context_after.is_empty());
}

#[test]
fn oversized_and_missing_files_are_skipped() {
    let temp = repo(&[("big.txt", b"hit hit hit hit hit\n"), ("ok.txt", b"hit\n")]);
    let options = GrepOptions {
        max_file_size: 10,
        ..GrepOptions::default()
    };
    let mut grep = engine(temp.path(), &["big.txt", "gone.txt", "ok.txt"], options);

    let (matches, meta) = grep.search_with_meta("hit", false);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].file, "ok.txt");
    assert_eq!(meta.files_searched, 3);
    assert_eq!(meta.files_total, 3);
    assert!(!meta.was_truncated);
}

#[test]
fn invalid_pattern_yields_no_matches() {
    let temp = repo(&[("a.txt", b"Foo(\n")]);
    let mut grep = engine(temp.path(), &["a.txt"], GrepOptions::default());

    let (matches, meta) = grep.search_with_meta("Foo(", false);
    assert!(matches.is_empty());
    assert!(!meta.was_truncated);

    let batch = grep.search_batch_with_meta(&["Foo(", "Foo"], false);
    assert!(batch.matches_for("Foo(").is_empty());
    assert_eq!(batch.matches_for("Foo").len(), 1);
}
