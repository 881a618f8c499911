use discovery_context::{ContextBuilder, DiscoveryConfig};
use discovery_graph::ProjectType;
use discovery_indexer::{FileIndex, ListingSource};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn index_of(root: &Path, files: &[(&str, &str)]) -> FileIndex {
    for (rel, content) in files {
        write(root, rel, content);
    }
    FileIndex::from_paths(root, files.iter().map(|(rel, _)| *rel))
}

#[test]
fn walk_listing_end_to_end() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(
        root,
        "pom.xml",
        "<project><artifactId>orders</artifactId></project>",
    );
    write(
        root,
        "src/main/java/com/acme/OrderService.java",
        "package com.acme;\n\npublic class OrderService {}\n",
    );
    write(
        root,
        "src/test/java/com/acme/OrderServiceTest.java",
        "package com.acme;\n\nclass OrderServiceTest { OrderService service; }\n",
    );
    let config = DiscoveryConfig {
        listing: ListingSource::Walk,
        ..DiscoveryConfig::default()
    };

    let report = ContextBuilder::with_config(root, config).build(&["OrderService"], None);

    assert_eq!(report.file_count, 3);
    assert_eq!(report.module_graph.project_type, ProjectType::Maven);
    assert_eq!(report.module_graph.module_names(), vec!["orders"]);
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].pattern, "OrderService");
    assert_eq!(report.matches[0].matches.len(), 2);
    assert_eq!(
        report.test_mappings["src/main/java/com/acme/OrderService.java"],
        vec!["src/test/java/com/acme/OrderServiceTest.java"]
    );
    assert!(!report.scoped_search);

    let markdown = report.to_markdown(12_000);
    assert!(markdown.contains("## Module Structure"));
    assert!(markdown.contains("### `OrderService` (2 matches)"));
    assert!(markdown.contains("## Test Mappings"));
}

#[test]
fn large_repository_search_is_narrowed_to_keyword_directories() {
    let temp = tempdir().unwrap();
    let index = index_of(
        temp.path(),
        &[
            ("billing/invoice/Invoice.java", "class Invoice {}\n"),
            ("billing/Ledger.java", "Invoice ref;\n"),
            ("unrelated/Report.java", "Invoice mention;\n"),
        ],
    );
    let config = DiscoveryConfig {
        large_repo_threshold: 2,
        ..DiscoveryConfig::default()
    };

    let report = ContextBuilder::with_config(temp.path(), config).build(&["Invoice"], Some(&index));

    assert!(report.scoped_search);
    let meta = report.search_meta.as_ref().unwrap();
    assert_eq!(meta.files_total, 2);
    assert_eq!(
        report.matched_files(),
        vec!["billing/invoice/Invoice.java", "billing/Ledger.java"]
    );
}

#[test]
fn narrowing_falls_back_to_all_files() {
    let temp = tempdir().unwrap();
    let index = index_of(
        temp.path(),
        &[
            ("a/One.java", "nothing\n"),
            ("b/Two.java", "mention here\n"),
            ("c/Three.java", "nothing\n"),
        ],
    );
    let config = DiscoveryConfig {
        large_repo_threshold: 2,
        ..DiscoveryConfig::default()
    };

    let report = ContextBuilder::with_config(temp.path(), config).build(&["mention"], Some(&index));

    assert!(!report.scoped_search);
    assert_eq!(report.search_meta.as_ref().unwrap().files_total, 3);
    assert_eq!(report.matched_files(), vec!["b/Two.java"]);
}

#[test]
fn keywords_are_searched_literally() {
    let temp = tempdir().unwrap();
    let index = index_of(
        temp.path(),
        &[("conf.py", "load app.settings\nload appxsettings\n")],
    );

    let report = ContextBuilder::new(temp.path()).build(&["app.settings", " ", "app.settings"], Some(&index));

    assert_eq!(report.keywords, vec!["app.settings"]);
    assert_eq!(report.matches[0].matches.len(), 1);
    assert_eq!(report.matches[0].matches[0].line_number, 1);
}

#[test]
fn free_text_drives_keyword_search() {
    let temp = tempdir().unwrap();
    let index = index_of(
        temp.path(),
        &[
            ("src/InvoiceTotals.py", "class InvoiceTotals:\n    pass\n"),
            ("tests/test_InvoiceTotals.py", "from src import InvoiceTotals\n"),
        ],
    );

    let report = ContextBuilder::new(temp.path())
        .build_from_text("Please fix InvoiceTotals rounding, see InvoiceTotals docs", Some(&index));

    assert_eq!(report.keywords, vec!["InvoiceTotals"]);
    assert_eq!(report.total_matches(), 2);
    assert_eq!(
        report.test_mappings["src/InvoiceTotals.py"],
        vec!["tests/test_InvoiceTotals.py"]
    );
}

#[test]
fn no_keywords_means_no_search() {
    let temp = tempdir().unwrap();
    let index = index_of(temp.path(), &[("go.mod", "module example.com/shop\n")]);

    let report = ContextBuilder::new(temp.path()).build::<&str>(&[], Some(&index));

    assert_eq!(report.file_count, 1);
    assert_eq!(report.module_graph.project_type, ProjectType::Go);
    assert!(report.search_meta.is_none());
    assert!(report.matches.is_empty());
    assert!(!report.to_markdown(12_000).contains("## Keyword Matches"));
}

#[test]
fn empty_index_short_circuits() {
    let temp = tempdir().unwrap();
    write(temp.path(), "pom.xml", "<project><artifactId>x</artifactId></project>");
    let index = FileIndex::from_paths(temp.path(), Vec::<String>::new());

    let report = ContextBuilder::new(temp.path()).build(&["Anything"], Some(&index));

    assert_eq!(report.file_count, 0);
    assert!(report.module_graph.is_empty());
    assert_eq!(report.diagnostics, vec!["No files indexed"]);
}

#[test]
fn missing_root_degrades_to_empty_report() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("does-not-exist");

    let report = ContextBuilder::new(&missing).build(&["Anything"], None);

    assert_eq!(report.file_count, 0);
    assert!(report.diagnostics[0].starts_with("File index unavailable"));
    assert!(report.to_markdown(12_000).contains("## Notes"));
}

#[test]
fn truncated_search_is_reported() {
    let temp = tempdir().unwrap();
    let index = index_of(
        temp.path(),
        &[("a.txt", "Widget\nWidget\n"), ("b.txt", "Widget\n")],
    );
    let mut config = DiscoveryConfig::default();
    config.grep.max_total_matches = 2;

    let report = ContextBuilder::with_config(temp.path(), config).build(&["Widget"], Some(&index));

    assert!(report.search_meta.as_ref().unwrap().was_truncated);
    assert!(report.diagnostics[0].starts_with("Keyword search truncated (max_total)"));
    assert!(report.to_markdown(12_000).contains("(truncated: max_total)"));
}

#[test]
fn report_serializes_to_json() {
    let temp = tempdir().unwrap();
    let index = index_of(temp.path(), &[("main.go", "package main\n")]);

    let report = ContextBuilder::new(temp.path()).build(&["main"], Some(&index));
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["file_count"], 1);
    assert_eq!(json["module_graph"]["project_type"], "unknown");
    assert_eq!(json["matches"][0]["pattern"], "main");
    assert_eq!(json["search_meta"]["truncation_reason"], "none");
}
