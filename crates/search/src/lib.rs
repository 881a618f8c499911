//! # Discovery Search
//!
//! Budgeted text search and test-file mapping over the paths of a
//! [`FileIndex`](discovery_indexer::FileIndex).
//!
//! ```text
//! paths ──> GrepEngine ──> admission (stat, size cap)
//!                │             └─> reader: full read (<= 1 MiB) | streaming (lead chunk + lines)
//!                ├─> search / search_with_meta        (one match per line, cached)
//!                └─> search_batch / search_batch_with_meta
//!                        (one pass per file, every pattern on every line,
//!                         shared total cap, per-pattern per-file cap, deadline)
//!
//! source path ──> TestMapper ──> name templates ──> FileIndex::find_by_stem ──> tiered ranking
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use discovery_indexer::FileIndex;
//! use discovery_search::{GrepEngine, GrepOptions, TestMapper};
//!
//! let index = FileIndex::build("/path/to/repo", 100_000).unwrap();
//! let mut grep = GrepEngine::new(index.root(), index.paths().to_vec(), GrepOptions::default());
//! let batch = grep.search_batch_with_meta(&["UserService", "AuthToken"], false);
//! println!("{} matches", batch.meta.total_matches_found);
//!
//! let tests = TestMapper::new(&index).find_tests("src/main/java/com/acme/UserService.java");
//! println!("{tests:?}");
//! ```

mod grep;
mod reader;
mod test_mapper;

pub use grep::{
    BatchResult, GrepEngine, GrepMatch, GrepOptions, PatternMatches, SearchMeta, TruncationReason,
};
pub use test_mapper::TestMapper;
