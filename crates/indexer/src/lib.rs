//! # Discovery Indexer
//!
//! Session-scoped index of a repository's files.
//!
//! ```text
//! Repository root
//!     │
//!     ├──> File Scanner (git ls-files | .gitignore-aware walk)
//!     │      └─> Relative paths (bounded by max_files)
//!     │
//!     └──> File Index
//!            ├─ stem (lowercased)      -> paths
//!            ├─ extension (lowercased) -> paths
//!            └─ full path list / existence set / glob cache
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use discovery_indexer::FileIndex;
//!
//! fn main() -> discovery_indexer::Result<()> {
//!     let index = FileIndex::build("/path/to/repo", 100_000)?;
//!     println!("{} files", index.file_count());
//!     if let Some(path) = index.fuzzy_find("UserService.java") {
//!         println!("resolved to {path}");
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod file_index;
pub mod paths;
mod scanner;

pub use error::{IndexerError, Result};
pub use file_index::FileIndex;
pub use scanner::{FileScanner, ListingSource};
