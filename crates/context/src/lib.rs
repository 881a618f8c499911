//! # Discovery Context
//!
//! Wires the discovery components into one bounded report.
//!
//! ```text
//! keywords / free text
//!     │
//!     ▼
//! ContextBuilder::build
//!     ├─> FileIndex (built, or supplied by the caller)
//!     ├─> ManifestParser::parse            -> module graph
//!     ├─> GrepEngine::search_batch_with_meta (narrowed scope for large repositories)
//!     └─> TestMapper::map_all(matched files)
//!     │
//!     ▼
//! LocalDiscoveryReport ──> to_markdown(budget)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use discovery_context::{ContextBuilder, DiscoveryConfig};
//!
//! let config = DiscoveryConfig::default().with_env_overrides();
//! let budget = config.markdown_budget;
//! let builder = ContextBuilder::with_config("/path/to/repo", config);
//! let report = builder.build_from_text("Fix the retry loop in PaymentGateway.charge", None);
//! println!("{}", report.to_markdown(budget));
//! ```

mod builder;
mod config;
mod error;
mod keywords;
mod report;

pub use builder::ContextBuilder;
pub use config::{
    CitationConfig, DiscoveryConfig, GrepConfig, ENV_GREP_MAX_TOTAL, ENV_GREP_TIMEOUT_MS,
    ENV_LARGE_REPO_THRESHOLD, ENV_LISTING, ENV_MARKDOWN_BUDGET, ENV_MAX_FILES,
};
pub use error::{ConfigError, Result};
pub use keywords::extract_keywords;
pub use report::LocalDiscoveryReport;

pub use discovery_citations::{CitationCheck, CitationVerifier, VerificationReport};
