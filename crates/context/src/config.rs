use crate::error::{ConfigError, Result};
use discovery_citations::DEFAULT_OVERLAP_THRESHOLD;
use discovery_indexer::ListingSource;
use discovery_search::GrepOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_MAX_FILES: &str = "DISCOVERY_MAX_FILES";
pub const ENV_LARGE_REPO_THRESHOLD: &str = "DISCOVERY_LARGE_REPO_THRESHOLD";
pub const ENV_GREP_TIMEOUT_MS: &str = "DISCOVERY_GREP_TIMEOUT_MS";
pub const ENV_GREP_MAX_TOTAL: &str = "DISCOVERY_GREP_MAX_TOTAL";
pub const ENV_MARKDOWN_BUDGET: &str = "DISCOVERY_MARKDOWN_BUDGET";
pub const ENV_LISTING: &str = "DISCOVERY_LISTING";

/// Tunables for one discovery session. Every field is optional in TOML.
///
/// ```toml
/// max_files = 20000
/// listing = "walk"
///
/// [grep]
/// timeout_ms = 5000
///
/// [citations]
/// overlap_threshold = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub max_files: usize,
    pub listing: ListingSource,
    /// Above this many indexed files, keyword search is narrowed to matching directories
    pub large_repo_threshold: usize,
    pub max_keywords: usize,
    /// Matched files handed to the test mapper
    pub max_mapped_sources: usize,
    /// Character budget of the rendered markdown report
    pub markdown_budget: usize,
    pub grep: GrepConfig,
    pub citations: CitationConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_files: 100_000,
            listing: ListingSource::Git,
            large_repo_threshold: 50_000,
            max_keywords: 20,
            max_mapped_sources: 50,
            markdown_budget: 12_000,
            grep: GrepConfig::default(),
            citations: CitationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrepConfig {
    pub context_lines: usize,
    pub max_matches_per_file: usize,
    pub max_total_matches: usize,
    pub max_file_size_bytes: u64,
    pub timeout_ms: u64,
}

impl Default for GrepConfig {
    fn default() -> Self {
        Self::from(&GrepOptions::default())
    }
}

impl From<&GrepOptions> for GrepConfig {
    fn from(options: &GrepOptions) -> Self {
        Self {
            context_lines: options.context_lines,
            max_matches_per_file: options.max_matches_per_file,
            max_total_matches: options.max_total_matches,
            max_file_size_bytes: options.max_file_size,
            timeout_ms: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl GrepConfig {
    pub fn to_options(&self) -> GrepOptions {
        GrepOptions {
            context_lines: self.context_lines,
            max_matches_per_file: self.max_matches_per_file,
            max_total_matches: self.max_total_matches,
            max_file_size: self.max_file_size_bytes,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationConfig {
    /// Share of snippet identifiers that must be present in the cited range
    pub overlap_threshold: f64,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }
}

impl DiscoveryConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.citations.overlap_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "citations.overlap_threshold must be within 0..=1, got {threshold}"
            )));
        }
        if self.markdown_budget == 0 {
            return Err(ConfigError::Invalid(
                "markdown_budget must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `DISCOVERY_*` environment variables. Blank or unparsable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_number(&mut self.max_files, lookup(ENV_MAX_FILES).as_deref());
        override_number(
            &mut self.large_repo_threshold,
            lookup(ENV_LARGE_REPO_THRESHOLD).as_deref(),
        );
        override_number(
            &mut self.grep.timeout_ms,
            lookup(ENV_GREP_TIMEOUT_MS).as_deref(),
        );
        override_number(
            &mut self.grep.max_total_matches,
            lookup(ENV_GREP_MAX_TOTAL).as_deref(),
        );
        override_number(
            &mut self.markdown_budget,
            lookup(ENV_MARKDOWN_BUDGET).as_deref(),
        );
        if let Some(listing) = lookup(ENV_LISTING).as_deref().and_then(ListingSource::parse) {
            self.listing = listing;
        }
    }
}

fn override_number<T: std::str::FromStr + PartialOrd + Default>(slot: &mut T, raw: Option<&str>) {
    let parsed = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<T>().ok())
        .filter(|v| *v > T::default());
    if let Some(value) = parsed {
        *slot = value;
    }
}
