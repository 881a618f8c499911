//! # Discovery Graph
//!
//! Build-manifest parsing into a module dependency graph.
//!
//! ## Detection order
//!
//! ```text
//! pom.xml ─> settings.gradle[.kts] ─> build.gradle[.kts] ─> package.json
//!         ─> go.mod ─> pyproject.toml ─> setup.cfg ─> setup.py ─> Cargo.toml
//! ```
//!
//! The first detector that yields at least one module wins; a malformed manifest is logged
//! and skipped, so [`ManifestParser::parse`] always returns a graph (possibly `unknown`).

mod cargo;
mod error;
mod golang;
mod gradle;
mod maven;
mod npm;
mod parser;
mod python;
mod types;

pub use error::{GraphError, Result};
pub use parser::ManifestParser;
pub use types::{Dependency, Module, ModuleGraph, ProjectType};
