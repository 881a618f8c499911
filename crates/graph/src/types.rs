use serde::{Deserialize, Serialize};
use std::fmt;

/// Build system detected at the repository root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Maven,
    Gradle,
    Npm,
    Go,
    Python,
    Cargo,
    Unknown,
}

impl ProjectType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::Gradle => "gradle",
            Self::Npm => "npm",
            Self::Go => "go",
            Self::Python => "python",
            Self::Cargo => "cargo",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build-system module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    /// Declared module name (artifact id, package name, ...)
    pub name: String,

    /// Directory relative to the repository root (`"."` for the root)
    pub path: String,

    /// Manifest file name inside `path` (e.g. "pom.xml")
    pub manifest: String,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        manifest: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            manifest: manifest.into(),
        }
    }

    /// Manifest path relative to the repository root.
    pub fn manifest_path(&self) -> String {
        if self.path.is_empty() || self.path == "." {
            self.manifest.clone()
        } else {
            format!("{}/{}", self.path, self.manifest)
        }
    }
}

/// `source` declares a dependency on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
}

impl Dependency {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Modules and the dependency edges declared between them.
///
/// Edges are unique and never point from a module to itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGraph {
    pub project_type: ProjectType,
    pub modules: Vec<Module>,
    pub edges: Vec<Dependency>,
}

impl ModuleGraph {
    pub fn new(project_type: ProjectType) -> Self {
        Self {
            project_type,
            modules: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(ProjectType::Unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.push(module);
    }

    /// Add an edge unless it is a self-edge or already present.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        if source == target {
            return false;
        }
        if self
            .edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
        {
            return false;
        }
        self.edges.push(Dependency::new(source, target));
        true
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.iter().any(|module| module.name == name)
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.name.as_str()).collect()
    }

    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|edge| edge.source == name)
            .map(|edge| edge.target.as_str())
            .collect()
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::unknown()
    }
}
