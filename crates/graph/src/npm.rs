use crate::error::Result;
use crate::parser::{dir_name, expand_member, last_component};
use crate::types::{Module, ModuleGraph, ProjectType};
use serde_json::Value;
use std::fs;
use std::path::Path;

const PACKAGE_JSON: &str = "package.json";
const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "devDependencies", "peerDependencies"];

/// npm/yarn/pnpm workspaces, or a single package when no workspaces are declared.
pub(crate) fn detect(root: &Path) -> Result<Option<ModuleGraph>> {
    let manifest = root.join(PACKAGE_JSON);
    if !manifest.is_file() {
        return Ok(None);
    }
    let package: Value = serde_json::from_str(&fs::read_to_string(&manifest)?)?;

    let mut graph = ModuleGraph::new(ProjectType::Npm);
    let patterns = workspace_patterns(&package);
    if patterns.is_empty() {
        let name = package_name(&package).unwrap_or_else(|| dir_name(root));
        graph.add_module(Module::new(name, ".", PACKAGE_JSON));
        return Ok(Some(graph));
    }

    let mut dirs: Vec<String> = Vec::new();
    for pattern in &patterns {
        for dir in expand_member(root, pattern, PACKAGE_JSON) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }

    let mut workspaces: Vec<(String, Option<Value>)> = Vec::new();
    for dir in dirs {
        let parsed = read_package(&root.join(&dir).join(PACKAGE_JSON));
        let name = parsed
            .as_ref()
            .and_then(package_name)
            .unwrap_or_else(|| last_component(&dir));
        graph.add_module(Module::new(name.clone(), dir, PACKAGE_JSON));
        workspaces.push((name, parsed));
    }

    for (source, package) in &workspaces {
        let Some(package) = package else {
            continue;
        };
        for section in DEPENDENCY_SECTIONS {
            let Some(deps) = package.get(*section).and_then(Value::as_object) else {
                continue;
            };
            for target in deps.keys() {
                if graph.has_module(target) {
                    graph.add_edge(source, target);
                }
            }
        }
    }

    Ok(Some(graph))
}

/// `"workspaces": [...]` or `"workspaces": {"packages": [...]}`.
fn workspace_patterns(package: &Value) -> Vec<String> {
    let entries: &[Value] = match package.get("workspaces") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Object(obj)) => match obj.get("packages") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn package_name(package: &Value) -> Option<String> {
    package
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_package(path: &Path) -> Option<Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            log::debug!("Cannot read {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Malformed {}: {err}", path.display());
            None
        }
    }
}
