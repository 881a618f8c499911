use crate::error::Result;
use crate::parser::{dir_name, expand_member, last_component};
use crate::types::{Module, ModuleGraph, ProjectType};
use std::fs;
use std::path::Path;

const CARGO_TOML: &str = "Cargo.toml";
const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];

/// Cargo workspace members, or a single package.
pub(crate) fn detect(root: &Path) -> Result<Option<ModuleGraph>> {
    let manifest = root.join(CARGO_TOML);
    if !manifest.is_file() {
        return Ok(None);
    }
    let table: toml::Table = toml::from_str(&fs::read_to_string(&manifest)?)?;

    let mut graph = ModuleGraph::new(ProjectType::Cargo);
    let members = workspace_members(&table);
    if members.is_empty() {
        let name = package_name(&table).unwrap_or_else(|| dir_name(root));
        graph.add_module(Module::new(name, ".", CARGO_TOML));
        return Ok(Some(graph));
    }

    let mut crates: Vec<(String, Option<toml::Table>)> = Vec::new();
    if let Some(name) = package_name(&table) {
        graph.add_module(Module::new(name.clone(), ".", CARGO_TOML));
        crates.push((name, Some(table.clone())));
    }

    let mut dirs: Vec<String> = Vec::new();
    for member in &members {
        for dir in expand_member(root, member, CARGO_TOML) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    for dir in dirs {
        let parsed = read_manifest(&root.join(&dir).join(CARGO_TOML));
        let name = parsed
            .as_ref()
            .and_then(package_name)
            .unwrap_or_else(|| last_component(&dir));
        graph.add_module(Module::new(name.clone(), dir, CARGO_TOML));
        crates.push((name, parsed));
    }

    for (source, manifest) in &crates {
        let Some(manifest) = manifest else {
            continue;
        };
        for target in dependency_names(manifest) {
            if graph.has_module(&target) {
                graph.add_edge(source, &target);
            }
        }
    }

    Ok(Some(graph))
}

fn workspace_members(table: &toml::Table) -> Vec<String> {
    table
        .get("workspace")
        .and_then(|ws| ws.get("members"))
        .and_then(toml::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(toml::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn package_name(table: &toml::Table) -> Option<String> {
    table
        .get("package")
        .and_then(|pkg| pkg.get("name"))
        .and_then(toml::Value::as_str)
        .map(str::to_string)
}

/// Dependency keys, honouring `package = "..."` renames.
fn dependency_names(table: &toml::Table) -> Vec<String> {
    let mut out = Vec::new();
    for section in DEPENDENCY_SECTIONS {
        let Some(deps) = table.get(*section).and_then(toml::Value::as_table) else {
            continue;
        };
        for (key, spec) in deps {
            let name = spec
                .get("package")
                .and_then(toml::Value::as_str)
                .unwrap_or(key);
            out.push(name.to_string());
        }
    }
    out
}

fn read_manifest(path: &Path) -> Option<toml::Table> {
    let text = fs::read_to_string(path).ok()?;
    match toml::from_str(&text) {
        Ok(table) => Some(table),
        Err(err) => {
            log::warn!("Malformed {}: {err}", path.display());
            None
        }
    }
}
