use crate::error::Result;
use crate::types::{Module, ModuleGraph, ProjectType};
use std::fs;
use std::path::Path;

/// Single module named by the `module` directive of `go.mod`.
pub(crate) fn detect(root: &Path) -> Result<Option<ModuleGraph>> {
    let go_mod = root.join("go.mod");
    if !go_mod.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&go_mod)?;
    let name = module_path(&text).unwrap_or_else(|| "unknown".to_string());

    let mut graph = ModuleGraph::new(ProjectType::Go);
    graph.add_module(Module::new(name, ".", "go.mod"));
    Ok(Some(graph))
}

fn module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.split("//").next().unwrap_or(rest);
        let name = rest.trim().trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}
