use crate::error::Result;
use crate::parser::dir_name;
use crate::types::{Module, ModuleGraph, ProjectType};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn setup_py_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bname\s*=\s*["']([^"']+)["']"#).expect("valid regex"))
}

/// `[project].name`, then `[tool.poetry].name`, then a sibling `setup.cfg`.
pub(crate) fn detect_pyproject(root: &Path) -> Result<Option<ModuleGraph>> {
    let path = root.join("pyproject.toml");
    if !path.is_file() {
        return Ok(None);
    }
    let table: toml::Table = toml::from_str(&fs::read_to_string(&path)?)?;
    let name = table
        .get("project")
        .and_then(|project| project.get("name"))
        .or_else(|| {
            table
                .get("tool")
                .and_then(|tool| tool.get("poetry"))
                .and_then(|poetry| poetry.get("name"))
        })
        .and_then(toml::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| setup_cfg_name(root));

    Ok(Some(single(root, name, "pyproject.toml")))
}

/// `name` under `[metadata]`.
pub(crate) fn detect_setup_cfg(root: &Path) -> Result<Option<ModuleGraph>> {
    let path = root.join("setup.cfg");
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    let name = ini_value(&text, "metadata", "name");
    Ok(Some(single(root, name, "setup.cfg")))
}

fn setup_cfg_name(root: &Path) -> Option<String> {
    let text = fs::read_to_string(root.join("setup.cfg")).ok()?;
    ini_value(&text, "metadata", "name")
}

/// First literal `name=` keyword in `setup.py`.
pub(crate) fn detect_setup_py(root: &Path) -> Result<Option<ModuleGraph>> {
    let path = root.join("setup.py");
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    let name = setup_py_name_re()
        .captures(&text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(Some(single(root, name, "setup.py")))
}

fn single(root: &Path, name: Option<String>, manifest: &str) -> ModuleGraph {
    let mut graph = ModuleGraph::new(ProjectType::Python);
    let name = name.unwrap_or_else(|| dir_name(root));
    graph.add_module(Module::new(name, ".", manifest));
    graph
}

fn ini_value(text: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            in_section = header.trim().eq_ignore_ascii_case(section);
            continue;
        }
        if !in_section {
            continue;
        }
        let Some((k, v)) = trimmed.split_once('=').or_else(|| trimmed.split_once(':')) else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case(key) {
            let value = v.trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::ini_value;

    #[test]
    fn reads_metadata_name() {
        let cfg = "[options]\nname = wrong\n\n[metadata]\n# comment\nname = billing-core\nversion = 1.0\n";
        assert_eq!(
            ini_value(cfg, "metadata", "name").as_deref(),
            Some("billing-core")
        );
        assert_eq!(ini_value(cfg, "metadata", "author"), None);
    }
}
