use crate::error::Result;
use crate::parser::{dir_name, first_existing};
use crate::types::{Module, ModuleGraph, ProjectType};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const SETTINGS_FILES: &[&str] = &["settings.gradle", "settings.gradle.kts"];
const BUILD_FILES: &[&str] = &["build.gradle", "build.gradle.kts"];

fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A trailing comma continues the list onto the next line.
        Regex::new(r#"(?m)^[ \t]*include\b[ \t]*\(?((?:\s*["'][^"'\n]+["']\s*,)*\s*["'][^"'\n]+["'])"#)
            .expect("valid regex")
    })
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']([^"']+)["']"#).expect("valid regex"))
}

fn project_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"project\s*\(\s*(?:path\s*[:=]\s*)?["']:?([^"']+)["']"#).expect("valid regex")
    })
}

fn root_project_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"rootProject\.name\s*=\s*["']([^"']+)["']"#).expect("valid regex")
    })
}

/// Multi-project build: one module per `include` in the settings file.
pub(crate) fn detect_settings(root: &Path) -> Result<Option<ModuleGraph>> {
    let Some(settings) = first_existing(root, SETTINGS_FILES) else {
        return Ok(None);
    };
    let text = fs::read_to_string(root.join(settings))?;

    let mut graph = ModuleGraph::new(ProjectType::Gradle);
    for include in parse_includes(&text) {
        if graph.has_module(&include) {
            continue;
        }
        let path = include.replace(':', "/");
        let manifest = first_existing(&root.join(&path), BUILD_FILES).unwrap_or(BUILD_FILES[0]);
        graph.add_module(Module::new(include, path, manifest));
    }

    let modules = graph.modules.clone();
    for module in &modules {
        let Ok(build) = fs::read_to_string(root.join(module.manifest_path())) else {
            continue;
        };
        for target in project_refs(&build) {
            if graph.has_module(&target) {
                graph.add_edge(&module.name, &target);
            }
        }
    }

    Ok(Some(graph))
}

/// Single-project build file at the root.
pub(crate) fn detect_build(root: &Path) -> Result<Option<ModuleGraph>> {
    let Some(build) = first_existing(root, BUILD_FILES) else {
        return Ok(None);
    };

    let name = first_existing(root, SETTINGS_FILES)
        .and_then(|settings| fs::read_to_string(root.join(settings)).ok())
        .and_then(|text| {
            root_project_name_re()
                .captures(&text)
                .map(|caps| caps[1].trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| dir_name(root));

    let mut graph = ModuleGraph::new(ProjectType::Gradle);
    graph.add_module(Module::new(name, ".", build));
    Ok(Some(graph))
}

/// Project paths from `include ':a', ':b:c'` / `include(":a")`, without the leading colon.
pub(crate) fn parse_includes(settings: &str) -> Vec<String> {
    let mut out = Vec::new();
    for caps in include_re().captures_iter(settings) {
        for quoted in quoted_re().captures_iter(&caps[1]) {
            let name = quoted[1].trim().trim_start_matches(':').to_string();
            if !name.is_empty() && !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}

fn project_refs(build: &str) -> Vec<String> {
    project_ref_re()
        .captures_iter(build)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_include_forms() {
        let settings = r#"
rootProject.name = 'shop'
include ':core', ':web'
include(":services:billing")
// include ':commented'
"#;
        assert_eq!(
            parse_includes(settings),
            vec!["core", "web", "services:billing"]
        );
    }

    #[test]
    fn include_list_continues_across_lines() {
        let settings = "include ':core',\n        ':web',\n        ':api'\ninclude ':tools'\n";
        assert_eq!(parse_includes(settings), vec!["core", "web", "api", "tools"]);
    }

    #[test]
    fn finds_project_references() {
        let build = r#"
dependencies {
    implementation project(':core')
    testImplementation(project(path: ":testing"))
}
"#;
        assert_eq!(project_refs(build), vec!["core", "testing"]);
    }
}
