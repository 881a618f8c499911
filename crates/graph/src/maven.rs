use crate::error::{GraphError, Result};
use crate::parser::{dir_name, last_component, normalize_rel};
use crate::types::{Module, ModuleGraph, ProjectType};
use roxmltree::{Document, Node};
use std::fs;
use std::path::{Path, PathBuf};

const POM: &str = "pom.xml";

/// Root POM plus every declared `<module>`.
///
/// Sub-module names come from their own POM's artifact id; an unreadable or malformed sub-POM
/// falls back to its directory name. Edges are added once every module is known.
pub(crate) fn detect(root: &Path) -> Result<Option<ModuleGraph>> {
    let pom_path = root.join(POM);
    if !pom_path.is_file() {
        return Ok(None);
    }

    let text = fs::read_to_string(&pom_path)?;
    let doc = Document::parse(&text)?;
    let project = doc.root_element();
    if project.tag_name().name() != "project" {
        return Err(GraphError::malformed(POM, "root element is not <project>"));
    }

    let mut graph = ModuleGraph::new(ProjectType::Maven);
    let root_name = child_text(project, "artifactId").unwrap_or_else(|| dir_name(root));
    graph.add_module(Module::new(root_name, ".", POM));

    let mut sub_poms: Vec<(String, PathBuf)> = Vec::new();
    for declared in declared_modules(project) {
        let (rel, manifest) = split_module_entry(&declared);
        if rel.is_empty() {
            continue;
        }
        let sub_pom = root.join(&rel).join(&manifest);
        let name = match read_artifact_id(&sub_pom) {
            Ok(Some(id)) => id,
            Ok(None) => last_component(&rel),
            Err(err) => {
                log::debug!("Falling back to directory name for {rel}: {err}");
                last_component(&rel)
            }
        };
        graph.add_module(Module::new(name.clone(), rel, manifest));
        sub_poms.push((name, sub_pom));
    }

    for (source, sub_pom) in &sub_poms {
        let deps = match read_dependency_ids(sub_pom) {
            Ok(deps) => deps,
            Err(err) => {
                log::debug!("Skipping dependencies of {source}: {err}");
                continue;
            }
        };
        for target in deps {
            if graph.has_module(&target) {
                graph.add_edge(source, &target);
            }
        }
    }

    Ok(Some(graph))
}

fn declared_modules(project: Node<'_, '_>) -> Vec<String> {
    let Some(modules) = child(project, "modules") else {
        return Vec::new();
    };
    modules
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "module")
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<module>` usually names a directory but may point at a POM file directly.
fn split_module_entry(declared: &str) -> (String, String) {
    let rel = normalize_rel(declared);
    if rel.ends_with(".xml") {
        let (dir, file) = match rel.rfind('/') {
            Some(idx) => (rel[..idx].to_string(), rel[idx + 1..].to_string()),
            None => (".".to_string(), rel.clone()),
        };
        return (dir, file);
    }
    (rel, POM.to_string())
}

fn read_artifact_id(pom: &Path) -> Result<Option<String>> {
    let text = fs::read_to_string(pom)?;
    let doc = Document::parse(&text)?;
    Ok(child_text(doc.root_element(), "artifactId"))
}

fn read_dependency_ids(pom: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(pom)?;
    let doc = Document::parse(&text)?;
    let Some(dependencies) = child(doc.root_element(), "dependencies") else {
        return Ok(Vec::new());
    };
    Ok(dependencies
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "dependency")
        .filter_map(|dep| child_text(dep, "artifactId"))
        .collect())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)?
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
