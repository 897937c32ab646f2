// Archive loading - parses JSON text into a validated project tree
use crate::decoder::is_valid_base64;
use crate::error::{ArchiveError, Result};
use crate::models::{Archive, ArchiveMetadata, ArchiveNode, NodeKind, ProjectComparison};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLoader;

impl ProjectLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse and validate a full archive document.
    ///
    /// Validation is depth-first and left-to-right and stops at the first
    /// problem; node errors carry the node's path, e.g.
    /// `project.children[2].children[0]`.
    pub fn load_project(&self, json_data: &str) -> Result<Archive> {
        let parsed: Value =
            serde_json::from_str(json_data).map_err(|e| ArchiveError::InvalidJson(e.to_string()))?;
        let archive = validate_project_structure(&parsed)?;
        info!(
            "Loaded project {} ({} nodes)",
            archive.name(),
            self.count_nodes(&archive)
        );
        Ok(archive)
    }

    /// Every node below the root, directories and files alike.
    pub fn count_nodes(&self, archive: &Archive) -> usize {
        count_nodes(archive.children())
    }

    /// Path -> node for every node below the root.
    pub fn build_file_index<'a>(&self, archive: &'a Archive) -> BTreeMap<String, &'a ArchiveNode> {
        let mut index = BTreeMap::new();
        archive.walk(|path, node| {
            index.insert(path.to_string(), node);
        });
        index
    }

    pub fn extract_metadata(&self, archive: &Archive) -> ArchiveMetadata {
        ArchiveMetadata {
            name: archive.name().to_string(),
            kind: NodeKind::Directory,
            description: archive.description().map(str::to_string),
            created_at: archive.created_at().to_string(),
            total_nodes: self.count_nodes(archive),
        }
    }

    /// Path-level comparison of two archives. Files whose payload differs are
    /// reported as modified; directories only ever appear as added, removed
    /// or unchanged.
    pub fn compare(&self, old: &Archive, new: &Archive) -> ProjectComparison {
        let before = self.build_file_index(old);
        let after = self.build_file_index(new);
        let mut comparison = ProjectComparison::default();

        for (path, node) in &after {
            match before.get(path) {
                None => comparison.added.push(path.clone()),
                Some(previous) if previous.kind() != node.kind() => {
                    comparison.modified.push(path.clone())
                }
                Some(previous) if previous.content_base64() != node.content_base64() => {
                    comparison.modified.push(path.clone())
                }
                Some(_) => comparison.unchanged.push(path.clone()),
            }
        }
        comparison.removed = before
            .keys()
            .filter(|path| !after.contains_key(*path))
            .cloned()
            .collect();

        debug!(
            "Compared {} -> {}: {} added, {} removed, {} modified",
            old.name(),
            new.name(),
            comparison.added.len(),
            comparison.removed.len(),
            comparison.modified.len()
        );
        comparison
    }
}

fn count_nodes(nodes: &[ArchiveNode]) -> usize {
    nodes.len() + nodes.iter().map(|n| count_nodes(n.children())).sum::<usize>()
}

fn validate_project_structure(data: &Value) -> Result<Archive> {
    let root = data
        .as_object()
        .ok_or_else(|| ArchiveError::structure("Project data must be an object"))?;

    let project = match root.get("project") {
        None | Some(Value::Null) => {
            return Err(ArchiveError::structure("Missing required \"project\" field"))
        }
        Some(Value::Object(project)) => project,
        Some(_) => return Err(ArchiveError::structure("Project field must be an object")),
    };

    let name = match project.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => return Err(ArchiveError::structure("Project must have a valid name")),
    };

    if project.get("type").and_then(Value::as_str) != Some("directory") {
        return Err(ArchiveError::structure("Project type must be \"directory\""));
    }

    let created_at = match project.get("created_at") {
        Some(Value::String(created_at)) if !created_at.is_empty() => created_at.clone(),
        _ => {
            return Err(ArchiveError::structure(
                "Project must have a valid created_at timestamp",
            ))
        }
    };

    let description = match project.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(description)) => Some(description.clone()),
        Some(_) => return Err(ArchiveError::structure("Project description must be a string")),
    };

    let children = match project.get("children") {
        Some(Value::Array(children)) => children,
        _ => return Err(ArchiveError::structure("Project must have children array")),
    };

    let children = validate_children(children, "project")?;
    Ok(Archive::new(name, description, created_at, children))
}

fn validate_children(children: &[Value], parent_path: &str) -> Result<Vec<ArchiveNode>> {
    children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            validate_project_node(child, &format!("{}.children[{}]", parent_path, index))
        })
        .collect()
}

fn validate_project_node(value: &Value, path: &str) -> Result<ArchiveNode> {
    let node = value
        .as_object()
        .ok_or_else(|| ArchiveError::node(path, "must be an object"))?;

    let name = match node.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(ArchiveError::node(path, "must have a valid name")),
    };

    let kind = match node.get("type").and_then(Value::as_str) {
        Some("file") => NodeKind::File,
        Some("directory") => NodeKind::Directory,
        _ => {
            return Err(ArchiveError::node(
                path,
                "type must be \"file\" or \"directory\"",
            ))
        }
    };

    let content_base64 = validate_content(node, path)?;
    if kind == NodeKind::Directory && content_base64.is_some() {
        return Err(ArchiveError::node(path, "directories cannot carry content_base64"));
    }

    let children = match node.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(children)) => {
            // An explicit empty array on a file is tolerated and dropped
            if kind == NodeKind::File && !children.is_empty() {
                return Err(ArchiveError::node(path, "files cannot have children"));
            }
            validate_children(children, path)?
        }
        Some(_) => return Err(ArchiveError::node(path, "children must be an array")),
    };

    Ok(match kind {
        NodeKind::File => ArchiveNode::File {
            name,
            content_base64,
        },
        NodeKind::Directory => ArchiveNode::Directory { name, children },
    })
}

/// Empty strings and nulls count as "no content".
fn validate_content(node: &Map<String, Value>, path: &str) -> Result<Option<String>> {
    match node.get("content_base64") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(content)) if content.is_empty() => Ok(None),
        Some(Value::String(content)) => {
            if is_valid_base64(content) {
                Ok(Some(content.clone()))
            } else {
                Err(ArchiveError::node(path, "content_base64 is not valid base64"))
            }
        }
        Some(_) => Err(ArchiveError::node(path, "content_base64 must be a string")),
    }
}
