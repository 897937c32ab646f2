use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ARCHIVE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
        }
    }
}

/// One entry of an archive tree. The variant decides which payload is legal:
/// files may carry base64 content, directories carry children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArchiveNode {
    File {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_base64: Option<String>,
    },
    Directory {
        name: String,
        children: Vec<ArchiveNode>,
    },
}

impl ArchiveNode {
    pub fn file(name: impl Into<String>, content_base64: Option<String>) -> Self {
        ArchiveNode::File {
            name: name.into(),
            content_base64,
        }
    }

    pub fn directory(name: impl Into<String>, children: Vec<ArchiveNode>) -> Self {
        ArchiveNode::Directory {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ArchiveNode::File { name, .. } | ArchiveNode::Directory { name, .. } => name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            ArchiveNode::File { .. } => NodeKind::File,
            ArchiveNode::Directory { .. } => NodeKind::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ArchiveNode::File { .. })
    }

    pub fn content_base64(&self) -> Option<&str> {
        match self {
            ArchiveNode::File { content_base64, .. } => content_base64.as_deref(),
            ArchiveNode::Directory { .. } => None,
        }
    }

    /// Children of a directory; files always yield an empty slice.
    pub fn children(&self) -> &[ArchiveNode] {
        match self {
            ArchiveNode::File { .. } => &[],
            ArchiveNode::Directory { children, .. } => children,
        }
    }

    fn walk<'a, F>(&'a self, parent: &str, visit: &mut F)
    where
        F: FnMut(&str, &'a ArchiveNode),
    {
        let path = if parent.is_empty() {
            self.name().to_string()
        } else {
            format!("{}/{}", parent, self.name())
        };
        visit(&path, self);
        for child in self.children() {
            child.walk(&path, visit);
        }
    }
}

/// The `project` object of an archive document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRoot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub children: Vec<ArchiveNode>,
}

/// A validated project archive. Only the loader builds one; it is never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Archive {
    project: ProjectRoot,
    #[serde(skip)]
    id: u64,
}

impl PartialEq for Archive {
    fn eq(&self, other: &Self) -> bool {
        self.project == other.project
    }
}

impl Archive {
    pub(crate) fn new(
        name: String,
        description: Option<String>,
        created_at: String,
        children: Vec<ArchiveNode>,
    ) -> Self {
        Self {
            project: ProjectRoot {
                name,
                kind: NodeKind::Directory,
                description,
                created_at,
                children,
            },
            id: NEXT_ARCHIVE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Identity of the loaded value; clones share it, reloads never do.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn project(&self) -> &ProjectRoot {
        &self.project
    }

    pub fn name(&self) -> &str {
        &self.project.name
    }

    pub fn description(&self) -> Option<&str> {
        self.project.description.as_deref()
    }

    pub fn created_at(&self) -> &str {
        &self.project.created_at
    }

    pub fn children(&self) -> &[ArchiveNode] {
        &self.project.children
    }

    /// Depth-first, left-to-right traversal of every node below the root.
    /// Paths are `/`-joined names and exclude the root's own name.
    pub fn walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&str, &'a ArchiveNode),
    {
        for child in &self.project.children {
            child.walk("", &mut visit);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMetrics {
    pub functions: usize,
    pub classes: usize,
    pub imports: usize,
    pub exports: usize,
    pub lines_of_code: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<usize>,
}

impl CodeMetrics {
    /// Pointwise addition. Complexity is only summed when `other` has one.
    pub fn merge(&mut self, other: &CodeMetrics) {
        self.functions += other.functions;
        self.classes += other.classes;
        self.imports += other.imports;
        self.exports += other.exports;
        self.lines_of_code += other.lines_of_code;
        if let Some(complexity) = other.complexity {
            self.complexity = Some(self.complexity.unwrap_or(0) + complexity);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub total_files: usize,
    pub total_directories: usize,
    pub files_with_content: usize,
    pub file_types: BTreeMap<String, usize>,
    pub code_metrics: CodeMetrics,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// 1-based; 0 for file name matches.
    pub line: usize,
    /// 1-based; 0 for file name matches.
    pub column: usize,
    pub text: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub path: String,
    pub file_name: String,
    /// Leading slice of the decoded content, empty for name matches.
    pub content: String,
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_files: usize,
    pub total_content: usize,
    pub index_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub description: Option<String>,
    pub created_at: String,
    pub total_nodes: usize,
}

/// Path-level difference between two archives. Content diffs are not computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectComparison {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Archive {
        Archive::new(
            "Demo".to_string(),
            None,
            "2024-01-01T00:00:00Z".to_string(),
            vec![
                ArchiveNode::directory(
                    "src",
                    vec![
                        ArchiveNode::file("main.rs", None),
                        ArchiveNode::directory("util", vec![ArchiveNode::file("io.rs", None)]),
                    ],
                ),
                ArchiveNode::file("README.md", None),
            ],
        )
    }

    #[test]
    fn test_walk_is_depth_first_with_relative_paths() {
        let archive = sample();
        let mut paths = Vec::new();
        archive.walk(|path, _| paths.push(path.to_string()));
        assert_eq!(
            paths,
            vec!["src", "src/main.rs", "src/util", "src/util/io.rs", "README.md"]
        );
    }

    #[test]
    fn test_archive_ids_differ_between_loads() {
        let a = sample();
        let b = sample();
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_node_serializes_with_type_tag() {
        let node = ArchiveNode::file("a.py", Some("YQ==".to_string()));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["content_base64"], "YQ==");
        assert!(value.get("children").is_none());

        let dir = serde_json::to_value(ArchiveNode::directory("src", vec![])).unwrap();
        assert_eq!(dir["type"], "directory");
        assert!(dir["children"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_kind_labels_match_json_tags() {
        for kind in [NodeKind::File, NodeKind::Directory] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn test_metrics_merge_sums_optional_complexity() {
        let mut total = CodeMetrics::default();
        total.merge(&CodeMetrics {
            functions: 2,
            classes: 1,
            imports: 3,
            exports: 0,
            lines_of_code: 10,
            complexity: None,
        });
        assert_eq!(total.complexity, None);

        total.merge(&CodeMetrics {
            functions: 1,
            lines_of_code: 5,
            complexity: Some(4),
            ..Default::default()
        });
        assert_eq!(total.functions, 3);
        assert_eq!(total.lines_of_code, 15);
        assert_eq!(total.complexity, Some(4));
    }
}
