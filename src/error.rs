// Error taxonomy for archive loading, decoding, search and export
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchiveError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    InvalidStructure(String),
    #[error("Invalid node at {path}: {reason}")]
    InvalidNode { path: String, reason: String },
    #[error("Failed to decode content: {0}")]
    Decode(String),
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to index {path}: {reason}")]
    SearchIndex { path: String, reason: String },
    #[error("No project loaded")]
    NoProject,
    #[error("No such path in project: {0}")]
    UnknownPath(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to serialize export: {0}")]
    Serialize(String),
}

impl ArchiveError {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }

    pub(crate) fn node(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidNode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// True for every failure raised while validating archive JSON.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson(_) | Self::InvalidStructure(_) | Self::InvalidNode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_mentions_path() {
        let err = ArchiveError::node("project.children[2].children[0]", "must have a valid name");
        assert_eq!(
            err.to_string(),
            "Invalid node at project.children[2].children[0]: must have a valid name"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_runtime_errors_are_not_validation() {
        assert!(!ArchiveError::NoProject.is_validation());
        assert!(!ArchiveError::UnsupportedFormat("pdf".into()).is_validation());
        assert!(!ArchiveError::Decode("bad".into()).is_validation());
    }
}
