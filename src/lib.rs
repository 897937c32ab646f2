//! Loading, searching, analyzing and exporting JSON project archives.
//!
//! An archive is a JSON document describing a directory tree whose file
//! nodes carry their content as base64. [`ProjectLoader`] validates the
//! document into an [`Archive`]; the other services read from it.

pub mod code_analyzer;
pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod loader;
pub mod models;
pub mod search;
pub mod session;
pub mod structure;

pub use code_analyzer::{CodeAnalyzer, LanguageFamily};
pub use config::{DecoderLimits, ScopeConfig, SearchLimits};
pub use decoder::{ContentDecoder, DecodedContent, Encoding, FileType};
pub use error::{ArchiveError, Result};
pub use export::{ExportFormat, ExportService};
pub use loader::ProjectLoader;
pub use models::{
    AnalysisReport, Archive, ArchiveMetadata, ArchiveNode, CodeMetrics, IndexStats, NodeKind,
    ProjectComparison, ProjectRoot, SearchMatch, SearchResult,
};
pub use search::{SearchEngine, SearchIndex};
pub use session::Session;
pub use structure::StructureAnalyzer;
