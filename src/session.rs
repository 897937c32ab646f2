// Caller-owned session: the currently loaded archive and the results derived from it
use crate::config::ScopeConfig;
use crate::decoder::ContentDecoder;
use crate::error::{ArchiveError, Result};
use crate::export::ExportService;
use crate::loader::ProjectLoader;
use crate::models::{AnalysisReport, Archive, ArchiveNode, SearchResult};
use crate::search::SearchEngine;
use crate::structure::StructureAnalyzer;
use tracing::{debug, warn};

/// Holds one archive at a time. A failed load leaves the previous archive
/// and its results in place and records the error message.
#[derive(Debug, Default)]
pub struct Session {
    loader: ProjectLoader,
    search_engine: SearchEngine,
    analyzer: StructureAnalyzer,
    exporter: ExportService,

    current_project: Option<Archive>,
    search_results: Vec<SearchResult>,
    analysis_report: Option<AnalysisReport>,
    selected_file_path: Option<String>,
    is_loading: bool,
    error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ScopeConfig) -> Self {
        let decoder = ContentDecoder::new().with_limits(config.decoder);
        Self {
            search_engine: SearchEngine::new()
                .with_limits(config.search)
                .with_decoder(decoder.clone()),
            analyzer: StructureAnalyzer::new().with_decoder(decoder),
            ..Self::default()
        }
    }

    pub fn current_project(&self) -> Option<&Archive> {
        self.current_project.as_ref()
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    pub fn analysis_report(&self) -> Option<&AnalysisReport> {
        self.analysis_report.as_ref()
    }

    pub fn selected_file_path(&self) -> Option<&str> {
        self.selected_file_path.as_deref()
    }

    pub fn selected_file(&self) -> Option<&ArchiveNode> {
        let path = self.selected_file_path.as_deref()?;
        let archive = self.current_project.as_ref()?;
        self.loader.build_file_index(archive).get(path).copied()
    }

    /// Always false between calls; set only while an operation runs.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    fn fail(&mut self, err: &ArchiveError) {
        warn!("{}", err);
        self.error = Some(err.to_string());
        self.is_loading = false;
    }

    fn project(&self) -> Result<&Archive> {
        self.current_project.as_ref().ok_or(ArchiveError::NoProject)
    }

    /// On success the new archive replaces the old one and all derived state is cleared.
    pub fn load_project(&mut self, json_data: &str) -> Result<&Archive> {
        self.begin();
        match self.loader.load_project(json_data) {
            Ok(archive) => {
                self.search_results.clear();
                self.analysis_report = None;
                self.selected_file_path = None;
                self.is_loading = false;
                Ok(self.current_project.insert(archive))
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    pub fn search_content(&mut self, query: &str) -> Result<&[SearchResult]> {
        let archive = self.current_project.as_ref().ok_or(ArchiveError::NoProject)?;
        self.is_loading = true;
        self.error = None;

        self.search_results = self.search_engine.search(archive, query);
        self.is_loading = false;
        debug!("Stored {} search results", self.search_results.len());
        Ok(&self.search_results)
    }

    pub fn analyze_structure(&mut self) -> Result<&AnalysisReport> {
        let archive = self.current_project.as_ref().ok_or(ArchiveError::NoProject)?;
        self.is_loading = true;
        self.error = None;

        let report = self.analyzer.analyze(archive);
        self.is_loading = false;
        Ok(self.analysis_report.insert(report))
    }

    pub fn select_file(&mut self, path: &str) -> Result<&ArchiveNode> {
        let archive = self.project()?;
        if !self.loader.build_file_index(archive).contains_key(path) {
            return Err(ArchiveError::UnknownPath(path.to_string()));
        }
        self.selected_file_path = Some(path.to_string());
        self.selected_file().ok_or_else(|| ArchiveError::UnknownPath(path.to_string()))
    }

    /// Renders the current archive with the latest analysis report, if any.
    pub fn export_report(&self, format: &str) -> Result<String> {
        let archive = self.project()?;
        self.exporter
            .export_as(archive, self.analysis_report.as_ref(), format)
    }

    pub fn mermaid_diagram(&self) -> Result<String> {
        Ok(self.exporter.mermaid_diagram(self.project()?))
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn reset(&mut self) {
        self.current_project = None;
        self.search_results.clear();
        self.analysis_report = None;
        self.selected_file_path = None;
        self.is_loading = false;
        self.error = None;
        self.search_engine.clear_index();
    }
}
