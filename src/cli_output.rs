// Terminal output for the archscope binary: human, plain or JSON
use archscope::{AnalysisReport, ArchiveMetadata, ProjectComparison, SearchResult};
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Colors and tables
    Human,
    /// One pretty-printed JSON document on stdout
    Json,
    /// No colors (for pipes/logs)
    Plain,
}

impl OutputMode {
    /// `--json` wins; otherwise JSON via `ARCHSCOPE_JSON`, plain when stdout is not a terminal.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag || std::env::var("ARCHSCOPE_JSON").is_ok() {
            Self::Json
        } else if !io::stdout().is_terminal() {
            Self::Plain
        } else {
            Self::Human
        }
    }
}

/// Analysis report together with the views derived from it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView<'a> {
    pub report: &'a AnalysisReport,
    pub distribution: BTreeMap<String, f64>,
    pub complexity_score: usize,
    pub insights: Vec<String>,
    pub summary: String,
}

pub struct OutputWriter {
    mode: OutputMode,
}

impl OutputWriter {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, OutputMode::Json)
    }

    pub fn section(&self, title: &str) {
        match self.mode {
            OutputMode::Human => {
                println!();
                println!("{}", title.cyan().bold());
                println!("{}", "═".repeat(title.chars().count()).cyan());
            }
            OutputMode::Plain => {
                println!();
                println!("{}", title);
                println!("{}", "=".repeat(title.chars().count()));
            }
            OutputMode::Json => {}
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => println!("  {} {}", "✓".green(), message),
            OutputMode::Plain => println!("  [OK] {}", message),
            OutputMode::Json => {}
        }
    }

    pub fn info(&self, message: &str) {
        if !self.is_json() {
            println!("  {}", message);
        }
    }

    pub fn table(&self, rows: &[(&str, String)]) {
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        match self.mode {
            OutputMode::Human => {
                for (key, value) in rows {
                    println!("  {:width$} │ {}", key.yellow(), value, width = width);
                }
            }
            OutputMode::Plain => {
                for (key, value) in rows {
                    println!("  {:width$} : {}", key, value, width = width);
                }
            }
            OutputMode::Json => {}
        }
    }

    pub fn bar_chart(&self, label: &str, percent: f64, width: usize) {
        let filled = ((percent / 100.0 * width as f64) as usize).min(width);
        let bar = match self.mode {
            OutputMode::Human => format!("{}{}", "█".repeat(filled).cyan(), "░".repeat(width - filled)),
            OutputMode::Plain => format!("{}{}", "#".repeat(filled), "-".repeat(width - filled)),
            OutputMode::Json => return,
        };
        println!("  {:12} │{} {:.2}%", label, bar, percent);
    }

    /// Only prints in JSON mode.
    pub fn emit_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    pub fn metadata(&self, metadata: &ArchiveMetadata, file_size: u64) -> anyhow::Result<()> {
        if self.is_json() {
            return self.emit_json(metadata);
        }
        self.success(&format!("{} is a valid project archive", metadata.name));
        self.section("Project");
        self.table(&[
            ("Name", metadata.name.clone()),
            ("Type", metadata.kind.as_str().to_string()),
            ("Description", metadata.description.clone().unwrap_or_else(|| "-".to_string())),
            ("Created", metadata.created_at.clone()),
            ("Nodes", metadata.total_nodes.to_string()),
            ("Archive size", format_size(file_size)),
        ]);
        Ok(())
    }

    pub fn analysis(&self, view: &AnalysisView<'_>) -> anyhow::Result<()> {
        if self.is_json() {
            return self.emit_json(view);
        }
        let report = view.report;
        let metrics = &report.code_metrics;

        self.section("Project Analysis");
        self.table(&[
            ("Files", report.total_files.to_string()),
            ("Directories", report.total_directories.to_string()),
            ("With content", report.files_with_content.to_string()),
            ("Lines of code", metrics.lines_of_code.to_string()),
            ("Complexity score", format!("{}/100", view.complexity_score)),
        ]);

        self.section("Code Metrics");
        self.table(&[
            ("Functions", metrics.functions.to_string()),
            ("Classes", metrics.classes.to_string()),
            ("Imports", metrics.imports.to_string()),
            ("Exports", metrics.exports.to_string()),
            (
                "Complexity",
                metrics.complexity.map_or_else(|| "-".to_string(), |c| c.to_string()),
            ),
        ]);

        if !view.distribution.is_empty() {
            self.section("File Types");
            for (file_type, percent) in &view.distribution {
                self.bar_chart(file_type, *percent, 30);
            }
        }

        if !view.insights.is_empty() {
            self.section("Insights");
            for insight in &view.insights {
                self.info(&format!("• {}", insight));
            }
        }

        println!();
        self.info(&view.summary);
        Ok(())
    }

    pub fn search_results(&self, query: &str, results: &[SearchResult]) -> anyhow::Result<()> {
        if self.is_json() {
            return self.emit_json(&results);
        }
        if results.is_empty() {
            self.info(&format!("No matches for {:?}", query));
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Path", "Line", "Col", "Context"]);
        for result in results {
            for m in &result.matches {
                table.add_row(vec![
                    result.path.clone(),
                    m.line.to_string(),
                    m.column.to_string(),
                    m.context.clone(),
                ]);
            }
        }
        println!("{table}");
        self.success(&format!("{} results for {:?}", results.len(), query));
        Ok(())
    }

    pub fn comparison(&self, comparison: &ProjectComparison) -> anyhow::Result<()> {
        if self.is_json() {
            return self.emit_json(comparison);
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Change", "Path"]);
        for (label, paths) in [
            ("added", &comparison.added),
            ("removed", &comparison.removed),
            ("modified", &comparison.modified),
        ] {
            for path in paths {
                table.add_row(vec![label.to_string(), path.clone()]);
            }
        }
        println!("{table}");
        self.table(&[
            ("Added", comparison.added.len().to_string()),
            ("Removed", comparison.removed.len().to_string()),
            ("Modified", comparison.modified.len().to_string()),
            ("Unchanged", comparison.unchanged.len().to_string()),
        ]);
        Ok(())
    }
}

/// Archive file size for the metadata table, in binary units up to GB.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_flag_forces_json() {
        assert_eq!(OutputMode::detect(true), OutputMode::Json);
        assert!(matches!(
            OutputMode::detect(false),
            OutputMode::Plain | OutputMode::Human | OutputMode::Json
        ));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0 GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.0 GB");
    }
}
