// Export - Markdown, JSON and HTML reports plus a Mermaid tree diagram
use crate::error::{ArchiveError, Result};
use crate::models::{AnalysisReport, Archive, ArchiveNode, ProjectRoot};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

const EXPORT_VERSION: &str = "1.0.0";
const DIRECTORY_ICON: &str = "📁";
const FILE_ICON: &str = "📄";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ArchiveError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.to_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            _ => Err(ArchiveError::UnsupportedFormat(tag.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    project: &'a ProjectRoot,
    analysis: Option<&'a AnalysisReport>,
    #[serde(rename = "exportedAt")]
    exported_at: String,
    version: &'static str,
}

fn icon(node: &ArchiveNode) -> &'static str {
    if node.is_file() {
        FILE_ICON
    } else {
        DIRECTORY_ICON
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Keeps ASCII letters and digits only. Distinct paths may collide.
fn mermaid_id(path: &str) -> String {
    path.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn mermaid_label(node_icon: &str, name: &str) -> String {
    format!("{} {}", node_icon, name.replace('"', "#quot;"))
}

/// Pure formatting over an archive and an optional analysis report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    pub fn export(
        &self,
        archive: &Archive,
        report: Option<&AnalysisReport>,
        format: ExportFormat,
    ) -> Result<String> {
        self.export_at(archive, report, format, Utc::now())
    }

    /// Parses the format tag first; unknown tags fail with `UnsupportedFormat`.
    pub fn export_as(
        &self,
        archive: &Archive,
        report: Option<&AnalysisReport>,
        tag: &str,
    ) -> Result<String> {
        let format: ExportFormat = tag.parse()?;
        self.export(archive, report, format)
    }

    pub fn export_at(
        &self,
        archive: &Archive,
        report: Option<&AnalysisReport>,
        format: ExportFormat,
        exported_at: DateTime<Utc>,
    ) -> Result<String> {
        info!("Exporting {} as {}", archive.name(), format);
        match format {
            ExportFormat::Markdown => Ok(self.render_markdown(archive, report)),
            ExportFormat::Json => self.render_json(archive, report, exported_at),
            ExportFormat::Html => Ok(self.render_html(archive, report, exported_at)),
        }
    }

    fn render_markdown(&self, archive: &Archive, report: Option<&AnalysisReport>) -> String {
        let mut lines = vec![format!("# {}", archive.name()), String::new()];

        if let Some(description) = archive.description().filter(|d| !d.is_empty()) {
            lines.push(description.to_string());
            lines.push(String::new());
        }
        lines.push(format!("**Created:** {}", archive.created_at()));
        lines.push(String::new());

        if let Some(report) = report {
            let metrics = &report.code_metrics;
            lines.push("## Project Analysis".to_string());
            lines.push(String::new());
            lines.push(format!("- **Total Files:** {}", report.total_files));
            lines.push(format!("- **Total Directories:** {}", report.total_directories));
            lines.push(format!("- **Files with Content:** {}", report.files_with_content));
            lines.push(format!("- **Lines of Code:** {}", metrics.lines_of_code));
            lines.push(String::new());

            lines.push("### File Types".to_string());
            lines.push(String::new());
            for (file_type, count) in &report.file_types {
                lines.push(format!("- **{}:** {}", file_type, count));
            }
            lines.push(String::new());

            lines.push("### Code Metrics".to_string());
            lines.push(String::new());
            lines.push(format!("- **Functions:** {}", metrics.functions));
            lines.push(format!("- **Classes:** {}", metrics.classes));
            lines.push(format!("- **Imports:** {}", metrics.imports));
            lines.push(format!("- **Exports:** {}", metrics.exports));
            lines.push(String::new());
        }

        lines.push("## Project Structure".to_string());
        lines.push(String::new());
        lines.push("```".to_string());
        markdown_tree(archive.children(), "", &mut lines);
        lines.push("```".to_string());

        lines.join("\n")
    }

    fn render_json(
        &self,
        archive: &Archive,
        report: Option<&AnalysisReport>,
        exported_at: DateTime<Utc>,
    ) -> Result<String> {
        let document = ExportDocument {
            project: archive.project(),
            analysis: report,
            exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            version: EXPORT_VERSION,
        };
        serde_json::to_string_pretty(&document).map_err(|e| ArchiveError::Serialize(e.to_string()))
    }

    fn render_html(
        &self,
        archive: &Archive,
        report: Option<&AnalysisReport>,
        exported_at: DateTime<Utc>,
    ) -> String {
        let name = escape_html(archive.name());
        let mut out = String::new();
        out.push_str(&format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{} - Architecture Analysis</title>
<style>
body{{font-family:Arial,sans-serif;max-width:1200px;margin:0 auto;padding:20px;}}
.header{{border-bottom:2px solid #333;padding-bottom:20px;margin-bottom:30px;}}
.metrics{{display:grid;grid-template-columns:repeat(auto-fit,minmax(200px,1fr));gap:20px;margin:20px 0;}}
.metric-card{{background:#f5f5f5;padding:15px;border-radius:8px;text-align:center;}}
.metric-value{{font-size:2em;font-weight:bold;color:#333;}}
.metric-label{{color:#666;margin-top:5px;}}
.tree{{font-family:monospace;background:#f8f8f8;padding:20px;border-radius:8px;}}
.file-types{{display:grid;grid-template-columns:repeat(auto-fit,minmax(150px,1fr));gap:10px;}}
.file-type{{background:#e9ecef;padding:10px;border-radius:4px;}}
footer{{margin-top:40px;padding-top:20px;border-top:1px solid #ccc;color:#666;text-align:center;}}
</style>
</head>
<body>
"#,
            name
        ));

        out.push_str(&format!("<div class=\"header\">\n<h1>{}</h1>\n", name));
        if let Some(description) = archive.description().filter(|d| !d.is_empty()) {
            out.push_str(&format!("<p>{}</p>\n", escape_html(description)));
        }
        out.push_str(&format!(
            "<p><strong>Created:</strong> {}</p>\n</div>\n",
            escape_html(archive.created_at())
        ));

        if let Some(report) = report {
            let metrics = &report.code_metrics;
            out.push_str("<section>\n<h2>Project Analysis</h2>\n<div class=\"metrics\">\n");
            for (value, label) in [
                (report.total_files, "Total Files"),
                (report.total_directories, "Directories"),
                (report.files_with_content, "Files with Content"),
                (metrics.lines_of_code, "Lines of Code"),
            ] {
                out.push_str(&format!(
                    "<div class=\"metric-card\"><div class=\"metric-value\">{}</div><div class=\"metric-label\">{}</div></div>\n",
                    value, label
                ));
            }
            out.push_str("</div>\n<h3>File Types</h3>\n<div class=\"file-types\">\n");
            for (file_type, count) in &report.file_types {
                out.push_str(&format!(
                    "<div class=\"file-type\"><strong>{}:</strong> {}</div>\n",
                    escape_html(file_type),
                    count
                ));
            }
            out.push_str("</div>\n<h3>Code Metrics</h3>\n<ul>\n");
            out.push_str(&format!("<li><strong>Functions:</strong> {}</li>\n", metrics.functions));
            out.push_str(&format!("<li><strong>Classes:</strong> {}</li>\n", metrics.classes));
            out.push_str(&format!("<li><strong>Imports:</strong> {}</li>\n", metrics.imports));
            out.push_str(&format!("<li><strong>Exports:</strong> {}</li>\n", metrics.exports));
            out.push_str("</ul>\n</section>\n");
        }

        out.push_str("<section>\n<h2>Project Structure</h2>\n<div class=\"tree\">\n");
        html_tree(archive.children(), "", &mut out);
        out.push_str("\n</div>\n</section>\n");

        out.push_str(&format!(
            "<footer><p>Generated by archscope on {}</p></footer>\n</body>\n</html>\n",
            exported_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out
    }

    /// `graph TD` listing, one node declaration and one parent edge per tree node.
    pub fn mermaid_diagram(&self, archive: &Archive) -> String {
        let root = archive.name();
        let mut lines = vec![
            "graph TD".to_string(),
            format!("    {}[\"{}\"]", mermaid_id(root), mermaid_label(DIRECTORY_ICON, root)),
        ];
        mermaid_nodes(archive.children(), root, &mut lines);
        lines.join("\n")
    }
}

fn markdown_tree(nodes: &[ArchiveNode], indent: &str, lines: &mut Vec<String>) {
    for node in nodes {
        lines.push(format!("{}{} {}", indent, icon(node), node.name()));
        markdown_tree(node.children(), &format!("{}  ", indent), lines);
    }
}

fn html_tree(nodes: &[ArchiveNode], indent: &str, out: &mut String) {
    for node in nodes {
        out.push_str(&format!("{}{} {}<br>", indent, icon(node), escape_html(node.name())));
        html_tree(node.children(), &format!("{}&nbsp;&nbsp;", indent), out);
    }
}

fn mermaid_nodes(nodes: &[ArchiveNode], parent_path: &str, lines: &mut Vec<String>) {
    let parent_id = mermaid_id(parent_path);
    for node in nodes {
        let path = format!("{}/{}", parent_path, node.name());
        let id = mermaid_id(&path);
        lines.push(format!("    {}[\"{}\"]", id, mermaid_label(icon(node), node.name())));
        lines.push(format!("    {} --> {}", parent_id, id));
        mermaid_nodes(node.children(), &path, lines);
    }
}
