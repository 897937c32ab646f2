// Structure analysis - tree statistics and aggregate code metrics for an archive
use crate::code_analyzer::CodeAnalyzer;
use crate::decoder::ContentDecoder;
use crate::models::{AnalysisReport, Archive, ArchiveNode, CodeMetrics};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const UNKNOWN_TYPE: &str = "unknown";

#[derive(Debug, Default)]
struct Tally {
    total_files: usize,
    total_directories: usize,
    files_with_content: usize,
    file_types: BTreeMap<String, usize>,
    code_metrics: CodeMetrics,
}

impl Tally {
    fn bump(&mut self, file_type: &str) {
        *self.file_types.entry(file_type.to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructureAnalyzer {
    decoder: ContentDecoder,
    code_analyzer: CodeAnalyzer,
}

impl StructureAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoder(mut self, decoder: ContentDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn analyze(&self, archive: &Archive) -> AnalysisReport {
        self.analyze_at(archive, Utc::now())
    }

    /// Same as [`analyze`](Self::analyze) with a caller-chosen report timestamp.
    pub fn analyze_at(&self, archive: &Archive, created_at: DateTime<Utc>) -> AnalysisReport {
        info!("Analyzing structure of {}", archive.name());
        let mut tally = Tally::default();

        archive.walk(|path, node| match node {
            ArchiveNode::Directory { .. } => tally.total_directories += 1,
            ArchiveNode::File {
                name,
                content_base64,
            } => {
                tally.total_files += 1;
                match content_base64 {
                    Some(payload) => {
                        tally.files_with_content += 1;
                        self.analyze_file(path, name, payload, &mut tally);
                    }
                    None => {
                        let extension = match name.rsplit_once('.') {
                            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
                            _ => UNKNOWN_TYPE.to_string(),
                        };
                        tally.bump(&extension);
                    }
                }
            }
        });

        debug!(
            "{} files, {} directories, {} file types",
            tally.total_files,
            tally.total_directories,
            tally.file_types.len()
        );

        AnalysisReport {
            total_files: tally.total_files,
            total_directories: tally.total_directories,
            files_with_content: tally.files_with_content,
            file_types: tally.file_types,
            code_metrics: tally.code_metrics,
            created_at,
        }
    }

    fn analyze_file(&self, path: &str, name: &str, payload: &str, tally: &mut Tally) {
        let decoded = self.decoder.decode(payload, name);
        if let Some(reason) = &decoded.error {
            warn!("Failed to analyze file {}: {}", path, reason);
            tally.bump(UNKNOWN_TYPE);
            return;
        }

        tally.bump(decoded.file_type.as_str());
        if self.decoder.should_analyze(name, &decoded) {
            let metrics = self.code_analyzer.analyze(&decoded.content, decoded.file_type);
            tally.code_metrics.merge(&metrics);
        }
    }

    /// Percentage share of each file type, rounded to two decimals.
    pub fn file_type_distribution(&self, report: &AnalysisReport) -> BTreeMap<String, f64> {
        let total: usize = report.file_types.values().sum();
        if total == 0 {
            return BTreeMap::new();
        }

        report
            .file_types
            .iter()
            .map(|(file_type, &count)| {
                let percent = count as f64 / total as f64 * 100.0;
                (file_type.clone(), (percent * 100.0).round() / 100.0)
            })
            .collect()
    }

    /// Weighted size score clamped to 0..=100.
    pub fn complexity_score(&self, report: &AnalysisReport) -> usize {
        if report.total_files == 0 {
            return 0;
        }
        let metrics = &report.code_metrics;
        let score = metrics.functions * 2
            + metrics.classes * 3
            + report.total_files
            + metrics.lines_of_code / 100;
        score.min(100)
    }

    pub fn architecture_insights(&self, report: &AnalysisReport) -> Vec<String> {
        let mut insights = Vec::new();
        let metrics = &report.code_metrics;
        let total_files = report.total_files;

        if total_files > 100 {
            insights.push("Large project with extensive file structure");
        } else if total_files < 10 {
            insights.push("Small project with minimal file structure");
        }

        // Content-less files are bucketed by raw extension, so both spellings count.
        let count_of = |keys: &[&str]| {
            keys.iter()
                .map(|key| report.file_types.get(*key).copied().unwrap_or(0))
                .find(|&count| count > 0)
                .unwrap_or(0)
        };
        let javascript = count_of(&["javascript", "js"]);
        let typescript = count_of(&["typescript", "ts"]);
        let python = count_of(&["python", "py"]);
        let java = count_of(&["java"]);

        if typescript > javascript {
            insights.push("TypeScript-first project with strong typing");
        } else if javascript > 0 {
            insights.push("JavaScript-based project");
        }
        if python > 0 {
            insights.push("Python components detected");
        }
        if java > 0 {
            insights.push("Java-based backend components");
        }

        let avg_functions = if total_files > 0 {
            metrics.functions as f64 / total_files as f64
        } else {
            0.0
        };
        if avg_functions > 10.0 {
            insights.push("High function density - consider refactoring");
        } else if avg_functions > 5.0 {
            insights.push("Well-structured code organization");
        }

        if metrics.imports > metrics.exports * 2 {
            insights.push("High dependency usage - monitor external dependencies");
        }

        insights.into_iter().map(String::from).collect()
    }

    pub fn generate_summary(&self, report: &AnalysisReport) -> String {
        let content_percent = if report.total_files == 0 {
            0
        } else {
            (report.files_with_content as f64 / report.total_files as f64 * 100.0).round() as usize
        };
        let metrics = &report.code_metrics;

        format!(
            "Project contains {} files and {} directories. \
             {} files have content ({}%). \
             Code metrics: {} functions, {} classes, {} lines of code.",
            report.total_files,
            report.total_directories,
            report.files_with_content,
            content_percent,
            metrics.functions,
            metrics.classes,
            metrics.lines_of_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ProjectLoader;
    use chrono::TimeZone;

    const DEMO: &str = r#"{"project":{"name":"Demo","type":"directory","created_at":"2024-01-01T00:00:00Z","children":[{"name":"a.py","type":"file","content_base64":"ZGVmIGZvbygpOgogICAgcGFzcw=="}]}}"#;

    fn report_with(total_files: usize, file_types: &[(&str, usize)], metrics: CodeMetrics) -> AnalysisReport {
        AnalysisReport {
            total_files,
            total_directories: 0,
            files_with_content: 0,
            file_types: file_types.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            code_metrics: metrics,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_demo_archive_report() {
        let archive = ProjectLoader::new().load_project(DEMO).unwrap();
        let report = StructureAnalyzer::new().analyze(&archive);

        assert_eq!(report.total_files, 1);
        assert_eq!(report.total_directories, 0);
        assert_eq!(report.files_with_content, 1);
        assert_eq!(report.file_types.len(), 1);
        assert_eq!(report.file_types["python"], 1);
        assert_eq!(report.code_metrics.functions, 1);
        assert_eq!(report.code_metrics.lines_of_code, 2);
        assert!(report.code_metrics.complexity.is_some());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let archive = ProjectLoader::new().load_project(DEMO).unwrap();
        let analyzer = StructureAnalyzer::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(analyzer.analyze_at(&archive, at), analyzer.analyze_at(&archive, at));
    }

    #[test]
    fn test_contentless_files_bucket_by_extension() {
        let archive = ProjectLoader::new()
            .load_project(
                r#"{"project":{"name":"P","type":"directory","created_at":"t","children":[
                    {"name":"src","type":"directory","children":[
                        {"name":"App.TSX","type":"file"},
                        {"name":"util.js","type":"file"}
                    ]},
                    {"name":"Makefile","type":"file"},
                    {"name":"docs","type":"directory"}
                ]}}"#,
            )
            .unwrap();
        let report = StructureAnalyzer::new().analyze(&archive);

        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_directories, 2);
        assert_eq!(report.files_with_content, 0);
        assert_eq!(report.file_types["tsx"], 1);
        assert_eq!(report.file_types["js"], 1);
        assert_eq!(report.file_types["unknown"], 1);
        assert_eq!(report.code_metrics, CodeMetrics::default());
    }

    #[test]
    fn test_undecodable_file_is_unknown() {
        let archive = Archive::new(
            "P".to_string(),
            None,
            "t".to_string(),
            vec![
                ArchiveNode::file("broken.js", Some("@@@@".to_string())),
                ArchiveNode::file("ok.py", Some(ContentDecoder::new().encode("import os\n"))),
            ],
        );
        let report = StructureAnalyzer::new().analyze(&archive);

        assert_eq!(report.files_with_content, 2);
        assert_eq!(report.file_types["unknown"], 1);
        assert_eq!(report.file_types["python"], 1);
        assert!(!report.file_types.contains_key("javascript"));
        assert_eq!(report.code_metrics.imports, 1);
    }

    #[test]
    fn test_binary_files_are_typed_but_not_analyzed() {
        let png = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            [0x89u8, b'P', b'N', b'G', 0, 0, 0, 0x0d],
        );
        let archive = Archive::new(
            "P".to_string(),
            None,
            "t".to_string(),
            vec![ArchiveNode::file("logo.png", Some(png))],
        );
        let report = StructureAnalyzer::new().analyze(&archive);

        assert_eq!(report.file_types["image"], 1);
        assert_eq!(report.code_metrics.complexity, None);
        assert_eq!(report.code_metrics.lines_of_code, 0);
    }

    #[test]
    fn test_file_type_distribution() {
        let analyzer = StructureAnalyzer::new();
        let report = report_with(3, &[("python", 1), ("markdown", 2)], CodeMetrics::default());
        let distribution = analyzer.file_type_distribution(&report);
        assert_eq!(distribution["python"], 33.33);
        assert_eq!(distribution["markdown"], 66.67);

        let empty = report_with(0, &[], CodeMetrics::default());
        assert!(analyzer.file_type_distribution(&empty).is_empty());
    }

    #[test]
    fn test_complexity_score() {
        let analyzer = StructureAnalyzer::new();
        let small = CodeMetrics {
            functions: 4,
            classes: 1,
            lines_of_code: 250,
            ..Default::default()
        };
        // 4*2 + 1*3 + 5 + 2
        assert_eq!(analyzer.complexity_score(&report_with(5, &[], small)), 18);

        let large = CodeMetrics {
            functions: 80,
            ..Default::default()
        };
        assert_eq!(analyzer.complexity_score(&report_with(5, &[], large)), 100);
        assert_eq!(
            analyzer.complexity_score(&report_with(0, &[], CodeMetrics::default())),
            0
        );
    }

    #[test]
    fn test_architecture_insights() {
        let analyzer = StructureAnalyzer::new();

        let metrics = CodeMetrics {
            functions: 22,
            imports: 5,
            exports: 2,
            ..Default::default()
        };
        let insights =
            analyzer.architecture_insights(&report_with(2, &[("typescript", 2), ("js", 1)], metrics));
        assert_eq!(
            insights,
            vec![
                "Small project with minimal file structure",
                "TypeScript-first project with strong typing",
                "High function density - consider refactoring",
                "High dependency usage - monitor external dependencies",
            ]
        );

        let metrics = CodeMetrics {
            functions: 700,
            imports: 10,
            exports: 5,
            ..Default::default()
        };
        let insights = analyzer.architecture_insights(&report_with(
            101,
            &[("javascript", 90), ("py", 1), ("java", 10)],
            metrics,
        ));
        assert_eq!(
            insights,
            vec![
                "Large project with extensive file structure",
                "JavaScript-based project",
                "Python components detected",
                "Java-based backend components",
                "Well-structured code organization",
            ]
        );

        let middle = report_with(50, &[], CodeMetrics::default());
        assert!(analyzer.architecture_insights(&middle).is_empty());
    }

    #[test]
    fn test_generate_summary() {
        let analyzer = StructureAnalyzer::new();
        let archive = ProjectLoader::new().load_project(DEMO).unwrap();
        let report = analyzer.analyze(&archive);
        assert_eq!(
            analyzer.generate_summary(&report),
            "Project contains 1 files and 0 directories. 1 files have content (100%). \
             Code metrics: 1 functions, 0 classes, 2 lines of code."
        );

        let empty = report_with(0, &[], CodeMetrics::default());
        assert!(analyzer.generate_summary(&empty).contains("0 files have content (0%)"));
    }
}
