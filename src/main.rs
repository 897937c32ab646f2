use anyhow::{Context, Result};
use archscope::{ProjectLoader, ScopeConfig, Session, StructureAnalyzer};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli_output;

use cli_output::{AnalysisView, OutputMode, OutputWriter};

#[derive(Parser)]
#[command(name = "archscope")]
#[command(about = "Inspect, search and export JSON project archives", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/archscope/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that an archive is well-formed
    Validate {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Report file counts, file types and code metrics
    Analyze {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Case-insensitive search over file names and content
    Search {
        file: PathBuf,

        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Render the archive as Markdown, JSON or HTML
    Export {
        file: PathBuf,

        /// Output format (md, json, html)
        #[arg(short, long, default_value = "md")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave the analysis sections out
        #[arg(long)]
        no_analysis: bool,
    },

    /// Print a Mermaid diagram of the tree
    Diagram {
        file: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List paths added, removed or modified between two archives
    Compare {
        old: PathBuf,

        new: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

fn read_archive(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_session(config: &ScopeConfig, path: &Path) -> Result<Session> {
    let mut session = Session::with_config(config);
    session
        .load_project(&read_archive(path)?)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(session)
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ScopeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { file, json } => {
            let out = OutputWriter::new(OutputMode::detect(json));
            let loader = ProjectLoader::new();
            let archive = loader
                .load_project(&read_archive(&file)?)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let size = fs::metadata(&file).map(|m| m.len()).unwrap_or(0);
            out.metadata(&loader.extract_metadata(&archive), size)
        }

        Commands::Analyze { file, json } => {
            let out = OutputWriter::new(OutputMode::detect(json));
            let mut session = load_session(&config, &file)?;
            let report = session.analyze_structure()?;

            let analyzer = StructureAnalyzer::new();
            let view = AnalysisView {
                report,
                distribution: analyzer.file_type_distribution(report),
                complexity_score: analyzer.complexity_score(report),
                insights: analyzer.architecture_insights(report),
                summary: analyzer.generate_summary(report),
            };
            out.analysis(&view)
        }

        Commands::Search { file, query, json } => {
            let out = OutputWriter::new(OutputMode::detect(json));
            let mut session = load_session(&config, &file)?;
            let results = session.search_content(&query)?;
            out.search_results(&query, results)
        }

        Commands::Export {
            file,
            format,
            output,
            no_analysis,
        } => {
            let mut session = load_session(&config, &file)?;
            if !no_analysis {
                session.analyze_structure()?;
            }
            let text = session.export_report(&format)?;
            write_output(&text, output.as_deref())
        }

        Commands::Diagram { file, output } => {
            let session = load_session(&config, &file)?;
            write_output(&session.mermaid_diagram()?, output.as_deref())
        }

        Commands::Compare { old, new, json } => {
            let out = OutputWriter::new(OutputMode::detect(json));
            let loader = ProjectLoader::new();
            let before = loader
                .load_project(&read_archive(&old)?)
                .with_context(|| format!("Failed to load {}", old.display()))?;
            let after = loader
                .load_project(&read_archive(&new)?)
                .with_context(|| format!("Failed to load {}", new.display()))?;
            out.comparison(&loader.compare(&before, &after))
        }
    }
}
