//! The `assessor` command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_FILTER: &str = "assessor_core=info,assessor_store=info,assessor_cli=info";

#[derive(Parser)]
#[command(name = "assessor", version, about = "Keyword-scored interview assessments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive assessment, one answer per line on stdin
    Run {
        /// Respondent identifier
        #[arg(long)]
        respondent: String,

        /// Path to a .toml question catalog (defaults to the store's catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output directory (defaults to the configured output_dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, markdown, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Skip the pauses between messages
        #[arg(long)]
        immediate: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question catalog TOML files
    Validate {
        /// Path to catalog file or directory
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Score a single answer against a catalog question
    Score {
        /// Path to catalog file
        #[arg(long)]
        catalog: PathBuf,

        /// Question ID
        #[arg(long)]
        question: String,

        /// Answer text
        #[arg(long)]
        answer: String,
    },

    /// Show whether a respondent may start an assessment
    Status {
        /// Respondent identifier
        #[arg(long)]
        respondent: String,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render a saved JSON report
    Report {
        /// Report JSON produced by `run`
        #[arg(long)]
        input: PathBuf,

        /// Output format: text, markdown, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create starter config and example catalog
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            respondent,
            catalog,
            output,
            format,
            immediate,
            config,
        } => {
            commands::run::execute(respondent, catalog, output, format, immediate, config).await
        }
        Commands::Validate { catalog } => commands::validate::execute(catalog),
        Commands::Score {
            catalog,
            question,
            answer,
        } => commands::score::execute(catalog, question, answer),
        Commands::Status {
            respondent,
            json,
            config,
        } => commands::status::execute(respondent, json, config).await,
        Commands::Report {
            input,
            format,
            output,
        } => commands::report::execute(input, format, output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
