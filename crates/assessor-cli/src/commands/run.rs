//! The `assessor run` command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use assessor_core::catalog::{parse_catalog, validate_catalog};
use assessor_core::model::{Message, Question, ResponseRecord, SessionPhase, Speaker};
use assessor_core::report::AssessmentReport;
use assessor_core::scoring::FeedbackTier;
use assessor_core::session::{SessionConfig, SessionContext, SessionObserver};
use assessor_core::SessionError;
use assessor_report::html::write_html_report;
use assessor_store::config::{create_store, load_config_from, StoreConfig};

/// Prints the asker's side of the conversation to stdout.
struct ConsoleObserver {
    interviewer: String,
}

impl SessionObserver for ConsoleObserver {
    fn on_message(&self, message: &Message) {
        if message.speaker == Speaker::Asker {
            println!("\n{}: {}\n", self.interviewer, message.text);
        }
    }

    fn on_response_scored(&self, question: &Question, record: &ResponseRecord, tier: FeedbackTier) {
        tracing::debug!(
            "  [{}] scored {} ({})",
            question.id,
            record.score,
            tier_label(tier)
        );
    }

    fn on_complete(&self, report: &AssessmentReport) {
        eprintln!(
            "Assessment complete: {:.0}% ({})",
            report.overall_score, report.band
        );
    }
}

pub(crate) fn tier_label(tier: FeedbackTier) -> &'static str {
    match tier {
        FeedbackTier::Strong => "strong",
        FeedbackTier::Partial => "partial",
        FeedbackTier::Redirect => "redirect",
    }
}

pub async fn execute(
    respondent: String,
    catalog_path: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
    immediate: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let respondent = respondent.trim().to_string();
    anyhow::ensure!(!respondent.is_empty(), "respondent id must not be empty");

    let config = load_config_from(config_path.as_deref())?;
    let session_config = if immediate {
        SessionConfig {
            interviewer_name: config.interviewer_name.clone(),
            ..SessionConfig::immediate()
        }
    } else {
        config.session_config()
    };
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let catalog_path = catalog_path.or_else(|| match &config.store {
        StoreConfig::File { catalog, .. } => catalog.clone(),
        StoreConfig::Memory => None,
    });
    let store = create_store(&config.store, catalog_path.as_deref())?;
    let context = match &catalog_path {
        Some(path) => SessionContext::new(store, parse_catalog(path)?, session_config),
        None => SessionContext::from_store(store, session_config)
            .await
            .context("failed to load questions from the session store")?,
    };

    for w in validate_catalog(context.catalog()) {
        let id = w.question_id.as_deref().unwrap_or("catalog");
        tracing::warn!("[{id}] {}", w.message);
    }

    let context = context.with_observer(Arc::new(ConsoleObserver {
        interviewer: config.interviewer_name.clone(),
    }));

    eprintln!(
        "assessor v{}: {} for {} ({} questions)",
        env!("CARGO_PKG_VERSION"),
        context.catalog().name,
        respondent,
        context.catalog().len()
    );

    let mut session = context.start_session(&respondent).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while session.phase() == SessionPhase::Active {
        let (answered, total) = session.turns().progress();
        print!("[{}/{}] > ", answered + 1, total);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            eprintln!(
                "\nInput ended before the assessment finished; session {} remains in progress.",
                session.handle()
            );
            return Ok(());
        };

        match session.submit_response(&line).await {
            Ok(_) => {}
            Err(SessionError::Validation(e)) => {
                eprintln!("Your answer was not recorded ({e}). Please type a response.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let report = session
        .report()
        .context("session completed without a report")?;

    eprintln!("\n{}", summary_text(report));
    eprintln!(
        "Time taken: {}",
        session.elapsed_display(chrono::Utc::now())
    );

    save_outputs(report, &output, &format)
}

fn save_outputs(report: &AssessmentReport, output: &Path, format: &str) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let stem = format!(
        "report-{}-{}",
        sanitize(&report.respondent_id),
        report.created_at.format("%Y-%m-%dT%H%M%S")
    );

    let formats: Vec<&str> = if format == "all" {
        vec!["json", "html", "markdown"]
    } else {
        format.split(',').map(str::trim).collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("{stem}.json"));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("{stem}.html"));
                write_html_report(report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            "markdown" | "md" => {
                let path = output.join(format!("{stem}.md"));
                std::fs::write(&path, report.to_markdown())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Markdown report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    Ok(())
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Per-question table plus the overall line.
pub(crate) fn summary_text(report: &AssessmentReport) -> String {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Question", "Category", "Score", "Feedback"]);

    for r in &report.responses {
        table.add_row(vec![
            Cell::new(&r.question_id),
            Cell::new(&r.category),
            Cell::new(r.score),
            Cell::new(tier_label(FeedbackTier::for_score(r.score))),
        ]);
    }

    format!(
        "{table}\nOverall: {:.1}% ({})",
        report.overall_score, report.band
    )
}
