//! The `assessor report` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use assessor_core::report::AssessmentReport;
use assessor_report::html::generate_html;

use super::run::summary_text;

pub fn execute(input: PathBuf, format: String, output: Option<PathBuf>) -> Result<()> {
    let report = AssessmentReport::load_json(&input)?;

    let rendered = match format.as_str() {
        "text" => {
            let mut text = format!(
                "Respondent: {}\n{}\n\nRecommendations:\n",
                report.respondent_id,
                summary_text(&report)
            );
            for (i, rec) in report.recommendations.iter().enumerate() {
                text.push_str(&format!("  {}. {rec}\n", i + 1));
            }
            text
        }
        "markdown" | "md" => report.to_markdown(),
        "html" => generate_html(&report),
        other => anyhow::bail!("unknown format: {other} (expected text, markdown, or html)"),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
