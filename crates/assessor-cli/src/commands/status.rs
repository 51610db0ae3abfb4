//! The `assessor status` command.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use assessor_core::catalog::Catalog;
use assessor_core::session::{SessionConfig, SessionContext, StartAvailability};
use assessor_store::config::{create_store, load_config_from};

#[derive(Serialize)]
struct StatusOutput<'a> {
    respondent_id: &'a str,
    store: &'a str,
    may_start: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overall_score: Option<f64>,
}

pub async fn execute(respondent: String, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store, None)?;

    let store_name = store.name().to_string();
    let context = SessionContext::new(
        store,
        Catalog::from_questions(Vec::new()),
        SessionConfig::default(),
    );
    let availability = StartAvailability::from(context.check_eligibility(&respondent).await?);
    let summary = match &availability {
        StartAvailability::Blocked(summary) => Some(summary),
        _ => None,
    };

    if json {
        let output = StatusOutput {
            respondent_id: &respondent,
            store: &store_name,
            may_start: availability == StartAvailability::Available,
            completed_at: summary.map(|s| s.completed_at),
            overall_score: summary.map(|s| s.overall_score),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match summary {
        Some(s) => println!(
            "{respondent}: already completed on {} with {:.0}%",
            s.completed_at.format("%Y-%m-%d %H:%M UTC"),
            s.overall_score
        ),
        None => println!("{respondent}: may start an assessment"),
    }

    Ok(())
}
