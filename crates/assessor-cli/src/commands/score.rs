//! The `assessor score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use assessor_core::catalog::parse_catalog;
use assessor_core::scoring::{explain, scored, FeedbackTier};

use super::run::tier_label;

pub fn execute(catalog_path: PathBuf, question_id: String, answer: String) -> Result<()> {
    let catalog = parse_catalog(&catalog_path)?;
    let question = catalog.find(&question_id).with_context(|| {
        format!(
            "question '{question_id}' not found in {}",
            catalog_path.display()
        )
    })?;

    let phrases = question.expected_keyword_phrases.as_slice();
    let (raw, total) = scored(phrases, &answer);

    let mut table = Table::new();
    table.set_header(vec!["Expected phrase", "Matched", "Missing", "Points"]);
    for m in explain(phrases, &answer) {
        table.add_row(vec![
            Cell::new(&m.phrase),
            Cell::new(m.matched.join(" ")),
            Cell::new(m.missing.join(" ")),
            Cell::new(format!("{:.1}", m.points)),
        ]);
    }

    println!("{table}");
    println!(
        "Score: {total} ({})",
        tier_label(FeedbackTier::for_raw(raw))
    );

    Ok(())
}
