//! The `assessor init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create assessor.toml
    if std::path::Path::new("assessor.toml").exists() {
        println!("assessor.toml already exists, skipping.");
    } else {
        std::fs::write("assessor.toml", SAMPLE_CONFIG)?;
        println!("Created assessor.toml");
    }

    // Create example catalog
    std::fs::create_dir_all("catalogs")?;
    let example_path = std::path::Path::new("catalogs/example.toml");
    if example_path.exists() {
        println!("catalogs/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_CATALOG)?;
        println!("Created catalogs/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Review assessor.toml (store location, interviewer name, pacing)");
    println!("  2. Run: assessor validate --catalog catalogs/example.toml");
    println!("  3. Run: assessor run --respondent you@example.com");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessor configuration

interviewer_name = "Alex"
greeting_delay_ms = 2000
feedback_delay_ms = 1000
next_question_delay_ms = 1500
output_dir = "./assessor-results"

[store]
type = "file"
dir = "./assessor-data"
catalog = "catalogs/example.toml"
"#;

const EXAMPLE_CATALOG: &str = r#"[catalog]
id = "example"
name = "Excel Skills Assessment"
description = "Five questions on everyday spreadsheet work"

[[questions]]
id = "vlookup"
category = "Lookup Functions"
difficulty = "intermediate"
prompt = "How would you use VLOOKUP to find a value in another table?"
expected_keyword_phrases = [
  "lookup value",
  "table array",
  "column index",
  "exact match false",
]

[[questions]]
id = "pivot_tables"
category = "Data Analysis"
difficulty = "intermediate"
prompt = "What is a pivot table and when would you use one?"
expected_keyword_phrases = [
  "summarize data",
  "rows columns values",
  "filter",
  "aggregate",
]

[[questions]]
id = "absolute_references"
category = "Formulas"
difficulty = "beginner"
prompt = "Explain the difference between relative and absolute cell references."
expected_keyword_phrases = [
  "dollar sign",
  "copy formula",
  "relative changes",
  "absolute stays fixed",
]

[[questions]]
id = "conditional_formatting"
category = "Formatting"
difficulty = "beginner"
prompt = "How do you highlight cells that meet a condition?"
expected_keyword_phrases = [
  "conditional formatting",
  "rule",
  "highlight cells",
  "color scale",
]

[[questions]]
id = "index_match"
category = "Lookup Functions"
difficulty = "advanced"
prompt = "Why might you choose INDEX and MATCH over VLOOKUP?"
expected_keyword_phrases = [
  "any column",
  "left lookup",
  "faster large data",
  "insert columns",
]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_files_parse() {
        let config: assessor_store::AssessorConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.interviewer_name, "Alex");

        let catalog = assessor_core::catalog::parse_catalog_str(
            EXAMPLE_CATALOG,
            std::path::Path::new("example.toml"),
        )
        .unwrap();
        assert_eq!(catalog.len(), 5);
        assert!(assessor_core::catalog::validate_catalog(&catalog).is_empty());
    }
}
