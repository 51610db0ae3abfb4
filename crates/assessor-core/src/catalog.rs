//! TOML question catalog parser.
//!
//! Loads catalogs from TOML files and directories, and validates them.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, Question};
use crate::scoring::keywords;

/// An ordered, immutable set of questions for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Catalog {
    /// Build an anonymous catalog from a list of questions.
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self {
            id: "inline".into(),
            name: "Inline catalog".into(),
            description: String::new(),
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn find(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Category of the question with the given id.
    pub fn category_of(&self, question_id: &str) -> Option<&str> {
        self.find(question_id).map(|q| q.category.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    catalog: TomlCatalogHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlCatalogHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_difficulty")]
    difficulty: String,
    prompt: String,
    #[serde(default)]
    expected_keyword_phrases: Vec<String>,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_category() -> String {
    "General".to_string()
}

fn default_difficulty() -> String {
    "intermediate".to_string()
}

fn default_true() -> bool {
    true
}

/// Parse a single TOML file into a `Catalog`.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a `Catalog`. Inactive questions are dropped.
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut questions = Vec::with_capacity(parsed.questions.len());
    for q in parsed.questions {
        if !q.active {
            tracing::debug!("skipping inactive question {}", q.id);
            continue;
        }
        let difficulty: Difficulty = q
            .difficulty
            .parse()
            .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;
        questions.push(Question {
            id: q.id,
            category: q.category,
            difficulty,
            prompt: q.prompt.trim().to_string(),
            expected_keyword_phrases: q.expected_keyword_phrases,
        });
    }

    Ok(Catalog {
        id: parsed.catalog.id,
        name: parsed.catalog.name,
        description: parsed.catalog.description,
        questions,
    })
}

/// Recursively load all `.toml` catalog files from a directory.
pub fn load_catalog_directory(dir: &Path) -> Result<Vec<Catalog>> {
    let mut catalogs = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            catalogs.extend(load_catalog_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_catalog(&path) {
                Ok(catalog) => catalogs.push(catalog),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(catalogs)
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a catalog for common issues.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if catalog.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "catalog has no active questions; sessions will complete immediately".into(),
        });
    }

    let mut seen_ids = std::collections::HashSet::new();
    for q in &catalog.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    for q in &catalog.questions {
        if q.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "prompt is empty".into(),
            });
        }

        if q.expected_keyword_phrases.is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "no expected keyword phrases; every answer will score 0".into(),
            });
        }

        for phrase in &q.expected_keyword_phrases {
            if keywords(phrase).is_empty() {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id.clone()),
                    message: "expected phrase has no keywords and can never score".into(),
                });
            }
        }
    }

    warnings
}
