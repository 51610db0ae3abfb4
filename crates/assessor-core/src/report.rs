//! Assessment report generation with JSON persistence.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::model::ResponseRecord;
use crate::store::SessionHandle;

/// Improvement recommendations included in every report.
///
/// Static curriculum guidance; not derived from the scores.
pub const RECOMMENDATIONS: [&str; 7] = [
    "Master advanced chart selection criteria for different data types and business contexts",
    "Practice the complete 7-step dashboard creation process from planning to deployment",
    "Focus on dashboard UX principles: layout hierarchy, visual design, and user workflow",
    "Develop skills in interactive elements: filters, drill-downs, and cross-chart relationships",
    "Learn data preparation techniques for visualization-ready datasets",
    "Explore advanced visualization methods: heat maps, tree maps, and bubble charts",
    "Study performance optimization for large-scale dashboard implementations",
];

/// Category used when a response's question is missing from the catalog.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Qualitative band for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsImprovement,
}

impl ScoreBand {
    /// Bands are inclusive at their lower bound.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ScoreBand::Excellent
        } else if score >= 80.0 {
            ScoreBand::VeryGood
        } else if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 60.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::NeedsImprovement
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::VeryGood => "Very Good",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A response enriched with its question's category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    pub question_id: String,
    pub category: String,
    pub response_text: String,
    pub score: u8,
}

impl ScoredResponse {
    /// Attach categories from the catalog to a list of responses.
    pub fn enrich(responses: &[ResponseRecord], catalog: &Catalog) -> Vec<Self> {
        responses
            .iter()
            .map(|r| ScoredResponse {
                question_id: r.question_id.clone(),
                category: catalog
                    .category_of(&r.question_id)
                    .unwrap_or(UNKNOWN_CATEGORY)
                    .to_string(),
                response_text: r.response_text.clone(),
                score: r.score,
            })
            .collect()
    }
}

/// Mean score of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverage {
    pub category: String,
    pub average: f64,
    pub count: usize,
}

/// The final report for a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub respondent_id: String,
    #[serde(default)]
    pub session: Option<SessionHandle>,
    pub overall_score: f64,
    pub band: ScoreBand,
    pub category_averages: Vec<CategoryAverage>,
    pub responses: Vec<ScoredResponse>,
    pub recommendations: Vec<String>,
}

/// Arithmetic mean of the scores, 0 when there are none.
pub fn overall_score(responses: &[ResponseRecord]) -> f64 {
    mean_score(responses.iter().map(|r| r.score))
}

fn mean_score(scores: impl Iterator<Item = u8>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0usize), |(sum, count), s| {
        (sum + f64::from(s), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Per-category means in order of first appearance.
///
/// Only categories with at least one response appear.
pub fn category_averages(responses: &[ScoredResponse]) -> Vec<CategoryAverage> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<u8>> = HashMap::new();
    for r in responses {
        let scores = groups.entry(r.category.as_str()).or_insert_with(|| {
            order.push(r.category.as_str());
            Vec::new()
        });
        scores.push(r.score);
    }

    order
        .into_iter()
        .filter_map(|category| {
            let scores = groups.get(category)?;
            if scores.is_empty() {
                return None;
            }
            Some(CategoryAverage {
                category: category.to_string(),
                average: mean_score(scores.iter().copied()),
                count: scores.len(),
            })
        })
        .collect()
}

/// Build the report for a set of enriched responses.
pub fn generate_report(
    respondent_id: &str,
    session: Option<SessionHandle>,
    responses: Vec<ScoredResponse>,
) -> AssessmentReport {
    let overall = mean_score(responses.iter().map(|r| r.score));

    AssessmentReport {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        respondent_id: respondent_id.to_string(),
        session,
        overall_score: overall,
        band: ScoreBand::from_score(overall),
        category_averages: category_averages(&responses),
        responses,
        recommendations: RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
    }
}

impl AssessmentReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AssessmentReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Assessment report: {}\n\n", self.respondent_id));
        md.push_str(&format!(
            "**Overall:** {:.0}% ({})\n\n",
            self.overall_score, self.band
        ));

        if !self.category_averages.is_empty() {
            md.push_str("### Performance by category\n\n");
            md.push_str("| Category | Answers | Average |\n");
            md.push_str("|----------|---------|---------|\n");
            for c in &self.category_averages {
                md.push_str(&format!(
                    "| {} | {} | {:.0}% |\n",
                    c.category, c.count, c.average
                ));
            }
            md.push('\n');
        }

        if !self.responses.is_empty() {
            md.push_str("### Responses\n\n");
            md.push_str("| Question | Category | Score |\n");
            md.push_str("|----------|----------|-------|\n");
            for r in &self.responses {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    r.question_id, r.category, r.score
                ));
            }
            md.push('\n');
        }

        md.push_str("### Recommendations\n\n");
        for (i, rec) in self.recommendations.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", i + 1, rec));
        }

        md
    }
}
