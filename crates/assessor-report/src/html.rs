//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::Result;
use std::path::Path;

use assessor_core::report::{AssessmentReport, CategoryAverage, ScoreBand};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn band_class(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Excellent | ScoreBand::VeryGood => "strong",
        ScoreBand::Good | ScoreBand::Fair => "partial",
        ScoreBand::NeedsImprovement => "weak",
    }
}

fn score_class(score: u8) -> &'static str {
    match score {
        70..=u8::MAX => "strong",
        40..=69 => "partial",
        _ => "weak",
    }
}

/// Generate an HTML report from an assessment report.
pub fn generate_html(report: &AssessmentReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Assessment report: {}</title>\n",
        html_escape(&report.respondent_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Assessment report</h1>\n");
    let session = report
        .session
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    html.push_str(&format!(
        "<p class=\"meta\">Respondent: <strong>{}</strong> | Session {} | {} answers | {}</p>\n",
        html_escape(&report.respondent_id),
        html_escape(&session),
        report.responses.len(),
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Overall score
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Overall</h2>\n");
    html.push_str(&format!(
        "<p class=\"overall {}\"><span class=\"score\">{:.0}%</span> {}</p>\n",
        band_class(report.band),
        report.overall_score,
        html_escape(report.band.label())
    ));

    if !report.category_averages.is_empty() {
        html.push_str("<h2>Categories</h2>\n");
        html.push_str(&generate_bar_chart(&report.category_averages));
    }
    html.push_str("</section>\n");

    // Per-question responses
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Responses</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Question</th><th onclick=\"sortTable(1)\">Category</th><th onclick=\"sortTable(2)\">Score</th><th>Response</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for r in &report.responses {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>\n",
            html_escape(&r.question_id),
            html_escape(&r.category),
            score_class(r.score),
            r.score,
            html_escape(&r.response_text)
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Recommendations
    html.push_str("<section class=\"recommendations\">\n");
    html.push_str("<h2>Recommendations</h2>\n<ol>\n");
    for rec in &report.recommendations {
        html.push_str(&format!("<li>{}</li>\n", html_escape(rec)));
    }
    html.push_str("</ol>\n</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &AssessmentReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn generate_bar_chart(categories: &[CategoryAverage]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = categories.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, cat) in categories.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let fraction = (cat.average / 100.0).clamp(0.0, 1.0);
        let width = (fraction * max_width as f64) as usize;

        let color = if cat.average >= 70.0 {
            "#22c55e"
        } else if cat.average >= 40.0 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&cat.category)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}% ({})</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            cat.average,
            cat.count
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --strong: #dcfce7; --partial: #fef9c3; --weak: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --strong: #064e3b; --partial: #713f12; --weak: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.overall { font-size: 1.25rem; padding: 1rem; border-radius: 8px; display: inline-block; }
.overall .score { font-size: 2rem; font-weight: bold; margin-right: 0.5rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; vertical-align: top; }
th { background: var(--border); cursor: pointer; }
.strong { background: var(--strong); }
.partial { background: var(--partial); }
.weak { background: var(--weak); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  const numeric = col == 2;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const cmp = numeric ? Number(va) - Number(vb) : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
