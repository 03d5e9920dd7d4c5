//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use quizlens_core::report::AnalyticsSummary;
use quizlens_core::statistics::TopicStats;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report from an analytics summary.
pub fn generate_html(summary: &AnalyticsSummary) -> String {
    let mut html = String::new();

    let course = match &summary.course_code {
        Some(code) => format!("{} ({})", summary.course_name, code),
        None => summary.course_name.clone(),
    };

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>quizlens report: {}</title>\n",
        html_escape(&summary.quiz_name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&summary.quiz_name)));
    html.push_str(&format!(
        "<p class=\"meta\">{} | quiz date {} | generated {}</p>\n",
        html_escape(&course),
        summary.quiz_date.format("%Y-%m-%d"),
        summary.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Headline metrics
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n<div class=\"metrics\">\n");
    for (label, value) in [
        ("Students", summary.student_count.to_string()),
        ("Questions", summary.question_count.to_string()),
        ("Points possible", format!("{:.1}", summary.total_possible)),
        ("Class average", format!("{:.1}%", summary.class_average)),
        ("Weak threshold", format!("{:.0}%", summary.threshold)),
    ] {
        html.push_str(&format!(
            "<div class=\"metric\"><span class=\"value\">{value}</span><span class=\"label\">{label}</span></div>\n"
        ));
    }
    html.push_str("</div>\n");

    if !summary.weakest_topics.is_empty() {
        let names: Vec<String> = summary
            .weakest_topics
            .iter()
            .map(|t| html_escape(t))
            .collect();
        html.push_str(&format!(
            "<p class=\"warning\">Topics below {:.0}%: {}</p>\n",
            summary.threshold,
            names.join(", ")
        ));
    }
    if !summary.unmapped_questions.is_empty() {
        let ids: Vec<String> = summary
            .unmapped_questions
            .iter()
            .map(u32::to_string)
            .collect();
        html.push_str(&format!(
            "<p class=\"meta\">Questions without a topic: {}</p>\n",
            ids.join(", ")
        ));
    }
    html.push_str("</section>\n");

    // Sections
    if !summary.sections.is_empty() {
        html.push_str("<section class=\"sections\">\n<h2>Sections</h2>\n");
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Section</th><th>Students</th><th>Average</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for stats in summary.sections.values() {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
                html_escape(&stats.section),
                stats.student_count,
                stats.average_percentage
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    // Topics
    html.push_str("<section class=\"topics\">\n<h2>Topics</h2>\n");
    if summary.topics.is_empty() {
        html.push_str("<p class=\"meta\">No questions are mapped to topics.</p>\n");
    } else {
        html.push_str(&generate_bar_chart(&summary.topics, summary.threshold));
        html.push_str("<table class=\"sortable\" id=\"topics\">\n");
        html.push_str("<thead><tr><th onclick=\"sortTable('topics', 0)\">Topic</th><th onclick=\"sortTable('topics', 1)\">Questions</th><th onclick=\"sortTable('topics', 2)\">Responses</th><th onclick=\"sortTable('topics', 3)\">Average</th><th onclick=\"sortTable('topics', 4)\">Students below threshold</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for stats in summary.topics.values() {
            let class = row_class(stats, summary.threshold);
            html.push_str(&format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{}</td></tr>\n",
                class,
                html_escape(&stats.topic),
                stats.question_count,
                stats.response_count,
                stats.average_percentage,
                stats.weak_student_count
            ));
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</section>\n");

    // Students
    html.push_str("<section class=\"students\">\n<h2>Students</h2>\n");
    html.push_str("<table class=\"sortable\" id=\"students\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable('students', 0)\">ID</th><th onclick=\"sortTable('students', 1)\">Name</th><th onclick=\"sortTable('students', 2)\">Section</th><th onclick=\"sortTable('students', 3)\">Score</th><th onclick=\"sortTable('students', 4)\">Percentage</th><th>Weak topics</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for student in &summary.students {
        let class = if student.percentage < summary.threshold {
            "weak"
        } else {
            "ok"
        };
        let weak: Vec<String> = student.weak_topics.iter().map(|t| html_escape(t)).collect();
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.1}/{:.1}</td><td>{:.1}%</td><td>{}</td></tr>\n",
            class,
            html_escape(&student.student_id),
            html_escape(&student.name),
            html_escape(&student.section),
            student.total_score,
            student.total_possible,
            student.percentage,
            weak.join(", ")
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    // Recommendations
    if let Some(recommendations) = &summary.recommendations {
        html.push_str("<section class=\"recommendations\">\n<h2>Recommendations</h2>\n");
        for paragraph in recommendations.split("\n\n").filter(|p| !p.trim().is_empty()) {
            html.push_str(&format!(
                "<p>{}</p>\n",
                html_escape(paragraph.trim()).replace('\n', "<br>\n")
            ));
        }
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(summary).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file, creating parent directories.
pub fn write_html_report(summary: &AnalyticsSummary, path: &Path) -> Result<()> {
    let html = generate_html(summary);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report: {}", path.display()))?;
    Ok(())
}

fn row_class(stats: &TopicStats, threshold: f64) -> &'static str {
    if stats.response_count > 0 && stats.average_percentage < threshold {
        "weak"
    } else {
        "ok"
    }
}

fn generate_bar_chart(topics: &BTreeMap<String, TopicStats>, threshold: f64) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 220;

    let total_height = topics.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 70,
        total_height
    );

    for (i, stats) in topics.values().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let pct = stats.average_percentage.clamp(0.0, 100.0);
        let width = (pct / 100.0 * max_width as f64) as usize;

        let color = if pct < threshold {
            "#ef4444"
        } else if pct < threshold + 10.0 {
            "#eab308"
        } else {
            "#22c55e"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&stats.topic)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            stats.average_percentage
        ));
    }

    // threshold marker
    let x = label_width + (threshold.clamp(0.0, 100.0) / 100.0 * max_width as f64) as usize;
    svg.push_str(&format!(
        "  <line x1=\"{x}\" y1=\"0\" x2=\"{x}\" y2=\"{total_height}\" stroke=\"#6b7280\" stroke-dasharray=\"4 4\"/>\n"
    ));

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --ok: #dcfce7; --weak: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --ok: #064e3b; --weak: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.warning { font-weight: bold; color: #b91c1c; }
.metrics { display: flex; gap: 1rem; flex-wrap: wrap; }
.metric { border: 1px solid var(--border); border-radius: 8px; padding: 1rem 1.5rem; display: flex; flex-direction: column; }
.metric .value { font-size: 1.5rem; font-weight: bold; }
.metric .label { color: #6b7280; font-size: 0.85rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
table.sortable th[onclick] { cursor: pointer; }
.ok { background: var(--ok); }
.weak { background: var(--weak); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(id, col) {
  const table = document.getElementById(id);
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use quizlens_core::model::{Question, Quiz, Student, StudentResponse, Syllabus};

    fn make_test_summary() -> AnalyticsSummary {
        let mut quiz = Quiz::new("Midterm <1>", "Intro to Programming");
        quiz.add_question(Question::new(1, "q1", "", 10.0).with_topic("Loops"));
        quiz.add_question(Question::new(2, "q2", "", 10.0).with_topic("Recursion & Stacks"));
        quiz.add_question(Question::new(3, "q3", "", 5.0));
        quiz.add_student(
            Student::new("s1", "Ada", "A")
                .with_response(StudentResponse::new(1, "", 9.0))
                .with_response(StudentResponse::new(2, "", 3.0)),
        );
        quiz.add_student(
            Student::new("s2", "Grace", "B")
                .with_response(StudentResponse::new(1, "", 10.0))
                .with_response(StudentResponse::new(2, "", 8.0)),
        );
        let syllabus = Syllabus::new("Intro to Programming", "CS 101");
        let mut summary = AnalyticsSummary::compute(&quiz, Some(&syllabus), 70.0);
        summary.id = uuid::Uuid::nil();
        summary
    }

    #[test]
    fn html_report_contains_required_elements() {
        let summary = make_test_summary();
        let html = generate_html(&summary);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Midterm &lt;1&gt;"));
        assert!(html.contains("Intro to Programming (CS 101)"));
        assert!(html.contains("<svg"));
        assert!(html.contains("Ada"));
        assert!(html.contains("Grace"));
        assert!(html.contains("Questions without a topic: 3"));
        assert!(!html.contains("<h2>Recommendations</h2>"));
    }

    #[test]
    fn weak_topics_are_highlighted() {
        let summary = make_test_summary();
        let html = generate_html(&summary);

        // Recursion averages 55%, Loops 95%
        assert!(html.contains("<tr class=\"weak\"><td>Recursion &amp; Stacks</td>"));
        assert!(html.contains("<tr class=\"ok\"><td>Loops</td>"));
        assert!(html.contains("Topics below 70%: Recursion &amp; Stacks"));
    }

    #[test]
    fn recommendations_are_escaped() {
        let mut summary = make_test_summary();
        summary.attach_recommendations("1. Review <recursion>.\n\n2. Pair students.");
        let html = generate_html(&summary);

        assert!(html.contains("<h2>Recommendations</h2>"));
        assert!(html.contains("<p>1. Review &lt;recursion&gt;.</p>"));
        assert!(html.contains("<p>2. Pair students.</p>"));
    }

    #[test]
    fn raw_json_is_escaped() {
        let summary = make_test_summary();
        let html = generate_html(&summary);
        assert!(!html.contains("\"Midterm <1>\""));
        assert!(html.contains("&quot;quiz_name&quot;"));
    }

    #[test]
    fn html_report_write_to_file() {
        let summary = make_test_summary();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.html");

        write_html_report(&summary, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
