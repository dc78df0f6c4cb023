//! Report assembly and rendering.
//!
//! One `AnalysisReport` per invocation, computed in a single pass over the
//! frozen model and the rule outputs, then never mutated. The JSON form and
//! the HTML document are two views of this same struct; nothing is computed
//! twice. Reports carry no timestamps so an unchanged input yields a
//! byte-identical artifact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{WidgetId, WidgetModel, WidgetNode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Size,
    Visibility,
    Overlap,
    Layout,
    Naming,
    Structural,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Size => "size",
            Category::Visibility => "visibility",
            Category::Overlap => "overlap",
            Category::Layout => "layout",
            Category::Naming => "naming",
            Category::Structural => "structural",
        };
        f.write_str(name)
    }
}

/// One detected defect. `subject_id` is absent for file-level problems;
/// `related_ids` carries the other party of pairwise findings such as
/// overlaps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub category: Category,
    pub subject_id: Option<WidgetId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_ids: Vec<WidgetId>,
    pub message: String,
    pub line: usize,
}

/// Outcome of one convention check, with the count and lines that back it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestPracticeCheck {
    pub name: String,
    pub passed: bool,
    pub evidence_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_lines: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_widgets: usize,
    pub total_issues: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub lines_scanned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    pub widgets: Vec<WidgetNode>,
    pub issues: Vec<Issue>,
    pub checklist: Vec<BestPracticeCheck>,
    pub stats: ReportStats,
}

impl AnalysisReport {
    /// Degenerate report for a file that failed to parse: a single file-level
    /// structural error, nothing else.
    pub fn parse_failure(source: &str, line: usize) -> Self {
        let issue = Issue {
            severity: Severity::Error,
            category: Category::Structural,
            subject_id: None,
            related_ids: Vec::new(),
            message: "source file does not parse; analysis abandoned".into(),
            line,
        };
        let mut by_severity = BTreeMap::new();
        by_severity.insert(Severity::Error, 1);
        by_severity.insert(Severity::Warning, 0);
        by_severity.insert(Severity::Info, 0);
        let stats = ReportStats {
            total_issues: 1,
            by_severity,
            ..ReportStats::default()
        };
        Self {
            source: source.to_string(),
            widgets: Vec::new(),
            issues: vec![issue],
            checklist: Vec::new(),
            stats,
        }
    }
}

pub fn assemble(
    source: &str,
    model: WidgetModel,
    issues: Vec<Issue>,
    checklist: Vec<BestPracticeCheck>,
) -> AnalysisReport {
    let mut stats = ReportStats {
        total_widgets: model.nodes.len(),
        total_issues: issues.len(),
        lines_scanned: model.lines_scanned,
        ..ReportStats::default()
    };
    for severity in [Severity::Error, Severity::Warning, Severity::Info] {
        stats.by_severity.insert(severity, 0);
    }
    for node in &model.nodes {
        *stats.by_type.entry(node.type_name.clone()).or_insert(0) += 1;
    }
    for issue in &issues {
        *stats.by_severity.entry(issue.severity).or_insert(0) += 1;
        debug_assert!(
            issue.subject_id.map_or(true, |id| id < model.nodes.len()),
            "issue subject must reference a node in the report"
        );
    }

    AnalysisReport {
        source: source.to_string(),
        widgets: model.nodes,
        issues,
        checklist,
        stats,
    }
}

/// Render the human-viewable document for a batch of reports. Same data as
/// the JSON form, one section per file.
pub fn render_html(reports: &[AnalysisReport]) -> String {
    let mut html = String::new();
    html.push_str(HTML_HEAD);
    for report in reports {
        render_section(&mut html, report);
    }
    html.push_str("</body>\n</html>\n");
    html
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>widgetlens report</title>
<style>
body { font-family: 'Segoe UI', sans-serif; margin: 0; padding: 24px; background: #f5f5f5; color: #333; }
.file { max-width: 1100px; margin: 0 auto 32px; background: white; padding: 24px; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }
h1 { font-size: 1.4em; margin-top: 0; }
h2 { font-size: 1.1em; border-bottom: 2px solid #ccc; padding-bottom: 6px; }
.cards { display: flex; gap: 16px; flex-wrap: wrap; }
.card { background: #f8f9fa; padding: 12px 20px; border-radius: 6px; border-left: 4px solid #999; }
.card.error { border-left-color: #c0392b; }
.card.warning { border-left-color: #e67e22; }
.card.info { border-left-color: #2980b9; }
.card .number { font-size: 1.6em; font-weight: bold; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 8px 10px; text-align: left; border-bottom: 1px solid #ddd; }
th { background: #eceff1; }
.severity { padding: 2px 8px; border-radius: 4px; font-size: 0.85em; text-transform: uppercase; color: white; }
.severity.error { background: #c0392b; }
.severity.warning { background: #e67e22; }
.severity.info { background: #2980b9; }
.tree ul { list-style: none; padding-left: 20px; border-left: 1px dotted #bbb; }
.tree > ul { padding-left: 0; border-left: none; }
.widget-type { color: #666; font-size: 0.9em; }
.check.pass::before { content: "\2713 "; color: #27ae60; }
.check.fail::before { content: "\2717 "; color: #c0392b; }
</style>
</head>
<body>
"#;

fn render_section(html: &mut String, report: &AnalysisReport) {
    html.push_str("<div class=\"file\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(&report.source)));

    render_stats(html, report);
    render_tree(html, report);
    render_issues(html, report);
    render_checklist(html, report);

    html.push_str("</div>\n");
}

fn render_stats(html: &mut String, report: &AnalysisReport) {
    let count = |severity: Severity| report.stats.by_severity.get(&severity).copied().unwrap_or(0);
    html.push_str("<div class=\"cards\">\n");
    html.push_str(&format!(
        "<div class=\"card\"><div>Widgets</div><div class=\"number\">{}</div></div>\n",
        report.stats.total_widgets
    ));
    for (class, label, n) in [
        ("error", "Errors", count(Severity::Error)),
        ("warning", "Warnings", count(Severity::Warning)),
        ("info", "Info", count(Severity::Info)),
    ] {
        html.push_str(&format!(
            "<div class=\"card {class}\"><div>{label}</div><div class=\"number\">{n}</div></div>\n"
        ));
    }
    html.push_str(&format!(
        "<div class=\"card\"><div>Lines</div><div class=\"number\">{}</div></div>\n",
        report.stats.lines_scanned
    ));
    html.push_str("</div>\n");
}

fn render_tree(html: &mut String, report: &AnalysisReport) {
    html.push_str("<h2>Widget tree</h2>\n<div class=\"tree\">\n");
    if report.widgets.is_empty() {
        html.push_str("<p>No widgets recognized.</p>\n");
    } else {
        let mut children: BTreeMap<Option<WidgetId>, Vec<&WidgetNode>> = BTreeMap::new();
        for widget in &report.widgets {
            children.entry(widget.parent_id).or_default().push(widget);
        }
        render_branch(html, &children, None);
    }
    html.push_str("</div>\n");
}

fn render_branch(
    html: &mut String,
    children: &BTreeMap<Option<WidgetId>, Vec<&WidgetNode>>,
    parent: Option<WidgetId>,
) {
    let Some(nodes) = children.get(&parent) else {
        return;
    };
    html.push_str("<ul>\n");
    for node in nodes {
        html.push_str(&format!(
            "<li><span class=\"widget-type\">[{}]</span> {} <span class=\"widget-type\">line {}</span>",
            escape(&node.type_name),
            escape(&node.name),
            node.line
        ));
        render_branch(html, children, Some(node.id));
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
}

fn render_issues(html: &mut String, report: &AnalysisReport) {
    html.push_str("<h2>Issues</h2>\n");
    if report.issues.is_empty() {
        html.push_str("<p>No issues detected.</p>\n");
        return;
    }
    html.push_str(
        "<table>\n<thead><tr><th>Severity</th><th>Category</th><th>Widget</th><th>Line</th><th>Message</th></tr></thead>\n<tbody>\n",
    );
    for issue in &report.issues {
        let subject = issue
            .subject_id
            .and_then(|id| report.widgets.get(id))
            .map(|w| w.name.clone())
            .unwrap_or_else(|| "-".into());
        html.push_str(&format!(
            "<tr><td><span class=\"severity {sev}\">{sev}</span></td><td>{cat}</td><td>{subject}</td><td>{line}</td><td>{msg}</td></tr>\n",
            sev = issue.severity,
            cat = issue.category,
            subject = escape(&subject),
            line = issue.line,
            msg = escape(&issue.message),
        ));
    }
    html.push_str("</tbody>\n</table>\n");
}

fn render_checklist(html: &mut String, report: &AnalysisReport) {
    if report.checklist.is_empty() {
        return;
    }
    html.push_str("<h2>Best practices</h2>\n<ul>\n");
    for check in &report.checklist {
        let class = if check.passed { "pass" } else { "fail" };
        html.push_str(&format!(
            "<li class=\"check {class}\">{} ({} occurrence{})</li>\n",
            escape(&check.name),
            check.evidence_count,
            if check.evidence_count == 1 { "" } else { "s" },
        ));
    }
    html.push_str("</ul>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeOrigin;

    fn sample_report() -> AnalysisReport {
        let mut model = WidgetModel::default();
        let root = model.push_node(
            "QMainWindow".into(),
            "MainWindow".into(),
            1,
            NodeOrigin::ClassDef,
            None,
        );
        let child = model.push_node(
            "QLabel".into(),
            "status".into(),
            3,
            NodeOrigin::Assignment,
            Some(root),
        );
        model.attach(child, root, 3, crate::model::AttachSignal::Nesting);
        model.lines_scanned = 12;
        let issues = vec![Issue {
            severity: Severity::Warning,
            category: Category::Size,
            subject_id: Some(child),
            related_ids: Vec::new(),
            message: "widget is very small (4x40)".into(),
            line: 3,
        }];
        let checklist = vec![BestPracticeCheck {
            name: "No Hardcoded Colors".into(),
            passed: false,
            evidence_count: 1,
            evidence_lines: vec![7],
        }];
        assemble("views/main.py", model, issues, checklist)
    }

    #[test]
    fn stats_cover_widgets_and_severities() {
        let report = sample_report();
        assert_eq!(report.stats.total_widgets, 2);
        assert_eq!(report.stats.total_issues, 1);
        assert_eq!(report.stats.by_severity[&Severity::Warning], 1);
        assert_eq!(report.stats.by_severity[&Severity::Error], 0);
        assert_eq!(report.stats.by_type["QLabel"], 1);
        assert_eq!(report.stats.lines_scanned, 12);
    }

    #[test]
    fn parse_failure_report_is_a_single_structural_error() {
        let report = AnalysisReport::parse_failure("broken.py", 4);
        assert!(report.widgets.is_empty());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].category, Category::Structural);
        assert_eq!(report.issues[0].severity, Severity::Error);
        assert_eq!(report.issues[0].line, 4);
        assert_eq!(report.stats.by_severity[&Severity::Error], 1);
    }

    #[test]
    fn html_view_contains_tree_issues_and_checklist() {
        let report = sample_report();
        let html = render_html(std::slice::from_ref(&report));
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("views/main.py"));
        assert!(html.contains("MainWindow"));
        assert!(html.contains("very small"));
        assert!(html.contains("No Hardcoded Colors"));
    }

    #[test]
    fn html_escapes_markup_in_messages() {
        assert_eq!(escape("a <b> & \"c\""), "a &lt;b&gt; &amp; &quot;c&quot;");
    }

    #[test]
    fn json_view_serializes_schema_fields() {
        let report = sample_report();
        let value = serde_json::to_value(&report).expect("serializable");
        assert!(value["widgets"].is_array());
        assert_eq!(value["widgets"][1]["type"], "QLabel");
        assert_eq!(value["widgets"][1]["parent_id"], 0);
        assert_eq!(value["issues"][0]["severity"], "warning");
        assert_eq!(value["checklist"][0]["evidence_count"], 1);
        assert_eq!(value["stats"]["total_widgets"], 2);
    }
}
