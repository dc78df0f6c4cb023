//! Theming and convention checks.
//!
//! Unlike issue rules these do not flag individual widgets; each check
//! summarizes the whole file as pass or fail with the evidence lines that
//! back the verdict. Color scanning works on the parse tree's string
//! literals so comments never trip it.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use crate::builder::node_text;
use crate::catalog::WidgetCatalog;
use crate::ingest::ParsedSource;
use crate::model::WidgetModel;
use crate::report::BestPracticeCheck;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[0-9a-fA-F]{6}\b").expect("static regex"));

pub struct PracticeContext<'a> {
    pub source: &'a ParsedSource,
    pub model: &'a WidgetModel,
    pub catalog: &'a WidgetCatalog,
    pub accessor_matcher: &'a AhoCorasick,
    pub object_name_majority: f64,
}

pub fn validate_practices(ctx: &PracticeContext<'_>) -> Vec<BestPracticeCheck> {
    vec![
        theme_accessor_usage(ctx),
        themed_components(ctx),
        hardcoded_colors(ctx),
        object_names(ctx),
        class_docstrings(ctx),
    ]
}

fn check(name: &str, passed: bool, mut lines: Vec<usize>) -> BestPracticeCheck {
    lines.sort_unstable();
    lines.dedup();
    BestPracticeCheck {
        name: name.to_string(),
        passed,
        evidence_count: lines.len(),
        evidence_lines: lines,
    }
}

/// Colors should come from the theme API, not literals.
fn theme_accessor_usage(ctx: &PracticeContext<'_>) -> BestPracticeCheck {
    let text = &ctx.source.text;
    let lines: Vec<usize> = ctx
        .accessor_matcher
        .find_iter(text)
        .map(|m| line_of_offset(text, m.start()))
        .collect();
    let passed = !lines.is_empty();
    check("Uses Theme Accessors", passed, lines)
}

fn themed_components(ctx: &PracticeContext<'_>) -> BestPracticeCheck {
    let lines: Vec<usize> = ctx
        .model
        .nodes
        .iter()
        .filter(|n| ctx.catalog.is_themed(&n.type_name))
        .map(|n| n.line)
        .collect();
    let passed = !lines.is_empty();
    check("Uses Themed Components", passed, lines)
}

/// Hex colors inside string literals, except strings that sit inside a call
/// to a theme accessor.
fn hardcoded_colors(ctx: &PracticeContext<'_>) -> BestPracticeCheck {
    let mut offenders = Vec::new();
    collect_color_offenders(ctx, ctx.source.root(), &mut offenders);
    let passed = offenders.is_empty();
    check("No Hardcoded Colors", passed, offenders)
}

fn collect_color_offenders(ctx: &PracticeContext<'_>, node: Node<'_>, out: &mut Vec<usize>) {
    if node.kind() == "string" {
        let literal = node_text(node, &ctx.source.text);
        if HEX_COLOR.is_match(&literal) && !inside_accessor_call(ctx, node) {
            out.push(node.start_position().row + 1);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_color_offenders(ctx, child, out);
    }
}

fn inside_accessor_call(ctx: &PracticeContext<'_>, node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.kind() == "call"
            && ctx
                .accessor_matcher
                .is_match(&node_text(ancestor, &ctx.source.text))
        {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

/// A majority of widgets should carry an object name for selector-based
/// styling. Vacuously true for a file with no widgets.
fn object_names(ctx: &PracticeContext<'_>) -> BestPracticeCheck {
    let total = ctx.model.nodes.len();
    let named: Vec<usize> = ctx
        .model
        .nodes
        .iter()
        .filter(|n| n.object_name.is_some())
        .map(|n| n.line)
        .collect();
    let passed =
        total == 0 || (named.len() as f64) / (total as f64) >= ctx.object_name_majority;
    check("Widgets Have Object Names", passed, named)
}

/// Every top-level class should open with a docstring. Evidence lines are
/// the classes that lack one.
fn class_docstrings(ctx: &PracticeContext<'_>) -> BestPracticeCheck {
    let root = ctx.source.root();
    let mut offenders = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "class_definition" {
            continue;
        }
        if !has_docstring(child) {
            offenders.push(child.start_position().row + 1);
        }
    }
    let passed = offenders.is_empty();
    check("Classes Have Docstrings", passed, offenders)
}

fn has_docstring(class_def: Node<'_>) -> bool {
    let Some(body) = class_def.child_by_field_name("body") else {
        return false;
    };
    let Some(first) = body.named_child(0) else {
        return false;
    };
    first.kind() == "expression_statement"
        && first.named_child(0).map(|n| n.kind()) == Some("string")
}

fn line_of_offset(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}
