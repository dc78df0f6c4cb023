//! Issue detection rules.
//!
//! Each rule is a pure function over the frozen model; none mutates anything,
//! so the set is order-insensitive and the report's issue list is the plain
//! concatenation of rule outputs. Structural findings (cycles, reparenting)
//! are derived from the attachment log the builder left behind.

use std::collections::BTreeMap;

use regex::Regex;

use crate::model::{
    AttachOutcome, AttachSignal, NodeOrigin, PropertyValue, WidgetId, WidgetModel,
};
use crate::report::{Category, Issue, Severity};

pub struct RuleContext<'a> {
    pub model: &'a WidgetModel,
    pub min_dimension: i64,
    pub meaningless_name: &'a Regex,
}

type Rule = fn(&RuleContext<'_>) -> Vec<Issue>;

const RULES: &[Rule] = &[
    small_size,
    size_bounds,
    hidden_widgets,
    disabled_widgets,
    orphans,
    reparent_conflicts,
    sibling_overlaps,
    meaningless_names,
    rejected_cycles,
];

pub fn detect_issues(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let mut issues = Vec::new();
    for rule in RULES {
        issues.extend(rule(ctx));
    }
    issues
}

fn issue(
    severity: Severity,
    category: Category,
    subject: WidgetId,
    message: String,
    line: usize,
) -> Issue {
    Issue {
        severity,
        category,
        subject_id: Some(subject),
        related_ids: Vec::new(),
        message,
        line,
    }
}

/// Declared width or height below the threshold: likely invisible.
fn small_size(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let mut out = Vec::new();
    for node in &ctx.model.nodes {
        if let Some(g) = node.geometry {
            if g.width < ctx.min_dimension || g.height < ctx.min_dimension {
                out.push(issue(
                    Severity::Warning,
                    Category::Size,
                    node.id,
                    format!(
                        "`{}` is very small ({}x{}), may be invisible",
                        node.name, g.width, g.height
                    ),
                    node.line,
                ));
            }
        }
    }
    out
}

/// Declared minimum size exceeding the declared maximum on either axis.
fn size_bounds(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let int = |node: &crate::model::WidgetNode, key: &str| match node.properties.get(key) {
        Some(PropertyValue::Int(v)) => Some(*v),
        _ => None,
    };
    let mut out = Vec::new();
    for node in &ctx.model.nodes {
        let bounds = (
            int(node, "min_width"),
            int(node, "min_height"),
            int(node, "max_width"),
            int(node, "max_height"),
        );
        if let (Some(min_w), Some(min_h), Some(max_w), Some(max_h)) = bounds {
            if min_w > max_w || min_h > max_h {
                out.push(issue(
                    Severity::Error,
                    Category::Size,
                    node.id,
                    format!(
                        "`{}` minimum size ({min_w}x{min_h}) exceeds maximum size ({max_w}x{max_h})",
                        node.name
                    ),
                    node.line,
                ));
            }
        }
    }
    out
}

fn hidden_widgets(ctx: &RuleContext<'_>) -> Vec<Issue> {
    flag_bool_property(ctx, "visible", |name| {
        format!("`{name}` is explicitly hidden")
    })
}

fn disabled_widgets(ctx: &RuleContext<'_>) -> Vec<Issue> {
    flag_bool_property(ctx, "enabled", |name| {
        format!("`{name}` has interaction disabled")
    })
}

fn flag_bool_property(
    ctx: &RuleContext<'_>,
    key: &str,
    message: impl Fn(&str) -> String,
) -> Vec<Issue> {
    let mut out = Vec::new();
    for node in &ctx.model.nodes {
        if node.properties.get(key) == Some(&PropertyValue::Bool(false)) {
            out.push(issue(
                Severity::Info,
                Category::Visibility,
                node.id,
                message(&node.name),
                node.line,
            ));
        }
    }
    out
}

/// A recognized node that nothing parents and nothing references: likely dead
/// UI or a missing add-call. Class-defined roots and containers that collected
/// children are legitimate roots, not orphans.
fn orphans(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let referenced = ctx.model.add_call_targets();
    let mut out = Vec::new();
    for node in &ctx.model.nodes {
        if node.parent_id.is_some()
            || node.origin == NodeOrigin::ClassDef
            || !node.children.is_empty()
            || referenced.binary_search(&node.id).is_ok()
        {
            continue;
        }
        out.push(issue(
            Severity::Warning,
            Category::Layout,
            node.id,
            format!("`{}` is never attached to any container", node.name),
            node.line,
        ));
    }
    out
}

/// Add-calls from two different containers targeting the same node. The last
/// successful attachment is authoritative; the earlier one is flagged.
fn reparent_conflicts(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let mut by_child: BTreeMap<WidgetId, Vec<&crate::model::AttachRecord>> = BTreeMap::new();
    for record in &ctx.model.attach_log {
        if record.signal == AttachSignal::AddCall
            && record.outcome != AttachOutcome::RejectedCycle
        {
            by_child.entry(record.child).or_default().push(record);
        }
    }

    let mut out = Vec::new();
    for (child, records) in by_child {
        let mut parents: Vec<WidgetId> = records.iter().map(|r| r.parent).collect();
        parents.dedup();
        if parents.len() < 2 {
            continue;
        }
        let node = ctx.model.node(child);
        let names: Vec<String> = parents
            .iter()
            .map(|&p| format!("`{}`", ctx.model.node(p).name))
            .collect();
        let first_line = records.first().map(|r| r.line).unwrap_or(node.line);
        out.push(Issue {
            severity: Severity::Warning,
            category: Category::Layout,
            subject_id: Some(child),
            related_ids: parents,
            message: format!(
                "`{}` is added to multiple containers ({}); the last attachment wins",
                node.name,
                names.join(", ")
            ),
            line: first_line,
        });
    }
    out
}

/// Pairwise rectangle test between siblings with fully known geometry.
/// Quadratic per parent, which is fine for GUI fan-out.
fn sibling_overlaps(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let mut groups: BTreeMap<Option<WidgetId>, Vec<&crate::model::WidgetNode>> = BTreeMap::new();
    for node in &ctx.model.nodes {
        if node.geometry.is_some() {
            groups.entry(node.parent_id).or_default().push(node);
        }
    }

    let mut out = Vec::new();
    for siblings in groups.values() {
        for (i, a) in siblings.iter().enumerate() {
            for b in &siblings[i + 1..] {
                let (ga, gb) = match (a.geometry, b.geometry) {
                    (Some(ga), Some(gb)) => (ga, gb),
                    _ => continue,
                };
                if ga.overlaps(&gb) {
                    out.push(Issue {
                        severity: Severity::Warning,
                        category: Category::Overlap,
                        subject_id: Some(a.id),
                        related_ids: vec![b.id],
                        message: format!("`{}` and `{}` may overlap", a.name, b.name),
                        line: a.line,
                    });
                }
            }
        }
    }
    out
}

/// Generic type-like word followed by a digit: `label1`, `button2`.
fn meaningless_names(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let mut out = Vec::new();
    for node in &ctx.model.nodes {
        if ctx.meaningless_name.is_match(&node.name) {
            out.push(issue(
                Severity::Warning,
                Category::Naming,
                node.id,
                format!("`{}` is not a descriptive name", node.name),
                node.line,
            ));
        }
    }
    out
}

/// Attachments the builder refused because they would close a cycle. The
/// child was kept as a root; surface what happened.
fn rejected_cycles(ctx: &RuleContext<'_>) -> Vec<Issue> {
    let mut out = Vec::new();
    for record in &ctx.model.attach_log {
        if record.outcome != AttachOutcome::RejectedCycle {
            continue;
        }
        let child = ctx.model.node(record.child);
        let parent = ctx.model.node(record.parent);
        out.push(Issue {
            severity: Severity::Warning,
            category: Category::Structural,
            subject_id: Some(record.child),
            related_ids: vec![record.parent],
            message: format!(
                "attaching `{}` to `{}` would create a cycle; kept as a separate root",
                child.name, parent.name
            ),
            line: record.line,
        });
    }
    out
}
