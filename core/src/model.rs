//! Reconstructed widget model.
//!
//! Nodes are created once, in source order, and linked into a forest. The
//! forest invariant is enforced at attachment time: an edge that would lead a
//! node back to one of its own ancestors is rejected and logged, never applied.
//! Every attachment attempt, successful or not, lands in the attachment log so
//! the issue rules can reason about reparenting and cycles after the model is
//! frozen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type WidgetId = usize;

/// Declared pixel rectangle. Absence on a node means the position and size are
/// layout-managed, not zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Geometry {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Geometry {
    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// Axis-aligned rectangle intersection. Symmetric by construction.
    pub fn overlaps(&self, other: &Geometry) -> bool {
        !(self.right() < other.x
            || other.right() < self.x
            || self.bottom() < other.y
            || other.bottom() < self.y)
    }
}

/// A statically resolved property value. Arguments that are not literals
/// (variables, call results) are recorded as indeterminate rather than guessed;
/// indeterminate serializes as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Indeterminate,
}

/// How a node entered the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    /// `name = QType(...)` or `self.name = QType(...)`.
    Assignment,
    /// `class Window(QMainWindow)`: the class itself becomes a root node so
    /// that `self` receivers resolve and nested widgets have a parent to fall
    /// back to.
    ClassDef,
}

#[derive(Debug, Clone, Serialize)]
pub struct WidgetNode {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Variable or class name the widget was bound to.
    pub name: String,
    /// Name declared through `setObjectName`, when literal.
    pub object_name: Option<String>,
    pub parent_id: Option<WidgetId>,
    #[serde(skip)]
    pub children: Vec<WidgetId>,
    pub geometry: Option<Geometry>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub line: usize,
    #[serde(skip)]
    pub origin: NodeOrigin,
    /// Class node the widget was instantiated under, for the nesting fallback.
    #[serde(skip)]
    pub declared_in: Option<WidgetId>,
}

/// Which syntactic signal produced an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachSignal {
    /// Explicit call naming both nodes: `addWidget`, `setLayout`, `parent=`.
    AddCall,
    /// Instantiation nested inside a container class body.
    Nesting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Applied,
    /// A later attachment replaced this one. Last successful attachment wins.
    Superseded,
    /// Applying the edge would have created a cycle; the child kept its place.
    RejectedCycle,
}

#[derive(Debug, Clone)]
pub struct AttachRecord {
    pub child: WidgetId,
    pub parent: WidgetId,
    pub line: usize,
    pub signal: AttachSignal,
    pub outcome: AttachOutcome,
}

#[derive(Debug, Default)]
pub struct WidgetModel {
    pub nodes: Vec<WidgetNode>,
    pub attach_log: Vec<AttachRecord>,
    pub lines_scanned: usize,
}

impl WidgetModel {
    pub fn push_node(
        &mut self,
        type_name: String,
        name: String,
        line: usize,
        origin: NodeOrigin,
        declared_in: Option<WidgetId>,
    ) -> WidgetId {
        let id = self.nodes.len();
        self.nodes.push(WidgetNode {
            id,
            type_name,
            name,
            object_name: None,
            parent_id: None,
            children: Vec::new(),
            geometry: None,
            properties: BTreeMap::new(),
            line,
            origin,
            declared_in,
        });
        id
    }

    pub fn node(&self, id: WidgetId) -> &WidgetNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: WidgetId) -> &mut WidgetNode {
        &mut self.nodes[id]
    }

    pub fn roots(&self) -> impl Iterator<Item = &WidgetNode> {
        self.nodes.iter().filter(|n| n.parent_id.is_none())
    }

    fn would_cycle(&self, child: WidgetId, parent: WidgetId) -> bool {
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return true;
            }
            cursor = self.nodes[id].parent_id;
        }
        false
    }

    /// Attach `child` under `parent`. A reattachment detaches the child from
    /// its previous parent and marks the earlier log entry superseded; an edge
    /// that would close a cycle is rejected and only logged.
    pub fn attach(
        &mut self,
        child: WidgetId,
        parent: WidgetId,
        line: usize,
        signal: AttachSignal,
    ) -> AttachOutcome {
        if child == parent || self.would_cycle(child, parent) {
            self.attach_log.push(AttachRecord {
                child,
                parent,
                line,
                signal,
                outcome: AttachOutcome::RejectedCycle,
            });
            return AttachOutcome::RejectedCycle;
        }

        if let Some(previous) = self.nodes[child].parent_id {
            self.nodes[previous].children.retain(|&c| c != child);
            if let Some(record) = self
                .attach_log
                .iter_mut()
                .rev()
                .find(|r| r.child == child && r.outcome == AttachOutcome::Applied)
            {
                record.outcome = AttachOutcome::Superseded;
            }
        }

        self.nodes[child].parent_id = Some(parent);
        self.nodes[parent].children.push(child);
        self.attach_log.push(AttachRecord {
            child,
            parent,
            line,
            signal,
            outcome: AttachOutcome::Applied,
        });
        AttachOutcome::Applied
    }

    /// Ids referenced as the child of any explicit add-call, applied or not.
    pub fn add_call_targets(&self) -> Vec<WidgetId> {
        let mut targets: Vec<WidgetId> = self
            .attach_log
            .iter()
            .filter(|r| r.signal == AttachSignal::AddCall)
            .map(|r| r.child)
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(n: usize) -> WidgetModel {
        let mut model = WidgetModel::default();
        for i in 0..n {
            model.push_node(
                "QWidget".into(),
                format!("w{i}"),
                i + 1,
                NodeOrigin::Assignment,
                None,
            );
        }
        model
    }

    #[test]
    fn attach_links_both_directions() {
        let mut model = model_with(2);
        assert_eq!(
            model.attach(1, 0, 5, AttachSignal::AddCall),
            AttachOutcome::Applied
        );
        assert_eq!(model.node(1).parent_id, Some(0));
        assert_eq!(model.node(0).children, vec![1]);
    }

    #[test]
    fn cycle_is_rejected_and_logged() {
        let mut model = model_with(3);
        model.attach(1, 0, 1, AttachSignal::AddCall);
        model.attach(2, 1, 2, AttachSignal::AddCall);
        assert_eq!(
            model.attach(0, 2, 3, AttachSignal::AddCall),
            AttachOutcome::RejectedCycle
        );
        // forest unchanged
        assert_eq!(model.node(0).parent_id, None);
        assert!(model
            .attach_log
            .iter()
            .any(|r| r.outcome == AttachOutcome::RejectedCycle));
    }

    #[test]
    fn self_attach_is_a_cycle() {
        let mut model = model_with(1);
        assert_eq!(
            model.attach(0, 0, 1, AttachSignal::AddCall),
            AttachOutcome::RejectedCycle
        );
    }

    #[test]
    fn last_attachment_wins_and_supersedes() {
        let mut model = model_with(3);
        model.attach(2, 0, 1, AttachSignal::AddCall);
        model.attach(2, 1, 2, AttachSignal::AddCall);
        assert_eq!(model.node(2).parent_id, Some(1));
        assert!(model.node(0).children.is_empty());
        let superseded: Vec<_> = model
            .attach_log
            .iter()
            .filter(|r| r.outcome == AttachOutcome::Superseded)
            .collect();
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].parent, 0);
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = Geometry {
            x: 0,
            y: 0,
            width: 100,
            height: 50,
        };
        let b = Geometry {
            x: 50,
            y: 25,
            width: 100,
            height: 50,
        };
        let c = Geometry {
            x: 500,
            y: 500,
            width: 10,
            height: 10,
        };
        assert_eq!(a.overlaps(&b), b.overlaps(&a));
        assert!(a.overlaps(&b));
        assert_eq!(a.overlaps(&c), c.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn touching_edges_count_as_overlap() {
        // right edge of a == left edge of b: not strictly separated
        let a = Geometry {
            x: 0,
            y: 0,
            width: 50,
            height: 50,
        };
        let b = Geometry {
            x: 50,
            y: 0,
            width: 50,
            height: 50,
        };
        assert!(a.overlaps(&b));
    }
}
