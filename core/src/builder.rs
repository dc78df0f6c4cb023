//! Widget model reconstruction from the parse tree.
//!
//! One pass over the statements, in source order. Two patterns create nodes:
//! `name = QType(...)` / `self.name = QType(...)` assignments whose callee is a
//! cataloged type, and `class W(QContainer)` definitions, which become root
//! nodes so `self` receivers resolve inside the class body.
//!
//! Parentage comes from two signals, in precedence order: an explicit add-call
//! (`addWidget`, `addLayout`, `setLayout`, `setCentralWidget`, or a `parent=`
//! constructor keyword), then, for attribute widgets with no add-call at all,
//! the enclosing container class.
//!
//! Coverage limitation: widgets created only inside loops or
//! conditionals, or returned from helper calls, are not detected. The model is
//! a best-effort static reconstruction, not an object graph.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::catalog::WidgetCatalog;
use crate::ingest::ParsedSource;
use crate::model::{AttachSignal, NodeOrigin, WidgetId, WidgetModel};

/// Receiver text (`label`, `self.label`, class name) to node id.
pub type SymbolTable = HashMap<String, WidgetId>;

pub struct BuildOutput {
    pub model: WidgetModel,
    pub symbols: SymbolTable,
}

pub fn build_model(source: &ParsedSource, catalog: &WidgetCatalog) -> BuildOutput {
    let mut builder = Builder {
        catalog,
        text: &source.text,
        model: WidgetModel::default(),
        symbols: HashMap::new(),
        class_stack: Vec::new(),
    };
    builder.visit(source.root());
    builder.apply_nesting_fallback();

    let Builder {
        mut model, symbols, ..
    } = builder;
    model.lines_scanned = source.lines();
    BuildOutput { model, symbols }
}

pub(crate) fn node_text(node: Node<'_>, text: &str) -> String {
    node.utf8_text(text.as_bytes()).unwrap_or("").to_string()
}

/// Statement kinds the scan does not descend into: creation behind control
/// flow is out of coverage.
pub(crate) fn is_conditional_scope(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement" | "for_statement" | "while_statement" | "match_statement" | "conditional_expression"
    )
}

struct Builder<'a> {
    catalog: &'a WidgetCatalog,
    text: &'a str,
    model: WidgetModel,
    symbols: SymbolTable,
    /// Innermost entry is the node for the enclosing cataloged class, if any.
    class_stack: Vec<Option<WidgetId>>,
}

impl<'a> Builder<'a> {
    fn visit(&mut self, node: Node<'a>) {
        if is_conditional_scope(node.kind()) {
            return;
        }
        match node.kind() {
            "class_definition" => {
                self.visit_class(node);
                return;
            }
            "assignment" => self.scan_assignment(node),
            "expression_statement" => {
                if let Some(child) = node.named_child(0) {
                    if child.kind() == "call" {
                        self.scan_call(child);
                    }
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit_class(&mut self, node: Node<'a>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.text));
        let base = node
            .child_by_field_name("superclasses")
            .and_then(|sup| self.cataloged_base(sup));

        let binding = match (name, base) {
            (Some(name), Some(base)) => {
                let line = node.start_position().row + 1;
                let id = self
                    .model
                    .push_node(base, name.clone(), line, NodeOrigin::ClassDef, None);
                self.symbols.insert(name, id);
                Some(id)
            }
            _ => None,
        };

        self.class_stack.push(binding);
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.children(&mut cursor) {
                self.visit(child);
            }
        }
        self.class_stack.pop();
    }

    /// First base class that matches the catalog, whether written bare
    /// (`QMainWindow`) or qualified (`QtWidgets.QMainWindow`).
    fn cataloged_base(&self, superclasses: Node<'a>) -> Option<String> {
        let mut cursor = superclasses.walk();
        for child in superclasses.children(&mut cursor) {
            let candidate = match child.kind() {
                "identifier" => node_text(child, self.text),
                "attribute" => match child.child_by_field_name("attribute") {
                    Some(attr) => node_text(attr, self.text),
                    None => continue,
                },
                _ => continue,
            };
            if self.catalog.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn scan_assignment(&mut self, node: Node<'a>) {
        let (left, right) = match (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) {
            (Some(l), Some(r)) => (l, r),
            _ => return,
        };
        if right.kind() != "call" {
            return;
        }
        let type_name = match self.call_type_name(right) {
            Some(name) if self.catalog.contains(&name) => name,
            _ => return,
        };

        let (symbol, name, is_attribute) = match left.kind() {
            "identifier" => {
                let name = node_text(left, self.text);
                (name.clone(), name, false)
            }
            "attribute" => {
                match left.child_by_field_name("object") {
                    Some(obj) if node_text(obj, self.text) == "self" => {}
                    _ => return,
                }
                let attr = match left.child_by_field_name("attribute") {
                    Some(attr) => node_text(attr, self.text),
                    None => return,
                };
                (format!("self.{attr}"), attr, true)
            }
            _ => return,
        };

        let line = node.start_position().row + 1;
        let declared_in = if is_attribute { self.current_class() } else { None };
        let id = self
            .model
            .push_node(type_name, name, line, NodeOrigin::Assignment, declared_in);
        self.symbols.insert(symbol, id);

        // A `parent=` keyword on the constructor is an explicit signal.
        if let Some(args) = right.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.children(&mut cursor) {
                if arg.kind() != "keyword_argument" {
                    continue;
                }
                let is_parent = arg
                    .child_by_field_name("name")
                    .map(|n| node_text(n, self.text) == "parent")
                    .unwrap_or(false);
                if !is_parent {
                    continue;
                }
                if let Some(value) = arg.child_by_field_name("value") {
                    let receiver = node_text(value, self.text);
                    if let Some(parent) = self.resolve_symbol(&receiver) {
                        self.model.attach(id, parent, line, AttachSignal::AddCall);
                    }
                }
            }
        }
    }

    fn scan_call(&mut self, call: Node<'a>) {
        let function = match call.child_by_field_name("function") {
            Some(f) if f.kind() == "attribute" => f,
            _ => return,
        };
        let method = match function.child_by_field_name("attribute") {
            Some(m) => node_text(m, self.text),
            None => return,
        };
        if !matches!(
            method.as_str(),
            "addWidget" | "addLayout" | "setCentralWidget" | "setLayout"
        ) {
            return;
        }
        let receiver = match function.child_by_field_name("object") {
            Some(obj) => node_text(obj, self.text),
            None => return,
        };
        let parent = match self.resolve_symbol(&receiver) {
            Some(id) => id,
            None => return,
        };
        let child = match first_symbol_argument(call, self.text) {
            Some(symbol) => match self.resolve_symbol(&symbol) {
                Some(id) => id,
                None => return,
            },
            None => return,
        };
        let line = call.start_position().row + 1;
        self.model.attach(child, parent, line, AttachSignal::AddCall);
    }

    fn call_type_name(&self, call: Node<'a>) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => Some(node_text(function, self.text)),
            "attribute" => function
                .child_by_field_name("attribute")
                .map(|attr| node_text(attr, self.text)),
            _ => None,
        }
    }

    fn current_class(&self) -> Option<WidgetId> {
        self.class_stack.last().copied().flatten()
    }

    fn resolve_symbol(&self, receiver: &str) -> Option<WidgetId> {
        if receiver == "self" {
            return self.current_class();
        }
        self.symbols.get(receiver).copied()
    }

    /// Fallback signal: an attribute widget with no add-call anywhere attaches
    /// to its enclosing container class node.
    fn apply_nesting_fallback(&mut self) {
        let referenced = self.model.add_call_targets();
        let pending: Vec<(WidgetId, WidgetId, usize)> = self
            .model
            .nodes
            .iter()
            .filter(|n| n.parent_id.is_none() && n.origin == NodeOrigin::Assignment)
            .filter(|n| referenced.binary_search(&n.id).is_err())
            .filter_map(|n| {
                let host = n.declared_in?;
                let host_type = &self.model.node(host).type_name;
                if self.catalog.is_container(host_type) {
                    Some((n.id, host, n.line))
                } else {
                    None
                }
            })
            .collect();
        for (child, parent, line) in pending {
            self.model.attach(child, parent, line, AttachSignal::Nesting);
        }
    }
}

fn first_symbol_argument(call: Node<'_>, text: &str) -> Option<String> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    for arg in args.children(&mut cursor) {
        if matches!(arg.kind(), "identifier" | "attribute") {
            return Some(node_text(arg, text));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest;

    fn build(source: &str) -> BuildOutput {
        let parsed = ingest::parse(source).expect("valid source");
        build_model(&parsed, &WidgetCatalog::default())
    }

    #[test]
    fn recognizes_local_and_attribute_assignments() {
        let out = build("label = QLabel()\nself.button = QPushButton()\n");
        assert_eq!(out.model.nodes.len(), 2);
        assert_eq!(out.model.node(0).type_name, "QLabel");
        assert_eq!(out.model.node(1).name, "button");
        assert_eq!(out.symbols.get("label"), Some(&0));
        assert_eq!(out.symbols.get("self.button"), Some(&1));
    }

    #[test]
    fn ignores_uncataloged_callees() {
        let out = build("thing = Mystery()\nvalue = compute()\n");
        assert!(out.model.nodes.is_empty());
    }

    #[test]
    fn qualified_constructor_resolves_to_catalog_entry() {
        let out = build("label = QtWidgets.QLabel()\n");
        assert_eq!(out.model.nodes.len(), 1);
        assert_eq!(out.model.node(0).type_name, "QLabel");
    }

    #[test]
    fn add_widget_sets_parentage() {
        let out = build(
            "layout = QVBoxLayout()\nbutton = QPushButton()\nlayout.addWidget(button)\n",
        );
        assert_eq!(out.model.node(1).parent_id, Some(0));
        assert_eq!(out.model.node(0).children, vec![1]);
    }

    #[test]
    fn parent_keyword_attaches_at_construction() {
        let out = build("frame = QFrame()\nlabel = QLabel(parent=frame)\n");
        assert_eq!(out.model.node(1).parent_id, Some(0));
    }

    #[test]
    fn container_class_becomes_root_and_hosts_nested_widgets() {
        let source = "\
class MainWindow(QMainWindow):
    def __init__(self):
        self.status = QLabel()
";
        let out = build(source);
        assert_eq!(out.model.nodes.len(), 2);
        let class_node = out.model.node(0);
        assert_eq!(class_node.type_name, "QMainWindow");
        assert_eq!(class_node.name, "MainWindow");
        // nesting fallback: no add-call, so the class hosts the label
        assert_eq!(out.model.node(1).parent_id, Some(0));
    }

    #[test]
    fn explicit_add_call_beats_nesting_fallback() {
        let source = "\
class MainWindow(QMainWindow):
    def __init__(self):
        self.panel = QFrame()
        self.status = QLabel()
        self.panel.addWidget(self.status)
";
        let out = build(source);
        let status = out
            .model
            .nodes
            .iter()
            .find(|n| n.name == "status")
            .expect("status node");
        let panel = out
            .model
            .nodes
            .iter()
            .find(|n| n.name == "panel")
            .expect("panel node");
        assert_eq!(status.parent_id, Some(panel.id));
    }

    #[test]
    fn set_central_widget_attaches_to_class_node() {
        let source = "\
class MainWindow(QMainWindow):
    def __init__(self):
        self.central = QWidget()
        self.setCentralWidget(self.central)
";
        let out = build(source);
        assert_eq!(out.model.node(1).parent_id, Some(0));
    }

    #[test]
    fn widgets_inside_loops_and_conditionals_are_not_detected() {
        let source = "\
for i in range(3):
    row = QLabel()
if enabled:
    extra = QPushButton()
steady = QLabel()
";
        let out = build(source);
        assert_eq!(out.model.nodes.len(), 1);
        assert_eq!(out.model.node(0).name, "steady");
    }

    #[test]
    fn leaf_base_class_does_not_host_children() {
        let source = "\
class FancyLabel(QLabel):
    def __init__(self):
        self.icon = QLabel()
";
        let out = build(source);
        let icon = out
            .model
            .nodes
            .iter()
            .find(|n| n.name == "icon")
            .expect("icon node");
        assert_eq!(icon.parent_id, None);
    }
}
