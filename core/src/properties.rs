//! Property resolution pass.
//!
//! Matches `symbol.setX(...)` statements to previously created nodes and
//! records the arguments when they are literals. Anything else (a variable, a
//! call result, an f-string) is recorded as indeterminate rather than guessed.
//! Geometry counts as known only when all four components are integer
//! literals. Calls before a node's creation line, or behind control flow, are
//! not matched.

use tree_sitter::Node;

use crate::builder::{is_conditional_scope, node_text, SymbolTable};
use crate::ingest::ParsedSource;
use crate::model::{Geometry, PropertyValue, WidgetId, WidgetModel};

pub fn resolve_properties(source: &ParsedSource, model: &mut WidgetModel, symbols: &SymbolTable) {
    let mut resolver = Resolver {
        text: &source.text,
        model,
        symbols,
        class_stack: Vec::new(),
    };
    resolver.visit(source.root());
}

struct Resolver<'a> {
    text: &'a str,
    model: &'a mut WidgetModel,
    symbols: &'a SymbolTable,
    class_stack: Vec<Option<WidgetId>>,
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, node: Node<'a>) {
        if is_conditional_scope(node.kind()) {
            return;
        }
        if node.kind() == "class_definition" {
            let binding = node
                .child_by_field_name("name")
                .and_then(|n| self.symbols.get(&node_text(n, self.text)).copied());
            self.class_stack.push(binding);
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for child in body.children(&mut cursor) {
                    self.visit(child);
                }
            }
            self.class_stack.pop();
            return;
        }
        if node.kind() == "expression_statement" {
            if let Some(child) = node.named_child(0) {
                if child.kind() == "call" {
                    self.scan_call(child);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
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
        let receiver = match function.child_by_field_name("object") {
            Some(obj) => node_text(obj, self.text),
            None => return,
        };
        let id = match self.resolve_symbol(&receiver) {
            Some(id) => id,
            None => return,
        };
        let line = call.start_position().row + 1;
        if line < self.model.node(id).line {
            return;
        }
        let args = positional_args(call);

        match method.as_str() {
            "setGeometry" => self.record_geometry(id, &args),
            "setMinimumSize" => self.record_size_pair(id, &args, "min_width", "min_height"),
            "setMaximumSize" => self.record_size_pair(id, &args, "max_width", "max_height"),
            "setStyleSheet" => self.record_string(id, &args, "stylesheet"),
            "setObjectName" => self.record_object_name(id, &args),
            "setText" => self.record_string(id, &args, "text"),
            "setWindowTitle" => self.record_string(id, &args, "window_title"),
            "setVisible" => self.record_bool(id, &args, "visible", false),
            "setEnabled" => self.record_bool(id, &args, "enabled", false),
            "setDisabled" => self.record_bool(id, &args, "enabled", true),
            "hide" => self.set_property(id, "visible", PropertyValue::Bool(false)),
            "show" => self.set_property(id, "visible", PropertyValue::Bool(true)),
            _ => {}
        }
    }

    fn record_geometry(&mut self, id: WidgetId, args: &[Node<'a>]) {
        if args.len() < 4 {
            return;
        }
        let components: Vec<Option<i64>> =
            args[..4].iter().map(|a| int_literal(*a, self.text)).collect();
        if components.iter().all(Option::is_some) {
            let v: Vec<i64> = components.into_iter().flatten().collect();
            self.model.node_mut(id).geometry = Some(Geometry {
                x: v[0],
                y: v[1],
                width: v[2],
                height: v[3],
            });
        } else {
            self.set_property(id, "geometry", PropertyValue::Indeterminate);
        }
    }

    fn record_size_pair(&mut self, id: WidgetId, args: &[Node<'a>], w_key: &str, h_key: &str) {
        if args.len() < 2 {
            return;
        }
        for (key, arg) in [(w_key, args[0]), (h_key, args[1])] {
            let value = int_literal(arg, self.text)
                .map(PropertyValue::Int)
                .unwrap_or(PropertyValue::Indeterminate);
            self.set_property(id, key, value);
        }
    }

    fn record_string(&mut self, id: WidgetId, args: &[Node<'a>], key: &str) {
        let Some(arg) = args.first() else { return };
        let value = string_literal(*arg, self.text)
            .map(PropertyValue::Str)
            .unwrap_or(PropertyValue::Indeterminate);
        self.set_property(id, key, value);
    }

    fn record_object_name(&mut self, id: WidgetId, args: &[Node<'a>]) {
        let Some(arg) = args.first() else { return };
        match string_literal(*arg, self.text) {
            Some(name) => self.model.node_mut(id).object_name = Some(name),
            None => self.set_property(id, "object_name", PropertyValue::Indeterminate),
        }
    }

    fn record_bool(&mut self, id: WidgetId, args: &[Node<'a>], key: &str, invert: bool) {
        let Some(arg) = args.first() else { return };
        let value = match bool_literal(*arg) {
            Some(b) => PropertyValue::Bool(b != invert),
            None => PropertyValue::Indeterminate,
        };
        self.set_property(id, key, value);
    }

    fn set_property(&mut self, id: WidgetId, key: &str, value: PropertyValue) {
        self.model
            .node_mut(id)
            .properties
            .insert(key.to_string(), value);
    }

    fn resolve_symbol(&self, receiver: &str) -> Option<WidgetId> {
        if receiver == "self" {
            return self.class_stack.last().copied().flatten();
        }
        self.symbols.get(receiver).copied()
    }
}

fn positional_args<'a>(call: Node<'a>) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    if let Some(args) = call.child_by_field_name("arguments") {
        let mut cursor = args.walk();
        for arg in args.children(&mut cursor) {
            if arg.is_named() && arg.kind() != "keyword_argument" && arg.kind() != "comment" {
                out.push(arg);
            }
        }
    }
    out
}

fn int_literal(node: Node<'_>, text: &str) -> Option<i64> {
    match node.kind() {
        "integer" => node_text(node, text).parse().ok(),
        // "-5" parses as a whole once the operator is included
        "unary_operator" => node_text(node, text).trim().parse().ok(),
        _ => None,
    }
}

fn bool_literal(node: Node<'_>) -> Option<bool> {
    match node.kind() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn string_literal(node: Node<'_>, text: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut out = String::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_content" => out.push_str(&node_text(child, text)),
            // an f-string with interpolation is not a static literal
            "interpolation" => return None,
            _ => {}
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_model;
    use crate::catalog::WidgetCatalog;
    use crate::ingest;

    fn resolve(source: &str) -> WidgetModel {
        let parsed = ingest::parse(source).expect("valid source");
        let out = build_model(&parsed, &WidgetCatalog::default());
        let mut model = out.model;
        resolve_properties(&parsed, &mut model, &out.symbols);
        model
    }

    #[test]
    fn literal_geometry_is_recorded() {
        let model = resolve("label = QLabel()\nlabel.setGeometry(10, 20, 100, 30)\n");
        assert_eq!(
            model.node(0).geometry,
            Some(Geometry {
                x: 10,
                y: 20,
                width: 100,
                height: 30
            })
        );
    }

    #[test]
    fn non_literal_geometry_stays_indeterminate() {
        let model = resolve("label = QLabel()\nlabel.setGeometry(x, 20, 100, 30)\n");
        assert_eq!(model.node(0).geometry, None);
        assert_eq!(
            model.node(0).properties.get("geometry"),
            Some(&PropertyValue::Indeterminate)
        );
    }

    #[test]
    fn negative_coordinates_parse() {
        let model = resolve("label = QLabel()\nlabel.setGeometry(-5, -10, 50, 50)\n");
        let geometry = model.node(0).geometry.expect("geometry");
        assert_eq!(geometry.x, -5);
        assert_eq!(geometry.y, -10);
    }

    #[test]
    fn visibility_and_enabled_calls_are_tracked() {
        let model = resolve(
            "a = QLabel()\na.setVisible(False)\nb = QLabel()\nb.setDisabled(True)\nc = QLabel()\nc.hide()\n",
        );
        assert_eq!(
            model.node(0).properties.get("visible"),
            Some(&PropertyValue::Bool(false))
        );
        assert_eq!(
            model.node(1).properties.get("enabled"),
            Some(&PropertyValue::Bool(false))
        );
        assert_eq!(
            model.node(2).properties.get("visible"),
            Some(&PropertyValue::Bool(false))
        );
    }

    #[test]
    fn object_name_from_literal_string() {
        let model = resolve("b = QPushButton()\nb.setObjectName(\"submit\")\n");
        assert_eq!(model.node(0).object_name.as_deref(), Some("submit"));
    }

    #[test]
    fn fstring_argument_is_indeterminate() {
        let model = resolve("b = QPushButton()\nb.setText(f\"count: {n}\")\n");
        assert_eq!(
            model.node(0).properties.get("text"),
            Some(&PropertyValue::Indeterminate)
        );
    }

    #[test]
    fn min_and_max_size_pairs() {
        let model = resolve(
            "w = QWidget()\nw.setMinimumSize(200, 100)\nw.setMaximumSize(400, 300)\n",
        );
        let props = &model.node(0).properties;
        assert_eq!(props.get("min_width"), Some(&PropertyValue::Int(200)));
        assert_eq!(props.get("max_height"), Some(&PropertyValue::Int(300)));
    }

    #[test]
    fn calls_on_unknown_symbols_are_ignored() {
        let model = resolve("label = QLabel()\nother.setGeometry(0, 0, 10, 10)\n");
        assert_eq!(model.node(0).geometry, None);
    }

    #[test]
    fn self_receiver_resolves_to_class_node() {
        let source = "\
class MainWindow(QMainWindow):
    def __init__(self):
        self.setWindowTitle(\"Lots\")
";
        let model = resolve(source);
        assert_eq!(
            model.node(0).properties.get("window_title"),
            Some(&PropertyValue::Str("Lots".into()))
        );
    }
}
