//! Source ingestion: parse one Python file into a tree-sitter parse tree.
//!
//! Read-only and side-effect free. A file that does not parse cleanly is
//! reported as a `ParseFailure` and abandoned; no partial model is built from
//! broken syntax.

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Error)]
#[error("syntax error near line {line}")]
pub struct ParseFailure {
    pub line: usize,
}

#[derive(Debug)]
pub struct ParsedSource {
    pub text: String,
    tree: Tree,
}

impl ParsedSource {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn lines(&self) -> usize {
        self.text.lines().count()
    }
}

pub fn parse(text: &str) -> Result<ParsedSource, ParseFailure> {
    let mut parser = Parser::new();
    let lang = tree_sitter_python::LANGUAGE;
    parser
        .set_language(&lang.into())
        .map_err(|_| ParseFailure { line: 1 })?;

    let tree = parser.parse(text, None).ok_or(ParseFailure { line: 1 })?;
    if tree.root_node().has_error() {
        let line = first_error_line(tree.root_node()).unwrap_or(1);
        return Err(ParseFailure { line });
    }

    Ok(ParsedSource {
        text: text.to_string(),
        tree,
    })
}

fn first_error_line(root: Node<'_>) -> Option<usize> {
    let mut stack = vec![root];
    let mut best: Option<usize> = None;
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            best = Some(best.map_or(line, |b| b.min(line)));
            continue;
        }
        if !node.has_error() {
            continue;
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    best
}
