//! AST parsing for the target language (§4.C, consumed interface per §6).
//!
//! This module is intentionally thin: the full grammar lives in
//! `tree-sitter-python`, and everything here does is parse a module's text
//! and classify the untyped tree-sitter nodes into the small, closed set
//! of kinds the rest of the engine (scope building, resolution,
//! refactoring orchestrators) actually reasons about.

use crate::error::{EngineError, Result};
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor, Tree};

/// The coarse node kinds the engine's scope/resolver/orchestrator layers
/// discriminate on. Every orchestrator states its policy on every one of
/// these via an exhaustive match (§9 design note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    ClassDef,
    FunctionDef,
    Assign,
    AugAssign,
    Name,
    Attribute,
    Call,
    Import,
    ImportFrom,
    Parameters,
    Parameter,
    Block,
    Other,
}

/// Classifies a tree-sitter-python node kind string into the engine's
/// closed `NodeKind` set.
pub fn classify(node: &Node) -> NodeKind {
    match node.kind() {
        "module" => NodeKind::Module,
        "class_definition" => NodeKind::ClassDef,
        "function_definition" => NodeKind::FunctionDef,
        "assignment" => NodeKind::Assign,
        "augmented_assignment" => NodeKind::AugAssign,
        "identifier" => NodeKind::Name,
        "attribute" => NodeKind::Attribute,
        "call" => NodeKind::Call,
        "import_statement" => NodeKind::Import,
        "import_from_statement" => NodeKind::ImportFrom,
        "parameters" => NodeKind::Parameters,
        "identifier" | "typed_parameter" | "default_parameter" => NodeKind::Parameter,
        "block" => NodeKind::Block,
        _ => NodeKind::Other,
    }
}

/// A parsed module: the tree-sitter tree plus the exact source bytes it
/// was parsed from. Offsets in the tree index into these bytes.
pub struct Ast {
    tree: Tree,
    source: String,
}

impl Ast {
    /// Parses `source` as a target-language module.
    pub fn parse(source: &str, path: &Path) -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| EngineError::Parse {
                path: path.to_path_buf(),
                message: format!("failed to load grammar: {e}"),
            })?;
        let tree = parser.parse(source, None).ok_or_else(|| EngineError::Parse {
            path: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;
        Ok(Self {
            tree,
            source: source.to_string(),
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The exact text spanned by `node`.
    pub fn text<'a>(&'a self, node: &Node) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    /// Every `identifier` node spanning exactly `name`, optionally
    /// restricted to a byte range. Used by the resolver to enumerate
    /// candidate occurrences without a hand-rolled tree walk.
    pub fn identifiers_named<'a>(&'a self, name: &str, byte_range: Option<Range<usize>>) -> Vec<Node<'a>> {
        static IDENTIFIER_QUERY: OnceLock<Query> = OnceLock::new();
        let query = IDENTIFIER_QUERY.get_or_init(|| {
            let language = tree_sitter_python::LANGUAGE.into();
            Query::new(&language, "(identifier) @id").expect("static query is valid")
        });

        let mut cursor = QueryCursor::new();
        if let Some(range) = byte_range {
            cursor.set_byte_range(range);
        }
        let mut matches = cursor.matches(query, self.root(), self.source.as_bytes());
        let mut out = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                if self.text(&node) == name {
                    out.push(node);
                }
            }
        }
        out
    }

    /// The innermost node whose byte range contains `offset`.
    pub fn node_at_offset(&self, offset: usize) -> Option<Node<'_>> {
        let root = self.root();
        if offset > root.end_byte() {
            return None;
        }
        let mut node = root;
        loop {
            let mut descended = false;
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.start_byte() <= offset && offset <= child.end_byte() {
                    node = child;
                    descended = true;
                    break;
                }
            }
            if !descended {
                break;
            }
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_class_def() {
        let ast = Ast::parse("class AClass(object):\n    an_attr = 10\n", &PathBuf::from("mod.py"))
            .unwrap();
        assert_eq!(classify(&ast.root()), NodeKind::Module);
        let mut cursor = ast.root().walk();
        let class_node = ast
            .root()
            .children(&mut cursor)
            .find(|n| classify(n) == NodeKind::ClassDef)
            .unwrap();
        assert_eq!(ast.text(&class_node).starts_with("class AClass"), true);
    }

    #[test]
    fn node_at_offset_finds_identifier() {
        let src = "class AClass(object):\n    an_attr = 10\n";
        let ast = Ast::parse(src, &PathBuf::from("mod.py")).unwrap();
        let offset = src.find("AClass").unwrap() + 1;
        let node = ast.node_at_offset(offset).unwrap();
        assert_eq!(classify(&node), NodeKind::Name);
        assert_eq!(ast.text(&node), "AClass");
    }
}
