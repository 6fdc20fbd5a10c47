//! Compiled-query parser backend.
//!
//! Locates declaration and import nodes with a tree-sitter query instead of
//! a full manual walk, then hands each captured node to the shared visitor
//! extraction. Offsets come straight off the captured nodes, so both
//! backends report identical byte ranges for the same source.

use crate::error::{GenerateError, GenerateResult};
use crate::parsing::visitor::{EntityVisitor, first_error_location};
use crate::parsing::{AnnotationMatcher, ParsedSource, SourceParser};
use std::path::Path;
use tree_sitter::{Parser, Query, QueryCursor, StreamingIterator};

const DECLARATION_QUERY: &str = r#"
(class_declaration) @declaration
(protocol_declaration) @declaration
(import_declaration) @import
"#;

pub struct QueryParser {
    parser: Parser,
    query: Query,
    declaration_index: u32,
    import_index: u32,
}

impl QueryParser {
    pub fn new() -> GenerateResult<Self> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_swift::LANGUAGE.into();
        parser.set_language(&language).map_err(|e| {
            GenerateError::Backend(format!("failed to initialize Swift grammar: {e}"))
        })?;
        let query = Query::new(&language, DECLARATION_QUERY)
            .map_err(|e| GenerateError::Backend(format!("declaration query rejected: {e}")))?;
        let declaration_index = query
            .capture_index_for_name("declaration")
            .ok_or_else(|| GenerateError::Backend("missing @declaration capture".to_string()))?;
        let import_index = query
            .capture_index_for_name("import")
            .ok_or_else(|| GenerateError::Backend("missing @import capture".to_string()))?;
        Ok(Self {
            parser,
            query,
            declaration_index,
            import_index,
        })
    }
}

impl SourceParser for QueryParser {
    fn parse_source(
        &mut self,
        code: &str,
        path: &Path,
        matcher: &AnnotationMatcher,
    ) -> GenerateResult<ParsedSource> {
        let tree = self
            .parser
            .parse(code, None)
            .ok_or_else(|| GenerateError::Parse {
                path: path.to_path_buf(),
                reason: "tree-sitter produced no syntax tree".to_string(),
            })?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(GenerateError::Parse {
                path: path.to_path_buf(),
                reason: first_error_location(root),
            });
        }

        let mut visitor = EntityVisitor::new(code, path, matcher);
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, root, code.as_bytes());
        // tree-sitter 0.26: QueryMatches is a StreamingIterator, not Iterator.
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index == self.declaration_index {
                    visitor.collect_declaration(capture.node);
                } else if capture.index == self.import_index {
                    visitor.collect_import(capture.node);
                }
            }
        }
        Ok(visitor.finish())
    }

    fn backend_name(&self) -> &'static str {
        "query"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::SyntaxTreeParser;

    const SOURCE: &str = r#"
import Foundation
import CoreKit

/// @mockable
protocol TaskRouting {
    var route: String { get set }
    func dispatch(to queue: String, priority: Int) throws -> Bool
}

/// @mockable
class TaskStore {
    var capacity: Int = 0
    func insert(id: Int) {}
}
"#;

    #[test]
    fn query_backend_extracts_declarations_and_imports() {
        let matcher = AnnotationMatcher::new("@mockable");
        let mut parser = QueryParser::new().unwrap();
        let source = parser
            .parse_source(SOURCE, Path::new("Tasks.swift"), &matcher)
            .unwrap();

        assert_eq!(source.imports, vec!["Foundation", "CoreKit"]);
        let names: Vec<&str> = source.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["TaskRouting", "TaskStore"]);
    }

    #[test]
    fn backends_agree_on_entities_and_offsets() {
        let matcher = AnnotationMatcher::new("@mockable");
        let mut syntax = SyntaxTreeParser::new().unwrap();
        let mut query = QueryParser::new().unwrap();

        let a = syntax
            .parse_source(SOURCE, Path::new("Tasks.swift"), &matcher)
            .unwrap();
        let b = query
            .parse_source(SOURCE, Path::new("Tasks.swift"), &matcher)
            .unwrap();

        assert_eq!(a.entities, b.entities);
        assert_eq!(a.imports, b.imports);
    }

    #[test]
    fn query_backend_rejects_broken_source() {
        let matcher = AnnotationMatcher::new("@mockable");
        let mut parser = QueryParser::new().unwrap();
        let err = parser
            .parse_source("class }", Path::new("Broken.swift"), &matcher)
            .unwrap_err();
        assert!(matches!(err, GenerateError::Parse { .. }));
    }
}
