//! Entity extraction via a manual syntax-tree walk.
//!
//! `SyntaxTreeParser` is the pure-syntax-tree backend: it parses a file with
//! tree-sitter and walks the tree in document order, emitting one `Entity`
//! per protocol/class/struct/extension declaration, with members resolved
//! into typed models. `EntityVisitor` holds the shared extraction logic the
//! query backend reuses on its captured nodes.

use crate::error::{GenerateError, GenerateResult};
use crate::model::{
    Entity, EntityKind, GenericParam, Member, Method, MethodKind, Parameter, SwiftType, Variable,
};
use crate::parsing::{AnnotationMatcher, ParsedSource, SourceParser};
use std::path::Path;
use tree_sitter::{Node, Parser};

// Node kinds in the tree-sitter-swift grammar
const NODE_CLASS_DECLARATION: &str = "class_declaration";
const NODE_PROTOCOL_DECLARATION: &str = "protocol_declaration";
const NODE_FUNCTION_DECLARATION: &str = "function_declaration";
const NODE_PROTOCOL_FUNCTION_DECLARATION: &str = "protocol_function_declaration";
const NODE_INIT_DECLARATION: &str = "init_declaration";
const NODE_PROPERTY_DECLARATION: &str = "property_declaration";
const NODE_PROTOCOL_PROPERTY_DECLARATION: &str = "protocol_property_declaration";
const NODE_IMPORT_DECLARATION: &str = "import_declaration";
const NODE_COMMENT: &str = "comment";
const NODE_MULTILINE_COMMENT: &str = "multiline_comment";
const NODE_MODIFIERS: &str = "modifiers";
const NODE_ATTRIBUTE: &str = "attribute";
const NODE_TYPE_ANNOTATION: &str = "type_annotation";
const NODE_PARAMETER: &str = "parameter";
const NODE_TYPE_PARAMETERS: &str = "type_parameters";
const NODE_TYPE_PARAMETER: &str = "type_parameter";
const NODE_INHERITANCE_SPECIFIER: &str = "inheritance_specifier";
const NODE_SIMPLE_IDENTIFIER: &str = "simple_identifier";
const NODE_FUNCTION_BODY: &str = "function_body";
const NODE_CLASS_BODY: &str = "class_body";
const NODE_THREE_DOT_OPERATOR: &str = "three_dot_operator";

/// Pure syntax-tree parser backend.
pub struct SyntaxTreeParser {
    parser: Parser,
}

impl SyntaxTreeParser {
    pub fn new() -> GenerateResult<Self> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_swift::LANGUAGE.into();
        parser.set_language(&language).map_err(|e| {
            GenerateError::Backend(format!("failed to initialize Swift grammar: {e}"))
        })?;
        Ok(Self { parser })
    }
}

impl SourceParser for SyntaxTreeParser {
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
        visitor.visit(root);
        Ok(visitor.finish())
    }

    fn backend_name(&self) -> &'static str {
        "syntax"
    }
}

/// Locate the first ERROR node for the parse diagnostic.
pub(crate) fn first_error_location(root: Node) -> String {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return format!("syntax error at line {}, column {}", pos.row + 1, pos.column + 1);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.has_error() {
                stack.push(child);
            }
        }
    }
    "syntax error".to_string()
}

/// Walks a parsed file's tree and extracts declarations with source offsets.
pub(crate) struct EntityVisitor<'a> {
    code: &'a str,
    path: &'a Path,
    matcher: &'a AnnotationMatcher,
    entities: Vec<Entity>,
    imports: Vec<String>,
}

impl<'a> EntityVisitor<'a> {
    pub(crate) fn new(code: &'a str, path: &'a Path, matcher: &'a AnnotationMatcher) -> Self {
        Self {
            code,
            path,
            matcher,
            entities: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> ParsedSource {
        ParsedSource {
            path: self.path.to_path_buf(),
            entities: self.entities,
            imports: self.imports,
        }
    }

    /// Document-order walk emitting entities for every declaration of
    /// interest, including ones nested inside other type bodies.
    pub(crate) fn visit(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                NODE_IMPORT_DECLARATION => self.collect_import(child),
                NODE_PROTOCOL_DECLARATION => self.collect_declaration(child),
                NODE_CLASS_DECLARATION => {
                    self.collect_declaration(child);
                    // Nested type declarations produce their own entities.
                    if let Some(body) = child.child_by_field_name("body") {
                        self.visit(body);
                    }
                }
                _ => self.visit(child),
            }
        }
    }

    pub(crate) fn collect_import(&mut self, node: Node) {
        let text = self.text(node);
        if let Some(module) = text.strip_prefix("import") {
            let module = module.trim();
            if !module.is_empty() {
                self.imports.push(module.to_string());
            }
        }
    }

    /// Extract one entity from a declaration node. Shared with the query
    /// backend, which hands over its captured nodes directly.
    pub(crate) fn collect_declaration(&mut self, node: Node) {
        let kind = match node.kind() {
            NODE_PROTOCOL_DECLARATION => EntityKind::Protocol,
            NODE_CLASS_DECLARATION => match self.declaration_keyword(node) {
                Some("class") | Some("actor") => EntityKind::Class,
                Some("struct") => EntityKind::Struct,
                Some("extension") => EntityKind::Extension,
                _ => return,
            },
            _ => return,
        };

        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).trim().to_string();
        if name.is_empty() {
            return;
        }
        let name = self.qualify(node, name);

        let doc = self.doc_comment_for(node);
        let flags = doc.as_deref().and_then(|c| self.matcher.annotation(c));

        let mut entity = Entity::new(name, kind);
        entity.path = self.path.to_path_buf();
        entity.offset = node.start_byte();
        entity.len = node.end_byte() - node.start_byte();
        entity.annotated = flags.is_some();
        entity.history_annotated = flags.map(|f| f.history).unwrap_or(false);
        entity.generic_params = self.type_params(node);
        entity.inherited = self.inheritance(node);
        entity.members = self.members(node, entity.history_annotated);
        self.entities.push(entity);
    }

    /// Prefix the enclosing type path onto a nested declaration's name so the
    /// generated conformance resolves at file scope (`Outer.Inner`).
    fn qualify(&self, node: Node, name: String) -> String {
        let mut parts = vec![name];
        let mut current = node.parent();
        while let Some(parent) = current {
            if parent.kind() == NODE_CLASS_DECLARATION {
                if let Some(outer) = parent.child_by_field_name("name") {
                    parts.push(self.text(outer).trim().to_string());
                }
            }
            current = parent.parent();
        }
        parts.reverse();
        parts.join(".")
    }

    fn members(&self, node: Node, entity_history: bool) -> Vec<Member> {
        let mut members = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return members;
        };
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match child.kind() {
                NODE_FUNCTION_DECLARATION | NODE_PROTOCOL_FUNCTION_DECLARATION => {
                    if let Some(method) = self.extract_method(child, entity_history) {
                        members.push(Member::Method(method));
                    }
                }
                NODE_INIT_DECLARATION => {
                    if let Some(method) = self.extract_initializer(child, entity_history) {
                        members.push(Member::Method(method));
                    }
                }
                NODE_PROPERTY_DECLARATION | NODE_PROTOCOL_PROPERTY_DECLARATION => {
                    if let Some(variable) = self.extract_variable(child) {
                        members.push(Member::Variable(variable));
                    }
                }
                _ => {}
            }
        }
        members
    }

    fn extract_method(&self, node: Node, entity_history: bool) -> Option<Method> {
        let name = match node.child_by_field_name("name") {
            Some(n) => self.text(n).trim().to_string(),
            // Protocol init requirements parse without a name field.
            None if self.has_keyword(node, "init") => {
                return self.extract_initializer(node, entity_history);
            }
            None => return None,
        };

        let history = entity_history || self.method_history_annotation(node);
        let params = self.params(node);
        let mut method = Method::new(
            name,
            MethodKind::Instance,
            params,
            self.type_params(node),
            node.child_by_field_name("return_type")
                .map(|n| SwiftType::new(self.text(n))),
            self.has_keyword(node, "throws"),
            node.start_byte(),
            history,
        );
        method.attributes = self.attributes(node);
        Some(method)
    }

    fn extract_initializer(&self, node: Node, entity_history: bool) -> Option<Method> {
        let history = entity_history || self.method_history_annotation(node);
        let mut method = Method::new(
            "init",
            MethodKind::Initializer,
            self.params(node),
            self.type_params(node),
            None,
            self.has_keyword(node, "throws"),
            node.start_byte(),
            history,
        );
        method.attributes = self.attributes(node);
        Some(method)
    }

    fn extract_variable(&self, node: Node) -> Option<Variable> {
        let name = self.property_name(node)?;
        let ty = self.property_type(node)?;
        Some(Variable {
            name,
            ty,
            offset: node.start_byte(),
            attributes: self.attributes(node),
        })
    }

    /// Property declarations have no direct name field in the grammar; the
    /// `name` field holds a pattern wrapping the identifier.
    fn property_name(&self, node: Node) -> Option<String> {
        if let Some(pattern) = node.child_by_field_name("name") {
            if let Some(id) = find_child_by_kind(pattern, NODE_SIMPLE_IDENTIFIER) {
                return Some(self.text(id).to_string());
            }
            return Some(self.text(pattern).trim().to_string());
        }
        find_child_by_kind(node, "pattern")
            .and_then(|p| find_child_by_kind(p, NODE_SIMPLE_IDENTIFIER))
            .map(|id| self.text(id).to_string())
    }

    fn property_type(&self, node: Node) -> Option<SwiftType> {
        let annotation = find_child_by_kind(node, NODE_TYPE_ANNOTATION)?;
        let mut cursor = annotation.walk();
        annotation
            .children(&mut cursor)
            .find(|c| c.is_named())
            .map(|c| SwiftType::new(self.text(c)))
    }

    /// Parameters sit among direct children, or one level down inside an
    /// unnamed wrapper from the grammar's parameter-list rule.
    fn params(&self, node: Node) -> Vec<Parameter> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == NODE_PARAMETER {
                if let Some(param) = self.single_param(child) {
                    params.push(param);
                }
            } else if child.kind() != NODE_FUNCTION_BODY
                && child.kind() != NODE_CLASS_BODY
                && child.kind() != NODE_MODIFIERS
                && child.kind() != NODE_TYPE_PARAMETERS
            {
                let mut inner_cursor = child.walk();
                for inner in child.children(&mut inner_cursor) {
                    if inner.kind() == NODE_PARAMETER {
                        if let Some(param) = self.single_param(inner) {
                            params.push(param);
                        }
                    }
                }
            }
        }
        params
    }

    fn single_param(&self, node: Node) -> Option<Parameter> {
        let external = node.child_by_field_name("external_name");
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .or_else(|| {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == NODE_SIMPLE_IDENTIFIER
                        && external.is_none_or(|e| e.id() != child.id())
                    {
                        return Some(self.text(child).to_string());
                    }
                }
                None
            })?;

        let type_node = node.child_by_field_name("type").or_else(|| {
            find_child_by_kind(node, NODE_TYPE_ANNOTATION).and_then(|ta| {
                let mut cursor = ta.walk();
                ta.children(&mut cursor).find(|c| c.is_named())
            })
        })?;
        // Attributes like `@escaping` can sit outside the type field; fold
        // them back in so signatures round-trip.
        let mut type_text = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == NODE_ATTRIBUTE && child.end_byte() <= type_node.start_byte() {
                type_text.push_str(self.text(child));
                type_text.push(' ');
            }
        }
        type_text.push_str(self.text(type_node));
        let ty = SwiftType::new(type_text);

        let mut param = Parameter::new(external.map(|e| self.text(e).to_string()), name, ty);
        param.default_value = node
            .child_by_field_name("default_value")
            .map(|d| self.text(d).to_string());
        param.variadic = find_child_by_kind(node, NODE_THREE_DOT_OPERATOR).is_some()
            || self.has_keyword(node, "...");
        Some(param)
    }

    fn type_params(&self, node: Node) -> Vec<GenericParam> {
        let mut out = Vec::new();
        let Some(list) = find_child_by_kind(node, NODE_TYPE_PARAMETERS) else {
            return out;
        };
        let mut cursor = list.walk();
        for child in list.children(&mut cursor) {
            if child.kind() != NODE_TYPE_PARAMETER {
                continue;
            }
            let name = child
                .child_by_field_name("name")
                .or_else(|| find_child_by_kind(child, "type_identifier"))
                .or_else(|| find_child_by_kind(child, NODE_SIMPLE_IDENTIFIER))
                .map(|n| self.text(n).to_string());
            if let Some(name) = name {
                out.push(GenericParam::new(name, self.constraint_after_colon(child)));
            }
        }
        out
    }

    fn constraint_after_colon(&self, node: Node) -> Option<String> {
        let mut found_colon = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !child.is_named() && self.text(child) == ":" {
                found_colon = true;
                continue;
            }
            if found_colon && child.is_named() {
                return Some(self.text(child).trim().to_string());
            }
        }
        None
    }

    fn inheritance(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == NODE_INHERITANCE_SPECIFIER {
                let text = self.text(child).trim().to_string();
                if !text.is_empty() {
                    out.push(text);
                }
            }
        }
        out
    }

    fn attributes(&self, node: Node) -> Vec<String> {
        let mut out = Vec::new();
        let Some(modifiers) = find_child_by_kind(node, NODE_MODIFIERS) else {
            return out;
        };
        let mut cursor = modifiers.walk();
        for child in modifiers.children(&mut cursor) {
            if child.kind() == NODE_ATTRIBUTE {
                out.push(self.text(child).to_string());
            }
        }
        out
    }

    /// Leading comment block, raw text, earliest line first. The annotation
    /// matcher runs over this.
    fn doc_comment_for(&self, node: Node) -> Option<String> {
        let mut lines = Vec::new();
        let mut current = node.prev_sibling();
        while let Some(sibling) = current {
            let kind = sibling.kind();
            if kind != NODE_COMMENT && kind != NODE_MULTILINE_COMMENT {
                break;
            }
            lines.push(self.text(sibling).to_string());
            current = sibling.prev_sibling();
        }
        if lines.is_empty() {
            None
        } else {
            lines.reverse();
            Some(lines.join("\n"))
        }
    }

    fn method_history_annotation(&self, node: Node) -> bool {
        self.doc_comment_for(node)
            .as_deref()
            .and_then(|c| self.matcher.annotation(c))
            .map(|f| f.history)
            .unwrap_or(false)
    }

    /// The declaration_kind field distinguishes class/struct/extension/actor.
    fn declaration_keyword(&self, node: Node) -> Option<&str> {
        if let Some(kind_node) = node.child_by_field_name("declaration_kind") {
            return Some(self.text(kind_node).trim());
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !child.is_named() {
                let text = self.text(child);
                if matches!(text, "class" | "struct" | "enum" | "extension" | "actor") {
                    return Some(text);
                }
            }
        }
        None
    }

    fn has_keyword(&self, node: Node, keyword: &str) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .any(|c| c.kind() == keyword || (!c.is_named() && self.text(c) == keyword))
    }

    fn text(&self, node: Node) -> &'a str {
        &self.code[node.byte_range()]
    }
}

fn find_child_by_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Member;

    fn parse(code: &str) -> ParsedSource {
        let matcher = AnnotationMatcher::new("@mockable");
        let mut parser = SyntaxTreeParser::new().unwrap();
        parser
            .parse_source(code, Path::new("Test.swift"), &matcher)
            .unwrap()
    }

    #[test]
    fn extracts_protocol_with_members() {
        let source = parse(
            r#"
import Foundation

/// @mockable
protocol SessionManaging {
    var token: String { get set }
    func refresh(force: Bool) -> Bool
}
"#,
        );
        assert_eq!(source.imports, vec!["Foundation"]);
        assert_eq!(source.entities.len(), 1);

        let entity = &source.entities[0];
        assert_eq!(entity.name, "SessionManaging");
        assert_eq!(entity.kind, EntityKind::Protocol);
        assert!(entity.annotated);
        assert_eq!(entity.members.len(), 2);

        match &entity.members[0] {
            Member::Variable(v) => {
                assert_eq!(v.name, "token");
                assert_eq!(v.ty.rendered(), "String");
            }
            other => panic!("expected variable, got {other:?}"),
        }
        match &entity.members[1] {
            Member::Method(m) => {
                assert_eq!(m.name, "refresh");
                assert_eq!(m.params.len(), 1);
                assert_eq!(m.params[0].name, "force");
                assert_eq!(m.params[0].ty.rendered(), "Bool");
                assert_eq!(m.return_type.as_ref().unwrap().rendered(), "Bool");
            }
            other => panic!("expected method, got {other:?}"),
        }
    }

    #[test]
    fn unannotated_declarations_are_kept_but_not_flagged() {
        let source = parse("protocol Plain { func run() }\n");
        assert_eq!(source.entities.len(), 1);
        assert!(!source.entities[0].annotated);
    }

    #[test]
    fn extracts_generic_parameters_in_order() {
        let source = parse(
            r#"
/// @mockable
class Store<Key, Value> {
    func insert(key: Key, value: Value) {}
}
"#,
        );
        let entity = &source.entities[0];
        let names: Vec<&str> = entity.generic_params.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Key", "Value"]);
    }

    #[test]
    fn nested_declarations_carry_the_enclosing_type_path() {
        let source = parse(
            r#"
/// @mockable
class Outer {
    /// @mockable
    class Inner {
        func ping() {}
    }
}
"#,
        );
        let names: Vec<&str> = source.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Outer.Inner"]);
    }

    #[test]
    fn extension_preserves_parent_type_linkage() {
        let source = parse(
            r#"
extension SessionManaging {
    func invalidate() {}
}
"#,
        );
        assert_eq!(source.entities.len(), 1);
        let entity = &source.entities[0];
        assert_eq!(entity.kind, EntityKind::Extension);
        assert_eq!(entity.name, "SessionManaging");
        assert_eq!(entity.members.len(), 1);
    }

    #[test]
    fn closure_parameters_are_typed_as_closures() {
        let source = parse(
            r#"
/// @mockable
protocol Fetching {
    func fetch(id: Int, completion: @escaping (Result<Data, Error>) -> Void)
}
"#,
        );
        let Member::Method(m) = &source.entities[0].members[0] else {
            panic!("expected method");
        };
        assert!(!m.params[0].ty.is_closure());
        assert!(m.params[1].ty.is_closure());
        assert_eq!(m.history.capturable_names(), &["id"]);
    }

    #[test]
    fn parse_failure_reports_location() {
        let matcher = AnnotationMatcher::new("@mockable");
        let mut parser = SyntaxTreeParser::new().unwrap();
        let err = parser
            .parse_source("protocol {{{", Path::new("Broken.swift"), &matcher)
            .unwrap_err();
        match err {
            GenerateError::Parse { path, reason } => {
                assert_eq!(path, Path::new("Broken.swift"));
                assert!(reason.contains("syntax error"));
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn reparsing_unchanged_source_is_deterministic() {
        let code = r#"
/// @mockable
protocol Repeating {
    var count: Int { get }
    func tick(by amount: Int) throws -> Int
}
"#;
        let a = parse(code);
        let b = parse(code);
        assert_eq!(a.entities, b.entities);
        assert_eq!(a.imports, b.imports);
    }
}
