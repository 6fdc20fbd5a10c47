//! Member models: variables, methods, parameters, generic parameters.
//!
//! These are the typed representations the visitor produces and the renderer
//! consumes. Structural identity for merge purposes is the `signature()`
//! text, so two declarations that render identically are interchangeable.

use crate::model::SwiftType;
use crate::model::history::ArgumentsHistory;

/// A property requirement or stored property.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: SwiftType,
    /// Byte offset of the declaration in its file.
    pub offset: usize,
    /// Attribute names from the declaration's modifier list (`available`, ...).
    pub attributes: Vec<String>,
}

impl Variable {
    pub fn signature(&self) -> String {
        format!("var {}: {}", self.name, self.ty.rendered())
    }

    pub fn is_excluded(&self) -> bool {
        self.attributes.iter().any(|a| a.contains("unavailable"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Initializer,
}

/// A function or initializer requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub kind: MethodKind,
    pub params: Vec<Parameter>,
    pub generic_params: Vec<GenericParam>,
    pub return_type: Option<SwiftType>,
    pub throws: bool,
    pub offset: usize,
    pub attributes: Vec<String>,
    /// Built once, immediately after the parameter list is visited.
    pub history: ArgumentsHistory,
}

impl Method {
    /// Construct a method; the arguments-history helper is derived from the
    /// final parameter list here and never mutated afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        kind: MethodKind,
        params: Vec<Parameter>,
        generic_params: Vec<GenericParam>,
        return_type: Option<SwiftType>,
        throws: bool,
        offset: usize,
        history_annotated: bool,
    ) -> Self {
        let history = ArgumentsHistory::new(&params, history_annotated);
        Self {
            name: name.into(),
            kind,
            params,
            generic_params,
            return_type,
            throws,
            offset,
            attributes: Vec::new(),
            history,
        }
    }

    pub fn signature(&self) -> String {
        let mut sig = String::new();
        match self.kind {
            MethodKind::Instance => {
                sig.push_str("func ");
                sig.push_str(&self.name);
            }
            MethodKind::Initializer => sig.push_str("init"),
        }
        if !self.generic_params.is_empty() {
            sig.push('<');
            let list: Vec<String> = self.generic_params.iter().map(|g| g.declaration()).collect();
            sig.push_str(&list.join(", "));
            sig.push('>');
        }
        sig.push('(');
        let params: Vec<String> = self.params.iter().map(|p| p.declaration()).collect();
        sig.push_str(&params.join(", "));
        sig.push(')');
        if self.throws {
            sig.push_str(" throws");
        }
        if let Some(ret) = &self.return_type {
            if !ret.is_void() {
                sig.push_str(" -> ");
                sig.push_str(ret.rendered());
            }
        }
        sig
    }

    pub fn is_excluded(&self) -> bool {
        self.attributes.iter().any(|a| a.contains("unavailable"))
    }
}

/// One function parameter with its label, internal name, type, and default.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// External label; `_` when explicitly unlabeled.
    pub label: Option<String>,
    pub name: String,
    pub ty: SwiftType,
    pub default_value: Option<String>,
    pub variadic: bool,
}

impl Parameter {
    pub fn new(label: Option<String>, name: impl Into<String>, ty: SwiftType) -> Self {
        Self {
            label,
            name: name.into(),
            ty,
            default_value: None,
            variadic: false,
        }
    }

    /// Render as it appears in a function declaration.
    pub fn declaration(&self) -> String {
        let mut out = String::new();
        if let Some(label) = &self.label {
            if label != &self.name {
                out.push_str(label);
                out.push(' ');
            }
        }
        out.push_str(&self.name);
        out.push_str(": ");
        out.push_str(self.ty.rendered());
        if self.variadic {
            out.push_str("...");
        }
        if let Some(default) = &self.default_value {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

/// A generic parameter with an optional constraint, order-preserving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParam {
    pub name: String,
    pub constraint: Option<String>,
}

impl GenericParam {
    pub fn new(name: impl Into<String>, constraint: Option<String>) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    /// `T: Equatable` or plain `T`.
    pub fn declaration(&self) -> String {
        match &self.constraint {
            Some(c) => format!("{}: {}", self.name, c),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, ty: &str) -> Parameter {
        Parameter::new(None, name, SwiftType::new(ty))
    }

    #[test]
    fn method_signature_includes_generics_and_throws() {
        let m = Method::new(
            "fetch",
            MethodKind::Instance,
            vec![param("id", "Int")],
            vec![GenericParam::new("T", Some("Decodable".into()))],
            Some(SwiftType::new("T")),
            true,
            0,
            false,
        );
        assert_eq!(m.signature(), "func fetch<T: Decodable>(id: Int) throws -> T");
    }

    #[test]
    fn initializer_signature() {
        let m = Method::new(
            "init",
            MethodKind::Initializer,
            vec![param("count", "Int")],
            Vec::new(),
            None,
            false,
            0,
            false,
        );
        assert_eq!(m.signature(), "init(count: Int)");
    }

    #[test]
    fn parameter_declaration_with_label_and_default() {
        let mut p = Parameter::new(Some("for".into()), "user", SwiftType::new("String"));
        p.default_value = Some("\"\"".into());
        assert_eq!(p.declaration(), "for user: String = \"\"");
    }
}
