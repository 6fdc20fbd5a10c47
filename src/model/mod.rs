//! Semantic models for parsed Swift declarations.
//!
//! An `Entity` is one declaration extracted from one source location, with
//! its members resolved into typed `Variable`/`Method` models. Identity for
//! deduplication is `(name, kind)`; path and offset are tie-breakers only.

pub mod history;
pub mod member;
pub mod types;

pub use history::ArgumentsHistory;
pub use member::{GenericParam, Method, MethodKind, Parameter, Variable};
pub use types::SwiftType;

use std::path::PathBuf;

/// Suffix appended to the original type name for the generated mock.
pub const MOCK_SUFFIX: &str = "Mock";
/// Suffix for per-method invocation counters.
pub const CALL_COUNT_SUFFIX: &str = "CallCount";
/// Suffix for per-property setter counters.
pub const SET_CALL_COUNT_SUFFIX: &str = "SetCallCount";
/// Suffix for stub closures.
pub const HANDLER_SUFFIX: &str = "Handler";
/// Suffix for argument-history capture lists.
pub const ARGS_HISTORY_SUFFIX: &str = "ArgValues";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Protocol,
    Class,
    Struct,
    Extension,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Protocol => "protocol",
            EntityKind::Class => "class",
            EntityKind::Struct => "struct",
            EntityKind::Extension => "extension",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Variable(Variable),
    Method(Method),
}

impl Member {
    /// Rendered signature used for structural identity during merge.
    pub fn signature(&self) -> String {
        match self {
            Member::Variable(v) => v.signature(),
            Member::Method(m) => m.signature(),
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Member::Variable(v) => v.offset,
            Member::Method(m) => m.offset,
        }
    }

    pub fn is_excluded(&self) -> bool {
        match self {
            Member::Variable(v) => v.is_excluded(),
            Member::Method(m) => m.is_excluded(),
        }
    }
}

/// One parsed declaration with members and metadata.
///
/// Entities are created per file during parsing, may be superseded by a
/// merged canonical entity, and are terminal once handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
    pub members: Vec<Member>,
    pub generic_params: Vec<GenericParam>,
    pub inherited: Vec<String>,
    pub path: PathBuf,
    /// Byte offset and length of the declaration in its file.
    pub offset: usize,
    pub len: usize,
    /// Declaration carries the mock-generation annotation.
    pub annotated: bool,
    /// Declaration opted its methods into argument history.
    pub history_annotated: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            generic_params: Vec::new(),
            inherited: Vec::new(),
            path: PathBuf::new(),
            offset: 0,
            len: 0,
            annotated: false,
            history_annotated: false,
        }
    }

    /// Member signature list, used for structural duplicate detection.
    pub fn member_signatures(&self) -> Vec<String> {
        self.members.iter().map(|m| m.signature()).collect()
    }

    /// Structurally identical entities collapse to one during merge.
    pub fn structurally_equal(&self, other: &Entity) -> bool {
        let mut a = self.member_signatures();
        let mut b = other.member_signatures();
        a.sort();
        b.sort();
        a == b && self.generic_params == other.generic_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_member_order() {
        let var = Member::Variable(Variable {
            name: "name".into(),
            ty: SwiftType::new("String"),
            offset: 10,
            attributes: Vec::new(),
        });
        let method = Member::Method(Method::new(
            "run",
            MethodKind::Instance,
            Vec::new(),
            Vec::new(),
            None,
            false,
            20,
            false,
        ));

        let mut a = Entity::new("Foo", EntityKind::Class);
        a.members = vec![var.clone(), method.clone()];
        let mut b = Entity::new("Foo", EntityKind::Class);
        b.members = vec![method, var];
        b.path = PathBuf::from("elsewhere.swift");

        assert!(a.structurally_equal(&b));
    }
}
