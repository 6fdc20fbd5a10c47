//! Argument-history capture for mocked methods.
//!
//! Derived per method from its parameter list: non-closure parameters are
//! captured into an aggregate value appended on every mock invocation.
//! Closure-typed values cannot be captured, so they never appear here.

use crate::model::member::Parameter;
use crate::model::{ARGS_HISTORY_SUFFIX, SwiftType};

/// Synthetic rendering helper for per-invocation argument capture.
///
/// Built once right after a method's parameters are visited; immutable
/// afterwards. Never persisted outside its owning `Method`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentsHistory {
    capturable_names: Vec<String>,
    capturable_types: Vec<SwiftType>,
    annotated: bool,
}

impl ArgumentsHistory {
    pub fn new(params: &[Parameter], annotated: bool) -> Self {
        let capturables: Vec<&Parameter> =
            params.iter().filter(|p| !p.ty.is_closure()).collect();
        Self {
            capturable_names: capturables.iter().map(|p| p.name.clone()).collect(),
            capturable_types: capturables.iter().map(|p| p.ty.storable()).collect(),
            annotated,
        }
    }

    /// History renders iff forced globally or annotated per method, and the
    /// capturable set is non-empty.
    pub fn enabled(&self, force: bool) -> bool {
        (force || self.annotated) && !self.capturable_names.is_empty()
    }

    pub fn capturable_names(&self) -> &[String] {
        &self.capturable_names
    }

    /// Element type of the history list: the bare type for one capturable,
    /// a tuple for several.
    ///
    /// Like `append_statement`, calling this with zero capturable parameters
    /// is a generator defect and panics rather than emit `[()]()` storage.
    pub fn element_type(&self) -> String {
        match self.capturable_types.len() {
            0 => panic!("argument history rendered with no capturable parameters"),
            1 => self.capturable_types[0].rendered().to_string(),
            _ => {
                let list: Vec<&str> =
                    self.capturable_types.iter().map(|t| t.rendered()).collect();
                format!("({})", list.join(", "))
            }
        }
    }

    /// `var fooArgValues = [(Int, String)]()`
    pub fn storage_declaration(&self, identifier: &str) -> String {
        format!(
            "var {identifier}{ARGS_HISTORY_SUFFIX} = [{}]()",
            self.element_type()
        )
    }

    /// The append statement executed on each invocation.
    ///
    /// Calling this with zero capturable parameters is a generator defect,
    /// not a runtime input; it panics rather than emit malformed output.
    pub fn append_statement(&self, identifier: &str) -> String {
        match self.capturable_names.len() {
            0 => panic!("argument history rendered with no capturable parameters"),
            1 => format!(
                "{identifier}{ARGS_HISTORY_SUFFIX}.append({})",
                self.capturable_names[0]
            ),
            _ => format!(
                "{identifier}{ARGS_HISTORY_SUFFIX}.append(({}))",
                self.capturable_names.join(", ")
            ),
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
    fn closures_are_never_capturable() {
        let history = ArgumentsHistory::new(
            &[
                param("count", "Int"),
                param("done", "(Bool) -> Void"),
                param("name", "String"),
            ],
            false,
        );
        assert_eq!(history.capturable_names(), &["count", "name"]);
        assert_eq!(history.element_type(), "(Int, String)");
    }

    #[test]
    fn sugar_free_optional_closures_are_not_capturable() {
        let history = ArgumentsHistory::new(
            &[
                param("handler", "Optional<(Int) -> Void>"),
                param("id", "Int"),
            ],
            true,
        );
        assert_eq!(history.capturable_names(), &["id"]);
    }

    #[test]
    fn enablement_truth_table() {
        let with_params = ArgumentsHistory::new(&[param("x", "Int")], false);
        assert!(!with_params.enabled(false));
        assert!(with_params.enabled(true));

        let annotated = ArgumentsHistory::new(&[param("x", "Int")], true);
        assert!(annotated.enabled(false));

        let closures_only =
            ArgumentsHistory::new(&[param("done", "() -> Void")], true);
        assert!(!closures_only.enabled(false));
        assert!(!closures_only.enabled(true));
    }

    #[test]
    fn append_single_and_tuple() {
        let single = ArgumentsHistory::new(&[param("id", "Int")], true);
        assert_eq!(single.append_statement("fetch"), "fetchArgValues.append(id)");

        let pair = ArgumentsHistory::new(&[param("id", "Int"), param("name", "String")], true);
        assert_eq!(
            pair.append_statement("fetch"),
            "fetchArgValues.append((id, name))"
        );
    }

    #[test]
    #[should_panic(expected = "no capturable parameters")]
    fn empty_capture_list_is_a_defect() {
        let empty = ArgumentsHistory::new(&[param("done", "() -> Void")], true);
        let _ = empty.append_statement("fetch");
    }

    #[test]
    #[should_panic(expected = "no capturable parameters")]
    fn empty_capture_storage_is_a_defect() {
        let empty = ArgumentsHistory::new(&[param("done", "() -> Void")], true);
        let _ = empty.storage_declaration("fetch");
    }
}
