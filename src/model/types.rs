//! Swift type model.
//!
//! A `SwiftType` carries the rendered type text plus the structure the
//! renderer needs: closure-ness, optionality, generic arguments, and a
//! default-value expression for the foundation allow-list. Two types are
//! interchangeable for generation when their rendered signatures are
//! textually identical, so equality is defined over the normalized text.

/// Parameter attributes that never appear in stored handler/history types.
const TYPE_ATTRIBUTES: &[&str] = &["@escaping", "@autoclosure", "@Sendable", "inout"];

/// A Swift type as it appeared in source, normalized for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwiftType {
    text: String,
}

impl SwiftType {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: normalize(text.as_ref()),
        }
    }

    /// The rendered signature text.
    pub fn rendered(&self) -> &str {
        &self.text
    }

    /// Type text with parameter attributes stripped, suitable for storage
    /// positions (handler fields, history element tuples).
    pub fn storable(&self) -> SwiftType {
        let mut out = self.text.clone();
        for attr in TYPE_ATTRIBUTES {
            if let Some(stripped) = out.strip_prefix(&format!("{attr} ")) {
                out = stripped.to_string();
            }
        }
        SwiftType { text: out }
    }

    /// Leading identifier before any generic arguments or optional marker.
    pub fn base_name(&self) -> String {
        let inner = self.unwrapped();
        let end = inner
            .find(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
            .unwrap_or(inner.len());
        inner[..end].to_string()
    }

    /// True for function types, including optional and parenthesized forms
    /// like `((Int) -> Void)?`, the sugar-free `Optional<(Int) -> Void>`,
    /// and attributed forms like `@escaping () -> ()`.
    pub fn is_closure(&self) -> bool {
        let mut inner = strip_wrapping(&self.storable().text);
        while let Some(rest) = inner
            .strip_prefix("Optional<")
            .and_then(|r| r.strip_suffix('>'))
        {
            inner = strip_wrapping(rest.trim());
        }
        has_top_level_arrow(&inner)
    }

    pub fn is_optional(&self) -> bool {
        let t = &self.storable().text;
        if t.starts_with("Optional<") {
            return true;
        }
        // A trailing `?` after a top-level arrow binds to the closure's
        // result type, not the whole type: `() -> Int?` is not optional.
        if has_top_level_arrow(t) {
            return false;
        }
        t.ends_with('?') || t.ends_with('!')
    }

    pub fn is_void(&self) -> bool {
        matches!(self.storable().text.as_str(), "Void" | "()" | "(Void)")
    }

    /// Top-level generic arguments, e.g. `Dictionary<String, Int>` yields
    /// `["String", "Int"]`.
    pub fn generic_args(&self) -> Vec<SwiftType> {
        let inner = self.unwrapped();
        let Some(open) = inner.find('<') else {
            return Vec::new();
        };
        if !inner.ends_with('>') {
            return Vec::new();
        }
        split_top_level(&inner[open + 1..inner.len() - 1])
            .into_iter()
            .map(SwiftType::new)
            .collect()
    }

    /// Default expression for allow-listed foundation types. `None` means the
    /// renderer must fall back to `fatalError` (or a force-unwrapped store).
    pub fn default_value_expr(&self) -> Option<String> {
        let t = self.storable();
        // Only an optional closure has a default; a bare function type with
        // an optional result (`() -> Int?`) must not collapse to `nil`.
        if t.is_closure() && !t.is_optional() {
            return None;
        }
        if t.is_optional() {
            return Some("nil".to_string());
        }
        if t.is_void() {
            return Some("()".to_string());
        }
        let text = t.text.as_str();
        if text.starts_with('[') && text.ends_with(']') {
            // Array or dictionary literal form.
            return if split_top_level(&text[1..text.len() - 1])
                .iter()
                .any(|part| has_top_level_colon(part))
            {
                Some("[:]".to_string())
            } else {
                Some("[]".to_string())
            };
        }
        match t.base_name().as_str() {
            "Int" | "Int8" | "Int16" | "Int32" | "Int64" | "UInt" | "UInt8" | "UInt16"
            | "UInt32" | "UInt64" => Some("0".to_string()),
            "Float" | "Double" | "CGFloat" | "TimeInterval" => Some("0.0".to_string()),
            "Bool" => Some("false".to_string()),
            "String" => Some("\"\"".to_string()),
            "Character" => Some("\" \"".to_string()),
            "Array" | "Set" => Some("[]".to_string()),
            "Dictionary" => Some("[:]".to_string()),
            _ => None,
        }
    }

    fn unwrapped(&self) -> String {
        let mut inner = strip_wrapping(&self.storable().text);
        while inner.ends_with('?') || inner.ends_with('!') {
            inner.pop();
            inner = strip_wrapping(&inner);
        }
        inner
    }
}

impl std::fmt::Display for SwiftType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Collapse whitespace runs so `Dictionary<String,  Int>` and
/// `Dictionary<String, Int>` compare equal.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out
}

/// Remove a redundant outer paren pair, plus trailing optional markers on the
/// pair: `((Int) -> Void)?` becomes `(Int) -> Void`.
fn strip_wrapping(text: &str) -> String {
    let mut t = text.trim().to_string();
    loop {
        let candidate = t.strip_suffix('?').or_else(|| t.strip_suffix('!')).unwrap_or(&t);
        if !candidate.starts_with('(') || !candidate.ends_with(')') {
            return t;
        }
        // Only strip when the opening paren matches the final one.
        let mut depth = 0usize;
        let mut matched_at_end = false;
        for (i, c) in candidate.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        matched_at_end = i == candidate.len() - 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        if !matched_at_end {
            return t;
        }
        let inner = candidate[1..candidate.len() - 1].trim().to_string();
        if inner.is_empty() {
            return t;
        }
        t = inner;
    }
}

fn has_top_level_arrow(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'<' => depth += 1,
            b')' | b']' | b'>' => {
                // `->` must not close a bracket.
                if i > 0 && bytes[i] == b'>' && bytes[i - 1] == b'-' {
                    if depth == 0 {
                        return true;
                    }
                } else {
                    depth -= 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

fn has_top_level_colon(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' | '>' => depth -= 1,
            ':' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Split on commas that sit outside any bracket nesting.
pub(crate) fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '<' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '>' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        parts.push(trimmed);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_detection() {
        assert!(SwiftType::new("(Int) -> Void").is_closure());
        assert!(SwiftType::new("((Int, String) -> Bool)?").is_closure());
        assert!(SwiftType::new("@escaping () -> ()").is_closure());
        assert!(SwiftType::new("Optional<(Int) -> Void>").is_closure());
        assert!(SwiftType::new("() -> Int?").is_closure());
        assert!(!SwiftType::new("Observable<Int>").is_closure());
        assert!(!SwiftType::new("Dictionary<String, (Int) -> Void>").is_closure());
    }

    #[test]
    fn optional_detection() {
        assert!(SwiftType::new("String?").is_optional());
        assert!(SwiftType::new("Optional<Int>").is_optional());
        assert!(SwiftType::new("Foo!").is_optional());
        assert!(!SwiftType::new("String").is_optional());
        // The `?` binds to the closure's result, not the function type.
        assert!(!SwiftType::new("() -> Int?").is_optional());
        assert!(SwiftType::new("((Int) -> Void)?").is_optional());
    }

    #[test]
    fn base_name_strips_generics_and_optionality() {
        assert_eq!(SwiftType::new("Observable<Int>?").base_name(), "Observable");
        assert_eq!(SwiftType::new("Swift.Int").base_name(), "Swift.Int");
        assert_eq!(SwiftType::new("[Int]").base_name(), "");
    }

    #[test]
    fn function_type_with_optional_result_has_no_default() {
        assert!(SwiftType::new("() -> Int?").default_value_expr().is_none());
        assert_eq!(
            SwiftType::new("((Int) -> Void)?").default_value_expr().unwrap(),
            "nil"
        );
    }

    #[test]
    fn default_values() {
        assert_eq!(SwiftType::new("Int").default_value_expr().unwrap(), "0");
        assert_eq!(SwiftType::new("String").default_value_expr().unwrap(), "\"\"");
        assert_eq!(SwiftType::new("Bool").default_value_expr().unwrap(), "false");
        assert_eq!(SwiftType::new("[Int]").default_value_expr().unwrap(), "[]");
        assert_eq!(
            SwiftType::new("[String: Int]").default_value_expr().unwrap(),
            "[:]"
        );
        assert_eq!(SwiftType::new("Foo?").default_value_expr().unwrap(), "nil");
        assert!(SwiftType::new("Observable<Int>").default_value_expr().is_none());
    }

    #[test]
    fn rendered_signature_equality() {
        // Interchangeable when rendered text matches, nominal origin aside.
        assert_eq!(
            SwiftType::new("Dictionary<String,  Int>"),
            SwiftType::new("Dictionary<String, Int>")
        );
        assert_ne!(SwiftType::new("Int"), SwiftType::new("Int?"));
    }

    #[test]
    fn generic_args_split() {
        let t = SwiftType::new("Dictionary<String, Array<Int>>");
        let args = t.generic_args();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].rendered(), "String");
        assert_eq!(args[1].rendered(), "Array<Int>");
    }

    #[test]
    fn storable_strips_attributes() {
        assert_eq!(
            SwiftType::new("@escaping (Int) -> Void").storable().rendered(),
            "(Int) -> Void"
        );
        assert_eq!(SwiftType::new("inout Int").storable().rendered(), "Int");
    }
}
