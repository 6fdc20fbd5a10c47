//! Mock source rendering.
//!
//! Pure text generation: entity + configuration in, Swift source out. No I/O
//! happens here. The emitted shape follows the fixed suffix scheme: the mock
//! class is the original name plus `Mock`, per-method counters use
//! `CallCount`, stub closures use `Handler`, property setter counters use
//! `SetCallCount`, and argument capture lists use `ArgValues`.

use crate::config::GenerationConfig;
use crate::model::{
    CALL_COUNT_SUFFIX, Entity, EntityKind, HANDLER_SUFFIX, MOCK_SUFFIX, Member, Method,
    MethodKind, SET_CALL_COUNT_SUFFIX, SwiftType, Variable,
};
use std::collections::{BTreeSet, HashMap};

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "/// @Generated by mocksmith";

const INDENT: &str = "    ";

pub struct MockRenderer {
    use_template_func: bool,
    force_history: bool,
}

impl MockRenderer {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            use_template_func: config.use_template_func,
            force_history: config.enable_args_history,
        }
    }

    /// Render a complete output file: header, the union of source imports in
    /// sorted order, then one mock class per entity in the given order.
    pub fn render_file(&self, entities: &[Entity], imports: &BTreeSet<String>) -> String {
        let mut out = String::new();
        out.push_str(GENERATED_HEADER);
        out.push('\n');
        if !imports.is_empty() {
            out.push('\n');
            for import in imports {
                out.push_str("import ");
                out.push_str(import);
                out.push('\n');
            }
        }
        for entity in entities {
            out.push('\n');
            out.push_str(&self.render_entity(entity));
        }
        out
    }

    /// Render one mock class. Generic parameters on the entity repeat
    /// verbatim on the mock so the conformance typechecks.
    pub fn render_entity(&self, entity: &Entity) -> String {
        let is_class = entity.kind == EntityKind::Class;
        let mut out = String::new();

        out.push_str("class ");
        // Nested names like `Outer.Inner` flatten for the mock's own name;
        // the conformance keeps the qualified form.
        out.push_str(&mock_type_name(&entity.name));
        out.push_str(MOCK_SUFFIX);
        if !entity.generic_params.is_empty() {
            let list: Vec<String> = entity
                .generic_params
                .iter()
                .map(|g| g.declaration())
                .collect();
            out.push('<');
            out.push_str(&list.join(", "));
            out.push('>');
        }
        out.push_str(": ");
        out.push_str(&entity.name);
        if !entity.generic_params.is_empty() {
            let names: Vec<&str> = entity
                .generic_params
                .iter()
                .map(|g| g.name.as_str())
                .collect();
            out.push('<');
            out.push_str(&names.join(", "));
            out.push('>');
        }
        out.push_str(" {\n");

        let variables: Vec<&Variable> = entity
            .members
            .iter()
            .filter(|m| !m.is_excluded())
            .filter_map(|m| match m {
                Member::Variable(v) => Some(v),
                Member::Method(_) => None,
            })
            .collect();
        let methods: Vec<&Method> = entity
            .members
            .iter()
            .filter(|m| !m.is_excluded())
            .filter_map(|m| match m {
                Member::Method(m) => Some(m),
                Member::Variable(_) => None,
            })
            .collect();
        let initializers: Vec<&&Method> = methods
            .iter()
            .filter(|m| m.kind == MethodKind::Initializer)
            .collect();

        self.render_initializers(&mut out, &variables, &initializers, is_class);

        for variable in &variables {
            out.push('\n');
            self.render_variable(&mut out, variable, is_class);
        }

        let identifiers = method_identifiers(&methods);
        for method in methods
            .iter()
            .filter(|m| m.kind == MethodKind::Instance)
        {
            out.push('\n');
            self.render_method(&mut out, method, &identifiers[&method.signature()], is_class);
        }

        out.push_str("}\n");
        out
    }

    /// A plain no-arg init, plus either the declared initializer requirements
    /// or a seeding init assigning every stored property.
    fn render_initializers(
        &self,
        out: &mut String,
        variables: &[&Variable],
        initializers: &[&&Method],
        is_class: bool,
    ) {
        let has_noarg_requirement = initializers.iter().any(|m| m.params.is_empty());
        if !has_noarg_requirement {
            out.push_str(INDENT);
            if is_class {
                out.push_str("override ");
            }
            out.push_str("init() { }\n");
        }

        if initializers.is_empty() {
            if !variables.is_empty() {
                out.push_str(INDENT);
                out.push_str("init(");
                let params: Vec<String> = variables
                    .iter()
                    .map(|v| match seed_default(&v.ty) {
                        Some(d) => format!("{}: {} = {}", v.name, v.ty.rendered(), d),
                        None => format!("{}: {}", v.name, v.ty.rendered()),
                    })
                    .collect();
                out.push_str(&params.join(", "));
                out.push_str(") {\n");
                for v in variables {
                    out.push_str(INDENT);
                    out.push_str(INDENT);
                    if is_class {
                        out.push_str(&format!("self._{} = {}\n", v.name, v.name));
                    } else {
                        out.push_str(&format!("self.{} = {}\n", v.name, v.name));
                    }
                }
                out.push_str(INDENT);
                out.push_str("}\n");
            }
            return;
        }

        for init in initializers {
            out.push_str(INDENT);
            out.push_str("required init(");
            let params: Vec<String> = init.params.iter().map(|p| p.declaration()).collect();
            out.push_str(&params.join(", "));
            out.push_str(") {\n");
            for p in &init.params {
                if variables.iter().any(|v| v.name == p.name) {
                    out.push_str(INDENT);
                    out.push_str(INDENT);
                    if is_class {
                        out.push_str(&format!("self._{} = {}\n", p.name, p.name));
                    } else {
                        out.push_str(&format!("self.{} = {}\n", p.name, p.name));
                    }
                }
            }
            out.push_str(INDENT);
            out.push_str("}\n");
        }
    }

    /// Protocol conformances get a stored property with a `didSet` counter;
    /// class overrides need a computed property over a private store because
    /// stored properties cannot override.
    fn render_variable(&self, out: &mut String, variable: &Variable, is_class: bool) {
        let name = &variable.name;
        let ty = &variable.ty;
        out.push_str(INDENT);
        out.push_str(&format!(
            "private(set) var {name}{SET_CALL_COUNT_SUFFIX} = 0\n"
        ));

        if is_class {
            out.push_str(INDENT);
            match storage_initializer(ty) {
                Some(init) => out.push_str(&format!(
                    "private var _{name}: {}{init}\n",
                    ty.rendered()
                )),
                None => out.push_str(&format!(
                    "private var _{name}: {}!\n",
                    force_unwrap_base(ty)
                )),
            }
            out.push_str(INDENT);
            out.push_str(&format!("override var {name}: {} {{\n", ty.rendered()));
            out.push_str(INDENT);
            out.push_str(INDENT);
            out.push_str(&format!("get {{ return _{name} }}\n"));
            out.push_str(INDENT);
            out.push_str(INDENT);
            out.push_str(&format!(
                "set {{ _{name} = newValue; {name}{SET_CALL_COUNT_SUFFIX} += 1 }}\n"
            ));
            out.push_str(INDENT);
            out.push_str("}\n");
            return;
        }

        out.push_str(INDENT);
        match storage_initializer(ty) {
            Some(init) => out.push_str(&format!(
                "var {name}: {}{init} {{ didSet {{ {name}{SET_CALL_COUNT_SUFFIX} += 1 }} }}\n",
                ty.rendered()
            )),
            None => out.push_str(&format!(
                "var {name}: {}! {{ didSet {{ {name}{SET_CALL_COUNT_SUFFIX} += 1 }} }}\n",
                force_unwrap_base(ty)
            )),
        }
    }

    fn render_method(&self, out: &mut String, method: &Method, identifier: &str, is_class: bool) {
        let history_enabled = method.history.enabled(self.force_history);
        let generic = !method.generic_params.is_empty();
        let handler_rendered = !generic || self.use_template_func;

        out.push_str(INDENT);
        out.push_str(&format!(
            "private(set) var {identifier}{CALL_COUNT_SUFFIX} = 0\n"
        ));

        if history_enabled {
            out.push_str(INDENT);
            out.push_str(&method.history.storage_declaration(identifier));
            out.push('\n');
        }

        if handler_rendered {
            out.push_str(INDENT);
            out.push_str(&format!(
                "var {identifier}{HANDLER_SUFFIX}: ({})?\n",
                handler_type(method, generic)
            ));
        }

        out.push_str(INDENT);
        if is_class {
            out.push_str("override ");
        }
        out.push_str(&method.signature());
        out.push_str(" {\n");

        let body_indent = format!("{INDENT}{INDENT}");
        out.push_str(&body_indent);
        out.push_str(&format!("{identifier}{CALL_COUNT_SUFFIX} += 1\n"));

        if history_enabled {
            out.push_str(&body_indent);
            out.push_str(&method.history.append_statement(identifier));
            out.push('\n');
        }

        if handler_rendered {
            let args: Vec<String> = method.params.iter().map(|p| p.name.clone()).collect();
            let call = format!(
                "{}{identifier}{HANDLER_SUFFIX}({})",
                if method.throws { "try " } else { "" },
                args.join(", ")
            );
            out.push_str(&body_indent);
            out.push_str(&format!(
                "if let {identifier}{HANDLER_SUFFIX} = {identifier}{HANDLER_SUFFIX} {{\n"
            ));
            out.push_str(&body_indent);
            out.push_str(INDENT);
            match &method.return_type {
                Some(ret) if !ret.is_void() => {
                    if generic {
                        out.push_str(&format!("return {call} as! {}\n", ret.rendered()));
                    } else {
                        out.push_str(&format!("return {call}\n"));
                    }
                }
                _ => out.push_str(&format!("{call}\n")),
            }
            out.push_str(&body_indent);
            out.push_str("}\n");
        }

        match &method.return_type {
            Some(ret) if !ret.is_void() => {
                out.push_str(&body_indent);
                match ret.default_value_expr() {
                    Some(default) => out.push_str(&format!("return {default}\n")),
                    None if handler_rendered => out.push_str(&format!(
                        "fatalError(\"{identifier}{HANDLER_SUFFIX} returns can't have a default value thus its handler must be set\")\n"
                    )),
                    None => out.push_str(&format!(
                        "fatalError(\"{identifier} returns can't have a default value and has no handler\")\n"
                    )),
                }
            }
            _ => {}
        }

        out.push_str(INDENT);
        out.push_str("}\n");
    }
}

/// Base text for a force-unwrapped store. Function types need parens for
/// the `!` to parse: `(() -> Int)!`.
fn force_unwrap_base(ty: &SwiftType) -> String {
    if ty.is_closure() {
        format!("({})", ty.rendered())
    } else {
        ty.rendered().to_string()
    }
}

/// Flattened type name used for the mock class and its file name.
pub fn mock_type_name(name: &str) -> String {
    name.replace('.', "")
}

/// The stub closure's type. Parameter attributes are stripped for storage;
/// generic methods store `Any` in every position so one closure serves all
/// instantiations.
fn handler_type(method: &Method, generic: bool) -> String {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|p| {
            if generic {
                "Any".to_string()
            } else {
                let stored = p.ty.storable().rendered().to_string();
                if p.variadic { format!("[{stored}]") } else { stored }
            }
        })
        .collect();
    let ret = match &method.return_type {
        Some(r) if !r.is_void() => {
            if generic {
                "Any".to_string()
            } else {
                r.rendered().to_string()
            }
        }
        _ => "()".to_string(),
    };
    format!(
        "({}) {}-> {ret}",
        params.join(", "),
        if method.throws { "throws " } else { "" }
    )
}

/// ` = <literal>` for allow-listed types, empty for optionals (implicitly
/// nil), `None` when the store must be force-unwrapped.
fn storage_initializer(ty: &SwiftType) -> Option<String> {
    if ty.is_optional() {
        return Some(String::new());
    }
    ty.default_value_expr().map(|d| format!(" = {d}"))
}

/// Seeding-init parameter default: `nil` for optionals, the allow-list
/// literal otherwise, nothing when the type has no known default.
fn seed_default(ty: &SwiftType) -> Option<String> {
    ty.default_value_expr()
}

/// Helper identifiers per method. Overloads sharing a name get their
/// capitalized parameter names appended so counters and handlers stay unique.
fn method_identifiers(methods: &[&Method]) -> HashMap<String, String> {
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for m in methods {
        *name_counts.entry(m.name.as_str()).or_default() += 1;
    }
    let mut out = HashMap::new();
    for m in methods {
        let identifier = if name_counts[m.name.as_str()] > 1 {
            let mut id = m.name.clone();
            for p in &m.params {
                let part = p.label.as_deref().filter(|l| *l != "_").unwrap_or(&p.name);
                id.push_str(&capitalize(part));
            }
            id
        } else {
            m.name.clone()
        };
        out.insert(m.signature(), identifier);
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
