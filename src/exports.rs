//! Exported-function scanning.
//!
//! Determines which top-level bindings in a TypeScript file are exported
//! functions. Exported values are frequently factory-wrapped async handlers
//! rather than raw function literals, so call-expression initializers are
//! accepted when the callee matches a known handler-factory shape. Exported
//! resource-construct instances must not be mistaken for invocable functions,
//! hence the conservative default and the namespace rejection heuristic.

use crate::parser::ParsedFile;

/// Bare-identifier callees accepted as handler factories.
const FACTORY_ALLOW: &[&str] = &[
    "handle",
    "middleware",
    "withMiddleware",
    "createHandler",
    "wrap",
    "createAWSHandler",
];

/// Property names accepted for property-access factory calls.
const FACTORY_PROP_ALLOW: &[&str] = &["handle", "handler", "create", "build", "configure"];

/// Extract the exported function names from a parsed file.
///
/// Returns names deduplicated in insertion (document) order. Only top-level
/// export statements are considered.
pub fn exported_names(parsed: &ParsedFile) -> Vec<String> {
    let root = parsed.tree.root_node();
    let mut names = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let mut push = |names: &mut Vec<String>, name: String| {
        if seen.insert(name.clone()) {
            names.push(name);
        }
    };

    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }

        // export default <expr>;
        if stmt.child_by_field_name("value").is_some() {
            push(&mut names, "default".to_string());
            continue;
        }

        if let Some(decl) = stmt.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    match decl.child_by_field_name("name") {
                        Some(name) => push(&mut names, parsed.node_text(name).to_string()),
                        None => push(&mut names, "default".to_string()),
                    }
                }
                "lexical_declaration" => {
                    let mut decl_cursor = decl.walk();
                    for declarator in decl.named_children(&mut decl_cursor) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let name = match declarator.child_by_field_name("name") {
                            Some(n) if n.kind() == "identifier" => n,
                            _ => continue,
                        };
                        let value = match declarator.child_by_field_name("value") {
                            Some(v) => v,
                            None => continue,
                        };
                        if is_function_valued(parsed, value) {
                            push(&mut names, parsed.node_text(name).to_string());
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        // export { a, b as c } clauses
        let mut clause_cursor = stmt.walk();
        for child in stmt.named_children(&mut clause_cursor) {
            if child.kind() != "export_clause" {
                continue;
            }
            let mut spec_cursor = child.walk();
            for spec in child.named_children(&mut spec_cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                // The exported name is the alias when present.
                let exported = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"));
                if let Some(n) = exported {
                    push(&mut names, parsed.node_text(n).to_string());
                }
            }
        }
    }

    names
}

/// Judge whether an initializer expression is function-valued.
fn is_function_valued(parsed: &ParsedFile, expr: tree_sitter::Node) -> bool {
    match expr.kind() {
        "arrow_function" | "function_expression" | "generator_function" => true,
        // One level of await over a factory call is common:
        // `export const handler = await createHandler(...)`
        "await_expression" => match expr.named_child(0) {
            Some(inner) if inner.kind() == "call_expression" => {
                is_allowed_factory_call(parsed, inner)
            }
            _ => false,
        },
        "call_expression" => is_allowed_factory_call(parsed, expr),
        // Construct instances and conditional values are never treated as
        // invocable handlers.
        "new_expression" | "ternary_expression" => false,
        _ => false,
    }
}

/// Check whether a call expression's callee matches the factory allow-lists.
fn is_allowed_factory_call(parsed: &ParsedFile, call: tree_sitter::Node) -> bool {
    let callee = match call.child_by_field_name("function") {
        Some(c) => c,
        None => return false,
    };

    match callee.kind() {
        "identifier" => FACTORY_ALLOW.contains(&parsed.node_text(callee)),
        "member_expression" => {
            let prop = match callee.child_by_field_name("property") {
                Some(p) => parsed.node_text(p),
                None => return false,
            };
            if !FACTORY_PROP_ALLOW.contains(&prop) {
                return false;
            }
            let object_text = callee
                .child_by_field_name("object")
                .map(|o| parsed.node_text(o).to_string())
                .unwrap_or_default();
            // Reject construct-namespace receivers and `.get(...)` chains.
            !(object_text.contains("sst.") || object_text.contains(".get("))
        }
        _ => false,
    }
}
