//! Handler-context extraction.
//!
//! Walks a parsed TypeScript file and recognizes the construct call-site
//! shapes that embed a handler path:
//!
//! 1. `new sst.aws.Function(name, { handler: <expr> })`
//! 2. `new sst.aws.Cron(name, { function: <expr> })`
//! 3. `<expr>.subscribe(<pathExpr>, ...)` - receiver unchecked
//! 4. `<expr>.notify(<string>)` or `.notify({ notifications: [{ function: <expr> }, ...] })`
//! 5. `<expr>.route(method, <pathExpr>)` - receiver unchecked
//!
//! Matching is done over the parse tree, never with textual regexes, so
//! occurrences inside comments or unrelated strings cannot false-positive.
//! Method-name-only matching for shapes 3-5 is a deliberate heuristic: cheap,
//! and requiring no type information.
//!
//! Path expressions are evaluated best-effort: string literals directly,
//! template literals by concatenating fragments and resolving interpolated
//! identifiers against same-file `const`/`let` string bindings. The constant
//! lookup is a single whole-file pass with no scoping, shadowing, or
//! control-flow sensitivity; the first matching declarator wins. Unresolvable
//! interpolations contribute an empty string; wholly unresolvable expressions
//! yield a context with `expected_path: None`.

use serde::{Deserialize, Serialize};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use crate::parser::{ParsedFile, Span};

/// Construct kinds that can embed a handler path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    #[serde(rename = "function")]
    Function,
    #[serde(rename = "cron")]
    Cron,
    #[serde(rename = "queue")]
    Queue,
    #[serde(rename = "bucket")]
    Bucket,
    #[serde(rename = "apigatewayv1")]
    ApiGatewayV1,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Function => "function",
            ContextKind::Cron => "cron",
            ContextKind::Queue => "queue",
            ContextKind::Bucket => "bucket",
            ContextKind::ApiGatewayV1 => "apigatewayv1",
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recognized handler-path occurrence at a construct call site.
///
/// Carries a byte-offset span and the matched expression's raw text instead
/// of a live parse-tree node, so it can cross component boundaries freely.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Which construct shape produced this context.
    pub kind: ContextKind,
    /// The resolved handler path, or `None` when the expression could not be
    /// evaluated statically. Callers skip validation/completion on `None`.
    pub expected_path: Option<String>,
    /// Span of the matched path expression.
    pub span: Span,
    /// Raw source text of the matched path expression.
    pub raw_text: String,
}

/// Candidate call sites: every `new` over a qualified name, and every call
/// whose method name is one of the recognized three. Structural checks on
/// each match do the rest.
const CALL_SITE_QUERY: &str = r#"
(new_expression
  constructor: (member_expression) @ctor) @new

(call_expression
  function: (member_expression
    property: (property_identifier) @method
    (#match? @method "^(subscribe|notify|route)$"))) @call
"#;

/// Whole-file lookup of `const`/`let` declarators with string initializers.
const STRING_CONST_QUERY: &str = r#"
(lexical_declaration
  (variable_declarator
    name: (identifier) @name
    value: (string) @value))
"#;

/// Extract all handler contexts from a parsed file, in document order.
pub fn extract_contexts(parsed: &ParsedFile) -> Vec<HandlerContext> {
    let language = crate::parser::language();
    let query = match Query::new(&language, CALL_SITE_QUERY) {
        Ok(q) => q,
        Err(_) => return Vec::new(),
    };

    let new_idx = query.capture_index_for_name("new");
    let ctor_idx = query.capture_index_for_name("ctor");
    let call_idx = query.capture_index_for_name("call");
    let method_idx = query.capture_index_for_name("method");

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

    let mut contexts = Vec::new();

    while let Some(m) = matches.next() {
        let node_for = |idx: Option<u32>| {
            idx.and_then(|i| {
                m.captures
                    .iter()
                    .find(|c| c.index == i)
                    .map(|c| c.node)
            })
        };

        if let (Some(new_node), Some(ctor)) = (node_for(new_idx), node_for(ctor_idx)) {
            if let Some(ctx) = match_construct_new(parsed, new_node, ctor) {
                contexts.push(ctx);
            }
        } else if let (Some(call_node), Some(method)) = (node_for(call_idx), node_for(method_idx)) {
            match_method_call(parsed, call_node, parsed.node_text(method), &mut contexts);
        }
    }

    // Query matches from different patterns can interleave; document order is
    // part of the contract.
    contexts.sort_by_key(|c| c.span.start_byte);
    contexts
}

/// Find the first context whose span contains the offset, boundary-inclusive.
pub fn context_at(offset: usize, contexts: &[HandlerContext]) -> Option<&HandlerContext> {
    contexts.iter().find(|c| c.span.contains_offset(offset))
}

/// Shapes 1-2: `new sst.aws.Function(...)` / `new sst.aws.Cron(...)`.
fn match_construct_new<'t>(
    parsed: &ParsedFile,
    new_node: Node<'t>,
    ctor: Node<'t>,
) -> Option<HandlerContext> {
    let parts = qualified_parts(parsed, ctor)?;
    let (kind, property) = match (parts[0], parts[1], parts[2]) {
        ("sst", "aws", "Function") => (ContextKind::Function, "handler"),
        ("sst", "aws", "Cron") => (ContextKind::Cron, "function"),
        _ => return None,
    };

    let args = new_node.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let options = args
        .named_children(&mut cursor)
        .nth(1)
        .filter(|n| n.kind() == "object")?;

    let value = object_property(parsed, options, property)?;
    Some(make_context(parsed, kind, value))
}

/// Shapes 3-5, dispatched on method name alone.
fn match_method_call(
    parsed: &ParsedFile,
    call_node: Node,
    method: &str,
    contexts: &mut Vec<HandlerContext>,
) {
    let args = match call_node.child_by_field_name("arguments") {
        Some(a) => a,
        None => return,
    };
    let mut cursor = args.walk();
    let arg_nodes: Vec<Node> = args.named_children(&mut cursor).collect();

    match method {
        "subscribe" => {
            if let Some(&first) = arg_nodes.first() {
                contexts.push(make_context(parsed, ContextKind::Queue, first));
            }
        }
        "route" => {
            // route(method, path); calls with fewer than 2 arguments carry
            // no handler path.
            if arg_nodes.len() >= 2 {
                contexts.push(make_context(parsed, ContextKind::ApiGatewayV1, arg_nodes[1]));
            }
        }
        "notify" => {
            let arg = match arg_nodes.first() {
                Some(&a) => a,
                None => return,
            };
            match arg.kind() {
                "string" | "template_string" => {
                    contexts.push(make_context(parsed, ContextKind::Bucket, arg));
                }
                "object" => {
                    let notifications = match object_property(parsed, arg, "notifications") {
                        Some(n) if n.kind() == "array" => n,
                        _ => return,
                    };
                    let mut arr_cursor = notifications.walk();
                    for element in notifications.named_children(&mut arr_cursor) {
                        if element.kind() != "object" {
                            continue;
                        }
                        // Elements without a `function` property are skipped.
                        if let Some(value) = object_property(parsed, element, "function") {
                            contexts.push(make_context(parsed, ContextKind::Bucket, value));
                        }
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
}

fn make_context(parsed: &ParsedFile, kind: ContextKind, node: Node) -> HandlerContext {
    HandlerContext {
        kind,
        expected_path: extract_string_value(parsed, node),
        span: Span::from_node(node),
        raw_text: parsed.node_text(node).to_string(),
    }
}

/// Decompose a 3-part qualified name like `sst.aws.Function`.
fn qualified_parts<'p>(parsed: &'p ParsedFile, ctor: Node) -> Option<[&'p str; 3]> {
    if ctor.kind() != "member_expression" {
        return None;
    }
    let outer_prop = ctor.child_by_field_name("property")?;
    let inner = ctor.child_by_field_name("object")?;
    if inner.kind() != "member_expression" {
        return None;
    }
    let inner_prop = inner.child_by_field_name("property")?;
    let base = inner.child_by_field_name("object")?;
    if base.kind() != "identifier" {
        return None;
    }
    Some([
        parsed.node_text(base),
        parsed.node_text(inner_prop),
        parsed.node_text(outer_prop),
    ])
}

/// Look up a property value in an object literal by key name.
fn object_property<'t>(parsed: &ParsedFile, object: Node<'t>, key: &str) -> Option<Node<'t>> {
    let mut cursor = object.walk();
    for pair in object.named_children(&mut cursor) {
        if pair.kind() != "pair" {
            continue;
        }
        let pair_key = match pair.child_by_field_name("key") {
            Some(k) => k,
            None => continue,
        };
        let key_text = match pair_key.kind() {
            "property_identifier" => parsed.node_text(pair_key).to_string(),
            "string" => string_literal_value(parsed, pair_key),
            _ => continue,
        };
        if key_text == key {
            return pair.child_by_field_name("value");
        }
    }
    None
}

/// Best-effort static evaluation of a path expression.
pub fn extract_string_value(parsed: &ParsedFile, node: Node) -> Option<String> {
    match node.kind() {
        "string" => Some(string_literal_value(parsed, node)),
        "template_string" => Some(evaluate_template(parsed, node)),
        "identifier" => lookup_string_constant(parsed, parsed.node_text(node)),
        _ => None,
    }
}

/// Evaluate a template literal, resolving interpolations where possible.
///
/// Unresolvable substitutions contribute an empty string rather than failing
/// the whole template.
fn evaluate_template(parsed: &ParsedFile, template: Node) -> String {
    let mut out = String::new();
    let mut cursor = template.walk();
    for child in template.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" => out.push_str(parsed.node_text(child)),
            "escape_sequence" => out.push_str(&decode_escape(parsed.node_text(child))),
            "template_substitution" => {
                let resolved = child
                    .named_child(0)
                    .and_then(|expr| resolve_interpolation(parsed, expr));
                if let Some(value) = resolved {
                    out.push_str(&value);
                }
            }
            _ => {}
        }
    }
    out
}

/// Resolve an expression embedded in a template substitution.
///
/// Only string literals and identifiers bound to same-file string constants
/// are attempted; property accesses, calls, and everything else stay
/// unresolved.
fn resolve_interpolation(parsed: &ParsedFile, expr: Node) -> Option<String> {
    match expr.kind() {
        "string" => Some(string_literal_value(parsed, expr)),
        "identifier" => lookup_string_constant(parsed, parsed.node_text(expr)),
        _ => None,
    }
}

/// Find the first `const`/`let` declarator binding `name` to a string
/// literal, anywhere in the file (including under `export`).
fn lookup_string_constant(parsed: &ParsedFile, name: &str) -> Option<String> {
    let language = crate::parser::language();
    let query = Query::new(&language, STRING_CONST_QUERY).ok()?;
    let name_idx = query.capture_index_for_name("name")?;
    let value_idx = query.capture_index_for_name("value")?;

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

    while let Some(m) = matches.next() {
        let decl_name = m
            .captures
            .iter()
            .find(|c| c.index == name_idx)
            .map(|c| parsed.node_text(c.node));
        if decl_name != Some(name) {
            continue;
        }
        if let Some(value) = m.captures.iter().find(|c| c.index == value_idx) {
            return Some(string_literal_value(parsed, value.node));
        }
    }
    None
}

/// The literal value of a string node.
///
/// Reads the fragment children so only the delimiter pair is dropped; quote
/// characters inside the literal survive, and escape sequences decode to
/// their character values.
fn string_literal_value(parsed: &ParsedFile, node: Node) -> String {
    let mut out = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" => out.push_str(parsed.node_text(child)),
            "escape_sequence" => out.push_str(&decode_escape(parsed.node_text(child))),
            _ => {}
        }
    }
    out
}

/// Decode one JavaScript escape sequence.
///
/// Malformed hex and unicode forms fall back to the raw source text.
fn decode_escape(text: &str) -> String {
    let body = match text.strip_prefix('\\') {
        Some(rest) => rest,
        None => return text.to_string(),
    };
    let mut chars = body.chars();
    let decoded = match chars.next() {
        Some('n') => Some('\n'),
        Some('t') => Some('\t'),
        Some('r') => Some('\r'),
        Some('b') => Some('\u{8}'),
        Some('f') => Some('\u{c}'),
        Some('v') => Some('\u{b}'),
        Some('0') if chars.as_str().is_empty() => Some('\0'),
        Some('x') => u32::from_str_radix(chars.as_str(), 16)
            .ok()
            .and_then(char::from_u32),
        Some('u') => {
            let hex = chars.as_str();
            let hex = hex
                .strip_prefix('{')
                .and_then(|h| h.strip_suffix('}'))
                .unwrap_or(hex);
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        }
        // Identity escapes: \' \" \\ \` and anything else single-char.
        Some(other) if chars.as_str().is_empty() => Some(other),
        _ => None,
    };
    match decoded {
        Some(c) => c.to_string(),
        None => text.to_string(),
    }
}
