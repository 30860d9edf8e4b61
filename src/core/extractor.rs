//! Declaration and call-site extraction
//!
//! Walks a parsed file's tree and produces the flat sets of
//! function-declaration spans and call-expression spans, tagged with byte
//! offsets and argument lists. A malformed file degrades to an empty span
//! set at the caller; nothing here aborts a whole project pass.

use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::core::model::{CallSpan, DeclarationSpan};
use crate::core::resolver::MAX_WALK_DEPTH;
use crate::error::{MapError, Result};

/// Flat extraction result for one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSpans {
    pub declarations: Vec<DeclarationSpan>,
    pub calls: Vec<CallSpan>,
}

/// Extract all declaration and call spans from one parsed file.
pub fn extract_spans(filename: &str, tree: &Tree, content: &str) -> Result<FileSpans> {
    let mut extractor = SpanExtractor {
        filename,
        content,
        spans: FileSpans::default(),
    };
    extractor.walk(tree.root_node(), 0)?;

    extractor.spans.declarations.sort_by_key(|d| d.pos);
    extractor.spans.calls.sort_by_key(|c| c.pos);
    Ok(extractor.spans)
}

struct SpanExtractor<'a> {
    filename: &'a str,
    content: &'a str,
    spans: FileSpans,
}

impl<'a> SpanExtractor<'a> {
    fn walk(&mut self, node: Node, depth: usize) -> Result<()> {
        if depth > MAX_WALK_DEPTH {
            return Err(MapError::TraversalLimit(MAX_WALK_DEPTH));
        }

        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                self.collect_function(node);
            }
            "arrow_function" => self.collect_arrow(node),
            "method_definition" => self.collect_method(node),
            "call_expression" => self.collect_call(node),
            _ => {}
        }

        // Keep descending: nested declarations and calls inside bodies and
        // argument lists belong to the flat span set too.
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child, depth + 1)?;
        }
        Ok(())
    }

    /// `function name(a, b) { ... }`
    fn collect_function(&mut self, node: Node) {
        let Some(name) = node.child_by_field_name("name") else {
            debug!("function declaration without a name, skipped");
            return;
        };
        self.push_declaration(self.text(name), node, node);
    }

    /// Arrow functions count only when they directly initialize a named
    /// binding. The span widens to the whole statement when the binding is
    /// the sole declarator, otherwise it covers the arrow expression alone
    /// so sibling declarators are not falsely attributed.
    fn collect_arrow(&mut self, node: Node) {
        let Some(declarator) = node.parent().filter(|p| p.kind() == "variable_declarator") else {
            return; // inline arrow, usually an argument to a call
        };
        let name = match declarator.child_by_field_name("name") {
            Some(n) if n.kind() == "identifier" => self.text(n),
            _ => {
                debug!("arrow function bound to a pattern, skipped");
                return;
            }
        };

        let statement = declarator.parent().filter(|p| {
            matches!(p.kind(), "lexical_declaration" | "variable_declaration")
                && declarator_count(*p) == 1
        });
        let span_node = statement.unwrap_or(node);
        self.push_declaration(name, span_node, node);
    }

    /// Class method, name through closing brace.
    fn collect_method(&mut self, node: Node) {
        let Some(name) = node.child_by_field_name("name") else {
            debug!("method definition without a name, skipped");
            return;
        };
        self.push_declaration(self.text(name), node, node);
    }

    /// Call whose callee is a plain identifier or a simple property access.
    /// `super(...)` is the superclass-constructor primitive, not a call span.
    fn collect_call(&mut self, node: Node) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        let name = match callee.kind() {
            "identifier" => self.text(callee),
            "member_expression" => match callee.child_by_field_name("property") {
                Some(property) if property.kind() == "property_identifier" => self.text(property),
                _ => {
                    debug!("member call without a simple property name, skipped");
                    return;
                }
            },
            "super" => return,
            other => {
                debug!("unexpected call callee kind {}, skipped", other);
                return;
            }
        };

        let args = node
            .child_by_field_name("arguments")
            .map(|args| self.argument_texts(args))
            .unwrap_or_default();

        self.spans.calls.push(CallSpan {
            name: name.to_string(),
            filename: self.filename.to_string(),
            pos: node.start_byte(),
            end: node.end_byte(),
            args,
        });
    }

    /// `span_node` carries the recorded extent, `func_node` the parameters.
    fn push_declaration(&mut self, name: &str, span_node: Node, func_node: Node) {
        let args = func_node
            .child_by_field_name("parameters")
            .map(|params| self.parameter_names(params))
            .unwrap_or_else(|| {
                // single-identifier arrow parameter without parentheses
                func_node
                    .child_by_field_name("parameter")
                    .map(|p| vec![self.text(p).to_string()])
                    .unwrap_or_default()
            });

        self.spans.declarations.push(DeclarationSpan {
            name: name.to_string(),
            filename: self.filename.to_string(),
            pos: span_node.start_byte(),
            end: span_node.end_byte(),
            args,
        });
    }

    fn parameter_names(&self, params: Node) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if let Some(name) = self.parameter_name(param) {
                names.push(name);
            }
        }
        names
    }

    fn parameter_name(&self, param: Node) -> Option<String> {
        match param.kind() {
            "identifier" => Some(self.text(param).to_string()),
            // TypeScript wraps every parameter
            "required_parameter" | "optional_parameter" => param
                .child_by_field_name("pattern")
                .and_then(|p| self.parameter_name(p)),
            "assignment_pattern" => param
                .child_by_field_name("left")
                .and_then(|p| self.parameter_name(p)),
            "rest_pattern" => {
                let mut cursor = param.walk();
                let inner = param.named_children(&mut cursor).next()?;
                self.parameter_name(inner)
            }
            // destructured parameters keep their literal shape
            "object_pattern" | "array_pattern" => Some(self.text(param).to_string()),
            "this" => None,
            _ => {
                debug!("unrecognized parameter kind {}", param.kind());
                None
            }
        }
    }

    fn argument_texts(&self, args: Node) -> Vec<String> {
        let mut cursor = args.walk();
        args.named_children(&mut cursor)
            .map(|a| self.text(a).to_string())
            .collect()
    }

    fn text(&self, node: Node) -> &'a str {
        &self.content[node.byte_range()]
    }
}

fn declarator_count(statement: Node) -> usize {
    let mut cursor = statement.walk();
    statement
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "variable_declarator")
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::{parse_source, Dialect};

    fn extract(content: &str) -> FileSpans {
        let tree = parse_source(content, Dialect::Javascript).unwrap();
        extract_spans("test.js", &tree, content).unwrap()
    }

    #[test]
    fn named_function_declaration() {
        let content = "function gaga(a, b) { return a + b; }";
        let spans = extract(content);
        assert_eq!(spans.declarations.len(), 1);
        let decl = &spans.declarations[0];
        assert_eq!(decl.name, "gaga");
        assert_eq!(decl.pos, 0);
        assert_eq!(decl.end, content.len());
        assert_eq!(decl.args, vec!["a", "b"]);
    }

    #[test]
    fn leading_whitespace_is_not_part_of_the_span() {
        let content = "\n\n  function f() {}";
        let spans = extract(content);
        assert_eq!(spans.declarations[0].pos, 4);
    }

    #[test]
    fn sole_arrow_declaration_covers_the_statement() {
        let content = "const add = (a, b) => a + b;";
        let spans = extract(content);
        assert_eq!(spans.declarations.len(), 1);
        let decl = &spans.declarations[0];
        assert_eq!(decl.name, "add");
        assert_eq!(decl.pos, 0);
        assert_eq!(decl.end, content.len());
        assert_eq!(decl.args, vec!["a", "b"]);
    }

    #[test]
    fn sibling_arrow_declarators_keep_narrow_spans() {
        let content = "const a = () => 1, b = () => 2;";
        let spans = extract(content);
        assert_eq!(spans.declarations.len(), 2);
        let a = &spans.declarations[0];
        let b = &spans.declarations[1];
        assert_eq!(a.name, "a");
        assert_eq!(b.name, "b");
        // narrow spans: the arrow expressions themselves
        assert_eq!(&content[a.pos..a.end], "() => 1");
        assert_eq!(&content[b.pos..b.end], "() => 2");
    }

    #[test]
    fn inline_arrow_argument_is_not_a_declaration() {
        let content = "list.map((x) => x * 2);";
        let spans = extract(content);
        assert!(spans.declarations.is_empty());
        assert_eq!(spans.calls.len(), 1);
        assert_eq!(spans.calls[0].name, "map");
    }

    #[test]
    fn class_methods_are_declarations() {
        let content = "class A { run(x) { return x; } stop() {} }";
        let spans = extract(content);
        let names: Vec<_> = spans.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["run", "stop"]);
    }

    #[test]
    fn identifier_and_property_calls() {
        let content = "gaga(42); obj.method(1, 2);";
        let spans = extract(content);
        assert_eq!(spans.calls.len(), 2);
        assert_eq!(spans.calls[0].name, "gaga");
        assert_eq!(spans.calls[0].args, vec!["42"]);
        assert_eq!(spans.calls[1].name, "method");
        assert_eq!(spans.calls[1].args, vec!["1", "2"]);
    }

    #[test]
    fn super_calls_are_excluded() {
        let content = "class B extends A { constructor() { super(1); init(); } }";
        let spans = extract(content);
        let names: Vec<_> = spans.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["init"]);
    }

    #[test]
    fn nested_calls_are_all_collected() {
        let content = "outer(inner());";
        let spans = extract(content);
        let names: Vec<_> = spans.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }

    #[test]
    fn nested_function_declarations_are_collected() {
        let content = "function outer() { function inner() {} inner(); }";
        let spans = extract(content);
        let names: Vec<_> = spans.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }

    #[test]
    fn typescript_parameters() {
        let content = "function f(a: number, b?: string) {}";
        let tree = parse_source(content, Dialect::Typescript).unwrap();
        let spans = extract_spans("test.ts", &tree, content).unwrap();
        assert_eq!(spans.declarations[0].args, vec!["a", "b"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let content = "function f() { g(); } f();";
        assert_eq!(extract(content), extract(content));
    }
}
