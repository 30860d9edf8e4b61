//! Module include resolver
//!
//! Extracts module-reference statements (ES-module `import ... from` and
//! CommonJS `require(...)` bindings) from a parsed file, normalizes relative
//! specifiers into project-relative paths and completes extension-less or
//! index-style specifiers against the enumerated file set.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::core::model::IncludeEdge;
use crate::error::{MapError, Result};

/// Maximum syntax-tree recursion depth for any walk in this crate.
pub const MAX_WALK_DEPTH: usize = 128;

/// Ordered candidate suffixes tried when completing an extension-less
/// specifier. The first literal `path + suffix` match in the file set wins;
/// membership in this list is the whole acceptance rule.
const COMPLETION_SUFFIXES: &[&str] = &[
    ".js",
    ".ts",
    ".jsx",
    ".tsx",
    ".d.ts",
    "/index.js",
    "/index.ts",
    "/index.jsx",
    "/index.tsx",
];

/// One module-reference statement before path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInclude {
    /// Literal specifier from the statement, e.g. `./util` or `react`.
    pub specifier: String,
    /// Bound names introduced by the statement, in source order.
    pub items: Vec<String>,
}

/// Extract every module-reference statement from a parsed file.
///
/// Statements with an unparseable specifier or no extractable bound names
/// are skipped with a diagnostic; they never abort the file.
pub fn extract_includes(tree: &Tree, content: &str) -> Result<Vec<RawInclude>> {
    let mut includes = Vec::new();
    collect_includes(tree.root_node(), content, &mut includes, 0)?;
    Ok(includes)
}

/// Resolve a file's module references into include edges.
///
/// Non-relative specifiers do not participate in the graph. A completion
/// miss keeps the extension-less path; consumers must tolerate a `to` that
/// matches no enumerated file.
pub fn resolve_includes(
    filename: &str,
    tree: &Tree,
    content: &str,
    files: &HashSet<String>,
) -> Result<Vec<IncludeEdge>> {
    let raw = extract_includes(tree, content)?;
    Ok(resolve_raw_includes(filename, &raw, files))
}

/// Resolve already-extracted module references against a file set.
///
/// Pure in `(filename, includes, files)`, so callers may memoize the raw
/// references by content and re-resolve whenever the file set changes.
pub fn resolve_raw_includes(
    filename: &str,
    includes: &[RawInclude],
    files: &HashSet<String>,
) -> Vec<IncludeEdge> {
    includes
        .iter()
        .filter(|inc| inc.specifier.starts_with('.'))
        .map(|inc| {
            let normalized = resolve_relative(filename, &inc.specifier);
            let to = complete_module_path(&normalized, files).unwrap_or(normalized);
            IncludeEdge {
                from: filename.to_string(),
                to,
                items: inc.items.clone(),
            }
        })
        .collect()
}

/// Apply a relative specifier's `.`/`..`/name tokens against the importing
/// file's directory. Pure in `(from_file, specifier)`.
pub fn resolve_relative(from_file: &str, specifier: &str) -> String {
    let mut tokens: Vec<&str> = from_file.split('/').filter(|t| !t.is_empty()).collect();
    tokens.pop(); // drop the filename, keep its directory

    for token in specifier.split('/').filter(|t| !t.is_empty()) {
        match token {
            "." => {}
            ".." => {
                tokens.pop();
            }
            other => tokens.push(other),
        }
    }
    tokens.join("/")
}

/// Complete an extension-less resolved path against the project file set.
/// Returns `None` when the path already carries an extension or nothing
/// matches.
pub fn complete_module_path(path: &str, files: &HashSet<String>) -> Option<String> {
    if Path::new(path).extension().is_some() {
        return None; // already complete
    }
    for suffix in COMPLETION_SUFFIXES {
        let candidate = format!("{}{}", path, suffix);
        if files.contains(&candidate) {
            debug!("completed module path {} -> {}", path, candidate);
            return Some(candidate);
        }
    }
    debug!("could not complete module path {}", path);
    None
}

fn collect_includes(
    node: Node,
    content: &str,
    out: &mut Vec<RawInclude>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_WALK_DEPTH {
        return Err(MapError::TraversalLimit(MAX_WALK_DEPTH));
    }

    match node.kind() {
        "import_statement" => {
            match import_include(node, content) {
                Ok(Some(inc)) => out.push(inc),
                Ok(None) => debug!("import with no bound names dropped"),
                Err(e) => debug!("skipping import statement: {}", e),
            }
            return Ok(());
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                match require_include(declarator, content) {
                    Ok(Some(inc)) => out.push(inc),
                    Ok(None) => {}
                    Err(e) => debug!("skipping require binding: {}", e),
                }
            }
            // fall through: an initializer may itself contain declarations
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_includes(child, content, out, depth + 1)?;
    }
    Ok(())
}

/// `import d from 's'` / `import * as ns from 's'` / `import { a, b as c } from 's'`
fn import_include(node: Node, content: &str) -> Result<Option<RawInclude>> {
    let source = node
        .child_by_field_name("source")
        .ok_or_else(|| MapError::Resolution("import without source".to_string()))?;
    let specifier = unquote(node_text(source, content))?;

    let mut items = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "import_clause" {
            collect_import_bindings(child, content, &mut items);
        }
    }

    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(RawInclude { specifier, items }))
}

fn collect_import_bindings(clause: Node, content: &str, items: &mut Vec<String>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            // default import binding
            "identifier" => items.push(node_text(child, content).to_string()),
            "namespace_import" => {
                let mut ns_cursor = child.walk();
                for ns_child in child.named_children(&mut ns_cursor) {
                    if ns_child.kind() == "identifier" {
                        items.push(node_text(ns_child, content).to_string());
                    }
                }
            }
            "named_imports" => {
                let mut named_cursor = child.walk();
                for spec in child.named_children(&mut named_cursor) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    // the local binding is the alias when one is present
                    let bound = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(bound) = bound {
                        items.push(node_text(bound, content).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

/// `const x = require('s')` / `const { a, b } = require('s')`
fn require_include(declarator: Node, content: &str) -> Result<Option<RawInclude>> {
    let Some(value) = declarator.child_by_field_name("value") else {
        return Ok(None);
    };
    if value.kind() != "call_expression" {
        return Ok(None);
    }
    let Some(callee) = value.child_by_field_name("function") else {
        return Ok(None);
    };
    if callee.kind() != "identifier" || node_text(callee, content) != "require" {
        return Ok(None);
    }

    let args = value
        .child_by_field_name("arguments")
        .ok_or_else(|| MapError::Resolution("require without arguments".to_string()))?;
    let mut cursor = args.walk();
    let source = args
        .named_children(&mut cursor)
        .find(|a| a.kind() == "string")
        .ok_or_else(|| MapError::Resolution("require with non-literal specifier".to_string()))?;
    let specifier = unquote(node_text(source, content))?;

    let mut items = Vec::new();
    if let Some(name) = declarator.child_by_field_name("name") {
        collect_pattern_bindings(name, content, &mut items);
    }

    if items.is_empty() {
        debug!("require with no bound names dropped");
        return Ok(None);
    }
    Ok(Some(RawInclude { specifier, items }))
}

fn collect_pattern_bindings(node: Node, content: &str, items: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            items.push(node_text(node, content).to_string());
        }
        "object_pattern" | "array_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_pattern_bindings(child, content, items);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                collect_pattern_bindings(value, content, items);
            }
        }
        _ => {}
    }
}

fn unquote(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 {
        let first = trimmed.chars().next().unwrap_or_default();
        if (first == '"' || first == '\'' || first == '`') && trimmed.ends_with(first) {
            return Ok(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    Err(MapError::Resolution(format!(
        "malformed specifier literal: {}",
        raw
    )))
}

fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    &content[node.byte_range()]
}
