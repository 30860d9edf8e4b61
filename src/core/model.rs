//! Data model for the extracted project structures

use serde::{Deserialize, Serialize};

/// Directed, name-annotated module reference between two project files.
///
/// `from` imports `items` from `to`. One edge per source statement, so the
/// same file pair may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeEdge {
    pub from: String,
    pub to: String,
    pub items: Vec<String>,
}

/// Byte-offset extent of one function-like declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationSpan {
    pub name: String,
    pub filename: String,
    pub pos: usize,
    pub end: usize,
    pub args: Vec<String>,
}

/// Byte-offset extent of one call expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpan {
    pub name: String,
    pub filename: String,
    pub pos: usize,
    pub end: usize,
    pub args: Vec<String>,
}

/// Per-file extraction result, the `mapping` part of a file map response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMapping {
    pub includes: Vec<IncludeEdge>,
    pub function_declarations: Vec<DeclarationSpan>,
    pub function_calls: Vec<CallSpan>,
}

/// One entry of a `mapFile` response: a file plus its mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMap {
    pub filename: String,
    pub content: String,
    pub mapping: FileMapping,
}

/// All include edges across the enumerated file set at a point in time.
pub type ProjectMap = Vec<IncludeEdge>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicNodeKind {
    File,
    Code,
    Decl,
    Call,
}

/// Payload carried by `decl` and `call` nodes of the containment tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpanValue {
    Decl(DeclarationSpan),
    Call(CallSpan),
}

/// Node of the per-file containment tree.
///
/// The root is a `file` node spanning `[0, content_len)`. At every level the
/// children are sorted by `pos`, mutually non-overlapping, and together with
/// synthetic `code` fillers exactly partition the parent span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicNode {
    #[serde(rename = "type")]
    pub kind: LogicNodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<SpanValue>,
    pub pos: usize,
    pub end: usize,
    pub children: Vec<LogicNode>,
}

impl LogicNode {
    pub fn leaf(kind: LogicNodeKind, value: Option<SpanValue>, pos: usize, end: usize) -> Self {
        Self {
            kind,
            value,
            pos,
            end,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Change,
    Remove,
}

/// File-system change notification forwarded to session observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: String,
}
