//! Containment tree builder
//!
//! Assembles the flat union of declaration and call spans for one file into
//! a single rooted tree by interval containment, inserting synthetic `code`
//! leaves so that every parent span is exactly partitioned by its children.
//! Spans and parent/child links live in a flat arena of indices while the
//! tree is being shaped; the owned tree is materialized once at the end.

use tracing::debug;

use crate::core::model::{CallSpan, DeclarationSpan, LogicNode, LogicNodeKind, SpanValue};
use crate::error::{MapError, Result};

struct FlatNode {
    kind: LogicNodeKind,
    value: Option<SpanValue>,
    pos: usize,
    end: usize,
    children: Vec<usize>,
}

/// Build the containment tree for one file.
///
/// The root spans `[0, content_len)`. Nested declarations attach one level
/// deep to their containing declaration; a span not contained by any placed
/// node is an internal invariant violation and fails the whole tree.
pub fn build_logic_tree(
    declarations: &[DeclarationSpan],
    calls: &[CallSpan],
    content_len: usize,
) -> Result<LogicNode> {
    let mut nodes = Vec::with_capacity(declarations.len() + calls.len() + 1);
    nodes.push(FlatNode {
        kind: LogicNodeKind::File,
        value: None,
        pos: 0,
        end: content_len,
        children: Vec::new(),
    });
    for decl in declarations {
        nodes.push(FlatNode {
            kind: LogicNodeKind::Decl,
            value: Some(SpanValue::Decl(decl.clone())),
            pos: decl.pos,
            end: decl.end,
            children: Vec::new(),
        });
    }
    for call in calls {
        nodes.push(FlatNode {
            kind: LogicNodeKind::Call,
            value: Some(SpanValue::Call(call.clone())),
            pos: call.pos,
            end: call.end,
            children: Vec::new(),
        });
    }

    // Ascending pos; at equal pos the outer (larger end) span first so it is
    // available as a containing candidate; declarations before calls on a
    // full tie. The root sorts first by construction.
    nodes.sort_by(|l, r| {
        l.pos
            .cmp(&r.pos)
            .then(r.end.cmp(&l.end))
            .then(kind_rank(l.kind).cmp(&kind_rank(r.kind)))
    });

    for idx in 1..nodes.len() {
        let parent = (0..idx)
            .rev()
            .find(|&j| nodes[j].pos <= nodes[idx].pos && nodes[idx].end <= nodes[j].end);
        match parent {
            Some(j) => nodes[j].children.push(idx),
            None => {
                return Err(MapError::Parse(format!(
                    "span [{}, {}) has no containing ancestor",
                    nodes[idx].pos, nodes[idx].end
                )))
            }
        }
    }

    Ok(assemble(&nodes, 0))
}

fn kind_rank(kind: LogicNodeKind) -> u8 {
    match kind {
        LogicNodeKind::File => 0,
        LogicNodeKind::Decl => 1,
        LogicNodeKind::Call => 2,
        LogicNodeKind::Code => 3,
    }
}

/// Materialize the owned tree, weaving `code` fillers between children so
/// they exactly partition the parent span. The root is always filled, even
/// when it has no extracted children, so consumers can render the whole
/// file from its children alone.
fn assemble(nodes: &[FlatNode], idx: usize) -> LogicNode {
    let flat = &nodes[idx];
    let mut children = Vec::new();
    let mut cursor = flat.pos;

    for &child_idx in &flat.children {
        let child = &nodes[child_idx];
        if child.pos < cursor {
            debug!(
                "overlapping spans at [{}, {}), filler suppressed",
                child.pos, child.end
            );
        } else if child.pos > cursor {
            children.push(LogicNode::leaf(LogicNodeKind::Code, None, cursor, child.pos));
        }
        children.push(assemble(nodes, child_idx));
        cursor = cursor.max(child.end);
    }

    let fill_tail = !flat.children.is_empty() || idx == 0;
    if fill_tail && cursor < flat.end {
        children.push(LogicNode::leaf(LogicNodeKind::Code, None, cursor, flat.end));
    }

    LogicNode {
        kind: flat.kind,
        value: flat.value.clone(),
        pos: flat.pos,
        end: flat.end,
        children,
    }
}
