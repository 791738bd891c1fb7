//! Node identity and source spans for the AST
//!
//! The parser (external to this crate) assigns every AST node a small,
//! densely packed [`NodeId`]. Every decoration the passes compute is keyed
//! by this id rather than by a tree pointer, so the decoration store can be
//! a handful of plain hash maps instead of a graph walk.

use serde::{Deserialize, Serialize};

/// Identity of a single AST node, assigned by the parser in construction
/// order. Ids are never reused within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Hands out sequential [`NodeId`]s when building an AST outside of a real
/// parser (fixtures, tests, the `aslc` demo harness).
#[derive(Debug, Default)]
pub struct NodeIdGen(u32);

impl NodeIdGen {
    pub fn new() -> Self {
        NodeIdGen(0)
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.0);
        self.0 += 1;
        id
    }
}

/// A position in the original source text, 0-indexed like the teacher's
/// `SourceLocation`. Absent on synthesized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Span {
            line,
            column,
            length,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}
