//! Syntax parser adapter over tree-sitter
//!
//! Wraps the generic tree-sitter parser into a "parse text, walk tree"
//! interface. Every parse creates a fresh parser and the returned tree is
//! consumed by the extraction pass that requested it, never cached.

use std::path::Path;

use tree_sitter::Tree;

use crate::error::{MapError, Result};

/// Grammar variant of the analyzed module family, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Javascript,
    Jsx,
    Typescript,
    Tsx,
}

impl Dialect {
    /// Pick a dialect from a project-relative path, if its extension is known.
    pub fn from_path(path: &str) -> Option<Self> {
        match Path::new(path).extension()?.to_str()? {
            "js" => Some(Self::Javascript),
            "jsx" => Some(Self::Jsx),
            "ts" => Some(Self::Typescript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    fn grammar(self) -> tree_sitter::Language {
        match self {
            // The JS grammar covers JSX as well.
            Self::Javascript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Parse `content` with the grammar for `dialect`.
pub fn parse_source(content: &str, dialect: Dialect) -> Result<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&dialect.grammar())
        .map_err(|e| MapError::Parse(format!("failed to set grammar: {}", e)))?;

    parser
        .parse(content, None)
        .ok_or_else(|| MapError::Parse("parser returned no tree".to_string()))
}

/// Parse a file's content, picking the grammar from its path.
///
/// Files with an unrecognized extension fall back to the TSX grammar, the
/// most permissive member of the family.
pub fn parse_file(path: &str, content: &str) -> Result<Tree> {
    let dialect = Dialect::from_path(path).unwrap_or(Dialect::Tsx);
    parse_source(content, dialect)
}
