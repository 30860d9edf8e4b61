//! Error taxonomy for the extraction engine and session layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unparseable module specifier: {0}")]
    Resolution(String),

    #[error("failed to parse file: {0}")]
    Parse(String),

    #[error("syntax tree traversal exceeded depth limit of {0}")]
    TraversalLimit(usize),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("unrecognized command: {0}")]
    Protocol(String),

    #[error("watcher error: {0}")]
    Watch(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MapError>;
