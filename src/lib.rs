//! modmap - source relationship and structure extraction
//!
//! This library maps a JavaScript/TypeScript project into its module
//! include graph, per-file declaration and call spans, and per-file
//! containment trees, and keeps that picture live under file-system
//! watch.

pub mod core;
pub mod error;
pub mod server;

pub use crate::core::config::Config;
pub use crate::core::logic::build_logic_tree;
pub use crate::core::model::{
    CallSpan, ChangeEvent, DeclarationSpan, FileMap, FileMapping, IncludeEdge, LogicNode,
    ProjectMap,
};
pub use crate::core::project::ProjectModel;
pub use crate::error::{MapError, Result};
