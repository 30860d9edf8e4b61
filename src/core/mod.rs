//! Core engine for module-reference mapping and span extraction

pub mod config;
pub mod extractor;
pub mod files;
pub mod logic;
pub mod model;
pub mod parser;
pub mod project;
pub mod resolver;

use std::path::Path;

use tracing::info;

use crate::core::config::ProjectConfig;
use crate::core::model::ProjectMap;
use crate::core::project::ProjectModel;

/// One-shot project scan: enumerate, resolve, return the include map.
pub async fn map_project(project_path: &Path, config: &ProjectConfig) -> anyhow::Result<ProjectMap> {
    let model = ProjectModel::new(project_path, config)?;
    let map = model.recompute().await?;
    info!("mapped {} include edges", map.len());
    Ok((*map).clone())
}
