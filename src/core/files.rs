//! Project file enumeration

use std::path::Path;

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::config::ProjectConfig;
use crate::error::{MapError, Result};

/// Lists project-relative file paths matching the include/exclude masks.
///
/// Every other component works against the file set this produces.
pub struct FileEnumerator {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileEnumerator {
    pub fn new(config: &ProjectConfig) -> Result<Self> {
        let include = compile_patterns(&config.include_mask)?;
        let exclude = compile_patterns(&config.exclude_mask)?;
        Ok(Self { include, exclude })
    }

    /// Walk `root` and return the matching project-relative paths, sorted.
    pub fn enumerate(&self, root: &Path) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        {
            let entry = entry.map_err(|e| MapError::Io(std::io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if self.matches(&relative) {
                files.push(relative);
            }
        }

        files.sort();
        debug!("enumerated {} project files", files.len());
        Ok(files)
    }

    /// Whether a project-relative path belongs to the enumerable set.
    pub fn matches(&self, relative: &str) -> bool {
        self.include.iter().any(|p| p.matches(relative))
            && !self.exclude.iter().any(|p| p.matches(relative))
    }
}

fn compile_patterns(masks: &[String]) -> Result<Vec<Pattern>> {
    masks
        .iter()
        .map(|m| Pattern::new(m).map_err(|e| MapError::Config(format!("bad glob '{}': {}", m, e))))
        .collect()
}

/// Check if a directory entry is hidden
fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
