//! Live project model
//!
//! Owns the enumerated file list, the cached project-wide include map and a
//! per-file analysis memo. Derived structures are never mutated in place:
//! every recompute rebuilds them and swaps the snapshot atomically, so
//! readers observe either the pre- or the post-recompute state.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::config::ProjectConfig;
use crate::core::extractor::{extract_spans, FileSpans};
use crate::core::files::FileEnumerator;
use crate::core::model::{
    CallSpan, ChangeEvent, ChangeKind, DeclarationSpan, FileMap, FileMapping, ProjectMap,
};
use crate::core::parser::parse_file;
use crate::core::resolver::{extract_includes, resolve_includes, resolve_raw_includes, RawInclude};
use crate::error::{MapError, Result};

/// Cached per-file extraction result, keyed by content hash.
///
/// Module references are memoized unresolved; path completion depends on
/// the enumerated file set, so it runs fresh on every query against the
/// set current at that moment.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub content: String,
    pub declarations: Vec<DeclarationSpan>,
    pub calls: Vec<CallSpan>,
    raw_includes: Vec<RawInclude>,
    content_hash: String,
}

#[derive(Default)]
struct ModelState {
    files: Vec<String>,
    file_set: Arc<HashSet<String>>,
    project_map: Option<Arc<ProjectMap>>,
    memo: HashMap<String, Arc<FileAnalysis>>,
}

pub struct ProjectModel {
    root: PathBuf,
    enumerator: FileEnumerator,
    state: RwLock<ModelState>,
    // serializes recompute passes; watch notifications arriving mid-pass
    // queue up behind the gate and coalesce into trailing recomputes
    recompute_gate: Mutex<()>,
}

impl ProjectModel {
    /// Create a model over `root`. An unreadable project root is fatal.
    pub fn new(root: impl Into<PathBuf>, config: &ProjectConfig) -> Result<Self> {
        let root: PathBuf = root.into();
        let root = root
            .canonicalize()
            .map_err(|_| MapError::NotFound(root.to_string_lossy().into_owned()))?;
        let enumerator = FileEnumerator::new(config)?;
        Ok(Self {
            root,
            enumerator,
            state: RwLock::new(ModelState::default()),
            recompute_gate: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Current enumerated file list (empty before the first recompute).
    pub async fn files(&self) -> Vec<String> {
        self.state.read().await.files.clone()
    }

    /// Re-enumerate the project and rebuild the include map from scratch.
    ///
    /// Corrupt or unreadable files are omitted from the edge set with a
    /// diagnostic; they never fail the pass. The cached map is replaced
    /// atomically once the whole pass has finished.
    pub async fn recompute(&self) -> Result<Arc<ProjectMap>> {
        let _gate = self.recompute_gate.lock().await;

        let files = self.enumerator.enumerate(&self.root)?;
        let file_set: Arc<HashSet<String>> = Arc::new(files.iter().cloned().collect());

        // independent reads, issued concurrently
        let mut tasks = JoinSet::new();
        for filename in &files {
            let filename = filename.clone();
            let path = self.root.join(&filename);
            let file_set = Arc::clone(&file_set);
            tasks.spawn(async move {
                let edges = analyze_includes(&filename, &path, &file_set).await;
                (filename, edges)
            });
        }

        let mut per_file: HashMap<String, Vec<_>> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (filename, edges) = joined.map_err(|e| MapError::Io(std::io::Error::other(e)))?;
            match edges {
                Ok(edges) => {
                    per_file.insert(filename, edges);
                }
                Err(e) => warn!("omitting {} from project map: {}", filename, e),
            }
        }

        let mut map = Vec::new();
        for filename in &files {
            if let Some(edges) = per_file.remove(filename) {
                map.extend(edges);
            }
        }
        let map = Arc::new(map);

        let mut state = self.state.write().await;
        state.memo.retain(|path, _| file_set.contains(path));
        state.files = files;
        state.file_set = file_set;
        state.project_map = Some(Arc::clone(&map));
        info!(
            "project map recomputed: {} files, {} edges",
            state.files.len(),
            map.len()
        );
        Ok(map)
    }

    /// Current include map, computing it on first use.
    pub async fn project_map(&self) -> Result<Arc<ProjectMap>> {
        if let Some(map) = self.state.read().await.project_map.clone() {
            return Ok(map);
        }
        self.recompute().await
    }

    /// Analyze one file: content, raw module references, declarations and
    /// calls.
    ///
    /// Served from the memo when the content hash is unchanged. A file that
    /// fails to parse degrades to empty spans; only an unreadable file is
    /// an error.
    pub async fn analyze_file(&self, filename: &str) -> Result<Arc<FileAnalysis>> {
        let path = self.root.join(filename);
        let content = tokio::fs::read(&path)
            .await
            .map_err(|_| MapError::NotFound(filename.to_string()))?;
        let content = String::from_utf8_lossy(&content).into_owned();
        let content_hash = compute_hash(&content);

        {
            let state = self.state.read().await;
            if let Some(memo) = state.memo.get(filename) {
                if memo.content_hash == content_hash {
                    debug!("memo hit for {}", filename);
                    return Ok(Arc::clone(memo));
                }
            }
        }

        let (raw_includes, spans) = match extract_file(filename, &content) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("extraction failed for {}: {}", filename, e);
                (Vec::new(), FileSpans::default())
            }
        };

        let analysis = Arc::new(FileAnalysis {
            content,
            declarations: spans.declarations,
            calls: spans.calls,
            raw_includes,
            content_hash,
        });
        let mut state = self.state.write().await;
        state
            .memo
            .insert(filename.to_string(), Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Map one file and, when `include_related` is set, every file directly
    /// connected to it in the current include map.
    ///
    /// All include resolution inside one call runs against a single
    /// snapshot of the enumerated file set.
    pub async fn file_map(&self, filename: &str, include_related: bool) -> Result<Vec<FileMap>> {
        let map = self.project_map().await?;
        let files = self.state.read().await.file_set.clone();

        let main = self.analyze_file(filename).await?;
        let mut out = vec![compose_file_map(filename, &main, &files)];

        if include_related {
            for related in related_files(&map, filename) {
                match self.analyze_file(&related).await {
                    Ok(analysis) => out.push(compose_file_map(&related, &analysis, &files)),
                    // a related file may have vanished; the main result stands
                    Err(e) => warn!("skipping related file {}: {}", related, e),
                }
            }
        }
        Ok(out)
    }

    /// Write content back to a project file. With a span, only the
    /// `[pos, end)` byte range of the existing content is replaced.
    pub async fn save_file(
        &self,
        filename: &str,
        content: &str,
        span: Option<(usize, usize)>,
    ) -> Result<()> {
        let path = self.root.join(filename);
        let full = match span {
            None => content.to_string(),
            Some((pos, end)) => {
                let existing = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|_| MapError::NotFound(filename.to_string()))?;
                // both offsets must land on char boundaries of the
                // existing content or the splice would panic
                if pos > end
                    || end > existing.len()
                    || !existing.is_char_boundary(pos)
                    || !existing.is_char_boundary(end)
                {
                    return Err(MapError::Protocol(format!(
                        "invalid edit span [{}, {}) for {}",
                        pos, end, filename
                    )));
                }
                let mut full = String::with_capacity(existing.len() + content.len());
                full.push_str(&existing[..pos]);
                full.push_str(content);
                full.push_str(&existing[end..]);
                full
            }
        };
        tokio::fs::write(&path, full).await?;
        self.state.write().await.memo.remove(filename);
        Ok(())
    }

    /// Subscribe to file-system notifications under the project root.
    ///
    /// Every debounced batch triggers one serialized recompute, after which
    /// `on_change` fires once per affected project file. Additions and
    /// removals come from the file-set diff around the recompute, so
    /// directory-level notifications (renames, moves) surface as events for
    /// the files they carried. Failure to establish the watch is fatal to
    /// the caller.
    pub fn watch<F>(self: &Arc<Self>, on_change: F) -> Result<WatchHandle>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(
            Duration::from_millis(300),
            move |res: DebounceEventResult| {
                if let Ok(events) = res {
                    let _ = tx.send(events);
                }
            },
        )
        .map_err(|e| MapError::Watch(e.to_string()))?;
        debouncer
            .watcher()
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| MapError::Watch(e.to_string()))?;

        let model = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(events) = rx.recv().await {
                // any notification under the root invalidates the model
                let before = model.state.read().await.file_set.clone();
                if let Err(e) = model.recompute().await {
                    warn!("recompute after change failed: {}", e);
                    continue;
                }
                let after = model.state.read().await.file_set.clone();

                let mut changes = Vec::new();
                for path in after.iter() {
                    if !before.contains(path) {
                        changes.push(ChangeEvent {
                            kind: ChangeKind::Add,
                            path: path.clone(),
                        });
                    }
                }
                for path in before.iter() {
                    if !after.contains(path) {
                        changes.push(ChangeEvent {
                            kind: ChangeKind::Remove,
                            path: path.clone(),
                        });
                    }
                }

                // in-place edits only show up in the notifications themselves
                let mut seen = HashSet::new();
                for event in events {
                    let Ok(relative) = event.path.strip_prefix(&model.root) else {
                        continue;
                    };
                    let relative = relative.to_string_lossy().replace('\\', "/");
                    if model.enumerator.matches(&relative)
                        && before.contains(&relative)
                        && after.contains(&relative)
                        && seen.insert(relative.clone())
                    {
                        changes.push(ChangeEvent {
                            kind: ChangeKind::Change,
                            path: relative,
                        });
                    }
                }

                changes.sort_by(|l, r| l.path.cmp(&r.path));
                for change in changes {
                    on_change(change);
                }
            }
        });

        Ok(WatchHandle {
            _debouncer: debouncer,
            task,
        })
    }
}

/// Keeps the underlying watcher alive; dropping the handle stops it.
pub struct WatchHandle {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn analyze_includes(
    filename: &str,
    path: &std::path::Path,
    file_set: &HashSet<String>,
) -> Result<Vec<crate::core::model::IncludeEdge>> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|_| MapError::NotFound(filename.to_string()))?;
    let content = String::from_utf8_lossy(&content);
    let tree = parse_file(filename, &content)?;
    resolve_includes(filename, &tree, &content, file_set)
}

fn extract_file(filename: &str, content: &str) -> Result<(Vec<RawInclude>, FileSpans)> {
    let tree = parse_file(filename, content)?;
    let raw_includes = extract_includes(&tree, content)?;
    let spans = extract_spans(filename, &tree, content)?;
    Ok((raw_includes, spans))
}

fn compose_file_map(filename: &str, analysis: &FileAnalysis, files: &HashSet<String>) -> FileMap {
    FileMap {
        filename: filename.to_string(),
        content: analysis.content.clone(),
        mapping: FileMapping {
            includes: resolve_raw_includes(filename, &analysis.raw_includes, files),
            function_declarations: analysis.declarations.clone(),
            function_calls: analysis.calls.clone(),
        },
    }
}

/// Files directly connected to `filename` in the include map, in edge
/// order, deduplicated.
fn related_files(map: &ProjectMap, filename: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut related = Vec::new();
    for edge in map {
        let neighbor = if edge.from == filename {
            &edge.to
        } else if edge.to == filename {
            &edge.from
        } else {
            continue;
        };
        if neighbor != filename && seen.insert(neighbor.clone()) {
            related.push(neighbor.clone());
        }
    }
    related
}

/// SHA-256 of content, used for memo invalidation
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
