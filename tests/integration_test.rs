//! Integration tests for modmap
//!
//! These tests drive the public API end to end: enumerate a project on
//! disk, resolve its include map, extract spans and assemble containment
//! trees.

use std::sync::Arc;

use tempfile::TempDir;

use modmap::{build_logic_tree, LogicNode, ProjectModel};
use modmap::core::config::ProjectConfig;
use modmap::core::model::LogicNodeKind;

fn create_file(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn open_model(dir: &TempDir) -> ProjectModel {
    ProjectModel::new(dir.path(), &ProjectConfig::default()).unwrap()
}

/// Containment and exact-partition invariants over a whole tree.
fn assert_tree_invariants(node: &LogicNode) {
    if node.children.is_empty() {
        return;
    }
    let mut cursor = node.pos;
    for child in &node.children {
        assert!(node.pos <= child.pos && child.end <= node.end);
        assert_eq!(child.pos, cursor, "children must partition the parent");
        cursor = child.end;
        assert_tree_invariants(child);
    }
    assert_eq!(cursor, node.end);
}

#[tokio::test]
async fn declaration_call_and_tree_for_one_file() {
    let dir = TempDir::new().unwrap();
    let content = "function gaga(a){return a+a;} gaga(42);";
    create_file(&dir, "main.js", content);

    let model = open_model(&dir);
    let maps = model.file_map("main.js", false).await.unwrap();
    assert_eq!(maps.len(), 1);

    let mapping = &maps[0].mapping;
    assert_eq!(mapping.function_declarations.len(), 1);
    let decl = &mapping.function_declarations[0];
    assert_eq!(decl.name, "gaga");
    assert_eq!(decl.pos, 0);
    assert_eq!(&content[decl.pos..decl.end], "function gaga(a){return a+a;}");
    assert_eq!(decl.args, vec!["a"]);

    assert_eq!(mapping.function_calls.len(), 1);
    let call = &mapping.function_calls[0];
    assert_eq!(call.name, "gaga");
    assert!(call.pos > decl.end);
    assert_eq!(call.args, vec!["42"]);

    let tree = build_logic_tree(
        &mapping.function_declarations,
        &mapping.function_calls,
        content.len(),
    )
    .unwrap();
    assert_tree_invariants(&tree);

    // declaration and call are siblings at file scope, separated by fillers
    let non_code: Vec<_> = tree
        .children
        .iter()
        .filter(|c| c.kind != LogicNodeKind::Code)
        .map(|c| c.kind)
        .collect();
    assert_eq!(non_code, vec![LogicNodeKind::Decl, LogicNodeKind::Call]);
}

#[tokio::test]
async fn project_map_and_recompute_after_removal() {
    let dir = TempDir::new().unwrap();
    create_file(&dir, "a.js", "import g from './b.js';\n");
    create_file(&dir, "b.js", "export default function g() {}\n");

    let model = open_model(&dir);
    let map = model.project_map().await.unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[0].from, "a.js");
    assert_eq!(map[0].to, "b.js");
    assert_eq!(map[0].items, vec!["g"]);

    std::fs::remove_file(dir.path().join("b.js")).unwrap();
    let map = model.recompute().await.unwrap();
    assert_eq!(map.len(), 1);
    // the explicit extension survives the completion miss untouched
    assert_eq!(map[0].to, "b.js");
}

#[tokio::test]
async fn extension_completion_against_the_enumerated_set() {
    let dir = TempDir::new().unwrap();
    create_file(&dir, "src/a.js", "import u from './util';\nimport f from './feature';\n");
    create_file(&dir, "src/util.ts", "export default 1;\n");
    create_file(&dir, "src/feature/index.js", "export default 2;\n");

    let model = open_model(&dir);
    let map = model.project_map().await.unwrap();
    let targets: Vec<_> = map.iter().map(|e| e.to.as_str()).collect();
    assert_eq!(targets, vec!["src/util.ts", "src/feature/index.js"]);
}

#[tokio::test]
async fn destructured_and_require_includes() {
    let dir = TempDir::new().unwrap();
    create_file(
        &dir,
        "src/dir/a.js",
        "import { gaga, maga } from './b.js';\nconst { raga } = require('../c.js');\n",
    );
    create_file(&dir, "src/dir/b.js", "export const gaga = 1; export const maga = 2;\n");
    create_file(&dir, "src/c.js", "module.exports = { raga: 3 };\n");

    let model = open_model(&dir);
    let map = model.project_map().await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[0].to, "src/dir/b.js");
    assert_eq!(map[0].items, vec!["gaga", "maga"]);
    assert_eq!(map[1].to, "src/c.js");
    assert_eq!(map[1].items, vec!["raga"]);
}

#[tokio::test]
async fn node_modules_and_bare_specifiers_stay_out() {
    let dir = TempDir::new().unwrap();
    create_file(&dir, "a.js", "import react from 'react';\nimport b from './b.js';\n");
    create_file(&dir, "b.js", "export default 1;\n");
    create_file(&dir, "node_modules/react/index.js", "module.exports = {};\n");

    let model = open_model(&dir);
    assert_eq!(model.files().await.len(), 0);
    let map = model.project_map().await.unwrap();
    assert_eq!(model.files().await, vec!["a.js", "b.js"]);
    assert_eq!(map.len(), 1);
    assert_eq!(map[0].to, "b.js");
}

#[tokio::test]
async fn related_files_ride_along_in_file_map() {
    let dir = TempDir::new().unwrap();
    create_file(&dir, "a.js", "import g from './b.js';\ng(7);\n");
    create_file(&dir, "b.js", "export default function g(x) { return x; }\n");
    create_file(&dir, "c.js", "import a from './a.js';\n");
    create_file(&dir, "unrelated.js", "export default 0;\n");

    let model = open_model(&dir);
    model.recompute().await.unwrap();

    let maps = model.file_map("a.js", true).await.unwrap();
    let names: Vec<_> = maps.iter().map(|m| m.filename.as_str()).collect();
    assert_eq!(names, vec!["a.js", "b.js", "c.js"]);
    assert_eq!(maps[1].mapping.function_declarations[0].name, "g");
}

#[tokio::test]
async fn save_file_is_visible_to_the_next_analysis() {
    let dir = TempDir::new().unwrap();
    create_file(&dir, "a.js", "function f() {}\n");

    let model = open_model(&dir);
    let before = model.file_map("a.js", false).await.unwrap();
    assert_eq!(before[0].mapping.function_declarations[0].name, "f");

    model
        .save_file("a.js", "function renamed() {}\n", None)
        .await
        .unwrap();
    let after = model.file_map("a.js", false).await.unwrap();
    assert_eq!(after[0].mapping.function_declarations[0].name, "renamed");
}

#[tokio::test]
async fn watch_pushes_change_events_and_recomputes() {
    let dir = TempDir::new().unwrap();
    create_file(&dir, "a.js", "import g from './b.js';\n");
    create_file(&dir, "b.js", "export default 1;\n");

    let model = Arc::new(open_model(&dir));
    model.recompute().await.unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _watch = model
        .watch(move |event| {
            let _ = tx.send(event);
        })
        .unwrap();

    create_file(&dir, "c.js", "import a from './a.js';\n");

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .expect("no change event before timeout")
        .expect("event channel closed");
    assert_eq!(event.path, "c.js");

    // the recompute behind the event already picked up the new edge
    let map = model.project_map().await.unwrap();
    assert!(map.iter().any(|e| e.from == "c.js" && e.to == "a.js"));
}

#[tokio::test]
async fn repeated_extraction_is_structurally_identical() {
    let dir = TempDir::new().unwrap();
    create_file(
        &dir,
        "a.ts",
        "import { helper } from './b';\n\
         const run = (n: number) => helper(n * 2);\n\
         function main() { run(1); run(2); }\n\
         main();\n",
    );
    create_file(&dir, "b.ts", "export function helper(n: number) { return n; }\n");

    let model = open_model(&dir);
    let first = model.file_map("a.ts", false).await.unwrap();
    let second = model.file_map("a.ts", false).await.unwrap();
    assert_eq!(first[0].mapping, second[0].mapping);

    let mapping = &first[0].mapping;
    let tree = build_logic_tree(
        &mapping.function_declarations,
        &mapping.function_calls,
        first[0].content.len(),
    )
    .unwrap();
    assert_tree_invariants(&tree);
    let again = build_logic_tree(
        &mapping.function_declarations,
        &mapping.function_calls,
        first[0].content.len(),
    )
    .unwrap();
    assert_eq!(tree, again);
}
