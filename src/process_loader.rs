//! Default, process-based [`SuiteLoader`]: shells out to an external "list
//! tests" command per file and parses its JSON output into a suite subtree.
//! This is the production realization of the test file compiler collaborator
//! — it still doesn't execute test bodies, only asks an external program to
//! describe them.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::project::RunMode;
use crate::model::{Location, SuiteArena, SuiteId, SuiteNode, TestCase};
use crate::suite_builder::SuiteLoader;

/// Invokes `{program} {file}` and expects a single JSON document on stdout
/// describing the file's suite tree (see [`ManifestEntry`]).
pub struct ProcessSuiteLoader {
    program: String,
}

impl ProcessSuiteLoader {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    title: String,
    line: Option<u32>,
    column: Option<u32>,
    #[serde(default)]
    only: bool,
    #[serde(default)]
    describe: bool,
    #[serde(default)]
    children: Vec<ManifestEntry>,
}

impl SuiteLoader for ProcessSuiteLoader {
    fn load(&self, file: &Path) -> Result<(SuiteArena, SuiteId)> {
        let output = Command::new(&self.program)
            .arg(file)
            .output()
            .map_err(|e| Error::SuiteLoad(file.to_path_buf(), e.to_string()))?;
        if !output.status.success() {
            return Err(Error::SuiteLoad(
                file.to_path_buf(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        let entries: Vec<ManifestEntry> = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::SuiteLoad(file.to_path_buf(), e.to_string()))?;

        let (mut arena, root) = SuiteArena::root();
        let mut file_node = SuiteNode::new_file(file.to_string_lossy().into_owned());
        file_node.file = Some(file.to_path_buf());
        let file_root = arena.add_child_suite(root, file_node);
        for entry in entries {
            add_entry(&mut arena, file_root, file, &entry);
        }
        Ok((arena, file_root))
    }
}

fn add_entry(arena: &mut SuiteArena, parent: SuiteId, file: &Path, entry: &ManifestEntry) {
    let location = entry.line.map(|line| Location { file: file.to_path_buf(), line, column: entry.column.unwrap_or(1) });
    if entry.describe {
        let mut node = SuiteNode::new_describe(entry.title.clone());
        node.location = location;
        node.only = entry.only;
        let id = arena.add_child_suite(parent, node);
        for child in &entry.children {
            add_entry(arena, id, file, child);
        }
    } else {
        arena.add_test(
            parent,
            TestCase {
                id: 0,
                title: entry.title.clone(),
                location,
                only: entry.only,
                parent,
                worker_hash: String::new(),
                require_file: file.to_path_buf(),
                repeat_each_index: 0,
                project_id: String::new(),
                run: RunMode::Default,
                results: Vec::new(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_nonexistent_program() {
        let loader = ProcessSuiteLoader::new("stagerun-demo-list-tests-that-does-not-exist");
        let err = loader.load(Path::new("nope.spec.rs")).unwrap_err();
        assert!(matches!(err, Error::SuiteLoad(..)));
    }
}
