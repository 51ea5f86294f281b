use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::project::{Project, RunMode};
use crate::model::result::TestResult;

pub type SuiteId = usize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuiteKind {
    Root,
    Project,
    File,
    Describe,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParallelMode {
    #[default]
    Default,
    Parallel,
    Serial,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

/// One node of a suite tree. Stored in a `SuiteArena` and addressed by `SuiteId`;
/// `parent` is a non-owning back-reference into the same arena.
#[derive(Debug, Clone)]
pub struct SuiteNode {
    pub title: String,
    pub location: Option<Location>,
    pub kind: SuiteKind,
    pub parallel_mode: ParallelMode,
    pub hooks: Vec<HookKind>,
    pub only: bool,
    pub parent: Option<SuiteId>,
    pub entries: Vec<Entry>,
    pub project: Option<Arc<Project>>,
    pub file: Option<PathBuf>,
}

impl SuiteNode {
    pub fn new_project(title: impl Into<String>) -> Self {
        Self::new(SuiteKind::Project, title)
    }

    pub fn new_file(title: impl Into<String>) -> Self {
        Self::new(SuiteKind::File, title)
    }

    pub fn new_describe(title: impl Into<String>) -> Self {
        Self::new(SuiteKind::Describe, title)
    }

    pub fn new(kind: SuiteKind, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location: None,
            kind,
            parallel_mode: ParallelMode::Default,
            hooks: Vec::new(),
            only: false,
            parent: None,
            entries: Vec::new(),
            project: None,
            file: None,
        }
    }

    pub fn has_all_hooks(&self) -> bool {
        self.hooks
            .iter()
            .any(|h| matches!(h, HookKind::BeforeAll | HookKind::AfterAll))
    }
}

#[derive(Debug, Clone)]
pub enum Entry {
    Suite(SuiteId),
    Test(TestCase),
}

#[derive(Debug, Clone)]
pub struct TestCase {
    /// Unique within one run; lets a `TestGroup`'s copy of a test be matched
    /// back to its location in the suite tree (used by the shard filter's
    /// pruning pass).
    pub id: u64,
    pub title: String,
    pub location: Option<Location>,
    pub only: bool,
    pub parent: SuiteId,
    pub worker_hash: String,
    pub require_file: PathBuf,
    pub repeat_each_index: usize,
    pub project_id: String,
    /// Copied from the owning `Project::run` when the suite is stamped with
    /// per-project metadata; carried onto the `TestGroup` it ends up in.
    pub run: RunMode,
    pub results: Vec<TestResult>,
}

impl TestCase {
    pub fn full_title(&self, arena: &SuiteArena) -> String {
        let mut parts: Vec<String> = arena
            .ancestors(self.parent)
            .filter(|id| {
                !matches!(
                    arena.get(*id).kind,
                    SuiteKind::Root | SuiteKind::File
                )
            })
            .map(|id| arena.get(id).title.clone())
            .collect();
        parts.reverse();
        parts.push(self.title.clone());
        parts.join(" \u{203a} ")
    }

    /// The full title joined with spaces, the matching target for `grep`/`grepInvert`.
    pub fn space_joined_title(&self, arena: &SuiteArena) -> String {
        self.full_title(arena).replace('\u{203a}', " ")
    }
}

/// Owns every `SuiteNode` reachable from a single tree; nodes are addressed
/// by index so that a `TestCase`/`SuiteNode` can hold a cheap, non-owning
/// reference to its parent without a `Rc`/`Weak` cycle.
#[derive(Debug, Clone, Default)]
pub struct SuiteArena {
    nodes: Vec<SuiteNode>,
}

impl SuiteArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn root() -> (Self, SuiteId) {
        let mut arena = Self::new();
        let id = arena.push(SuiteNode::new(SuiteKind::Root, ""));
        (arena, id)
    }

    pub fn push(&mut self, node: SuiteNode) -> SuiteId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: SuiteId) -> &SuiteNode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: SuiteId) -> &mut SuiteNode {
        &mut self.nodes[id]
    }

    pub fn add_child_suite(&mut self, parent: SuiteId, mut node: SuiteNode) -> SuiteId {
        node.parent = Some(parent);
        let id = self.push(node);
        self.nodes[parent].entries.push(Entry::Suite(id));
        id
    }

    pub fn add_test(&mut self, parent: SuiteId, test: TestCase) {
        self.nodes[parent].entries.push(Entry::Test(test));
    }

    /// Ids of `id` and every ancestor, innermost first, root last.
    pub fn ancestors(&self, id: SuiteId) -> impl Iterator<Item = SuiteId> + '_ {
        std::iter::successors(Some(id), move |&cur| self.nodes[cur].parent)
    }

    pub fn all_tests(&self, id: SuiteId) -> Vec<&TestCase> {
        let mut out = Vec::new();
        self.collect_tests(id, &mut out);
        out
    }

    fn collect_tests<'a>(&'a self, id: SuiteId, out: &mut Vec<&'a TestCase>) {
        for entry in &self.nodes[id].entries {
            match entry {
                Entry::Suite(child) => self.collect_tests(*child, out),
                Entry::Test(test) => out.push(test),
            }
        }
    }

    /// Applies `f` to every test reachable from `id`, in source order.
    pub fn for_each_test_mut(&mut self, id: SuiteId, f: &mut impl FnMut(&mut TestCase)) {
        let children: Vec<SuiteId> = self.nodes[id]
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Suite(child) => Some(*child),
                Entry::Test(_) => None,
            })
            .collect();
        for entry in self.nodes[id].entries.iter_mut() {
            if let Entry::Test(test) = entry {
                f(test);
            }
        }
        for child in children {
            self.for_each_test_mut(child, f);
        }
    }

    /// Deep-copies the subtree rooted at `src_root` (from `src`, possibly a
    /// different arena) into `self`, reparenting the copy under `new_parent`.
    /// Returns the id of the copied root. Used to clone a per-file preprocess
    /// suite once per `(project, repeatEach index)` pair.
    pub fn clone_subtree_into(
        &mut self,
        src: &SuiteArena,
        src_root: SuiteId,
        new_parent: Option<SuiteId>,
    ) -> SuiteId {
        let node = src.get(src_root);
        let mut copy = SuiteNode::new(node.kind, node.title.clone());
        copy.location = node.location;
        copy.parallel_mode = node.parallel_mode;
        copy.hooks = node.hooks.clone();
        copy.only = node.only;
        copy.project = node.project.clone();
        copy.file = node.file.clone();
        copy.parent = new_parent;
        let new_id = self.push(copy);
        if let Some(parent) = new_parent {
            self.nodes[parent].entries.push(Entry::Suite(new_id));
        }
        for entry in &node.entries {
            match entry {
                Entry::Suite(child) => {
                    self.clone_subtree_into(src, *child, Some(new_id));
                }
                Entry::Test(test) => {
                    let mut test = test.clone();
                    test.parent = new_id;
                    test.results.clear();
                    self.nodes[new_id].entries.push(Entry::Test(test));
                }
            }
        }
        new_id
    }

    /// Removes every test under `id` for which `pred` returns `false`,
    /// dropping suites left empty by the removal. Returns whether anything
    /// under `id` survived. Shared by the grep/title filters, the focused-line
    /// filter, and the shard filter's suite-tree pruning pass.
    pub fn retain_tests(&mut self, id: SuiteId, pred: &mut impl FnMut(&TestCase) -> bool) -> bool {
        let entries = std::mem::take(&mut self.nodes[id].entries);
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Entry::Suite(child) => {
                    if self.retain_tests(child, pred) {
                        kept.push(Entry::Suite(child));
                    }
                }
                Entry::Test(test) => {
                    if pred(&test) {
                        kept.push(Entry::Test(test));
                    }
                }
            }
        }
        let retained = !kept.is_empty();
        self.nodes[id].entries = kept;
        retained
    }

    /// Only-semantics pruning (bottom-up): a suite directly marked `only`
    /// retains its whole subtree unchanged; otherwise it is retained iff it
    /// has a retained descendant, with non-`only` siblings pruned at every
    /// level. Call only when [`SuiteArena::any_only`] is true on `id` —
    /// otherwise every test would be pruned.
    pub fn prune_to_only(&mut self, id: SuiteId) -> bool {
        if self.nodes[id].only {
            return true;
        }
        let entries = std::mem::take(&mut self.nodes[id].entries);
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Entry::Suite(child) => {
                    if self.prune_to_only(child) {
                        kept.push(Entry::Suite(child));
                    }
                }
                Entry::Test(test) => {
                    if test.only {
                        kept.push(Entry::Test(test));
                    }
                }
            }
        }
        let retained = !kept.is_empty();
        self.nodes[id].entries = kept;
        retained
    }

    pub fn any_only(&self, id: SuiteId) -> bool {
        if self.nodes[id].only {
            return true;
        }
        self.nodes[id].entries.iter().any(|e| match e {
            Entry::Suite(child) => self.any_only(*child),
            Entry::Test(test) => test.only,
        })
    }

    pub fn count_only(&self, id: SuiteId) -> usize {
        let own = if self.nodes[id].only { 1 } else { 0 };
        own + self.nodes[id]
            .entries
            .iter()
            .map(|e| match e {
                Entry::Suite(child) => self.count_only(*child),
                Entry::Test(test) => {
                    if test.only {
                        1
                    } else {
                        0
                    }
                }
            })
            .sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
