//! Suite tree construction and filtering (§4.2).
//!
//! Each unique test file is compiled once via [`SuiteLoader`] into a
//! "preprocess" suite, then cloned once per `(project, repeatEach index)`
//! pair into the run's combined [`SuiteArena`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{RunOptions, TestFileFilter};
use crate::error::{Error, Result};
use crate::model::{Project, SuiteArena, SuiteId, SuiteNode};

/// Compiles a single test file into a preprocess suite subtree rooted at a
/// `SuiteKind::File` node. An external collaborator — bundled demo
/// implementations live under `tests/` fixtures.
pub trait SuiteLoader {
    fn load(&self, file: &Path) -> Result<(SuiteArena, SuiteId)>;
}

struct IdAllocator(u64);

impl IdAllocator {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Builds the combined suite tree for one stage's projects, applying the
/// duplicate-title, focused-line, forbid-only, and only-semantics filters to
/// each unique file exactly once, then grep/title filtering per clone.
pub struct SuiteBuilder<'a> {
    loader: &'a dyn SuiteLoader,
    run_options: &'a RunOptions,
    forbid_only: bool,
    list_mode: bool,
    cache: HashMap<PathBuf, (SuiteArena, SuiteId)>,
    ids: IdAllocator,
}

impl<'a> SuiteBuilder<'a> {
    pub fn new(loader: &'a dyn SuiteLoader, run_options: &'a RunOptions, forbid_only: bool, list_mode: bool) -> Self {
        Self {
            loader,
            run_options,
            forbid_only,
            list_mode,
            cache: HashMap::new(),
            ids: IdAllocator(0),
        }
    }

    /// Adds one `SuiteKind::Project` node under `stage_root` for `project`,
    /// populated with its matched `files`, each cloned `repeatEach` times.
    pub fn add_project(
        &mut self,
        arena: &mut SuiteArena,
        stage_root: SuiteId,
        project: &Arc<Project>,
        files: &[PathBuf],
    ) -> Result<()> {
        let mut project_node = SuiteNode::new_project(project.name.clone());
        project_node.project = Some(project.clone());
        let project_id = arena.add_child_suite(stage_root, project_node);

        for file in files {
            if !self.cache.contains_key(file) {
                let preprocessed = self.load_and_filter(file)?;
                self.cache.insert(file.clone(), preprocessed);
            }
            let (pre_arena, pre_root) = self.cache.get(file).expect("just inserted");

            for repeat in 0..project.repeat_each.max(1) {
                let file_suite = arena.clone_subtree_into(pre_arena, *pre_root, Some(project_id));
                self.stamp_metadata(arena, file_suite, project, file, repeat);
                self.apply_grep_filters(arena, file_suite, project)?;
            }
        }
        Ok(())
    }

    fn load_and_filter(&self, file: &Path) -> Result<(SuiteArena, SuiteId)> {
        let (mut arena, root) = self
            .loader
            .load(file)
            .map_err(|e| Error::SuiteLoad(file.to_path_buf(), e.to_string()))?;

        check_duplicate_titles(&arena, root, file)?;

        if !self.run_options.test_file_filters.is_empty() {
            match matching_filter(file, &self.run_options.test_file_filters) {
                None => {
                    arena.get_mut(root).entries.clear();
                }
                Some(filter) if filter.line.is_some() || filter.column.is_some() => {
                    arena.retain_tests(root, &mut |test| location_matches(test, filter));
                }
                Some(_) => {}
            }
        }

        if self.forbid_only {
            let count = arena.count_only(root);
            if count > 0 {
                return Err(Error::ForbidOnly(count));
            }
        }

        if !self.list_mode && arena.any_only(root) {
            arena.prune_to_only(root);
        }

        Ok((arena, root))
    }

    fn stamp_metadata(
        &mut self,
        arena: &mut SuiteArena,
        file_suite: SuiteId,
        project: &Arc<Project>,
        file: &Path,
        repeat: usize,
    ) {
        arena.get_mut(file_suite).file = Some(file.to_path_buf());
        let worker_hash = compute_worker_hash(project);
        let project_id = project.name.clone();
        let require_file = file.to_path_buf();
        let run = project.run;
        arena.for_each_test_mut(file_suite, &mut |test| {
            test.id = self.ids.next();
            test.worker_hash = worker_hash.clone();
            test.require_file = require_file.clone();
            test.repeat_each_index = repeat;
            test.project_id = project_id.clone();
            test.run = run;
        });
    }

    fn apply_grep_filters(&self, arena: &mut SuiteArena, file_suite: SuiteId, project: &Project) -> Result<()> {
        let grep = project
            .grep
            .as_ref()
            .map(|p| regex::Regex::new(p))
            .transpose()?;
        let grep_invert = project
            .grep_invert
            .as_ref()
            .map(|p| regex::Regex::new(p))
            .transpose()?;
        let title_matcher = self.run_options.test_title_matcher.clone();

        // Computed with an immutable borrow first, since `retain_tests` needs
        // `&mut SuiteArena` and the predicate would otherwise need `&SuiteArena`
        // at the same time to walk each test's ancestor chain for its title.
        let admitted: std::collections::HashSet<u64> = arena
            .all_tests(file_suite)
            .into_iter()
            .filter(|test| {
                let title = test.space_joined_title(arena);
                if let Some(re) = &grep {
                    if !re.is_match(&title) {
                        return false;
                    }
                }
                if let Some(re) = &grep_invert {
                    if re.is_match(&title) {
                        return false;
                    }
                }
                if let Some(re) = &title_matcher {
                    if !re.is_match(&title) {
                        return false;
                    }
                }
                true
            })
            .map(|test| test.id)
            .collect();

        arena.retain_tests(file_suite, &mut |test| admitted.contains(&test.id));
        Ok(())
    }
}

fn matching_filter<'a>(file: &Path, filters: &'a [TestFileFilter]) -> Option<&'a TestFileFilter> {
    let file = file.to_string_lossy();
    filters.iter().find(|f| file.ends_with(f.file_pattern.as_str()) || file.contains(f.file_pattern.as_str()))
}

fn location_matches(test: &crate::model::TestCase, filter: &TestFileFilter) -> bool {
    let Some(loc) = &test.location else { return false };
    if let Some(line) = filter.line {
        if loc.line != line {
            return false;
        }
    }
    if let Some(column) = filter.column {
        if loc.column != column {
            return false;
        }
    }
    true
}

fn check_duplicate_titles(arena: &SuiteArena, root: SuiteId, file: &Path) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for test in arena.all_tests(root) {
        let title = test.full_title(arena);
        if !seen.insert(title.clone()) {
            return Err(Error::DuplicateTitle(title, file.to_path_buf()));
        }
    }
    Ok(())
}

fn compute_worker_hash(project: &Project) -> String {
    use siphasher::sip::SipHasher13;
    use std::hash::{Hash, Hasher};

    let mut hasher = SipHasher13::new();
    project.name.hash(&mut hasher);
    if let Ok(serialized) = serde_json::to_string(&project.use_options) {
        serialized.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, TestCase};

    struct FixtureLoader;

    impl SuiteLoader for FixtureLoader {
        fn load(&self, file: &Path) -> Result<(SuiteArena, SuiteId)> {
            let (mut arena, root) = SuiteArena::root();
            let file_suite = arena.add_child_suite(root, SuiteNode::new_file(file.to_string_lossy().into_owned()));
            arena.add_test(file_suite, blank_test("one"));
            arena.add_test(file_suite, blank_test("two"));
            Ok((arena, file_suite))
        }
    }

    fn blank_test(title: &str) -> TestCase {
        TestCase {
            id: 0,
            title: title.to_string(),
            location: Some(Location { file: PathBuf::from("f.rs"), line: 1, column: 1 }),
            only: false,
            parent: 0,
            worker_hash: String::new(),
            require_file: PathBuf::new(),
            repeat_each_index: 0,
            project_id: String::new(),
            run: crate::model::RunMode::Default,
            results: Vec::new(),
        }
    }

    #[test]
    fn stamps_metadata_and_repeats_per_project() {
        let loader = FixtureLoader;
        let run_options = RunOptions::default();
        let mut builder = SuiteBuilder::new(&loader, &run_options, false, false);
        let (mut arena, stage_root) = SuiteArena::root();
        let mut project = Project::new("chromium", "tests");
        project.repeat_each = 2;
        let project = Arc::new(project);
        builder
            .add_project(&mut arena, stage_root, &project, &[PathBuf::from("a.test.rs")])
            .unwrap();
        let tests = arena.all_tests(stage_root);
        assert_eq!(tests.len(), 4); // 2 tests * repeatEach=2
        assert!(tests.iter().all(|t| t.project_id == "chromium"));
        assert_eq!(tests.iter().filter(|t| t.repeat_each_index == 1).count(), 2);
    }

    #[test]
    fn grep_filters_out_non_matching_titles() {
        let loader = FixtureLoader;
        let run_options = RunOptions::default();
        let mut builder = SuiteBuilder::new(&loader, &run_options, false, false);
        let (mut arena, stage_root) = SuiteArena::root();
        let mut project = Project::new("chromium", "tests");
        project.grep = Some("one".to_string());
        let project = Arc::new(project);
        builder
            .add_project(&mut arena, stage_root, &project, &[PathBuf::from("a.test.rs")])
            .unwrap();
        let tests = arena.all_tests(stage_root);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].title, "one");
    }
}
