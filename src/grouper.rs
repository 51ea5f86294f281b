//! Test grouper (§4.3): partitions filtered tests into the minimal set of
//! [`TestGroup`]s that can share a worker process.

use std::collections::HashMap;

use crate::model::{HookKind, ParallelMode, SuiteArena, SuiteId, TestCase, TestGroup};

#[derive(Default)]
struct Bucket {
    general: Vec<TestCase>,
    /// Keyed by the outermost enclosing serial suite, or by the test's own
    /// id when neither a serial wrapper nor all-hooks apply.
    parallel: HashMap<SuiteId, Vec<TestCase>>,
    parallel_order: Vec<SuiteId>,
    parallel_with_hooks: Vec<TestCase>,
}

/// Builds `TestGroup`s from every test reachable under `root`, scheduling
/// `parallel_with_hooks` tests into `ceil(n / workers)`-sized chunks.
pub fn group_tests(arena: &SuiteArena, root: SuiteId, workers: usize, watch_mode: bool) -> Vec<TestGroup> {
    let mut buckets: HashMap<(String, std::path::PathBuf), Bucket> = HashMap::new();
    let mut bucket_order: Vec<(String, std::path::PathBuf)> = Vec::new();

    for test in arena.all_tests(root) {
        let key = (test.worker_hash.clone(), test.require_file.clone());
        let bucket = buckets.entry(key.clone()).or_insert_with(|| {
            bucket_order.push(key.clone());
            Bucket::default()
        });
        place(arena, test, bucket);
    }

    let workers = workers.max(1);
    let mut groups = Vec::new();
    for key in bucket_order {
        let bucket = buckets.remove(&key).expect("bucket just inserted");
        let (worker_hash, require_file) = key;

        if !bucket.general.is_empty() {
            groups.push(make_group(&worker_hash, &require_file, bucket.general, watch_mode));
        }
        for suite_id in &bucket.parallel_order {
            if let Some(tests) = bucket.parallel.get(suite_id) {
                if !tests.is_empty() {
                    groups.push(make_group(&worker_hash, &require_file, tests.clone(), watch_mode));
                }
            }
        }
        if !bucket.parallel_with_hooks.is_empty() {
            let chunk_size = bucket.parallel_with_hooks.len().div_ceil(workers).max(1);
            for chunk in bucket.parallel_with_hooks.chunks(chunk_size) {
                groups.push(make_group(&worker_hash, &require_file, chunk.to_vec(), watch_mode));
            }
        }
    }
    groups
}

fn make_group(worker_hash: &str, require_file: &std::path::Path, tests: Vec<TestCase>, watch_mode: bool) -> TestGroup {
    let run = tests.first().map(|t| t.run).unwrap_or_default();
    TestGroup {
        worker_hash: worker_hash.to_string(),
        require_file: require_file.to_path_buf(),
        repeat_each_index: tests.first().map(|t| t.repeat_each_index).unwrap_or(0),
        project_id: tests.first().map(|t| t.project_id.clone()).unwrap_or_default(),
        run,
        tests,
        watch_mode,
    }
}

fn place(arena: &SuiteArena, test: &TestCase, bucket: &mut Bucket) {
    let mut inside_parallel = false;
    let mut outermost_serial: Option<SuiteId> = None;
    let mut has_all_hooks = false;

    for ancestor_id in arena.ancestors(test.parent) {
        let ancestor = arena.get(ancestor_id);
        match ancestor.parallel_mode {
            ParallelMode::Parallel => inside_parallel = true,
            ParallelMode::Serial => outermost_serial = Some(ancestor_id),
            ParallelMode::Default => {}
        }
        if ancestor
            .hooks
            .iter()
            .any(|h| matches!(h, HookKind::BeforeAll | HookKind::AfterAll))
        {
            has_all_hooks = true;
        }
    }

    if !inside_parallel {
        bucket.general.push(test.clone());
    } else if has_all_hooks && outermost_serial.is_none() {
        bucket.parallel_with_hooks.push(test.clone());
    } else {
        let key = outermost_serial.unwrap_or(test.parent);
        if !bucket.parallel.contains_key(&key) {
            bucket.parallel_order.push(key);
        }
        bucket.parallel.entry(key).or_default().push(test.clone());
    }
}

/// `true` iff every test in `group` shares `(workerHash, requireFile,
/// repeatEachIndex, projectId)` — the invariant grouping is required to
/// preserve.
pub fn group_purity_holds(group: &TestGroup) -> bool {
    group.tests.iter().all(|t| {
        t.worker_hash == group.worker_hash
            && t.require_file == group.require_file
            && t.repeat_each_index == group.repeat_each_index
            && t.project_id == group.project_id
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, SuiteKind, SuiteNode};
    use std::path::PathBuf;

    fn test_case(title: &str, parent: SuiteId) -> TestCase {
        TestCase {
            id: 0,
            title: title.to_string(),
            location: Some(Location { file: PathBuf::from("f.rs"), line: 1, column: 1 }),
            only: false,
            parent,
            worker_hash: "h1".into(),
            require_file: PathBuf::from("f.rs"),
            repeat_each_index: 0,
            project_id: "chromium".into(),
            run: crate::model::RunMode::Default,
            results: Vec::new(),
        }
    }

    #[test]
    fn general_tests_form_a_single_group() {
        let (mut arena, root) = SuiteArena::root();
        let file = arena.add_child_suite(root, SuiteNode::new_file("f.rs"));
        let mut a = test_case("a", file);
        a.parent = file;
        let mut b = test_case("b", file);
        b.parent = file;
        arena.add_test(file, a);
        arena.add_test(file, b);

        let groups = group_tests(&arena, root, 2, false);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tests.len(), 2);
        assert!(group_purity_holds(&groups[0]));
    }

    #[test]
    fn parallel_tests_get_their_own_group_each() {
        let (mut arena, root) = SuiteArena::root();
        let file = arena.add_child_suite(root, SuiteNode::new_file("f.rs"));
        let mut parallel_node = SuiteNode::new_describe("parallel block");
        parallel_node.parallel_mode = ParallelMode::Parallel;
        let parallel = arena.add_child_suite(file, parallel_node);
        let mut a = test_case("a", parallel);
        a.parent = parallel;
        let mut b = test_case("b", parallel);
        b.parent = parallel;
        arena.add_test(parallel, a);
        arena.add_test(parallel, b);

        let groups = group_tests(&arena, root, 2, false);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.tests.len() == 1));
    }

    #[test]
    fn serial_suite_inside_parallel_shares_one_group() {
        let (mut arena, root) = SuiteArena::root();
        let file = arena.add_child_suite(root, SuiteNode::new_file("f.rs"));
        let mut parallel_node = SuiteNode::new_describe("parallel block");
        parallel_node.parallel_mode = ParallelMode::Parallel;
        let parallel = arena.add_child_suite(file, parallel_node);
        let mut serial_node = SuiteNode::new_describe("serial block");
        serial_node.parallel_mode = ParallelMode::Serial;
        let serial = arena.add_child_suite(parallel, serial_node);
        let mut a = test_case("a", serial);
        a.parent = serial;
        let mut b = test_case("b", serial);
        b.parent = serial;
        arena.add_test(serial, a);
        arena.add_test(serial, b);

        let groups = group_tests(&arena, root, 4, false);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tests.len(), 2);
    }

    #[test]
    fn parallel_with_all_hooks_is_chunked_by_worker_count() {
        let (mut arena, root) = SuiteArena::root();
        let file = arena.add_child_suite(root, SuiteNode::new_file("f.rs"));
        let mut parallel_node = SuiteNode::new_describe("parallel block");
        parallel_node.parallel_mode = ParallelMode::Parallel;
        parallel_node.hooks.push(HookKind::BeforeAll);
        let parallel = arena.add_child_suite(file, parallel_node);
        for i in 0..5 {
            let mut t = test_case(&format!("t{i}"), parallel);
            t.parent = parallel;
            arena.add_test(parallel, t);
        }

        let groups = group_tests(&arena, root, 2, false);
        // ceil(5/2) = 3 -> chunks of [3, 2]
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].tests.len(), 3);
        assert_eq!(groups[1].tests.len(), 2);
    }

    #[test]
    fn suite_kind_of_file_node_is_file() {
        let (arena, root) = SuiteArena::root();
        let _ = root;
        assert_eq!(arena.get(root).kind, SuiteKind::Root);
    }
}
