//! Shard filter (§4.5): retains only groups belonging to the current shard,
//! always preserving groups whose project is marked `run = 'always'`.

use std::collections::HashSet;

use crate::config::Shard;
use crate::model::{SuiteArena, SuiteId, TestGroup};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ShardRange {
    /// Inclusive.
    pub from: usize,
    /// Exclusive.
    pub to: usize,
}

/// `shardSize = floor(total / shard.total)`; the first `extraOne` shards (by
/// 0-based index) receive one extra test.
pub fn compute_shard_range(shard: Shard, shardable_total: usize) -> ShardRange {
    let total = shard.total.max(1) as usize;
    let shard_size = shardable_total / total;
    let extra_one = shardable_total - shard_size * total;
    let k = (shard.current.max(1) - 1) as usize;
    let from = shard_size * k + extra_one.min(k);
    let to = from + shard_size + if k < extra_one { 1 } else { 0 };
    ShardRange { from, to }
}

pub fn shardable_total(stages: &[Vec<TestGroup>]) -> usize {
    stages
        .iter()
        .flatten()
        .filter(|g| !g.is_always())
        .map(|g| g.test_count())
        .sum()
}

/// Walks stages in order maintaining a running counter of shardable tests
/// seen so far; a shardable group is retained iff the counter's value
/// *before* the group lies within `[range.from, range.to)`. Always-run
/// groups are retained unconditionally and never advance the counter. Empty
/// stages are dropped.
pub fn filter_stage_groups(stages: Vec<Vec<TestGroup>>, shard: Option<Shard>) -> Vec<Vec<TestGroup>> {
    let Some(shard) = shard else { return stages };
    let total = shardable_total(&stages);
    let range = compute_shard_range(shard, total);

    let mut counter = 0usize;
    let mut out = Vec::new();
    for stage_groups in stages {
        let mut kept = Vec::new();
        for group in stage_groups {
            if group.is_always() {
                kept.push(group);
                continue;
            }
            let start = counter;
            counter += group.test_count();
            if start >= range.from && start < range.to {
                kept.push(group);
            }
        }
        if !kept.is_empty() {
            out.push(kept);
        }
    }
    out
}

/// Prunes the reported suite tree down to the tests whose group survived
/// sharding, matching by `TestCase::id`.
pub fn prune_suite_tree_to_retained(arena: &mut SuiteArena, root: SuiteId, retained_stages: &[Vec<TestGroup>]) {
    let retained: HashSet<u64> = retained_stages
        .iter()
        .flatten()
        .flat_map(|g| g.tests.iter().map(|t| t.id))
        .collect();
    arena.retain_tests(root, &mut |t| retained.contains(&t.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn group(n: usize, always: bool) -> TestGroup {
        use crate::model::{Location, RunMode, TestCase};
        let tests = (0..n)
            .map(|i| TestCase {
                id: i as u64,
                title: format!("t{i}"),
                location: Some(Location { file: PathBuf::from("f.rs"), line: 1, column: 1 }),
                only: false,
                parent: 0,
                worker_hash: "h".into(),
                require_file: PathBuf::from("f.rs"),
                repeat_each_index: 0,
                project_id: "p".into(),
                run: if always { RunMode::Always } else { RunMode::Default },
                results: Vec::new(),
            })
            .collect();
        TestGroup {
            worker_hash: "h".into(),
            require_file: PathBuf::from("f.rs"),
            repeat_each_index: 0,
            project_id: "p".into(),
            run: if always { RunMode::Always } else { RunMode::Default },
            tests,
            watch_mode: false,
        }
    }

    #[test]
    fn even_split_across_two_shards() {
        // 10 shardable tests split across shard 1/2 and 2/2: 5 and 5.
        let stages = vec![vec![group(10, false)]];
        let range1 = compute_shard_range(Shard { current: 1, total: 2 }, shardable_total(&stages));
        let range2 = compute_shard_range(Shard { current: 2, total: 2 }, shardable_total(&stages));
        assert_eq!(range1, ShardRange { from: 0, to: 5 });
        assert_eq!(range2, ShardRange { from: 5, to: 10 });
    }

    #[test]
    fn extra_tests_go_to_earlier_shards() {
        // 7 tests over 2 shards: shard 1 gets 4, shard 2 gets 3.
        let total = 7;
        let range1 = compute_shard_range(Shard { current: 1, total: 2 }, total);
        let range2 = compute_shard_range(Shard { current: 2, total: 2 }, total);
        assert_eq!(range1, ShardRange { from: 0, to: 4 });
        assert_eq!(range2, ShardRange { from: 4, to: 7 });
    }

    #[test]
    fn always_groups_survive_every_shard_without_advancing_counter() {
        // Groups are the atomic sharding unit: a group is retained whole iff
        // the counter's value *before* it falls in range, so counts only
        // split cleanly at group boundaries.
        let stages = vec![vec![group(4, false), group(1, true)]];
        let filtered = filter_stage_groups(stages, Some(Shard { current: 1, total: 2 }));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].len(), 2);
        let total_tests: usize = filtered[0].iter().map(|g| g.test_count()).sum();
        assert_eq!(total_tests, 5);
    }

    #[test]
    fn empty_stages_are_dropped_after_filtering() {
        let stages = vec![vec![group(4, false)], vec![group(4, false)]];
        // shard 1/2 keeps only stage 0's tests (indices 0..4 fall in [0,4))
        let filtered = filter_stage_groups(stages, Some(Shard { current: 1, total: 2 }));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn no_shard_passes_through_unchanged() {
        let stages = vec![vec![group(4, false)]];
        let filtered = filter_stage_groups(stages.clone(), None);
        assert_eq!(filtered.len(), stages.len());
    }
}
