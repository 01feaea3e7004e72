// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the staging-chain laws: pure filters yield subsets
//! in any order, limits bound the result length, sorting permutes.

use super::*;
use crate::step::SortKey;
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn state_for(dir: &Path, staged: usize) -> PipelineState {
    PipelineState {
        waiting: 0,
        staged,
        completed: 0,
        failed: 0,
        input_dir: dir.to_path_buf(),
        output_dir: dir.to_path_buf(),
    }
}

/// A pure filter step (no reordering, no truncation, no delegation).
fn filter_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u64..4096).prop_map(|bytes| Step::MinSize { bytes }),
        (1u64..4096).prop_map(|bytes| Step::MaxSize { bytes }),
        (0.001f64..60.0).prop_map(|seconds| Step::MinAge { seconds }),
        "[a-z]{1,3}".prop_map(|pattern| Step::FilenameMatch { pattern }),
        Just(Step::CompanionFile { ext: ".meta".to_string() }),
    ]
}

fn candidate_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("cand{i:02}.txt"));
            std::fs::write(&path, vec![b'x'; (i * 37) % 512]).unwrap();
            path
        })
        .collect()
}

proptest! {
    #[test]
    fn filters_yield_subsets_in_any_order(
        steps in proptest::collection::vec(filter_step(), 0..5),
        count in 0usize..12,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let candidates = candidate_files(dir.path(), count);
        let state = state_for(dir.path(), 0);

        let chain = Chain { steps };
        let result = chain.apply(candidates.clone(), &state);

        let input: HashSet<_> = candidates.iter().collect();
        prop_assert!(result.iter().all(|f| input.contains(f)));
        prop_assert!(result.len() <= candidates.len());
    }

    #[test]
    fn limit_steps_bound_result_length(
        n in 1usize..10,
        staged in 0usize..10,
        count in 0usize..12,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let candidates = candidate_files(dir.path(), count);
        let state = state_for(dir.path(), staged);

        let batch = Chain { steps: vec![Step::MaxBatch { count: n }] };
        prop_assert!(batch.apply(candidates.clone(), &state).len() <= n);

        let cap = Chain { steps: vec![Step::MaxStaged { count: n }] };
        prop_assert!(cap.apply(candidates, &state).len() <= n);
    }

    #[test]
    fn sort_by_is_a_permutation(
        key in prop_oneof![Just(SortKey::Name), Just(SortKey::Size), Just(SortKey::Mtime)],
        reverse in any::<bool>(),
        count in 0usize..12,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let candidates = candidate_files(dir.path(), count);
        let state = state_for(dir.path(), 0);

        let chain = Chain { steps: vec![Step::SortBy { key, reverse }] };
        let result = chain.apply(candidates.clone(), &state);

        let mut sorted_input = candidates;
        let mut sorted_result = result;
        sorted_input.sort();
        sorted_result.sort();
        prop_assert_eq!(sorted_input, sorted_result);
    }
}
