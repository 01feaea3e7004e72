// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the graph invariants: any accepted configuration has
//! unique names, resolvable parents, matching edge extensions, and a
//! parents-before-children order.

use super::*;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct GenTask {
    name: String,
    parent: Option<usize>,
    input_ext: String,
    output_ext: String,
}

/// Random forest: each task may hang off any earlier task, with edge
/// extensions forced to agree.
fn forest(max: usize) -> impl Strategy<Value = Vec<GenTask>> {
    proptest::collection::vec(proptest::option::of(0usize..max), 1..max).prop_map(|parents| {
        let exts = [".out", ".json", ".vec", ".csv"];
        let mut tasks: Vec<GenTask> = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            let parent = parent.filter(|p| *p < i);
            let input_ext = match parent {
                Some(p) => tasks[p].output_ext.clone(),
                None => ".txt".to_string(),
            };
            tasks.push(GenTask {
                name: format!("task{i}"),
                parent,
                input_ext,
                output_ext: exts[i % exts.len()].to_string(),
            });
        }
        tasks
    })
}

fn to_yaml(tasks: &[GenTask]) -> String {
    let mut yaml = String::from("tasks:\n");
    for task in tasks {
        yaml.push_str(&format!(
            "  - name: {}\n    kind: local\n    library: echo\n    input_ext: {}\n    output_ext: {}\n",
            task.name, task.input_ext, task.output_ext
        ));
        if let Some(p) = task.parent {
            yaml.push_str(&format!("    depends_on: task{p}\n"));
        }
    }
    yaml
}

proptest! {
    #[test]
    fn accepted_forests_satisfy_graph_invariants(tasks in forest(8)) {
        let config = PipelineConfig::from_yaml(&to_yaml(&tasks)).unwrap();
        let ordered = config.tasks();

        // Names unique.
        let mut names: Vec<_> = ordered.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), ordered.len());

        // Parents resolve and edges agree on extensions.
        let by_name: HashMap<_, _> = ordered.iter().map(|t| (t.name.as_str(), t)).collect();
        for task in ordered {
            if let Some(parent) = task.depends_on.as_deref() {
                let parent = by_name.get(parent).copied();
                prop_assert!(parent.is_some());
                if let Some(parent) = parent {
                    prop_assert_eq!(&parent.output_ext, &task.input_ext);
                }
            }
        }

        // Topological order: every parent appears before its child.
        let rank: HashMap<_, _> = ordered
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();
        for task in ordered {
            if let Some(parent) = task.depends_on.as_deref() {
                prop_assert!(rank[parent] < rank[task.name.as_str()]);
            }
        }

        // All roots share the pipeline input extension.
        for root in config.root_tasks() {
            prop_assert_eq!(root.input_ext.as_str(), config.root_input_ext());
        }
    }

    #[test]
    fn duplicating_any_name_is_rejected(tasks in forest(6), pick in any::<prop::sample::Index>()) {
        let mut tasks = tasks;
        let dup = pick.index(tasks.len());
        let mut copy = tasks[dup].clone();
        copy.parent = None;
        copy.input_ext = ".txt".to_string();
        tasks.push(copy);

        let err = PipelineConfig::from_yaml(&to_yaml(&tasks)).unwrap_err();
        prop_assert!(matches!(err, ConfigError::DuplicateName(_)));
    }

    #[test]
    fn breaking_any_edge_extension_is_rejected(tasks in forest(6)) {
        let mut tasks = tasks;
        let Some(child) = tasks.iter().position(|t| t.parent.is_some()) else {
            // No edges in this sample; nothing to break.
            return Ok(());
        };
        tasks[child].input_ext = ".mismatch_only".to_string();

        let err = PipelineConfig::from_yaml(&to_yaml(&tasks)).unwrap_err();
        prop_assert!(matches!(err, ConfigError::ExtMismatch { .. }));
    }
}
