//! State-level diff: compare two materialized repository states.
//!
//! Each namespace of an [`ApplicationKvState`] is diffed as its own sequence.
//! The `store` namespace is diffed per plugin over the union of plugin names,
//! treating a missing plugin as an empty sequence.

use std::collections::BTreeSet;

use plait_types::{ApplicationKvState, StateDiff};

use crate::error::DiffResult;
use crate::lcs::LcsCache;
use crate::sequence::{apply_diff, get_diff};

/// Compute the diff between two states.
pub fn diff_states(
    cache: &LcsCache,
    before: &ApplicationKvState,
    after: &ApplicationKvState,
) -> StateDiff {
    let plugins: BTreeSet<&String> = before.store.keys().chain(after.store.keys()).collect();

    let store = plugins
        .into_iter()
        .filter_map(|plugin| {
            let diff = get_diff(cache, before.plugin_store(plugin), after.plugin_store(plugin));
            (!diff.is_empty()).then(|| (plugin.clone(), diff))
        })
        .collect();

    StateDiff {
        description: get_diff(cache, &before.description, &after.description),
        licenses: get_diff(cache, &before.licenses, &after.licenses),
        plugins: get_diff(cache, &before.plugins, &after.plugins),
        binaries: get_diff(cache, &before.binaries, &after.binaries),
        store,
    }
}

/// Apply a state diff, namespace by namespace.
pub fn apply_state_diff(
    diff: &StateDiff,
    state: &ApplicationKvState,
) -> DiffResult<ApplicationKvState> {
    let mut out = ApplicationKvState {
        description: apply_diff(&diff.description, &state.description)
            .map_err(|e| e.in_namespace("description"))?,
        licenses: apply_diff(&diff.licenses, &state.licenses)
            .map_err(|e| e.in_namespace("licenses"))?,
        plugins: apply_diff(&diff.plugins, &state.plugins)
            .map_err(|e| e.in_namespace("plugins"))?,
        binaries: apply_diff(&diff.binaries, &state.binaries)
            .map_err(|e| e.in_namespace("binaries"))?,
        store: state.store.clone(),
    };

    for (plugin, plugin_diff) in &diff.store {
        if plugin_diff.is_empty() {
            continue;
        }
        let elements = apply_diff(plugin_diff, state.plugin_store(plugin))
            .map_err(|e| e.in_namespace(format!("store.{plugin}")))?;
        out.set_plugin_store(plugin.clone(), elements);
    }

    Ok(out)
}
