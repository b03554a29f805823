//! Three-way merge of whole repository states, namespace by namespace.

use std::collections::BTreeSet;

use plait_diff::{LcsCache, Tokenize};
use plait_types::{ApplicationKvState, MergeDirection};
use tracing::debug;

use crate::sequence::merge_sequence_with_outcome;

/// Result of merging two repository states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateMerge {
    pub state: ApplicationKvState,
    /// Namespaces whose merge depended on direction (`store.<plugin>` for
    /// plugin stores). Empty for a clean merge.
    pub conflicts: Vec<String>,
}

impl StateMerge {
    pub fn is_conflicted(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merge `from` into `into` relative to their common `origin`.
pub fn merge_states(
    cache: &LcsCache,
    origin: &ApplicationKvState,
    from: &ApplicationKvState,
    into: &ApplicationKvState,
    direction: MergeDirection,
) -> StateMerge {
    let mut conflicts = Vec::new();
    let mut state = ApplicationKvState {
        description: merge_namespace(
            cache,
            "description",
            (
                origin.description.as_slice(),
                from.description.as_slice(),
                into.description.as_slice(),
            ),
            direction,
            &mut conflicts,
        ),
        licenses: merge_namespace(
            cache,
            "licenses",
            (
                origin.licenses.as_slice(),
                from.licenses.as_slice(),
                into.licenses.as_slice(),
            ),
            direction,
            &mut conflicts,
        ),
        plugins: merge_namespace(
            cache,
            "plugins",
            (
                origin.plugins.as_slice(),
                from.plugins.as_slice(),
                into.plugins.as_slice(),
            ),
            direction,
            &mut conflicts,
        ),
        binaries: merge_namespace(
            cache,
            "binaries",
            (
                origin.binaries.as_slice(),
                from.binaries.as_slice(),
                into.binaries.as_slice(),
            ),
            direction,
            &mut conflicts,
        ),
        store: Default::default(),
    };

    let plugins: BTreeSet<&String> = origin
        .store
        .keys()
        .chain(from.store.keys())
        .chain(into.store.keys())
        .collect();
    for plugin in plugins {
        let merged = merge_namespace(
            cache,
            &format!("store.{plugin}"),
            (
                origin.plugin_store(plugin),
                from.plugin_store(plugin),
                into.plugin_store(plugin),
            ),
            direction,
            &mut conflicts,
        );
        state.set_plugin_store(plugin.clone(), merged);
    }

    if !conflicts.is_empty() {
        debug!(?conflicts, %direction, "state merge depends on direction");
    }
    StateMerge { state, conflicts }
}

fn merge_namespace<T: Tokenize + Clone>(
    cache: &LcsCache,
    name: &str,
    (origin, from, into): (&[T], &[T], &[T]),
    direction: MergeDirection,
    conflicts: &mut Vec<String>,
) -> Vec<T> {
    let outcome = merge_sequence_with_outcome(cache, origin, from, into, direction);
    if outcome.conflicted {
        conflicts.push(name.to_string());
    }
    outcome.merged
}

/// Returns `true` if `from` and `into` merge the same way in both directions.
pub fn can_auto_merge_states(
    cache: &LcsCache,
    origin: &ApplicationKvState,
    from: &ApplicationKvState,
    into: &ApplicationKvState,
) -> bool {
    !merge_states(cache, origin, from, into, MergeDirection::Yours).is_conflicted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plait_types::DiffElement;
    use serde_json::json;

    fn element(key: &str, value: i64) -> DiffElement {
        DiffElement::new(key, json!(value))
    }

    fn base() -> ApplicationKvState {
        let mut state = ApplicationKvState::empty();
        state.set_description_text("line one\nline two");
        state.plugins = vec![DiffElement::new("palette", json!("0.1.0"))];
        state.set_plugin_store("palette", vec![element("a", 1), element("b", 2)]);
        state
    }

    #[test]
    fn independent_namespaces_merge_cleanly() {
        let cache = LcsCache::default();
        let origin = base();

        let mut from = origin.clone();
        from.set_description_text("line one\nline two\nline three");

        let mut into = origin.clone();
        into.set_plugin_store("palette", vec![element("a", 1), element("b", 2), element("c", 3)]);

        let merged = merge_states(&cache, &origin, &from, &into, MergeDirection::Yours);
        assert!(!merged.is_conflicted());
        assert_eq!(merged.state.description.len(), 3);
        assert_eq!(merged.state.plugin_store("palette").len(), 3);
        assert!(can_auto_merge_states(&cache, &origin, &from, &into));
    }

    #[test]
    fn competing_edits_conflict_in_named_namespace() {
        let cache = LcsCache::default();
        let origin = base();

        let mut from = origin.clone();
        from.set_plugin_store("palette", vec![element("a", 10), element("b", 2)]);
        let mut into = origin.clone();
        into.set_plugin_store("palette", vec![element("a", 20), element("b", 2)]);

        let yours = merge_states(&cache, &origin, &from, &into, MergeDirection::Yours);
        let theirs = merge_states(&cache, &origin, &from, &into, MergeDirection::Theirs);
        assert_eq!(yours.conflicts, vec!["store.palette".to_string()]);
        assert_ne!(yours.state, theirs.state);
        assert_eq!(yours.state.plugin_store("palette")[0], element("a", 10));
        assert_eq!(theirs.state.plugin_store("palette")[0], element("a", 20));
        assert!(!can_auto_merge_states(&cache, &origin, &from, &into));
    }

    #[test]
    fn plugin_added_on_one_side_is_kept() {
        let cache = LcsCache::default();
        let origin = base();
        let mut from = origin.clone();
        from.set_plugin_store("icons", vec![element("x", 1)]);

        let merged = merge_states(&cache, &origin, &from, &origin, MergeDirection::Theirs);
        assert_eq!(merged.state, from);
    }

    #[test]
    fn plugin_removed_on_one_side_is_dropped() {
        let cache = LcsCache::default();
        let origin = base();
        let mut into = origin.clone();
        into.set_plugin_store("palette", vec![]);
        let mut from = origin.clone();
        from.binaries.push("logo.png".into());

        let merged = merge_states(&cache, &origin, &from, &into, MergeDirection::Yours);
        assert!(!merged.is_conflicted());
        assert!(merged.state.store.is_empty());
        assert_eq!(merged.state.binaries, vec!["logo.png".to_string()]);
    }
}
