//! Materialized repository state and the per-namespace diff between states.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::{Diff, DiffElement};
use crate::sha::Sha;

/// A materialized snapshot of a repository at some commit.
///
/// Each namespace is an ordered sequence. `store` holds one sequence per
/// plugin, already flattened by the schema layer. A plugin whose sequence is
/// empty is absent from `store` rather than present with an empty vec, so two
/// states describing the same data always compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationKvState {
    /// Repository description, one entry per line of text.
    pub description: Vec<String>,
    pub licenses: Vec<DiffElement>,
    /// Installed plugins, keyed by plugin name with the version as value.
    pub plugins: Vec<DiffElement>,
    /// Content references of binary attachments.
    pub binaries: Vec<String>,
    pub store: BTreeMap<String, Vec<DiffElement>>,
}

impl ApplicationKvState {
    /// The state of a repository with no commits.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if every namespace is empty.
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.licenses.is_empty()
            && self.plugins.is_empty()
            && self.binaries.is_empty()
            && self.store.is_empty()
    }

    /// The flattened records of one plugin (empty if the plugin has none).
    pub fn plugin_store(&self, plugin: &str) -> &[DiffElement] {
        self.store.get(plugin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a plugin's records, dropping the entry when `elements` is empty.
    pub fn set_plugin_store(&mut self, plugin: impl Into<String>, elements: Vec<DiffElement>) {
        let plugin = plugin.into();
        if elements.is_empty() {
            self.store.remove(&plugin);
        } else {
            self.store.insert(plugin, elements);
        }
    }

    /// Set the description from a block of text, split on line breaks.
    pub fn set_description_text(&mut self, text: &str) {
        self.description = text.lines().map(str::to_string).collect();
    }

    pub fn description_text(&self) -> String {
        self.description.join("\n")
    }
}

/// The change between two [`ApplicationKvState`]s, one [`Diff`] per namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDiff {
    pub description: Diff<String>,
    pub licenses: Diff<DiffElement>,
    pub plugins: Diff<DiffElement>,
    pub binaries: Diff<String>,
    /// Per-plugin diffs. Plugins with no change are omitted.
    pub store: BTreeMap<String, Diff<DiffElement>>,
}

impl StateDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no namespace changed.
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.licenses.is_empty()
            && self.plugins.is_empty()
            && self.binaries.is_empty()
            && self.store.values().all(Diff::is_empty)
    }

    /// Total number of add and remove entries across all namespaces.
    pub fn change_count(&self) -> usize {
        self.description.len()
            + self.licenses.len()
            + self.plugins.len()
            + self.binaries.len()
            + self.store.values().map(Diff::len).sum::<usize>()
    }

    /// Names of plugins whose store changed, in sorted order.
    pub fn changed_plugins(&self) -> Vec<&str> {
        self.store
            .iter()
            .filter(|(_, diff)| !diff.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Single-slot cache of the materialized state of a repository's head commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotCheckpoint {
    pub sha: Sha,
    pub state: ApplicationKvState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_plugin_store_is_removed() {
        let mut state = ApplicationKvState::empty();
        state.set_plugin_store("palette", vec![DiffElement::new("$(palette).colors", json!({}))]);
        assert_eq!(state.plugin_store("palette").len(), 1);

        state.set_plugin_store("palette", vec![]);
        assert!(state.store.is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn missing_plugin_reads_as_empty() {
        let state = ApplicationKvState::empty();
        assert!(state.plugin_store("icons").is_empty());
    }

    #[test]
    fn description_text_roundtrip() {
        let mut state = ApplicationKvState::empty();
        state.set_description_text("first line\nsecond line");
        assert_eq!(state.description, vec!["first line", "second line"]);
        assert_eq!(state.description_text(), "first line\nsecond line");
    }

    #[test]
    fn state_diff_counts_changes() {
        let mut diff = StateDiff::new();
        assert!(diff.is_empty());

        diff.description.add.insert(0, "hello".into());
        let mut plugin = Diff::new();
        plugin.remove.insert(2, DiffElement::new("k", json!(1)));
        diff.store.insert("text".into(), plugin);
        diff.store.insert("untouched".into(), Diff::new());

        assert!(!diff.is_empty());
        assert_eq!(diff.change_count(), 2);
        assert_eq!(diff.changed_plugins(), vec!["text"]);
    }
}
