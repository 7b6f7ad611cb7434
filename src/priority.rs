//! Listener subscription priorities
//!
//! Holds the ranked, enabled/disabled set of masjid subscriptions and
//! answers which live masjid the listener should tune to. Persisted to the
//! group registry via [`PriorityRegistry::export`].

use std::collections::HashSet;

/// One ranked subscription
///
/// Field order matters: the derived ordering compares priority first
/// (lower value = higher precedence), then breaks ties lexicographically by
/// group id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupPriority {
    /// Rank; lower wins
    pub priority: i32,
    /// Masjid identifier
    pub group_id: String,
    /// Disabled entries are skipped during selection but kept in the list
    pub enabled: bool,
}

/// Ordered set of subscriptions, at most one entry per group id
#[derive(Debug, Clone, Default)]
pub struct PriorityRegistry {
    entries: Vec<GroupPriority>,
}

impl PriorityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a subscription: any existing entry for the id is replaced and
    /// the list re-sorted.
    pub fn set_priority(&mut self, group_id: &str, priority: i32, enabled: bool) {
        self.entries.retain(|e| e.group_id != group_id);
        self.entries.push(GroupPriority {
            priority,
            group_id: group_id.to_string(),
            enabled,
        });
        self.entries.sort();
    }

    /// Toggle an existing entry in place; no-op when the id is absent.
    ///
    /// Priority and id are unchanged, so the sort order holds.
    pub fn set_enabled(&mut self, group_id: &str, enabled: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.group_id == group_id) {
            entry.enabled = enabled;
        }
    }

    /// First enabled entry, in rank order, whose masjid is currently live
    pub fn highest_priority_live(&self, live_group_ids: &HashSet<String>) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.enabled && live_group_ids.contains(&e.group_id))
            .map(|e| e.group_id.as_str())
    }

    /// Entries in sort order, for persistence to the profile store
    pub fn export(&self) -> Vec<GroupPriority> {
        self.entries.clone()
    }

    /// Replace the whole registry, e.g. from a stored profile
    ///
    /// The first occurrence of each group id wins.
    pub fn import(&mut self, entries: Vec<GroupPriority>) {
        self.entries.clear();
        let mut seen = HashSet::new();
        for entry in entries {
            if seen.insert(entry.group_id.clone()) {
                self.entries.push(entry);
            }
        }
        self.entries.sort();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn export_orders_by_priority_then_group_id() {
        let mut registry = PriorityRegistry::new();
        registry.set_priority("b", 2, true);
        registry.set_priority("c", 1, true);
        registry.set_priority("a", 1, true);

        let order: Vec<(String, i32)> = registry
            .export()
            .into_iter()
            .map(|e| (e.group_id, e.priority))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a".to_string(), 1),
                ("c".to_string(), 1),
                ("b".to_string(), 2)
            ]
        );
    }

    #[test]
    fn upsert_replaces_instead_of_duplicating() {
        let mut registry = PriorityRegistry::new();
        registry.set_priority("x", 5, true);
        registry.set_priority("x", 1, true);

        assert_eq!(registry.len(), 1);
        let entries = registry.export();
        assert_eq!(entries[0].group_id, "x");
        assert_eq!(entries[0].priority, 1);
    }

    #[test]
    fn selection_skips_offline_and_disabled() {
        let mut registry = PriorityRegistry::new();
        registry.set_priority("masjidA", 1, true);
        registry.set_priority("masjidB", 2, true);

        // Nothing live
        assert_eq!(registry.highest_priority_live(&live(&[])), None);

        // Only live entry disabled
        registry.set_enabled("masjidB", false);
        assert_eq!(registry.highest_priority_live(&live(&["masjidB"])), None);
    }

    #[test]
    fn set_enabled_on_absent_id_is_a_noop() {
        let mut registry = PriorityRegistry::new();
        registry.set_priority("a", 1, true);
        registry.set_enabled("ghost", false);
        assert_eq!(registry.len(), 1);
        assert!(registry.export()[0].enabled);
    }

    #[test]
    fn lower_priority_number_wins_once_live() {
        let mut registry = PriorityRegistry::new();
        registry.set_priority("masjidA", 1, true);
        registry.set_priority("masjidB", 2, true);

        assert_eq!(
            registry.highest_priority_live(&live(&["masjidB"])),
            Some("masjidB")
        );
        assert_eq!(
            registry.highest_priority_live(&live(&["masjidA", "masjidB"])),
            Some("masjidA")
        );
    }

    #[test]
    fn import_sorts_and_deduplicates() {
        let mut registry = PriorityRegistry::new();
        registry.import(vec![
            GroupPriority {
                priority: 2,
                group_id: "b".into(),
                enabled: true,
            },
            GroupPriority {
                priority: 1,
                group_id: "a".into(),
                enabled: false,
            },
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.export()[0].group_id, "a");
    }
}
