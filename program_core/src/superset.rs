//! Superset grouping.
//!
//! A superset is not a collection of its own: entries in the same day that
//! share a `supersetId` form one group. The first member in day order is the
//! group's anchor. Members are allowed to be scattered through the day;
//! callers get a report of such groups but nothing here rejects them.

use crate::types::Day;
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Caller-held "superset mode" toggle
///
/// While active, every exercise the caller adds should carry
/// [`current`](Self::current) as its superset id. The toggle itself is
/// never persisted.
#[derive(Clone, Debug, Default)]
pub struct SupersetMode {
    active: Option<String>,
    last_issued: Option<String>,
}

impl SupersetMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new group with a time-based id (`superset-{unix millis}`)
    pub fn enter(&mut self) -> &str {
        let mut millis = Utc::now().timestamp_millis();
        let mut id = format!("superset-{}", millis);
        while self.last_issued.as_deref() == Some(id.as_str()) {
            millis += 1;
            id = format!("superset-{}", millis);
        }
        self.enter_with(id)
    }

    /// Start a new group with an explicit id
    pub fn enter_with(&mut self, group_id: impl Into<String>) -> &str {
        let group_id = group_id.into();
        tracing::debug!("Entering superset mode with group {}", group_id);
        self.last_issued = Some(group_id.clone());
        self.active.insert(group_id)
    }

    /// Leave superset mode; subsequent exercises are standalone
    pub fn exit(&mut self) -> Option<String> {
        self.active.take()
    }

    /// Toggle like the editor button: exit if active, otherwise enter
    pub fn toggle(&mut self) -> Option<&str> {
        if self.active.is_some() {
            self.exit();
            None
        } else {
            Some(self.enter())
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

/// Grouping information for one entry, in day order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupersetSlot {
    pub entry_id: String,
    pub group_id: Option<String>,
    /// First member of its group in day order
    pub is_anchor: bool,
}

/// Annotate each entry of a day with its group and anchor flag
pub fn superset_groups(day: &Day) -> Vec<SupersetSlot> {
    let mut seen: HashSet<&str> = HashSet::new();
    day.exercises
        .iter()
        .map(|entry| {
            let group = entry.superset_id.as_deref();
            let is_anchor = group.map(|g| seen.insert(g)).unwrap_or(false);
            SupersetSlot {
                entry_id: entry.id.clone(),
                group_id: group.map(str::to_string),
                is_anchor,
            }
        })
        .collect()
}

/// Indices of a group's members, in day order
pub fn group_members(day: &Day, group_id: &str) -> Vec<usize> {
    day.exercises
        .iter()
        .enumerate()
        .filter(|(_, e)| e.superset_id.as_deref() == Some(group_id))
        .map(|(i, _)| i)
        .collect()
}

/// Groups whose members are not all adjacent, in order of first appearance
pub fn non_contiguous_groups(day: &Day) -> Vec<String> {
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for (index, entry) in day.exercises.iter().enumerate() {
        if let Some(group) = entry.superset_id.as_deref() {
            positions
                .entry(group)
                .or_insert_with(|| {
                    order.push(group);
                    Vec::new()
                })
                .push(index);
        }
    }

    order
        .into_iter()
        .filter(|group| {
            positions[group]
                .windows(2)
                .any(|pair| pair[1] != pair[0] + 1)
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExerciseEntry, Reps};

    fn entry(id: &str, group: Option<&str>) -> ExerciseEntry {
        ExerciseEntry {
            id: id.into(),
            exercise_id: format!("ex-{}", id),
            exercise_name: id.to_uppercase(),
            sets: 3,
            reps: Reps::Fixed(10),
            rest: 60,
            superset_id: group.map(str::to_string),
            category_filter: None,
            notes: None,
            has_variable_reps: None,
        }
    }

    fn day(entries: Vec<ExerciseEntry>) -> Day {
        Day {
            id: "d1".into(),
            name: "Day 1".into(),
            exercises: entries,
        }
    }

    #[test]
    fn test_only_first_member_is_anchor() {
        let d = day(vec![
            entry("a", Some("S1")),
            entry("b", Some("S1")),
            entry("c", None),
        ]);
        let slots = superset_groups(&d);

        assert!(slots[0].is_anchor);
        assert!(!slots[1].is_anchor);
        assert!(!slots[2].is_anchor);
        assert_eq!(slots[1].group_id.as_deref(), Some("S1"));
        assert_eq!(slots[2].group_id, None);
    }

    #[test]
    fn test_scattered_group_is_tolerated() {
        let d = day(vec![
            entry("a", Some("S1")),
            entry("b", Some("S2")),
            entry("c", Some("S1")),
            entry("d", Some("S2")),
            entry("e", Some("S3")),
            entry("f", Some("S3")),
        ]);
        let anchors: Vec<_> = superset_groups(&d)
            .into_iter()
            .filter(|s| s.is_anchor)
            .map(|s| s.entry_id)
            .collect();

        assert_eq!(anchors, vec!["a", "b", "e"]);
        assert_eq!(group_members(&d, "S1"), vec![0, 2]);
        assert_eq!(non_contiguous_groups(&d), vec!["S1", "S2"]);
    }

    #[test]
    fn test_contiguous_groups_not_reported() {
        let d = day(vec![entry("a", Some("S1")), entry("b", Some("S1")), entry("c", None)]);
        assert!(non_contiguous_groups(&d).is_empty());
        assert!(superset_groups(&day(vec![])).is_empty());
    }

    #[test]
    fn test_mode_enter_and_exit() {
        let mut mode = SupersetMode::new();
        assert!(!mode.is_active());

        let first = mode.enter().to_string();
        assert!(first.starts_with("superset-"));
        assert_eq!(mode.current(), Some(first.as_str()));

        assert_eq!(mode.exit(), Some(first.clone()));
        assert_eq!(mode.current(), None);

        let second = mode.enter().to_string();
        assert_ne!(first, second);
    }

    #[test]
    fn test_mode_toggle() {
        let mut mode = SupersetMode::new();
        assert!(mode.toggle().is_some());
        assert!(mode.is_active());
        assert!(mode.toggle().is_none());
        assert!(!mode.is_active());

        mode.enter_with("superset-fixed");
        assert_eq!(mode.current(), Some("superset-fixed"));
    }
}
