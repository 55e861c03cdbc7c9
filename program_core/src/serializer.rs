//! Normalization on save and migration on load.
//!
//! Save path: rep strings are parsed into scalars or schemes, the
//! variable-reps flag is recomputed and the upsert payload is assembled.
//!
//! Load path: whatever shape was persisted (including the legacy
//! `sessions` key) is mapped once into the canonical structure, with
//! missing ids filled in. Nothing outside this module knows about the
//! legacy shape.

use crate::editor::EditorSettings;
use crate::ids::IdGenerator;
use crate::types::{
    string_or_number, Cycle, Day, ExerciseEntry, LocalizedText, ProgramStructure, Reps,
};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Reps parsing
// ============================================================================

/// Parse an editing-state rep value into its persisted form
///
/// - `"10,8,6"` → `[10, 8, 6]`; tokens that are not integers are dropped
/// - `"12"` → `12`; an unparseable single value becomes `0`
/// - values outside the `i32` range count as unparseable
/// - numeric values pass through untouched
pub fn parse_reps(reps: &Reps) -> Reps {
    match reps {
        Reps::Raw(raw) if raw.contains(',') => {
            Reps::Scheme(raw.split(',').filter_map(parse_leading_int).collect())
        }
        Reps::Raw(raw) => Reps::Fixed(parse_leading_int(raw).unwrap_or(0)),
        other => other.clone(),
    }
}

/// True only for a scheme with more than one value
pub fn has_variable_reps(reps: &Reps) -> bool {
    matches!(reps, Reps::Scheme(values) if values.len() > 1)
}

/// Parse the leading integer of a token, ignoring surrounding whitespace
/// and any trailing text (`" 8 reps"` → 8)
fn parse_leading_int(token: &str) -> Option<i32> {
    let token = token.trim();
    let (sign, digits) = match token.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, token.strip_prefix('+').unwrap_or(token)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let value = digits[..end].parse::<i64>().ok()?;
    i32::try_from(sign * value).ok()
}

// ============================================================================
// Normalization and derivation
// ============================================================================

/// Parse reps and recompute the derived flag on one entry
pub fn normalize_entry(entry: &mut ExerciseEntry) {
    entry.reps = parse_reps(&entry.reps);
    entry.has_variable_reps = Some(has_variable_reps(&entry.reps));
}

/// Normalize every entry in the structure
pub fn normalize_structure(structure: &mut ProgramStructure) {
    for entry in structure
        .cycles
        .iter_mut()
        .flat_map(|c| c.days.iter_mut())
        .flat_map(|d| d.exercises.iter_mut())
    {
        normalize_entry(entry);
    }
}

/// Program length in weeks: total scheduled days over days per week, rounded up
///
/// A frequency of 0 counts as 1.
pub fn compute_duration(structure: &ProgramStructure) -> u32 {
    let total_days: u64 = structure
        .cycles
        .iter()
        .map(|c| c.days.len() as u64 * u64::from(c.repeat_count))
        .sum();
    let frequency = u64::from(structure.frequency.max(1));

    u32::try_from(total_days.div_ceil(frequency)).unwrap_or(u32::MAX)
}

// ============================================================================
// Persistence payload
// ============================================================================

/// The `structure` column of a persisted program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersistedStructure {
    pub cycles: Vec<Cycle>,
    pub frequency: u32,
}

/// Exactly what the program store upserts
///
/// `id: None` creates a new program, `Some` updates it in place.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: LocalizedText,
    pub duration: u32,
    pub structure: PersistedStructure,
    pub is_template: bool,
}

/// Normalize a copy of the structure and wrap it for the store
///
/// The caller's structure is never touched, so a failed save loses nothing.
pub fn build_payload(id: Option<&str>, structure: &ProgramStructure) -> Result<ProgramPayload> {
    let name = structure.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("program name is required".into()));
    }
    if structure.cycles.is_empty() {
        return Err(Error::Validation("program has no cycles".into()));
    }
    if let Some(cycle) = structure.cycles.iter().find(|c| c.days.is_empty()) {
        return Err(Error::Validation(format!("cycle '{}' has no days", cycle.name)));
    }

    let mut normalized = structure.clone();
    normalize_structure(&mut normalized);
    let duration = compute_duration(&normalized);

    Ok(ProgramPayload {
        id: id.map(str::to_string),
        name: LocalizedText::localized(name),
        duration,
        structure: PersistedStructure {
            cycles: normalized.cycles,
            frequency: normalized.frequency,
        },
        is_template: true,
    })
}

// ============================================================================
// Hydration
// ============================================================================

/// A program as read back from storage, tolerant of older shapes
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProgram {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizedText>,
    #[serde(default)]
    pub structure: Option<StoredStructure>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StoredStructure {
    #[serde(default)]
    pub frequency: Option<u32>,
    #[serde(default)]
    pub cycles: Option<Vec<StoredCycle>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCycle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub repeat_count: Option<u32>,
    #[serde(default)]
    pub days: Option<Vec<StoredDay>>,
    /// Pre-rename key for `days`
    #[serde(default)]
    pub sessions: Option<Vec<StoredDay>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StoredDay {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exercises: Vec<StoredEntry>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub exercise_id: Option<String>,
    #[serde(default)]
    pub exercise_name: Option<String>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<Reps>,
    #[serde(default)]
    pub rest: Option<u32>,
    #[serde(default)]
    pub superset_id: Option<String>,
    #[serde(default)]
    pub category_filter: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer).map(Some)
}

impl StoredProgram {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Result of loading a program into the editor
#[derive(Clone, Debug)]
pub struct Hydrated {
    /// Store id when the program was loaded from storage
    pub id: Option<String>,
    pub structure: ProgramStructure,
    /// Number of cycle, day and entry ids generated during the load
    pub generated_ids: usize,
}

impl Hydrated {
    /// True when the structure holds ids the stored document lacks
    pub fn needs_persist(&self) -> bool {
        self.generated_ids > 0
    }
}

/// Counts ids handed out by the wrapped generator
struct CountingIds<'a, G> {
    inner: &'a mut G,
    issued: usize,
}

impl<G: IdGenerator> IdGenerator for CountingIds<'_, G> {
    fn next_id(&mut self) -> String {
        self.issued += 1;
        self.inner.next_id()
    }
}

/// Build the canonical structure from an optional stored program
///
/// An absent program, or one without cycles, yields the one-cycle/one-day
/// skeleton.
pub fn hydrate(
    source: Option<StoredProgram>,
    ids: &mut impl IdGenerator,
    settings: &EditorSettings,
) -> Hydrated {
    let mut ids = CountingIds {
        inner: ids,
        issued: 0,
    };
    let ids = &mut ids;
    let source = source.unwrap_or_default();
    let name = source
        .name
        .as_ref()
        .map(|n| n.display().to_string())
        .unwrap_or_default();
    let structure = source.structure.unwrap_or_default();

    let frequency = match structure.frequency {
        Some(f) if f > 0 => f,
        _ => settings.default_frequency,
    };

    let cycles: Vec<Cycle> = structure
        .cycles
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, cycle)| migrate_cycle(cycle, index, ids, settings))
        .collect();

    let cycles = if cycles.is_empty() {
        tracing::debug!("No stored cycles, seeding default skeleton");
        vec![skeleton_cycle(1, ids, settings)]
    } else {
        cycles
    };

    tracing::debug!(
        "Hydrated program '{}' with {} cycles at {} days/week ({} ids generated)",
        name,
        cycles.len(),
        frequency,
        ids.issued
    );

    Hydrated {
        id: source.id,
        generated_ids: ids.issued,
        structure: ProgramStructure {
            name,
            frequency,
            cycles,
        },
    }
}

/// A fresh cycle holding one empty day
pub(crate) fn skeleton_cycle(
    number: usize,
    ids: &mut impl IdGenerator,
    settings: &EditorSettings,
) -> Cycle {
    Cycle {
        id: ids.next_id(),
        name: format!("{} {}", settings.cycle_label, number),
        repeat_count: 1,
        days: vec![empty_day(1, ids, settings)],
    }
}

pub(crate) fn empty_day(
    number: usize,
    ids: &mut impl IdGenerator,
    settings: &EditorSettings,
) -> Day {
    Day {
        id: ids.next_id(),
        name: format!("{} {}", settings.session_label, number),
        exercises: Vec::new(),
    }
}

fn migrate_cycle(
    cycle: StoredCycle,
    index: usize,
    ids: &mut impl IdGenerator,
    settings: &EditorSettings,
) -> Cycle {
    let stored_days = match (cycle.days, cycle.sessions) {
        (Some(days), _) => days,
        (None, Some(sessions)) => {
            tracing::debug!("Migrating legacy 'sessions' key on cycle {}", index + 1);
            sessions
        }
        (None, None) => Vec::new(),
    };

    let mut days: Vec<Day> = stored_days
        .into_iter()
        .enumerate()
        .map(|(day_index, day)| migrate_day(day, day_index, ids, settings))
        .collect();
    if days.is_empty() {
        days.push(empty_day(1, ids, settings));
    }

    Cycle {
        id: non_empty(cycle.id).unwrap_or_else(|| ids.next_id()),
        name: non_empty(cycle.name)
            .unwrap_or_else(|| format!("{} {}", settings.cycle_label, index + 1)),
        repeat_count: cycle.repeat_count.unwrap_or(1).max(1),
        days,
    }
}

fn migrate_day(
    day: StoredDay,
    index: usize,
    ids: &mut impl IdGenerator,
    settings: &EditorSettings,
) -> Day {
    Day {
        id: non_empty(day.id).unwrap_or_else(|| ids.next_id()),
        name: non_empty(day.name)
            .unwrap_or_else(|| format!("{} {}", settings.session_label, index + 1)),
        exercises: day
            .exercises
            .into_iter()
            .map(|entry| migrate_entry(entry, ids, settings))
            .collect(),
    }
}

fn migrate_entry(
    entry: StoredEntry,
    ids: &mut impl IdGenerator,
    settings: &EditorSettings,
) -> ExerciseEntry {
    let reps = entry.reps.unwrap_or(Reps::Fixed(settings.default_reps));
    let has_variable = has_variable_reps(&reps);

    ExerciseEntry {
        id: non_empty(entry.id).unwrap_or_else(|| ids.next_id()),
        exercise_id: entry.exercise_id.unwrap_or_default(),
        exercise_name: entry.exercise_name.unwrap_or_default(),
        sets: entry.sets.unwrap_or(settings.default_sets),
        reps,
        rest: entry.rest.unwrap_or(settings.default_rest),
        superset_id: non_empty(entry.superset_id),
        category_filter: entry.category_filter,
        notes: entry.notes,
        has_variable_reps: Some(has_variable),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn raw(s: &str) -> Reps {
        Reps::Raw(s.into())
    }

    fn structure(frequency: u32, cycles: &[(usize, u32)]) -> ProgramStructure {
        let mut ids = SequentialIds::new("t");
        let settings = EditorSettings::default();
        ProgramStructure {
            name: "Test".into(),
            frequency,
            cycles: cycles
                .iter()
                .enumerate()
                .map(|(i, &(days, repeat))| Cycle {
                    id: ids.next_id(),
                    name: format!("Cycle {}", i + 1),
                    repeat_count: repeat,
                    days: (0..days)
                        .map(|d| empty_day(d + 1, &mut ids, &settings))
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_reps_scheme() {
        let parsed = parse_reps(&raw("10,8,6"));
        assert_eq!(parsed, Reps::Scheme(vec![10, 8, 6]));
        assert!(has_variable_reps(&parsed));
    }

    #[test]
    fn test_parse_reps_single_value() {
        let parsed = parse_reps(&raw("12"));
        assert_eq!(parsed, Reps::Fixed(12));
        assert!(!has_variable_reps(&parsed));
    }

    #[test]
    fn test_parse_reps_garbage_defaults_to_zero() {
        let parsed = parse_reps(&raw("abc"));
        assert_eq!(parsed, Reps::Fixed(0));
        assert!(!has_variable_reps(&parsed));
        assert_eq!(parse_reps(&raw("")), Reps::Fixed(0));
    }

    #[test]
    fn test_parse_reps_drops_bad_tokens() {
        assert_eq!(parse_reps(&raw("10,abc,8")), Reps::Scheme(vec![10, 8]));
        assert_eq!(parse_reps(&raw(" 10 , 8 ,")), Reps::Scheme(vec![10, 8]));
    }

    #[test]
    fn test_parse_reps_all_tokens_bad_yields_empty_scheme() {
        let parsed = parse_reps(&raw("x,y"));
        assert_eq!(parsed, Reps::Scheme(vec![]));
        assert!(!has_variable_reps(&parsed));
    }

    #[test]
    fn test_single_token_scheme_is_not_variable() {
        let parsed = parse_reps(&raw("10,"));
        assert_eq!(parsed, Reps::Scheme(vec![10]));
        assert!(!has_variable_reps(&parsed));
    }

    #[test]
    fn test_parse_reps_leading_integer() {
        assert_eq!(parse_reps(&raw("12 reps")), Reps::Fixed(12));
        assert_eq!(parse_reps(&raw("-3")), Reps::Fixed(-3));
        assert_eq!(parse_reps(&raw("8-10")), Reps::Fixed(8));
    }

    #[test]
    fn test_parse_reps_out_of_range_tokens_are_dropped() {
        assert_eq!(parse_reps(&raw("99999999999")), Reps::Fixed(0));
        assert_eq!(
            parse_reps(&raw("10,99999999999,8")),
            Reps::Scheme(vec![10, 8])
        );
        assert_eq!(parse_reps(&raw("2147483647")), Reps::Fixed(i32::MAX));
        assert_eq!(parse_reps(&raw("-2147483648")), Reps::Fixed(i32::MIN));
    }

    #[test]
    fn test_numeric_reps_pass_through() {
        assert_eq!(parse_reps(&Reps::Fixed(15)), Reps::Fixed(15));
        assert_eq!(
            parse_reps(&Reps::Scheme(vec![5, 5, 5])),
            Reps::Scheme(vec![5, 5, 5])
        );
    }

    #[test]
    fn test_duration_single_cycle() {
        assert_eq!(compute_duration(&structure(4, &[(8, 1)])), 2);
    }

    #[test]
    fn test_duration_repeated_cycles() {
        assert_eq!(compute_duration(&structure(3, &[(3, 2), (3, 2)])), 4);
    }

    #[test]
    fn test_duration_rounds_up() {
        assert_eq!(compute_duration(&structure(4, &[(3, 1)])), 1);
        assert_eq!(compute_duration(&structure(4, &[(3, 3)])), 3);
    }

    #[test]
    fn test_duration_zero_frequency_counts_as_one() {
        assert_eq!(compute_duration(&structure(0, &[(2, 3)])), 6);
    }

    #[test]
    fn test_build_payload_requires_name() {
        let mut s = structure(4, &[(1, 1)]);
        s.name = "   ".into();
        assert!(matches!(build_payload(None, &s), Err(Error::Validation(_))));
    }

    #[test]
    fn test_build_payload_shape() {
        let mut s = structure(4, &[(2, 2)]);
        s.cycles[0].days[0].exercises.push(ExerciseEntry {
            id: "e1".into(),
            exercise_id: "squat".into(),
            exercise_name: "Back Squat".into(),
            sets: 5,
            reps: raw("5,3,1"),
            rest: 180,
            superset_id: None,
            category_filter: None,
            notes: None,
            has_variable_reps: None,
        });

        let payload = build_payload(Some("prog-1"), &s).unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["id"], "prog-1");
        assert_eq!(json["name"]["default"], "Test");
        assert_eq!(json["duration"], 1);
        assert_eq!(json["isTemplate"], true);
        assert_eq!(json["structure"]["frequency"], 4);
        let entry = &json["structure"]["cycles"][0]["days"][0]["exercises"][0];
        assert_eq!(entry["reps"], serde_json::json!([5, 3, 1]));
        assert_eq!(entry["hasVariableReps"], true);
        assert_eq!(entry["exerciseId"], "squat");

        // Source structure stays in editing state
        assert_eq!(s.cycles[0].days[0].exercises[0].reps, raw("5,3,1"));
    }

    #[test]
    fn test_payload_without_id_omits_key() {
        let payload = build_payload(None, &structure(4, &[(1, 1)])).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_hydrate_absent_seeds_skeleton() {
        let mut ids = SequentialIds::new("h");
        let hydrated = hydrate(None, &mut ids, &EditorSettings::default());

        assert!(hydrated.id.is_none());
        let s = hydrated.structure;
        assert_eq!(s.frequency, 4);
        assert_eq!(s.cycles.len(), 1);
        assert_eq!(s.cycles[0].name, "Cycle 1");
        assert_eq!(s.cycles[0].repeat_count, 1);
        assert_eq!(s.cycles[0].days.len(), 1);
        assert_eq!(s.cycles[0].days[0].name, "Day 1");
        assert!(s.cycles[0].days[0].exercises.is_empty());
    }

    #[test]
    fn test_hydrate_empty_cycle_list_seeds_skeleton() {
        let stored =
            StoredProgram::from_json(r#"{"name": {"default": "Blank"}, "structure": {"cycles": [], "frequency": 3}}"#)
                .unwrap();
        let mut ids = SequentialIds::new("h");
        let s = hydrate(Some(stored), &mut ids, &EditorSettings::default()).structure;

        assert_eq!(s.name, "Blank");
        assert_eq!(s.frequency, 3);
        assert_eq!(s.cycles.len(), 1);
        assert_eq!(s.cycles[0].days.len(), 1);
    }

    #[test]
    fn test_hydrate_migrates_legacy_sessions() {
        let json = r#"{
            "id": "prog-7",
            "name": {"default": "Legacy"},
            "structure": {
                "frequency": 2,
                "cycles": [
                    {
                        "name": "Base",
                        "repeatCount": 3,
                        "sessions": [
                            {"name": "Push", "exercises": [
                                {"exerciseId": 12, "exerciseName": "Bench", "sets": 4, "reps": [8, 6], "rest": 90}
                            ]},
                            {"id": "", "name": "Pull", "exercises": []}
                        ]
                    }
                ]
            }
        }"#;
        let stored = StoredProgram::from_json(json).unwrap();
        let mut ids = SequentialIds::new("gen");
        let hydrated = hydrate(Some(stored), &mut ids, &EditorSettings::default());

        assert_eq!(hydrated.id.as_deref(), Some("prog-7"));
        let s = hydrated.structure;
        let cycle = &s.cycles[0];
        assert!(!cycle.id.is_empty());
        assert_eq!(cycle.repeat_count, 3);
        assert_eq!(cycle.days.len(), 2);
        assert!(cycle.days.iter().all(|d| !d.id.is_empty()));
        assert_ne!(cycle.days[0].id, cycle.days[1].id);

        let entry = &cycle.days[0].exercises[0];
        assert_eq!(entry.exercise_id, "12");
        assert!(entry.has_variable_reps());

        // Canonical shape only exposes `days`
        let json = serde_json::to_value(cycle).unwrap();
        assert!(json.get("sessions").is_none());
        assert!(json.get("days").is_some());
    }

    #[test]
    fn test_hydrate_prefers_days_over_sessions() {
        let json = r#"{"structure": {"cycles": [{
            "id": "c1", "name": "A", "repeatCount": 1,
            "days": [{"id": "d1", "name": "New", "exercises": []}],
            "sessions": [{"id": "d0", "name": "Old", "exercises": []}]
        }]}}"#;
        let mut ids = SequentialIds::new("gen");
        let s = hydrate(
            Some(StoredProgram::from_json(json).unwrap()),
            &mut ids,
            &EditorSettings::default(),
        )
        .structure;

        assert_eq!(s.cycles[0].days.len(), 1);
        assert_eq!(s.cycles[0].days[0].id, "d1");
    }

    #[test]
    fn test_hydrate_keeps_existing_ids_and_fixes_bad_values() {
        let json = r#"{"structure": {"frequency": 0, "cycles": [
            {"id": "c1", "name": "A", "repeatCount": 0, "days": []}
        ]}}"#;
        let mut ids = SequentialIds::new("gen");
        let s = hydrate(
            Some(StoredProgram::from_json(json).unwrap()),
            &mut ids,
            &EditorSettings::default(),
        )
        .structure;

        assert_eq!(s.frequency, 4);
        assert_eq!(s.cycles[0].id, "c1");
        assert_eq!(s.cycles[0].repeat_count, 1);
        assert_eq!(s.cycles[0].days.len(), 1);
        assert_eq!(s.cycles[0].days[0].id, "gen-1");
    }

    #[test]
    fn test_payload_hydrates_back_to_same_structure() {
        let s = structure(3, &[(2, 2), (1, 1)]);
        let payload = build_payload(Some("p"), &s).unwrap();
        let json = serde_json::to_string(&payload).unwrap();

        let mut ids = SequentialIds::new("unused");
        let hydrated = hydrate(
            Some(StoredProgram::from_json(&json).unwrap()),
            &mut ids,
            &EditorSettings::default(),
        );

        assert_eq!(hydrated.structure, s);
    }
}
