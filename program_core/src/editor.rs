//! Structure engine: every mutation of a program under edit.
//!
//! [`ProgramEditor`] owns the working [`ProgramStructure`] for one editing
//! session together with the current cycle/day selection. All checks run
//! before anything is written, so a rejected operation leaves the structure
//! exactly as it was.

use crate::config::Config;
use crate::ids::IdGenerator;
use crate::serializer::{empty_day, skeleton_cycle};
use crate::types::{
    Cycle, Day, ExerciseEntry, ExercisePatch, ExerciseReference, ProgramStructure, Reps,
};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Labels and default prescription the engine stamps on new items
#[derive(Clone, Debug)]
pub struct EditorSettings {
    pub default_frequency: u32,
    pub cycle_label: String,
    pub session_label: String,
    pub copy_suffix: String,
    pub default_sets: u32,
    pub default_reps: i32,
    pub default_rest: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings::from(&Config::default())
    }
}

impl From<&Config> for EditorSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_frequency: config.program.default_frequency.max(1),
            cycle_label: config.program.cycle_label.clone(),
            session_label: config.program.session_label.clone(),
            copy_suffix: config.program.copy_suffix.clone(),
            default_sets: config.prescription.sets,
            default_reps: config.prescription.reps,
            default_rest: config.prescription.rest_seconds,
        }
    }
}

/// Composite `cycleId:dayId` key scoping a reorder to one day
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DayKey {
    pub cycle_id: String,
    pub day_id: String,
}

impl DayKey {
    pub fn new(cycle_id: impl Into<String>, day_id: impl Into<String>) -> Self {
        Self {
            cycle_id: cycle_id.into(),
            day_id: day_id.into(),
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.cycle_id, self.day_id)
    }
}

impl FromStr for DayKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((cycle, day)) if !cycle.is_empty() && !day.is_empty() => {
                Ok(DayKey::new(cycle, day))
            }
            _ => Err(Error::InvalidDayKey(s.to_string())),
        }
    }
}

/// Which cycle and day the editor is focused on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub cycle_id: String,
    pub day_id: String,
}

/// The in-memory editor for one program
pub struct ProgramEditor<G: IdGenerator> {
    structure: ProgramStructure,
    selection: Selection,
    settings: EditorSettings,
    ids: G,
}

impl<G: IdGenerator> ProgramEditor<G> {
    /// Start editing a structure; selection starts on the first cycle and day
    ///
    /// An empty cycle list (or an empty first cycle) is topped up with the
    /// default skeleton so the editor always has something to select.
    pub fn new(mut structure: ProgramStructure, settings: EditorSettings, mut ids: G) -> Self {
        if structure.cycles.is_empty() {
            structure.cycles.push(skeleton_cycle(1, &mut ids, &settings));
        }
        for cycle in structure.cycles.iter_mut().filter(|c| c.days.is_empty()) {
            cycle.days.push(empty_day(1, &mut ids, &settings));
        }
        structure.frequency = structure.frequency.max(1);

        let first = &structure.cycles[0];
        let selection = Selection {
            cycle_id: first.id.clone(),
            day_id: first.days[0].id.clone(),
        };

        Self {
            structure,
            selection,
            settings,
            ids,
        }
    }

    pub fn structure(&self) -> &ProgramStructure {
        &self.structure
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn duration_weeks(&self) -> u32 {
        self.structure.duration_weeks()
    }

    // ------------------------------------------------------------------
    // Program level
    // ------------------------------------------------------------------

    pub fn rename_program(&mut self, name: impl Into<String>) {
        self.structure.name = name.into();
    }

    /// Set days per week; values below 1 are stored as 1
    ///
    /// Existing cycles longer than the new frequency are left alone; the
    /// cap only applies when a day is added.
    pub fn set_frequency(&mut self, frequency: u32) {
        let frequency = frequency.max(1);
        if let Some(over) = self
            .structure
            .cycles
            .iter()
            .find(|c| c.days.len() > frequency as usize)
        {
            tracing::warn!(
                "Cycle '{}' already has {} days, above the new frequency {}",
                over.name,
                over.days.len(),
                frequency
            );
        }
        self.structure.frequency = frequency;
    }

    pub fn select_cycle(&mut self, cycle_id: &str) -> Result<()> {
        let cycle = self.cycle(cycle_id)?;
        let day_id = cycle.days.first().map(|d| d.id.clone()).unwrap_or_default();
        self.selection = Selection {
            cycle_id: cycle_id.to_string(),
            day_id,
        };
        Ok(())
    }

    /// Select a day anywhere in the program; its cycle becomes active too
    pub fn select_day(&mut self, day_id: &str) -> Result<()> {
        let cycle_id = self
            .structure
            .cycles
            .iter()
            .find(|c| c.day(day_id).is_some())
            .map(|c| c.id.clone())
            .ok_or_else(|| Error::not_found("day", day_id))?;
        self.selection = Selection {
            cycle_id,
            day_id: day_id.to_string(),
        };
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cycles
    // ------------------------------------------------------------------

    /// Append a cycle with one empty day and select it
    pub fn add_cycle(&mut self) -> String {
        let number = self.structure.cycles.len() + 1;
        let cycle = skeleton_cycle(number, &mut self.ids, &self.settings);
        let cycle_id = cycle.id.clone();

        self.selection = Selection {
            cycle_id: cycle_id.clone(),
            day_id: cycle.days[0].id.clone(),
        };
        self.structure.cycles.push(cycle);

        tracing::debug!("Added cycle {} ({})", number, cycle_id);
        cycle_id
    }

    /// Remove a cycle; the last remaining cycle is never removed
    ///
    /// Returns whether anything was deleted.
    pub fn delete_cycle(&mut self, cycle_id: &str) -> Result<bool> {
        let index = self.cycle_index(cycle_id)?;
        if self.structure.cycles.len() <= 1 {
            tracing::info!("Refusing to delete the only cycle {}", cycle_id);
            return Ok(false);
        }

        self.structure.cycles.remove(index);
        if self.selection.cycle_id == cycle_id {
            let first = &self.structure.cycles[0];
            self.selection = Selection {
                cycle_id: first.id.clone(),
                day_id: first.days.first().map(|d| d.id.clone()).unwrap_or_default(),
            };
        }

        tracing::debug!("Deleted cycle {}", cycle_id);
        Ok(true)
    }

    /// Adjust the repeat count by `delta`, never going below 1
    pub fn set_repeat_count(&mut self, cycle_id: &str, delta: i32) -> Result<u32> {
        let cycle = self.cycle_mut(cycle_id)?;
        let updated =
            (i64::from(cycle.repeat_count) + i64::from(delta)).clamp(1, i64::from(u32::MAX));
        cycle.repeat_count = updated as u32;
        Ok(cycle.repeat_count)
    }

    pub fn rename_cycle(&mut self, cycle_id: &str, name: impl Into<String>) -> Result<()> {
        self.cycle_mut(cycle_id)?.name = name.into();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Days
    // ------------------------------------------------------------------

    /// Append an empty day and select it
    ///
    /// Fails with [`Error::CapacityExceeded`] once the cycle holds
    /// `frequency` days.
    pub fn add_day(&mut self, cycle_id: &str) -> Result<String> {
        let frequency = self.structure.frequency;
        let index = self.cycle_index(cycle_id)?;
        self.check_capacity(index)?;

        let number = self.structure.cycles[index].days.len() + 1;
        let day = empty_day(number, &mut self.ids, &self.settings);
        let day_id = day.id.clone();
        self.structure.cycles[index].days.push(day);
        self.select(cycle_id, &day_id);

        tracing::debug!(
            "Added day {} to cycle {} ({}/{})",
            day_id,
            cycle_id,
            number,
            frequency
        );
        Ok(day_id)
    }

    /// Append a deep copy of a day with fresh ids throughout and select it
    pub fn copy_day(&mut self, cycle_id: &str, day_id: &str) -> Result<String> {
        let index = self.cycle_index(cycle_id)?;
        let source = self.structure.cycles[index]
            .day(day_id)
            .ok_or_else(|| Error::not_found("day", day_id))?
            .clone();
        self.check_capacity(index)?;

        let copy = Day {
            id: self.ids.next_id(),
            name: format!("{} {}", source.name, self.settings.copy_suffix),
            exercises: source
                .exercises
                .into_iter()
                .map(|entry| ExerciseEntry {
                    id: self.ids.next_id(),
                    ..entry
                })
                .collect(),
        };
        let copy_id = copy.id.clone();
        self.structure.cycles[index].days.push(copy);
        self.select(cycle_id, &copy_id);

        tracing::debug!("Copied day {} to {} in cycle {}", day_id, copy_id, cycle_id);
        Ok(copy_id)
    }

    /// Remove a day; the last day of a cycle is never removed
    pub fn delete_day(&mut self, cycle_id: &str, day_id: &str) -> Result<bool> {
        let cycle = self.cycle_mut(cycle_id)?;
        let index = cycle
            .days
            .iter()
            .position(|d| d.id == day_id)
            .ok_or_else(|| Error::not_found("day", day_id))?;
        if cycle.days.len() <= 1 {
            tracing::info!("Refusing to delete the only day of cycle {}", cycle_id);
            return Ok(false);
        }

        cycle.days.remove(index);
        let fallback = cycle.days[0].id.clone();
        if self.selection.day_id == day_id {
            self.select(cycle_id, &fallback);
        }

        tracing::debug!("Deleted day {} from cycle {}", day_id, cycle_id);
        Ok(true)
    }

    pub fn rename_day(
        &mut self,
        cycle_id: &str,
        day_id: &str,
        name: impl Into<String>,
    ) -> Result<()> {
        self.day_mut(cycle_id, day_id)?.name = name.into();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Exercise entries
    // ------------------------------------------------------------------

    /// Append an exercise with the default prescription
    ///
    /// Name and category are copied from the reference now, so later
    /// library edits do not rewrite existing programs. `superset_id` is
    /// whatever group the caller's superset mode currently holds.
    pub fn add_exercise(
        &mut self,
        cycle_id: &str,
        day_id: &str,
        exercise: &ExerciseReference,
        superset_id: Option<&str>,
    ) -> Result<String> {
        // Resolve the day before drawing an id
        self.day_mut(cycle_id, day_id)?;

        let entry = ExerciseEntry {
            id: self.ids.next_id(),
            exercise_id: exercise.id.clone(),
            exercise_name: exercise.name.display().to_string(),
            sets: self.settings.default_sets,
            reps: Reps::Fixed(self.settings.default_reps),
            rest: self.settings.default_rest,
            superset_id: superset_id.map(str::to_string),
            category_filter: Some(exercise.category.clone()),
            notes: None,
            has_variable_reps: None,
        };
        let entry_id = entry.id.clone();
        self.day_mut(cycle_id, day_id)?.exercises.push(entry);

        tracing::debug!(
            "Added exercise {} as {} to day {}{}",
            exercise.id,
            entry_id,
            day_id,
            superset_id
                .map(|s| format!(" in {}", s))
                .unwrap_or_default()
        );
        Ok(entry_id)
    }

    /// Merge a partial update into an entry
    pub fn update_exercise(
        &mut self,
        cycle_id: &str,
        day_id: &str,
        entry_id: &str,
        patch: ExercisePatch,
    ) -> Result<()> {
        let entry = self
            .day_mut(cycle_id, day_id)?
            .exercises
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| Error::not_found("exercise", entry_id))?;
        patch.apply(entry);
        Ok(())
    }

    /// Remove an entry; a day may end up with no exercises
    pub fn delete_exercise(
        &mut self,
        cycle_id: &str,
        day_id: &str,
        entry_id: &str,
    ) -> Result<bool> {
        let day = self.day_mut(cycle_id, day_id)?;
        let before = day.exercises.len();
        day.exercises.retain(|e| e.id != entry_id);
        Ok(day.exercises.len() != before)
    }

    /// Move the entry at `from` to `to` within one day
    ///
    /// Indices are checked against the current exercise list; moving an
    /// entry onto its own position changes nothing.
    pub fn reorder_exercise(
        &mut self,
        cycle_id: &str,
        day_id: &str,
        from: usize,
        to: usize,
    ) -> Result<()> {
        let exercises = &mut self.day_mut(cycle_id, day_id)?.exercises;
        let len = exercises.len();
        for index in [from, to] {
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let entry = exercises.remove(from);
        exercises.insert(to, entry);
        tracing::debug!("Moved exercise {} -> {} in day {}", from, to, day_id);
        Ok(())
    }

    /// [`reorder_exercise`](Self::reorder_exercise) addressed by a `cycleId:dayId` key
    pub fn reorder_in(&mut self, key: &DayKey, from: usize, to: usize) -> Result<()> {
        self.reorder_exercise(&key.cycle_id, &key.day_id, from, to)
    }

    /// Hand back the structure, ending the edit
    pub fn into_structure(self) -> ProgramStructure {
        self.structure
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    fn select(&mut self, cycle_id: &str, day_id: &str) {
        self.selection = Selection {
            cycle_id: cycle_id.to_string(),
            day_id: day_id.to_string(),
        };
    }

    fn check_capacity(&self, cycle_index: usize) -> Result<()> {
        let frequency = self.structure.frequency;
        let cycle = &self.structure.cycles[cycle_index];
        if cycle.days.len() >= frequency as usize {
            tracing::info!(
                "Cycle '{}' is full ({} days, frequency {})",
                cycle.name,
                cycle.days.len(),
                frequency
            );
            return Err(Error::CapacityExceeded { frequency });
        }
        Ok(())
    }

    fn cycle_index(&self, cycle_id: &str) -> Result<usize> {
        self.structure
            .cycles
            .iter()
            .position(|c| c.id == cycle_id)
            .ok_or_else(|| Error::not_found("cycle", cycle_id))
    }

    fn cycle(&self, cycle_id: &str) -> Result<&Cycle> {
        self.structure
            .cycle(cycle_id)
            .ok_or_else(|| Error::not_found("cycle", cycle_id))
    }

    fn cycle_mut(&mut self, cycle_id: &str) -> Result<&mut Cycle> {
        self.structure
            .cycles
            .iter_mut()
            .find(|c| c.id == cycle_id)
            .ok_or_else(|| Error::not_found("cycle", cycle_id))
    }

    fn day_mut(&mut self, cycle_id: &str, day_id: &str) -> Result<&mut Day> {
        self.cycle_mut(cycle_id)?
            .days
            .iter_mut()
            .find(|d| d.id == day_id)
            .ok_or_else(|| Error::not_found("day", day_id))
    }
}
