//! Structural edits to the exercise and set lists.
//!
//! Every edit is a [`Mutation`] applied through [`WorkoutSession::apply`],
//! which returns whether anything changed. Rejected edits (out-of-range
//! indices, deleting an exercise's last set, pairing an exercise with itself)
//! are silent no-ops. Totals are recomputed after every applied edit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExerciseEntry, ExerciseKind, SetRecord, SetType, Totals, WorkoutSession};

/// Editable text field of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetField {
    Weight,
    Reps,
    Rpe,
}

impl std::str::FromStr for SetField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weight" => Ok(SetField::Weight),
            "reps" => Ok(SetField::Reps),
            "rpe" => Ok(SetField::Rpe),
            other => Err(format!("unknown set field '{other}'")),
        }
    }
}

/// A structural edit to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    AddExercise { entry: ExerciseEntry },
    DeleteExercise { exercise: usize },
    /// Remove the exercise at `from` and reinsert it at `to`.
    MoveExercise { from: usize, to: usize },
    SetCurrentExercise { exercise: usize },
    AddSet { exercise: usize },
    DeleteSet { exercise: usize, set: usize },
    UpdateSetField {
        exercise: usize,
        set: usize,
        field: SetField,
        value: String,
    },
    SetType {
        exercise: usize,
        set: usize,
        set_type: SetType,
    },
    PairSuperset { a: usize, b: usize },
    UnpairSuperset { exercise: usize },
}

impl Mutation {
    /// Edits that shift positions of existing exercises or sets.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            Mutation::DeleteExercise { .. }
                | Mutation::MoveExercise { .. }
                | Mutation::DeleteSet { .. }
        )
    }
}

impl WorkoutSession {
    /// Apply one edit. Returns false when the edit was rejected or changed nothing.
    pub fn apply(&mut self, mutation: &Mutation) -> bool {
        let applied = match mutation {
            Mutation::AddExercise { entry } => self.add_exercise(entry.clone()),
            Mutation::DeleteExercise { exercise } => self.delete_exercise(*exercise),
            Mutation::MoveExercise { from, to } => self.move_exercise(*from, *to),
            Mutation::SetCurrentExercise { exercise } => self.set_current_exercise(*exercise),
            Mutation::AddSet { exercise } => self.add_set(*exercise),
            Mutation::DeleteSet { exercise, set } => self.delete_set(*exercise, *set),
            Mutation::UpdateSetField {
                exercise,
                set,
                field,
                value,
            } => self.update_set_field(*exercise, *set, *field, value),
            Mutation::SetType {
                exercise,
                set,
                set_type,
            } => self.assign_set_type(*exercise, *set, *set_type),
            Mutation::PairSuperset { a, b } => self.pair_superset(*a, *b),
            Mutation::UnpairSuperset { exercise } => self.unpair_superset(*exercise),
        };

        if applied {
            self.recompute_totals();
        } else {
            debug!(?mutation, session_id = %self.id, "mutation ignored");
        }
        applied
    }

    fn add_exercise(&mut self, mut entry: ExerciseEntry) -> bool {
        entry.reclassify();
        let index = self.exercises.len();
        self.sets.insert(index, vec![SetRecord::for_kind(entry.kind())]);
        self.exercises.push(entry);
        self.current_exercise_index = index;
        true
    }

    fn delete_exercise(&mut self, index: usize) -> bool {
        let len = self.exercises.len();
        if index >= len {
            return false;
        }
        self.exercises.remove(index);

        let shift = |i: usize| if i > index { i - 1 } else { i };

        let sets = std::mem::take(&mut self.sets);
        self.sets = sets
            .into_iter()
            .filter(|(i, _)| *i != index)
            .map(|(i, s)| (shift(i), s))
            .collect();

        if let Some(partner) = self.pairings.remove(&index) {
            self.pairings.remove(&partner);
        }
        let pairings = std::mem::take(&mut self.pairings);
        self.pairings = pairings
            .into_iter()
            .map(|(a, b)| (shift(a), shift(b)))
            .collect();

        let new_len = len - 1;
        let current = self.current_exercise_index;
        self.current_exercise_index = if index == current {
            index.min(new_len.saturating_sub(1))
        } else if index < current {
            current - 1
        } else {
            current
        };
        true
    }

    fn move_exercise(&mut self, from: usize, to: usize) -> bool {
        let len = self.exercises.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let entry = self.exercises.remove(from);
        self.exercises.insert(to, entry);

        let remap = |i: usize| moved_position(from, to, i);

        let sets = std::mem::take(&mut self.sets);
        self.sets = sets.into_iter().map(|(i, s)| (remap(i), s)).collect();

        let pairings = std::mem::take(&mut self.pairings);
        self.pairings = pairings
            .into_iter()
            .map(|(a, b)| (remap(a), remap(b)))
            .collect::<BTreeMap<_, _>>();

        self.current_exercise_index = remap(self.current_exercise_index);
        true
    }

    fn set_current_exercise(&mut self, index: usize) -> bool {
        if index >= self.exercises.len() || index == self.current_exercise_index {
            return false;
        }
        self.current_exercise_index = index;
        true
    }

    fn add_set(&mut self, exercise: usize) -> bool {
        let Some(kind) = self.exercises.get(exercise).map(ExerciseEntry::kind) else {
            return false;
        };
        let sets = self.sets.entry(exercise).or_default();
        if kind == ExerciseKind::Cardio {
            if let Some(previous) = sets.last_mut() {
                previous.completed = true;
            }
        }
        sets.push(SetRecord::for_kind(kind));
        true
    }

    fn delete_set(&mut self, exercise: usize, set: usize) -> bool {
        match self.sets.get_mut(&exercise) {
            Some(sets) if sets.len() > 1 && set < sets.len() => {
                sets.remove(set);
                true
            }
            _ => false,
        }
    }

    fn update_set_field(&mut self, exercise: usize, set: usize, field: SetField, value: &str) -> bool {
        let Some(kind) = self.exercises.get(exercise).map(ExerciseEntry::kind) else {
            return false;
        };
        let Some(record) = self.sets.get_mut(&exercise).and_then(|s| s.get_mut(set)) else {
            return false;
        };

        match field {
            SetField::Weight => record.weight = value.to_string(),
            SetField::Reps => record.reps = normalize_reps(value),
            SetField::Rpe => {
                let trimmed = value.trim();
                record.rpe = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
        }

        let has_reps = !record.reps.trim().is_empty();
        let has_weight = !record.weight.trim().is_empty();
        match kind {
            ExerciseKind::Bodyweight => record.completed = has_reps,
            ExerciseKind::Loaded => record.completed = has_weight && has_reps,
            // cardio completion follows the set timer, not typed fields
            ExerciseKind::Cardio => {}
        }
        true
    }

    fn assign_set_type(&mut self, exercise: usize, set: usize, set_type: SetType) -> bool {
        match self.sets.get_mut(&exercise).and_then(|s| s.get_mut(set)) {
            Some(record) => {
                record.set_type = set_type;
                true
            }
            None => false,
        }
    }

    fn pair_superset(&mut self, a: usize, b: usize) -> bool {
        let len = self.exercises.len();
        if a == b || a >= len || b >= len {
            return false;
        }
        if self.pairings.get(&a) == Some(&b) {
            return false;
        }
        self.unpair_superset(a);
        self.unpair_superset(b);
        self.pairings.insert(a, b);
        self.pairings.insert(b, a);
        true
    }

    fn unpair_superset(&mut self, exercise: usize) -> bool {
        match self.pairings.remove(&exercise) {
            Some(partner) => {
                self.pairings.remove(&partner);
                true
            }
            None => false,
        }
    }

    pub(crate) fn recompute_totals(&mut self) {
        let mut totals = Totals::default();
        for record in self.sets.values().flatten() {
            totals.total_set_count += 1;
            if let (Some(weight), Some(reps)) = (parse_weight(&record.weight), reps_lower_bound(&record.reps)) {
                totals.total_volume += weight * f64::from(reps);
            }
        }
        self.totals = totals;
    }
}

/// Where position `i` ends up after moving the element at `from` to `to`.
pub fn moved_position(from: usize, to: usize, i: usize) -> usize {
    if i == from {
        to
    } else if from < to && i > from && i <= to {
        i - 1
    } else if to < from && i >= to && i < from {
        i + 1
    } else {
        i
    }
}

/// Normalize typed rep input.
///
/// Numeric-looking input keeps digits and a single dash; a third digit in a
/// row gets a dash inserted before it (so `123` becomes `12-3`), and each
/// side of the dash holds at most two digits. Text that does not start with
/// a digit (e.g. `AMRAP`) is kept as typed.
pub fn normalize_reps(input: &str) -> String {
    let trimmed = input.trim();
    if !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    let mut out = String::with_capacity(trimmed.len() + 1);
    let mut has_dash = false;
    let mut side_digits = 0;
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            if side_digits == 2 {
                if has_dash {
                    continue;
                }
                out.push('-');
                has_dash = true;
                side_digits = 0;
            }
            out.push(c);
            side_digits += 1;
        } else if c == '-' && !has_dash && side_digits > 0 {
            out.push('-');
            has_dash = true;
            side_digits = 0;
        }
    }
    out
}

/// Lower bound of a rep count or range (`"8-12"` gives 8).
pub fn reps_lower_bound(reps: &str) -> Option<u32> {
    reps.trim().split('-').next()?.trim().parse().ok()
}

fn parse_weight(weight: &str) -> Option<f64> {
    let value: f64 = weight.trim().replace(',', ".").parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ExerciseEntry {
        ExerciseEntry::new(name, None, None)
    }

    fn session_with(names: &[&str]) -> WorkoutSession {
        let mut session = WorkoutSession::with_id("s", 0);
        for name in names {
            session.apply(&Mutation::AddExercise { entry: entry(name) });
        }
        session
    }

    fn update(session: &mut WorkoutSession, exercise: usize, set: usize, field: SetField, value: &str) {
        session.apply(&Mutation::UpdateSetField {
            exercise,
            set,
            field,
            value: value.into(),
        });
    }

    #[test]
    fn reps_typing_inserts_range_dash() {
        assert_eq!(normalize_reps("1"), "1");
        assert_eq!(normalize_reps("12"), "12");
        assert_eq!(normalize_reps("123"), "12-3");
        assert_eq!(normalize_reps("8-12"), "8-12");
    }

    #[test]
    fn reps_normalization_caps_and_filters() {
        assert_eq!(normalize_reps("12-345"), "12-34");
        assert_eq!(normalize_reps("8--10"), "8-10");
        assert_eq!(normalize_reps("8-1-2"), "8-12");
        assert_eq!(normalize_reps("10 reps"), "10");
        assert_eq!(normalize_reps("AMRAP"), "AMRAP");
        assert_eq!(normalize_reps(""), "");
    }

    #[test]
    fn loaded_set_completes_with_weight_and_reps() {
        let mut session = session_with(&["Bench Press"]);
        update(&mut session, 0, 0, SetField::Reps, "8");
        assert!(!session.set(0, 0).unwrap().completed);
        update(&mut session, 0, 0, SetField::Weight, "100");
        assert!(session.set(0, 0).unwrap().completed);
        update(&mut session, 0, 0, SetField::Weight, "");
        assert!(!session.set(0, 0).unwrap().completed);
    }

    #[test]
    fn bodyweight_set_completes_with_reps_only() {
        let mut session = session_with(&["Pull-up"]);
        update(&mut session, 0, 0, SetField::Reps, "10");
        assert!(session.set(0, 0).unwrap().completed);
    }

    #[test]
    fn totals_use_rep_range_lower_bound() {
        let mut session = session_with(&["Squat"]);
        session.apply(&Mutation::AddSet { exercise: 0 });
        session.apply(&Mutation::AddSet { exercise: 0 });
        update(&mut session, 0, 0, SetField::Weight, "100");
        update(&mut session, 0, 0, SetField::Reps, "8-12");
        update(&mut session, 0, 1, SetField::Weight, "62.5");
        update(&mut session, 0, 1, SetField::Reps, "10");
        update(&mut session, 0, 2, SetField::Weight, "heavy");
        update(&mut session, 0, 2, SetField::Reps, "5");

        let totals = session.totals();
        assert_eq!(totals.total_set_count, 3);
        assert!((totals.total_volume - 1425.0).abs() < f64::EPSILON);
    }

    #[test]
    fn last_set_cannot_be_deleted() {
        let mut session = session_with(&["Squat"]);
        assert!(!session.apply(&Mutation::DeleteSet { exercise: 0, set: 0 }));
        session.apply(&Mutation::AddSet { exercise: 0 });
        assert!(session.apply(&Mutation::DeleteSet { exercise: 0, set: 0 }));
        assert_eq!(session.sets(0).len(), 1);
    }

    #[test]
    fn cardio_add_set_completes_previous() {
        let mut session = session_with(&["Treadmill Run"]);
        session.apply(&Mutation::AddSet { exercise: 0 });
        let sets = session.sets(0);
        assert!(sets[0].completed);
        assert!(!sets[1].completed);
        assert_eq!(sets[1].duration_seconds, Some(0));
    }

    #[test]
    fn delete_before_current_shifts_pointer() {
        let mut session = session_with(&["A", "B", "C", "D"]);
        session.apply(&Mutation::SetCurrentExercise { exercise: 2 });
        session.apply(&Mutation::DeleteExercise { exercise: 0 });
        assert_eq!(session.current_exercise_index(), 1);
        assert_eq!(session.exercise(1).unwrap().name, "C");
    }

    #[test]
    fn delete_current_clamps_to_new_end() {
        let mut session = session_with(&["A", "B", "C"]);
        assert_eq!(session.current_exercise_index(), 2);
        session.apply(&Mutation::DeleteExercise { exercise: 2 });
        assert_eq!(session.current_exercise_index(), 1);

        session.apply(&Mutation::SetCurrentExercise { exercise: 0 });
        session.apply(&Mutation::DeleteExercise { exercise: 0 });
        assert_eq!(session.current_exercise_index(), 0);
        assert_eq!(session.exercise(0).unwrap().name, "B");
    }

    #[test]
    fn delete_after_current_leaves_pointer() {
        let mut session = session_with(&["A", "B", "C"]);
        session.apply(&Mutation::SetCurrentExercise { exercise: 0 });
        session.apply(&Mutation::DeleteExercise { exercise: 2 });
        assert_eq!(session.current_exercise_index(), 0);
    }

    #[test]
    fn deleting_every_exercise_leaves_empty_session() {
        let mut session = session_with(&["A"]);
        assert!(session.apply(&Mutation::DeleteExercise { exercise: 0 }));
        assert!(session.exercises().is_empty());
        assert!(session.is_consistent());
        assert!(!session.has_data());
    }

    #[test]
    fn delete_reindexes_sets_and_pairings() {
        let mut session = session_with(&["A", "B", "C", "D"]);
        session.apply(&Mutation::AddSet { exercise: 3 });
        session.apply(&Mutation::PairSuperset { a: 2, b: 3 });
        session.apply(&Mutation::PairSuperset { a: 0, b: 1 });

        session.apply(&Mutation::DeleteExercise { exercise: 1 });

        assert!(session.is_consistent());
        assert_eq!(session.partner(0), None, "partner of deleted exercise is unpaired");
        assert_eq!(session.partner(1), Some(2));
        assert_eq!(session.partner(2), Some(1));
        assert_eq!(session.sets(2).len(), 2, "D's sets moved down with it");
    }

    #[test]
    fn pairing_replaces_previous_partner() {
        let mut session = session_with(&["A", "B", "C"]);
        session.apply(&Mutation::PairSuperset { a: 0, b: 1 });
        session.apply(&Mutation::PairSuperset { a: 0, b: 2 });
        assert_eq!(session.partner(0), Some(2));
        assert_eq!(session.partner(2), Some(0));
        assert_eq!(session.partner(1), None);
        assert!(session.is_consistent());
    }

    #[test]
    fn unpair_removes_both_directions() {
        let mut session = session_with(&["A", "B"]);
        session.apply(&Mutation::PairSuperset { a: 0, b: 1 });
        assert!(session.apply(&Mutation::UnpairSuperset { exercise: 1 }));
        assert!(session.pairings().is_empty());
        assert!(!session.apply(&Mutation::UnpairSuperset { exercise: 1 }));
    }

    #[test]
    fn self_pairing_is_rejected() {
        let mut session = session_with(&["A"]);
        assert!(!session.apply(&Mutation::PairSuperset { a: 0, b: 0 }));
    }

    #[test]
    fn move_carries_sets_pairings_and_pointer() {
        let mut session = session_with(&["A", "B", "C", "D"]);
        session.apply(&Mutation::AddSet { exercise: 3 });
        session.apply(&Mutation::PairSuperset { a: 3, b: 0 });
        session.apply(&Mutation::SetCurrentExercise { exercise: 1 });

        assert!(session.apply(&Mutation::MoveExercise { from: 3, to: 1 }));

        let names: Vec<_> = session.exercises().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "D", "B", "C"]);
        assert_eq!(session.sets(1).len(), 2);
        assert_eq!(session.partner(1), Some(0));
        assert_eq!(session.current_exercise_index(), 2, "still points at B");
        assert!(session.is_consistent());
    }

    #[test]
    fn set_type_assignment() {
        let mut session = session_with(&["A"]);
        assert!(session.apply(&Mutation::SetType {
            exercise: 0,
            set: 0,
            set_type: SetType::Dropset,
        }));
        assert_eq!(session.set(0, 0).unwrap().set_type, SetType::Dropset);
        assert!(!session.apply(&Mutation::SetType {
            exercise: 0,
            set: 4,
            set_type: SetType::Warmup,
        }));
    }

    #[test]
    fn moved_position_covers_both_directions() {
        assert_eq!(moved_position(1, 3, 1), 3);
        assert_eq!(moved_position(1, 3, 2), 1);
        assert_eq!(moved_position(1, 3, 4), 4);
        assert_eq!(moved_position(3, 0, 0), 1);
        assert_eq!(moved_position(3, 0, 3), 0);
    }
}
