//! User-authored workouts: an ordered list of timer blocks.

mod library;
mod sequencer;

pub use library::WorkoutLibrary;
pub use sequencer::{NextBlock, SessionOptions, SessionPhase, SessionView, WorkoutSession};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::timer::{TimerConfig, TimerKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutBlock {
    pub id: String,
    pub timer_type: TimerKind,
    pub timer_config: TimerConfig,
    #[serde(default)]
    pub sets: Option<u32>,
}

impl WorkoutBlock {
    /// Build a block with a fresh id. Stopwatch blocks and configs that
    /// would finish instantly are rejected.
    pub fn new(timer_config: TimerConfig, sets: Option<u32>) -> Result<Self, ValidationError> {
        let block = Self {
            id: Uuid::new_v4().to_string(),
            timer_type: timer_config.kind(),
            timer_config,
            sets,
        };
        block.validate()?;
        Ok(block)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.timer_type.is_block_kind() {
            return Err(ValidationError::InvalidValue {
                field: "timer_type".into(),
                message: format!("{} cannot be a workout block", self.timer_type),
            });
        }
        if self.timer_type != self.timer_config.kind() {
            return Err(ValidationError::InvalidValue {
                field: "timer_config".into(),
                message: format!(
                    "config is {} but block says {}",
                    self.timer_config.kind(),
                    self.timer_type
                ),
            });
        }
        if self.sets == Some(0) {
            return Err(ValidationError::ZeroCount { field: "sets" });
        }
        self.timer_config.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub blocks: Vec<WorkoutBlock>,
    pub created_at: DateTime<Utc>,
}

impl Workout {
    pub fn block_index(&self, block_id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == block_id)
    }
}

/// What the name-entry modal hands to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkout {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<WorkoutBlock>,
}

impl NewWorkout {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "workout name cannot be empty".into(),
            });
        }
        self.blocks.iter().try_for_each(WorkoutBlock::validate)
    }

    pub fn into_workout(self) -> Workout {
        Workout {
            id: Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            blocks: self.blocks,
            created_at: Utc::now(),
        }
    }
}

/// Persistence collaborator for workouts. Reads reflect the latest
/// committed write.
pub trait WorkoutStore {
    fn load_workouts(&self) -> Result<Vec<Workout>>;
    fn create_workout(&self, new: NewWorkout) -> Result<Workout>;
    fn delete_workout(&self, id: &str) -> Result<()>;
    fn get_workout_by_id(&self, id: &str) -> Result<Option<Workout>>;
    fn add_block(&self, workout_id: &str, block: WorkoutBlock) -> Result<Workout>;
}

impl<S: WorkoutStore + ?Sized> WorkoutStore for &S {
    fn load_workouts(&self) -> Result<Vec<Workout>> {
        (**self).load_workouts()
    }

    fn create_workout(&self, new: NewWorkout) -> Result<Workout> {
        (**self).create_workout(new)
    }

    fn delete_workout(&self, id: &str) -> Result<()> {
        (**self).delete_workout(id)
    }

    fn get_workout_by_id(&self, id: &str) -> Result<Option<Workout>> {
        (**self).get_workout_by_id(id)
    }

    fn add_block(&self, workout_id: &str, block: WorkoutBlock) -> Result<Workout> {
        (**self).add_block(workout_id, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimeCap;

    #[test]
    fn stopwatch_blocks_are_rejected() {
        assert!(WorkoutBlock::new(TimerConfig::Stopwatch, None).is_err());
    }

    #[test]
    fn mismatched_kind_is_rejected() {
        let mut block = WorkoutBlock::new(
            TimerConfig::Amrap {
                cap: TimeCap::new(5, 0),
            },
            None,
        )
        .unwrap();
        block.timer_type = TimerKind::Emom;
        assert!(block.validate().is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(NewWorkout::named("   ").validate().is_err());
        assert!(NewWorkout::named("Murph").validate().is_ok());
    }

    #[test]
    fn into_workout_trims_name() {
        let workout = NewWorkout::named("  Fran ").into_workout();
        assert_eq!(workout.name, "Fran");
        assert!(!workout.id.is_empty());
    }
}
