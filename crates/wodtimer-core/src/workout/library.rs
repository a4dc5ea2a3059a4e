//! The workouts list as the screen sees it.
//!
//! Storage failures never reach the user: they are logged, the operation
//! becomes a no-op and the last good list stays on screen. Nothing is
//! retried automatically.

use tracing::{error, warn};

use super::{NewWorkout, Workout, WorkoutStore};

pub struct WorkoutLibrary<S: WorkoutStore> {
    store: S,
    workouts: Vec<Workout>,
    loaded: bool,
}

impl<S: WorkoutStore> WorkoutLibrary<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            workouts: Vec::new(),
            loaded: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    /// True until the first successful load.
    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    pub fn refresh(&mut self) -> &[Workout] {
        match self.store.load_workouts() {
            Ok(workouts) => {
                self.workouts = workouts;
                self.loaded = true;
            }
            Err(e) => error!(error = %e, "failed to load workouts"),
        }
        &self.workouts
    }

    pub fn create(&mut self, name: &str) -> Option<Workout> {
        let new = NewWorkout::named(name);
        if let Err(e) = new.validate() {
            warn!(error = %e, "workout not created");
            return None;
        }
        match self.store.create_workout(new) {
            Ok(workout) => {
                self.refresh();
                Some(workout)
            }
            Err(e) => {
                error!(error = %e, "failed to create workout");
                None
            }
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        match self.store.delete_workout(id) {
            Ok(()) => {
                self.refresh();
                true
            }
            Err(e) => {
                error!(error = %e, workout_id = id, "failed to delete workout");
                false
            }
        }
    }
}
