//! Workout execution: walks a workout's blocks one timer at a time.
//!
//! ## State Transitions
//!
//! ```text
//! Loading                                   (workout missing; stays here)
//! Ready(i) -> Countdown(i) -> Active(i) -> Transition(i, celebration)
//!                                               |
//!                        next_block(): Countdown(first uncompleted) | Finished
//! select_block(id): any -> Ready(id)
//! ```
//!
//! The next block is always the first uncompleted block scanning from the
//! start of the workout, so a block skipped earlier comes back before any
//! later one.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{Workout, WorkoutBlock, WorkoutStore};
use crate::device::{restore_portrait, unlock_orientation, OrientationLock};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::timer::{
    Armed, Countdown, EngineOptions, Tick, Ticking, Timer, TimerEngine, TimerSnapshot,
    DEFAULT_COUNTDOWN_SECS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Workout could not be loaded. Nothing happens from here.
    Loading,
    /// Current block chosen, countdown not started.
    Ready,
    Countdown,
    Active,
    /// Between blocks; `celebration` after a block was just completed.
    Transition { celebration: bool },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextBlock {
    Block(usize),
    Terminal,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub countdown_secs: u32,
    pub engine: EngineOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            engine: EngineOptions::default(),
        }
    }
}

/// Read-only surface for the execution screen.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub workout_name: Option<String>,
    pub phase: SessionPhase,
    pub current_index: usize,
    pub current_block: Option<WorkoutBlock>,
    pub upcoming_block: Option<WorkoutBlock>,
    pub is_last_block: bool,
    pub completed_blocks: Vec<String>,
    pub countdown_secs: Option<u32>,
    pub timer: Option<TimerSnapshot>,
}

pub struct WorkoutSession<O: OrientationLock> {
    workout: Option<Workout>,
    options: SessionOptions,
    phase: SessionPhase,
    current_index: usize,
    completed: BTreeSet<String>,
    countdown: Countdown,
    timer: Option<Timer>,
    orientation: O,
    exited: bool,
}

impl<O: OrientationLock> WorkoutSession<O> {
    /// Enter execution. Orientation is released for the lifetime of the
    /// session. A missing or empty workout leaves the session in
    /// [`SessionPhase::Loading`].
    pub fn new(workout: Option<Workout>, options: SessionOptions, mut orientation: O) -> Self {
        unlock_orientation(&mut orientation);
        let workout = workout.filter(|w| {
            if w.blocks.is_empty() {
                warn!(workout_id = %w.id, "workout has no blocks");
            }
            !w.blocks.is_empty()
        });
        let phase = match workout {
            Some(_) => SessionPhase::Ready,
            None => SessionPhase::Loading,
        };
        let countdown = Countdown::new(options.countdown_secs);
        Self {
            workout,
            options,
            phase,
            current_index: 0,
            completed: BTreeSet::new(),
            countdown,
            timer: None,
            orientation,
            exited: false,
        }
    }

    /// Look the workout up and enter execution. Storage failures are logged
    /// and produce a session stuck in `Loading`.
    pub fn load<S: WorkoutStore>(
        store: &S,
        workout_id: &str,
        options: SessionOptions,
        orientation: O,
    ) -> Self {
        let workout = match store.get_workout_by_id(workout_id) {
            Ok(Some(workout)) => Some(workout),
            Ok(None) => {
                warn!(workout_id, "workout not found");
                None
            }
            Err(e) => {
                error!(error = %e, workout_id, "failed to load workout");
                None
            }
        };
        Self::new(workout, options, orientation)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn workout(&self) -> Option<&Workout> {
        self.workout.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_block(&self) -> Option<&WorkoutBlock> {
        self.workout.as_ref()?.blocks.get(self.current_index)
    }

    pub fn completed_blocks(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn is_completed(&self, block_id: &str) -> bool {
        self.completed.contains(block_id)
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn timer(&self) -> Option<&Timer> {
        self.timer.as_ref()
    }

    /// First uncompleted block other than the current one.
    pub fn upcoming_block(&self) -> Option<&WorkoutBlock> {
        let workout = self.workout.as_ref()?;
        workout
            .blocks
            .iter()
            .enumerate()
            .find(|(i, b)| *i != self.current_index && !self.completed.contains(&b.id))
            .map(|(_, b)| b)
    }

    /// No other uncompleted block remains.
    pub fn is_last_block(&self) -> bool {
        self.workout.is_some() && self.upcoming_block().is_none()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            workout_name: self.workout.as_ref().map(|w| w.name.clone()),
            phase: self.phase,
            current_index: self.current_index,
            current_block: self.current_block().cloned(),
            upcoming_block: self.upcoming_block().cloned(),
            is_last_block: self.is_last_block(),
            completed_blocks: self.completed.iter().cloned().collect(),
            countdown_secs: (self.phase == SessionPhase::Countdown).then(|| self.countdown.value()),
            timer: self.timer.as_ref().map(|t| t.snapshot()),
        }
    }

    fn first_uncompleted(&self) -> Option<usize> {
        let workout = self.workout.as_ref()?;
        workout
            .blocks
            .iter()
            .position(|b| !self.completed.contains(&b.id))
    }

    fn is_blocked(&self) -> bool {
        matches!(self.phase, SessionPhase::Loading | SessionPhase::Finished)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Jump to any block, completed or not. Whatever was counting down or
    /// running is cancelled.
    pub fn select_block(&mut self, block_id: &str) -> Result<Option<Event>> {
        if self.phase == SessionPhase::Loading {
            return Ok(None);
        }
        let index = self
            .workout
            .as_ref()
            .and_then(|w| w.block_index(block_id))
            .ok_or_else(|| ValidationError::NotFound {
                collection: "workout".into(),
                id: block_id.to_string(),
            })?;
        self.cancel_block();
        self.current_index = index;
        self.phase = SessionPhase::Ready;
        debug!(index, block_id, "block selected");
        Ok(Some(Event::BlockSelected {
            block_id: block_id.to_string(),
            index,
            at: Utc::now(),
        }))
    }

    /// From the celebration screen with work left, go straight to the next
    /// uncompleted block. Otherwise count down into the current block.
    pub fn start_block(&mut self) -> Option<Event> {
        match self.phase {
            SessionPhase::Transition { celebration: true } if self.upcoming_block().is_some() => {
                self.next_block().1
            }
            SessionPhase::Ready | SessionPhase::Transition { .. } => self.begin_countdown(),
            _ => None,
        }
    }

    /// Move to the first uncompleted block (scanning from index 0) and
    /// count down into it, or end the workout when every block is done.
    /// The event is whatever that transition published.
    pub fn next_block(&mut self) -> (NextBlock, Option<Event>) {
        if self.is_blocked() {
            return (NextBlock::Terminal, None);
        }
        match self.first_uncompleted() {
            Some(index) => {
                self.cancel_block();
                self.current_index = index;
                (NextBlock::Block(index), self.begin_countdown())
            }
            None => (NextBlock::Terminal, self.finish_workout()),
        }
    }

    /// End the workout once every block is in the completed set.
    pub fn finish_if_done(&mut self) -> Option<Event> {
        if self.is_blocked() || self.first_uncompleted().is_some() {
            return None;
        }
        self.finish_workout()
    }

    /// Record the current block as done and show the celebration.
    pub fn on_block_complete(&mut self) -> Option<Event> {
        if self.is_blocked() {
            return None;
        }
        let block_id = self.current_block()?.id.clone();
        self.countdown.reset();
        let final_time = self.timer.as_mut().and_then(|timer| {
            timer.finish();
            timer.final_time().map(str::to_string)
        });
        self.completed.insert(block_id.clone());
        self.phase = SessionPhase::Transition { celebration: true };
        info!(
            index = self.current_index,
            block_id = %block_id,
            completed = self.completed.len(),
            "block completed"
        );
        Some(Event::BlockCompleted {
            block_id,
            index: self.current_index,
            final_time,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.phase {
            SessionPhase::Countdown => {
                self.countdown.pause();
                None
            }
            SessionPhase::Active => self.timer.as_mut()?.pause(),
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        match self.phase {
            SessionPhase::Countdown => {
                self.countdown.resume();
                None
            }
            SessionPhase::Active => self.timer.as_mut()?.resume(),
            _ => None,
        }
    }

    pub fn skip_countdown(&mut self) -> Option<Event> {
        if self.phase != SessionPhase::Countdown {
            return None;
        }
        self.countdown.skip();
        self.activate()
    }

    pub fn increment_round(&mut self) -> Option<Event> {
        match self.phase {
            SessionPhase::Active => self.timer.as_mut()?.increment_round(),
            _ => None,
        }
    }

    /// End the running block by hand; counts as completing it.
    pub fn finish_block(&mut self) -> Option<Event> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.on_block_complete()
    }

    /// Leave execution: cancel everything and restore portrait.
    pub fn exit(&mut self) -> Option<Event> {
        if self.exited {
            return None;
        }
        self.exited = true;
        self.cancel_block();
        restore_portrait(&mut self.orientation);
        Some(Event::WorkoutExited {
            workout_id: self.workout.as_ref().map(|w| w.id.clone()),
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_countdown(&mut self) -> Option<Event> {
        let block_id = self.current_block()?.id.clone();
        self.timer = None;
        self.phase = SessionPhase::Countdown;
        if let Some(Event::CountdownCompleted { .. }) = self.countdown.start() {
            return self.activate();
        }
        debug!(index = self.current_index, "block countdown started");
        Some(Event::BlockStarted {
            block_id,
            index: self.current_index,
            at: Utc::now(),
        })
    }

    fn activate(&mut self) -> Option<Event> {
        let block = self.current_block()?.clone();
        let mut timer = Timer::from_config(&block.timer_config, &self.options.engine);
        timer.start();
        self.timer = Some(timer);
        self.phase = SessionPhase::Active;
        debug!(index = self.current_index, kind = %block.timer_type, "block active");
        Some(Event::BlockActivated {
            block_id: block.id,
            kind: block.timer_type,
            at: Utc::now(),
        })
    }

    fn cancel_block(&mut self) {
        self.countdown.reset();
        if let Some(mut timer) = self.timer.take() {
            timer.unmount();
        }
    }

    fn finish_workout(&mut self) -> Option<Event> {
        self.cancel_block();
        self.phase = SessionPhase::Finished;
        let workout_id = self.workout.as_ref()?.id.clone();
        info!(workout_id = %workout_id, "workout finished");
        Some(Event::WorkoutCompleted {
            workout_id,
            at: Utc::now(),
        })
    }
}

impl<O: OrientationLock> Ticking for WorkoutSession<O> {
    fn armed(&self) -> Option<Armed> {
        match self.phase {
            SessionPhase::Countdown => self.countdown.armed(),
            SessionPhase::Active => self.timer.as_ref()?.armed(),
            _ => None,
        }
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        match self.phase {
            SessionPhase::Countdown => match self.countdown.on_tick(tick)? {
                Event::CountdownCompleted { .. } => self.activate(),
                other => Some(other),
            },
            SessionPhase::Active => match self.timer.as_mut()?.on_tick(tick)? {
                Event::TimerCompleted { .. } => self.on_block_complete(),
                other => Some(other),
            },
            _ => None,
        }
    }
}

impl<O: OrientationLock> Drop for WorkoutSession<O> {
    fn drop(&mut self) {
        if !self.exited {
            restore_portrait(&mut self.orientation);
        }
    }
}
