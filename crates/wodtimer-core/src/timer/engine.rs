//! Shared engine surface.
//!
//! Each timer kind is its own tick-count state machine. None of them read
//! the wall clock: a running engine moves by exactly one step per accepted
//! tick, and a paused engine does not move at all.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |          |
//!            +--> Complete <--+   (clock ran out, or finish())
//! reset(): any -> Idle
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::amrap::Amrap;
use super::config::{TimerConfig, TimerKind};
use super::emom::Emom;
use super::for_time::ForTime;
use super::format::Granularity;
use super::stopwatch::Stopwatch;
use super::tabata::Tabata;
use super::tick::{Armed, Tick, TickSource, Ticking, DISPLAY_TICK};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Complete,
}

impl TimerStatus {
    pub fn is_running(self) -> bool {
        self == TimerStatus::Running
    }

    pub fn is_paused(self) -> bool {
        self == TimerStatus::Paused
    }

    pub fn is_complete(self) -> bool {
        self == TimerStatus::Complete
    }
}

/// Knobs shared by all engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Tick period; also the amount each tick moves the clock.
    pub tick: Duration,
    pub granularity: Granularity,
    /// Stopwatch auto-start delay after mount. `None` disables auto-start.
    pub auto_start_delay: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tick: DISPLAY_TICK,
            granularity: Granularity::Centiseconds,
            auto_start_delay: Some(Duration::from_millis(500)),
        }
    }
}

impl EngineOptions {
    pub(crate) fn step_ms(&self) -> u64 {
        (self.tick.as_millis() as u64).max(1)
    }
}

/// Everything a display needs, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub kind: TimerKind,
    pub status: TimerStatus,
    /// The number the big display shows (remaining for countdowns,
    /// elapsed for count-ups).
    pub display_ms: u64,
    pub display: String,
    pub remaining_ms: Option<u64>,
    pub elapsed_ms: u64,
    pub current_round: u32,
    pub total_rounds: Option<u32>,
    pub is_work_phase: Option<bool>,
    pub phase_remaining_ms: Option<u64>,
    pub final_time: Option<String>,
    pub is_on_fire: bool,
}

impl TimerSnapshot {
    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.status.is_paused()
    }
}

/// Common operations of every timer kind.
///
/// Operations that do not apply to the current status return `None` and
/// change nothing.
pub trait TimerEngine: Ticking {
    fn kind(&self) -> TimerKind;
    fn status(&self) -> TimerStatus;

    /// Idle -> Running. From Paused this behaves as [`resume`](Self::resume).
    fn start(&mut self) -> Option<Event>;
    fn pause(&mut self) -> Option<Event>;
    fn resume(&mut self) -> Option<Event>;
    /// Back to the exact state the engine was constructed in.
    fn reset(&mut self) -> Option<Event>;
    /// Stop early and record the final time.
    fn finish(&mut self) -> Option<Event>;

    /// Manual round counter. Engines that advance rounds on their own
    /// ignore it.
    fn increment_round(&mut self) -> Option<Event> {
        None
    }

    fn current_round(&self) -> u32;
    fn final_time(&self) -> Option<&str>;
    fn snapshot(&self) -> TimerSnapshot;

    fn is_running(&self) -> bool {
        self.status().is_running()
    }

    fn is_paused(&self) -> bool {
        self.status().is_paused()
    }
}

/// Status plus the single tick handle that goes with it. Every transition
/// that stops or restarts ticking goes through here, so the handle is
/// always cleared before it is set.
#[derive(Debug, Clone)]
pub(crate) struct Run {
    status: TimerStatus,
    ticks: TickSource,
}

impl Run {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            status: TimerStatus::Idle,
            ticks: TickSource::interval(period),
        }
    }

    pub(crate) fn status(&self) -> TimerStatus {
        self.status
    }

    pub(crate) fn armed(&self) -> Option<Armed> {
        match self.status {
            TimerStatus::Running => self.ticks.armed(),
            _ => None,
        }
    }

    /// Idle -> Running.
    pub(crate) fn start(&mut self) -> bool {
        if self.status != TimerStatus::Idle {
            return false;
        }
        self.status = TimerStatus::Running;
        self.ticks.arm();
        true
    }

    /// Running -> Paused.
    pub(crate) fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.ticks.cancel();
        self.status = TimerStatus::Paused;
        true
    }

    /// Paused -> Running.
    pub(crate) fn resume(&mut self) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.status = TimerStatus::Running;
        self.ticks.arm();
        true
    }

    /// Running | Paused -> Complete.
    pub(crate) fn complete(&mut self) -> bool {
        if !matches!(self.status, TimerStatus::Running | TimerStatus::Paused) {
            return false;
        }
        self.ticks.cancel();
        self.status = TimerStatus::Complete;
        true
    }

    pub(crate) fn reset(&mut self) {
        self.ticks.cancel();
        self.status = TimerStatus::Idle;
    }

    /// A tick counts only while running and only from the live handle.
    pub(crate) fn accepts(&mut self, tick: Tick) -> bool {
        self.status == TimerStatus::Running && self.ticks.accepts(tick)
    }
}

pub(crate) fn started(kind: TimerKind) -> Event {
    Event::TimerStarted { kind, at: Utc::now() }
}

pub(crate) fn paused(kind: TimerKind, display_ms: u64) -> Event {
    Event::TimerPaused {
        kind,
        display_ms,
        at: Utc::now(),
    }
}

pub(crate) fn resumed(kind: TimerKind, display_ms: u64) -> Event {
    Event::TimerResumed {
        kind,
        display_ms,
        at: Utc::now(),
    }
}

pub(crate) fn reset_event(kind: TimerKind) -> Event {
    Event::TimerReset { kind, at: Utc::now() }
}

pub(crate) fn round_counted(kind: TimerKind, round: u32) -> Event {
    Event::RoundCounted {
        kind,
        round,
        at: Utc::now(),
    }
}

pub(crate) fn completed(kind: TimerKind, final_time: &str, rounds: u32, manual: bool) -> Event {
    Event::TimerCompleted {
        kind,
        final_time: final_time.to_string(),
        rounds,
        manual,
        at: Utc::now(),
    }
}

/// Any timer kind behind one type.
#[derive(Debug, Clone)]
pub enum Timer {
    Stopwatch(Stopwatch),
    ForTime(ForTime),
    Emom(Emom),
    Tabata(Tabata),
    Amrap(Amrap),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Timer::Stopwatch($inner) => $body,
            Timer::ForTime($inner) => $body,
            Timer::Emom($inner) => $body,
            Timer::Tabata($inner) => $body,
            Timer::Amrap($inner) => $body,
        }
    };
}

impl Timer {
    pub fn from_config(config: &TimerConfig, options: &EngineOptions) -> Self {
        match config {
            TimerConfig::Stopwatch => Timer::Stopwatch(Stopwatch::new(options)),
            TimerConfig::ForTime {
                cap,
                sets,
                rest_time_secs,
            } => Timer::ForTime(ForTime::new(*cap, *sets, *rest_time_secs, options)),
            TimerConfig::Emom {
                rounds,
                duration_secs,
            } => Timer::Emom(Emom::new(*rounds, *duration_secs, options)),
            TimerConfig::Tabata {
                rounds,
                work_secs,
                rest_secs,
            } => Timer::Tabata(Tabata::new(*rounds, *work_secs, *rest_secs, options)),
            TimerConfig::Amrap { cap } => Timer::Amrap(Amrap::new(*cap, options)),
        }
    }

    /// Mount hook; only the stopwatch reacts (delayed auto-start).
    pub fn mount(&mut self) -> Option<Event> {
        match self {
            Timer::Stopwatch(sw) => sw.mount(),
            _ => None,
        }
    }

    /// Unmount hook: cancel every schedule the timer holds.
    pub fn unmount(&mut self) -> Option<Event> {
        match self {
            Timer::Stopwatch(sw) => sw.unmount(),
            other => {
                let was_running = other.is_running();
                let kind = other.kind();
                other.pause();
                was_running.then(|| Event::TimerUnmounted {
                    kind,
                    at: Utc::now(),
                })
            }
        }
    }
}

impl Ticking for Timer {
    fn armed(&self) -> Option<Armed> {
        dispatch!(self, t => t.armed())
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        dispatch!(self, t => t.on_tick(tick))
    }
}

impl TimerEngine for Timer {
    fn kind(&self) -> TimerKind {
        dispatch!(self, t => t.kind())
    }

    fn status(&self) -> TimerStatus {
        dispatch!(self, t => t.status())
    }

    fn start(&mut self) -> Option<Event> {
        dispatch!(self, t => t.start())
    }

    fn pause(&mut self) -> Option<Event> {
        dispatch!(self, t => t.pause())
    }

    fn resume(&mut self) -> Option<Event> {
        dispatch!(self, t => t.resume())
    }

    fn reset(&mut self) -> Option<Event> {
        dispatch!(self, t => t.reset())
    }

    fn finish(&mut self) -> Option<Event> {
        dispatch!(self, t => t.finish())
    }

    fn increment_round(&mut self) -> Option<Event> {
        dispatch!(self, t => t.increment_round())
    }

    fn current_round(&self) -> u32 {
        dispatch!(self, t => t.current_round())
    }

    fn final_time(&self) -> Option<&str> {
        dispatch!(self, t => t.final_time())
    }

    fn snapshot(&self) -> TimerSnapshot {
        dispatch!(self, t => t.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::config::TimeCap;

    #[test]
    fn run_rejects_double_start() {
        let mut run = Run::new(DISPLAY_TICK);
        assert!(run.start());
        let first = run.armed().unwrap().tick;
        assert!(!run.start());
        assert_eq!(run.armed().unwrap().tick, first, "no second schedule");
    }

    #[test]
    fn run_pause_is_noop_unless_running() {
        let mut run = Run::new(DISPLAY_TICK);
        assert!(!run.pause());
        assert_eq!(run.status(), TimerStatus::Idle);
    }

    #[test]
    fn run_drops_ticks_from_before_pause() {
        let mut run = Run::new(DISPLAY_TICK);
        run.start();
        let stale = run.armed().unwrap().tick;
        run.pause();
        run.resume();
        assert!(!run.accepts(stale));
        let live = run.armed().unwrap().tick;
        assert!(run.accepts(live));
    }

    #[test]
    fn timer_dispatches_by_config() {
        let options = EngineOptions::default();
        let timer = Timer::from_config(
            &TimerConfig::Amrap {
                cap: TimeCap::new(12, 0),
            },
            &options,
        );
        assert_eq!(timer.kind(), TimerKind::Amrap);
        assert_eq!(timer.snapshot().display, "12:00.00");
    }

    #[test]
    fn unmount_cancels_running_timer() {
        let options = EngineOptions::default();
        let mut timer = Timer::from_config(
            &TimerConfig::Emom {
                rounds: 2,
                duration_secs: 30,
            },
            &options,
        );
        timer.start();
        assert!(timer.armed().is_some());
        let event = timer.unmount();
        assert!(matches!(event, Some(Event::TimerUnmounted { .. })));
        assert!(timer.armed().is_none());
    }
}
