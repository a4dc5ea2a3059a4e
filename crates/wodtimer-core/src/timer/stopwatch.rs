//! Free-running stopwatch.
//!
//! Counts up from zero with no bound. When mounted it starts itself after a
//! short configurable delay; unmounting before the delay elapses cancels the
//! pending start.

use chrono::Utc;
use std::time::Duration;
use tracing::debug;

use super::config::TimerKind;
use super::engine::{self, EngineOptions, Run, TimerEngine, TimerSnapshot, TimerStatus};
use super::format::{format_time, Granularity};
use super::tick::{Armed, Tick, TickSource, Ticking};
use crate::events::Event;

#[derive(Debug, Clone)]
pub struct Stopwatch {
    run: Run,
    step_ms: u64,
    granularity: Granularity,
    elapsed_ms: u64,
    current_round: u32,
    final_time: Option<String>,
    auto_start: Option<TickSource>,
    mounted: bool,
}

impl Stopwatch {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            run: Run::new(options.tick),
            step_ms: options.step_ms(),
            granularity: options.granularity,
            elapsed_ms: 0,
            current_round: 0,
            final_time: None,
            auto_start: options.auto_start_delay.map(TickSource::once),
            mounted: false,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Whether a delayed auto-start is pending.
    pub fn auto_start_pending(&self) -> bool {
        self.auto_start.as_ref().is_some_and(|s| s.is_armed())
    }

    /// Screen appeared: schedule the auto-start if one is configured.
    pub fn mount(&mut self) -> Option<Event> {
        self.mounted = true;
        self.arm_auto_start()
    }

    /// Screen went away: cancel the pending auto-start and any running
    /// schedule. Elapsed time is kept.
    pub fn unmount(&mut self) -> Option<Event> {
        self.mounted = false;
        let had_schedule = self.auto_start_pending() || self.run.status().is_running();
        self.cancel_auto_start();
        self.run.pause();
        had_schedule.then(|| Event::TimerUnmounted {
            kind: TimerKind::Stopwatch,
            at: Utc::now(),
        })
    }

    fn arm_auto_start(&mut self) -> Option<Event> {
        if self.run.status() != TimerStatus::Idle {
            return None;
        }
        let source = self.auto_start.as_mut()?;
        source.arm();
        let delay = source.period();
        debug!(delay_ms = delay.as_millis() as u64, "stopwatch auto-start armed");
        Some(Event::AutoStartArmed {
            delay_ms: delay.as_millis() as u64,
            at: Utc::now(),
        })
    }

    fn cancel_auto_start(&mut self) {
        if let Some(source) = self.auto_start.as_mut() {
            source.cancel();
        }
    }

    /// Auto-start delay, if configured.
    pub fn auto_start_delay(&self) -> Option<Duration> {
        self.auto_start.as_ref().map(|s| s.period())
    }
}

impl Ticking for Stopwatch {
    fn armed(&self) -> Option<Armed> {
        self.run
            .armed()
            .or_else(|| self.auto_start.as_ref().and_then(|s| s.armed()))
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        if let Some(source) = self.auto_start.as_mut() {
            if source.accepts(tick) {
                return self.start();
            }
        }
        if !self.run.accepts(tick) {
            return None;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.step_ms);
        None
    }
}

impl TimerEngine for Stopwatch {
    fn kind(&self) -> TimerKind {
        TimerKind::Stopwatch
    }

    fn status(&self) -> TimerStatus {
        self.run.status()
    }

    fn start(&mut self) -> Option<Event> {
        match self.run.status() {
            TimerStatus::Idle => {
                self.cancel_auto_start();
                self.run.start();
                Some(engine::started(TimerKind::Stopwatch))
            }
            TimerStatus::Paused => self.resume(),
            _ => None,
        }
    }

    fn pause(&mut self) -> Option<Event> {
        self.run
            .pause()
            .then(|| engine::paused(TimerKind::Stopwatch, self.elapsed_ms))
    }

    fn resume(&mut self) -> Option<Event> {
        self.run
            .resume()
            .then(|| engine::resumed(TimerKind::Stopwatch, self.elapsed_ms))
    }

    /// Clears elapsed time, laps and the final time, then re-arms the
    /// auto-start if the stopwatch is still mounted.
    fn reset(&mut self) -> Option<Event> {
        self.run.reset();
        self.cancel_auto_start();
        self.elapsed_ms = 0;
        self.current_round = 0;
        self.final_time = None;
        if self.mounted {
            self.arm_auto_start();
        }
        Some(engine::reset_event(TimerKind::Stopwatch))
    }

    fn finish(&mut self) -> Option<Event> {
        if !self.run.complete() {
            return None;
        }
        let final_time = format_time(self.elapsed_ms, self.granularity);
        let event = engine::completed(TimerKind::Stopwatch, &final_time, self.current_round, true);
        self.final_time = Some(final_time);
        Some(event)
    }

    fn increment_round(&mut self) -> Option<Event> {
        if !matches!(self.run.status(), TimerStatus::Running | TimerStatus::Paused) {
            return None;
        }
        self.current_round += 1;
        Some(engine::round_counted(TimerKind::Stopwatch, self.current_round))
    }

    fn current_round(&self) -> u32 {
        self.current_round
    }

    fn final_time(&self) -> Option<&str> {
        self.final_time.as_deref()
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            kind: TimerKind::Stopwatch,
            status: self.run.status(),
            display_ms: self.elapsed_ms,
            display: format_time(self.elapsed_ms, self.granularity),
            remaining_ms: None,
            elapsed_ms: self.elapsed_ms,
            current_round: self.current_round,
            total_rounds: None,
            is_work_phase: None,
            phase_remaining_ms: None,
            final_time: self.final_time.clone(),
            is_on_fire: false,
        }
    }
}
