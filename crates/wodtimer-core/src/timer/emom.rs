//! EMOM: a fixed interval repeated `rounds` times with no gap between
//! rounds. Rounds advance only on their own.

use super::config::TimerKind;
use super::engine::{self, EngineOptions, Run, TimerEngine, TimerSnapshot, TimerStatus};
use super::format::{format_time, Granularity};
use super::tick::{Armed, Tick, Ticking};
use crate::events::Event;
use chrono::Utc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Emom {
    run: Run,
    step_ms: u64,
    granularity: Granularity,
    rounds: u32,
    interval_ms: u64,
    remaining_ms: u64,
    current_round: u32,
    final_time: Option<String>,
}

impl Emom {
    pub fn new(rounds: u32, duration_secs: u32, options: &EngineOptions) -> Self {
        let interval_ms = u64::from(duration_secs) * 1000;
        Self {
            run: Run::new(options.tick),
            step_ms: options.step_ms(),
            granularity: options.granularity,
            rounds,
            interval_ms,
            remaining_ms: interval_ms,
            current_round: 1,
            final_time: None,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Remaining time in the current round.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Time spent across all rounds so far.
    pub fn elapsed_ms(&self) -> u64 {
        let finished_rounds = u64::from(self.current_round.saturating_sub(1));
        finished_rounds * self.interval_ms + (self.interval_ms - self.remaining_ms)
    }

    fn record(&mut self, manual: bool) -> Event {
        let final_time = format_time(self.elapsed_ms(), self.granularity);
        let event = engine::completed(TimerKind::Emom, &final_time, self.current_round, manual);
        self.final_time = Some(final_time);
        event
    }
}

impl Ticking for Emom {
    fn armed(&self) -> Option<Armed> {
        self.run.armed()
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        if !self.run.accepts(tick) {
            return None;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(self.step_ms);
        if self.remaining_ms > 0 {
            return None;
        }
        if self.current_round < self.rounds {
            self.current_round += 1;
            self.remaining_ms = self.interval_ms;
            debug!(round = self.current_round, "emom round advanced");
            return Some(Event::RoundAdvanced {
                kind: TimerKind::Emom,
                round: self.current_round,
                at: Utc::now(),
            });
        }
        self.run.complete();
        Some(self.record(false))
    }
}

impl TimerEngine for Emom {
    fn kind(&self) -> TimerKind {
        TimerKind::Emom
    }

    fn status(&self) -> TimerStatus {
        self.run.status()
    }

    fn start(&mut self) -> Option<Event> {
        match self.run.status() {
            TimerStatus::Idle => {
                self.run.start();
                Some(engine::started(TimerKind::Emom))
            }
            TimerStatus::Paused => self.resume(),
            _ => None,
        }
    }

    fn pause(&mut self) -> Option<Event> {
        self.run
            .pause()
            .then(|| engine::paused(TimerKind::Emom, self.remaining_ms))
    }

    fn resume(&mut self) -> Option<Event> {
        self.run
            .resume()
            .then(|| engine::resumed(TimerKind::Emom, self.remaining_ms))
    }

    fn reset(&mut self) -> Option<Event> {
        self.run.reset();
        self.remaining_ms = self.interval_ms;
        self.current_round = 1;
        self.final_time = None;
        Some(engine::reset_event(TimerKind::Emom))
    }

    fn finish(&mut self) -> Option<Event> {
        if !self.run.complete() {
            return None;
        }
        Some(self.record(true))
    }

    fn current_round(&self) -> u32 {
        self.current_round
    }

    fn final_time(&self) -> Option<&str> {
        self.final_time.as_deref()
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            kind: TimerKind::Emom,
            status: self.run.status(),
            display_ms: self.remaining_ms,
            display: format_time(self.remaining_ms, self.granularity),
            remaining_ms: Some(self.remaining_ms),
            elapsed_ms: self.elapsed_ms(),
            current_round: self.current_round,
            total_rounds: Some(self.rounds),
            is_work_phase: None,
            phase_remaining_ms: None,
            final_time: self.final_time.clone(),
            is_on_fire: false,
        }
    }
}
