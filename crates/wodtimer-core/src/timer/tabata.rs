//! Tabata: alternating work and rest phases across a fixed number of
//! rounds. Every round, the last one included, ends with its rest phase.

use chrono::Utc;
use tracing::debug;

use super::config::TimerKind;
use super::engine::{self, EngineOptions, Run, TimerEngine, TimerSnapshot, TimerStatus};
use super::format::{format_time, Granularity};
use super::tick::{Armed, Tick, Ticking};
use crate::events::Event;

#[derive(Debug, Clone)]
pub struct Tabata {
    run: Run,
    step_ms: u64,
    granularity: Granularity,
    rounds: u32,
    work_ms: u64,
    rest_ms: u64,
    /// Remaining across the whole workout.
    remaining_ms: u64,
    /// Remaining in the current phase.
    phase_remaining_ms: u64,
    current_round: u32,
    is_work_phase: bool,
    final_time: Option<String>,
}

impl Tabata {
    pub fn new(rounds: u32, work_secs: u32, rest_secs: u32, options: &EngineOptions) -> Self {
        let work_ms = u64::from(work_secs) * 1000;
        let rest_ms = u64::from(rest_secs) * 1000;
        Self {
            run: Run::new(options.tick),
            step_ms: options.step_ms(),
            granularity: options.granularity,
            rounds,
            work_ms,
            rest_ms,
            remaining_ms: Self::total(rounds, work_ms, rest_ms),
            phase_remaining_ms: work_ms,
            current_round: 1,
            is_work_phase: true,
            final_time: None,
        }
    }

    fn total(rounds: u32, work_ms: u64, rest_ms: u64) -> u64 {
        u64::from(rounds).saturating_mul(work_ms + rest_ms)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn is_work_phase(&self) -> bool {
        self.is_work_phase
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn phase_remaining_ms(&self) -> u64 {
        self.phase_remaining_ms
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn elapsed_ms(&self) -> u64 {
        Self::total(self.rounds, self.work_ms, self.rest_ms) - self.remaining_ms
    }

    fn record(&mut self, manual: bool) -> Event {
        let final_time = format_time(self.elapsed_ms(), self.granularity);
        let event = engine::completed(TimerKind::Tabata, &final_time, self.current_round, manual);
        self.final_time = Some(final_time);
        event
    }
}

impl Ticking for Tabata {
    fn armed(&self) -> Option<Armed> {
        self.run.armed()
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        if !self.run.accepts(tick) {
            return None;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(self.step_ms);
        self.phase_remaining_ms = self.phase_remaining_ms.saturating_sub(self.step_ms);
        if self.phase_remaining_ms > 0 {
            return None;
        }

        if self.is_work_phase {
            self.is_work_phase = false;
            self.phase_remaining_ms = self.rest_ms;
            debug!(round = self.current_round, "tabata rest phase");
            return Some(Event::PhaseChanged {
                round: self.current_round,
                work: false,
                at: Utc::now(),
            });
        }

        if self.current_round < self.rounds {
            self.current_round += 1;
            self.is_work_phase = true;
            self.phase_remaining_ms = self.work_ms;
            debug!(round = self.current_round, "tabata work phase");
            return Some(Event::RoundAdvanced {
                kind: TimerKind::Tabata,
                round: self.current_round,
                at: Utc::now(),
            });
        }

        self.remaining_ms = 0;
        self.run.complete();
        Some(self.record(false))
    }
}

impl TimerEngine for Tabata {
    fn kind(&self) -> TimerKind {
        TimerKind::Tabata
    }

    fn status(&self) -> TimerStatus {
        self.run.status()
    }

    fn start(&mut self) -> Option<Event> {
        match self.run.status() {
            TimerStatus::Idle => {
                self.run.start();
                Some(engine::started(TimerKind::Tabata))
            }
            TimerStatus::Paused => self.resume(),
            _ => None,
        }
    }

    fn pause(&mut self) -> Option<Event> {
        self.run
            .pause()
            .then(|| engine::paused(TimerKind::Tabata, self.phase_remaining_ms))
    }

    fn resume(&mut self) -> Option<Event> {
        self.run
            .resume()
            .then(|| engine::resumed(TimerKind::Tabata, self.phase_remaining_ms))
    }

    fn reset(&mut self) -> Option<Event> {
        self.run.reset();
        self.remaining_ms = Self::total(self.rounds, self.work_ms, self.rest_ms);
        self.phase_remaining_ms = self.work_ms;
        self.current_round = 1;
        self.is_work_phase = true;
        self.final_time = None;
        Some(engine::reset_event(TimerKind::Tabata))
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
            kind: TimerKind::Tabata,
            status: self.run.status(),
            display_ms: self.phase_remaining_ms,
            display: format_time(self.phase_remaining_ms, self.granularity),
            remaining_ms: Some(self.remaining_ms),
            elapsed_ms: self.elapsed_ms(),
            current_round: self.current_round,
            total_rounds: Some(self.rounds),
            is_work_phase: Some(self.is_work_phase),
            phase_remaining_ms: Some(self.phase_remaining_ms),
            final_time: self.final_time.clone(),
            is_on_fire: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabata(rounds: u32, work: u32, rest: u32) -> Tabata {
        Tabata::new(rounds, work, rest, &EngineOptions::default())
    }

    #[test]
    fn work_then_rest_then_next_round() {
        let mut t = tabata(2, 2, 1);
        t.start();
        for _ in 0..199 {
            t.tick();
        }
        assert!(t.is_work_phase());
        assert!(matches!(t.tick(), Some(Event::PhaseChanged { work: false, round: 1, .. })));
        assert_eq!(t.phase_remaining_ms(), 1000);

        for _ in 0..99 {
            t.tick();
        }
        assert!(matches!(t.tick(), Some(Event::RoundAdvanced { round: 2, .. })));
        assert!(t.is_work_phase());
        assert_eq!(t.remaining_ms(), 3000);
    }

    #[test]
    fn final_round_includes_rest() {
        let mut t = tabata(1, 1, 1);
        t.start();
        for _ in 0..100 {
            t.tick();
        }
        assert!(!t.is_work_phase());
        assert_eq!(t.status(), TimerStatus::Running);
        for _ in 0..99 {
            t.tick();
        }
        assert!(matches!(t.tick(), Some(Event::TimerCompleted { .. })));
        assert_eq!(t.final_time(), Some("00:02.00"));
        assert_eq!(t.remaining_ms(), 0);
    }

    #[test]
    fn pause_freezes_phase() {
        let mut t = tabata(8, 20, 10);
        t.start();
        for _ in 0..733 {
            t.tick();
        }
        t.pause();
        let frozen = t.phase_remaining_ms();
        let stale = t.armed();
        assert!(stale.is_none());
        assert!(t.tick().is_none());
        assert_eq!(t.phase_remaining_ms(), frozen);
    }

    #[test]
    fn manual_finish_records_elapsed() {
        let mut t = tabata(8, 20, 10);
        t.start();
        for _ in 0..4500 {
            t.tick();
        }
        t.finish();
        assert_eq!(t.final_time(), Some("00:45.00"));
        assert_eq!(t.current_round(), 2);
    }
}
