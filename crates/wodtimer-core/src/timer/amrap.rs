//! AMRAP: one countdown window, rounds counted by hand.

use super::config::{TimeCap, TimerKind};
use super::engine::{self, EngineOptions, Run, TimerEngine, TimerSnapshot, TimerStatus};
use super::format::{format_time, Granularity};
use super::tick::{Armed, Tick, Ticking};
use crate::events::Event;

#[derive(Debug, Clone)]
pub struct Amrap {
    run: Run,
    step_ms: u64,
    granularity: Granularity,
    total_ms: u64,
    remaining_ms: u64,
    current_round: u32,
    final_time: Option<String>,
    is_on_fire: bool,
}

impl Amrap {
    pub fn new(cap: TimeCap, options: &EngineOptions) -> Self {
        let total_ms = cap.total_ms();
        Self {
            run: Run::new(options.tick),
            step_ms: options.step_ms(),
            granularity: options.granularity,
            total_ms,
            remaining_ms: total_ms,
            current_round: 0,
            final_time: None,
            is_on_fire: false,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn is_on_fire(&self) -> bool {
        self.is_on_fire
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn complete(&mut self, manual: bool) -> Event {
        let final_time = format_time(self.total_ms, self.granularity);
        let event = engine::completed(TimerKind::Amrap, &final_time, self.current_round, manual);
        self.final_time = Some(final_time);
        event
    }
}

impl Ticking for Amrap {
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
        self.run.complete();
        self.is_on_fire = true;
        Some(self.complete(false))
    }
}

impl TimerEngine for Amrap {
    fn kind(&self) -> TimerKind {
        TimerKind::Amrap
    }

    fn status(&self) -> TimerStatus {
        self.run.status()
    }

    fn start(&mut self) -> Option<Event> {
        match self.run.status() {
            TimerStatus::Idle => {
                self.run.start();
                Some(engine::started(TimerKind::Amrap))
            }
            TimerStatus::Paused => self.resume(),
            _ => None,
        }
    }

    fn pause(&mut self) -> Option<Event> {
        self.run
            .pause()
            .then(|| engine::paused(TimerKind::Amrap, self.remaining_ms))
    }

    fn resume(&mut self) -> Option<Event> {
        self.run
            .resume()
            .then(|| engine::resumed(TimerKind::Amrap, self.remaining_ms))
    }

    fn reset(&mut self) -> Option<Event> {
        self.run.reset();
        self.remaining_ms = self.total_ms;
        self.current_round = 0;
        self.final_time = None;
        self.is_on_fire = false;
        Some(engine::reset_event(TimerKind::Amrap))
    }

    fn finish(&mut self) -> Option<Event> {
        if !self.run.complete() {
            return None;
        }
        Some(self.complete(true))
    }

    fn increment_round(&mut self) -> Option<Event> {
        if !matches!(self.run.status(), TimerStatus::Running | TimerStatus::Paused) {
            return None;
        }
        self.current_round += 1;
        Some(engine::round_counted(TimerKind::Amrap, self.current_round))
    }

    fn current_round(&self) -> u32 {
        self.current_round
    }

    fn final_time(&self) -> Option<&str> {
        self.final_time.as_deref()
    }

    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            kind: TimerKind::Amrap,
            status: self.run.status(),
            display_ms: self.remaining_ms,
            display: format_time(self.remaining_ms, self.granularity),
            remaining_ms: Some(self.remaining_ms),
            elapsed_ms: self.total_ms - self.remaining_ms,
            current_round: self.current_round,
            total_rounds: None,
            is_work_phase: None,
            phase_remaining_ms: None,
            final_time: self.final_time.clone(),
            is_on_fire: self.is_on_fire,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amrap(minutes: u32, seconds: u32) -> Amrap {
        Amrap::new(TimeCap::new(minutes, seconds), &EngineOptions::default())
    }

    #[test]
    fn window_runs_out_once() {
        let mut a = amrap(0, 1);
        a.start();
        let events: Vec<_> = (0..150).filter_map(|_| a.tick()).collect();
        assert_eq!(events.len(), 1);
        assert!(a.is_on_fire());
        assert_eq!(a.final_time(), Some("00:01.00"));
        assert_eq!(a.remaining_ms(), 0);
    }

    #[test]
    fn rounds_are_manual_and_uncapped() {
        let mut a = amrap(0, 1);
        a.start();
        for _ in 0..50 {
            a.increment_round();
        }
        assert_eq!(a.current_round(), 50);
    }

    #[test]
    fn double_start_does_not_double_speed() {
        let mut a = amrap(1, 0);
        a.start();
        assert!(a.start().is_none());
        a.tick();
        assert_eq!(a.remaining_ms(), 59_990);
    }

    #[test]
    fn zero_window_completes_on_first_tick() {
        let mut a = amrap(0, 0);
        a.start();
        assert!(matches!(a.tick(), Some(Event::TimerCompleted { .. })));
        assert_eq!(a.final_time(), Some("00:00.00"));
    }

    #[test]
    fn reset_restores_construction_state() {
        let mut a = amrap(0, 30);
        a.start();
        for _ in 0..10 {
            a.tick();
        }
        a.increment_round();
        a.finish();
        a.reset();
        assert_eq!(a.remaining_ms(), 30_000);
        assert_eq!(a.current_round(), 0);
        assert!(a.final_time().is_none());
        assert!(!a.is_on_fire());
        assert_eq!(a.status(), TimerStatus::Idle);
    }
}
