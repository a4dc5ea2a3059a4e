//! For Time: race against an optional time cap.
//!
//! With a cap the clock counts down and hitting zero ends the run with the
//! cap recorded as the final time. Without a cap the clock counts up and the
//! run only ends when the athlete finishes it.

use super::config::{TimeCap, TimerKind};
use super::engine::{self, EngineOptions, Run, TimerEngine, TimerSnapshot, TimerStatus};
use super::format::{format_time, Granularity};
use super::tick::{Armed, Tick, Ticking};
use crate::events::Event;

#[derive(Debug, Clone)]
pub struct ForTime {
    run: Run,
    step_ms: u64,
    granularity: Granularity,
    cap_ms: Option<u64>,
    sets: Option<u32>,
    rest_time_secs: Option<u32>,
    remaining_ms: u64,
    elapsed_ms: u64,
    current_round: u32,
    final_time: Option<String>,
    is_on_fire: bool,
}

impl ForTime {
    pub fn new(
        cap: Option<TimeCap>,
        sets: Option<u32>,
        rest_time_secs: Option<u32>,
        options: &EngineOptions,
    ) -> Self {
        let cap_ms = cap.map(|c| c.total_ms());
        Self {
            run: Run::new(options.tick),
            step_ms: options.step_ms(),
            granularity: options.granularity,
            cap_ms,
            sets,
            rest_time_secs,
            remaining_ms: cap_ms.unwrap_or(0),
            elapsed_ms: 0,
            current_round: 0,
            final_time: None,
            is_on_fire: false,
        }
    }

    pub fn cap_ms(&self) -> Option<u64> {
        self.cap_ms
    }

    pub fn sets(&self) -> Option<u32> {
        self.sets
    }

    pub fn rest_time_secs(&self) -> Option<u32> {
        self.rest_time_secs
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn is_on_fire(&self) -> bool {
        self.is_on_fire
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn display_ms(&self) -> u64 {
        match self.cap_ms {
            Some(_) => self.remaining_ms,
            None => self.elapsed_ms,
        }
    }

    /// Capped runs record the cap; open-ended runs record the clock.
    fn recorded_time(&self) -> String {
        format_time(self.cap_ms.unwrap_or(self.elapsed_ms), self.granularity)
    }
}

impl Ticking for ForTime {
    fn armed(&self) -> Option<Armed> {
        self.run.armed()
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        if !self.run.accepts(tick) {
            return None;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.step_ms);
        if self.cap_ms.is_none() {
            return None;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(self.step_ms);
        if self.remaining_ms > 0 {
            return None;
        }
        self.run.complete();
        self.is_on_fire = true;
        let final_time = self.recorded_time();
        let event = engine::completed(TimerKind::ForTime, &final_time, self.current_round, false);
        self.final_time = Some(final_time);
        Some(event)
    }
}

impl TimerEngine for ForTime {
    fn kind(&self) -> TimerKind {
        TimerKind::ForTime
    }

    fn status(&self) -> TimerStatus {
        self.run.status()
    }

    fn start(&mut self) -> Option<Event> {
        match self.run.status() {
            TimerStatus::Idle => {
                self.run.start();
                Some(engine::started(TimerKind::ForTime))
            }
            TimerStatus::Paused => self.resume(),
            _ => None,
        }
    }

    fn pause(&mut self) -> Option<Event> {
        self.run
            .pause()
            .then(|| engine::paused(TimerKind::ForTime, self.display_ms()))
    }

    fn resume(&mut self) -> Option<Event> {
        self.run
            .resume()
            .then(|| engine::resumed(TimerKind::ForTime, self.display_ms()))
    }

    fn reset(&mut self) -> Option<Event> {
        self.run.reset();
        self.remaining_ms = self.cap_ms.unwrap_or(0);
        self.elapsed_ms = 0;
        self.current_round = 0;
        self.final_time = None;
        self.is_on_fire = false;
        Some(engine::reset_event(TimerKind::ForTime))
    }

    fn finish(&mut self) -> Option<Event> {
        if !self.run.complete() {
            return None;
        }
        let final_time = self.recorded_time();
        let event = engine::completed(TimerKind::ForTime, &final_time, self.current_round, true);
        self.final_time = Some(final_time);
        Some(event)
    }

    fn increment_round(&mut self) -> Option<Event> {
        if !matches!(self.run.status(), TimerStatus::Running | TimerStatus::Paused) {
            return None;
        }
        self.current_round += 1;
        Some(engine::round_counted(TimerKind::ForTime, self.current_round))
    }

    fn current_round(&self) -> u32 {
        self.current_round
    }

    fn final_time(&self) -> Option<&str> {
        self.final_time.as_deref()
    }

    fn snapshot(&self) -> TimerSnapshot {
        let display_ms = self.display_ms();
        TimerSnapshot {
            kind: TimerKind::ForTime,
            status: self.run.status(),
            display_ms,
            display: format_time(display_ms, self.granularity),
            remaining_ms: self.cap_ms.map(|_| self.remaining_ms),
            elapsed_ms: self.elapsed_ms,
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

    fn capped(minutes: u32, seconds: u32) -> ForTime {
        ForTime::new(
            Some(TimeCap::new(minutes, seconds)),
            None,
            None,
            &EngineOptions::default(),
        )
    }

    #[test]
    fn reaching_cap_sets_on_fire_and_cap_time() {
        let mut ft = capped(0, 2);
        ft.start();
        let mut completions = 0;
        for _ in 0..200 {
            if let Some(Event::TimerCompleted { final_time, manual, .. }) = ft.tick() {
                assert_eq!(final_time, "00:02.00");
                assert!(!manual);
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(ft.remaining_ms(), 0);
        assert!(ft.is_on_fire());
        assert_eq!(ft.status(), TimerStatus::Complete);
        assert!(ft.tick().is_none());
    }

    #[test]
    fn finish_before_cap_records_cap() {
        let mut ft = capped(10, 0);
        ft.start();
        for _ in 0..500 {
            ft.tick();
        }
        ft.increment_round();
        ft.increment_round();
        ft.finish();
        assert_eq!(ft.final_time(), Some("10:00.00"));
        assert_eq!(ft.current_round(), 2);
        assert!(!ft.is_on_fire());
    }

    #[test]
    fn open_ended_counts_up_until_finished() {
        let mut ft = ForTime::new(None, None, None, &EngineOptions::default());
        ft.start();
        for _ in 0..100_000 {
            assert!(ft.tick().is_none());
        }
        assert_eq!(ft.elapsed_ms(), 1_000_000);
        ft.finish();
        assert_eq!(ft.final_time(), Some("16:40.00"));
    }

    #[test]
    fn pause_resume_leaves_remaining_untouched() {
        let mut ft = capped(1, 0);
        ft.start();
        for _ in 0..42 {
            ft.tick();
        }
        let before = ft.remaining_ms();
        ft.pause();
        ft.resume();
        assert_eq!(ft.remaining_ms(), before);
    }

    #[test]
    fn rounds_only_count_while_active() {
        let mut ft = capped(1, 0);
        assert!(ft.increment_round().is_none());
        ft.start();
        assert!(ft.increment_round().is_some());
        ft.finish();
        assert!(ft.increment_round().is_none());
        assert_eq!(ft.current_round(), 1);
    }
}
