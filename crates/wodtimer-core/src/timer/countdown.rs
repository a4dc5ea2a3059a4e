//! Pre-roll countdown: "N seconds, then go".
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |  skip()/reach 0
//!            v
//!         Complete
//! reset(): any -> Idle (no completion)
//! ```
//!
//! Completion is reported exactly once per run through
//! [`Event::CountdownCompleted`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tick::{Armed, Tick, TickSource, Ticking, COUNTDOWN_TICK};
use crate::events::Event;

pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownStatus {
    Idle,
    Running,
    Paused,
    Complete,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    initial_secs: u32,
    value: u32,
    status: CountdownStatus,
    ticks: TickSource,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS)
    }
}

impl Countdown {
    pub fn new(initial_secs: u32) -> Self {
        Self {
            initial_secs,
            value: initial_secs,
            status: CountdownStatus::Idle,
            ticks: TickSource::interval(COUNTDOWN_TICK),
        }
    }

    pub fn initial_secs(&self) -> u32 {
        self.initial_secs
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn status(&self) -> CountdownStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == CountdownStatus::Running
    }

    /// Restart from the initial value. Any schedule from a previous run is
    /// replaced. A zero-second countdown completes immediately.
    pub fn start(&mut self) -> Option<Event> {
        self.value = self.initial_secs;
        if self.initial_secs == 0 {
            self.ticks.cancel();
            self.status = CountdownStatus::Complete;
            return Some(completed(false));
        }
        self.status = CountdownStatus::Running;
        self.ticks.arm();
        Some(Event::CountdownTick {
            remaining_secs: self.value,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> bool {
        if self.status != CountdownStatus::Running {
            return false;
        }
        self.ticks.cancel();
        self.status = CountdownStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != CountdownStatus::Paused {
            return false;
        }
        self.status = CountdownStatus::Running;
        self.ticks.arm();
        true
    }

    /// Complete right now. The value snaps back to the initial value so the
    /// countdown is ready for reuse.
    pub fn skip(&mut self) -> Option<Event> {
        if self.status == CountdownStatus::Complete {
            return None;
        }
        self.ticks.cancel();
        self.value = self.initial_secs;
        self.status = CountdownStatus::Complete;
        debug!("countdown skipped");
        Some(completed(true))
    }

    /// Back to idle without reporting completion.
    pub fn reset(&mut self) -> Option<Event> {
        self.ticks.cancel();
        self.value = self.initial_secs;
        self.status = CountdownStatus::Idle;
        Some(Event::CountdownReset { at: Utc::now() })
    }
}

fn completed(skipped: bool) -> Event {
    Event::CountdownCompleted {
        skipped,
        at: Utc::now(),
    }
}

impl Ticking for Countdown {
    fn armed(&self) -> Option<Armed> {
        match self.status {
            CountdownStatus::Running => self.ticks.armed(),
            _ => None,
        }
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        if self.status != CountdownStatus::Running || !self.ticks.accepts(tick) {
            return None;
        }
        self.value = self.value.saturating_sub(1);
        if self.value > 0 {
            return Some(Event::CountdownTick {
                remaining_secs: self.value,
                at: Utc::now(),
            });
        }
        self.ticks.cancel();
        self.status = CountdownStatus::Complete;
        Some(completed(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::tick::TickDriver;
    use std::time::Duration;

    fn completions(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::CountdownCompleted { .. }))
            .count()
    }

    #[test]
    fn counts_down_once_per_second_and_completes_once() {
        let mut c = Countdown::default();
        c.start();
        let mut driver = TickDriver::new();
        let events = driver.advance(&mut c, Duration::from_secs(9));
        assert_eq!(c.value(), 1);
        assert_eq!(completions(&events), 0);

        let events = driver.advance(&mut c, Duration::from_secs(30));
        assert_eq!(completions(&events), 1);
        assert_eq!(c.status(), CountdownStatus::Complete);
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn pause_keeps_value_and_resume_continues() {
        let mut c = Countdown::new(5);
        c.start();
        c.tick();
        c.tick();
        assert!(c.pause());
        assert!(c.tick().is_none());
        assert_eq!(c.value(), 3);
        assert!(c.resume());
        c.tick();
        assert_eq!(c.value(), 2);
    }

    #[test]
    fn pause_is_noop_when_idle_or_complete() {
        let mut c = Countdown::new(3);
        assert!(!c.pause());
        assert_eq!(c.status(), CountdownStatus::Idle);
        c.skip();
        assert!(!c.pause());
        assert_eq!(c.status(), CountdownStatus::Complete);
    }

    #[test]
    fn skip_completes_and_restores_value() {
        let mut c = Countdown::new(10);
        c.start();
        c.tick();
        let stale = c.armed();
        let event = c.skip();
        assert!(matches!(event, Some(Event::CountdownCompleted { skipped: true, .. })));
        assert_eq!(c.value(), 10);
        assert!(c.armed().is_none());
        if let Some(armed) = stale {
            assert!(c.on_tick(armed.tick).is_none());
        }
        assert!(c.skip().is_none(), "completion fires once");
    }

    #[test]
    fn reset_does_not_complete() {
        let mut c = Countdown::new(10);
        c.start();
        c.tick();
        let event = c.reset();
        assert!(matches!(event, Some(Event::CountdownReset { .. })));
        assert_eq!(c.status(), CountdownStatus::Idle);
        assert_eq!(c.value(), 10);
    }

    #[test]
    fn restart_replaces_schedule() {
        let mut c = Countdown::new(10);
        c.start();
        let first = c.armed().unwrap().tick;
        c.start();
        assert!(c.on_tick(first).is_none());
        assert_eq!(c.value(), 10);
    }

    #[test]
    fn zero_countdown_completes_immediately() {
        let mut c = Countdown::new(0);
        assert!(matches!(c.start(), Some(Event::CountdownCompleted { skipped: false, .. })));
        assert_eq!(c.status(), CountdownStatus::Complete);
    }
}
