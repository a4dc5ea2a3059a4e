//! Tick source and driver.
//!
//! Every engine owns exactly one [`TickSource`] per schedule it needs. A
//! source holds at most one live handle; arming always replaces the previous
//! handle, so a stale tick from an older schedule can never be accepted.
//! Owners check every incoming [`Tick`] with [`TickSource::accepts`].
//!
//! Nothing here sleeps or spawns. A caller (the CLI's tokio loop, a test)
//! feeds elapsed time to a [`TickDriver`], which turns it into whole ticks
//! for whatever the target currently has armed.
//!
//! ```text
//! arm() -> Tick{g1}    arm() -> Tick{g2}    cancel()
//!   |  g1 accepted       |  g1 rejected       |  g2 rejected
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::events::Event;

/// Display timers step every 10ms.
pub const DISPLAY_TICK: Duration = Duration::from_millis(10);
/// Countdowns step once per second.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

static LAST_GENERATION: AtomicU64 = AtomicU64::new(0);

// Process-wide so handles from two sources owned by the same engine never
// collide.
fn next_generation() -> u64 {
    LAST_GENERATION.fetch_add(1, Ordering::SeqCst) + 1
}

/// One scheduled firing, identified by the generation of the handle that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tick {
    generation: u64,
}

impl Tick {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a target currently has scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub tick: Tick,
    pub period: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Fires every period until cancelled.
    Interval,
    /// Fires once after one period, then disarms.
    Once,
}

#[derive(Debug, Clone)]
pub struct TickSource {
    period: Duration,
    mode: TickMode,
    handle: Option<Tick>,
}

impl TickSource {
    /// Periods below 1ms are raised to 1ms.
    pub fn interval(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            mode: TickMode::Interval,
            handle: None,
        }
    }

    pub fn once(delay: Duration) -> Self {
        Self {
            period: delay.max(Duration::from_millis(1)),
            mode: TickMode::Once,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn mode(&self) -> TickMode {
        self.mode
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Clear any prior handle, then create a fresh one.
    pub fn arm(&mut self) -> Tick {
        self.handle = None;
        let tick = Tick {
            generation: next_generation(),
        };
        self.handle = Some(tick);
        tick
    }

    /// Drop the live handle. Ticks already in flight will be rejected.
    pub fn cancel(&mut self) {
        self.handle = None;
    }

    pub fn armed(&self) -> Option<Armed> {
        self.handle.map(|tick| Armed {
            tick,
            period: self.period,
        })
    }

    /// Accept a tick only if it belongs to the live handle. One-shot
    /// sources disarm on acceptance.
    pub fn accepts(&mut self, tick: Tick) -> bool {
        if self.handle != Some(tick) {
            return false;
        }
        if self.mode == TickMode::Once {
            self.handle = None;
        }
        true
    }
}

/// Anything driven by a tick source.
pub trait Ticking {
    /// The schedule the target wants serviced right now, if any.
    fn armed(&self) -> Option<Armed>;

    /// Deliver one tick. Stale ticks must be ignored.
    fn on_tick(&mut self, tick: Tick) -> Option<Event>;

    /// Deliver one tick to whatever is armed right now.
    fn tick(&mut self) -> Option<Event> {
        let armed = self.armed()?;
        self.on_tick(armed.tick)
    }
}

/// Converts elapsed wall time into whole tick periods.
///
/// Leftover time is carried between calls only while the same handle stays
/// armed. When the target disarms, any backlog is dropped.
#[derive(Debug, Default, Clone)]
pub struct TickDriver {
    tracking: Option<Tick>,
    carried: Duration,
}

impl TickDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance<T: Ticking + ?Sized>(&mut self, target: &mut T, elapsed: Duration) -> Vec<Event> {
        let mut budget = match (self.tracking, target.armed()) {
            (Some(tracked), Some(armed)) if tracked == armed.tick => self.carried + elapsed,
            _ => elapsed,
        };
        let mut events = Vec::new();
        loop {
            let Some(armed) = target.armed() else {
                self.tracking = None;
                self.carried = Duration::ZERO;
                return events;
            };
            if budget < armed.period {
                self.tracking = Some(armed.tick);
                self.carried = budget;
                return events;
            }
            budget -= armed.period;
            if let Some(event) = target.on_tick(armed.tick) {
                events.push(event);
            }
        }
    }

    /// Forget any carried remainder.
    pub fn clear(&mut self) {
        self.tracking = None;
        self.carried = Duration::ZERO;
    }
}
