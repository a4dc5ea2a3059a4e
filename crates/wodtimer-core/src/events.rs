use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerKind;

/// Every state change in the system produces an Event.
/// The presentation layer renders from snapshots; side-effect collaborators
/// (wake lock, haptics) subscribe to events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        kind: TimerKind,
        at: DateTime<Utc>,
    },
    TimerPaused {
        kind: TimerKind,
        /// Displayed time frozen at the pause.
        display_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        kind: TimerKind,
        display_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        kind: TimerKind,
        at: DateTime<Utc>,
    },
    /// EMOM/Tabata crossed a round boundary on their own.
    RoundAdvanced {
        kind: TimerKind,
        round: u32,
        at: DateTime<Utc>,
    },
    /// User counted a round (AMRAP, For Time, stopwatch laps).
    RoundCounted {
        kind: TimerKind,
        round: u32,
        at: DateTime<Utc>,
    },
    /// Tabata switched between work and rest.
    PhaseChanged {
        round: u32,
        work: bool,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        kind: TimerKind,
        final_time: String,
        rounds: u32,
        /// `true` when ended by the user rather than by the clock.
        manual: bool,
        at: DateTime<Utc>,
    },
    /// Stopwatch scheduled its delayed auto-start.
    AutoStartArmed {
        delay_ms: u64,
        at: DateTime<Utc>,
    },
    /// Owner went away; any schedule it held is gone.
    TimerUnmounted {
        kind: TimerKind,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownCompleted {
        skipped: bool,
        at: DateTime<Utc>,
    },
    CountdownReset {
        at: DateTime<Utc>,
    },
    BlockSelected {
        block_id: String,
        index: usize,
        at: DateTime<Utc>,
    },
    /// Pre-roll countdown for a block began.
    BlockStarted {
        block_id: String,
        index: usize,
        at: DateTime<Utc>,
    },
    /// Pre-roll finished and the block's timer is running.
    BlockActivated {
        block_id: String,
        kind: TimerKind,
        at: DateTime<Utc>,
    },
    BlockCompleted {
        block_id: String,
        index: usize,
        final_time: Option<String>,
        at: DateTime<Utc>,
    },
    WorkoutCompleted {
        workout_id: String,
        at: DateTime<Utc>,
    },
    WorkoutExited {
        workout_id: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event means the emitter is now ticking (`Some(true)`),
    /// has stopped ticking (`Some(false)`), or says nothing about it.
    pub fn running_signal(&self) -> Option<bool> {
        match self {
            Event::TimerStarted { .. }
            | Event::TimerResumed { .. }
            | Event::BlockActivated { .. } => Some(true),
            Event::TimerPaused { .. }
            | Event::TimerReset { .. }
            | Event::TimerCompleted { .. }
            | Event::TimerUnmounted { .. }
            | Event::BlockSelected { .. }
            | Event::BlockCompleted { .. }
            | Event::WorkoutCompleted { .. }
            | Event::WorkoutExited { .. } => Some(false),
            _ => None,
        }
    }

    /// Whether this event ends a timer run (natural or manual).
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Event::TimerCompleted { .. } | Event::BlockCompleted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::RoundAdvanced {
            kind: TimerKind::Emom,
            round: 2,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RoundAdvanced");
        assert_eq!(json["kind"], "emom");
        assert_eq!(json["round"], 2);
    }

    #[test]
    fn running_signal_classifies_lifecycle_events() {
        let now = Utc::now();
        let started = Event::TimerStarted {
            kind: TimerKind::Amrap,
            at: now,
        };
        let tick = Event::CountdownTick {
            remaining_secs: 3,
            at: now,
        };
        let paused = Event::TimerPaused {
            kind: TimerKind::Amrap,
            display_ms: 1000,
            at: now,
        };
        assert_eq!(started.running_signal(), Some(true));
        assert_eq!(tick.running_signal(), None);
        assert_eq!(paused.running_signal(), Some(false));
    }
}
