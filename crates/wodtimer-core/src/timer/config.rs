use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Stopwatch,
    ForTime,
    Emom,
    Tabata,
    Amrap,
}

impl TimerKind {
    pub fn label(self) -> &'static str {
        match self {
            TimerKind::Stopwatch => "Stopwatch",
            TimerKind::ForTime => "For Time",
            TimerKind::Emom => "EMOM",
            TimerKind::Tabata => "Tabata",
            TimerKind::Amrap => "AMRAP",
        }
    }

    /// Kinds that can appear as a block inside a workout.
    pub fn is_block_kind(self) -> bool {
        !matches!(self, TimerKind::Stopwatch)
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimerKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "stopwatch" | "free" => Ok(TimerKind::Stopwatch),
            "for_time" | "fortime" => Ok(TimerKind::ForTime),
            "emom" => Ok(TimerKind::Emom),
            "tabata" => Ok(TimerKind::Tabata),
            "amrap" => Ok(TimerKind::Amrap),
            other => Err(ValidationError::InvalidValue {
                field: "timer_type".into(),
                message: format!("unknown timer kind '{other}'"),
            }),
        }
    }
}

/// A minutes/seconds pair as entered on the wheel pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCap {
    pub minutes: u32,
    pub seconds: u32,
}

impl TimeCap {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self { minutes, seconds }
    }

    pub fn from_secs(total: u32) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// Uses saturating arithmetic so absurd picker values cannot overflow.
    pub fn total_ms(&self) -> u64 {
        self.total_secs().saturating_mul(1000)
    }

    fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.seconds >= 60 {
            return Err(ValidationError::SecondsOutOfRange(self.seconds));
        }
        if self.total_secs() == 0 {
            return Err(ValidationError::ZeroDuration { field });
        }
        Ok(())
    }
}

/// Per-kind timer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerConfig {
    Stopwatch,
    ForTime {
        /// Absent cap means open-ended: count up until finished by hand.
        #[serde(default)]
        cap: Option<TimeCap>,
        #[serde(default)]
        sets: Option<u32>,
        #[serde(default)]
        rest_time_secs: Option<u32>,
    },
    Emom {
        rounds: u32,
        duration_secs: u32,
    },
    Tabata {
        rounds: u32,
        work_secs: u32,
        rest_secs: u32,
    },
    Amrap {
        cap: TimeCap,
    },
}

impl TimerConfig {
    pub fn kind(&self) -> TimerKind {
        match self {
            TimerConfig::Stopwatch => TimerKind::Stopwatch,
            TimerConfig::ForTime { .. } => TimerKind::ForTime,
            TimerConfig::Emom { .. } => TimerKind::Emom,
            TimerConfig::Tabata { .. } => TimerKind::Tabata,
            TimerConfig::Amrap { .. } => TimerKind::Amrap,
        }
    }

    /// Total scheduled duration, `None` when the timer is open-ended.
    pub fn total_ms(&self) -> Option<u64> {
        match self {
            TimerConfig::Stopwatch => None,
            TimerConfig::ForTime { cap, .. } => cap.map(|c| c.total_ms()),
            TimerConfig::Emom {
                rounds,
                duration_secs,
            } => Some(
                u64::from(*rounds)
                    .saturating_mul(u64::from(*duration_secs))
                    .saturating_mul(1000),
            ),
            TimerConfig::Tabata {
                rounds,
                work_secs,
                rest_secs,
            } => Some(
                u64::from(*rounds)
                    .saturating_mul(u64::from(*work_secs) + u64::from(*rest_secs))
                    .saturating_mul(1000),
            ),
            TimerConfig::Amrap { cap } => Some(cap.total_ms()),
        }
    }

    /// Reject configs that would complete instantly.
    ///
    /// Engines accept any config; this check belongs to whoever collects
    /// the values from the user.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TimerConfig::Stopwatch => Ok(()),
            TimerConfig::ForTime {
                cap,
                sets,
                rest_time_secs: _,
            } => {
                if let Some(cap) = cap {
                    cap.validate("cap")?;
                }
                if *sets == Some(0) {
                    return Err(ValidationError::ZeroCount { field: "sets" });
                }
                Ok(())
            }
            TimerConfig::Emom {
                rounds,
                duration_secs,
            } => {
                if *rounds == 0 {
                    return Err(ValidationError::ZeroCount { field: "rounds" });
                }
                if *duration_secs == 0 {
                    return Err(ValidationError::ZeroDuration {
                        field: "duration_secs",
                    });
                }
                Ok(())
            }
            TimerConfig::Tabata {
                rounds,
                work_secs,
                rest_secs,
            } => {
                if *rounds == 0 {
                    return Err(ValidationError::ZeroCount { field: "rounds" });
                }
                if *work_secs == 0 {
                    return Err(ValidationError::ZeroDuration { field: "work_secs" });
                }
                if *rest_secs == 0 {
                    return Err(ValidationError::ZeroDuration { field: "rest_secs" });
                }
                Ok(())
            }
            TimerConfig::Amrap { cap } => cap.validate("cap"),
        }
    }

    /// One-line human summary, e.g. `EMOM 10 x 1:00`.
    pub fn summary(&self) -> String {
        match self {
            TimerConfig::Stopwatch => "Stopwatch".into(),
            TimerConfig::ForTime { cap: None, .. } => "For Time (no cap)".into(),
            TimerConfig::ForTime { cap: Some(cap), .. } => {
                format!("For Time cap {}:{:02}", cap.minutes, cap.seconds)
            }
            TimerConfig::Emom {
                rounds,
                duration_secs,
            } => format!(
                "EMOM {rounds} x {}:{:02}",
                duration_secs / 60,
                duration_secs % 60
            ),
            TimerConfig::Tabata {
                rounds,
                work_secs,
                rest_secs,
            } => format!("Tabata {rounds} x {work_secs}s/{rest_secs}s"),
            TimerConfig::Amrap { cap } => format!("AMRAP {}:{:02}", cap.minutes, cap.seconds),
        }
    }
}
