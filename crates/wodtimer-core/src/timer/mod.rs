mod amrap;
mod config;
mod countdown;
mod emom;
mod engine;
mod for_time;
mod format;
mod stopwatch;
mod tabata;
mod tick;

pub use amrap::Amrap;
pub use config::{TimeCap, TimerConfig, TimerKind};
pub use countdown::{Countdown, CountdownStatus, DEFAULT_COUNTDOWN_SECS};
pub use emom::Emom;
pub use engine::{EngineOptions, Timer, TimerEngine, TimerSnapshot, TimerStatus};
pub use for_time::ForTime;
pub use format::{format_time, Granularity};
pub use stopwatch::Stopwatch;
pub use tabata::Tabata;
pub use tick::{Armed, Tick, TickDriver, TickMode, TickSource, Ticking, COUNTDOWN_TICK, DISPLAY_TICK};
