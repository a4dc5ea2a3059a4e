//! # Wodtimer Core Library
//!
//! This library provides the core logic for the wodtimer fitness timers and
//! workout runner. Every operation is available through the standalone CLI
//! binary; any GUI is expected to be a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Tick Source**: tick-count scheduling with a single live handle per
//!   schedule. Nothing reads the wall clock; the caller feeds elapsed time
//!   through a [`TickDriver`].
//! - **Timer Engines**: Stopwatch, For Time, EMOM, Tabata and AMRAP state
//!   machines behind the [`TimerEngine`] trait
//! - **Workout Sequencer**: runs a workout's blocks with pre-roll, completion
//!   tracking and celebration screens
//! - **Flow**: configure, pre-roll, run, results for a single timer
//! - **Storage**: SQLite workout library and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Timer`]: any engine, built from a [`TimerConfig`]
//! - [`WorkoutSession`]: workout execution state machine
//! - [`WorkoutDb`]: workout persistence
//! - [`Config`]: application configuration management
//! - [`WakeLock`]: reference-counted screen wake lock

pub mod device;
pub mod error;
pub mod events;
pub mod flow;
pub mod storage;
pub mod timer;
pub mod workout;

pub use device::{NoopDevice, OrientationLock, WakeLock, WakeLockBackend};
pub use error::{ConfigError, CoreError, DatabaseError, DeviceError, ValidationError};
pub use events::Event;
pub use flow::{FlowStage, FlowView, TimerFlow};
pub use storage::{Config, WorkoutDb};
pub use timer::{
    format_time, Countdown, EngineOptions, Granularity, TickDriver, Ticking, TimeCap, Timer,
    TimerConfig, TimerEngine, TimerKind, TimerSnapshot, TimerStatus,
};
pub use workout::{
    NewWorkout, NextBlock, SessionOptions, SessionPhase, SessionView, Workout, WorkoutBlock,
    WorkoutLibrary, WorkoutSession, WorkoutStore,
};
