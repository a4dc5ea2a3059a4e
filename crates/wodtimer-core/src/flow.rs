//! Single-timer flow: configure, pre-roll, run, show results.
//!
//! ```text
//! Configure --submit_config--> Ready --begin--> Ready(countdown) --0/skip--> Active
//!     ^                                                                        |
//!     +------------------------ restart <-- Results <-- finish / completion ---+
//! ```
//!
//! The stopwatch has nothing to configure: `mount` puts its flow straight
//! into `Active` with the engine mounted, so the delayed auto-start kicks in.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::events::Event;
use crate::timer::{
    Armed, Countdown, CountdownStatus, EngineOptions, Tick, Ticking, Timer, TimerConfig,
    TimerEngine, TimerKind, TimerSnapshot,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FlowStage {
    Configure,
    Ready,
    Active,
    Results { final_time: String, rounds: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    pub kind: TimerKind,
    pub stage: FlowStage,
    pub config: Option<TimerConfig>,
    pub countdown_secs: Option<u32>,
    pub timer: Option<TimerSnapshot>,
}

pub struct TimerFlow {
    kind: TimerKind,
    options: EngineOptions,
    stage: FlowStage,
    config: Option<TimerConfig>,
    countdown: Countdown,
    timer: Option<Timer>,
}

impl TimerFlow {
    /// A flow for `kind`, on the configure screen until mounted.
    pub fn new(kind: TimerKind, options: EngineOptions, countdown_secs: u32) -> Self {
        Self {
            kind,
            options,
            stage: FlowStage::Configure,
            config: (kind == TimerKind::Stopwatch).then_some(TimerConfig::Stopwatch),
            countdown: Countdown::new(countdown_secs),
            timer: None,
        }
    }

    /// The flow's screen is shown. A stopwatch skips configuration and arms
    /// its auto-start; the returned event announces the delay.
    pub fn mount(&mut self) -> Option<Event> {
        if self.kind != TimerKind::Stopwatch || self.stage != FlowStage::Configure {
            return None;
        }
        self.mount_stopwatch()
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn stage(&self) -> &FlowStage {
        &self.stage
    }

    pub fn config(&self) -> Option<&TimerConfig> {
        self.config.as_ref()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn timer(&self) -> Option<&Timer> {
        self.timer.as_ref()
    }

    pub fn is_counting_down(&self) -> bool {
        self.stage == FlowStage::Ready
            && matches!(
                self.countdown.status(),
                CountdownStatus::Running | CountdownStatus::Paused
            )
    }

    pub fn view(&self) -> FlowView {
        FlowView {
            kind: self.kind,
            stage: self.stage.clone(),
            config: self.config.clone(),
            countdown_secs: self.is_counting_down().then(|| self.countdown.value()),
            timer: self.timer.as_ref().map(|t| t.snapshot()),
        }
    }

    /// Validate and keep `config`, moving on to the ready screen.
    pub fn submit_config(&mut self, config: TimerConfig) -> Result<(), ValidationError> {
        if self.stage != FlowStage::Configure {
            return Err(ValidationError::InvalidValue {
                field: "stage".into(),
                message: "config can only be submitted from the configure screen".into(),
            });
        }
        if config.kind() != self.kind {
            return Err(ValidationError::InvalidValue {
                field: "kind".into(),
                message: format!("expected {} config, got {}", self.kind, config.kind()),
            });
        }
        config.validate()?;
        debug!(kind = %self.kind, summary = %config.summary(), "config accepted");
        self.config = Some(config);
        self.stage = FlowStage::Ready;
        Ok(())
    }

    /// Start the pre-roll. A zero-second pre-roll starts the timer at once.
    pub fn begin(&mut self) -> Option<Event> {
        if self.stage != FlowStage::Ready || self.countdown.status() != CountdownStatus::Idle {
            return None;
        }
        match self.countdown.start()? {
            Event::CountdownCompleted { .. } => self.activate(),
            other => Some(other),
        }
    }

    /// Start the timer without any pre-roll.
    pub fn begin_now(&mut self) -> Option<Event> {
        if self.stage != FlowStage::Ready {
            return None;
        }
        self.countdown.reset();
        self.activate()
    }

    /// Start an idle timer on the active screen right away, e.g. a
    /// stopwatch before its auto-start fires.
    pub fn start_now(&mut self) -> Option<Event> {
        match self.stage {
            FlowStage::Active => self.timer.as_mut()?.start(),
            _ => None,
        }
    }

    pub fn skip_countdown(&mut self) -> Option<Event> {
        if !self.is_counting_down() {
            return None;
        }
        self.countdown.skip();
        self.activate()
    }

    /// Pause whichever clock is visible.
    pub fn pause(&mut self) -> Option<Event> {
        match self.stage {
            FlowStage::Ready => {
                self.countdown.pause();
                None
            }
            FlowStage::Active => self.timer.as_mut()?.pause(),
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        match self.stage {
            FlowStage::Ready => {
                self.countdown.resume();
                None
            }
            FlowStage::Active => self.timer.as_mut()?.resume(),
            _ => None,
        }
    }

    /// Toggle between running and paused.
    pub fn toggle(&mut self) -> Option<Event> {
        let paused = match self.stage {
            FlowStage::Ready => self.countdown.status() == CountdownStatus::Paused,
            FlowStage::Active => self.timer.as_ref()?.is_paused(),
            _ => return None,
        };
        if paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    pub fn increment_round(&mut self) -> Option<Event> {
        match self.stage {
            FlowStage::Active => self.timer.as_mut()?.increment_round(),
            _ => None,
        }
    }

    /// Reset the running timer in place. Stays on the active screen.
    pub fn reset(&mut self) -> Option<Event> {
        match self.stage {
            FlowStage::Active => self.timer.as_mut()?.reset(),
            _ => None,
        }
    }

    /// End a running or paused timer and show its results. An idle timer
    /// has nothing to report, so the flow stays where it is.
    pub fn finish(&mut self) -> Option<Event> {
        if self.stage != FlowStage::Active {
            return None;
        }
        let event = self.timer.as_mut()?.finish()?;
        self.show_results();
        Some(event)
    }

    /// Back to the start keeping the last config. The stopwatch remounts.
    pub fn restart(&mut self) -> Option<Event> {
        self.leave();
        if self.kind == TimerKind::Stopwatch {
            return self.mount_stopwatch();
        }
        self.stage = FlowStage::Configure;
        None
    }

    /// Cancel every schedule the flow holds.
    pub fn leave(&mut self) -> Option<Event> {
        self.countdown.reset();
        let mut timer = self.timer.take()?;
        timer.unmount()
    }

    fn mount_stopwatch(&mut self) -> Option<Event> {
        let mut timer = Timer::from_config(&TimerConfig::Stopwatch, &self.options);
        let event = timer.mount();
        self.timer = Some(timer);
        self.stage = FlowStage::Active;
        event
    }

    fn activate(&mut self) -> Option<Event> {
        let config = self.config.as_ref()?;
        let mut timer = Timer::from_config(config, &self.options);
        let event = timer.start();
        self.timer = Some(timer);
        self.stage = FlowStage::Active;
        debug!(kind = %self.kind, "timer active");
        event
    }

    fn show_results(&mut self) {
        let Some(timer) = self.timer.as_ref() else {
            return;
        };
        let Some(final_time) = timer.final_time().map(str::to_string) else {
            return;
        };
        let rounds = timer.current_round();
        info!(kind = %self.kind, final_time = %final_time, rounds, "timer finished");
        self.stage = FlowStage::Results { final_time, rounds };
    }
}

impl Ticking for TimerFlow {
    fn armed(&self) -> Option<Armed> {
        match self.stage {
            FlowStage::Ready => self.countdown.armed(),
            FlowStage::Active => self.timer.as_ref()?.armed(),
            _ => None,
        }
    }

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        match self.stage {
            FlowStage::Ready => match self.countdown.on_tick(tick)? {
                Event::CountdownCompleted { .. } => self.activate(),
                other => Some(other),
            },
            FlowStage::Active => {
                let event = self.timer.as_mut()?.on_tick(tick)?;
                if event.is_completion() {
                    self.show_results();
                }
                Some(event)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{TimeCap, TimerStatus};
    use std::time::Duration;

    fn options() -> EngineOptions {
        EngineOptions {
            tick: Duration::from_millis(100),
            ..EngineOptions::default()
        }
    }

    fn amrap_flow() -> TimerFlow {
        let mut flow = TimerFlow::new(TimerKind::Amrap, options(), 2);
        flow.submit_config(TimerConfig::Amrap {
            cap: TimeCap::new(0, 1),
        })
        .unwrap();
        flow
    }

    #[test]
    fn rejects_invalid_config() {
        let mut flow = TimerFlow::new(TimerKind::Emom, options(), 3);
        let err = flow.submit_config(TimerConfig::Emom {
            rounds: 0,
            duration_secs: 60,
        });
        assert!(err.is_err());
        assert_eq!(flow.stage(), &FlowStage::Configure);

        let err = flow.submit_config(TimerConfig::Amrap {
            cap: TimeCap::new(1, 0),
        });
        assert!(err.is_err());
    }

    #[test]
    fn mount_is_a_no_op_for_configurable_timers() {
        let mut flow = TimerFlow::new(TimerKind::Amrap, options(), 2);
        assert!(flow.mount().is_none());
        assert_eq!(flow.stage(), &FlowStage::Configure);
        assert!(flow.timer().is_none());
    }

    #[test]
    fn countdown_then_timer_then_results() {
        let mut flow = amrap_flow();
        assert_eq!(flow.stage(), &FlowStage::Ready);
        assert!(matches!(
            flow.begin(),
            Some(Event::CountdownTick {
                remaining_secs: 2,
                ..
            })
        ));
        flow.tick();
        assert!(matches!(flow.tick(), Some(Event::TimerStarted { .. })));
        assert_eq!(flow.stage(), &FlowStage::Active);

        let mut last = None;
        for _ in 0..10 {
            last = flow.tick();
        }
        assert!(matches!(last, Some(Event::TimerCompleted { .. })));
        assert_eq!(
            flow.stage(),
            &FlowStage::Results {
                final_time: "00:01.00".into(),
                rounds: 0
            }
        );
        assert!(flow.armed().is_none());
    }

    #[test]
    fn restart_keeps_config() {
        let mut flow = amrap_flow();
        flow.begin_now();
        flow.finish();
        assert!(matches!(flow.stage(), FlowStage::Results { .. }));
        flow.restart();
        assert_eq!(flow.stage(), &FlowStage::Configure);
        assert!(flow.config().is_some());
        assert!(flow.timer().is_none());
    }

    #[test]
    fn toggle_pauses_countdown() {
        let mut flow = amrap_flow();
        flow.begin();
        flow.toggle();
        assert_eq!(flow.countdown().status(), CountdownStatus::Paused);
        assert!(flow.armed().is_none());
        flow.toggle();
        assert!(flow.countdown().is_running());
    }

    #[test]
    fn stopwatch_flow_mounts_into_active() {
        let mut flow = TimerFlow::new(TimerKind::Stopwatch, options(), 10);
        assert_eq!(flow.stage(), &FlowStage::Configure);
        assert!(matches!(
            flow.mount(),
            Some(Event::AutoStartArmed { delay_ms: 500, .. })
        ));
        assert!(flow.mount().is_none());
        assert_eq!(flow.stage(), &FlowStage::Active);
        assert_eq!(flow.timer().unwrap().status(), TimerStatus::Idle);
        // auto-start fires after the configured delay
        assert!(matches!(flow.tick(), Some(Event::TimerStarted { .. })));
        assert!(flow.timer().unwrap().is_running());
    }

    #[test]
    fn start_now_beats_auto_start() {
        let mut flow = TimerFlow::new(TimerKind::Stopwatch, options(), 10);
        flow.mount();
        assert!(matches!(flow.start_now(), Some(Event::TimerStarted { .. })));
        assert!(flow.start_now().is_none());
        // the pending auto-start was dropped, so only the display tick remains
        assert_eq!(flow.armed().unwrap().period, Duration::from_millis(100));
    }

    #[test]
    fn finish_before_start_stays_active() {
        let mut flow = TimerFlow::new(TimerKind::Stopwatch, options(), 10);
        flow.mount();
        assert!(flow.finish().is_none());
        assert_eq!(flow.stage(), &FlowStage::Active);
        // the pending auto-start is untouched
        assert!(matches!(flow.tick(), Some(Event::TimerStarted { .. })));
    }

    #[test]
    fn finish_after_reset_stays_active() {
        let mut flow = amrap_flow();
        flow.begin_now();
        flow.tick();
        flow.reset();
        assert!(flow.finish().is_none());
        assert_eq!(flow.stage(), &FlowStage::Active);
        assert!(flow.timer().unwrap().final_time().is_none());
    }

    #[test]
    fn finish_running_timer_reports_final_time() {
        let mut flow = amrap_flow();
        flow.begin_now();
        flow.tick();
        assert!(matches!(flow.finish(), Some(Event::TimerCompleted { .. })));
        let FlowStage::Results { final_time, .. } = flow.stage() else {
            panic!("expected results");
        };
        assert!(!final_time.is_empty());
    }

    #[test]
    fn leave_cancels_pending_ticks() {
        let mut flow = amrap_flow();
        flow.begin_now();
        let stale = flow.armed().unwrap().tick;
        flow.leave();
        assert!(flow.on_tick(stale).is_none());
    }
}
