use clap::{Args, Subcommand};
use wodtimer_core::{
    Config, Event, FlowStage, NoopDevice, TimeCap, TimerConfig, TimerEngine, TimerFlow, WakeLock,
};

use crate::live::{self, Command, LiveTarget, Output};

#[derive(Args)]
pub struct TimerArgs {
    #[command(subcommand)]
    pub spec: TimerSpec,
    /// Skip the pre-roll countdown
    #[arg(long, global = true)]
    pub no_countdown: bool,
    /// Print events as JSON lines instead of a live status line
    #[arg(long, global = true)]
    pub json: bool,
}

/// Timer kind with its parameters, shared with `workout add-block`.
#[derive(Subcommand, Debug, Clone)]
pub enum TimerSpec {
    /// Count up until finished
    Stopwatch,
    /// Count down from a cap, or up when no cap is given
    ForTime {
        /// Cap minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// Cap seconds
        #[arg(long)]
        seconds: Option<u32>,
        #[arg(long)]
        sets: Option<u32>,
        /// Rest between sets in seconds
        #[arg(long)]
        rest: Option<u32>,
    },
    /// Every minute on the minute
    Emom {
        #[arg(long, default_value_t = 10)]
        rounds: u32,
        /// Seconds per round
        #[arg(long, default_value_t = 60)]
        duration: u32,
    },
    /// Work/rest intervals
    Tabata {
        #[arg(long, default_value_t = 8)]
        rounds: u32,
        /// Work seconds
        #[arg(long, default_value_t = 20)]
        work: u32,
        /// Rest seconds
        #[arg(long, default_value_t = 10)]
        rest: u32,
    },
    /// As many rounds as possible
    Amrap {
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
    },
}

impl TimerSpec {
    pub fn to_config(&self) -> TimerConfig {
        match *self {
            TimerSpec::Stopwatch => TimerConfig::Stopwatch,
            TimerSpec::ForTime {
                minutes,
                seconds,
                sets,
                rest,
            } => TimerConfig::ForTime {
                cap: (minutes.is_some() || seconds.is_some())
                    .then(|| TimeCap::new(minutes.unwrap_or(0), seconds.unwrap_or(0))),
                sets,
                rest_time_secs: rest,
            },
            TimerSpec::Emom { rounds, duration } => TimerConfig::Emom {
                rounds,
                duration_secs: duration,
            },
            TimerSpec::Tabata { rounds, work, rest } => TimerConfig::Tabata {
                rounds,
                work_secs: work,
                rest_secs: rest,
            },
            TimerSpec::Amrap { minutes, seconds } => TimerConfig::Amrap {
                cap: TimeCap::new(minutes, seconds),
            },
        }
    }
}

impl LiveTarget for TimerFlow {
    fn owner(&self) -> &'static str {
        "timer"
    }

    fn apply(&mut self, command: &Command) -> Vec<Event> {
        let event = match command {
            Command::Toggle => self.toggle(),
            Command::Round => self.increment_round(),
            Command::Finish => self.finish(),
            Command::SkipCountdown => self.skip_countdown(),
            Command::Reset => self.reset(),
            Command::Next => self.start_now(),
            Command::Goto(_) | Command::Quit => None,
        };
        event.into_iter().collect()
    }

    fn status_line(&self) -> String {
        if self.is_counting_down() {
            return format!("get ready: {}", self.countdown().value());
        }
        let Some(timer) = self.timer() else {
            return String::new();
        };
        let snap = timer.snapshot();
        let mut line = snap.display.clone();
        match (snap.total_rounds, snap.is_work_phase) {
            (Some(total), Some(work)) => {
                let phase = if work { "work" } else { "rest" };
                line.push_str(&format!("  {phase}  round {}/{total}", snap.current_round));
            }
            (Some(total), None) => {
                line.push_str(&format!("  round {}/{total}", snap.current_round));
            }
            _ if snap.current_round > 0 => {
                line.push_str(&format!("  rounds {}", snap.current_round));
            }
            _ => {}
        }
        if snap.is_paused() {
            line.push_str("  [paused]");
        }
        line
    }

    fn is_done(&self) -> bool {
        matches!(self.stage(), FlowStage::Results { .. })
    }

    fn shutdown(&mut self) -> Vec<Event> {
        self.leave().into_iter().collect()
    }
}

pub fn run(args: TimerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let timer_config = args.spec.to_config();
    let options = config.engine_options();
    let tick = options.tick;

    let mut flow = TimerFlow::new(timer_config.kind(), options, config.countdown.seconds);
    let mut initial = Vec::new();
    if timer_config != TimerConfig::Stopwatch {
        flow.submit_config(timer_config)?;
        let started = if args.no_countdown {
            flow.begin_now()
        } else {
            flow.begin()
        };
        initial.extend(started);
    } else {
        let armed = flow.mount();
        if args.no_countdown {
            initial.extend(flow.start_now());
        } else {
            initial.extend(armed);
        }
    }

    let mut wake = if config.device.keep_awake {
        WakeLock::new(NoopDevice)
    } else {
        WakeLock::disabled(NoopDevice)
    };
    let output = Output { json: args.json };
    live::run(&mut flow, tick, &mut wake, &output, initial)?;

    if let FlowStage::Results { final_time, rounds } = flow.stage() {
        if args.json {
            let view = flow.view();
            println!("{}", serde_json::to_string(&view)?);
        } else {
            println!("final time {final_time}, rounds {rounds}");
        }
    }
    Ok(())
}
