//! Real-time driver: a tokio interval feeds elapsed time into the core's
//! tick driver while stdin lines are read as commands.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;
use wodtimer_core::{Event, NoopDevice, TickDriver, Ticking, WakeLock};

/// A single keystroke-style command typed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pause or resume.
    Toggle,
    Round,
    Finish,
    SkipCountdown,
    Reset,
    /// Start the next block (workouts only).
    Next,
    /// Jump to a block by 1-based position (workouts only).
    Goto(usize),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = match parts.next()? {
            "p" | "pause" | "resume" => Command::Toggle,
            "r" | "round" => Command::Round,
            "f" | "finish" => Command::Finish,
            "s" | "skip" => Command::SkipCountdown,
            "x" | "reset" => Command::Reset,
            "n" | "next" => Command::Next,
            "g" | "goto" => Command::Goto(parts.next()?.parse().ok()?),
            "q" | "quit" => Command::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Something the live loop can drive.
pub trait LiveTarget: Ticking {
    /// Wake-lock owner id.
    fn owner(&self) -> &'static str;
    fn apply(&mut self, command: &Command) -> Vec<Event>;
    /// Called after every batch of events, e.g. to chain follow-up work.
    fn after_events(&mut self, _events: &[Event]) -> Vec<Event> {
        Vec::new()
    }
    fn status_line(&self) -> String;
    fn is_done(&self) -> bool;
    /// Cancel everything before leaving.
    fn shutdown(&mut self) -> Vec<Event>;
}

pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn event(&self, event: &Event) {
        if self.json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        } else if let Some(text) = describe(event) {
            println!("\r{text:<60}");
        }
    }

    pub fn status(&self, line: &str) {
        if self.json {
            return;
        }
        print!("\r{line:<60}");
        let _ = std::io::stdout().flush();
    }
}

/// Human text for the events worth a line of their own.
pub fn describe(event: &Event) -> Option<String> {
    let text = match event {
        Event::TimerStarted { kind, .. } => format!("{} started", kind.label()),
        Event::TimerPaused { .. } => "paused".into(),
        Event::TimerResumed { .. } => "resumed".into(),
        Event::TimerReset { .. } => "reset".into(),
        Event::RoundAdvanced { round, .. } => format!("round {round}"),
        Event::RoundCounted { round, .. } => format!("rounds: {round}"),
        Event::PhaseChanged { work, .. } => String::from(if *work { "work" } else { "rest" }),
        Event::TimerCompleted {
            final_time, rounds, ..
        } => format!("done in {final_time} ({rounds} rounds)"),
        Event::AutoStartArmed { delay_ms, .. } => format!("starting in {delay_ms}ms"),
        Event::CountdownCompleted { skipped: true, .. } => "countdown skipped".into(),
        Event::BlockSelected { index, .. } => format!("block {} selected", index + 1),
        Event::BlockStarted { index, .. } => format!("block {} get ready", index + 1),
        Event::BlockActivated { kind, .. } => format!("{} go", kind.label()),
        Event::BlockCompleted {
            index, final_time, ..
        } => match final_time {
            Some(t) => format!("block {} complete in {t}", index + 1),
            None => format!("block {} complete", index + 1),
        },
        Event::WorkoutCompleted { .. } => "workout complete".into(),
        _ => return None,
    };
    Some(text)
}

pub fn run<T: LiveTarget>(
    target: &mut T,
    tick: Duration,
    wake: &mut WakeLock<NoopDevice>,
    output: &Output,
    initial: Vec<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(target, tick, wake, output, initial))
}

fn publish<T: LiveTarget>(
    target: &mut T,
    wake: &mut WakeLock<NoopDevice>,
    output: &Output,
    mut events: Vec<Event>,
) {
    while !events.is_empty() {
        for event in &events {
            wake.observe(target.owner(), event);
            output.event(event);
        }
        events = target.after_events(&events);
    }
}

async fn drive<T: LiveTarget>(
    target: &mut T,
    tick: Duration,
    wake: &mut WakeLock<NoopDevice>,
    output: &Output,
    initial: Vec<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    publish(target, wake, output, initial);

    let mut driver = TickDriver::new();
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    while !target.is_done() {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let events = driver.advance(&mut *target, now - last);
                last = now;
                publish(target, wake, output, events);
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => match Command::parse(&line) {
                        Some(Command::Quit) => break,
                        Some(command) => {
                            debug!(?command, "command");
                            let events = target.apply(&command);
                            publish(target, wake, output, events);
                        }
                        None => output.status("p pause/resume  r round  f finish  s skip  n next  q quit"),
                    },
                    None => stdin_open = false,
                }
            }
        }
        if !target.is_done() {
            output.status(&target.status_line());
        }
    }

    let events = target.shutdown();
    publish(target, wake, output, events);
    wake.release_all();
    if !output.json {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("p"), Some(Command::Toggle));
        assert_eq!(Command::parse("  finish "), Some(Command::Finish));
        assert_eq!(Command::parse("g 3"), Some(Command::Goto(3)));
        assert_eq!(Command::parse("g"), None);
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn describes_completion() {
        let event = Event::WorkoutCompleted {
            workout_id: "w".into(),
            at: chrono::Utc::now(),
        };
        assert_eq!(describe(&event).as_deref(), Some("workout complete"));
    }
}
