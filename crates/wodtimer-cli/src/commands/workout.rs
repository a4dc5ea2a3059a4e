use clap::Subcommand;
use serde::Serialize;
use wodtimer_core::timer::CountdownStatus;
use wodtimer_core::{
    Config, Event, NoopDevice, SessionPhase, TimerEngine, WakeLock, WorkoutBlock,
    WorkoutDb, WorkoutLibrary, WorkoutSession, WorkoutStore,
};

use super::timer::TimerSpec;
use crate::live::{self, Command, LiveTarget, Output};

#[derive(Subcommand)]
pub enum WorkoutAction {
    /// List saved workouts
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create an empty workout
    Create {
        /// Workout name
        name: String,
    },
    /// Append a timer block to a workout
    AddBlock {
        /// Workout ID
        id: String,
        /// Number of sets
        #[arg(long)]
        sets: Option<u32>,
        #[command(subcommand)]
        spec: TimerSpec,
    },
    /// Show a workout and its blocks
    Show {
        /// Workout ID
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout
    Delete {
        /// Workout ID
        id: String,
    },
    /// Run a workout block by block
    Run {
        /// Workout ID
        id: String,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct WorkoutSummary<'a> {
    id: &'a str,
    name: &'a str,
    blocks: usize,
    created_at: String,
}

pub fn run(action: WorkoutAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = WorkoutDb::open()?;
    match action {
        WorkoutAction::List { json } => {
            let mut library = WorkoutLibrary::new(&db);
            library.refresh();
            if library.is_loading() {
                return Err("could not load workouts".into());
            }
            let summaries: Vec<WorkoutSummary<'_>> = library
                .workouts()
                .iter()
                .map(|w| WorkoutSummary {
                    id: &w.id,
                    name: &w.name,
                    blocks: w.blocks.len(),
                    created_at: w.created_at.to_rfc3339(),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("no workouts");
            } else {
                for s in &summaries {
                    println!("{}  {}  ({} blocks)", s.id, s.name, s.blocks);
                }
            }
        }
        WorkoutAction::Create { name } => {
            let mut library = WorkoutLibrary::new(&db);
            let workout = library
                .create(&name)
                .ok_or_else(|| format!("workout '{name}' was not created"))?;
            println!("{}", workout.id);
        }
        WorkoutAction::AddBlock { id, sets, spec } => {
            let block = WorkoutBlock::new(spec.to_config(), sets)?;
            let workout = db.add_block(&id, block)?;
            println!("{} now has {} blocks", workout.name, workout.blocks.len());
        }
        WorkoutAction::Show { id, json } => {
            let workout = db
                .get_workout_by_id(&id)?
                .ok_or_else(|| format!("workout not found: {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&workout)?);
            } else {
                println!("{}", workout.name);
                for (i, block) in workout.blocks.iter().enumerate() {
                    let sets = block.sets.map(|s| format!(" x{s}")).unwrap_or_default();
                    println!("  {}. {}{sets}", i + 1, block.timer_config.summary());
                }
            }
        }
        WorkoutAction::Delete { id } => {
            let mut library = WorkoutLibrary::new(&db);
            if !library.delete(&id) {
                return Err(format!("workout not deleted: {id}").into());
            }
            println!("deleted {id}");
        }
        WorkoutAction::Run { id, json } => run_workout(&db, &id, json)?,
    }
    Ok(())
}

impl LiveTarget for WorkoutSession<NoopDevice> {
    fn owner(&self) -> &'static str {
        "workout"
    }

    fn apply(&mut self, command: &Command) -> Vec<Event> {
        let event = match command {
            Command::Toggle => {
                let paused = match self.timer() {
                    Some(timer) => timer.is_paused(),
                    None => self.countdown().status() == CountdownStatus::Paused,
                };
                if paused {
                    self.resume()
                } else {
                    self.pause()
                }
            }
            Command::Round => self.increment_round(),
            Command::Finish => self.finish_block(),
            Command::SkipCountdown => self.skip_countdown(),
            Command::Next => self.start_block(),
            Command::Goto(position) => {
                let id = self
                    .workout()
                    .and_then(|w| w.blocks.get(position.checked_sub(1)?))
                    .map(|b| b.id.clone());
                match id {
                    Some(id) => self.select_block(&id).ok().flatten(),
                    None => None,
                }
            }
            Command::Reset | Command::Quit => None,
        };
        event.into_iter().collect()
    }

    /// Once the last block is done there is nothing to celebrate towards:
    /// end the workout right away.
    fn after_events(&mut self, events: &[Event]) -> Vec<Event> {
        let finished_block = events
            .iter()
            .any(|e| matches!(e, Event::BlockCompleted { .. }));
        if !finished_block {
            return Vec::new();
        }
        self.finish_if_done().into_iter().collect()
    }

    fn status_line(&self) -> String {
        let view = self.view();
        let position = format!(
            "block {}/{}",
            view.current_index + 1,
            self.workout().map_or(0, |w| w.blocks.len())
        );
        match view.phase {
            SessionPhase::Ready => format!("{position} ready (n to start)"),
            SessionPhase::Countdown => {
                format!("{position} get ready: {}", view.countdown_secs.unwrap_or(0))
            }
            SessionPhase::Active => {
                let display = view.timer.map(|t| t.display).unwrap_or_default();
                format!("{position} {display}")
            }
            SessionPhase::Transition { .. } => match view.upcoming_block {
                Some(next) => format!("{position} done, next: {} (n)", next.timer_config.summary()),
                None => format!("{position} done"),
            },
            SessionPhase::Loading | SessionPhase::Finished => String::new(),
        }
    }

    fn is_done(&self) -> bool {
        matches!(self.phase(), SessionPhase::Finished | SessionPhase::Loading)
    }

    fn shutdown(&mut self) -> Vec<Event> {
        self.exit().into_iter().collect()
    }
}

fn run_workout(db: &WorkoutDb, id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut session = WorkoutSession::load(db, id, config.session_options(), NoopDevice);
    if session.phase() == SessionPhase::Loading {
        return Err(format!("workout {id} could not be loaded or has no blocks").into());
    }
    let initial: Vec<Event> = session.start_block().into_iter().collect();

    let mut wake = if config.device.keep_awake {
        WakeLock::new(NoopDevice)
    } else {
        WakeLock::disabled(NoopDevice)
    };
    let output = Output { json };
    live::run(
        &mut session,
        config.engine_options().tick,
        &mut wake,
        &output,
        initial,
    )?;
    if !json {
        println!(
            "{} of {} blocks completed",
            session.completed_blocks().len(),
            session.workout().map_or(0, |w| w.blocks.len())
        );
    }
    Ok(())
}
