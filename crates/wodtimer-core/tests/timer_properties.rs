//! Engine properties driven through the public API.

use std::time::Duration;

use proptest::prelude::*;
use wodtimer_core::events::Event;
use wodtimer_core::timer::{Emom, Tabata};
use wodtimer_core::{
    EngineOptions, TickDriver, Ticking, TimeCap, Timer, TimerConfig, TimerEngine, TimerStatus,
};

fn options(step_ms: u64) -> EngineOptions {
    EngineOptions {
        tick: Duration::from_millis(step_ms),
        ..EngineOptions::default()
    }
}

fn countdown_config(kind: u8, secs: u32) -> TimerConfig {
    let cap = TimeCap::from_secs(secs);
    match kind {
        0 => TimerConfig::Amrap { cap },
        1 => TimerConfig::ForTime {
            cap: Some(cap),
            sets: None,
            rest_time_secs: None,
        },
        2 => TimerConfig::Emom {
            rounds: 1,
            duration_secs: secs,
        },
        _ => TimerConfig::Tabata {
            rounds: 1,
            work_secs: secs,
            rest_secs: secs,
        },
    }
}

fn step_strategy() -> impl Strategy<Value = u64> {
    prop::sample::select(vec![5u64, 10, 20, 25, 50, 100, 250, 500, 1000])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn countdowns_land_on_zero_exactly_once(kind in 0u8..4, secs in 1u32..=8, step in step_strategy()) {
        let config = countdown_config(kind, secs);
        let total = config.total_ms().unwrap();
        let ticks = total / step;
        let mut timer = Timer::from_config(&config, &options(step));
        timer.start();

        let mut completions = 0;
        for i in 0..ticks {
            let event = timer.tick();
            if matches!(event, Some(Event::TimerCompleted { .. })) {
                completions += 1;
                prop_assert_eq!(i, ticks - 1);
            }
        }
        let snap = timer.snapshot();
        prop_assert_eq!(completions, 1);
        prop_assert_eq!(snap.remaining_ms, Some(0));
        prop_assert!(snap.final_time.is_some());
        prop_assert_eq!(timer.status(), TimerStatus::Complete);

        // nothing is armed any more, so further ticks are impossible
        prop_assert!(timer.armed().is_none());
        prop_assert!(timer.tick().is_none());
    }

    #[test]
    fn double_start_keeps_one_schedule(kind in 0u8..4, secs in 1u32..=8, elapsed_ms in 0u64..5_000) {
        let config = countdown_config(kind, secs);
        let mut once = Timer::from_config(&config, &EngineOptions::default());
        let mut twice = Timer::from_config(&config, &EngineOptions::default());
        once.start();
        twice.start();
        let armed = twice.armed();
        prop_assert!(twice.start().is_none());
        prop_assert_eq!(twice.armed(), armed);

        let elapsed = Duration::from_millis(elapsed_ms);
        TickDriver::new().advance(&mut once, elapsed);
        TickDriver::new().advance(&mut twice, elapsed);
        prop_assert_eq!(once.snapshot().remaining_ms, twice.snapshot().remaining_ms);
    }

    #[test]
    fn pause_resume_without_ticks_changes_nothing(kind in 0u8..4, secs in 2u32..=8, ran in 0u64..100) {
        let config = countdown_config(kind, secs);
        let mut timer = Timer::from_config(&config, &EngineOptions::default());
        timer.start();
        for _ in 0..ran {
            timer.tick();
        }
        let before = timer.snapshot();
        timer.pause();
        prop_assert!(timer.armed().is_none());
        timer.resume();
        let after = timer.snapshot();
        prop_assert_eq!(before.remaining_ms, after.remaining_ms);
        prop_assert_eq!(before.phase_remaining_ms, after.phase_remaining_ms);
        prop_assert_eq!(before.current_round, after.current_round);
        prop_assert!(after.is_running());
    }

    #[test]
    fn reset_restores_construction_state(kind in 0u8..5, secs in 1u32..=8, ran in 0u64..2_000) {
        let config = if kind == 4 { TimerConfig::Stopwatch } else { countdown_config(kind, secs) };
        let mut timer = Timer::from_config(&config, &EngineOptions::default());
        let fresh = timer.snapshot();
        timer.start();
        for _ in 0..ran {
            timer.tick();
        }
        timer.increment_round();
        timer.reset();
        prop_assert_eq!(timer.snapshot(), fresh);
    }
}

#[test]
fn emom_three_by_five_driven_by_wall_time() {
    let mut timer = Timer::Emom(Emom::new(3, 5, &EngineOptions::default()));
    let mut driver = TickDriver::new();
    timer.start();

    let events = driver.advance(&mut timer, Duration::from_millis(5_000));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::RoundAdvanced { round: 2, .. })));
    assert_eq!(timer.current_round(), 2);

    driver.advance(&mut timer, Duration::from_millis(9_990));
    assert_eq!(timer.current_round(), 3);
    assert!(timer.is_running());

    let events = driver.advance(&mut timer, Duration::from_millis(10));
    assert!(matches!(
        events.last(),
        Some(Event::TimerCompleted { rounds: 3, .. })
    ));
    assert_eq!(timer.status(), TimerStatus::Complete);
    assert_eq!(timer.final_time(), Some("00:15.00"));
}

#[test]
fn tabata_phase_timeline() {
    let mut timer = Timer::Tabata(Tabata::new(2, 20, 10, &EngineOptions::default()));
    let mut driver = TickDriver::new();
    timer.start();

    let work = |t: &Timer| t.snapshot().is_work_phase;
    let mut at_ms = 0u64;
    let mut advance_to = |timer: &mut Timer, target_ms: u64| {
        driver.advance(timer, Duration::from_millis(target_ms - at_ms));
        at_ms = target_ms;
    };

    for (t, expected) in [
        (0, true),
        (19_990, true),
        (20_000, false),
        (29_990, false),
        (30_000, true),
        (49_990, true),
        (50_000, false),
        (59_990, false),
    ] {
        advance_to(&mut timer, t);
        assert_eq!(work(&timer), Some(expected), "at {t}ms");
        assert!(timer.is_running(), "at {t}ms");
    }

    advance_to(&mut timer, 60_000);
    assert_eq!(timer.status(), TimerStatus::Complete);
    assert_eq!(timer.current_round(), 2);
}

#[test]
fn paused_time_is_dead_time() {
    let mut timer = Timer::from_config(
        &TimerConfig::Amrap {
            cap: TimeCap::new(1, 0),
        },
        &EngineOptions::default(),
    );
    let mut driver = TickDriver::new();
    timer.start();
    driver.advance(&mut timer, Duration::from_millis(1_005));
    timer.pause();
    // a long pause produces no ticks and leaves no backlog behind
    assert!(driver
        .advance(&mut timer, Duration::from_secs(30))
        .is_empty());
    timer.resume();
    driver.advance(&mut timer, Duration::from_millis(5));
    assert_eq!(timer.snapshot().remaining_ms, Some(59_000));
}
