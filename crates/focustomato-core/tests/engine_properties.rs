//! Property-based tests for the timer and barrier invariants under
//! arbitrary command sequences.

use focustomato_core::{
    BarrierEngine, Command, Event, FocusHost, Phase, SettingsPatch, TargetKind, TimerEngine,
    TimerSettings, TimerStatus,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Tick(u16),
    Command(Command),
}

fn arb_patch() -> impl Strategy<Value = SettingsPatch> {
    (
        prop::option::of(0u32..=130),
        prop::option::of(0u32..=35),
        prop::option::of(0u32..=65),
        prop::option::of(0u32..=12),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(focus, brk, long, interval, auto_break, auto_focus)| SettingsPatch {
            focus_minutes: focus,
            break_minutes: brk,
            long_break_minutes: long,
            long_break_interval: interval,
            auto_start_breaks: auto_break,
            auto_start_next_focus: auto_focus,
        })
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u16..=200).prop_map(Op::Tick),
        2 => Just(Op::Command(Command::Start)),
        1 => Just(Op::Command(Command::Pause)),
        1 => Just(Op::Command(Command::Reset)),
        1 => Just(Op::Command(Command::SkipBreak)),
        1 => arb_patch().prop_map(|p| Op::Command(Command::UpdateSettings(p))),
        1 => prop::option::of(1u32..=5)
            .prop_map(|minutes| Op::Command(Command::Activate { minutes })),
        1 => Just(Op::Command(Command::Deactivate)),
        1 => Just(Op::Command(Command::EmergencyUnlock)),
        1 => Just(Op::Command(Command::ReportAccess {
            kind: TargetKind::App,
            target: "Steam.exe".into(),
        })),
    ]
}

fn small_settings() -> TimerSettings {
    TimerSettings {
        focus_minutes: 2,
        break_minutes: 1,
        long_break_minutes: 3,
        long_break_interval: 2,
        ..TimerSettings::default()
    }
}

proptest! {
    /// Property: remaining time never exceeds the phase duration, and a
    /// rejected command leaves the snapshot untouched.
    #[test]
    fn timer_and_barrier_stay_consistent(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut barrier = BarrierEngine::default();
        barrier.add_blocked_app("Steam", "Steam.exe");
        let mut host = FocusHost::new(TimerEngine::new(small_settings()), barrier);

        for op in ops {
            match op {
                Op::Tick(n) => {
                    for _ in 0..n {
                        let before = host.timer().phase();
                        let completed = host
                            .tick()
                            .iter()
                            .filter(|e| matches!(e, Event::PhaseCompleted { .. }))
                            .count();
                        prop_assert!(completed <= 1);
                        prop_assert_eq!(completed == 1, host.timer().phase() != before);
                        if host.timer().phase() != before {
                            prop_assert!(before.is_break() != host.timer().phase().is_break());
                        }
                    }
                }
                Op::Command(command) => {
                    let before = host.snapshot();
                    if host.execute(command).is_err() {
                        prop_assert_eq!(host.snapshot(), before);
                    }
                }
            }

            let timer = host.timer();
            prop_assert!(timer.remaining_secs() <= timer.initial_duration_secs());
            let progress = timer.progress();
            prop_assert!((0.0..=1.0).contains(&progress));
            prop_assert!(timer.settings().validate().is_ok());

            let barrier = host.barrier();
            prop_assert!(
                barrier.emergency_unlocks_used_today()
                    <= barrier.settings().emergency_unlocks_per_day
            );
            if !barrier.is_active() {
                prop_assert_eq!(barrier.remaining_secs(), None);
            }
        }
    }

    /// Property: a paused or idle timer ignores any number of ticks.
    #[test]
    fn stopped_timer_ignores_ticks(run in 0u64..3000, idle in 1u64..5000) {
        let mut engine = TimerEngine::new(TimerSettings::default());
        engine.start().unwrap();
        for _ in 0..run {
            engine.tick();
        }
        if engine.status() == TimerStatus::Running {
            engine.pause().unwrap();
        }
        let before = engine.snapshot();
        for _ in 0..idle {
            prop_assert!(engine.tick().is_none());
        }
        prop_assert_eq!(engine.snapshot(), before);
    }

    /// Property: the long-break position follows the interval exactly.
    #[test]
    fn long_break_follows_interval(interval in 1u32..=10, cycles in 1u32..=25) {
        let settings = TimerSettings {
            focus_minutes: 1,
            break_minutes: 1,
            long_break_minutes: 1,
            long_break_interval: interval,
            auto_start_breaks: true,
            auto_start_next_focus: true,
        };
        let mut engine = TimerEngine::new(settings);
        engine.start().unwrap();
        for n in 1..=cycles {
            for _ in 0..60 {
                engine.tick();
            }
            let expected = if n % interval == 0 { Phase::LongBreak } else { Phase::Break };
            prop_assert_eq!(engine.phase(), expected);
            for _ in 0..60 {
                engine.tick();
            }
            prop_assert_eq!(engine.phase(), Phase::Focus);
        }
    }
}
