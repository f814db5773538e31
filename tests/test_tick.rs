//! Tick-context scheduling, reentrancy guards and the debug built-ins.

#[allow(clippy::duplicate_mod)]
#[path = "helpers.rs"]
mod helpers;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use helpers::execute;
use helpers::fixtures::{
    LAMP_COMMANDS, LAMP_HELP, LAMP_SERVICE_COMMANDS, MESSAGES, MockLink, PUMP_COMMANDS,
    PUMP_HELP, Recorder,
};
use tickline::config::QuietConfig;
use tickline::{Engine, Handler, HandlerRow};

#[test]
fn test_tick_runs_each_handler_once() {
    let lamp = Recorder::new(LAMP_HELP);
    let pump = Recorder::new(PUMP_HELP);
    let rows = [
        HandlerRow::new(&lamp, LAMP_COMMANDS),
        HandlerRow::new(&lamp, LAMP_SERVICE_COMMANDS),
        HandlerRow::new(&pump, PUMP_COMMANDS),
    ];
    let engine: Engine<'_, MockLink, QuietConfig> = Engine::new(&rows, MESSAGES, MockLink::new());

    for _ in 0..10 {
        engine.on_tick();
        engine.on_priority_tick();
    }

    assert_eq!(engine.ticks(), 10);
    assert_eq!(lamp.ticks(), 10);
    assert_eq!(lamp.priority_polls(), 10);
    assert_eq!(pump.ticks(), 10);
    assert_eq!(pump.priority_polls(), 10);

    let stats = engine.tick_stats();
    assert_eq!(stats.fast.skipped, 0);
    assert_eq!(stats.priority.skipped, 0);
    assert!(stats.fast.overruns.iter().all(|&n| n == 0));
}

// ============================================================================
// Reentrancy
// ============================================================================

/// Handler whose hooks are interrupted once when armed: `tick` by the next
/// timer tick, `high_priority_poll` by a timer tick and a second trigger of
/// the priority entry point.
struct Reentrant {
    in_tick: AtomicBool,
    in_priority: AtomicBool,
    ticks: AtomicU32,
}

impl Handler for Reentrant {
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if self.in_tick.swap(false, Ordering::SeqCst) {
            ENGINE.on_tick();
        }
    }

    fn high_priority_poll(&self) {
        if self.in_priority.swap(false, Ordering::SeqCst) {
            ENGINE.on_tick();
            ENGINE.on_priority_tick();
        }
    }
}

static REENTRANT: Reentrant = Reentrant {
    in_tick: AtomicBool::new(false),
    in_priority: AtomicBool::new(false),
    ticks: AtomicU32::new(0),
};

static ROWS: [HandlerRow<'static>; 1] = [HandlerRow::new(&REENTRANT, &[])];

static ENGINE: Engine<'static, MockLink, QuietConfig> =
    Engine::new(&ROWS, MESSAGES, MockLink::new());

#[test]
fn test_reentrant_ticks_are_skipped_and_counted() {
    // Fast bucket re-entered from inside `tick`.
    REENTRANT.in_tick.store(true, Ordering::SeqCst);
    ENGINE.on_tick();

    let stats = ENGINE.tick_stats();
    assert_eq!(ENGINE.ticks(), 2);
    assert_eq!(REENTRANT.ticks.load(Ordering::SeqCst), 1);
    assert_eq!(stats.fast.skipped, 1);
    assert_eq!(stats.priority.skipped, 0);
    assert_eq!(stats.fast.overruns[0], 1);

    // A long `high_priority_poll` is preempted by the timer: the fast bucket
    // still runs, the priority bucket is not re-entered.
    REENTRANT.in_priority.store(true, Ordering::SeqCst);
    ENGINE.on_priority_tick();

    let stats = ENGINE.tick_stats();
    assert_eq!(ENGINE.ticks(), 3);
    assert_eq!(REENTRANT.ticks.load(Ordering::SeqCst), 2);
    assert_eq!(stats.fast.skipped, 1);
    assert_eq!(stats.priority.skipped, 1);
    assert_eq!(stats.priority.overruns[0], 1);

    // The overrun report reflects the counters.
    let report = execute(&ENGINE, "ZZE");
    if cfg!(feature = "debug-commands") {
        assert!(report.starts_with("ISR skipped ticks:          1\r\n"));
        assert!(report.contains("ISR handler 00 tick overruns:           1\r\n"));
        assert!(report.contains("ISR handler 15 tick overruns:           0\r\n"));
        assert!(report.contains("Priority poll skipped ticks:          1\r\n"));
        assert!(report.contains("Priority poll handler 00 tick overruns:           1\r\n"));
        assert!(report.ends_with("End of skipped ticks.\r\n"));
    }

    // Soft reset zeroes the counters but not the tick count.
    ENGINE.reinit();
    let stats = ENGINE.tick_stats();
    assert_eq!(stats.fast.skipped, 0);
    assert_eq!(stats.priority.overruns[0], 0);
    assert_eq!(ENGINE.ticks(), 3);
}

// ============================================================================
// Debug Built-ins
// ============================================================================

#[cfg(feature = "debug-commands")]
#[test]
fn test_free_memory_report() {
    let rows: [HandlerRow<'_>; 0] = [];
    let engine: Engine<'_, MockLink, QuietConfig> =
        Engine::new(&rows, MESSAGES, MockLink::with_free_memory(1234));
    assert_eq!(execute(&engine, "ZZM"), "Available memory:  1234 bytes\r\n");

    let unknown: Engine<'_, MockLink, QuietConfig> = Engine::new(&rows, MESSAGES, MockLink::new());
    assert_eq!(execute(&unknown, "zzm"), "Available memory:  unknown\r\n");
}

#[cfg(feature = "debug-commands")]
#[test]
fn test_overrun_report_lists_every_slot() {
    let rows: [HandlerRow<'_>; 0] = [];
    let engine: Engine<'_, MockLink, QuietConfig> = Engine::new(&rows, MESSAGES, MockLink::new());

    let report = execute(&engine, "ZZE");
    assert_eq!(report.lines().count(), 2 * (engine.debug_slots() + 1) + 1);
    assert_eq!(report.matches("ISR handler").count(), engine.debug_slots());
}

#[cfg(not(feature = "debug-commands"))]
#[test]
fn test_debug_commands_absent() {
    let rows: [HandlerRow<'_>; 0] = [];
    let engine: Engine<'_, MockLink, QuietConfig> = Engine::new(&rows, MESSAGES, MockLink::new());

    assert_eq!(execute(&engine, "ZZE"), helpers::diagnostic("ZZE"));
}
