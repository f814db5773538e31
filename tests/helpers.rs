//! Shared test helpers to reduce duplication across integration tests.

#![allow(dead_code)]

#[allow(clippy::duplicate_mod)]
#[path = "fixtures/mod.rs"]
pub mod fixtures;

use fixtures::MockLink;
use tickline::Engine;
use tickline::config::EngineConfig;

// ============================================================================
// Input Helpers
// ============================================================================

/// Feed raw bytes as if they arrived on the link.
pub fn feed<C: EngineConfig>(engine: &Engine<'_, MockLink, C>, bytes: &[u8]) {
    for &b in bytes {
        engine.receive_byte(b);
    }
}

/// Feed one line followed by CR.
pub fn feed_line<C: EngineConfig>(engine: &Engine<'_, MockLink, C>, line: &str) {
    feed(engine, line.as_bytes());
    engine.receive_byte(b'\r');
}

// ============================================================================
// Execution Helpers
// ============================================================================

/// Run `count` poll cycles, letting the link drain after each.
pub fn run_polls<C: EngineConfig>(engine: &Engine<'_, MockLink, C>, count: usize) {
    for _ in 0..count {
        engine.poll();
        engine.wait_until_done();
    }
}

/// Everything the link has sent since the last call.
pub fn output<C: EngineConfig>(engine: &Engine<'_, MockLink, C>) -> String {
    engine.wait_until_done();
    engine.link().take_output()
}

/// Feed a line, run one poll cycle and return what was sent.
pub fn execute<C: EngineConfig>(engine: &Engine<'_, MockLink, C>, line: &str) -> String {
    output(engine);
    feed_line(engine, line);
    engine.poll();
    output(engine)
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// The diagnostic sent for a rejected line.
pub fn diagnostic(escaped_line: &str) -> String {
    format!(
        "Unrecognized command:  \"{}\". Type \"?\" or \"HLP\" for help.\r\n",
        escaped_line
    )
}

/// Assert that `output` contains every string in `expected`.
pub fn assert_contains_all(output: &str, expected: &[&str]) {
    for s in expected {
        assert!(
            output.contains(s),
            "Expected output to contain '{}', but got:\n{}",
            s,
            output
        );
    }
}
