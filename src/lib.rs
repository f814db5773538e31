//! # tickline
//!
//! Tick-driven command/report engine for serial-linked embedded devices.
//!
//! **Key features:**
//! - **Static allocation** - fixed-size line, report and transmit buffers, no heap
//! - **Const initialization** - the engine and its handler table can live in `static`s
//! - **Two contexts** - a preemptive tick and a cooperative poll loop share state
//!   through nestable critical sections
//! - **Pluggable handlers** - each feature registers three-letter commands,
//!   tick hooks and report generators
//! - **Platform-agnostic link** - the engine never touches the UART directly
//!
//! ## Wiring
//!
//! ```rust,ignore
//! static ROWS: [HandlerRow<'static>; 1] = [HandlerRow::new(&BLINKER, BLINK_COMMANDS)];
//! static ENGINE: Engine<'static, Uart> =
//!     Engine::new(&ROWS, Messages::new("Blinker v1\r\n", "Blinker demo\r\n"), Uart);
//!
//! // timer interrupt:     ENGINE.on_tick(); then pend the priority interrupt
//! // priority interrupt:  ENGINE.on_priority_tick();
//! // receive interrupt:   ENGINE.receive_byte(byte);
//! // transmit interrupt:  ENGINE.next_byte_to_send()
//!
//! ENGINE.initial_setup();
//! loop {
//!     ENGINE.poll();
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `debug-commands` (default) - `ZZM` free-memory and `ZZE` tick-overrun reports
//! - `critical-section-atomics` - atomics through `critical-section` on targets
//!   without compare-and-swap
//!
//! This library is `no_std` compatible.

#![no_std]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// ============================================================================
// Module Declarations
// ============================================================================

pub mod config;
pub mod critical;
pub mod error;
pub mod io;
pub mod report;
pub mod table;

pub mod engine;

// ============================================================================
// Re-exports - Public API
// ============================================================================

// Link
pub use io::Link;

// Configuration
pub use config::{DefaultConfig, EngineConfig, Messages, QuietConfig};

// Error types
pub use error::EngineError;

// Handler registry
pub use table::{CommandSpec, HandlerRow, HandlerTable, Mnemonic};

// Reports
pub use report::{ReportBuf, ReportQueue};

// Engine
pub use engine::{Command, Engine, Handler, Message, TextWriter, TickStats, Transmitter};

// ============================================================================
// Library Metadata
// ============================================================================

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata() {
        assert_eq!(NAME, "tickline");
        assert!(!VERSION.is_empty());
    }
}
