//! Feature handler trait.
//!
//! Each handler manages one feature of the application: a group of user
//! commands plus whatever it needs to do on the tick and in the poll loop.
//! Every hook has an empty default, so a handler overrides only what it uses.
//!
//! Hooks take `&self` because the tick context may run them while the poll
//! context is in the middle of another hook. Mutable state belongs in atomics
//! or a `critical_section::Mutex`.

use crate::report::ReportBuf;

/// Command/event handler.
///
/// # Example
///
/// ```rust,ignore
/// struct Blinker {
///     period: AtomicU16,
///     ticks: AtomicU16,
/// }
///
/// impl Handler for Blinker {
///     fn help_screen(&self) -> &'static str {
///         "  BLP n  :  Set blink period to n ticks.\r\n"
///     }
///
///     fn tick(&self) {
///         self.ticks.fetch_add(1, Ordering::Relaxed);
///     }
///
///     fn handle_command(&self, _opcode: u8, arg1: u16, _arg2: u16) {
///         self.period.store(arg1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait Handler: Sync {
    /// Help text for this handler's commands, printed by `HLP`.
    fn help_screen(&self) -> &'static str {
        ""
    }

    /// One-time hardware initialization, run once at first setup.
    fn init_hardware(&self) {}

    /// Internal state initialization. Runs on every soft reset; must be
    /// safe to call repeatedly.
    fn init_state(&self) {}

    /// Called from the tick context every period. Must finish within one tick.
    fn tick(&self) {}

    /// High-priority polling, launched from the tick context.
    ///
    /// Preempts the poll loop but may take longer than one tick.
    fn high_priority_poll(&self) {}

    /// Handle a user command routed to this handler.
    ///
    /// Arguments the command does not take are zero.
    fn handle_command(&self, _opcode: u8, _arg1: u16, _arg2: u16) {}

    /// Copy volatile state needed for report generation.
    ///
    /// Runs inside a critical section, so keep it short.
    fn save_report_snapshot(&self) {}

    /// Write the next report into `buffer`.
    ///
    /// Called repeatedly while free report slots remain; return `false` once
    /// there is nothing more to say. Multi-part reports are emitted by
    /// returning `true` once per part.
    fn make_report_string(&self, _buffer: &mut ReportBuf) -> bool {
        false
    }

    /// Background work from the poll loop. No latency guarantee, but long
    /// stalls slow down command processing and reporting.
    fn idle_poll(&self) {}
}
