//! Build-time sizing and behavioural defaults.
//!
//! Buffer dimensions are crate constants because they size arrays inside
//! `Engine`. Behaviour that does not affect layout is expressed through the
//! `EngineConfig` trait, so an application can pick a profile without any
//! runtime cost.

/// Number of receive line slots. Must be a power of two.
///
/// One slot is always the line being assembled, so at most
/// `LINE_COUNT - 1` completed lines can wait for the poll loop.
pub const LINE_COUNT: usize = 8;

/// Bytes per receive line slot, terminator included. Must be a power of two.
pub const LINE_SIZE: usize = 64;

/// Number of outgoing report buffers. Does not have to be a power of two.
pub const REPORT_QUEUE_LEN: usize = 4;

/// Bytes per report buffer.
///
/// A bit longer than one standard line to leave room for CRLF. Longer reports
/// are emitted in several parts.
pub const REPORT_BUFFER_SIZE: usize = 90;

/// Number of handler rows that get tick-overrun statistics.
pub const DEBUG_SLOTS: usize = 16;

/// Bytes the transmit session can hold for a message copied out of RAM.
pub const TRANSMIT_BUFFER_SIZE: usize = REPORT_BUFFER_SIZE;

/// Behavioural configuration for an [`Engine`](crate::engine::Engine).
///
/// All values are const (zero runtime cost).
pub trait EngineConfig {
    /// Echo received lines back to the host after reset (default: true)
    const DEFAULT_ECHO: bool;

    /// Discard empty lines instead of queueing them (default: false)
    const FILTER_EMPTY_LINES: bool;
}

/// Default configuration: interactive use from a terminal.
///
/// - DEFAULT_ECHO: true
/// - FILTER_EMPTY_LINES: false
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DefaultConfig;

impl EngineConfig for DefaultConfig {
    const DEFAULT_ECHO: bool = true;
    const FILTER_EMPTY_LINES: bool = false;
}

/// Configuration for machine-driven links running at wire speed.
///
/// Nothing is echoed and blank lines never occupy a slot, which makes it less
/// likely that the receive buffer jams.
///
/// - DEFAULT_ECHO: false
/// - FILTER_EMPTY_LINES: true
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuietConfig;

impl EngineConfig for QuietConfig {
    const DEFAULT_ECHO: bool = false;
    const FILTER_EMPTY_LINES: bool = true;
}

/// Fixed strings the engine needs from the application.
///
/// Both live in the read-only region and are sent without copying.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Messages {
    /// Reply to the `IDQ` command
    pub identity: &'static str,

    /// Banner printed ahead of the built-in help
    pub help_banner: &'static str,
}

impl Messages {
    /// Bundle the identity string and help banner.
    pub const fn new(identity: &'static str, help_banner: &'static str) -> Self {
        Self {
            identity,
            help_banner,
        }
    }
}
