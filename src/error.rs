//! Error types for engine operations.
//!
//! None of these are fatal. Parse and dispatch failures become a short
//! diagnostic on the link; a full report queue drops the newest report.

use core::fmt;

/// Engine error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Line did not match the command grammar
    Parse,

    /// Mnemonic is neither built in nor listed by any handler row
    UnknownCommand,

    /// Mnemonic matched but the argument count did not
    ArgumentCount {
        /// Number of arguments the command declares
        expected: u8,
        /// Number of arguments on the line
        received: u8,
    },

    /// Every report buffer is occupied
    QueueFull,

    /// A transmit session is already in progress
    TransmitBusy,

    /// Formatted output could not be produced
    Output,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Parse => write!(f, "Malformed command"),
            EngineError::UnknownCommand => write!(f, "Unknown command"),
            EngineError::ArgumentCount { expected, received } => {
                write!(f, "Expected {} arguments, got {}", expected, received)
            }
            EngineError::QueueFull => write!(f, "Report queue full"),
            EngineError::TransmitBusy => write!(f, "Transmission in progress"),
            EngineError::Output => write!(f, "Output formatting failed"),
        }
    }
}

impl From<fmt::Error> for EngineError {
    fn from(_: fmt::Error) -> Self {
        EngineError::Output
    }
}

impl EngineError {
    /// Errors that are answered with the "unrecognized command" diagnostic.
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            EngineError::Parse | EngineError::UnknownCommand | EngineError::ArgumentCount { .. }
        )
    }
}
