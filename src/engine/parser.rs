//! Command line grammar.
//!
//! A line is a three-letter mnemonic followed by up to two unsigned decimal
//! arguments, separated by whitespace:
//!
//! ```text
//! [ws] LLL [ws+ DIGITS [ws+ DIGITS]] [ws]
//! ```
//!
//! Letters are case-insensitive. Any byte at or below space counts as
//! whitespace. A `?` anywhere on the line turns it into `HLP`. Argument
//! values wrap modulo 2^16.

use crate::error::EngineError;
use crate::table::{MNEMONIC_LEN, Mnemonic};

/// Parser state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseState {
    /// Leading whitespace
    Preamble,

    /// Inside the mnemonic
    Opcode,

    /// Whitespace after the mnemonic
    FirstGap,

    /// Inside the first argument
    FirstArg,

    /// Whitespace after the first argument
    SecondGap,

    /// Inside the second argument
    SecondArg,

    /// Trailing whitespace
    Tail,

    /// Malformed line (sticky)
    Error,
}

/// Parsed command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// Upper-case command name
    pub mnemonic: Mnemonic,

    /// First argument, zero when absent
    pub arg1: u16,

    /// Second argument, zero when absent
    pub arg2: u16,

    /// Number of arguments present (0..=2)
    pub argcount: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CharClass {
    Letter(u8),
    Digit(u16),
    Space,
    Other,
}

impl CharClass {
    fn of(byte: u8) -> Self {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' => CharClass::Letter(byte.to_ascii_uppercase()),
            b'0'..=b'9' => CharClass::Digit(u16::from(byte - b'0')),
            0..=b' ' => CharClass::Space,
            _ => CharClass::Other,
        }
    }
}

impl ParseState {
    /// Transition for one character class.
    fn next(self, class: CharClass) -> Self {
        use CharClass::*;
        use ParseState::*;

        match (self, class) {
            (Preamble, Letter(_)) => Opcode,
            (Preamble, Space) => Preamble,

            (Opcode, Letter(_)) => Opcode,
            (Opcode, Space) => FirstGap,

            (FirstGap, Digit(_)) => FirstArg,
            (FirstGap, Space) => FirstGap,

            (FirstArg, Digit(_)) => FirstArg,
            (FirstArg, Space) => SecondGap,

            (SecondGap, Digit(_)) => SecondArg,
            (SecondGap, Space) => SecondGap,

            (SecondArg, Digit(_)) => SecondArg,
            (SecondArg, Space) => Tail,

            (Tail, Space) => Tail,

            _ => Error,
        }
    }
}

/// Line parser with a one-shot command slot.
///
/// Each call to [`parse_line`](Self::parse_line) replaces the slot; the
/// command is handed out once through [`take_command`](Self::take_command).
#[derive(Debug, Default)]
pub struct CommandParser {
    pending: Option<Command>,
}

impl CommandParser {
    /// Create a parser with no pending command.
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Drop any pending command.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Parse one line (without terminator).
    ///
    /// Returns `Err(Parse)` for a malformed line, leaving no command pending.
    /// A blank line is accepted and leaves no command pending. Parsing stops
    /// at the first NUL.
    pub fn parse_line(&mut self, line: &[u8]) -> Result<(), EngineError> {
        self.reset();

        let mut state = ParseState::Preamble;
        let mut name = [0u8; MNEMONIC_LEN];
        let mut name_len = 0;
        let mut command = Command::default();
        let mut have_command = false;
        let mut saw_question = false;

        for &byte in line.iter().take_while(|&&b| b != 0) {
            if byte == b'?' {
                saw_question = true;
            }

            let class = CharClass::of(byte);
            state = state.next(class);

            match (state, class) {
                (ParseState::Opcode, CharClass::Letter(letter)) => {
                    have_command = true;
                    if name_len < MNEMONIC_LEN {
                        name[name_len] = letter;
                        name_len += 1;
                    } else {
                        state = ParseState::Error;
                    }
                }
                (ParseState::FirstArg, CharClass::Digit(digit)) => {
                    command.argcount = 1;
                    command.arg1 = command.arg1.wrapping_mul(10).wrapping_add(digit);
                }
                (ParseState::SecondArg, CharClass::Digit(digit)) => {
                    command.argcount = 2;
                    command.arg2 = command.arg2.wrapping_mul(10).wrapping_add(digit);
                }
                _ => {}
            }
        }

        if saw_question {
            self.pending = Some(Command {
                mnemonic: Mnemonic::HELP,
                ..Command::default()
            });
            return Ok(());
        }

        if state == ParseState::Error {
            return Err(EngineError::Parse);
        }

        if have_command {
            command.mnemonic = Mnemonic::from_raw(name);
            self.pending = Some(command);
        }
        Ok(())
    }

    /// True when a parsed command has not been taken yet.
    pub fn has_command(&self) -> bool {
        self.pending.is_some()
    }

    /// Hand out the pending command. Subsequent calls return `None` until
    /// the next successful parse.
    pub fn take_command(&mut self) -> Option<Command> {
        self.pending.take()
    }
}
