//! Handler table and per-handler command grammars.
//!
//! The table is an ordered, const-initializable slice of rows. Each row pairs
//! a handler with the commands it accepts. A handler may appear in several
//! adjacent rows with different command lists; this is how a composed handler
//! exposes more than one grammar. Lifecycle hooks see such a run of rows as a
//! single handler. Non-adjacent repeats are treated as distinct handlers.

use core::fmt;

use crate::engine::handler::Handler;
use crate::error::EngineError;

pub mod mnemonic;

pub use mnemonic::{MNEMONIC_LEN, Mnemonic};

/// One entry of a handler's command list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command name
    pub mnemonic: Mnemonic,

    /// Handler-private opcode passed to `handle_command`
    pub opcode: u8,

    /// Exact number of arguments the command takes (0..=2)
    pub args: u8,
}

impl CommandSpec {
    /// Declare a command. The name is case-folded.
    pub const fn new(name: &[u8; MNEMONIC_LEN], opcode: u8, args: u8) -> Self {
        Self {
            mnemonic: Mnemonic::new(name),
            opcode,
            args,
        }
    }
}

/// Registration entry: a handler and one of its command lists.
#[derive(Copy, Clone)]
pub struct HandlerRow<'a> {
    /// Feature handler
    pub handler: &'a dyn Handler,

    /// Commands routed to `handler` through this row
    pub commands: &'a [CommandSpec],
}

impl<'a> HandlerRow<'a> {
    /// Build a row.
    pub const fn new(handler: &'a dyn Handler, commands: &'a [CommandSpec]) -> Self {
        Self { handler, commands }
    }

    /// True when both rows point at the same handler instance.
    pub fn same_handler(&self, other: &HandlerRow<'_>) -> bool {
        core::ptr::addr_eq(self.handler, other.handler)
    }
}

impl fmt::Debug for HandlerRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRow")
            .field("handler", &"<dyn Handler>")
            .field("commands", &self.commands)
            .finish()
    }
}

/// Ordered, immutable handler registry.
#[derive(Debug, Copy, Clone)]
pub struct HandlerTable<'a> {
    rows: &'a [HandlerRow<'a>],
}

impl<'a> HandlerTable<'a> {
    /// Wrap a row slice. Order is registration order.
    pub const fn new(rows: &'a [HandlerRow<'a>]) -> Self {
        Self { rows }
    }

    /// All rows, duplicates included.
    pub fn rows(&self) -> &'a [HandlerRow<'a>] {
        self.rows
    }

    /// Handlers with adjacent duplicates coalesced.
    ///
    /// Yields `(row_index, handler)`; the row index of the first row of each
    /// run doubles as the handler's debug slot.
    pub fn distinct(&self) -> Distinct<'a> {
        Distinct {
            rows: self.rows,
            index: 0,
        }
    }

    /// Find the handler and command for a parsed mnemonic.
    ///
    /// Rows are scanned in order and the first mnemonic match wins. A match
    /// with the wrong argument count is an error; no later row is tried.
    pub fn resolve(
        &self,
        mnemonic: Mnemonic,
        argcount: u8,
    ) -> Result<(&'a dyn Handler, &'a CommandSpec), EngineError> {
        for row in self.rows {
            if let Some(spec) = row.commands.iter().find(|c| c.mnemonic == mnemonic) {
                if spec.args != argcount {
                    return Err(EngineError::ArgumentCount {
                        expected: spec.args,
                        received: argcount,
                    });
                }
                return Ok((row.handler, spec));
            }
        }

        Err(EngineError::UnknownCommand)
    }
}

/// Iterator returned by [`HandlerTable::distinct`].
#[derive(Debug, Clone)]
pub struct Distinct<'a> {
    rows: &'a [HandlerRow<'a>],
    index: usize,
}

impl<'a> Iterator for Distinct<'a> {
    type Item = (usize, &'a dyn Handler);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.rows.len() {
            let index = self.index;
            self.index += 1;

            let row = &self.rows[index];
            if index == 0 || !row.same_handler(&self.rows[index - 1]) {
                return Some((index, row.handler));
            }
        }
        None
    }
}
