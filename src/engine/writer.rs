//! Formatted output through the transmit session.

use core::fmt;

use crate::config::{EngineConfig, TRANSMIT_BUFFER_SIZE};
use crate::engine::Engine;
use crate::io::Link;

/// `core::fmt::Write` adapter that sends text through an engine.
///
/// Text is gathered into a buffer the size of the transmit session and sent
/// one buffer at a time, waiting for each previous message to finish.
/// Anything still buffered is sent when the writer is dropped.
///
/// Writing never fails: a full buffer is sent and the write continues in
/// the emptied one.
///
/// Poll context only.
pub struct TextWriter<'e, 'a, L: Link, C: EngineConfig> {
    engine: &'e Engine<'a, L, C>,
    chunk: heapless::String<TRANSMIT_BUFFER_SIZE>,
}

impl<'e, 'a, L: Link, C: EngineConfig> TextWriter<'e, 'a, L, C> {
    pub(crate) fn new(engine: &'e Engine<'a, L, C>) -> Self {
        const {
            assert!(TRANSMIT_BUFFER_SIZE >= 4, "transmit buffer must hold any char");
        };

        Self {
            engine,
            chunk: heapless::String::new(),
        }
    }

    /// Send whatever is buffered.
    pub fn flush(&mut self) {
        if !self.chunk.is_empty() {
            self.engine.send_text(&self.chunk);
            self.chunk.clear();
        }
    }

    /// Write raw bytes, rendering anything outside printable ASCII as `<xx>`.
    pub fn write_escaped(&mut self, bytes: &[u8]) -> fmt::Result {
        for &byte in bytes {
            if (b' '..=b'~').contains(&byte) {
                fmt::Write::write_char(self, char::from(byte))?;
            } else {
                fmt::Write::write_fmt(self, format_args!("<{:02x}>", byte))?;
            }
        }
        Ok(())
    }
}

impl<L: Link, C: EngineConfig> fmt::Write for TextWriter<'_, '_, L, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.chunk.len() + c.len_utf8() > self.chunk.capacity() {
                self.flush();
            }
            // Fits: the buffer holds at least one char of any width.
            self.chunk.push(c).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

impl<L: Link, C: EngineConfig> Drop for TextWriter<'_, '_, L, C> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl<L: Link, C: EngineConfig> fmt::Debug for TextWriter<'_, '_, L, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextWriter")
            .field("buffered", &self.chunk.len())
            .finish_non_exhaustive()
    }
}
