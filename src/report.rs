//! Outgoing report queue.
//!
//! Handlers write reports into a [`ReportBuf`] from the poll loop; the engine
//! copies them into a fixed ring of buffers and feeds them to the transmit
//! session one at a time. The front entry stays in its slot while it is on
//! the wire, so a full queue never overwrites a report being sent.

use crate::config::REPORT_BUFFER_SIZE;
use crate::error::EngineError;

/// Scratch buffer a handler formats one report into.
pub type ReportBuf = heapless::String<REPORT_BUFFER_SIZE>;

/// Fixed-capacity FIFO of report strings.
///
/// `Q` slots of `S` bytes each. Text longer than a slot is cut at the last
/// character boundary that fits.
#[derive(Debug)]
pub struct ReportQueue<const Q: usize, const S: usize> {
    slots: [heapless::String<S>; Q],

    /// Index of the oldest entry
    read: usize,

    /// Number of occupied slots, the one on the wire included
    count: usize,

    /// Front entry has been handed to the transmitter
    transmitting: bool,
}

impl<const Q: usize, const S: usize> ReportQueue<Q, S> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        const { assert!(Q > 0, "report queue needs at least one slot") };

        Self {
            slots: [const { heapless::String::new() }; Q],
            read: 0,
            count: 0,
            transmitting: false,
        }
    }

    /// Drop every entry, including one being transmitted.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        self.read = 0;
        self.count = 0;
        self.transmitting = false;
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when no report is queued or in flight.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True when another push would be rejected.
    pub fn is_full(&self) -> bool {
        self.count == Q
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        Q
    }

    /// True while the front entry is on the wire.
    pub fn is_transmitting(&self) -> bool {
        self.transmitting
    }

    /// Append a report.
    ///
    /// Returns `QueueFull` and leaves the queue untouched when every slot is
    /// occupied.
    pub fn push(&mut self, text: &str) -> Result<(), EngineError> {
        if self.is_full() {
            return Err(EngineError::QueueFull);
        }

        let index = (self.read + self.count) % Q;
        let slot = &mut self.slots[index];
        slot.clear();
        // Cannot fail: the text is cut to the slot size first.
        let _ = slot.push_str(fit::<S>(text));
        self.count += 1;
        Ok(())
    }

    /// Oldest entry, if any.
    pub fn front(&self) -> Option<&str> {
        if self.count == 0 {
            None
        } else {
            Some(self.slots[self.read].as_str())
        }
    }

    /// Discard the oldest entry.
    pub fn pop(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.slots[self.read].clear();
        self.read = (self.read + 1) % Q;
        self.count -= 1;
        self.transmitting = false;
        true
    }

    /// Step the queue once the transmitter has gone idle.
    ///
    /// Retires the entry that was on the wire, then marks the next one as
    /// transmitting and returns it.
    pub fn advance(&mut self) -> Option<&str> {
        if self.transmitting {
            self.pop();
        }
        if self.count == 0 {
            return None;
        }
        self.transmitting = true;
        Some(self.slots[self.read].as_str())
    }
}

impl<const Q: usize, const S: usize> Default for ReportQueue<Q, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Longest prefix of `text` that fits in `S` bytes without splitting a char.
fn fit<const S: usize>(text: &str) -> &str {
    let mut end = text.len().min(S);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
