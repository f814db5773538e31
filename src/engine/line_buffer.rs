//! Receive line buffer.
//!
//! A ring of fixed-size line slots filled one byte at a time from the
//! receive interrupt. The newest slot is the line being assembled; completed
//! lines wait in order for the poll loop, which reads the oldest one and then
//! releases it. Callers provide mutual exclusion between the two contexts.

/// Ring of `N` line slots of `S` bytes each.
///
/// Both dimensions must be powers of two. A slot holds at most `S - 1`
/// characters; the last byte is the terminator.
#[derive(Debug)]
pub struct LineBuffer<const N: usize, const S: usize> {
    slots: [[u8; S]; N],

    /// Slot the poll loop reads next
    oldest: usize,

    /// Slot being assembled
    newest: usize,

    /// Completed lines waiting to be read
    completed: usize,

    /// Write position in the newest slot
    cursor: usize,

    /// Previous byte was CR (a following LF belongs to the same terminator)
    after_cr: bool,

    /// Drop lines with no characters
    filter_empty: bool,

    /// Bumped by every `reset`
    generation: u32,
}

impl<const N: usize, const S: usize> LineBuffer<N, S> {
    /// Create an empty buffer.
    pub const fn new(filter_empty: bool) -> Self {
        const {
            assert!(N >= 2 && N.is_power_of_two(), "line count must be a power of two");
            assert!(S >= 2 && S.is_power_of_two(), "line size must be a power of two");
        };

        Self {
            slots: [[0; S]; N],
            oldest: 0,
            newest: 0,
            completed: 0,
            cursor: 0,
            after_cr: false,
            filter_empty,
            generation: 0,
        }
    }

    /// Feed one received byte.
    ///
    /// CR, LF and CR LF each complete a line. NUL is ignored. Characters
    /// past the slot capacity are dropped; the line stays intact and is
    /// terminated normally.
    pub fn handle_received_byte(&mut self, byte: u8) {
        match byte {
            b'\n' if self.after_cr => {}
            b'\r' | b'\n' => self.finish_line(),
            0 => {}
            _ if self.cursor < S - 1 => {
                self.slots[self.newest][self.cursor] = byte;
                self.cursor += 1;
            }
            _ => {}
        }
        self.after_cr = byte == b'\r';
    }

    fn finish_line(&mut self) {
        if self.filter_empty && self.cursor == 0 {
            return;
        }

        self.slots[self.newest][self.cursor] = 0;

        // At capacity the slot is reused and its line lost.
        if self.completed < N - 1 {
            self.newest = (self.newest + 1) & (N - 1);
            self.completed += 1;
        }

        self.slots[self.newest][0] = 0;
        self.cursor = 0;
    }

    /// Oldest completed line, without its terminator.
    pub fn next_line(&self) -> Option<&[u8]> {
        if self.completed == 0 {
            return None;
        }
        let slot = &self.slots[self.oldest];
        let len = slot.iter().position(|&b| b == 0).unwrap_or(S);
        Some(&slot[..len])
    }

    /// Release the line returned by [`next_line`](Self::next_line).
    ///
    /// Does nothing when no line is pending.
    pub fn release_line(&mut self) {
        if self.completed > 0 {
            self.oldest = (self.oldest + 1) & (N - 1);
            self.completed -= 1;
        }
    }

    /// Number of completed lines waiting.
    pub fn pending(&self) -> usize {
        self.completed
    }

    /// Characters collected so far on the line being assembled.
    pub fn partial_len(&self) -> usize {
        self.cursor
    }

    /// Enable or disable dropping of empty lines.
    pub fn set_filtering(&mut self, filter_empty: bool) {
        self.filter_empty = filter_empty;
    }

    /// True when empty lines are dropped.
    pub fn is_filtering(&self) -> bool {
        self.filter_empty
    }

    /// Reset count, wrapping.
    ///
    /// A reader that saw a line under one generation must not release a line
    /// under another: the buffer it read from has been discarded.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Discard every line, complete or partial. The filter setting survives.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.oldest = 0;
        self.newest = 0;
        self.completed = 0;
        self.cursor = 0;
        self.after_cr = false;
        self.slots[0][0] = 0;
    }
}
