//! Transmit session.
//!
//! At most one message is on the wire at a time. RAM messages are copied into
//! the session, so the caller's buffer is free as soon as the session starts;
//! read-only messages are sent straight from where they live. The transmit
//! interrupt pulls one byte per call until the message ends.

use core::cell::{RefCell, RefMut};

use critical_section::{CriticalSection, Mutex};

use crate::config::TRANSMIT_BUFFER_SIZE;
use crate::critical::{self, Resume};
use crate::error::EngineError;

/// Memory region a message is read from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Region {
    /// Copied into the session's own buffer
    Ram,

    /// Referenced in place for the lifetime of the program
    Rom,
}

/// Outgoing message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Message<'m> {
    /// Transient bytes, copied when the session starts
    Ram(&'m [u8]),

    /// Static bytes, sent without copying
    Rom(&'static [u8]),
}

impl<'m> Message<'m> {
    /// Message from transient text.
    pub fn text(text: &'m str) -> Self {
        Message::Ram(text.as_bytes())
    }

    /// Message from static text.
    pub const fn rom(text: &'static str) -> Message<'static> {
        Message::Rom(text.as_bytes())
    }

    /// Region this message will be read from.
    pub fn region(&self) -> Region {
        match self {
            Message::Ram(_) => Region::Ram,
            Message::Rom(_) => Region::Rom,
        }
    }

    /// Payload bytes.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Message::Ram(bytes) => bytes,
            Message::Rom(bytes) => bytes,
        }
    }

    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

/// Single in-flight message with a read cursor.
#[derive(Debug)]
pub struct TransmitSession<const N: usize> {
    ram: heapless::Vec<u8, N>,
    rom: &'static [u8],
    region: Option<Region>,
    cursor: usize,
}

impl<const N: usize> TransmitSession<N> {
    /// Create an idle session.
    pub const fn new() -> Self {
        Self {
            ram: heapless::Vec::new(),
            rom: &[],
            region: None,
            cursor: 0,
        }
    }

    /// Install a message.
    ///
    /// RAM messages longer than the session buffer are cut to fit.
    pub fn start(&mut self, message: Message<'_>) -> Result<(), EngineError> {
        if self.is_sending() {
            return Err(EngineError::TransmitBusy);
        }

        match message {
            Message::Ram(bytes) => {
                self.ram.clear();
                let len = bytes.len().min(N);
                // Cannot fail: the copy is cut to the buffer size first.
                let _ = self.ram.extend_from_slice(&bytes[..len]);
                self.region = Some(Region::Ram);
            }
            Message::Rom(bytes) => {
                self.rom = bytes;
                self.region = Some(Region::Rom);
            }
        }
        self.cursor = 0;
        Ok(())
    }

    /// Next byte to transmit.
    ///
    /// Returns `None` and ends the session at the end of the message or at a
    /// NUL byte.
    pub fn next_char(&mut self) -> Option<u8> {
        let bytes: &[u8] = match self.region? {
            Region::Ram => &self.ram,
            Region::Rom => self.rom,
        };

        match bytes.get(self.cursor).copied() {
            Some(byte) if byte != 0 => {
                self.cursor += 1;
                Some(byte)
            }
            _ => {
                self.clear();
                None
            }
        }
    }

    /// True while a message is installed.
    pub fn is_sending(&self) -> bool {
        self.region.is_some()
    }

    /// Region of the installed message.
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Abandon the installed message.
    pub fn clear(&mut self) {
        self.region = None;
        self.cursor = 0;
        self.rom = &[];
        self.ram.clear();
    }
}

impl<const N: usize> Default for TransmitSession<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Transmit session shared between the poll and transmit contexts.
#[derive(Debug)]
pub struct Transmitter {
    session: Mutex<RefCell<TransmitSession<TRANSMIT_BUFFER_SIZE>>>,
}

impl Transmitter {
    /// Create an idle transmitter.
    pub const fn new() -> Self {
        Self {
            session: Mutex::new(RefCell::new(TransmitSession::new())),
        }
    }

    /// Next byte for the link, from the transmit-ready interrupt.
    ///
    /// `None` means the message is complete; the interrupt should disable
    /// itself until the next `start_transmit`.
    pub fn next_byte(&self) -> Option<u8> {
        critical::with(Resume::Restore, |cs| self.session(cs).next_char())
    }

    /// True while a message is on the wire.
    pub fn is_sending(&self) -> bool {
        critical::with(Resume::Restore, |cs| self.session(cs).is_sending())
    }

    /// Feed every remaining byte of the current message to `write`.
    ///
    /// For links without a transmit interrupt.
    pub fn drain(&self, mut write: impl FnMut(u8)) {
        while let Some(byte) = self.next_byte() {
            write(byte);
        }
    }

    pub(crate) fn session<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
    ) -> RefMut<'cs, TransmitSession<TRANSMIT_BUFFER_SIZE>> {
        self.session.borrow_ref_mut(cs)
    }
}

impl Default for Transmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut session = TransmitSession::<8>::new();
        session.start(Message::text("ABC")).unwrap();

        assert_eq!(session.next_char(), Some(b'A'));
        assert_eq!(session.next_char(), Some(b'B'));
        assert_eq!(session.next_char(), Some(b'C'));
        assert!(session.is_sending());
        assert_eq!(session.next_char(), None);
        assert!(!session.is_sending());
        assert_eq!(session.next_char(), None);
    }

    #[test]
    fn test_busy_session_rejects() {
        let mut session = TransmitSession::<8>::new();
        session.start(Message::rom("first")).unwrap();

        assert_eq!(
            session.start(Message::text("second")),
            Err(EngineError::TransmitBusy)
        );
        assert_eq!(session.next_char(), Some(b'f'));
    }

    #[test]
    fn test_ram_is_copied() {
        let mut session = TransmitSession::<8>::new();
        let mut scratch = *b"hi";
        session.start(Message::Ram(&scratch)).unwrap();
        scratch[0] = b'X';

        assert_eq!(session.region(), Some(Region::Ram));
        assert_eq!(session.next_char(), Some(b'h'));
        assert_eq!(session.next_char(), Some(b'i'));
        assert_eq!(scratch[0], b'X');
    }

    #[test]
    fn test_rom_region() {
        let mut session = TransmitSession::<2>::new();
        // Longer than the RAM buffer; ROM messages are not copied.
        session.start(Message::rom("hello")).unwrap();
        assert_eq!(session.region(), Some(Region::Rom));

        let mut count = 0;
        while session.next_char().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_nul_ends_message() {
        let mut session = TransmitSession::<8>::new();
        session.start(Message::Ram(b"a\0b")).unwrap();
        assert_eq!(session.next_char(), Some(b'a'));
        assert_eq!(session.next_char(), None);
        assert!(!session.is_sending());
    }

    #[test]
    fn test_ram_cut_to_capacity() {
        let mut session = TransmitSession::<3>::new();
        session.start(Message::text("abcdef")).unwrap();

        let mut out = [0u8; 8];
        let mut len = 0;
        while let Some(b) = session.next_char() {
            out[len] = b;
            len += 1;
        }
        assert_eq!(&out[..len], b"abc");
    }

    #[test]
    fn test_transmitter_drain() {
        static TX: Transmitter = Transmitter::new();

        critical::with(Resume::Restore, |cs| {
            TX.session(cs).start(Message::rom("ok")).unwrap();
        });
        assert!(TX.is_sending());

        let mut seen = [0u8; 2];
        let mut index = 0;
        TX.drain(|b| {
            seen[index] = b;
            index += 1;
        });
        assert_eq!(&seen, b"ok");
        assert!(!TX.is_sending());
    }
}
