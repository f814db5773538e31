//! Fixed-length command names.

use core::fmt;

/// Number of characters in a mnemonic.
pub const MNEMONIC_LEN: usize = 3;

/// Three-letter, upper-case command name.
///
/// Bytes that were never filled (a line with a one- or two-letter opcode)
/// stay zero, so such a mnemonic never matches a registered one.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Mnemonic([u8; MNEMONIC_LEN]);

impl Mnemonic {
    /// `HLP` - long-form help. A bare `?` parses to this.
    pub const HELP: Mnemonic = Mnemonic::new(b"HLP");

    /// `IDQ` - identity query
    pub const IDENTIFY: Mnemonic = Mnemonic::new(b"IDQ");

    /// `INI` - soft reset
    pub const RESET: Mnemonic = Mnemonic::new(b"INI");

    /// `ECH` - echo on/off
    pub const ECHO: Mnemonic = Mnemonic::new(b"ECH");

    /// `ZZM` - free memory report
    #[cfg(feature = "debug-commands")]
    pub const MEMORY: Mnemonic = Mnemonic::new(b"ZZM");

    /// `ZZE` - tick overrun report
    #[cfg(feature = "debug-commands")]
    pub const OVERRUNS: Mnemonic = Mnemonic::new(b"ZZE");

    /// Build a mnemonic, folding ASCII letters to upper case.
    pub const fn new(name: &[u8; MNEMONIC_LEN]) -> Self {
        let mut bytes = [0u8; MNEMONIC_LEN];
        let mut i = 0;
        while i < MNEMONIC_LEN {
            bytes[i] = name[i].to_ascii_uppercase();
            i += 1;
        }
        Self(bytes)
    }

    /// Wrap raw bytes without case folding.
    pub(crate) const fn from_raw(bytes: [u8; MNEMONIC_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw mnemonic bytes.
    pub fn as_bytes(&self) -> &[u8; MNEMONIC_LEN] {
        &self.0
    }

    /// Number of characters actually present.
    pub fn len(&self) -> usize {
        self.0.iter().take_while(|&&b| b != 0).count()
    }

    /// True for the mnemonic of an empty line.
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0[..self.len()] {
            fmt::Write::write_char(f, b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic(\"{}\")", self)
    }
}
