//! Link abstraction between the engine and the serial peripheral.
//!
//! The engine never touches hardware. Received bytes are pushed in through
//! [`Engine::receive_byte`](crate::engine::Engine::receive_byte) and the
//! transmit side pulls bytes out through
//! [`Transmitter::next_byte`](crate::engine::Transmitter::next_byte). The
//! `Link` trait covers the few things the engine has to ask of the platform.

use crate::engine::Transmitter;

/// Platform hooks for the serial link.
///
/// Interrupt-driven targets typically implement `start_transmit` (unmask the
/// transmit-ready interrupt) and leave `wait_quantum` as a short spin. Polled
/// targets write bytes directly from `wait_quantum`:
///
/// ```rust,ignore
/// impl Link for PolledUart {
///     fn wait_quantum(&self, tx: &Transmitter) {
///         tx.drain(|byte| self.write_blocking(byte));
///     }
/// }
/// ```
pub trait Link {
    /// A new message is ready; enable the transmit path.
    ///
    /// Called from inside a critical section, right after the message is
    /// installed.
    fn start_transmit(&self) {}

    /// One busy-wait step while a message is still on the wire.
    ///
    /// Called from the poll context only. Must return; the tick context has
    /// to keep running for a transmission to make progress.
    fn wait_quantum(&self, tx: &Transmitter);

    /// Free memory in bytes, if the platform can tell.
    fn free_memory(&self) -> Option<u32> {
        None
    }
}

impl<T: Link + ?Sized> Link for &T {
    fn start_transmit(&self) {
        (**self).start_transmit()
    }

    fn wait_quantum(&self, tx: &Transmitter) {
        (**self).wait_quantum(tx)
    }

    fn free_memory(&self) -> Option<u32> {
        (**self).free_memory()
    }
}
