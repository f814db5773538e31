//! Nestable critical sections shared by the tick and poll contexts.
//!
//! `Section` is a scoped guard over the `critical-section` crate. Entering
//! from a context that already holds the section only bumps the nesting
//! depth; the underlying lock is released when the outermost guard drops.
//! On single-core targets the lock is the global interrupt mask; on hosted
//! targets (`critical-section/std`) it is a process-wide mutex with per-thread
//! reentrancy, so the same logical owner can nest without deadlocking.
//!
//! The lock cannot be dropped while an enclosing guard still hands out
//! tokens, so a [`Resume::Force`] section entered inside another one takes
//! effect when the outermost section ends. At that point the lock is released
//! and the hook installed with [`set_interrupt_enable`] unmasks interrupts,
//! whatever their state was before the outermost entry. Without a hook,
//! `Force` ends like `Restore`.

use core::cell::Cell;
use core::marker::PhantomData;
use core::num::NonZeroU8;

use critical_section::{CriticalSection, Mutex, RestoreState};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

/// Nesting depth of the held section. Only the holder writes it.
static DEPTH: AtomicUsize = AtomicUsize::new(0);

/// A `Force` section was entered during the current hold.
static FORCE: AtomicBool = AtomicBool::new(false);

/// Platform routine that unmasks interrupts.
static ENABLE: Mutex<Cell<Option<fn()>>> = Mutex::new(Cell::new(None));

/// Install the routine that unmasks interrupts at the end of a `Force`
/// section, e.g. `|| unsafe { cortex_m::interrupt::enable() }`.
///
/// Hosted builds have no interrupt mask and need no hook.
pub fn set_interrupt_enable(hook: fn()) {
    critical_section::with(|cs| ENABLE.borrow(cs).set(Some(hook)));
}

/// How interrupts should be left when a section ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Leave interrupts enabled regardless of the state on entry
    Force,

    /// Leave whatever state existed before the outermost entry
    Restore,
}

/// What ending a section does, as of now.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResumeState {
    /// Lock released, the state from before the outermost entry comes back
    Restored = 1,

    /// Lock released, interrupts enabled
    InterruptsOn = 2,

    /// An enclosing section still holds the lock
    Held = 3,
}

/// Scoped critical section.
///
/// Dropping the guard leaves the section. Guards must be dropped in the
/// reverse order they were created; nesting them lexically guarantees this.
#[derive(Debug)]
pub struct Section {
    restore: RestoreState,
    level: usize,

    // Must stay on the context that entered it.
    _not_send: PhantomData<*mut ()>,
}

impl Section {
    /// Enter a critical section, blocking until it is available.
    ///
    /// Returns immediately when the calling context already holds it.
    pub fn enter(mode: Resume) -> Self {
        // SAFETY: paired with exactly one `release` in `Drop`, and guards are
        // not Send, so the release happens on the acquiring context.
        let restore = unsafe { critical_section::acquire() };

        let level = DEPTH.load(Ordering::Relaxed) + 1;
        DEPTH.store(level, Ordering::Relaxed);

        if mode == Resume::Force {
            FORCE.store(true, Ordering::Relaxed);
        }

        Self {
            restore,
            level,
            _not_send: PhantomData,
        }
    }

    /// Token for borrowing `critical_section::Mutex` contents.
    pub fn cs(&self) -> CriticalSection<'_> {
        // SAFETY: the lock is held for as long as `self` is alive.
        unsafe { CriticalSection::new() }
    }

    /// Nesting depth of this guard (1 for the outermost).
    pub fn depth(&self) -> usize {
        self.level
    }

    /// What dropping this guard would do now.
    ///
    /// An outermost guard reports `InterruptsOn` once any section of the
    /// current hold was entered with [`Resume::Force`].
    pub fn resume_state(&self) -> ResumeState {
        if self.level > 1 {
            ResumeState::Held
        } else if FORCE.load(Ordering::Relaxed) {
            ResumeState::InterruptsOn
        } else {
            ResumeState::Restored
        }
    }

    /// Non-zero encoding of [`resume_state`](Self::resume_state).
    pub fn token(&self) -> NonZeroU8 {
        NonZeroU8::MIN.saturating_add(self.resume_state() as u8 - 1)
    }

    /// Leave the section now instead of at end of scope.
    pub fn exit(self) {}
}

impl Drop for Section {
    fn drop(&mut self) {
        debug_assert_eq!(
            DEPTH.load(Ordering::Relaxed),
            self.level,
            "critical sections released out of order"
        );

        let enable = if self.level == 1 && FORCE.swap(false, Ordering::Relaxed) {
            ENABLE.borrow(self.cs()).get()
        } else {
            None
        };
        DEPTH.store(self.level - 1, Ordering::Relaxed);

        // SAFETY: `restore` came from the matching `acquire` in `enter`.
        unsafe { critical_section::release(self.restore) };

        if let Some(enable) = enable {
            enable();
        }
    }
}

/// Run `f` inside a critical section.
pub fn with<R>(mode: Resume, f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
    let section = Section::enter(mode);
    f(section.cs())
}

/// Current nesting depth.
///
/// Only meaningful when read from inside a section.
pub fn nesting_depth() -> usize {
    DEPTH.load(Ordering::Relaxed)
}
