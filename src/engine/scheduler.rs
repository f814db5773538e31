//! Tick-context scheduling and overrun accounting.
//!
//! Two buckets of handler hooks, each behind its own busy flag. A bucket that
//! is still running when it is entered again is skipped and the skip counted,
//! never re-entered. The fast bucket (`tick`) runs from the timer interrupt
//! and must fit in one period, so any skip there is a timing fault. The
//! priority bucket (`high_priority_poll`) runs from a separate entry point
//! that the platform triggers at a lower interrupt priority after each tick,
//! so the timer can preempt it. It may span several periods; skips there are
//! normal.
//!
//! Per-handler counters accumulate how many ticks elapsed while each hook
//! ran. They are indexed by the handler's first row in the table.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::DEBUG_SLOTS;
use crate::engine::handler::Handler;
use crate::table::HandlerTable;

/// Snapshot of one bucket's counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OverrunStats {
    /// Ticks on which the bucket was still busy
    pub skipped: u32,

    /// Ticks elapsed inside each handler's hook, by debug slot
    pub overruns: [u32; DEBUG_SLOTS],
}

/// Snapshot of both buckets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TickStats {
    /// `tick` hooks
    pub fast: OverrunStats,

    /// `high_priority_poll` hooks
    pub priority: OverrunStats,
}

/// Reentrancy-guarded group of tick hooks.
#[derive(Debug)]
pub struct Bucket {
    busy: AtomicBool,
    skipped: AtomicU32,
    overruns: [AtomicU32; DEBUG_SLOTS],
}

impl Bucket {
    /// Create an idle bucket with zeroed counters.
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            skipped: AtomicU32::new(0),
            overruns: [const { AtomicU32::new(0) }; DEBUG_SLOTS],
        }
    }

    /// Run `hook` on every distinct handler unless the bucket is busy.
    ///
    /// Returns `false` when the run was skipped.
    pub fn run(
        &self,
        clock: &AtomicU32,
        table: &HandlerTable<'_>,
        hook: impl Fn(&dyn Handler),
    ) -> bool {
        if self.busy.swap(true, Ordering::Acquire) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let mut then = clock.load(Ordering::Relaxed);
        for (slot, handler) in table.distinct() {
            hook(handler);

            let now = clock.load(Ordering::Relaxed);
            if let Some(counter) = self.overruns.get(slot) {
                counter.fetch_add(now.wrapping_sub(then), Ordering::Relaxed);
            }
            then = now;
        }

        self.busy.store(false, Ordering::Release);
        true
    }

    /// True while hooks from this bucket are running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    /// Current counter values.
    pub fn stats(&self) -> OverrunStats {
        OverrunStats {
            skipped: self.skipped.load(Ordering::Relaxed),
            overruns: core::array::from_fn(|slot| self.overruns[slot].load(Ordering::Relaxed)),
        }
    }

    /// Zero the counters. The busy flag is left alone.
    pub fn reset_counters(&self) {
        self.skipped.store(0, Ordering::Relaxed);
        for counter in &self.overruns {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Bucket {
    fn default() -> Self {
        Self::new()
    }
}

/// Tick counter plus the fast and priority buckets.
#[derive(Debug)]
pub struct TickScheduler {
    ticks: AtomicU32,
    fast: Bucket,
    priority: Bucket,
}

impl TickScheduler {
    /// Create a scheduler at tick zero.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            fast: Bucket::new(),
            priority: Bucket::new(),
        }
    }

    /// One tick: count it, then run the fast bucket.
    pub fn on_tick(&self, table: &HandlerTable<'_>) -> bool {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.fast.run(&self.ticks, table, |handler| handler.tick())
    }

    /// Run the priority bucket.
    pub fn on_priority_tick(&self, table: &HandlerTable<'_>) -> bool {
        self.priority.run(&self.ticks, table, |handler| {
            handler.high_priority_poll()
        })
    }

    /// Ticks since power-up. Wraps.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Counter snapshot for both buckets.
    pub fn stats(&self) -> TickStats {
        TickStats {
            fast: self.fast.stats(),
            priority: self.priority.stats(),
        }
    }

    /// Zero every counter except the tick count.
    pub fn reset_counters(&self) {
        self.fast.reset_counters();
        self.priority.reset_counters();
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}
