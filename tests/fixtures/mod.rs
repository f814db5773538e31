//! Test fixtures and utilities for tickline testing.
//!
//! Provides:
//! - `MockLink`: Test implementation of the `Link` trait
//! - `Recorder`: Handler that records every hook call
//! - Command lists and messages shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use tickline::config::Messages;
use tickline::engine::Transmitter;
use tickline::{CommandSpec, Handler, Link, ReportBuf};

// ============================================================================
// MockLink - Test Link Implementation
// ============================================================================

/// Mock serial link.
///
/// Behaves like a polled UART: bytes leave the transmit session only while
/// the engine is waiting, and are captured in memory.
#[derive(Debug)]
pub struct MockLink {
    /// Everything sent so far
    output: Mutex<Vec<u8>>,

    /// Number of `start_transmit` calls
    starts: AtomicUsize,

    /// Value reported by `free_memory`
    free: Option<u32>,
}

impl MockLink {
    /// Create a link with no free-memory information.
    pub const fn new() -> Self {
        Self {
            output: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
            free: None,
        }
    }

    /// Create a link that reports `bytes` of free memory.
    pub const fn with_free_memory(bytes: u32) -> Self {
        Self {
            output: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
            free: Some(bytes),
        }
    }

    /// Take captured output as a string, clearing it.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut *self.output.lock().unwrap());
        String::from_utf8(bytes).unwrap()
    }

    /// Number of messages started.
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::Relaxed)
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Link for MockLink {
    fn start_transmit(&self) {
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    fn wait_quantum(&self, tx: &Transmitter) {
        let mut output = self.output.lock().unwrap();
        tx.drain(|byte| output.push(byte));
    }

    fn free_memory(&self) -> Option<u32> {
        self.free
    }
}

// ============================================================================
// Recorder - Handler That Logs Hook Calls
// ============================================================================

/// Hook call observed by a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    InitHardware,
    InitState,
    Command(u8, u16, u16),
}

/// Handler that records lifecycle and command calls, counts tick hooks and
/// hands out canned reports.
#[derive(Debug)]
pub struct Recorder {
    help: &'static str,
    events: Mutex<Vec<Event>>,
    reports: Mutex<VecDeque<String>>,
    ticks: AtomicU32,
    priority_polls: AtomicU32,
    snapshots: AtomicU32,
    idle_polls: AtomicU32,
}

impl Recorder {
    /// Create a recorder with the given help screen.
    pub const fn new(help: &'static str) -> Self {
        Self {
            help,
            events: Mutex::new(Vec::new()),
            reports: Mutex::new(VecDeque::new()),
            ticks: AtomicU32::new(0),
            priority_polls: AtomicU32::new(0),
            snapshots: AtomicU32::new(0),
            idle_polls: AtomicU32::new(0),
        }
    }

    /// Queue a report for `make_report_string` to hand out.
    pub fn queue_report(&self, text: &str) {
        self.reports.lock().unwrap().push_back(text.to_string());
    }

    /// Reports not yet collected by the engine.
    pub fn reports_left(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// How many times `event` was recorded.
    pub fn count(&self, event: Event) -> usize {
        self.events().iter().filter(|&&e| e == event).count()
    }

    /// Recorded handler commands.
    pub fn commands(&self) -> Vec<(u8, u16, u16)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Command(op, a, b) => Some((op, a, b)),
                _ => None,
            })
            .collect()
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn priority_polls(&self) -> u32 {
        self.priority_polls.load(Ordering::Relaxed)
    }

    pub fn snapshots(&self) -> u32 {
        self.snapshots.load(Ordering::Relaxed)
    }

    pub fn idle_polls(&self) -> u32 {
        self.idle_polls.load(Ordering::Relaxed)
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Handler for Recorder {
    fn help_screen(&self) -> &'static str {
        self.help
    }

    fn init_hardware(&self) {
        self.record(Event::InitHardware);
    }

    fn init_state(&self) {
        self.record(Event::InitState);
    }

    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn high_priority_poll(&self) {
        self.priority_polls.fetch_add(1, Ordering::Relaxed);
    }

    fn handle_command(&self, opcode: u8, arg1: u16, arg2: u16) {
        self.record(Event::Command(opcode, arg1, arg2));
    }

    fn save_report_snapshot(&self) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    fn make_report_string(&self, buffer: &mut ReportBuf) -> bool {
        match self.reports.lock().unwrap().pop_front() {
            Some(text) => buffer.push_str(&text).is_ok(),
            None => false,
        }
    }

    fn idle_poll(&self) {
        self.idle_polls.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Shared Constants
// ============================================================================

/// Identity and banner used by every test engine.
pub const MESSAGES: Messages = Messages::new("TEST-DEVICE 1.0\r\n", "Test rig.\r\n");

/// Lamp commands: LON (no args), LVL n, LRG a b
pub const LAMP_COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(b"LON", 0, 0),
    CommandSpec::new(b"LVL", 1, 1),
    CommandSpec::new(b"LRG", 2, 2),
];

/// Second grammar for the lamp handler
pub const LAMP_SERVICE_COMMANDS: &[CommandSpec] = &[CommandSpec::new(b"LSV", 7, 0)];

/// Pump commands; PMP shares opcode 0 with LON on purpose.
pub const PUMP_COMMANDS: &[CommandSpec] = &[
    CommandSpec::new(b"PMP", 0, 1),
    CommandSpec::new(b"LVL", 9, 2),
];

pub const LAMP_HELP: &str = "  LON     :  Lamp on.\r\n";
pub const PUMP_HELP: &str = "  PMP n   :  Pump rate.\r\n";
