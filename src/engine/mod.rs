//! Command/report engine.
//!
//! `Engine` owns every piece of state shared between the tick context and
//! the poll context: the receive line buffer, the transmit session, the
//! report queue and the tick scheduler. All entry points take `&self`, so an
//! engine built with the const constructor can live in a `static` and be
//! reached from interrupt handlers.
//!
//! Entry points by context:
//!
//! | Context            | Method                                   |
//! |--------------------|------------------------------------------|
//! | receive interrupt  | [`Engine::receive_byte`]                 |
//! | transmit interrupt | [`Engine::next_byte_to_send`]            |
//! | timer interrupt    | [`Engine::on_tick`]                      |
//! | deferred interrupt | [`Engine::on_priority_tick`]             |
//! | main loop          | [`Engine::poll`] and everything else     |

use core::cell::RefCell;
use core::fmt::{self, Write};
use core::marker::PhantomData;

use critical_section::Mutex;
use log::{debug, info, warn};
use portable_atomic::{AtomicBool, Ordering};

use crate::config::{
    DEBUG_SLOTS, DefaultConfig, EngineConfig, LINE_COUNT, LINE_SIZE, Messages,
    REPORT_BUFFER_SIZE, REPORT_QUEUE_LEN, TRANSMIT_BUFFER_SIZE,
};
use crate::critical::{self, Resume};
use crate::error::EngineError;
use crate::io::Link;
use crate::report::{ReportBuf, ReportQueue};
use crate::table::{HandlerRow, HandlerTable, Mnemonic};

pub mod handler;
pub mod line_buffer;
pub mod parser;
pub mod scheduler;
pub mod transmit;
pub mod writer;

pub use handler::Handler;
pub use line_buffer::LineBuffer;
pub use parser::{Command, CommandParser, ParseState};
pub use scheduler::{OverrunStats, TickStats};
pub use transmit::{Message, Region, Transmitter};
pub use writer::TextWriter;

use scheduler::TickScheduler;

/// Help text for the built-in commands.
pub const BUILTIN_HELP: &str = "Built-in commands:\r\n\
    \r\n\
    \x20?, HLP  :  Help screen.\r\n\
    \x20 ECH 1/0:  Start/stop echoing typed characters back to the host.\r\n\
    \x20 IDQ    :  Device identification string query.\r\n\
    \x20 INI    :  Reinitialize (reset clock and idle events).\r\n";

/// Help text for the debugging built-ins.
#[cfg(feature = "debug-commands")]
pub const DEBUG_HELP: &str = "\r\n\
    Built-in debugging commands:\r\n\
    \r\n\
    \x20 ZZM    :  Report the amount of free memory.\r\n\
    \x20 ZZE    :  Report accumulated timeslice overruns for event handlers.\r\n";

const CRLF: &str = "\r\n";

type LineCopy = heapless::Vec<u8, LINE_SIZE>;

/// State only the poll context touches, but which must be reachable from a
/// shared reference.
#[derive(Debug)]
struct PollState {
    parser: CommandParser,
    reports: ReportQueue<REPORT_QUEUE_LEN, REPORT_BUFFER_SIZE>,
}

/// Command/report engine.
///
/// Generic over:
/// - `'a`: lifetime of the handler table (typically `'static`)
/// - `L`: platform link hooks
/// - `C`: behavioural configuration
pub struct Engine<'a, L, C = DefaultConfig>
where
    L: Link,
    C: EngineConfig,
{
    /// Registered handlers, in dispatch order
    table: HandlerTable<'a>,

    /// Identity and banner strings
    messages: Messages,

    /// Platform hooks
    link: L,

    /// Receive lines, written from the receive interrupt
    rx: Mutex<RefCell<LineBuffer<LINE_COUNT, LINE_SIZE>>>,

    /// Transmit session, read from the transmit interrupt
    tx: Transmitter,

    /// Parser and report queue
    poll_state: Mutex<RefCell<PollState>>,

    /// Echo received lines back to the host
    echo: AtomicBool,

    /// Tick counter, busy flags and overrun counters
    scheduler: TickScheduler,

    _config: PhantomData<fn() -> C>,
}

// ============================================================================
// Debug implementation
// ============================================================================

impl<L: Link, C: EngineConfig> fmt::Debug for Engine<'_, L, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("rows", &self.table.rows().len())
            .field("echo", &self.echo_enabled())
            .field("ticks", &self.ticks())
            .field("sending", &self.tx.is_sending())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Construction and context entry points
// ============================================================================

impl<'a, L: Link, C: EngineConfig> Engine<'a, L, C> {
    /// Build an engine. Usable in `static` initializers.
    ///
    /// Call [`initial_setup`](Self::initial_setup) once before the first
    /// `poll`.
    pub const fn new(rows: &'a [HandlerRow<'a>], messages: Messages, link: L) -> Self {
        Self {
            table: HandlerTable::new(rows),
            messages,
            link,
            rx: Mutex::new(RefCell::new(LineBuffer::new(C::FILTER_EMPTY_LINES))),
            tx: Transmitter::new(),
            poll_state: Mutex::new(RefCell::new(PollState {
                parser: CommandParser::new(),
                reports: ReportQueue::new(),
            })),
            echo: AtomicBool::new(C::DEFAULT_ECHO),
            scheduler: TickScheduler::new(),
            _config: PhantomData,
        }
    }

    /// Feed one byte from the link. Receive interrupt.
    pub fn receive_byte(&self, byte: u8) {
        critical::with(Resume::Restore, |cs| {
            self.rx.borrow_ref_mut(cs).handle_received_byte(byte)
        });
    }

    /// Next byte for the link, `None` once the message is done. Transmit
    /// interrupt.
    pub fn next_byte_to_send(&self) -> Option<u8> {
        self.tx.next_byte()
    }

    /// Periodic tick. Timer interrupt.
    ///
    /// Runs every handler's `tick`. Skipped, and the skip counted, while the
    /// previous tick is still running. The platform should trigger
    /// [`on_priority_tick`](Self::on_priority_tick) afterwards.
    pub fn on_tick(&self) {
        self.scheduler.on_tick(&self.table);
    }

    /// High-priority polling. A software interrupt below the timer's
    /// priority, pended from the timer interrupt (PendSV on Cortex-M).
    ///
    /// Runs every handler's `high_priority_poll`. The timer may preempt it,
    /// so a long poll delays no `tick`. Skipped, and the skip counted, while
    /// the previous run is still in progress.
    pub fn on_priority_tick(&self) {
        self.scheduler.on_priority_tick(&self.table);
    }

    // ========================================================================
    // Lifecycle (poll context)
    // ========================================================================

    /// First-time setup: hardware init on every handler, then a soft reset.
    pub fn initial_setup(&self) {
        for (_, handler) in self.table.distinct() {
            handler.init_hardware();
        }
        self.reinit();
    }

    /// Soft reset.
    ///
    /// Lets any transmission finish, clears the parser, report queue, receive
    /// lines and debug counters, then runs `init_state` once per handler.
    pub fn reinit(&self) {
        info!("reinitializing {} handler rows", self.table.rows().len());
        self.wait_until_done();

        critical::with(Resume::Restore, |cs| {
            let mut poll = self.poll_state.borrow_ref_mut(cs);
            poll.parser.reset();
            poll.reports.clear();
            self.rx.borrow_ref_mut(cs).reset();
            self.scheduler.reset_counters();
        });

        for (_, handler) in self.table.distinct() {
            handler.init_state();
        }
    }

    /// Reset the link-facing buffers after the peripheral was reprogrammed
    /// (for example a baud rate change).
    pub fn reconfigure_link(&self) {
        info!("link reconfigured, dropping buffered traffic");
        self.wait_until_done();

        critical::with(Resume::Restore, |cs| {
            self.rx.borrow_ref_mut(cs).reset();
            self.tx.session(cs).clear();
            self.poll_state.borrow_ref_mut(cs).reports.clear();
        });
    }

    // ========================================================================
    // Poll loop
    // ========================================================================

    /// One pass of the poll loop.
    ///
    /// 1. Process at most one received line.
    /// 2. Snapshot report state from every handler.
    /// 3. Move the report queue forward if the transmitter is idle.
    /// 4. Collect new reports while slots are free.
    /// 5. Run every handler's `idle_poll`.
    pub fn poll(&self) {
        if let Some((line, generation)) = self.take_line() {
            self.process_line(&line);
            self.release_line(generation);
        }

        critical::with(Resume::Restore, |_| {
            for (_, handler) in self.table.distinct() {
                handler.save_report_snapshot();
            }
        });

        self.send_next_report();
        self.collect_reports();

        for (_, handler) in self.table.distinct() {
            handler.idle_poll();
        }
    }

    fn take_line(&self) -> Option<(LineCopy, u32)> {
        critical::with(Resume::Restore, |cs| {
            let rx = self.rx.borrow_ref(cs);
            let line = LineCopy::from_slice(rx.next_line()?).ok()?;
            Some((line, rx.generation()))
        })
    }

    /// Release the line taken under `generation`.
    ///
    /// Skipped when the buffer was reset while the line was processed; the
    /// oldest line is then one that arrived after the reset.
    fn release_line(&self, generation: u32) {
        critical::with(Resume::Restore, |cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            if rx.generation() == generation {
                rx.release_line();
            }
        });
    }

    fn process_line(&self, line: &[u8]) {
        if self.echo_enabled() {
            self.send_bytes(line);
            self.send_static(CRLF);
        }

        let parsed = critical::with(Resume::Restore, |cs| {
            let mut poll = self.poll_state.borrow_ref_mut(cs);
            poll.parser.parse_line(line)?;
            Ok::<_, EngineError>(poll.parser.take_command())
        });

        let outcome = match parsed {
            Ok(Some(command)) => self.dispatch(&command),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };

        if let Err(err) = outcome.or_else(|err| self.reject_line(line, err)) {
            warn!("line not answered: {}", err);
        }
    }

    /// Answer a bad line with the diagnostic. Other errors are passed back.
    fn reject_line(&self, line: &[u8], err: EngineError) -> Result<(), EngineError> {
        if !err.is_diagnostic() {
            return Err(err);
        }
        debug!("rejected line ({})", err);
        self.print_short_help(line)
    }

    /// Route a parsed command to a built-in or a handler.
    fn dispatch(&self, command: &Command) -> Result<(), EngineError> {
        match command.mnemonic {
            Mnemonic::HELP => self.show_help(),
            Mnemonic::IDENTIFY => self.send_static(self.messages.identity),
            Mnemonic::RESET => self.reinit(),
            Mnemonic::ECHO => {
                if command.argcount != 1 {
                    return Err(EngineError::ArgumentCount {
                        expected: 1,
                        received: command.argcount,
                    });
                }
                self.set_echo(command.arg1 != 0);
            }
            #[cfg(feature = "debug-commands")]
            Mnemonic::MEMORY => self.report_free_memory()?,
            #[cfg(feature = "debug-commands")]
            Mnemonic::OVERRUNS => self.report_overruns()?,
            mnemonic => {
                let (handler, spec) = self.table.resolve(mnemonic, command.argcount)?;
                debug!("dispatch {} opcode {}", mnemonic, spec.opcode);
                handler.handle_command(spec.opcode, command.arg1, command.arg2);
            }
        }
        Ok(())
    }

    fn show_help(&self) {
        self.send_static(CRLF);
        self.send_static(self.messages.help_banner);
        self.send_static(CRLF);
        self.send_static(BUILTIN_HELP);
        #[cfg(feature = "debug-commands")]
        self.send_static(DEBUG_HELP);

        for (_, handler) in self.table.distinct() {
            self.send_static(CRLF);
            self.send_static(handler.help_screen());
        }

        self.send_static(CRLF);
    }

    /// Diagnostic for a line that failed to parse or dispatch.
    fn print_short_help(&self, line: &[u8]) -> Result<(), EngineError> {
        let mut out = self.writer();
        out.write_str("Unrecognized command:  \"")?;
        out.write_escaped(line)?;
        out.write_str("\". Type \"?\" or \"HLP\" for help.\r\n")?;
        Ok(())
    }

    #[cfg(feature = "debug-commands")]
    fn report_free_memory(&self) -> fmt::Result {
        let mut out = self.writer();
        match self.link.free_memory() {
            Some(bytes) => write!(out, "Available memory:  {} bytes\r\n", bytes),
            None => out.write_str("Available memory:  unknown\r\n"),
        }
    }

    #[cfg(feature = "debug-commands")]
    fn report_overruns(&self) -> fmt::Result {
        let stats = self.tick_stats();
        let mut out = self.writer();

        write!(out, "ISR skipped ticks: {:10}\r\n", stats.fast.skipped)?;
        for (slot, count) in stats.fast.overruns.iter().enumerate() {
            write!(out, "ISR handler {:02} tick overruns:  {:10}\r\n", slot, count)?;
        }

        write!(
            out,
            "Priority poll skipped ticks: {:10}\r\n",
            stats.priority.skipped
        )?;
        for (slot, count) in stats.priority.overruns.iter().enumerate() {
            write!(
                out,
                "Priority poll handler {:02} tick overruns:  {:10}\r\n",
                slot, count
            )?;
        }

        out.write_str("End of skipped ticks.\r\n")
    }

    /// Retire the report on the wire and start the next one.
    fn send_next_report(&self) {
        critical::with(Resume::Restore, |cs| {
            let mut poll = self.poll_state.borrow_ref_mut(cs);
            if poll.reports.is_empty() {
                return;
            }

            let mut session = self.tx.session(cs);
            if session.is_sending() {
                return;
            }

            if let Some(text) = poll.reports.advance()
                && session.start(Message::text(text)).is_ok()
            {
                self.link.start_transmit();
            }
        });
    }

    /// Ask each handler for reports until it runs dry or the queue fills.
    fn collect_reports(&self) {
        for (slot, handler) in self.table.distinct() {
            loop {
                let full = critical::with(Resume::Restore, |cs| {
                    self.poll_state.borrow_ref(cs).reports.is_full()
                });
                if full {
                    return;
                }

                let mut report = ReportBuf::new();
                if !handler.make_report_string(&mut report) {
                    break;
                }

                let queued = critical::with(Resume::Restore, |cs| {
                    self.poll_state.borrow_ref_mut(cs).reports.push(&report)
                });
                if let Err(err) = queued {
                    warn!("handler {} report dropped: {}", slot, err);
                    return;
                }
            }
        }
    }

    // ========================================================================
    // Output (poll context)
    // ========================================================================

    /// Send a message, first waiting for any message already on the wire.
    ///
    /// Empty messages are ignored.
    pub fn queue_send(&self, message: Message<'_>) {
        if message.is_empty() {
            return;
        }

        loop {
            self.wait_until_done();

            let started = critical::with(Resume::Restore, |cs| {
                let started = self.tx.session(cs).start(message).is_ok();
                if started {
                    self.link.start_transmit();
                }
                started
            });

            if started {
                return;
            }
        }
    }

    /// Send static text without copying it.
    pub fn send_static(&self, text: &'static str) {
        self.queue_send(Message::Rom(text.as_bytes()));
    }

    /// Send transient text.
    pub fn send_text(&self, text: &str) {
        self.send_bytes(text.as_bytes());
    }

    /// Send transient bytes, split into session-sized messages.
    pub fn send_bytes(&self, bytes: &[u8]) {
        for chunk in bytes.chunks(TRANSMIT_BUFFER_SIZE) {
            self.queue_send(Message::Ram(chunk));
        }
    }

    /// Formatted output: `write!(engine.writer(), ...)`.
    pub fn writer(&self) -> TextWriter<'_, 'a, L, C> {
        TextWriter::new(self)
    }

    /// Busy-wait until the current message has been sent.
    pub fn wait_until_done(&self) {
        while self.tx.is_sending() {
            self.link.wait_quantum(&self.tx);
        }
    }

    /// True while a message is on the wire.
    pub fn is_sending(&self) -> bool {
        self.tx.is_sending()
    }

    // ========================================================================
    // Settings and queries
    // ========================================================================

    /// Turn echo of received lines on or off.
    pub fn set_echo(&self, enabled: bool) {
        self.echo.store(enabled, Ordering::Relaxed);
    }

    /// True when received lines are echoed.
    pub fn echo_enabled(&self) -> bool {
        self.echo.load(Ordering::Relaxed)
    }

    /// Drop empty lines at the receive buffer instead of queueing them.
    pub fn set_line_filtering(&self, enabled: bool) {
        critical::with(Resume::Restore, |cs| {
            self.rx.borrow_ref_mut(cs).set_filtering(enabled)
        });
    }

    /// Number of received lines waiting for the poll loop.
    pub fn pending_lines(&self) -> usize {
        critical::with(Resume::Restore, |cs| self.rx.borrow_ref(cs).pending())
    }

    /// Number of occupied report slots.
    pub fn queued_reports(&self) -> usize {
        critical::with(Resume::Restore, |cs| {
            self.poll_state.borrow_ref(cs).reports.len()
        })
    }

    /// Ticks since power-up. Wraps.
    pub fn ticks(&self) -> u32 {
        self.scheduler.ticks()
    }

    /// Skip and overrun counters for both tick buckets.
    pub fn tick_stats(&self) -> TickStats {
        critical::with(Resume::Restore, |_| self.scheduler.stats())
    }

    /// Number of handler rows that get overrun counters.
    pub const fn debug_slots(&self) -> usize {
        DEBUG_SLOTS
    }

    /// Transmit session, for links that pull bytes outside the interrupt.
    pub fn transmitter(&self) -> &Transmitter {
        &self.tx
    }

    /// Platform hooks.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Handler registry.
    pub fn table(&self) -> &HandlerTable<'a> {
        &self.table
    }

    /// Identity and banner strings.
    pub fn messages(&self) -> &Messages {
        &self.messages
    }
}
