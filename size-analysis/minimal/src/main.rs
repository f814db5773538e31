#![no_std]
#![no_main]

use core::fmt::Write;
use core::sync::atomic::{AtomicU16, Ordering};

use cortex_m::peripheral::SCB;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use panic_halt as _;
use tickline::config::{Messages, QuietConfig};
use tickline::engine::Transmitter;
use tickline::{CommandSpec, Engine, Handler, HandlerRow, Link, ReportBuf};

// Minimal link - measures only engine footprint, bytes go nowhere
pub struct MinimalLink;

impl Link for MinimalLink {
    fn wait_quantum(&self, tx: &Transmitter) {
        tx.drain(|byte| {
            core::hint::black_box(byte);
        });
    }
}

// Minimal handler with one command and one report
struct Counter {
    ticks: AtomicU16,
    reported: AtomicU16,
}

impl Handler for Counter {
    fn help_screen(&self) -> &'static str {
        "  CNT    :  Report the tick counter.\r\n"
    }

    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn handle_command(&self, _opcode: u8, _arg1: u16, _arg2: u16) {
        self.reported.store(0, Ordering::Relaxed);
    }

    fn make_report_string(&self, buffer: &mut ReportBuf) -> bool {
        let ticks = self.ticks.load(Ordering::Relaxed);
        if self.reported.swap(ticks, Ordering::Relaxed) == ticks {
            return false;
        }
        write!(buffer, "Ticks: {}\r\n", ticks).is_ok()
    }
}

static COUNTER: Counter = Counter {
    ticks: AtomicU16::new(0),
    reported: AtomicU16::new(0),
};

const COUNTER_COMMANDS: &[CommandSpec] = &[CommandSpec::new(b"CNT", 0, 0)];

static ROWS: [HandlerRow<'static>; 1] = [HandlerRow::new(&COUNTER, COUNTER_COMMANDS)];

static ENGINE: Engine<'static, MinimalLink, QuietConfig> = Engine::new(
    &ROWS,
    Messages::new("tickline size probe\r\n", "Size probe.\r\n"),
    MinimalLink,
);

// Entry point
#[cortex_m_rt::entry]
fn main() -> ! {
    let mut core = cortex_m::Peripherals::take().unwrap();
    core.SYST.set_clock_source(SystClkSource::Core);
    core.SYST.set_reload(8_000 - 1);
    core.SYST.enable_interrupt();
    core.SYST.enable_counter();

    // Priority polling runs below the timer so SysTick can preempt it
    unsafe { core.SCB.set_priority(SystemHandler::PendSV, 0xff) };
    tickline::critical::set_interrupt_enable(|| unsafe { cortex_m::interrupt::enable() });

    ENGINE.initial_setup();

    // Feed one command so the parser and dispatch are linked in
    for &byte in b"CNT\r" {
        ENGINE.receive_byte(core::hint::black_box(byte));
    }

    loop {
        ENGINE.poll();
        cortex_m::asm::nop();
    }
}

#[cortex_m_rt::exception]
fn SysTick() {
    ENGINE.on_tick();
    SCB::set_pendsv();
}

#[cortex_m_rt::exception]
fn PendSV() {
    ENGINE.on_priority_tick();
}

// Required: exception handler
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    loop {
        cortex_m::asm::nop();
    }
}
