//! Serial port output, used for the panic banner and boot log.

#![cfg(target_arch = "x86_64")]

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;
use uart_16550::SerialPort;

/// Set once the panic handler has started unwinding the serial port's own
/// write path, so a panic triggered while formatting a panic message does
/// not recurse into [`_print`] and deadlock on `SERIAL1`.
static IN_PANIC: AtomicBool = AtomicBool::new(false);

/// Marks that a panic is in progress. Called once, by the panic handler,
/// before it formats anything onto the serial port.
pub fn enter_panic() {
    IN_PANIC.store(true, Ordering::Relaxed);
}

lazy_static::lazy_static! {
    static ref SERIAL1: Mutex<SerialPort> = {
        // SAFETY: 0x3F8 is the standard COM1 I/O port on x86_64; this is the
        // first and only initialization of this port.
        let mut port = unsafe { SerialPort::new(0x3F8) };
        port.init();
        Mutex::new(port)
    };
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    // Avoid deadlocking if formatting a panic message itself panics.
    if IN_PANIC.load(Ordering::Relaxed) {
        return;
    }
    let _ = SERIAL1.lock().write_fmt(args);
}

/// A minimal `log::Log` implementation that writes every record to the
/// serial port, keeping kernel logging dependency-light rather than
/// pulling in a formatting-heavy logger crate.
pub struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = SERIAL1
                .lock()
                .write_fmt(format_args!("[{}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Installs the serial logger as the global `log` backend. Idempotent.
pub fn init_logger() {
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Trace));
}
