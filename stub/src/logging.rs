//! Structured logging glue: a `log::Log` implementation that writes through
//! a pluggable [`Sink`] instead of a hard-wired output device, so the same
//! dispatcher drives a bare-metal debug port in production and a `Vec` in
//! tests. The `d` command toggles between the quiet and verbose filters.

use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, Ordering};
use lazy_static::lazy_static;
use log::{LevelFilter, Metadata, Record};
use spin::Mutex;

/// Receives fully formatted log lines. Implementations must not block
/// indefinitely or re-enter the logger.
pub trait Sink: Sync {
    fn write_line(&self, line: &str);
}

lazy_static! {
    static ref SINK: Mutex<Option<&'static dyn Sink>> = Mutex::new(None);
}

static VERBOSE: AtomicBool = AtomicBool::new(false);

const LINE_CAPACITY: usize = 256;

struct LineBuf {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl LineBuf {
    fn new() -> Self {
        Self {
            buf: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("<non-utf8 log line>")
    }
}

impl core::fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let n = bytes.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        Ok(())
    }
}

struct EngineLogger;

impl log::Log for EngineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // No `log::Level` variant means "off": until `d` is toggled on,
        // every level is suppressed rather than capped at `Debug`.
        VERBOSE.load(Ordering::Relaxed) && metadata.level() <= log::Level::Trace
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(sink) = *SINK.lock() else {
            return;
        };
        let mut line = LineBuf::new();
        let _ = write!(line, "{} - {}", record.level(), record.args());
        sink.write_line(line.as_str());
    }

    fn flush(&self) {}
}

static LOGGER: EngineLogger = EngineLogger;

/// Installs `sink` as the destination for all log output and registers the
/// dispatcher with the `log` facade. Safe to call more than once only in
/// the sense that later calls replace the sink; `log::set_logger` itself
/// may only succeed the first time per process, matching the facade's own
/// contract.
pub fn init(sink: &'static dyn Sink) {
    *SINK.lock() = Some(sink);
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(current_filter());
}

fn current_filter() -> LevelFilter {
    if VERBOSE.load(Ordering::Relaxed) {
        LevelFilter::Trace
    } else {
        LevelFilter::Off
    }
}

pub(crate) fn toggle_verbose() {
    VERBOSE.fetch_xor(true, Ordering::Relaxed);
    log::set_max_level(current_filter());
}
