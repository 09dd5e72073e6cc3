use core::fmt;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Where formatted log lines go.
pub type Sink = fn(fmt::Arguments<'_>);

/// `log` backend writing `[LEVEL] target: message` lines to a [`Sink`].
pub struct QemuLogger {
    max_level: LevelFilter,
    sink: Sink,
}

impl QemuLogger {
    /// Logger writing to the QEMU UART.
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self::with_sink(max_level, crate::qemu_fmt::qemu_write)
    }

    /// Logger writing to `sink`.
    #[must_use]
    pub const fn with_sink(max_level: LevelFilter, sink: Sink) -> Self {
        Self { max_level, sink }
    }

    /// Install this logger as the global `log` backend. Call once during
    /// early init.
    ///
    /// # Errors
    /// If a logger is already installed.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        (self.sink)(format_args!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}
