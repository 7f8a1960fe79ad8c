//! Bridge for records coming from third-party logging frameworks.
//!
//! External severities are plain integers on the classic 10/20/30/40/50
//! scale. Everything that comes through here is written locally only; it is
//! never reported to the remote channel.

use std::sync::{Arc, Weak};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use super::{error::LogError, logger::Logger};

pub const DEBUG: i32 = 10;
pub const INFO: i32 = 20;
pub const WARNING: i32 = 30;
pub const ERROR: i32 = 40;
pub const CRITICAL: i32 = 50;

/// `log::Level::Trace` has no slot on the external scale.
pub const TRACE: i32 = 5;

enum Destination {
    /// A specific logger, for as long as something else keeps it alive.
    Logger(Weak<Logger>),
    /// Whatever [`super::configure`] installed at the time of the record.
    Global,
}

/// Records arriving while there is no live logger are dropped.
pub struct LogsHandler {
    destination: Destination,
    filter: LevelFilter,
}

impl LogsHandler {
    pub fn new(logger: &Arc<Logger>) -> Self {
        Self {
            destination: Destination::Logger(Arc::downgrade(logger)),
            filter: LevelFilter::Trace,
        }
    }

    /// Follows the process-wide logger across `configure` and `shutdown`.
    pub fn global() -> Self {
        Self {
            destination: Destination::Global,
            filter: LevelFilter::Trace,
        }
    }

    pub fn with_filter(self, filter: LevelFilter) -> Self {
        Self { filter, ..self }
    }

    /// Hook for external records. `source` becomes the entry title.
    pub fn emit(&self, level: i32, source: &str, text: &str) -> Result<(), LogError> {
        let Some(logger) = self.logger() else {
            return Ok(());
        };
        let report = Some(false);

        match level {
            DEBUG => logger.log(source, text, report),
            INFO => logger.info(source, text, report),
            WARNING => logger.warning(source, text, report),
            ERROR => logger.error(source, text, report),
            CRITICAL => logger.critical(source, text, report),
            _ => logger.log(source, text, report),
        }
    }

    fn logger(&self) -> Option<Arc<Logger>> {
        let logger = match &self.destination {
            Destination::Logger(logger) => logger.upgrade(),
            Destination::Global => super::global(),
        };

        logger.filter(|logger| !logger.is_shut_down())
    }
}

pub fn external_level(level: log::Level) -> i32 {
    match level {
        log::Level::Error => ERROR,
        log::Level::Warn => WARNING,
        log::Level::Info => INFO,
        log::Level::Debug => DEBUG,
        log::Level::Trace => TRACE,
    }
}

impl Log for LogsHandler {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let text = record.args().to_string();
        if let Err(err) = self.emit(external_level(record.level()), record.target(), &text) {
            tracing::warn!(target: "relaylog", "failed writing external record: {}", err);
        }
    }

    fn flush(&self) {
        if let Some(logger) = self.logger() {
            logger.flush()
        }
    }
}

/// Routes every `log` record in the process through the process-wide logger.
pub fn install(filter: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(LogsHandler::global().with_filter(filter)))?;
    log::set_max_level(filter);

    Ok(())
}
