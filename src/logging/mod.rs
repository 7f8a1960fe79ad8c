pub mod adapter;
mod error;
mod formatters;
pub mod levels;
mod logger;
pub mod parser;
pub mod remote;
mod sinks;
mod webhook;

use std::{
    io,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Local};

pub use error::{ArchiveError, LogError, RemoteDeliveryError};
pub use formatters::{DefaultFormatter, TITLE_WIDTH};
pub use levels::{LevelDescriptor, Registry, SeverityClass};
pub use logger::{Builder, Config, Logger};
pub use remote::{ChannelId, RemoteChannel, RemoteSink, Routes};
pub use sinks::{
    latest_log_file, scan_log_files, ConsoleSink, FileSink, LogFileHandle, LogSelector, NullSink,
};
pub use webhook::WebhookChannel;

/// One log call, consumed immediately by the formatter and the sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: LevelDescriptor,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Local>,
    pub suppress_remote: bool,
}

/// The two renderings of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub file: String,
    pub console: String,
}

pub trait LogFormatter: Sync + Send {
    fn render(&self, event: &LogEvent) -> Rendered;
}

/// Synchronous best-effort text output (console and friends).
pub trait LogSink: Sync + Send {
    fn write_log(&self, text: &str) -> io::Result<()>;
    fn flush(&self);
}

static GLOBAL: RwLock<Option<Arc<Logger>>> = RwLock::new(None);

/// Builds the process-wide logger on first call. Later calls keep the
/// existing instance and its active file, and only apply the report default
/// from `builder`.
pub fn configure(builder: Builder) -> Result<Arc<Logger>, LogError> {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);

    if let Some(logger) = slot.as_ref() {
        logger.set_report_by_default(builder.report_by_default());
        return Ok(logger.clone());
    }

    let logger = Arc::new(builder.build()?);
    *slot = Some(logger.clone());
    Ok(logger)
}

pub fn global() -> Option<Arc<Logger>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Drains pending remote reports and releases the process-wide logger.
pub fn shutdown() {
    let logger = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();

    if let Some(logger) = logger {
        logger.shutdown();
    }
}
