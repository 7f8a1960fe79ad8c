use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::Local;

use super::{
    error::{ArchiveError, LogError},
    formatters::DefaultFormatter,
    levels::{self, Registry},
    remote::{RemoteChannel, RemoteSink, Routes},
    sinks::{ConsoleSink, FileSink, LogFileHandle, LogSelector, NullSink},
    LogEvent, LogFormatter, LogSink, Rendered,
};
use crate::utils::RECORD_TIME_FORMAT;

#[derive(Debug, Clone)]
pub struct Config {
    pub datetime_format: String,
    pub use_ansi: bool,
    /// Whether a call without an explicit `report` goes to the remote sink.
    pub report_by_default: bool,
}

impl Config {
    pub fn new() -> Self {
        Self {
            datetime_format: RECORD_TIME_FORMAT.to_string(),
            use_ansi: true,
            report_by_default: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Fans every call out to the file, the console and the remote channel.
pub struct Logger {
    registry: Arc<Registry>,
    formatter: Box<dyn LogFormatter>,
    file: FileSink,
    console: Box<dyn LogSink>,
    remote: RemoteSink,
    report_by_default: AtomicBool,
}

impl Logger {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Logs under an arbitrary level id; unknown ids log as unspecified.
    pub fn emit(
        &self,
        level: &str,
        title: &str,
        message: &str,
        report: Option<bool>,
    ) -> Result<(), LogError> {
        let event = self.event(level, title, message, report);
        let rendered = self.formatter.render(&event);

        let written = self.file.append(&rendered.file);
        self.fan_out(&event, &rendered);

        written
    }

    pub fn info(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::INFO.id, title, message, report)
    }

    pub fn ok(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::OK.id, title, message, report)
    }

    pub fn notice(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::NOTICE.id, title, message, report)
    }

    pub fn warning(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::WARNING.id, title, message, report)
    }

    pub fn error(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::ERROR.id, title, message, report)
    }

    pub fn critical(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::CRITICAL.id, title, message, report)
    }

    /// Level-less entry.
    pub fn log(&self, title: &str, message: &str, report: Option<bool>) -> Result<(), LogError> {
        self.emit(levels::UNSPECIFIED.id, title, message, report)
    }

    /// Starts a new log file whose first record is the rotation
    /// confirmation, then returns the new handle.
    pub fn new_session(&self) -> Result<LogFileHandle, LogError> {
        let event = self.event(levels::OK.id, "Logger", "New logs file created.", None);
        let rendered = self.formatter.render(&event);

        let handle = self.file.rotate_with(&rendered.file)?;
        self.fan_out(&event, &rendered);

        Ok(handle)
    }

    pub fn retrieve_log_file(&self, selector: LogSelector) -> Result<Vec<PathBuf>, LogError> {
        self.file.retrieve(selector)
    }

    pub fn current_file(&self) -> PathBuf {
        self.file.current().path
    }

    pub fn log_dir(&self) -> &Path {
        self.file.dir()
    }

    /// Moves an inactive log file to the remote general channel.
    pub async fn archive(&self, path: &Path) -> Result<(), ArchiveError> {
        self.file.archive(path, &self.remote).await
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn remote(&self) -> &RemoteSink {
        &self.remote
    }

    pub fn report_by_default(&self) -> bool {
        self.report_by_default.load(Ordering::Relaxed)
    }

    pub fn set_report_by_default(&self, report: bool) {
        self.report_by_default.store(report, Ordering::Relaxed);
    }

    pub fn flush(&self) {
        self.console.flush();
    }

    /// Waits for queued remote reports and releases the active file. Records
    /// logged afterwards fail with [`LogError::Closed`].
    pub fn shutdown(&self) {
        self.remote.shutdown();
        self.file.close();
        self.console.flush();
    }

    pub fn is_shut_down(&self) -> bool {
        self.file.is_closed()
    }

    fn event(&self, level: &str, title: &str, message: &str, report: Option<bool>) -> LogEvent {
        let report = report.unwrap_or_else(|| self.report_by_default());

        LogEvent {
            level: self.registry.describe(level),
            title: title.to_string(),
            message: message.to_string(),
            timestamp: Local::now(),
            suppress_remote: !report,
        }
    }

    fn fan_out(&self, event: &LogEvent, rendered: &Rendered) {
        // Never fails; the console is best effort.
        let _ = self.console.write_log(&rendered.console);

        if !event.suppress_remote {
            self.remote.report(event);
        }
    }
}

pub struct Builder {
    log_dir: PathBuf,
    initial_file: Option<PathBuf>,
    registry: Registry,
    console: Box<dyn LogSink>,
    formatter_builder: Box<dyn Fn(Config) -> Box<dyn LogFormatter + 'static>>,
    remote: Option<(Arc<dyn RemoteChannel>, Routes)>,
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            initial_file: None,
            registry: Registry::standard(),
            console: Box::new(ConsoleSink::new()),
            formatter_builder: Box::new(|config| Box::new(DefaultFormatter::new(config))),
            remote: None,
            config: Config::new(),
        }
    }

    pub fn with_log_dir(self, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..self
        }
    }

    /// File to keep appending to instead of starting a new session file.
    pub fn with_initial_file(self, initial_file: Option<PathBuf>) -> Self {
        Self {
            initial_file,
            ..self
        }
    }

    pub fn with_registry(self, registry: Registry) -> Self {
        Self { registry, ..self }
    }

    pub fn with_console_sink(self) -> Self {
        self.with_console(Box::new(ConsoleSink::new()))
    }

    pub fn with_null_console(self) -> Self {
        self.with_console(Box::new(NullSink::new()))
    }

    pub fn with_console(self, console: Box<dyn LogSink>) -> Self {
        Self { console, ..self }
    }

    pub fn with_remote(self, channel: Arc<dyn RemoteChannel>, routes: Routes) -> Self {
        Self {
            remote: Some((channel, routes)),
            ..self
        }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    pub fn with_ansi(mut self, use_ansi: bool) -> Self {
        self.config.use_ansi = use_ansi;
        self
    }

    pub fn with_report_by_default(mut self, report: bool) -> Self {
        self.config.report_by_default = report;
        self
    }

    pub fn report_by_default(&self) -> bool {
        self.config.report_by_default
    }

    pub fn build(self) -> Result<Logger, LogError> {
        let file = FileSink::open(self.log_dir, self.initial_file)?;

        let remote = match self.remote {
            Some((channel, routes)) => {
                RemoteSink::spawn(channel, routes).map_err(LogError::Worker)?
            }
            None => RemoteSink::disabled(),
        };

        Ok(Logger {
            registry: Arc::new(self.registry),
            formatter: (self.formatter_builder)(self.config.clone()),
            file,
            console: self.console,
            remote,
            report_by_default: AtomicBool::new(self.config.report_by_default),
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
