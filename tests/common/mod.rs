#![allow(dead_code)]

use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use http::StatusCode;
use relaylog::logging::{
    remote::{ChannelFuture, FormattedMessage},
    Builder, ChannelId, LogSink, Logger, RemoteChannel, RemoteDeliveryError, Routes,
};
use tempfile::TempDir;
use tokio::sync::Semaphore;

pub const GENERAL: &str = "general";
pub const ALERT: &str = "alert";

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Send {
        channel: String,
        title: Option<String>,
        body: FormattedMessage,
    },
    Upload {
        channel: String,
        path: PathBuf,
    },
}

/// Records every call in the order the worker makes it.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingChannel {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl RemoteChannel for RecordingChannel {
    fn send(&self, channel: &ChannelId, title: Option<&str>, body: &FormattedMessage) -> ChannelFuture {
        self.deliveries.lock().unwrap().push(Delivery::Send {
            channel: channel.to_string(),
            title: title.map(str::to_string),
            body: body.clone(),
        });
        Box::pin(async { Ok(()) })
    }

    fn upload(&self, channel: &ChannelId, path: &Path) -> ChannelFuture {
        let exists = path.is_file();
        self.deliveries.lock().unwrap().push(Delivery::Upload {
            channel: channel.to_string(),
            path: path.to_path_buf(),
        });
        Box::pin(async move {
            if exists {
                Ok(())
            } else {
                Err(RemoteDeliveryError::Io(io::Error::from(io::ErrorKind::NotFound)))
            }
        })
    }
}

/// Rejects everything like a webhook answering 500.
#[derive(Clone, Default)]
pub struct FailingChannel;

impl RemoteChannel for FailingChannel {
    fn send(&self, _: &ChannelId, _: Option<&str>, _: &FormattedMessage) -> ChannelFuture {
        Box::pin(async { Err(RemoteDeliveryError::Status(StatusCode::INTERNAL_SERVER_ERROR)) })
    }

    fn upload(&self, _: &ChannelId, _: &Path) -> ChannelFuture {
        Box::pin(async { Err(RemoteDeliveryError::Status(StatusCode::INTERNAL_SERVER_ERROR)) })
    }
}

/// Blows up on messages saying `panic now` (while handing out the delivery)
/// or `panic later` (while delivering). Everything else is recorded.
#[derive(Clone, Default)]
pub struct PanickingChannel {
    pub inner: RecordingChannel,
}

impl RemoteChannel for PanickingChannel {
    fn send(&self, channel: &ChannelId, title: Option<&str>, body: &FormattedMessage) -> ChannelFuture {
        match body.description.as_str() {
            "panic now" => panic!("channel exploded"),
            "panic later" => Box::pin(async {
                if true {
                    panic!("delivery exploded");
                }
                Ok(())
            }),
            _ => self.inner.send(channel, title, body),
        }
    }

    fn upload(&self, channel: &ChannelId, path: &Path) -> ChannelFuture {
        self.inner.upload(channel, path)
    }
}

/// Deliveries hang until the test hands out permits.
#[derive(Clone)]
pub struct GatedChannel {
    pub gate: Arc<Semaphore>,
}

impl GatedChannel {
    pub fn closed() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
        }
    }
}

impl RemoteChannel for GatedChannel {
    fn send(&self, _: &ChannelId, _: Option<&str>, _: &FormattedMessage) -> ChannelFuture {
        let gate = self.gate.clone();
        Box::pin(async move {
            let permit = gate.acquire_owned().await.map_err(|_| RemoteDeliveryError::Closed)?;
            permit.forget();
            Ok(())
        })
    }

    fn upload(&self, channel: &ChannelId, _: &Path) -> ChannelFuture {
        self.send(channel, None, &FormattedMessage {
            description: String::new(),
            color: 0,
            timestamp: chrono::Local::now(),
        })
    }
}

#[derive(Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for CaptureSink {
    fn write_log(&self, text: &str) -> io::Result<()> {
        self.lines.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn flush(&self) {}
}

pub fn routes() -> Routes {
    Routes::new(ChannelId::new(GENERAL), ChannelId::new(ALERT))
}

pub fn builder(dir: &TempDir, console: &CaptureSink) -> Builder {
    Logger::builder()
        .with_log_dir(dir.path())
        .with_ansi(false)
        .with_console(Box::new(console.clone()))
}

pub fn logger_with(dir: &TempDir, channel: impl RemoteChannel) -> (Logger, CaptureSink) {
    let console = CaptureSink::default();
    let logger = builder(dir, &console)
        .with_remote(Arc::new(channel), routes())
        .build()
        .unwrap();

    (logger, console)
}
