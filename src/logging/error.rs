use std::{io, path::PathBuf};

/// Failure of the authoritative file sink. Surfaced to the caller of the log
/// statement that hit it.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed writing log file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("log file {} was closed by shutdown", .0.display())]
    Closed(PathBuf),

    #[error("failed starting the remote worker")]
    Worker(#[source] io::Error),

    #[error("failed scanning log directory {}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("{} is the active log file, skipping archival", .0.display())]
    ActiveFileProtected(PathBuf),

    #[error("failed relocating {} to remote storage", .path.display())]
    Relocation {
        path: PathBuf,
        #[source]
        source: RemoteDeliveryError,
    },

    #[error("failed archiving {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Anything that went wrong talking to a remote channel. Only archival ever
/// sees this; reports swallow it inside the worker.
#[derive(Debug, thiserror::Error)]
pub enum RemoteDeliveryError {
    #[error("http request failed")]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error("failed building http request")]
    Request(#[from] http::Error),

    #[error("remote channel answered with status {0}")]
    Status(http::StatusCode),

    #[error("invalid channel `{0}`")]
    InvalidChannel(String),

    #[error("tls setup failed")]
    Tls(#[from] rustls::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("remote sink is shut down")]
    Closed,

    #[error("remote channel panicked")]
    ChannelPanicked,
}
