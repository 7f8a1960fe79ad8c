use std::{
    fmt::Display,
    future::Future,
    io,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
};

use chrono::{DateTime, Local};
use futures_util::FutureExt;
use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    task::{JoinError, JoinSet},
};

use super::{error::RemoteDeliveryError, levels::SeverityClass, LogEvent};

/// Opaque identifier of a remote destination. For webhooks this is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static severity routing: warnings and worse go to `alert`, the rest to
/// `general`. Archived files are always uploaded to `general`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    pub general: ChannelId,
    pub alert: ChannelId,
}

impl Routes {
    pub fn new(general: ChannelId, alert: ChannelId) -> Self {
        Self { general, alert }
    }

    pub fn single(channel: ChannelId) -> Self {
        Self {
            general: channel.clone(),
            alert: channel,
        }
    }

    pub fn route(&self, severity: SeverityClass) -> &ChannelId {
        if severity.is_alert() {
            &self.alert
        } else {
            &self.general
        }
    }
}

/// Body of a remote report.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    pub description: String,
    pub color: u32,
    pub timestamp: DateTime<Local>,
}

pub type ChannelFuture = Pin<Box<dyn Future<Output = Result<(), RemoteDeliveryError>> + Send>>;

/// Capability surface of an external reporting destination.
///
/// Both methods are called on the worker in submission order; the returned
/// futures are then driven concurrently, so they must own whatever they need.
pub trait RemoteChannel: Send + Sync + 'static {
    fn send(
        &self,
        channel: &ChannelId,
        title: Option<&str>,
        body: &FormattedMessage,
    ) -> ChannelFuture;

    fn upload(&self, channel: &ChannelId, path: &Path) -> ChannelFuture;
}

/// Accepts everything and delivers nothing.
#[derive(Debug, Default, Clone)]
pub struct NullChannel;

impl RemoteChannel for NullChannel {
    fn send(&self, _: &ChannelId, _: Option<&str>, _: &FormattedMessage) -> ChannelFuture {
        Box::pin(async { Ok(()) })
    }

    fn upload(&self, _: &ChannelId, _: &Path) -> ChannelFuture {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub channel: ChannelId,
    pub title: Option<String>,
    pub body: FormattedMessage,
}

impl Report {
    pub fn compose(event: &LogEvent, routes: &Routes) -> Self {
        let title = if event.title.trim().is_empty() {
            None
        } else {
            Some(format!("### {} {}", event.level.marker, event.title))
        };

        Self {
            channel: routes.route(event.level.severity).clone(),
            title,
            body: FormattedMessage {
                description: event.message.clone(),
                color: event.level.alert_color,
                timestamp: event.timestamp,
            },
        }
    }
}

enum Job {
    Report(Report),
    Upload {
        channel: ChannelId,
        path: PathBuf,
        reply: oneshot::Sender<Result<(), RemoteDeliveryError>>,
    },
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Fire-and-forget forwarding of events to a [`RemoteChannel`].
///
/// Jobs go through an unbounded queue to a dedicated worker thread running
/// its own current-thread runtime, so callers never wait on the network.
pub struct RemoteSink {
    routes: Option<Routes>,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl RemoteSink {
    pub fn spawn(channel: Arc<dyn RemoteChannel>, routes: Routes) -> io::Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker = thread::Builder::new().name("relaylog-remote".to_string()).spawn({
            let counters = counters.clone();
            move || runtime.block_on(run_worker(channel, receiver, counters))
        })?;

        Ok(Self {
            routes: Some(routes),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    /// A sink with no destination. Reports are dropped, uploads fail.
    pub fn disabled() -> Self {
        Self {
            routes: None,
            sender: Mutex::new(None),
            worker: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn routes(&self) -> Option<&Routes> {
        self.routes.as_ref()
    }

    /// Queues `event` for delivery and returns immediately.
    pub fn report(&self, event: &LogEvent) {
        let (Some(routes), Some(sender)) = (self.routes.as_ref(), self.sender()) else {
            tracing::trace!(target: "relaylog", "remote reporting disabled, dropping report");
            return;
        };

        let report = Report::compose(event, routes);
        if sender.send(Job::Report(report)).is_err() {
            tracing::debug!(target: "relaylog", "remote worker gone, dropping report");
            return;
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Uploads `path` to the general channel and waits for the outcome.
    pub async fn upload(&self, path: &Path) -> Result<(), RemoteDeliveryError> {
        let (Some(routes), Some(sender)) = (self.routes.as_ref(), self.sender()) else {
            return Err(RemoteDeliveryError::Closed);
        };

        let (reply, response) = oneshot::channel();
        sender
            .send(Job::Upload {
                channel: routes.general.clone(),
                path: path.to_path_buf(),
                reply,
            })
            .map_err(|_| RemoteDeliveryError::Closed)?;

        response.await.map_err(|_| RemoteDeliveryError::Closed)?
    }

    pub fn submitted(&self) -> u64 {
        self.counters.submitted.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Stops accepting work and waits for queued and in-flight deliveries.
    pub fn shutdown(&self) {
        drop(lock(&self.sender).take());

        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!(target: "relaylog", "remote worker panicked");
            }
        }
    }

    fn sender(&self) -> Option<UnboundedSender<Job>> {
        lock(&self.sender).clone()
    }
}

impl Drop for RemoteSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_worker(
    channel: Arc<dyn RemoteChannel>,
    mut receiver: UnboundedReceiver<Job>,
    counters: Arc<Counters>,
) {
    tracing::debug!(target: "relaylog", "remote worker started");
    let mut deliveries = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        match job {
            Job::Report(report) => {
                let delivery = guard(|| {
                    channel.send(&report.channel, report.title.as_deref(), &report.body)
                });
                let counters = counters.clone();

                deliveries.spawn(async move {
                    match delivery.await {
                        Ok(()) => {
                            counters.delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            counters.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                target: "relaylog",
                                "dropping report for channel {}: {}",
                                report.channel,
                                err
                            );
                        }
                    }
                });
            }
            Job::Upload {
                channel: id,
                path,
                reply,
            } => {
                let delivery = guard(|| channel.upload(&id, &path));

                deliveries.spawn(async move {
                    // The archiving caller may have gone away.
                    let _ = reply.send(delivery.await);
                });
            }
        }

        while let Some(result) = deliveries.try_join_next() {
            reap(result, &counters);
        }
    }

    while let Some(result) = deliveries.join_next().await {
        reap(result, &counters);
    }
    tracing::debug!(target: "relaylog", "remote worker stopped");
}

/// Turns a panicking channel call into a failed delivery so the worker
/// keeps serving later jobs.
fn guard(call: impl FnOnce() -> ChannelFuture) -> ChannelFuture {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(delivery) => Box::pin(async move {
            AssertUnwindSafe(delivery)
                .catch_unwind()
                .await
                .unwrap_or(Err(RemoteDeliveryError::ChannelPanicked))
        }),
        Err(_) => Box::pin(async { Err(RemoteDeliveryError::ChannelPanicked) }),
    }
}

fn reap(result: Result<(), JoinError>, counters: &Counters) {
    if let Err(err) = result {
        counters.failed.fetch_add(1, Ordering::Relaxed);
        tracing::error!(target: "relaylog", "remote delivery task failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::logging::levels;

    fn routes() -> Routes {
        Routes::new(ChannelId::new("general"), ChannelId::new("alerts"))
    }

    fn event(level: levels::LevelDescriptor, title: &str) -> LogEvent {
        LogEvent {
            level,
            title: title.to_string(),
            message: "body".to_string(),
            timestamp: Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            suppress_remote: false,
        }
    }

    #[test]
    fn routing_by_severity_class() {
        let routes = routes();

        for level in [levels::WARNING, levels::ERROR, levels::CRITICAL] {
            assert_eq!(routes.route(level.severity).as_str(), "alerts");
        }
        for level in [levels::INFO, levels::OK, levels::NOTICE, levels::UNSPECIFIED] {
            assert_eq!(routes.route(level.severity).as_str(), "general");
        }
    }

    #[test]
    fn compose_report() {
        let report = Report::compose(&event(levels::ERROR, "Payments"), &routes());

        assert_eq!(report.channel.as_str(), "alerts");
        assert_eq!(report.title.as_deref(), Some("### ❌ Payments"));
        assert_eq!(report.body.description, "body");
        assert_eq!(report.body.color, levels::ERROR.alert_color);
    }

    #[test]
    fn blank_title_is_omitted() {
        let report = Report::compose(&event(levels::INFO, "  "), &routes());
        assert_eq!(report.title, None);
    }

    #[test]
    fn disabled_sink_drops_reports() {
        let sink = RemoteSink::disabled();
        sink.report(&event(levels::INFO, "x"));

        assert_eq!(sink.submitted(), 0);
        assert!(sink.routes().is_none());
    }

    #[tokio::test]
    async fn disabled_sink_refuses_uploads() {
        let sink = RemoteSink::disabled();
        let result = sink.upload(Path::new("whatever.log")).await;

        assert!(matches!(result, Err(RemoteDeliveryError::Closed)));
    }

    #[test]
    fn shutdown_is_idempotent_and_drops_late_reports() {
        let sink = RemoteSink::spawn(Arc::new(NullChannel), routes()).unwrap();
        sink.report(&event(levels::INFO, "x"));
        sink.shutdown();
        sink.shutdown();
        sink.report(&event(levels::INFO, "y"));

        assert_eq!(sink.submitted(), 1);
        assert_eq!(sink.delivered(), 1);
    }
}
