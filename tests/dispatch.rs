mod common;

use std::{fs, sync::Arc, time::Instant};

use common::{
    logger_with, CaptureSink, Delivery, FailingChannel, GatedChannel, PanickingChannel,
    RecordingChannel, ALERT, GENERAL,
};
use relaylog::logging::{
    adapter::{self, LogsHandler},
    parser::parse_records,
    ArchiveError, LogSelector, RemoteDeliveryError,
};
use relaylog::utils::RECORD_TIME_FORMAT;
use tempfile::TempDir;

#[test]
fn payments_error_is_written_and_alerted_once() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, console) = logger_with(&dir, channel.clone());

    logger
        .error("Payments", "charge failed\nretrying", None)
        .unwrap();
    logger.shutdown();

    let contents = fs::read_to_string(logger.current_file()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[-] ["));
    assert!(lines[0].contains("][         Payments        ] charge failed"));

    let column = lines[0].find("charge failed").unwrap();
    assert_eq!(lines[1], format!("{}retrying", " ".repeat(column)));

    assert_eq!(console.lines().len(), 1);

    let deliveries = channel.deliveries();
    assert_eq!(deliveries.len(), 1);
    match &deliveries[0] {
        Delivery::Send {
            channel,
            title,
            body,
        } => {
            assert_eq!(channel, ALERT);
            assert_eq!(title.as_deref(), Some("### ❌ Payments"));
            assert_eq!(body.description, "charge failed\nretrying");
            assert_eq!(body.color, 0xEF4A4A);
        }
        other => panic!("unexpected delivery {:?}", other),
    }
}

#[test]
fn routing_follows_severity() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());

    logger.info("T", "info", None).unwrap();
    logger.warning("T", "warning", None).unwrap();
    logger.critical("T", "critical", None).unwrap();
    logger.ok("", "untitled", None).unwrap();
    logger.shutdown();

    let sent: Vec<(String, Option<String>)> = channel
        .deliveries()
        .into_iter()
        .map(|d| match d {
            Delivery::Send { channel, title, .. } => (channel, title),
            Delivery::Upload { channel, .. } => (channel, None),
        })
        .collect();

    assert_eq!(
        sent,
        [
            (GENERAL.to_string(), Some("### ℹ️ T".to_string())),
            (ALERT.to_string(), Some("### ⚠️ T".to_string())),
            (ALERT.to_string(), Some("### 🛑 T".to_string())),
            (GENERAL.to_string(), None),
        ]
    );
}

#[test]
fn report_overrides_the_default() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());

    logger.error("T", "kept local", Some(false)).unwrap();
    logger.set_report_by_default(false);
    logger.error("T", "also local", None).unwrap();
    logger.notice("T", "sent anyway", Some(true)).unwrap();
    logger.shutdown();

    let deliveries = channel.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(matches!(
        &deliveries[0],
        Delivery::Send { body, .. } if body.description == "sent anyway"
    ));

    let contents = fs::read_to_string(logger.current_file()).unwrap();
    assert_eq!(contents.lines().count(), 3);
}

#[test]
fn remote_failures_stay_inside_the_logger() {
    let dir = TempDir::new().unwrap();
    let (logger, console) = logger_with(&dir, FailingChannel);

    for i in 0..5 {
        logger.critical("Outage", &format!("attempt {}", i), None).unwrap();
    }
    logger.shutdown();

    assert_eq!(logger.remote().submitted(), 5);
    assert_eq!(logger.remote().failures(), 5);
    assert_eq!(logger.remote().delivered(), 0);
    assert_eq!(console.lines().len(), 5);

    let contents = fs::read_to_string(logger.current_file()).unwrap();
    assert_eq!(contents.lines().count(), 5);
}

#[test]
fn panicking_channel_does_not_stop_later_reports() {
    let dir = TempDir::new().unwrap();
    let channel = PanickingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());

    logger.error("T", "panic now", None).unwrap();
    logger.error("T", "panic later", None).unwrap();
    logger.error("T", "still delivered", None).unwrap();
    logger.shutdown();

    assert_eq!(logger.remote().submitted(), 3);
    assert_eq!(logger.remote().failures(), 2);
    assert_eq!(logger.remote().delivered(), 1);
    assert!(matches!(
        channel.inner.deliveries().as_slice(),
        [Delivery::Send { body, .. }] if body.description == "still delivered"
    ));
}

#[test]
fn reports_reach_the_channel_in_submission_order() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());

    for i in 0..100 {
        logger.info("Seq", &i.to_string(), None).unwrap();
    }
    logger.shutdown();

    let order: Vec<String> = channel
        .deliveries()
        .into_iter()
        .filter_map(|d| match d {
            Delivery::Send { body, .. } => Some(body.description),
            Delivery::Upload { .. } => None,
        })
        .collect();
    let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();

    assert_eq!(order, expected);
    assert_eq!(logger.remote().delivered(), 100);
}

#[test]
fn slow_channels_do_not_block_callers() {
    let dir = TempDir::new().unwrap();
    let channel = GatedChannel::closed();
    let (logger, _) = logger_with(&dir, channel.clone());

    let started = Instant::now();
    for i in 0..50 {
        logger.error("Slow", &i.to_string(), None).unwrap();
    }

    // Nothing can be delivered yet, every call already returned.
    assert!(started.elapsed().as_secs() < 5);
    assert_eq!(logger.remote().submitted(), 50);
    assert_eq!(logger.remote().delivered(), 0);

    channel.gate.add_permits(50);
    logger.shutdown();

    assert_eq!(logger.remote().delivered(), 50);
}

#[test]
fn new_session_switches_the_active_file() {
    let dir = TempDir::new().unwrap();
    let (logger, _) = logger_with(&dir, RecordingChannel::default());

    let first = logger.current_file();
    let second = logger.new_session().unwrap().path;
    let third = logger.new_session().unwrap().path;

    assert_ne!(first, second);
    assert_ne!(second, third);
    assert_ne!(first, third);
    assert_eq!(logger.retrieve_log_file(LogSelector::Current).unwrap(), [third.clone()]);

    let all = logger.retrieve_log_file(LogSelector::All).unwrap();
    assert!(all.contains(&second));
    assert!(all.contains(&third));

    let contents = fs::read_to_string(&third).unwrap();
    assert!(contents.ends_with("] New logs file created.\n"));
}

#[test]
fn parser_reads_back_what_the_logger_wrote() {
    let dir = TempDir::new().unwrap();
    let (logger, _) = logger_with(&dir, RecordingChannel::default());

    logger.warning("Disk", "90% used\n/var is filling up", Some(false)).unwrap();
    logger.emit("custom", "Job", "done", Some(false)).unwrap();

    let contents = fs::read_to_string(logger.current_file()).unwrap();
    let records = parse_records(&contents, logger.registry(), RECORD_TIME_FORMAT);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Disk");
    assert_eq!(records[0].message, "90% used\n/var is filling up");
    assert_eq!(records[1].level.code, "[?]");
    assert!(records[1].timestamp.is_some());
}

#[test]
fn adapter_writes_locally_and_never_reports() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());
    let logger = Arc::new(logger);
    let handler = LogsHandler::new(&logger);

    handler.emit(adapter::DEBUG, "deps", "debug").unwrap();
    handler.emit(adapter::INFO, "deps", "info").unwrap();
    handler.emit(adapter::WARNING, "deps", "warning").unwrap();
    handler.emit(adapter::ERROR, "deps", "error").unwrap();
    handler.emit(adapter::CRITICAL, "deps", "critical").unwrap();
    handler.emit(35, "deps", "odd level").unwrap();
    handler.emit(adapter::TRACE, "deps", "trace").unwrap();
    logger.shutdown();

    let contents = fs::read_to_string(logger.current_file()).unwrap();
    let codes: Vec<&str> = contents.lines().map(|l| &l[..3]).collect();
    assert_eq!(codes, ["[?]", "[i]", "[!]", "[-]", "[X]", "[?]", "[?]"]);

    assert_eq!(logger.remote().submitted(), 0);
    assert!(channel.deliveries().is_empty());
}

#[tokio::test]
async fn archiving_the_active_file_is_refused() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());
    logger.info("T", "keep me", Some(false)).unwrap();

    let active = logger.current_file();
    let result = logger.archive(&active).await;

    assert!(matches!(result, Err(ArchiveError::ActiveFileProtected(_))));
    assert!(active.is_file());
    assert!(channel.deliveries().is_empty());
}

#[tokio::test]
async fn archiving_uploads_then_deletes() {
    let dir = TempDir::new().unwrap();
    let channel = RecordingChannel::default();
    let (logger, _) = logger_with(&dir, channel.clone());

    let old = logger.current_file();
    logger.info("T", "old session", Some(false)).unwrap();
    logger.new_session().unwrap();

    logger.archive(&old).await.unwrap();

    assert!(!old.exists());
    assert_eq!(
        channel.deliveries(),
        [Delivery::Upload {
            channel: GENERAL.to_string(),
            path: old.clone(),
        }]
    );
    assert!(!logger
        .retrieve_log_file(LogSelector::All)
        .unwrap()
        .contains(&old));
}

#[tokio::test]
async fn failed_upload_keeps_the_file() {
    let dir = TempDir::new().unwrap();
    let (logger, _) = logger_with(&dir, FailingChannel);

    let old = logger.current_file();
    logger.new_session().unwrap();

    let result = logger.archive(&old).await;

    assert!(matches!(
        result,
        Err(ArchiveError::Relocation {
            source: RemoteDeliveryError::Status(_),
            ..
        })
    ));
    assert!(old.is_file());
}

#[tokio::test]
async fn archiving_without_a_remote_fails_closed() {
    let dir = TempDir::new().unwrap();
    let console = CaptureSink::default();
    let logger = common::builder(&dir, &console).build().unwrap();

    let old = logger.current_file();
    logger.new_session().unwrap();

    let result = logger.archive(&old).await;

    assert!(matches!(
        result,
        Err(ArchiveError::Relocation {
            source: RemoteDeliveryError::Closed,
            ..
        })
    ));
    assert!(old.is_file());
}
