use std::sync::Arc;

use relaylog::logging::{self, Logger};
use tempfile::TempDir;

// The process-wide logger is shared state, so the whole lifecycle lives in
// one test.
#[test]
fn configure_is_idempotent_until_shutdown() {
    let dir = TempDir::new().unwrap();
    let builder = || {
        Logger::builder()
            .with_log_dir(dir.path())
            .with_null_console()
    };

    assert!(logging::global().is_none());

    let first = logging::configure(builder()).unwrap();
    let file = first.current_file();
    first.info("Lifecycle", "configured", Some(false)).unwrap();

    let second = logging::configure(builder().with_report_by_default(false)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.current_file(), file);
    assert!(!first.report_by_default());

    let global = logging::global().unwrap();
    assert!(Arc::ptr_eq(&global, &first));

    logging::shutdown();
    assert!(logging::global().is_none());

    // A fresh configure after shutdown starts over.
    let third = logging::configure(builder()).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert!(third.report_by_default());
    logging::shutdown();
}
