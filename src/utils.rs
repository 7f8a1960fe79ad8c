use std::{
    path::Path,
    time::{Duration, SystemTime},
};

use chrono::{DateTime, Local};

/// Timestamp inside each record.
pub const RECORD_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Session file names. No colons so the names are valid on every platform.
pub const SESSION_FILE_FORMAT: &str = "%d-%m-%Y %H-%M-%S";

pub fn session_stamp(time: DateTime<Local>) -> String {
    time.format(SESSION_FILE_FORMAT).to_string()
}

/// Whether `path` was last modified more than `age` ago. Unreadable metadata
/// counts as not old enough.
pub fn older_than(path: &Path, age: Duration) -> bool {
    let Ok(modified) = path.metadata().and_then(|m| m.modified()) else {
        return false;
    };

    SystemTime::now()
        .duration_since(modified)
        .map(|elapsed| elapsed > age)
        .unwrap_or(false)
}

/// Human friendly durations such as `7d` or `12h 30m`, for clap.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}
