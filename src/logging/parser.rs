//! Reads log files back into records.
//!
//! A record starts at any line beginning with a registered `code [`; every
//! other line continues the previous record.

use chrono::{Local, NaiveDateTime, TimeZone};

use super::{levels::Registry, LevelDescriptor, LogEvent, TITLE_WIDTH};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub level: LevelDescriptor,
    pub timestamp: Option<NaiveDateTime>,
    pub title: String,
    pub message: String,
}

impl ParsedRecord {
    /// Rebuilds the event for re-rendering. Records whose timestamp didn't
    /// parse (or is ambiguous locally) are skipped.
    pub fn to_event(&self) -> Option<LogEvent> {
        let timestamp = Local.from_local_datetime(&self.timestamp?).earliest()?;

        Some(LogEvent {
            level: self.level,
            title: self.title.clone(),
            message: self.message.clone(),
            timestamp,
            suppress_remote: true,
        })
    }
}

struct Pending {
    record: ParsedRecord,
    indent: String,
}

pub fn parse_records(text: &str, registry: &Registry, datetime_format: &str) -> Vec<ParsedRecord> {
    let codes = registry.codes();
    let mut records = Vec::new();
    let mut pending: Option<Pending> = None;

    for line in text.lines() {
        if let Some(next) = parse_header(line, &codes, registry, datetime_format) {
            records.extend(pending.take().map(|p| p.record));
            pending = Some(next);
            continue;
        }

        // Lines before the first header have no record to belong to.
        let Some(current) = pending.as_mut() else {
            continue;
        };

        let continuation = line
            .strip_prefix(current.indent.as_str())
            .unwrap_or_else(|| line.trim_start());
        current.record.message.push('\n');
        current.record.message.push_str(continuation);
    }

    records.extend(pending.map(|p| p.record));
    records
}

fn parse_header(
    line: &str,
    codes: &[&str],
    registry: &Registry,
    datetime_format: &str,
) -> Option<Pending> {
    let code = codes
        .iter()
        .find(|code| line.starts_with(&format!("{} [", code)))?;
    let level = registry.by_code(code)?;

    let rest = &line[code.len() + 2..];
    let (time, rest) = rest.split_once("][")?;
    let (title, message) = split_title(rest)?;

    let header_width = code.chars().count() + 2 + time.chars().count() + 2 + title.chars().count() + 1;

    Some(Pending {
        record: ParsedRecord {
            level,
            timestamp: NaiveDateTime::parse_from_str(time, datetime_format).ok(),
            title: title.trim().to_string(),
            message: message.to_string(),
        },
        indent: " ".repeat(header_width + 1),
    })
}

/// Splits `title] message`. Titles up to [`TITLE_WIDTH`] are padded to
/// exactly that width, so their closing bracket sits at a fixed column even
/// when the title itself contains `"] "`.
fn split_title(rest: &str) -> Option<(&str, &str)> {
    if let Some((end, _)) = rest.char_indices().nth(TITLE_WIDTH) {
        let (title, tail) = rest.split_at(end);
        if let Some(message) = tail.strip_prefix("] ") {
            return Some((title, message));
        }
        if tail == "]" {
            return Some((title, ""));
        }
    }

    rest.split_once("] ").or_else(|| {
        // A record with an empty message may have lost its trailing space.
        rest.strip_suffix(']').map(|title| (title, ""))
    })
}
