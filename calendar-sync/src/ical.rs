//! Minimal iCalendar (RFC 5545) reader for availability feeds.
//!
//! Booking platforms export blocked stays as VEVENTs with all-day or
//! date-time DTSTART/DTEND values. Only those two properties and SUMMARY
//! are read; recurrence, timezones, alarms and attendees are ignored.

use chrono::NaiveDate;
use icalendar::parser::unfold;
use shared::BlockEvent;

use crate::error::ParseError;

const CALENDAR_MARKER: &str = "BEGIN:VCALENDAR";
const DEFAULT_SUMMARY: &str = "Blocked";

/// Parse raw feed text into the blocked stays it describes.
///
/// Returns `ParseError::NotACalendar` only when the text is not a calendar
/// at all. Events with a missing or unreadable date, or with an end before
/// their start, are skipped.
pub fn parse_feed(raw: &str) -> Result<Vec<BlockEvent>, ParseError> {
    if !contains_ignore_ascii_case(raw, CALENDAR_MARKER) {
        return Err(ParseError::NotACalendar);
    }

    let unfolded = unfold(raw);
    let mut events = Vec::new();
    let mut block: Option<Vec<&str>> = None;

    for line in unfolded.lines() {
        let marker = line.trim();
        if marker.eq_ignore_ascii_case("BEGIN:VEVENT") {
            // A block missing its END runs up to the next BEGIN
            if let Some(open) = block.replace(Vec::new()) {
                events.extend(parse_event(&open));
            }
        } else if marker.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(open) = block.take() {
                events.extend(parse_event(&open));
            }
        } else if let Some(open) = block.as_mut() {
            open.push(line);
        }
    }

    if let Some(open) = block {
        events.extend(parse_event(&open));
    }

    Ok(events)
}

fn parse_event(lines: &[&str]) -> Option<BlockEvent> {
    let mut start = None;
    let mut end = None;
    let mut summary = None;

    for line in lines {
        let name = property_name(line);
        if name.eq_ignore_ascii_case("DTSTART") {
            start = parse_date_value(line);
        } else if name.eq_ignore_ascii_case("DTEND") {
            end = parse_date_value(line);
        } else if name.eq_ignore_ascii_case("SUMMARY") {
            summary = line.split_once(':').map(|(_, text)| unescape_text(text));
        }
    }

    let (start, end) = (start?, end?);
    if start > end {
        return None;
    }

    let summary = summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

    Some(BlockEvent {
        start,
        end,
        summary,
    })
}

/// The property name is everything before the first parameter or value separator.
fn property_name(line: &str) -> &str {
    let end = line.find(|c: char| c == ';' || c == ':').unwrap_or(line.len());
    line[..end].trim()
}

/// Read the calendar date from a DTSTART/DTEND line.
///
/// The value follows the last colon because parameters such as
/// `TZID=America/New_York` may contain colons of their own. Accepts
/// `YYYYMMDD` and `YYYYMMDDTHHMMSS` with any trailing `Z` or offset; the
/// time of day is discarded.
fn parse_date_value(line: &str) -> Option<NaiveDate> {
    let value = line.rsplit_once(':')?.1.trim();
    let bytes = value.as_bytes();

    if bytes.len() < 8 || !bytes[..8].iter().all(u8::is_ascii_digit) {
        return None;
    }

    let is_date = bytes.len() == 8;
    let is_date_time = bytes.len() >= 15
        && (bytes[8] == b'T' || bytes[8] == b't')
        && bytes[9..15].iter().all(u8::is_ascii_digit);
    if !is_date && !is_date_time {
        return None;
    }

    let year = value[..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out.trim().to_string()
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
