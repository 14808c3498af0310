use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};

use crate::error::SchedulerError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parses clock text to minutes since midnight.
///
/// Accepted forms: 24-hour "HH:MM", 12-hour "H:MM AM/PM", and ISO-8601
/// datetimes (with or without an offset), in which case only the time of day
/// is kept.
pub fn parse_clock(text: &str) -> Result<u32, SchedulerError> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.hour() * 60 + dt.minute());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.hour() * 60 + dt.minute());
    }

    let upper = trimmed.to_uppercase();
    for format in ["%I:%M %p", "%I:%M%p"] {
        if let Ok(t) = NaiveTime::parse_from_str(&upper, format) {
            return Ok(t.hour() * 60 + t.minute());
        }
    }

    for format in ["%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(trimmed, format) {
            return Ok(t.hour() * 60 + t.minute());
        }
    }

    Err(SchedulerError::InvalidTimeFormat(text.to_string()))
}

/// Half-open interval overlap: touching endpoints do not overlap.
pub fn overlaps(start1: u32, end1: u32, start2: u32, end2: u32) -> bool {
    start1 < end2 && start2 < end1
}

/// Length of a window in minutes; `end < start` means the window wraps past
/// midnight into the next day.
pub fn window_length(start: u32, end: u32) -> u32 {
    if end >= start {
        end - start
    } else {
        MINUTES_PER_DAY - start + end
    }
}

/// Whether [candidate_start, candidate_end] lies inside an availability
/// window, including windows that wrap past midnight.
pub fn fits_in_window(
    candidate_start: u32,
    candidate_end: u32,
    window_start: u32,
    window_end: u32,
) -> bool {
    if window_start <= window_end {
        candidate_start >= window_start && candidate_end <= window_end
    } else {
        candidate_start >= window_start || candidate_end <= window_end
    }
}

/// Renders minutes since midnight (mod one day) as 12-hour clock text,
/// e.g. `0 -> "12:00 AM"`, `780 -> "1:00 PM"`.
pub fn minutes_to_clock12(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let (hour, min) = (minutes / 60, minutes % 60);
    let period = if hour < 12 { "AM" } else { "PM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12}:{min:02} {period}")
}
