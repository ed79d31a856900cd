//! Row-level predicates behind the integrity checks.
//!
//! The Postgres repository expresses these same predicates in SQL; the local
//! repository evaluates them here. Both must agree, so the heuristics are kept
//! verbatim even where they are coarse (see the overlap exclusion).

use super::intervals::{is_overnight, wrapped_duration};
use crate::models::TimeOfDay;

/// Program names longer than this are a data-quality error.
pub const MAX_NAME_LENGTH: usize = 255;

/// Longest duration a daily schedule can hold.
pub const MAX_DURATION_MINUTES: f64 = 1440.0;

/// Case-insensitive substrings that mark a program name for review.
pub const SUSPICIOUS_NAME_PATTERNS: [&str; 8] = [
    "drop", "delete", "insert", "update", "select", "--", ";", "script",
];

/// Minutes past the hour accepted as standard broadcast slot boundaries.
pub const QUARTER_HOUR_MINUTES: [u32; 4] = [0, 15, 30, 45];

/// Linear overlap test between two schedules.
///
/// Pairs where either program wraps past midnight are never reported: linear
/// comparison is meaningless for them. Adjacent programs (one ends exactly when
/// the other starts) do not overlap.
pub fn overlaps(a: (TimeOfDay, TimeOfDay), b: (TimeOfDay, TimeOfDay)) -> bool {
    let (start1, end1) = a;
    let (start2, end2) = b;
    if is_overnight(start1, end1) || is_overnight(start2, end2) {
        return false;
    }
    start1 < end2 && end1 > start2
}

/// `start > end` for a program that does not look like an overnight show.
///
/// A program starting after noon and ending before noon is taken to cross
/// midnight legitimately.
pub fn is_negative_duration(start: TimeOfDay, end: TimeOfDay) -> bool {
    start > end && !(start > TimeOfDay::NOON && end < TimeOfDay::NOON)
}

pub fn is_zero_duration(start: TimeOfDay, end: TimeOfDay) -> bool {
    start == end
}

pub fn exceeds_max_duration(start: TimeOfDay, end: TimeOfDay) -> bool {
    wrapped_duration(start, end).value() > MAX_DURATION_MINUTES
}

pub fn is_quarter_hour_aligned(time: TimeOfDay) -> bool {
    QUARTER_HOUR_MINUTES.contains(&time.minute())
}

/// Null, empty or whitespace-only names.
pub fn is_blank_name(name: Option<&str>) -> bool {
    name.map_or(true, |n| n.trim().is_empty())
}

/// Name length in characters, as Postgres `LENGTH` counts it.
pub fn name_length(name: &str) -> usize {
    name.chars().count()
}

pub fn is_long_name(name: &str) -> bool {
    name_length(name) > MAX_NAME_LENGTH
}

/// First denylisted pattern contained in `name`, if any.
pub fn suspicious_pattern(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    SUSPICIOUS_NAME_PATTERNS
        .iter()
        .copied()
        .find(|pattern| lowered.contains(pattern))
}
