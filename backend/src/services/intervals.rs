//! Fifteen-minute interval arithmetic for program schedules.
//!
//! In production the `program_intervals` table is maintained by the database
//! function `count_15min_intervals`; this module is its in-process
//! counterpart, used by the local repository and by tests.

use crate::models::{TimeOfDay, SECONDS_PER_DAY};

/// Length of one broadcast slot.
pub const SLOT_SECONDS: u32 = 15 * 60;

/// True when the program crosses midnight (`end < start`).
pub fn is_overnight(start: TimeOfDay, end: TimeOfDay) -> bool {
    end < start
}

/// End offset in seconds from the program's start day, shifted by one day for
/// overnight programs.
fn wrapped_end_seconds(start: TimeOfDay, end: TimeOfDay) -> u32 {
    if is_overnight(start, end) {
        end.seconds() + SECONDS_PER_DAY
    } else {
        end.seconds()
    }
}

/// Duration of a program, honoring overnight wraparound.
///
/// `start == end` is a zero-length program, not a full day.
pub fn wrapped_duration(start: TimeOfDay, end: TimeOfDay) -> qtty::Minutes {
    let seconds = wrapped_end_seconds(start, end) - start.seconds();
    qtty::Minutes::new(seconds as f64 / 60.0)
}

/// Number of 15-minute clock slots the program touches.
///
/// Slots are aligned to the quarter hour: a program from 09:10 to 09:20 touches
/// the 09:00 and 09:15 slots and counts 2.
pub fn count_15min_intervals(start: TimeOfDay, end: TimeOfDay) -> i32 {
    if start == end {
        return 0;
    }
    let first_slot = start.seconds() / SLOT_SECONDS;
    let last_slot = wrapped_end_seconds(start, end).div_ceil(SLOT_SECONDS);
    (last_slot - first_slot) as i32
}
