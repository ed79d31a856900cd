//! Program schedule rows and the finding records produced by integrity checks.

use serde::{Deserialize, Serialize};

use super::time::TimeOfDay;
use crate::define_id_type;

define_id_type!(i64, ProgramId);

/// A row of the `programs` table.
///
/// Every column except `id` is nullable in storage so that malformed rows can
/// be read back and reported instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub program_name: Option<String>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
}

impl Program {
    /// Start and end, when both are present.
    pub fn times(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        Some((self.start_time?, self.end_time?))
    }

    /// The name/start/end triple used in most findings.
    pub fn to_times(&self) -> ProgramTimes {
        ProgramTimes {
            program_name: self.program_name.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// A row of the `program_intervals` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInterval {
    pub program_name: String,
    pub interval_count: i32,
}

/// Name and schedule of a program as reported in a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramTimes {
    pub program_name: Option<String>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
}

impl ProgramTimes {
    /// Display name, with `<null>` standing in for a missing name.
    pub fn display_name(&self) -> &str {
        self.program_name.as_deref().unwrap_or("<null>")
    }
}

/// Two programs whose schedules intersect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingPair {
    pub program1: Option<String>,
    pub program2: Option<String>,
    pub start1: TimeOfDay,
    pub end1: TimeOfDay,
    pub start2: TimeOfDay,
    pub end2: TimeOfDay,
}

/// Stored interval count that disagrees with the recomputed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalMismatch {
    pub program_name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub stored_count: i32,
    pub calculated_count: i32,
}

/// A program name shared by more than one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateName {
    pub program_name: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongName {
    pub program_name: String,
    pub name_length: i32,
}

/// A program whose duration, with overnight wraparound, exceeds a full day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessiveDuration {
    pub program_name: Option<String>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration: qtty::Minutes,
}
