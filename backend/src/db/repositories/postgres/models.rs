use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Text};

use super::schema::program_intervals;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{
    DuplicateName, ExcessiveDuration, IntervalMismatch, LongName, OverlappingPair, Program,
    ProgramId, ProgramInterval, ProgramTimes, TimeOfDay,
};

// Time columns are selected as `::text` so that `24:00:00` survives decoding;
// `chrono::NaiveTime` cannot represent it.

fn parse_time(column: &str, raw: &str) -> RepositoryResult<TimeOfDay> {
    let whole_seconds = raw.split_once('.').map_or(raw, |(whole, _)| whole);
    whole_seconds.parse().map_err(|e| {
        RepositoryError::decode(column, raw, e, ErrorContext::new("decode_row"))
    })
}

fn parse_optional_time(column: &str, raw: Option<&str>) -> RepositoryResult<Option<TimeOfDay>> {
    raw.map(|value| parse_time(column, value)).transpose()
}

#[derive(Debug, Clone, QueryableByName)]
pub struct IdRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct NameRow {
    #[diesel(sql_type = Text)]
    pub program_name: String,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct NullableNameRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub program_name: Option<String>,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct ProgramRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Nullable<Text>)]
    pub program_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub start_time: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub end_time: Option<String>,
}

impl TryFrom<ProgramRow> for Program {
    type Error = RepositoryError;

    fn try_from(row: ProgramRow) -> RepositoryResult<Self> {
        Ok(Program {
            id: ProgramId(row.id),
            start_time: parse_optional_time("start_time", row.start_time.as_deref())?,
            end_time: parse_optional_time("end_time", row.end_time.as_deref())?,
            program_name: row.program_name,
        })
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct ProgramTimesRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub program_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub start_time: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub end_time: Option<String>,
}

impl TryFrom<ProgramTimesRow> for ProgramTimes {
    type Error = RepositoryError;

    fn try_from(row: ProgramTimesRow) -> RepositoryResult<Self> {
        Ok(ProgramTimes {
            start_time: parse_optional_time("start_time", row.start_time.as_deref())?,
            end_time: parse_optional_time("end_time", row.end_time.as_deref())?,
            program_name: row.program_name,
        })
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct OverlapRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub program1: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub program2: Option<String>,
    #[diesel(sql_type = Text)]
    pub start1: String,
    #[diesel(sql_type = Text)]
    pub end1: String,
    #[diesel(sql_type = Text)]
    pub start2: String,
    #[diesel(sql_type = Text)]
    pub end2: String,
}

impl TryFrom<OverlapRow> for OverlappingPair {
    type Error = RepositoryError;

    fn try_from(row: OverlapRow) -> RepositoryResult<Self> {
        Ok(OverlappingPair {
            start1: parse_time("start1", &row.start1)?,
            end1: parse_time("end1", &row.end1)?,
            start2: parse_time("start2", &row.start2)?,
            end2: parse_time("end2", &row.end2)?,
            program1: row.program1,
            program2: row.program2,
        })
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct MismatchRow {
    #[diesel(sql_type = Text)]
    pub program_name: String,
    #[diesel(sql_type = Text)]
    pub start_time: String,
    #[diesel(sql_type = Text)]
    pub end_time: String,
    #[diesel(sql_type = Integer)]
    pub stored_count: i32,
    #[diesel(sql_type = Integer)]
    pub calculated_count: i32,
}

impl TryFrom<MismatchRow> for IntervalMismatch {
    type Error = RepositoryError;

    fn try_from(row: MismatchRow) -> RepositoryResult<Self> {
        Ok(IntervalMismatch {
            start_time: parse_time("start_time", &row.start_time)?,
            end_time: parse_time("end_time", &row.end_time)?,
            program_name: row.program_name,
            stored_count: row.stored_count,
            calculated_count: row.calculated_count,
        })
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct DuplicateRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub program_name: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

impl From<DuplicateRow> for DuplicateName {
    fn from(row: DuplicateRow) -> Self {
        DuplicateName {
            program_name: row.program_name,
            count: row.count,
        }
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct LongNameRow {
    #[diesel(sql_type = Text)]
    pub program_name: String,
    #[diesel(sql_type = Integer)]
    pub name_length: i32,
}

impl From<LongNameRow> for LongName {
    fn from(row: LongNameRow) -> Self {
        LongName {
            program_name: row.program_name,
            name_length: row.name_length,
        }
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct ExcessiveDurationRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub program_name: Option<String>,
    #[diesel(sql_type = Text)]
    pub start_time: String,
    #[diesel(sql_type = Text)]
    pub end_time: String,
    #[diesel(sql_type = Double)]
    pub duration_minutes: f64,
}

impl TryFrom<ExcessiveDurationRow> for ExcessiveDuration {
    type Error = RepositoryError;

    fn try_from(row: ExcessiveDurationRow) -> RepositoryResult<Self> {
        Ok(ExcessiveDuration {
            start_time: parse_time("start_time", &row.start_time)?,
            end_time: parse_time("end_time", &row.end_time)?,
            program_name: row.program_name,
            duration: qtty::Minutes::new(row.duration_minutes),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = program_intervals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgramIntervalRow {
    pub program_name: String,
    pub interval_count: i32,
}

impl From<ProgramIntervalRow> for ProgramInterval {
    fn from(row: ProgramIntervalRow) -> Self {
        ProgramInterval {
            program_name: row.program_name,
            interval_count: row.interval_count,
        }
    }
}

/// Collect rows into models, stopping at the first row that fails to decode.
pub fn decode_rows<R, M>(rows: Vec<R>) -> RepositoryResult<Vec<M>>
where
    M: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(M::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_truncates_fractional_seconds() {
        let t = parse_time("start_time", "10:15:30.250000").unwrap();
        assert_eq!(t.to_string(), "10:15:30");
    }

    #[test]
    fn test_parse_time_accepts_end_of_day() {
        assert_eq!(
            parse_time("end_time", "24:00:00").unwrap(),
            TimeOfDay::END_OF_DAY
        );
    }

    #[test]
    fn test_unreadable_time_is_a_decode_error() {
        let err = parse_time("end_time", "garbage").unwrap_err();
        assert!(err.to_string().contains("end_time"));
        assert!(!err.is_retryable());
        match err {
            RepositoryError::DecodeError { column, value, .. } => {
                assert_eq!(column, "end_time");
                assert_eq!(value, "garbage");
            }
            other => panic!("expected a decode error, got {other:?}"),
        }
    }
}
