//! Service layer for integrity validation and schedule arithmetic.
//!
//! Services sit on top of the repository traits: they issue queries through an
//! injected repository and turn rows into findings and reports.

pub mod integrity;
pub mod integrity_report;
pub mod intervals;
pub mod program_input;
pub mod rules;

pub use integrity::{
    BusinessRulesResult, CheckOutcome, ComprehensiveValidation, DataQualityResult,
    IntegrityCheck, IntegrityValidator, IntervalCalculationResult, ReferentialIntegrityResult,
    TimeConstraintResult, ValidationSummary,
};
pub use integrity_report::format_validation_report;
pub use intervals::count_15min_intervals;
pub use program_input::validate_program_input;
