//! # TV Intervals
//!
//! Data-integrity validation for TV program schedules.
//!
//! A schedule is stored as `programs` rows (name, start and end time of day)
//! plus a derived `program_intervals` row per program holding the number of
//! quarter-hour slots it occupies. This crate checks that dataset for
//! structural defects and suspicious patterns and renders the findings.
//!
//! ## Architecture
//!
//! - [`models`]: Time-of-day type, program rows and per-check finding records
//! - [`db`]: Repository traits, the Postgres and in-memory backends, factory
//!   and configuration
//! - [`services`]: Interval arithmetic, row predicates, the integrity
//!   validator and its text report
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tv_intervals::db::LocalRepository;
//! use tv_intervals::services::{format_validation_report, IntegrityValidator};
//!
//! let repo = Arc::new(LocalRepository::new());
//! let run = IntegrityValidator::new(repo).run_comprehensive_validation().await?;
//! println!("{}", format_validation_report(&run));
//! ```

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod db;
pub mod models;
pub mod services;
