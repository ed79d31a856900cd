#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use tv_intervals::db::repositories::LocalRepository;
use tv_intervals::db::repository::ProgramRepository;
use tv_intervals::models::TimeOfDay;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Parse an `HH:MM[:SS]` literal.
pub fn time(s: &str) -> TimeOfDay {
    s.parse()
        .unwrap_or_else(|e| panic!("bad time literal {s}: {e}"))
}

/// Insert programs through the repository so interval rows follow.
pub async fn insert_all<R: ProgramRepository + ?Sized>(repo: &R, programs: &[(&str, &str, &str)]) {
    for (name, start, end) in programs {
        repo.insert_program(Some(*name), Some(time(start)), Some(time(end)))
            .await
            .unwrap();
    }
}

/// Programs that pass every check.
pub const CLEAN_PROGRAMS: &[(&str, &str, &str)] = &[
    ("Morning News", "06:00", "07:00"),
    ("Weather Report", "07:00", "07:15"),
    ("Late Movie", "23:00", "01:00"),
];

pub const SUSPICIOUS_NAME: &str = "'; DROP TABLE programs; --";

/// Name of the program stored with a count of 4 instead of 6.
pub const WRONG_CALC_PROGRAM: &str = "Wrong Calc Show";

/// Seed the clean programs plus one instance of every defect the validator
/// knows about:
///
/// | check                  | defect                                   | kind    |
/// |------------------------|------------------------------------------|---------|
/// | referential integrity  | orphaned "Deleted Show" interval         | error   |
/// | referential integrity  | "Unindexed Program" without interval     | error   |
/// | time constraints       | "Overlap Show A" / "Overlap Show B"      | error   |
/// | interval calculations  | "Wrong Calc Show" stored 4, computed 6   | error   |
/// | data quality           | "Evening News" twice                     | error   |
/// | data quality           | 300-character name                       | error   |
/// | data quality           | "Zero Duration Show"                     | warning |
/// | business rules         | SQL-looking name                         | warning |
/// | business rules         | "Odd Timing Show" at 11:07               | warning |
pub async fn seed_known_issues(repo: &LocalRepository) {
    insert_all(repo, CLEAN_PROGRAMS).await;
    insert_all(
        repo,
        &[
            ("Overlap Show A", "09:00", "10:30"),
            ("Overlap Show B", "10:00", "11:00"),
            ("Evening News", "18:00", "19:00"),
            ("Evening News", "19:00", "20:00"),
            (WRONG_CALC_PROGRAM, "14:00", "15:30"),
            ("Zero Duration Show", "16:00", "16:00"),
            (SUSPICIOUS_NAME, "21:00", "21:30"),
            ("Odd Timing Show", "11:07", "11:52"),
        ],
    )
    .await;

    let long_name = "L".repeat(300);
    insert_all(repo, &[(long_name.as_str(), "12:00", "12:30")]).await;

    repo.put_interval_row("Deleted Show", 4);
    repo.put_interval_row(WRONG_CALC_PROGRAM, 4);
    repo.insert_program_row(
        Some("Unindexed Program"),
        Some(time("13:00")),
        Some(time("14:00")),
    );
}
