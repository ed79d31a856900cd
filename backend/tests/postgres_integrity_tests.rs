//! Live checks against a Postgres database.
//!
//! Runs only with the `postgres-repo` feature and a `DATABASE_URL` pointing at
//! a disposable database: the test clears both tables.

#![cfg(feature = "postgres-repo")]

mod support;

use std::sync::Arc;

use tv_intervals::db::repository::{IntegrityRepository, ProgramRepository};
use tv_intervals::db::{PostgresConfig, RepositoryFactory};
use tv_intervals::services::{count_15min_intervals, IntegrityValidator};

fn live_config() -> Option<PostgresConfig> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let mut config = PostgresConfig::with_url(url);
    config.run_migrations = true;
    config.max_pool_size = 2;
    Some(config)
}

// One test drives the whole sequence so parallel tests never share the tables.
#[tokio::test]
async fn trigger_and_checks_agree_with_local_semantics() {
    let Some(config) = live_config() else {
        eprintln!("DATABASE_URL not set; skipping live Postgres test");
        return;
    };

    let repo = RepositoryFactory::create_postgres(&config).await.unwrap();
    assert!(repo.health_check().await.unwrap());
    repo.clear_programs().await.unwrap();

    support::insert_all(
        repo.as_ref(),
        &[
            ("Hour Show", "09:00", "10:00"),
            ("Short Show", "09:10", "09:20"),
            ("Late Movie", "23:00", "01:00"),
            ("Placeholder", "12:00", "12:00"),
        ],
    )
    .await;

    for (name, start, end) in [
        ("Hour Show", "09:00", "10:00"),
        ("Short Show", "09:10", "09:20"),
        ("Late Movie", "23:00", "01:00"),
        ("Placeholder", "12:00", "12:00"),
    ] {
        let rows = repo.get_program_interval(name).await.unwrap();
        assert_eq!(rows.len(), 1, "{name} has one interval row");
        assert_eq!(
            rows[0].interval_count,
            count_15min_intervals(support::time(start), support::time(end)),
            "{name} count matches the in-process calculation"
        );
    }

    // Hour Show and Short Show overlap.
    let overlaps = repo.fetch_overlapping_programs().await.unwrap();
    assert_eq!(overlaps.len(), 1);
    assert!(repo.fetch_interval_mismatches().await.unwrap().is_empty());
    assert_eq!(repo.fetch_zero_duration_programs().await.unwrap().len(), 1);

    repo.rename_program("Short Show", "Shorter Show").await.unwrap();
    assert!(repo.get_program_interval("Short Show").await.unwrap().is_empty());
    repo.update_program_times(
        "Shorter Show",
        support::time("10:00"),
        support::time("10:30"),
    )
    .await
    .unwrap();
    assert!(repo.fetch_overlapping_programs().await.unwrap().is_empty());

    repo.insert_program(
        Some(support::SUSPICIOUS_NAME),
        Some(support::time("21:00")),
        Some(support::time("21:30")),
    )
    .await
    .unwrap();
    assert_eq!(
        repo.fetch_suspicious_names().await.unwrap(),
        vec![support::SUSPICIOUS_NAME.to_string()]
    );

    let run = IntegrityValidator::new(Arc::clone(&repo))
        .run_comprehensive_validation()
        .await
        .unwrap();
    assert!(run.overall_valid);
    assert_eq!(run.summary.total_errors, 0);
    // Zero duration plus suspicious name.
    assert_eq!(run.summary.total_warnings, 2);

    repo.delete_program("Placeholder").await.unwrap();
    assert!(repo.get_program_interval("Placeholder").await.unwrap().is_empty());

    repo.clear_programs().await.unwrap();
    assert!(repo.list_programs().await.unwrap().is_empty());
    assert!(repo.list_program_intervals().await.unwrap().is_empty());
}
