//! Full demo seed with real Argon2 hashing, then cleanup.

mod common;

use auth_adapters::Argon2PasswordHasher;
use chrono::{Duration, Utc};
use common::TestApp;
use domains::models::{TaskStatus, UserRole};
use domains::ports::{PasswordHasher, TaskRepository, UserRepository};
use services::demo::SeedOptions;

fn small() -> SeedOptions {
    SeedOptions {
        clients: 2,
        providers: 3,
        tasks: 6,
        offers_per_task: 2,
        ..SeedOptions::default()
    }
}

#[tokio::test]
async fn test_seed_builds_a_usable_marketplace() {
    let app = TestApp::new().await;
    let now = Utc::now();

    let report = app.seeder().seed(&small(), now).await.unwrap();

    assert_eq!(report.services, 12);
    assert_eq!(report.districts, 37);
    assert_eq!((report.clients, report.providers), (2, 3));
    assert_eq!(report.tasks, 6);
    assert_eq!(report.offers, 12);
    assert_eq!(report.completed_flows, 1);

    let stats = app.marketplace.stats().await.unwrap();
    assert_eq!(stats.completed_tasks, 1);
    assert_eq!(stats.open_tasks, 6);

    let providers = app.db.users().list_by_role(UserRole::Provider).await.unwrap();
    assert!(providers.iter().all(|p| p.is_generated));
    let hasher = Argon2PasswordHasher::new();
    assert!(hasher.verify("demo-password", &providers[0].password_hash));

    let reviewed = providers.iter().find(|p| p.email == "demo-provider-1@prochepro.test").unwrap();
    let summary = app.marketplace.rating_summary(reviewed.id).await.unwrap();
    assert_eq!(summary.count, 1);
}

#[tokio::test]
async fn test_reseeding_reuses_accounts_and_catalog() {
    let app = TestApp::new().await;
    let now = Utc::now();
    app.seeder().seed(&small(), now).await.unwrap();
    let report = app.seeder().seed(&small(), now).await.unwrap();

    assert_eq!(report.clients, 2);
    let stats = app.marketplace.stats().await.unwrap();
    assert_eq!(stats.clients, 2);
    assert_eq!(stats.providers, 3);
}

#[tokio::test]
async fn test_generated_demo_tasks_are_cleaned_up() {
    let app = TestApp::new().await;
    let now = Utc::now();
    app.seeder().seed(&small(), now).await.unwrap();

    let report = app
        .marketplace
        .cleanup_generated(0, false, now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(report.matched as u64, report.deleted);
    assert_eq!(report.deleted, 7);
    assert_eq!(app.db.tasks().count_by_status(TaskStatus::Open).await.unwrap(), 0);
}
