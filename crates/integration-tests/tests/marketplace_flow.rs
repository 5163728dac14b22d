//! Marketplace lifecycle against the SQLite adapters.

mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use domains::errors::DomainError;
use domains::models::{OfferStatus, TaskStatus, UserRole};
use domains::ports::{OfferRepository, TaskRepository};

#[tokio::test]
async fn test_task_offer_accept_complete_review() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let client = app.user("Claire Dubois", UserRole::Client, "Lyon", now).await;
    let alice = app.user("Alice Bernard", UserRole::Provider, "Lyon", now).await;
    let bruno = app.user("Bruno Petit", UserRole::Provider, "Lyon", now).await;
    let task = app.task(&client, "Poser une étagère murale", false, now).await;

    let winning = app
        .marketplace
        .submit_offer(task.id, alice.id, 100, "Dispo samedi".into(), now)
        .await
        .unwrap();
    let losing = app
        .marketplace
        .submit_offer(task.id, bruno.id, 90, "Dispo lundi".into(), now)
        .await
        .unwrap();
    assert_eq!(app.marketplace.credit_balance(alice.id).await.unwrap(), 9);

    let assigned = app.marketplace.accept_offer(client.id, winning.id, now).await.unwrap();
    assert_eq!(assigned.status, TaskStatus::Assigned);
    assert_eq!(assigned.assigned_provider_id, Some(alice.id));

    let offers = app.db.offers().list_for_task(task.id).await.unwrap();
    let status_of = |id| offers.iter().find(|o| o.id == id).map(|o| o.status);
    assert_eq!(status_of(winning.id), Some(OfferStatus::Accepted));
    assert_eq!(status_of(losing.id), Some(OfferStatus::Rejected));

    app.marketplace.complete_task(client.id, task.id, now).await.unwrap();
    app.marketplace
        .leave_review(task.id, client.id, 5, "Impeccable".into(), now)
        .await
        .unwrap();
    let again = app
        .marketplace
        .leave_review(task.id, client.id, 4, "Encore".into(), now)
        .await
        .unwrap_err();
    assert!(matches!(again, DomainError::Conflict(_)));

    let summary = app.marketplace.rating_summary(alice.id).await.unwrap();
    assert_eq!(summary.count, 1);
    assert!((summary.average - 5.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_cancelling_refunds_pending_offers() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let client = app.user("Paul Moreau", UserRole::Client, "Paris", now).await;
    let provider = app.user("Sophie Laurent", UserRole::Provider, "Paris", now).await;
    let task = app.task(&client, "Repeindre une chambre", false, now).await;

    app.marketplace
        .submit_offer(task.id, provider.id, 400, "Devis gratuit".into(), now)
        .await
        .unwrap();
    assert_eq!(app.marketplace.credit_balance(provider.id).await.unwrap(), 9);

    let cancelled = app.marketplace.cancel_task(client.id, task.id, now).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(app.marketplace.credit_balance(provider.id).await.unwrap(), 10);

    let err = app
        .marketplace
        .submit_offer(task.id, provider.id, 300, "Autre".into(), now)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_second_offer_from_same_provider_conflicts() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let client = app.user("Jeanne Roux", UserRole::Client, "Marseille", now).await;
    let provider = app.user("Marc Lefebvre", UserRole::Provider, "Marseille", now).await;
    let task = app.task(&client, "Monter une armoire", false, now).await;

    app.marketplace
        .submit_offer(task.id, provider.id, 60, "Ok".into(), now)
        .await
        .unwrap();
    let err = app
        .marketplace
        .submit_offer(task.id, provider.id, 55, "Moins cher".into(), now)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn test_cleanup_deletes_only_old_generated_tasks() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let client = app.user("Lina Garnier", UserRole::Client, "Paris", now).await;
    let old = now - Duration::days(30);

    let generated_old = app.task(&client, "Tâche de démonstration", true, old).await;
    let real_old = app.task(&client, "Vraie demande ancienne", false, old).await;
    let generated_recent = app.task(&client, "Démonstration récente", true, now).await;

    let dry = app.marketplace.cleanup_generated(14, true, now).await.unwrap();
    assert_eq!((dry.matched, dry.deleted), (1, 0));
    assert!(app.db.tasks().get(generated_old.id).await.unwrap().is_some());

    let report = app.marketplace.cleanup_generated(14, false, now).await.unwrap();
    assert_eq!((report.matched, report.deleted), (1, 1));

    let tasks = app.db.tasks();
    assert!(tasks.get(generated_old.id).await.unwrap().is_none());
    assert!(tasks.get(real_old.id).await.unwrap().is_some());
    assert!(tasks.get(generated_recent.id).await.unwrap().is_some());

    // even a zero-day threshold never touches real tasks
    app.marketplace.cleanup_generated(0, false, now + Duration::days(1)).await.unwrap();
    assert!(tasks.get(real_old.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_booking_needs_assignment_and_future_start() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let client = app.user("Hugo Fontaine", UserRole::Client, "Lyon", now).await;
    let provider = app.user("Emma Chevalier", UserRole::Provider, "Lyon", now).await;
    let task = app.task(&client, "Déboucher un évier", false, now).await;

    let early = app
        .marketplace
        .request_booking(client.id, task.id, now + Duration::days(1), now)
        .await
        .unwrap_err();
    assert!(matches!(early, DomainError::Validation(_)));

    let offer = app
        .marketplace
        .submit_offer(task.id, provider.id, 80, "Demain".into(), now)
        .await
        .unwrap();
    app.marketplace.accept_offer(client.id, offer.id, now).await.unwrap();

    let past = app
        .marketplace
        .request_booking(client.id, task.id, now - Duration::hours(1), now)
        .await
        .unwrap_err();
    assert!(matches!(past, DomainError::Validation(_)));

    let booking = app
        .marketplace
        .request_booking(client.id, task.id, now + Duration::hours(20), now)
        .await
        .unwrap();
    let stranger = app
        .marketplace
        .confirm_booking(client.id, booking.id)
        .await
        .unwrap_err();
    assert!(matches!(stranger, DomainError::Forbidden(_)));
    app.marketplace.confirm_booking(provider.id, booking.id).await.unwrap();
}

#[tokio::test]
async fn test_stats_count_roles_and_statuses() {
    let app = TestApp::new().await;
    let now = Utc::now();
    let client = app.user("Nina Blanc", UserRole::Client, "Paris", now).await;
    app.user("Théo Girard", UserRole::Provider, "Paris", now).await;
    app.task(&client, "Installer un luminaire", false, now).await;

    let stats = app.marketplace.stats().await.unwrap();
    assert_eq!(stats.clients, 1);
    assert_eq!(stats.providers, 1);
    assert_eq!(stats.open_tasks, 1);
    assert_eq!(stats.completed_tasks, 0);
}
