//! Integration tests for the session ledger using in-memory SurrealDB.

use chrono::{Duration, Utc};
use uuid::Uuid;
use vigil_core::error::VigilError;
use vigil_core::models::session::{CreateSessionRecord, SessionAction};
use vigil_core::repository::SessionRepository;
use vigil_db::repository::SurrealSessionRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> SurrealSessionRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    SurrealSessionRepository::new(db)
}

fn login_record(principal_id: Uuid, ttl_secs: i64) -> CreateSessionRecord {
    CreateSessionRecord {
        principal_id,
        tenant_id: Uuid::new_v4(),
        token: "token".into(),
        fingerprint: "fingerprint".into(),
        action: SessionAction::Login,
        expires_at: Utc::now() + Duration::seconds(ttl_secs),
    }
}

#[tokio::test]
async fn create_and_fetch_latest_login() {
    let repo = setup().await;
    let principal_id = Uuid::new_v4();

    let created = repo.create(login_record(principal_id, 3600)).await.unwrap();
    assert_eq!(created.action, SessionAction::Login);
    assert_eq!(created.principal_id, principal_id);

    let latest = repo.latest_login(principal_id).await.unwrap();
    assert_eq!(latest.id, created.id);
}

#[tokio::test]
async fn no_login_record_is_not_found() {
    let repo = setup().await;

    let result = repo.latest_login(Uuid::new_v4()).await;
    assert!(matches!(result, Err(VigilError::NotFound { .. })));
}

#[tokio::test]
async fn current_login_excludes_expired_records() {
    let repo = setup().await;
    let principal_id = Uuid::new_v4();

    // Already expired at creation time.
    repo.create(login_record(principal_id, -60)).await.unwrap();

    // Still visible to latest_login (used to displace or close a
    // session), but not to the liveness check.
    assert!(repo.latest_login(principal_id).await.is_ok());
    let current = repo.current_login(principal_id).await;
    assert!(matches!(current, Err(VigilError::NotFound { .. })));
}

#[tokio::test]
async fn relabel_removes_record_from_login_lookups() {
    let repo = setup().await;
    let principal_id = Uuid::new_v4();

    let created = repo.create(login_record(principal_id, 3600)).await.unwrap();

    let relabeled = repo
        .relabel(created.id, SessionAction::LogoutByNewLogin)
        .await
        .unwrap();
    assert_eq!(relabeled.action, SessionAction::LogoutByNewLogin);

    // Neither lookup sees a non-Login record.
    assert!(matches!(
        repo.latest_login(principal_id).await,
        Err(VigilError::NotFound { .. })
    ));
    assert!(matches!(
        repo.current_login(principal_id).await,
        Err(VigilError::NotFound { .. })
    ));
}

#[tokio::test]
async fn latest_login_picks_most_recent() {
    let repo = setup().await;
    let principal_id = Uuid::new_v4();

    let first = repo.create(login_record(principal_id, 3600)).await.unwrap();
    // Separate creation instants so ordering is deterministic.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = repo.create(login_record(principal_id, 3600)).await.unwrap();

    let latest = repo.latest_login(principal_id).await.unwrap();
    assert_eq!(latest.id, second.id);
    assert_ne!(latest.id, first.id);
}

#[tokio::test]
async fn unauthorized_label_round_trips_through_storage() {
    let repo = setup().await;
    let principal_id = Uuid::new_v4();

    let created = repo
        .create(CreateSessionRecord {
            principal_id,
            tenant_id: Uuid::new_v4(),
            token: String::new(),
            fingerprint: String::new(),
            action: SessionAction::Unauthorized("Blocked".into()),
            expires_at: Utc::now(),
        })
        .await
        .unwrap();

    assert_eq!(created.action, SessionAction::Unauthorized("Blocked".into()));
}

#[tokio::test]
async fn cleanup_removes_only_expired_logins() {
    let repo = setup().await;
    let active_principal = Uuid::new_v4();
    let stale_principal = Uuid::new_v4();

    repo.create(login_record(active_principal, 3600)).await.unwrap();
    repo.create(login_record(stale_principal, -60)).await.unwrap();

    // A closed session is historical, not live; cleanup leaves it alone.
    let closed = repo.create(login_record(Uuid::new_v4(), -60)).await.unwrap();
    repo.relabel(closed.id, SessionAction::Logout).await.unwrap();

    let removed = repo.cleanup_expired().await.unwrap();
    assert_eq!(removed, 1);

    assert!(repo.latest_login(active_principal).await.is_ok());
    assert!(matches!(
        repo.latest_login(stale_principal).await,
        Err(VigilError::NotFound { .. })
    ));
}
