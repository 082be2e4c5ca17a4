//! Integration tests for the hash-chained audit ledger using in-memory
//! SurrealDB.
//!
//! The datastore computes `current_hash` inside the append transaction;
//! these tests confirm the result matches the Rust-side verifier and
//! that the chain survives concurrent appends.

use uuid::Uuid;
use vigil_core::error::VigilError;
use vigil_core::models::audit::{AuditEvent, chain_hash, verify_chain};
use vigil_core::repository::{AuditRepository, Pagination};
use vigil_db::repository::SurrealAuditRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> (
    Surreal<surrealdb::engine::local::Db>,
    SurrealAuditRepository<surrealdb::engine::local::Db>,
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    let repo = SurrealAuditRepository::new(db.clone());
    (db, repo)
}

fn event(action: &str, detail: &str) -> AuditEvent {
    AuditEvent {
        action: action.into(),
        entity: "Principal".into(),
        entity_id: Uuid::new_v4().to_string(),
        actor_id: Uuid::new_v4(),
        detail: detail.into(),
        ip: "10.0.0.1".into(),
    }
}

#[tokio::test]
async fn first_record_has_empty_previous_hash() {
    let (_db, repo) = setup().await;

    let record = repo.append(event("Login", "")).await.unwrap();
    assert_eq!(record.previous_hash, "");
    assert_eq!(record.current_hash, record.compute_hash());
}

#[tokio::test]
async fn datastore_hash_matches_rust_hash() {
    let (_db, repo) = setup().await;

    let record = repo.append(event("Login", "some detail")).await.unwrap();

    let expected = chain_hash(
        &record.action,
        &record.entity,
        &record.entity_id,
        record.actor_id,
        &record.detail,
        &record.ip,
        &record.previous_hash,
    );
    assert_eq!(record.current_hash, expected);
}

#[tokio::test]
async fn sequential_appends_chain() {
    let (_db, repo) = setup().await;

    let first = repo.append(event("Login", "a")).await.unwrap();
    let second = repo.append(event("Logout", "b")).await.unwrap();
    let third = repo.append(event("Login", "c")).await.unwrap();

    assert_eq!(second.previous_hash, first.current_hash);
    assert_eq!(third.previous_hash, second.current_hash);

    let head = repo.head().await.unwrap().unwrap();
    assert_eq!(head.id, third.id);
}

#[tokio::test]
async fn empty_ledger_has_no_head() {
    let (_db, repo) = setup().await;
    assert!(repo.head().await.unwrap().is_none());
}

#[tokio::test]
async fn list_returns_creation_order() {
    let (_db, repo) = setup().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let record = repo.append(event("Login", &format!("entry {i}"))).await.unwrap();
        ids.push(record.id);
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 10,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 5);
    let listed: Vec<Uuid> = page.items.iter().map(|r| r.id).collect();
    assert_eq!(listed, ids);

    let verification = verify_chain(&page.items);
    assert!(verification.intact);
    assert_eq!(verification.records_checked, 5);
}

#[tokio::test]
async fn tampered_record_breaks_verification() {
    let (db, repo) = setup().await;

    for i in 0..4 {
        repo.append(event("Login", &format!("entry {i}"))).await.unwrap();
    }

    // Mutate the third record behind the repository's back.
    let page = repo.list(Pagination::default()).await.unwrap();
    let victim = page.items[2].id;
    db.query(format!("UPDATE audit:`{victim}` SET detail = 'tampered'"))
        .await
        .unwrap()
        .check()
        .unwrap();

    let page = repo.list(Pagination::default()).await.unwrap();
    let verification = verify_chain(&page.items);
    assert!(!verification.intact);
    assert_eq!(verification.first_broken, Some(2));
}

#[tokio::test]
async fn rewritten_hash_still_breaks_linkage() {
    let (db, repo) = setup().await;

    for i in 0..3 {
        repo.append(event("Login", &format!("entry {i}"))).await.unwrap();
    }

    // An attacker who recomputes the record's own hash still breaks the
    // link to its successor.
    let page = repo.list(Pagination::default()).await.unwrap();
    let victim = &page.items[1];
    let forged = chain_hash(
        &victim.action,
        &victim.entity,
        &victim.entity_id,
        victim.actor_id,
        "tampered",
        &victim.ip,
        &victim.previous_hash,
    );
    db.query(format!(
        "UPDATE audit:`{}` SET detail = 'tampered', current_hash = '{forged}'",
        victim.id
    ))
    .await
    .unwrap()
    .check()
    .unwrap();

    let page = repo.list(Pagination::default()).await.unwrap();
    let verification = verify_chain(&page.items);
    assert!(!verification.intact);
    assert_eq!(verification.first_broken, Some(2));
}

#[tokio::test]
async fn concurrent_appends_do_not_fork_the_chain() {
    let (_db, repo) = setup().await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.append(event("Login", &format!("concurrent {i}"))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 20,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 10);

    let verification = verify_chain(&page.items);
    assert!(verification.intact, "{:?}", verification.error);
    assert_eq!(verification.records_checked, 10);
}

#[tokio::test]
async fn statement_failure_surfaces_as_query_error() {
    let (db, repo) = setup().await;

    // Break the table contract so the append statement itself fails.
    db.query("DEFINE FIELD OVERWRITE detail ON audit TYPE int;")
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = repo.append(event("Login", "free text")).await.unwrap_err();
    match err {
        VigilError::Database(msg) => assert!(msg.contains("Query failed"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}
