//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    vigil_db::run_migrations(&db).await.unwrap();

    // Verify that key tables exist by querying INFO FOR DB.
    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("tenant"), "missing tenant table");
    assert!(info_str.contains("role"), "missing role table");
    assert!(info_str.contains("principal"), "missing principal table");
    assert!(info_str.contains("service"), "missing service table");
    assert!(info_str.contains("policy"), "missing policy table");
    assert!(info_str.contains("session"), "missing session table");
    assert!(info_str.contains("audit"), "missing audit table");

    // Verify the assignment edge table.
    assert!(info_str.contains("assigned"), "missing assigned edge");

    // Verify migration was recorded.
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    // Run twice — should not fail.
    vigil_db::run_migrations(&db).await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();

    // Verify only one migration record exists.
    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn can_create_record_after_migration() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    vigil_db::run_migrations(&db).await.unwrap();

    db.query("CREATE tenant SET name = 'ACME Corp'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let mut result = db
        .query("SELECT * FROM tenant WHERE name = 'ACME Corp'")
        .await
        .unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn unique_index_prevents_duplicate_emails() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    vigil_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE principal SET \
         tenant_id = 'a', role_id = 'b', \
         name = 'Alice', email = 'alice@example.com', \
         password_hash = 'x'",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    // Attempt duplicate email — should fail.
    let result = db
        .query(
            "CREATE principal SET \
             tenant_id = 'a', role_id = 'b', \
             name = 'Alice Again', email = 'alice@example.com', \
             password_hash = 'x'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate email should be rejected");
}
