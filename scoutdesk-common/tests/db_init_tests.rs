//! Database initialization tests against a real file database

use scoutdesk_common::db::init::init_database;
use scoutdesk_common::db::Store;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("scoutdesk.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_reopens_existing_and_keeps_rows() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("scoutdesk.db");

    let pool = init_database(&db_path).await.unwrap();
    Store::new(pool.clone())
        .command(
            "INSERT INTO legacy_names_map (legacy_name, speler_id) VALUES (?, ?)",
            &["J. Doe".into(), "555".into()],
        )
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let table = Store::new(pool)
        .query("SELECT speler_id FROM legacy_names_map WHERE legacy_name = ?", &["J. Doe".into()])
        .await
        .unwrap();

    assert_eq!(table.text(0, "speler_id").as_deref(), Some("555"));
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = tempfile::TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fk.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO shortlists (naam, eigenaar_id, aangemaakt_op) VALUES ('Targets', 999, '2024-01-01T00:00:00.000000Z')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "shortlist with unknown owner must be rejected");
}
