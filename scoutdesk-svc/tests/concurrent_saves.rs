//! Concurrent writes against a file-backed database
//!
//! Several pooled connections race to save reports and dossiers. Every save
//! must succeed, and saves on the same natural key must still collapse into
//! one row.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scoutdesk_common::db::{init_database, Store};
use scoutdesk_common::PlayerRef;
use scoutdesk_svc::cache::ReadCache;
use scoutdesk_svc::catalog::Catalog;
use scoutdesk_svc::identity::{AccessLevel, Actor};
use scoutdesk_svc::options::OptionService;
use scoutdesk_svc::services::{DossierPayload, IntelligenceService, ReportPayload, ReportService};
use tempfile::TempDir;

const ROUNDS: usize = 20;

async fn open(path: &Path) -> (Store, ReportService, IntelligenceService) {
    let store = Store::new(init_database(path).await.unwrap());
    for (id, level) in [(4i64, 1i64), (7, 1), (9, 3)] {
        store
            .command(
                "INSERT INTO users (id, naam, email, wachtwoord, toegangsniveau) VALUES (?, ?, ?, '', ?)",
                &[id.into(), format!("User {}", id).into(), format!("u{}@club.nl", id).into(), level.into()],
            )
            .await
            .unwrap();
    }

    let cache = Arc::new(ReadCache::new(Duration::from_secs(30)));
    let reports = ReportService::new(
        store.clone(),
        OptionService::new(store.clone(), cache.clone()),
        Catalog::new(store.clone()),
        cache.clone(),
    );
    let intelligence = IntelligenceService::new(store.clone(), cache);
    (store, reports, intelligence)
}

fn scout(id: i64) -> Actor {
    Actor::new(id, format!("User {}", id), AccessLevel::Scout)
}

fn report(match_id: String, rating: i64) -> ReportPayload {
    ReportPayload {
        player_id: Some("555".into()),
        match_id: Some(match_id),
        rating,
        verdict: "A".into(),
        position_played: "CM".into(),
        ..ReportPayload::default()
    }
}

async fn count(store: &Store, sql: &str) -> i64 {
    store.query(sql, &[]).await.unwrap().int(0, "n").unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_on_same_report_key() {
    let dir = TempDir::new().unwrap();
    let (store, reports, _) = open(&dir.path().join("scout.db")).await;
    let actor = scout(7);

    for round in 0..ROUNDS {
        let match_id = format!("M{}", round);
        let (a, b) = tokio::join!(
            reports.upsert_report(&actor, report(match_id.clone(), 6)),
            reports.upsert_report(&actor, report(match_id.clone(), 7)),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.report.id, b.report.id, "round {}", round);
        assert!(a.created != b.created, "round {}: exactly one save inserts", round);
    }

    assert_eq!(
        count(&store, "SELECT COUNT(*) AS n FROM rapporten").await,
        ROUNDS as i64
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_on_different_keys() {
    let dir = TempDir::new().unwrap();
    let (store, reports, _) = open(&dir.path().join("scout.db")).await;
    let reports = Arc::new(reports);

    let mut handles = Vec::new();
    for round in 0..ROUNDS {
        for scout_id in [4i64, 7] {
            let reports = reports.clone();
            handles.push(tokio::spawn(async move {
                reports
                    .upsert_report(&scout(scout_id), report(format!("M{}", round), 8))
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        count(&store, "SELECT COUNT(*) AS n FROM rapporten").await,
        2 * ROUNDS as i64
    );
    assert_eq!(
        count(&store, "SELECT COUNT(*) AS n FROM rapporten WHERE scout_id = 4").await,
        ROUNDS as i64
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dossier_saves_keep_one_row_per_player() {
    let dir = TempDir::new().unwrap();
    let (store, _, intelligence) = open(&dir.path().join("scout.db")).await;
    let actor = Actor::new(9, "User 9", AccessLevel::Manager);

    for round in 0..ROUNDS {
        let known = PlayerRef::Known(format!("P{}", round));
        let manual = PlayerRef::Custom(format!("Onbekend {}", round));
        let payload = |text: &str| DossierPayload {
            personality: text.to_string(),
            ..DossierPayload::default()
        };
        let (a, b, c) = tokio::join!(
            intelligence.upsert_dossier(&actor, &known, payload("rustig")),
            intelligence.upsert_dossier(&actor, &known, payload("leider")),
            intelligence.upsert_dossier(&actor, &manual, payload("snel")),
        );
        assert_eq!(a.unwrap().id, b.unwrap().id, "round {}", round);
        c.unwrap();
    }

    assert_eq!(
        count(&store, "SELECT COUNT(*) AS n FROM speler_intelligence").await,
        2 * ROUNDS as i64
    );
}
