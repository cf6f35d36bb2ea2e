//! End-to-end scenarios against the services on an in-memory database
//!
//! Tests cover:
//! - report upsert by natural key and dual-reference validation
//! - shortlist visibility, creation rights and entry deduplication
//! - legacy ingest with name learning and fingerprint dedup on re-run

use std::sync::Arc;
use std::time::Duration;

use scoutdesk_common::db::{init_memory_database, Store};
use scoutdesk_common::Error;
use scoutdesk_svc::cache::ReadCache;
use scoutdesk_svc::catalog::Catalog;
use scoutdesk_svc::identity::{AccessLevel, Actor, IdentityService};
use scoutdesk_svc::legacy::{
    load_name_memory, read_legacy_str, Decision, LegacyIngest, PlayerChoice, Resolution,
};
use scoutdesk_svc::options::OptionService;
use scoutdesk_svc::services::{
    NewEntry, Position, Priority, ReportPayload, ReportService, ShortlistService,
};

struct World {
    store: Store,
    reports: ReportService,
    shortlists: ShortlistService,
    legacy: LegacyIngest,
}

/// Users 1 (fallback), 4 and 7 (scouts), 9 (manager); one catalog player
async fn world() -> World {
    let store = Store::new(init_memory_database().await.unwrap());
    for (id, email, level) in [
        (1i64, "fallback@club.nl", 1i64),
        (4, "vier@club.nl", 1),
        (7, "a@b", 1),
        (9, "chef@club.nl", 3),
    ] {
        store
            .command(
                "INSERT INTO users (id, naam, email, wachtwoord, toegangsniveau) VALUES (?, ?, ?, '', ?)",
                &[id.into(), format!("User {}", id).into(), email.into(), level.into()],
            )
            .await
            .unwrap();
    }
    store
        .command(
            "INSERT INTO players (id, firstname, lastname) VALUES ('555', 'John', 'Doe')",
            &[],
        )
        .await
        .unwrap();

    let cache = Arc::new(ReadCache::new(Duration::from_secs(30)));
    let catalog = Catalog::new(store.clone());
    let identity = IdentityService::new(store.clone());
    let options = OptionService::new(store.clone(), cache.clone());

    World {
        reports: ReportService::new(store.clone(), options.clone(), catalog.clone(), cache.clone()),
        shortlists: ShortlistService::new(store.clone(), identity.clone(), cache.clone()),
        legacy: LegacyIngest::new(store.clone(), catalog, identity, options, cache, 1),
        store,
    }
}

fn scout(id: i64) -> Actor {
    Actor::new(id, format!("User {}", id), AccessLevel::Scout)
}

fn manager() -> Actor {
    Actor::new(9, "User 9", AccessLevel::Manager)
}

async fn count(store: &Store, sql: &str) -> i64 {
    store.query(sql, &[]).await.unwrap().int(0, "n").unwrap()
}

fn report(rating: i64) -> ReportPayload {
    ReportPayload {
        player_id: Some("123".into()),
        match_id: Some("M9".into()),
        rating,
        verdict: "A".into(),
        position_played: "CM".into(),
        ..ReportPayload::default()
    }
}

#[tokio::test]
async fn scenario_report_upsert_overwrites_same_key() {
    let w = world().await;

    w.reports.upsert_report(&scout(7), report(8)).await.unwrap();
    let second = w.reports.upsert_report(&scout(7), report(9)).await.unwrap();

    assert_eq!(count(&w.store, "SELECT COUNT(*) AS n FROM rapporten").await, 1);
    let table = w
        .store
        .query("SELECT beoordeling, scout_id FROM rapporten", &[])
        .await
        .unwrap();
    assert_eq!(table.int(0, "beoordeling"), Some(9));
    assert_eq!(table.int(0, "scout_id"), Some(7));
    assert!(second.report.updated_at.is_some());
}

#[tokio::test]
async fn scenario_both_player_references_rejected() {
    let w = world().await;
    let mut payload = report(8);
    payload.custom_player_name = Some("X".into());

    let result = w.reports.upsert_report(&scout(7), payload).await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(count(&w.store, "SELECT COUNT(*) AS n FROM rapporten").await, 0);
}

#[tokio::test]
async fn scenario_scout_sees_own_shortlists() {
    let w = world().await;
    for owner in [4, 4, 9] {
        w.shortlists.create_shortlist(&manager(), "Lijst", owner).await.unwrap();
    }

    let visible = w.shortlists.list_visible_shortlists(&scout(4)).await.unwrap();
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|s| s.owner_id == 4));
}

#[tokio::test]
async fn scenario_legacy_row_learned_then_deduplicated() {
    let w = world().await;
    let file = "Player,Team,DATE,SCOUT,Starting Position,Match Rating,Resume\n\
                J. Doe,PSV,01-03-2021,a@b,CM,4.0,goede wedstrijd\n";

    let mut run = w
        .legacy
        .start(&scout(7), read_legacy_str(file).unwrap())
        .await
        .unwrap();
    let pending = run.current().await.unwrap().unwrap();
    assert!(pending.cached.is_none());
    assert_eq!(pending.unresolved, vec!["verdict"]);

    let outcome = run
        .resolve(Decision {
            verdict: Some("B".into()),
            ..Decision::new(PlayerChoice::Pick {
                player_id: "555".into(),
            })
        })
        .await
        .unwrap();
    assert!(matches!(outcome, Resolution::Committed { learned: true, .. }));

    let stored = w
        .store
        .query(
            "SELECT beoordeling, rapport_tekst, custom_wedstrijd_naam, speler_id, scout_id FROM rapporten",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.int(0, "beoordeling"), Some(8));
    assert_eq!(stored.text(0, "rapport_tekst").as_deref(), Some("goede wedstrijd"));
    assert_eq!(stored.text(0, "custom_wedstrijd_naam").as_deref(), Some("Legacy Import"));
    assert_eq!(stored.text(0, "speler_id").as_deref(), Some("555"));
    assert_eq!(stored.int(0, "scout_id"), Some(7));
    assert_eq!(load_name_memory(&w.store).await.unwrap()["J. Doe"], "555");

    // Re-run the same file: the row is recognised and nothing is written
    let mut rerun = w
        .legacy
        .start(&scout(7), read_legacy_str(file).unwrap())
        .await
        .unwrap();
    assert!(rerun.current().await.unwrap().is_none());
    assert_eq!(rerun.summary().duplicates_skipped, 1);
    assert_eq!(count(&w.store, "SELECT COUNT(*) AS n FROM rapporten").await, 1);
}

#[tokio::test]
async fn scenario_legacy_rerun_with_edited_text_auto_matches() {
    let w = world().await;
    let first = "Player,Team,DATE,SCOUT,Starting Position,Match Rating,Resume,Verdict\n\
                 J. Doe,PSV,,a@b,CM,4.0,goede wedstrijd,A\n";
    let mut run = w
        .legacy
        .start(&scout(7), read_legacy_str(first).unwrap())
        .await
        .unwrap();
    run.resolve(Decision::new(PlayerChoice::Pick {
        player_id: "555".into(),
    }))
    .await
    .unwrap();

    let second = "Player,Team,DATE,SCOUT,Starting Position,Match Rating,Resume,Verdict\n\
                  J. Doe,PSV,,a@b,CM,3.0,andere wedstrijd,B\n";
    let mut run = w
        .legacy
        .start(&scout(7), read_legacy_str(second).unwrap())
        .await
        .unwrap();
    let pending = run.current().await.unwrap().unwrap();
    assert_eq!(pending.cached.as_ref().unwrap().player_id, "555");
    assert_eq!(pending.cached.as_ref().unwrap().name, "John Doe");

    let outcome = run
        .resolve(Decision::new(PlayerChoice::ConfirmCached))
        .await
        .unwrap();
    assert!(matches!(outcome, Resolution::Committed { learned: false, .. }));
    assert_eq!(count(&w.store, "SELECT COUNT(*) AS n FROM rapporten").await, 2);
}

#[tokio::test]
async fn scenario_shortlist_creation_rights() {
    let w = world().await;
    let analyst = Actor::new(4, "User 4", AccessLevel::Analyst);

    assert!(matches!(
        w.shortlists.create_shortlist(&analyst, "Winter", 4).await,
        Err(Error::Auth(_))
    ));
    assert!(matches!(
        w.shortlists.create_shortlist(&manager(), "", 4).await,
        Err(Error::Validation(_))
    ));
    let created = w.shortlists.create_shortlist(&manager(), "Winter", 4).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(count(&w.store, "SELECT COUNT(*) AS n FROM shortlists").await, 1);
}

#[tokio::test]
async fn scenario_shortlist_entry_dedup() {
    let w = world().await;
    for name in ["Een", "Twee", "Drie"] {
        w.shortlists.create_shortlist(&manager(), name, 9).await.unwrap();
    }
    let shortlist = 3;

    let by_id = || NewEntry {
        player_id: Some("42".into()),
        custom_naam: None,
        position: Position::CM,
        priority: Priority::High,
        notes: String::new(),
    };
    w.shortlists.add_entry(&manager(), shortlist, by_id()).await.unwrap();
    assert!(matches!(
        w.shortlists.add_entry(&manager(), shortlist, by_id()).await,
        Err(Error::Conflict(_))
    ));

    let by_name = || NewEntry {
        player_id: None,
        custom_naam: Some("Unknown Kid".into()),
        position: Position::FW,
        priority: Priority::Low,
        notes: String::new(),
    };
    w.shortlists.add_entry(&manager(), shortlist, by_name()).await.unwrap();
    w.shortlists.add_entry(&manager(), shortlist, by_name()).await.unwrap();

    assert_eq!(
        count(
            &w.store,
            "SELECT COUNT(*) AS n FROM shortlist_entries WHERE shortlist_id = 3"
        )
        .await,
        3
    );
}
