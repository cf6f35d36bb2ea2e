//! Table definitions
//!
//! Two groups of tables:
//! - the scouting tables owned by this service (`users`, `rapporten`, ...)
//! - a local mirror of the upstream catalog (`players`, `squads`, ...),
//!   which the service only ever reads.
//!
//! Column names follow the established database contract and are therefore
//! partly Dutch (`naam`, `beoordeling`, ...).

use sqlx::SqlitePool;
use tracing::info;

use crate::Result;

/// Custom match name given to every report produced by the legacy ingest
pub const LEGACY_MATCH_NAME: &str = "Legacy Import";

/// Run every `CREATE TABLE IF NOT EXISTS` (idempotent)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_shortlists_tables(pool).await?;
    create_reports_table(pool).await?;
    create_intelligence_table(pool).await?;
    create_offered_players_table(pool).await?;
    create_option_tables(pool).await?;
    create_legacy_names_map_table(pool).await?;
    create_catalog_tables(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            naam TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            wachtwoord TEXT NOT NULL,
            rol TEXT NOT NULL DEFAULT 'scout',
            toegangsniveau INTEGER NOT NULL DEFAULT 1 CHECK (toegangsniveau BETWEEN 1 AND 3),
            actief INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_shortlists_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shortlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            naam TEXT NOT NULL CHECK (length(trim(naam)) > 0),
            eigenaar_id INTEGER NOT NULL REFERENCES users(id),
            aangemaakt_op TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shortlist_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shortlist_id INTEGER NOT NULL REFERENCES shortlists(id) ON DELETE CASCADE,
            player_id TEXT,
            custom_naam TEXT,
            position TEXT NOT NULL
                CHECK (position IN ('GK','CB','RB','LB','DM','CM','ACM','RW','LW','FW')),
            priority TEXT NOT NULL CHECK (priority IN ('High','Medium','Low')),
            notities TEXT NOT NULL DEFAULT '',
            added_by TEXT NOT NULL,
            added_at TEXT NOT NULL,
            CHECK ((player_id IS NULL) <> (custom_naam IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Custom-name entries are exempt from deduplication
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_shortlist_entries_player
        ON shortlist_entries (shortlist_id, player_id)
        WHERE player_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rapporten (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scout_id INTEGER NOT NULL REFERENCES users(id),
            speler_id TEXT,
            custom_speler_naam TEXT,
            wedstrijd_id TEXT,
            custom_wedstrijd_naam TEXT,
            competitie_id TEXT,
            positie_gespeeld TEXT NOT NULL,
            profiel_code TEXT,
            advies TEXT NOT NULL,
            beoordeling INTEGER NOT NULL CHECK (beoordeling BETWEEN 1 AND 10),
            rapport_tekst TEXT NOT NULL DEFAULT '',
            gouden_buzzer INTEGER NOT NULL DEFAULT 0,
            shortlist_id INTEGER REFERENCES shortlists(id) ON DELETE SET NULL,
            speler_lengte INTEGER,
            contract_einde TEXT,
            aangemaakt_op TEXT NOT NULL,
            bijgewerkt_op TEXT,
            CHECK ((speler_id IS NULL) <> (custom_speler_naam IS NULL)),
            CHECK ((wedstrijd_id IS NULL) <> (custom_wedstrijd_naam IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Natural key of authored reports. Legacy imports share one custom match
    // name and may legitimately hold several observations per player.
    sqlx::query(&format!(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_rapporten_natural_key
        ON rapporten (
            scout_id,
            COALESCE(speler_id, custom_speler_naam),
            COALESCE(wedstrijd_id, custom_wedstrijd_naam)
        )
        WHERE custom_wedstrijd_naam IS NULL OR custom_wedstrijd_naam <> '{}'
        "#,
        LEGACY_MATCH_NAME
    ))
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_rapporten_wedstrijd ON rapporten (wedstrijd_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_intelligence_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS speler_intelligence (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            speler_id TEXT NOT NULL,
            custom_naam TEXT,
            club_informatie TEXT NOT NULL DEFAULT '',
            familie_achtergrond TEXT NOT NULL DEFAULT '',
            persoonlijkheid TEXT NOT NULL DEFAULT '',
            makelaar_details TEXT NOT NULL DEFAULT '',
            instagram_url TEXT NOT NULL DEFAULT '',
            twitter_url TEXT NOT NULL DEFAULT '',
            transfermarkt_url TEXT NOT NULL DEFAULT '',
            overige_url TEXT NOT NULL DEFAULT '',
            toegevoegd_door TEXT NOT NULL,
            laatst_bijgewerkt TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_speler_intelligence_key
        ON speler_intelligence (speler_id, COALESCE(custom_naam, ''))
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_offered_players_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offered_players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id TEXT NOT NULL,
            makelaar TEXT NOT NULL,
            vraagprijs REAL,
            status TEXT NOT NULL CHECK (status IN ('Nieuw','Interessant','Afgekeurd')),
            opmerkingen TEXT NOT NULL DEFAULT '',
            aangeboden_datum TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_offered_players_player ON offered_players (player_id, aangeboden_datum)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Enumeration tables. Column naming differs per table in deployed
/// databases; readers detect it at runtime.
async fn create_option_tables(pool: &SqlitePool) -> Result<()> {
    for ddl in [
        "CREATE TABLE IF NOT EXISTS opties_posities (waarde TEXT PRIMARY KEY, label TEXT NOT NULL)",
        "CREATE TABLE IF NOT EXISTS opties_advies (id TEXT PRIMARY KEY, label TEXT NOT NULL)",
        "CREATE TABLE IF NOT EXISTS opties_profielen (waarde TEXT PRIMARY KEY, naam TEXT NOT NULL)",
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}

async fn create_legacy_names_map_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS legacy_names_map (
            legacy_name TEXT PRIMARY KEY,
            speler_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Local mirror of the upstream catalog. Populated by the provider import,
/// never written by this service.
async fn create_catalog_tables(pool: &SqlitePool) -> Result<()> {
    for ddl in [
        r#"CREATE TABLE IF NOT EXISTS players (
            id TEXT PRIMARY KEY,
            commonname TEXT,
            firstname TEXT,
            lastname TEXT,
            birthdate TEXT,
            currentSquadId TEXT
        )"#,
        r#"CREATE TABLE IF NOT EXISTS squads (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            imageUrl TEXT
        )"#,
        r#"CREATE TABLE IF NOT EXISTS iterations (
            id TEXT PRIMARY KEY,
            season TEXT,
            competitionName TEXT
        )"#,
        r#"CREATE TABLE IF NOT EXISTS matches (
            id TEXT PRIMARY KEY,
            scheduledDate TEXT,
            homeSquadId TEXT,
            awaySquadId TEXT,
            iterationId TEXT
        )"#,
        r#"CREATE TABLE IF NOT EXISTS match_details_full (
            id TEXT PRIMARY KEY,
            squadHome TEXT,
            squadAway TEXT
        )"#,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}
