//! Legacy ingest wizard
//!
//! A run walks the rows of one legacy file with a monotonically increasing
//! cursor. Rows whose resume fingerprint is already stored are skipped
//! without asking. For the rest the caller sees the row plus every value
//! that could be mapped automatically, and answers with a `Decision`.
//!
//! Restarting a run on the same file is safe: everything committed before
//! is recognised by fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use scoutdesk_common::db::{Store, LEGACY_MATCH_NAME};
use scoutdesk_common::{time, Error, MatchRef, PlayerRef, Result};

use crate::cache::{Family, ReadCache};
use crate::catalog::{Catalog, PlayerHit};
use crate::identity::{Actor, IdentityService};
use crate::options::{OptionService, OptionSets};
use crate::services::reports::{insert_report, validate_rating, ValidReport};

use super::fingerprint::{fingerprint, load_known_fingerprints};
use super::mapping::{map_position, map_verdict, parse_legacy_date, scale_rating};
use super::name_map::{load_name_memory, upsert_mapping};
use super::source::LegacyRow;

const SEARCH_LIMIT: usize = 20;

/// Shared dependencies for starting runs
#[derive(Clone)]
pub struct LegacyIngest {
    store: Store,
    catalog: Catalog,
    identity: IdentityService,
    options: OptionService,
    cache: Arc<ReadCache>,
    fallback_scout_id: i64,
}

impl LegacyIngest {
    pub fn new(
        store: Store,
        catalog: Catalog,
        identity: IdentityService,
        options: OptionService,
        cache: Arc<ReadCache>,
        fallback_scout_id: i64,
    ) -> Self {
        Self {
            store,
            catalog,
            identity,
            options,
            cache,
            fallback_scout_id,
        }
    }

    /// Start a run: snapshot stored fingerprints, the name map and the
    /// option sets
    pub async fn start(&self, actor: &Actor, rows: Vec<LegacyRow>) -> Result<LegacyRun> {
        let known_fingerprints = load_known_fingerprints(&self.store).await?;
        let name_memory = load_name_memory(&self.store).await?;
        let options = self.options.load_all().await;

        info!(
            actor = actor.user_id,
            rows = rows.len(),
            known_fingerprints = known_fingerprints.len(),
            learned_names = name_memory.len(),
            "Legacy run started"
        );

        Ok(LegacyRun {
            ingest: self.clone(),
            started_by: actor.user_id,
            stats: RunSummary {
                total: rows.len(),
                ..RunSummary::default()
            },
            rows,
            known_fingerprints,
            name_memory,
            evicted: HashSet::new(),
            options,
        })
    }
}

/// Progress counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub cursor: usize,
    pub committed: usize,
    pub duplicates_skipped: usize,
    pub user_skipped: usize,
}

impl RunSummary {
    pub fn finished(&self) -> bool {
        self.cursor >= self.total
    }
}

/// Learned mapping offered for confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedSuggestion {
    pub player_id: String,
    pub name: String,
}

/// The row awaiting a decision, with everything mapped so far
#[derive(Debug, Clone, Serialize)]
pub struct PendingRow {
    pub index: usize,
    pub row: LegacyRow,
    pub fingerprint: String,
    pub cached: Option<CachedSuggestion>,
    pub position: Option<String>,
    pub verdict: Option<String>,
    pub profile: Option<String>,
    pub rating: Option<i64>,
    pub scout_id: i64,
    /// False when the SCOUT email is unknown and the fallback scout is used
    pub scout_matched: bool,
    /// Fields the caller must supply in the decision
    pub unresolved: Vec<&'static str>,
}

/// How to resolve the player of the current row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerChoice {
    /// Accept the learned mapping
    ConfirmCached,
    /// Reject the learned mapping for the rest of this run
    Change,
    /// Use an upstream player picked from the search
    Pick { player_id: String },
    /// Save as a manually named player (defaults to the legacy spelling)
    Custom {
        #[serde(default)]
        name: Option<String>,
    },
    Skip,
}

/// Answer for the current row; overrides win over automatic mapping
#[derive(Debug, Clone, Deserialize)]
pub struct Decision {
    pub player: PlayerChoice,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
}

impl Decision {
    pub fn new(player: PlayerChoice) -> Self {
        Self {
            player,
            position: None,
            verdict: None,
            rating: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Committed { report_id: i64, learned: bool },
    Skipped,
    /// Cached mapping evicted; the row must be resolved by search
    NeedsPlayer,
}

pub struct LegacyRun {
    ingest: LegacyIngest,
    started_by: i64,
    rows: Vec<LegacyRow>,
    stats: RunSummary,
    known_fingerprints: HashSet<String>,
    name_memory: HashMap<String, String>,
    evicted: HashSet<String>,
    options: OptionSets,
}

impl LegacyRun {
    pub fn started_by(&self) -> i64 {
        self.started_by
    }

    pub fn summary(&self) -> RunSummary {
        self.stats.clone()
    }

    /// Advance past already stored rows and describe the next one
    pub async fn current(&mut self) -> Result<Option<PendingRow>> {
        while let Some(row) = self.rows.get(self.stats.cursor) {
            if self.known_fingerprints.contains(&fingerprint(&row.resume)) {
                debug!(line = row.line, "Legacy row already stored, skipping");
                self.stats.duplicates_skipped += 1;
                self.stats.cursor += 1;
            } else {
                break;
            }
        }

        let Some(row) = self.rows.get(self.stats.cursor).cloned() else {
            return Ok(None);
        };

        let cached = match self.cached_player_id(&row.player) {
            Some(player_id) => Some(CachedSuggestion {
                name: self
                    .ingest
                    .catalog
                    .display_name(&PlayerRef::Known(player_id.clone()))
                    .await,
                player_id,
            }),
            None => None,
        };

        let (scout_id, scout_matched) = self.map_scout(&row.scout_email).await?;
        let position = map_position(&row.position, &self.options.positions);
        let verdict = map_verdict(row.verdict.as_deref(), &self.options.verdicts);
        let rating = scale_rating(&row.rating);

        let mut unresolved = Vec::new();
        if position.is_none() {
            unresolved.push("position");
        }
        if verdict.is_none() {
            unresolved.push("verdict");
        }
        if rating.is_none() {
            unresolved.push("rating");
        }

        Ok(Some(PendingRow {
            index: self.stats.cursor,
            fingerprint: fingerprint(&row.resume),
            cached,
            position,
            verdict,
            profile: row
                .profile
                .as_deref()
                .and_then(|p| self.options.profiles.resolve(p)),
            rating,
            scout_id,
            scout_matched,
            unresolved,
            row,
        }))
    }

    /// Upstream candidates for manual resolution
    pub async fn search(&self, term: &str) -> Vec<PlayerHit> {
        self.ingest.catalog.search_players(term, SEARCH_LIMIT).await
    }

    /// Apply a decision to the current row
    ///
    /// **Algorithm:**
    /// 1. `skip` advances the cursor; `change` evicts the learned mapping
    ///    and leaves the cursor in place
    /// 2. Resolve player, position, verdict and rating (overrides first)
    /// 3. In one transaction: insert the report under the mapped scout with
    ///    custom match name "Legacy Import" and, for a searched pick, upsert
    ///    the learned name mapping
    /// 4. Record the fingerprint, advance the cursor, invalidate caches
    pub async fn resolve(&mut self, decision: Decision) -> Result<Resolution> {
        let pending = self
            .current()
            .await?
            .ok_or_else(|| Error::Validation("legacy run has no rows left".to_string()))?;
        let legacy_name = pending.row.player.clone();

        let (player, learn) = match decision.player {
            PlayerChoice::Skip => {
                self.stats.user_skipped += 1;
                self.stats.cursor += 1;
                info!(line = pending.row.line, "Legacy row skipped by user");
                return Ok(Resolution::Skipped);
            }
            PlayerChoice::Change => {
                self.evicted.insert(legacy_name);
                return Ok(Resolution::NeedsPlayer);
            }
            PlayerChoice::ConfirmCached => {
                let cached = pending.cached.as_ref().ok_or_else(|| {
                    Error::Validation(format!("no learned mapping for '{}'", legacy_name))
                })?;
                (PlayerRef::Known(cached.player_id.clone()), false)
            }
            PlayerChoice::Pick { player_id } => {
                let player_id = player_id.trim().to_string();
                if player_id.is_empty() {
                    return Err(Error::Validation("picked player_id is empty".to_string()));
                }
                (PlayerRef::Known(player_id), true)
            }
            PlayerChoice::Custom { name } => {
                let name = name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| legacy_name.clone());
                if name.is_empty() {
                    return Err(Error::Validation("custom player name is empty".to_string()));
                }
                (PlayerRef::Custom(name), false)
            }
        };

        let position_played = match decision.position.as_deref() {
            Some(raw) => map_position(raw, &self.options.positions)
                .ok_or_else(|| Error::Validation(format!("unknown position '{}'", raw)))?,
            None => pending.position.clone().ok_or_else(|| {
                Error::Validation(format!("position '{}' needs a choice", pending.row.position))
            })?,
        };
        let verdict = match decision.verdict.as_deref() {
            Some(raw) => map_verdict(Some(raw), &self.options.verdicts)
                .ok_or_else(|| Error::Validation(format!("unknown verdict '{}'", raw)))?,
            None => pending
                .verdict
                .clone()
                .ok_or_else(|| Error::Validation("verdict needs a choice".to_string()))?,
        };
        let rating = match decision.rating {
            Some(rating) => validate_rating(rating)?,
            None => pending.rating.ok_or_else(|| {
                Error::Validation(format!("rating '{}' needs a value", pending.row.rating))
            })?,
        };

        let report = ValidReport {
            player: player.clone(),
            match_ref: MatchRef::Custom(LEGACY_MATCH_NAME.to_string()),
            competition_id: None,
            position_played,
            profile_code: pending.profile.clone(),
            verdict,
            rating,
            text: pending.row.resume.clone(),
            golden_buzzer: false,
            shortlist_id: None,
            player_height_cm: None,
            contract_end: None,
        };
        let created_at = parse_legacy_date(&pending.row.date).unwrap_or_else(time::now);

        let store = &self.ingest.store;
        let mut tx = store.begin().await?;
        let report_id = insert_report(&mut *tx, pending.scout_id, &report, created_at).await?;
        if learn {
            upsert_mapping(&mut *tx, &legacy_name, player.key()).await?;
        }
        tx.commit().await?;

        self.known_fingerprints.insert(pending.fingerprint);
        if learn {
            self.name_memory.insert(legacy_name.clone(), player.key().to_string());
            self.evicted.remove(&legacy_name);
        }
        self.stats.committed += 1;
        self.stats.cursor += 1;

        self.ingest.cache.invalidate(Family::Reports).await;
        if learn {
            self.ingest.cache.invalidate(Family::NameMap).await;
        }

        info!(
            line = pending.row.line,
            report_id,
            scout_id = pending.scout_id,
            player = player.key(),
            learned = learn,
            "Legacy row committed"
        );

        Ok(Resolution::Committed {
            report_id,
            learned: learn,
        })
    }

    fn cached_player_id(&self, legacy_name: &str) -> Option<String> {
        if self.evicted.contains(legacy_name) {
            return None;
        }
        self.name_memory.get(legacy_name).cloned()
    }

    async fn map_scout(&self, email: &str) -> Result<(i64, bool)> {
        match self.ingest.identity.find_user_id_by_email(email).await? {
            Some(user_id) => Ok((user_id, true)),
            None => Ok((self.ingest.fallback_scout_id, false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::seed_catalog;
    use crate::identity::AccessLevel;
    use crate::legacy::source::read_legacy_str;
    use scoutdesk_common::db::init_memory_database;
    use std::time::Duration;

    const HEADER: &str = "Player,Team,DATE,SCOUT,Starting Position,Match Rating,Resume,Verdict\n";

    async fn setup() -> (Store, LegacyIngest) {
        let store = Store::new(init_memory_database().await.unwrap());
        for (id, email) in [(1i64, "fallback@club.nl"), (2, "a@b")] {
            store
                .command(
                    "INSERT INTO users (id, naam, email, wachtwoord) VALUES (?, ?, ?, '')",
                    &[id.into(), format!("User {}", id).into(), email.into()],
                )
                .await
                .unwrap();
        }
        seed_catalog(&store).await;
        let cache = Arc::new(ReadCache::new(Duration::from_secs(30)));
        let ingest = LegacyIngest::new(
            store.clone(),
            Catalog::new(store.clone()),
            IdentityService::new(store.clone()),
            OptionService::new(store.clone(), cache.clone()),
            cache,
            1,
        );
        (store, ingest)
    }

    fn actor() -> Actor {
        Actor::new(2, "Importeur", AccessLevel::Scout)
    }

    async fn report_count(store: &Store) -> Option<i64> {
        store
            .query("SELECT COUNT(*) AS n FROM rapporten", &[])
            .await
            .unwrap()
            .int(0, "n")
    }

    #[tokio::test]
    async fn test_pick_commits_and_learns() {
        let (store, ingest) = setup().await;
        let rows = read_legacy_str(&format!(
            "{}J. Doe,PSV,01-03-2021,A@B ,CM,\"4,0\",goede wedstrijd,A\n",
            HEADER
        ))
        .unwrap();
        let mut run = ingest.start(&actor(), rows).await.unwrap();

        let pending = run.current().await.unwrap().unwrap();
        assert!(pending.cached.is_none());
        assert_eq!(pending.rating, Some(8));
        assert_eq!(pending.scout_id, 2);
        assert!(pending.unresolved.is_empty());
        assert!(run.search("doe").await.iter().any(|h| h.id == "555"));

        let outcome = run
            .resolve(Decision::new(PlayerChoice::Pick {
                player_id: "555".into(),
            }))
            .await
            .unwrap();
        assert!(matches!(outcome, Resolution::Committed { learned: true, .. }));

        let memory = load_name_memory(&store).await.unwrap();
        assert_eq!(memory["J. Doe"], "555");
        assert_eq!(report_count(&store).await, Some(1));
        assert!(run.current().await.unwrap().is_none());
        assert_eq!(run.summary().committed, 1);
    }

    #[tokio::test]
    async fn test_unknown_scout_falls_back_and_missing_values_block() {
        let (_, ingest) = setup().await;
        let rows = read_legacy_str(&format!(
            "{}Nobody,?,,ghost@club.nl,Libero,goed,iets,\n",
            HEADER
        ))
        .unwrap();
        let mut run = ingest.start(&actor(), rows).await.unwrap();

        let pending = run.current().await.unwrap().unwrap();
        assert_eq!(pending.scout_id, 1);
        assert!(!pending.scout_matched);
        assert_eq!(pending.unresolved, vec!["position", "verdict", "rating"]);

        let result = run
            .resolve(Decision::new(PlayerChoice::Custom { name: None }))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(run.summary().cursor, 0);

        let outcome = run
            .resolve(Decision {
                player: PlayerChoice::Custom { name: None },
                position: Some("CB".into()),
                verdict: Some("Volgen".into()),
                rating: Some(6),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, Resolution::Committed { learned: false, .. }));
    }

    #[tokio::test]
    async fn test_change_evicts_cached_mapping_for_this_run() {
        let (store, ingest) = setup().await;
        crate::legacy::name_map::save_new_mapping(&store, "Doe", "555").await.unwrap();
        let rows = read_legacy_str(&format!("{}Doe,PSV,,a@b,FW,3,eerste,B\n", HEADER)).unwrap();
        let mut run = ingest.start(&actor(), rows).await.unwrap();

        let pending = run.current().await.unwrap().unwrap();
        assert_eq!(pending.cached.as_ref().unwrap().name, "John Doe");

        assert_eq!(
            run.resolve(Decision::new(PlayerChoice::Change)).await.unwrap(),
            Resolution::NeedsPlayer
        );
        assert!(run.current().await.unwrap().unwrap().cached.is_none());
        assert!(matches!(
            run.resolve(Decision::new(PlayerChoice::ConfirmCached)).await,
            Err(Error::Validation(_))
        ));

        run.resolve(Decision::new(PlayerChoice::Pick {
            player_id: "556".into(),
        }))
        .await
        .unwrap();
        assert_eq!(load_name_memory(&store).await.unwrap()["Doe"], "556");
    }

    #[tokio::test]
    async fn test_duplicates_within_file_and_skip() {
        let (store, ingest) = setup().await;
        let rows = read_legacy_str(&format!(
            "{}A,T,,a@b,FW,4,Zelfde tekst,A\nB,T,,a@b,FW,4,zelfde  tekst,A\nC,T,,a@b,FW,4,anders,A\n",
            HEADER
        ))
        .unwrap();
        let mut run = ingest.start(&actor(), rows).await.unwrap();

        run.resolve(Decision::new(PlayerChoice::Custom { name: None }))
            .await
            .unwrap();
        assert_eq!(
            run.resolve(Decision::new(PlayerChoice::Skip)).await.unwrap(),
            Resolution::Skipped
        );
        assert!(run.current().await.unwrap().is_none());

        let summary = run.summary();
        assert_eq!(summary.committed, 1);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(summary.user_skipped, 1);
        assert!(summary.finished());
        assert_eq!(report_count(&store).await, Some(1));
    }
}
