//! Upstream catalog (read-only)
//!
//! Lookups over the externally maintained `players`, `squads`, `iterations`,
//! `matches` and `match_details_full` tables. The catalog is refreshed by
//! the provider import and may lose or rename rows at any time, so nothing
//! here assumes referential integrity: every read degrades to an empty or
//! `None` result with a logged warning.

pub mod roster;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use scoutdesk_common::db::{Param, Store, Table};
use scoutdesk_common::PlayerRef;

pub use roster::{RosterEntry, SquadDocument, TeamSide};

/// Catalog player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub commonname: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub birthdate: Option<String>,
    pub current_squad_id: Option<String>,
}

impl Player {
    /// Common name, else "first last", else the id
    pub fn display_name(&self) -> String {
        if let Some(name) = self.commonname.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let full = [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.id.clone()
        } else {
            full
        }
    }
}

/// Search result for name resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHit {
    pub id: String,
    pub name: String,
    pub squad_name: Option<String>,
    pub birthdate: Option<String>,
    pub score: f64,
}

/// Catalog match with resolved squad and competition names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: String,
    pub scheduled_date: Option<String>,
    pub home_squad_id: Option<String>,
    pub home_squad: Option<String>,
    pub away_squad_id: Option<String>,
    pub away_squad: Option<String>,
    pub iteration_id: Option<String>,
    pub competition: Option<String>,
    pub season: Option<String>,
}

impl MatchInfo {
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.home_squad.as_deref().unwrap_or("?"),
            self.away_squad.as_deref().unwrap_or("?")
        )
    }
}

const PLAYER_COLUMNS: &str = "id, commonname, firstname, lastname, birthdate, currentSquadId";

const MATCH_SELECT: &str = r#"
    SELECT m.id, m.scheduledDate, m.homeSquadId, hs.name AS home_name,
           m.awaySquadId, aws.name AS away_name, m.iterationId,
           i.competitionName, i.season
    FROM matches m
    LEFT JOIN squads hs ON hs.id = m.homeSquadId
    LEFT JOIN squads aws ON aws.id = m.awaySquadId
    LEFT JOIN iterations i ON i.id = m.iterationId
"#;

#[derive(Clone)]
pub struct Catalog {
    store: Store,
}

impl Catalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn get_player(&self, player_id: &str) -> Option<Player> {
        let table = self
            .store
            .query_lenient(
                &format!("SELECT {} FROM players WHERE id = ?", PLAYER_COLUMNS),
                &[player_id.into()],
            )
            .await;
        players_from_table(&table).into_iter().next()
    }

    /// Display names for a batch of ids; unknown ids are absent from the map
    pub async fn player_names(&self, ids: &[String]) -> HashMap<String, String> {
        if ids.is_empty() {
            return HashMap::new();
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let params: Vec<Param> = ids.iter().map(|id| Param::from(id.as_str())).collect();
        let table = self
            .store
            .query_lenient(
                &format!("SELECT {} FROM players WHERE id IN ({})", PLAYER_COLUMNS, placeholders),
                &params,
            )
            .await;

        players_from_table(&table)
            .into_iter()
            .map(|p| (p.id.clone(), p.display_name()))
            .collect()
    }

    /// Best-effort display name for a player reference
    pub async fn display_name(&self, player: &PlayerRef) -> String {
        match player {
            PlayerRef::Known(id) => self
                .get_player(id)
                .await
                .map(|p| p.display_name())
                .unwrap_or_else(|| id.clone()),
            PlayerRef::Custom(name) => name.clone(),
        }
    }

    /// Case-insensitive substring search over player names, ranked by
    /// Jaro-Winkler similarity to the search term
    pub async fn search_players(&self, term: &str, limit: usize) -> Vec<PlayerHit> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let pattern = format!("%{}%", escape_like(&needle));

        let table = self
            .store
            .query_lenient(
                r#"
                SELECT p.id, p.commonname, p.firstname, p.lastname, p.birthdate,
                       p.currentSquadId, s.name AS squad_name
                FROM players p
                LEFT JOIN squads s ON s.id = p.currentSquadId
                WHERE lower(COALESCE(p.commonname, '')) LIKE ? ESCAPE '\'
                   OR lower(COALESCE(p.firstname, '') || ' ' || COALESCE(p.lastname, '')) LIKE ? ESCAPE '\'
                   OR lower(COALESCE(p.lastname, '')) LIKE ? ESCAPE '\'
                LIMIT 500
                "#,
                &[pattern.clone().into(), pattern.clone().into(), pattern.into()],
            )
            .await;

        let mut hits: Vec<PlayerHit> = players_from_table(&table)
            .into_iter()
            .enumerate()
            .map(|(row, player)| {
                let name = player.display_name();
                let score = strsim::jaro_winkler(&needle, &name.to_lowercase());
                PlayerHit {
                    id: player.id.clone(),
                    name,
                    squad_name: table.text(row, "squad_name"),
                    birthdate: player.birthdate.clone(),
                    score,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        hits.truncate(limit);
        hits
    }

    pub async fn get_match(&self, match_id: &str) -> Option<MatchInfo> {
        let table = self
            .store
            .query_lenient(&format!("{} WHERE m.id = ?", MATCH_SELECT), &[match_id.into()])
            .await;
        matches_from_table(&table).into_iter().next()
    }

    /// Most recent matches by scheduled date
    pub async fn recent_matches(&self, limit: i64) -> Vec<MatchInfo> {
        let table = self
            .store
            .query_lenient(
                &format!("{} ORDER BY m.scheduledDate DESC LIMIT ?", MATCH_SELECT),
                &[limit.into()],
            )
            .await;
        matches_from_table(&table)
    }

    /// Official roster of a match: home side then away side, each with
    /// starters first and bench after, ordered by shirt number
    pub async fn match_roster(&self, match_id: &str) -> Vec<RosterEntry> {
        let table = self
            .store
            .query_lenient(
                "SELECT squadHome, squadAway FROM match_details_full WHERE id = ?",
                &[match_id.into()],
            )
            .await;
        if table.is_empty() {
            return Vec::new();
        }

        let mut roster = Vec::new();
        for (column, side) in [("squadHome", TeamSide::Home), ("squadAway", TeamSide::Away)] {
            let Some(raw) = table.text(0, column) else {
                continue;
            };
            match SquadDocument::parse(&raw) {
                Ok(doc) => roster.extend(doc.ordered_entries(side)),
                Err(e) => {
                    warn!(match_id, column, error = %e, "Malformed squad document, skipping side")
                }
            }
        }
        roster
    }
}

/// Make `%`, `_` and `\` match literally under `ESCAPE '\'`
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn players_from_table(table: &Table) -> Vec<Player> {
    (0..table.len())
        .filter_map(|row| {
            Some(Player {
                id: table.text(row, "id")?,
                commonname: table.text(row, "commonname"),
                firstname: table.text(row, "firstname"),
                lastname: table.text(row, "lastname"),
                birthdate: table.text(row, "birthdate"),
                current_squad_id: table.text(row, "currentSquadId"),
            })
        })
        .collect()
}

fn matches_from_table(table: &Table) -> Vec<MatchInfo> {
    (0..table.len())
        .filter_map(|row| {
            Some(MatchInfo {
                id: table.text(row, "id")?,
                scheduled_date: table.text(row, "scheduledDate"),
                home_squad_id: table.text(row, "homeSquadId"),
                home_squad: table.text(row, "home_name"),
                away_squad_id: table.text(row, "awaySquadId"),
                away_squad: table.text(row, "away_name"),
                iteration_id: table.text(row, "iterationId"),
                competition: table.text(row, "competitionName"),
                season: table.text(row, "season"),
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::seed_catalog;
    use super::*;
    use scoutdesk_common::db::init_memory_database;

    async fn catalog() -> Catalog {
        let store = Store::new(init_memory_database().await.unwrap());
        seed_catalog(&store).await;
        Catalog::new(store)
    }

    #[tokio::test]
    async fn test_get_player_and_display_name() {
        let catalog = catalog().await;
        assert_eq!(catalog.get_player("123").await.unwrap().display_name(), "Dusan Tadic");
        assert_eq!(catalog.get_player("42").await.unwrap().display_name(), "Steven Berghuis");
        assert!(catalog.get_player("nope").await.is_none());
        assert_eq!(catalog.display_name(&PlayerRef::Known("gone".into())).await, "gone");
        assert_eq!(catalog.display_name(&PlayerRef::Custom("Unknown Kid".into())).await, "Unknown Kid");
    }

    #[tokio::test]
    async fn test_search_is_substring_and_ranked() {
        let catalog = catalog().await;
        let hits = catalog.search_players("DOE", 10).await;
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"555") && ids.contains(&"556"));
        assert_eq!(hits[0].squad_name.as_deref(), Some("PSV"));
        assert!(catalog.search_players("   ", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let catalog = catalog().await;
        assert!(catalog.search_players("%", 10).await.is_empty());
        assert!(catalog.search_players("_", 10).await.is_empty());
        assert!(catalog.search_players("Do_", 10).await.is_empty());
        assert!(catalog.search_players("\\", 10).await.is_empty());
        assert_eq!(catalog.search_players("Doe", 10).await.len(), 2);
        assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
    }

    #[tokio::test]
    async fn test_get_match_resolves_names() {
        let catalog = catalog().await;
        let m = catalog.get_match("M9").await.unwrap();
        assert_eq!(m.label(), "Ajax - PSV");
        assert_eq!(m.competition.as_deref(), Some("Eredivisie"));
        assert_eq!(catalog.recent_matches(5).await.len(), 1);
    }

    #[tokio::test]
    async fn test_match_roster_home_then_away() {
        let catalog = catalog().await;
        let ids: Vec<String> = catalog
            .match_roster("M9")
            .await
            .into_iter()
            .map(|e| e.player_id)
            .collect();
        assert_eq!(ids, vec!["123", "42", "11"]);
        assert!(catalog.match_roster("unknown").await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_document_degrades() {
        let store = Store::new(init_memory_database().await.unwrap());
        store
            .command(
                "INSERT INTO match_details_full (id, squadHome, squadAway) VALUES ('M1', 'not json', NULL)",
                &[],
            )
            .await
            .unwrap();
        assert!(Catalog::new(store).match_roster("M1").await.is_empty());
    }

    #[tokio::test]
    async fn test_player_names_batch() {
        let catalog = catalog().await;
        let names = catalog
            .player_names(&["123".to_string(), "missing".to_string()])
            .await;
        assert_eq!(names.len(), 1);
        assert_eq!(names["123"], "Dusan Tadic");
    }
}
