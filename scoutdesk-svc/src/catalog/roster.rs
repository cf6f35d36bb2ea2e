//! Match roster documents
//!
//! `match_details_full.squadHome` / `squadAway` hold one JSON document per
//! side:
//!
//! ```json
//! {"coachId": 5, "players": [{"id": 11, "shirtNumber": 9}],
//!  "startingPositions": [{"playerId": 11, "position": "FW", "positionSide": "CENTER"}]}
//! ```
//!
//! Provider ids arrive as numbers or strings; both are normalised to text.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadDocument {
    #[serde(default, deserialize_with = "optional_id")]
    pub coach_id: Option<String>,
    #[serde(default)]
    pub players: Vec<SquadPlayer>,
    #[serde(default)]
    pub starting_positions: Vec<StartingPosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadPlayer {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub shirt_number: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingPosition {
    #[serde(deserialize_with = "required_id")]
    pub player_id: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub position_side: Option<String>,
}

/// One player of an official match roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: String,
    pub side: TeamSide,
    pub shirt_number: Option<i64>,
    pub starter: bool,
    pub position: Option<String>,
    pub position_side: Option<String>,
}

impl SquadDocument {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Starters first, then bench; each group by shirt number (unknown last)
    pub fn ordered_entries(&self, side: TeamSide) -> Vec<RosterEntry> {
        let mut entries: Vec<RosterEntry> = self
            .players
            .iter()
            .map(|player| {
                let start = self
                    .starting_positions
                    .iter()
                    .find(|sp| sp.player_id == player.id);
                RosterEntry {
                    player_id: player.id.clone(),
                    side,
                    shirt_number: player.shirt_number,
                    starter: start.is_some(),
                    position: start.and_then(|sp| sp.position.clone()),
                    position_side: start.and_then(|sp| sp.position_side.clone()),
                }
            })
            .collect();

        entries.sort_by_key(|e| (!e.starter, e.shirt_number.unwrap_or(i64::MAX)));
        entries
    }
}

fn id_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(id_to_string(Value::deserialize(deserializer)?))
}

fn required_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    id_to_string(Value::deserialize(deserializer)?)
        .ok_or_else(|| serde::de::Error::custom("player id must be a string or number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "coachId": 77,
        "players": [
            {"id": 5, "shirtNumber": 14},
            {"id": "3", "shirtNumber": 1},
            {"id": 8, "shirtNumber": 10},
            {"id": 9},
            {"id": 12, "shirtNumber": 2}
        ],
        "startingPositions": [
            {"playerId": 8, "position": "ACM", "positionSide": "CENTER"},
            {"playerId": "3", "position": "GK"}
        ]
    }"#;

    #[test]
    fn test_parse_mixed_id_types() {
        let doc = SquadDocument::parse(DOC).unwrap();
        assert_eq!(doc.coach_id.as_deref(), Some("77"));
        assert_eq!(doc.players.len(), 5);
        assert_eq!(doc.starting_positions[0].player_id, "8");
    }

    #[test]
    fn test_starters_then_bench_by_shirt_number() {
        let doc = SquadDocument::parse(DOC).unwrap();
        let order: Vec<(String, bool)> = doc
            .ordered_entries(TeamSide::Home)
            .into_iter()
            .map(|e| (e.player_id, e.starter))
            .collect();

        assert_eq!(
            order,
            vec![
                ("3".to_string(), true),
                ("8".to_string(), true),
                ("12".to_string(), false),
                ("5".to_string(), false),
                ("9".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_starting_position_details_attached() {
        let doc = SquadDocument::parse(DOC).unwrap();
        let entries = doc.ordered_entries(TeamSide::Away);
        let playmaker = entries.iter().find(|e| e.player_id == "8").unwrap();
        assert_eq!(playmaker.position.as_deref(), Some("ACM"));
        assert_eq!(playmaker.side, TeamSide::Away);
    }

    #[test]
    fn test_empty_document() {
        let doc = SquadDocument::parse("{}").unwrap();
        assert!(doc.ordered_entries(TeamSide::Home).is_empty());
    }
}
