//! Option sets (enumeration tables)
//!
//! `opties_posities`, `opties_advies` and `opties_profielen` are maintained
//! by staff. Deployed databases differ in column naming (`waarde` vs `id`
//! for the value, `label` vs `naam` for the caption), so the reader detects
//! the columns per table. An empty or unreadable table falls back to the
//! compiled defaults below.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use scoutdesk_common::db::{Store, Table};

use crate::cache::{Family, ReadCache};

const DEFAULT_POSITIONS: &[(&str, &str)] = &[
    ("GK", "Keeper"),
    ("CB", "Centrale verdediger"),
    ("RB", "Rechtsback"),
    ("LB", "Linksback"),
    ("DM", "Verdedigende middenvelder"),
    ("CM", "Centrale middenvelder"),
    ("ACM", "Aanvallende middenvelder"),
    ("RW", "Rechtsbuiten"),
    ("LW", "Linksbuiten"),
    ("FW", "Spits"),
];

const DEFAULT_VERDICTS: &[(&str, &str)] = &[
    ("A", "Direct halen"),
    ("B", "Volgen"),
    ("C", "Twijfel"),
    ("D", "Niet interessant"),
];

const DEFAULT_PROFILES: &[(&str, &str)] = &[
    ("BALL_PLAYING_CB", "Opbouwende centrale verdediger"),
    ("BOX_TO_BOX", "Box-to-box middenvelder"),
    ("DEEP_PLAYMAKER", "Diepe spelmaker"),
    ("INVERTED_WINGER", "Inverted winger"),
    ("TARGET_MAN", "Targetman"),
    ("SWEEPER_KEEPER", "Meevoetballende keeper"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Positions,
    Verdicts,
    Profiles,
}

impl OptionKind {
    fn table(self) -> &'static str {
        match self {
            OptionKind::Positions => "opties_posities",
            OptionKind::Verdicts => "opties_advies",
            OptionKind::Profiles => "opties_profielen",
        }
    }

    fn defaults(self) -> &'static [(&'static str, &'static str)] {
        match self {
            OptionKind::Positions => DEFAULT_POSITIONS,
            OptionKind::Verdicts => DEFAULT_VERDICTS,
            OptionKind::Profiles => DEFAULT_PROFILES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    pub items: Vec<OptionItem>,
    /// True when the table was empty or unreadable
    pub from_defaults: bool,
}

impl OptionSet {
    fn defaults(kind: OptionKind) -> Self {
        Self {
            items: kind
                .defaults()
                .iter()
                .map(|(value, label)| OptionItem {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            from_defaults: true,
        }
    }

    /// Exact membership of a canonical value
    pub fn contains(&self, value: &str) -> bool {
        self.items.iter().any(|item| item.value == value)
    }

    /// Match a raw string against values and labels, case-insensitively,
    /// returning the canonical value
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let needle = raw.trim();
        if needle.is_empty() {
            return None;
        }
        self.items
            .iter()
            .find(|item| item.value.eq_ignore_ascii_case(needle))
            .or_else(|| {
                self.items
                    .iter()
                    .find(|item| item.label.eq_ignore_ascii_case(needle))
            })
            .map(|item| item.value.clone())
    }

    pub fn values(&self) -> Vec<String> {
        self.items.iter().map(|item| item.value.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSets {
    pub positions: OptionSet,
    pub verdicts: OptionSet,
    pub profiles: OptionSet,
}

/// Read one option table, tolerating column-name variance
pub async fn load_option_set(store: &Store, kind: OptionKind) -> OptionSet {
    let table = store
        .query_lenient(&format!("SELECT * FROM {}", kind.table()), &[])
        .await;

    let items = items_from_table(&table);
    if items.is_empty() {
        debug!(table = kind.table(), "Option table empty, using defaults");
        return OptionSet::defaults(kind);
    }
    OptionSet {
        items,
        from_defaults: false,
    }
}

fn items_from_table(table: &Table) -> Vec<OptionItem> {
    let value_col = ["waarde", "id", "value"]
        .into_iter()
        .find(|c| table.has_column(c));
    let Some(value_col) = value_col else {
        return Vec::new();
    };
    let label_col = ["label", "naam", "name"]
        .into_iter()
        .find(|c| table.has_column(c));

    (0..table.len())
        .filter_map(|row| {
            let value = table.text(row, value_col)?.trim().to_string();
            if value.is_empty() {
                return None;
            }
            let label = label_col
                .and_then(|c| table.text(row, c))
                .unwrap_or_else(|| value.clone());
            Some(OptionItem { value, label })
        })
        .collect()
}

/// Cached access to all option sets
#[derive(Clone)]
pub struct OptionService {
    store: Store,
    cache: Arc<ReadCache>,
}

impl OptionService {
    pub fn new(store: Store, cache: Arc<ReadCache>) -> Self {
        Self { store, cache }
    }

    pub async fn load_all(&self) -> OptionSets {
        if let Some(sets) = self.cache.get::<OptionSets>(Family::Options, "all").await {
            return sets;
        }
        let sets = OptionSets {
            positions: load_option_set(&self.store, OptionKind::Positions).await,
            verdicts: load_option_set(&self.store, OptionKind::Verdicts).await,
            profiles: load_option_set(&self.store, OptionKind::Profiles).await,
        };
        self.cache.put(Family::Options, "all", &sets).await;
        sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoutdesk_common::db::init_memory_database;

    async fn store() -> Store {
        Store::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_empty_tables_fall_back_to_defaults() {
        let store = store().await;
        let positions = load_option_set(&store, OptionKind::Positions).await;
        assert!(positions.from_defaults);
        assert!(positions.contains("CM"));
        assert_eq!(positions.items.len(), 10);

        let verdicts = load_option_set(&store, OptionKind::Verdicts).await;
        assert!(verdicts.contains("A"));
    }

    #[tokio::test]
    async fn test_reads_id_and_naam_variants() {
        let store = store().await;
        store
            .command("INSERT INTO opties_advies (id, label) VALUES ('TOP', 'Toptalent')", &[])
            .await
            .unwrap();
        store
            .command("INSERT INTO opties_profielen (waarde, naam) VALUES ('P1', 'Profiel 1')", &[])
            .await
            .unwrap();

        let verdicts = load_option_set(&store, OptionKind::Verdicts).await;
        assert!(!verdicts.from_defaults);
        assert_eq!(verdicts.values(), vec!["TOP"]);

        let profiles = load_option_set(&store, OptionKind::Profiles).await;
        assert_eq!(profiles.items[0].label, "Profiel 1");
    }

    #[tokio::test]
    async fn test_tolerates_renamed_table_schema() {
        let store = store().await;
        store.command("DROP TABLE opties_posities", &[]).await.unwrap();
        store
            .command("CREATE TABLE opties_posities (id TEXT, naam TEXT)", &[])
            .await
            .unwrap();
        store
            .command("INSERT INTO opties_posities (id, naam) VALUES ('ST', 'Striker')", &[])
            .await
            .unwrap();

        let positions = load_option_set(&store, OptionKind::Positions).await;
        assert_eq!(positions.resolve("striker").as_deref(), Some("ST"));
    }

    #[test]
    fn test_resolve_by_value_or_label() {
        let set = OptionSet::defaults(OptionKind::Positions);
        assert_eq!(set.resolve("cm").as_deref(), Some("CM"));
        assert_eq!(set.resolve("Spits").as_deref(), Some("FW"));
        assert_eq!(set.resolve("libero"), None);
        assert_eq!(set.resolve(""), None);
    }
}
