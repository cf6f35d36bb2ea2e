//! Dual identity references
//!
//! Every artifact that points into the upstream catalog carries either an
//! upstream id or a free-text name typed by staff ("manual" branch). At the
//! service boundary this is a tagged variant; at the Store boundary it is
//! flattened to an `(id, custom_name)` column pair where exactly one is set.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

macro_rules! dual_ref {
    ($(#[$meta:meta])* $name:ident, $what:literal, $id_col:literal, $custom_col:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "value", rename_all = "snake_case")]
        pub enum $name {
            /// Upstream catalog id
            Known(String),
            /// Free-text name for entities absent from the catalog
            Custom(String),
        }

        impl $name {
            /// Build from the two stored columns. Blank strings count as absent.
            pub fn from_columns(id: Option<String>, custom: Option<String>) -> Result<Self> {
                match (non_blank(id), non_blank(custom)) {
                    (Some(id), None) => Ok(Self::Known(id)),
                    (None, Some(name)) => Ok(Self::Custom(name)),
                    (Some(_), Some(_)) => Err(Error::Validation(format!(
                        "{}: set either {} or {}, not both",
                        $what, $id_col, $custom_col
                    ))),
                    (None, None) => Err(Error::Validation(format!(
                        "{}: one of {} or {} is required",
                        $what, $id_col, $custom_col
                    ))),
                }
            }

            /// Upstream id, if this is a catalog reference
            pub fn id(&self) -> Option<&str> {
                match self {
                    Self::Known(id) => Some(id),
                    Self::Custom(_) => None,
                }
            }

            /// Free-text name, if this is a manual reference
            pub fn custom_name(&self) -> Option<&str> {
                match self {
                    Self::Known(_) => None,
                    Self::Custom(name) => Some(name),
                }
            }

            /// Coalesced key value (`coalesce(id, custom_name)`)
            pub fn key(&self) -> &str {
                match self {
                    Self::Known(v) | Self::Custom(v) => v,
                }
            }

            pub fn is_known(&self) -> bool {
                matches!(self, Self::Known(_))
            }
        }
    };
}

dual_ref!(
    /// Reference to a player: upstream `player_id` or `custom_player_name`
    PlayerRef,
    "player",
    "player_id",
    "custom_player_name"
);

dual_ref!(
    /// Reference to a match: upstream `match_id` or `custom_match_name`
    MatchRef,
    "match",
    "match_id",
    "custom_match_name"
);

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
