//! Read-side visibility and entry edit rights
//!
//! The database has no row-level security; every list/get path in the
//! services asks this module what the actor may see.
//!
//! | Artifact       | Level 1             | Level 2 | Level 3 |
//! |----------------|---------------------|---------|---------|
//! | MatchReport    | own                 | all     | all     |
//! | Intelligence   | all                 | all     | all     |
//! | OfferedPlayer  | all                 | all     | all     |
//! | Shortlist      | own                 | all     | all     |
//! | ShortlistEntry | via visible list    | all     | all     |

use crate::identity::{AccessLevel, Actor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    MatchReport,
    Intelligence,
    OfferedPlayer,
    Shortlist,
    ShortlistEntry,
}

/// What part of an artifact family the actor may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Only rows owned by this user (for entries: rows in lists they own)
    OwnedBy(i64),
}

impl Scope {
    /// Whether a row owned by `owner_id` is inside the scope
    pub fn admits(&self, owner_id: i64) -> bool {
        match self {
            Scope::All => true,
            Scope::OwnedBy(user_id) => *user_id == owner_id,
        }
    }

    /// Owner filter value for SQL of the form `(? IS NULL OR owner = ?)`
    pub fn owner_filter(&self) -> Option<i64> {
        match self {
            Scope::All => None,
            Scope::OwnedBy(user_id) => Some(*user_id),
        }
    }
}

pub fn scope_for(actor: &Actor, artifact: Artifact) -> Scope {
    match artifact {
        Artifact::Intelligence | Artifact::OfferedPlayer => Scope::All,
        Artifact::MatchReport | Artifact::Shortlist | Artifact::ShortlistEntry => {
            if actor.level == AccessLevel::Scout {
                Scope::OwnedBy(actor.user_id)
            } else {
                Scope::All
            }
        }
    }
}

/// Update/delete rights on shortlist entries: level 3, or owner of the list
pub fn can_manage_entries(actor: &Actor, shortlist_owner_id: i64) -> bool {
    actor.level == AccessLevel::Manager || actor.user_id == shortlist_owner_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(level: AccessLevel) -> Actor {
        Actor::new(4, "Tester", level)
    }

    #[test]
    fn test_scout_sees_own_reports_and_shortlists() {
        let scout = actor(AccessLevel::Scout);
        assert_eq!(scope_for(&scout, Artifact::MatchReport), Scope::OwnedBy(4));
        assert_eq!(scope_for(&scout, Artifact::Shortlist), Scope::OwnedBy(4));
        assert_eq!(scope_for(&scout, Artifact::ShortlistEntry), Scope::OwnedBy(4));
        assert_eq!(scope_for(&scout, Artifact::Intelligence), Scope::All);
        assert_eq!(scope_for(&scout, Artifact::OfferedPlayer), Scope::All);
    }

    #[test]
    fn test_higher_levels_see_everything() {
        for level in [AccessLevel::Analyst, AccessLevel::Manager] {
            let a = actor(level);
            for artifact in [
                Artifact::MatchReport,
                Artifact::Intelligence,
                Artifact::OfferedPlayer,
                Artifact::Shortlist,
                Artifact::ShortlistEntry,
            ] {
                assert_eq!(scope_for(&a, artifact), Scope::All);
            }
        }
    }

    #[test]
    fn test_scope_admits() {
        assert!(Scope::All.admits(9));
        assert!(Scope::OwnedBy(4).admits(4));
        assert!(!Scope::OwnedBy(4).admits(9));
    }

    #[test]
    fn test_entry_management_rights() {
        assert!(can_manage_entries(&actor(AccessLevel::Manager), 9));
        assert!(can_manage_entries(&actor(AccessLevel::Scout), 4));
        assert!(!can_manage_entries(&actor(AccessLevel::Analyst), 9));
    }
}
