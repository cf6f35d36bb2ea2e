//! Authoring services
//!
//! Each service validates input, enforces visibility through
//! `crate::visibility`, writes through the Store and invalidates its cache
//! family before returning.

pub mod intelligence;
pub mod offers;
pub mod reports;
pub mod shortlists;

pub use intelligence::{Dossier, DossierPayload, IntelligenceService};
pub use offers::{Offer, OfferPayload, OfferStatus, OffersService};
pub use reports::{
    MatchPlayer, MatchReport, PlayerSource, ReportDraft, ReportFilter, ReportPayload, ReportService,
    UpsertOutcome,
};
pub use shortlists::{
    EntryChanges, NewEntry, Position, Priority, Shortlist, ShortlistEntry, ShortlistService,
};
