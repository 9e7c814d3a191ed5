//! Wire types for the ranked backend API.

pub mod bulk;
pub mod common;
pub mod lobby;
pub mod matches;
pub mod notifications;
pub mod queue;
pub mod tournament;
pub mod validation;

pub use common::{CourtId, LobbyId, MatchId, MatchType, TournamentId, UserId, UserSummary};
