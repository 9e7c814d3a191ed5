//! Immutable per-court snapshot assembled from one complete round of fetches.

use indexmap::{IndexMap, map::Entry};
use tracing::warn;

use crate::dto::{
    CourtId, LobbyId, MatchId, TournamentId, UserId,
    lobby::CourtLobbiesResponse,
    matches::MatchDto,
    queue::QueueEntryDto,
    tournament::TournamentDto,
};
use crate::state::model::{Lobby, Match, QueueEntry, Tournament};

/// Raw collections returned by the court endpoints, before reconciliation.
#[derive(Debug, Clone, Default)]
pub struct CourtFeeds {
    pub queue: Vec<QueueEntryDto>,
    pub active: Vec<MatchDto>,
    /// Viewer-scoped pending confirmations across every court.
    pub pending: Vec<MatchDto>,
    pub lobbies: CourtLobbiesResponse,
    pub live: Vec<TournamentDto>,
    pub upcoming: Vec<TournamentDto>,
    pub completed: Vec<TournamentDto>,
}

/// Everything ranked happening on one court, as of the last successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct CourtSnapshot {
    pub court_id: CourtId,
    pub queue: Vec<QueueEntry>,
    pub matches: IndexMap<MatchId, Match>,
    pub lobbies: IndexMap<LobbyId, Lobby>,
    pub tournaments: IndexMap<TournamentId, Tournament>,
}

impl CourtSnapshot {
    /// Snapshot shown before the first load and after the session is cleared.
    pub fn empty(court_id: CourtId) -> Self {
        Self {
            court_id,
            queue: Vec::new(),
            matches: IndexMap::new(),
            lobbies: IndexMap::new(),
            tournaments: IndexMap::new(),
        }
    }

    /// Reconcile the raw feeds into one snapshot.
    ///
    /// Queue entries are unique per user (earliest join wins), a match listed both as active and
    /// as pending appears once (the active copy wins), and pending matches of other courts are
    /// dropped. Items that fail conversion are logged and skipped.
    pub fn assemble(court_id: CourtId, feeds: CourtFeeds) -> Self {
        let mut snapshot = Self::empty(court_id);

        let mut queue: IndexMap<UserId, QueueEntry> = IndexMap::new();
        for entry in feeds.queue.into_iter().map(QueueEntry::from) {
            match queue.entry(entry.user_id) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    warn!(
                        court_id = %court_id,
                        user_id = %entry.user_id,
                        "duplicate queue entry from backend; keeping the earliest"
                    );
                    if joined_earlier(&entry, slot.get()) {
                        slot.insert(entry);
                    }
                }
            }
        }
        snapshot.queue = queue.into_values().collect();

        let pending = feeds
            .pending
            .into_iter()
            .filter(|dto| dto.court_id == court_id);
        for dto in feeds.active.into_iter().chain(pending) {
            let id = dto.id;
            match Match::try_from(dto) {
                Ok(game) => {
                    snapshot.matches.entry(id).or_insert(game);
                }
                Err(err) => warn!(
                    court_id = %court_id,
                    match_id = %id,
                    error = %err,
                    "skipping match"
                ),
            }
        }

        for dto in feeds.lobbies.into_all() {
            let id = dto.id;
            match Lobby::try_from(dto) {
                Ok(lobby) => {
                    snapshot.lobbies.entry(id).or_insert(lobby);
                }
                Err(err) => warn!(
                    court_id = %court_id,
                    lobby_id = %id,
                    error = %err,
                    "skipping lobby"
                ),
            }
        }

        for dto in feeds
            .live
            .into_iter()
            .chain(feeds.upcoming)
            .chain(feeds.completed)
        {
            let id = dto.id;
            match Tournament::try_from(dto) {
                Ok(tournament) => {
                    snapshot.tournaments.entry(id).or_insert(tournament);
                }
                Err(err) => warn!(
                    court_id = %court_id,
                    tournament_id = %id,
                    error = %err,
                    "skipping tournament"
                ),
            }
        }

        snapshot
    }

    /// The viewer's own queue entry on this court.
    pub fn queue_entry_of(&self, user_id: UserId) -> Option<&QueueEntry> {
        self.queue.iter().find(|entry| entry.user_id == user_id)
    }
}

fn joined_earlier(candidate: &QueueEntry, current: &QueueEntry) -> bool {
    match (candidate.joined_at, current.joined_at) {
        (Some(candidate), Some(current)) => candidate < current,
        (Some(_), None) => true,
        _ => false,
    }
}
