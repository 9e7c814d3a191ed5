//! Sorts a court snapshot into what the viewer must do, what they are waiting on, and the rest.

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::dto::{
    CourtId, LobbyId, MatchId, TournamentId, UserId, lobby::AcceptanceStatus,
    tournament::{ParticipantStatus, TournamentStatusDto},
};
use crate::state::{
    guards::GuardViolation,
    lifecycle::{ActionKind, TournamentLifecycle},
    model::{Lobby, LobbyStatus, Match, MatchStatus, QueueEntry, Tournament},
    snapshot::CourtSnapshot,
};

/// Identity of a classified item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemKey {
    Match(MatchId),
    Lobby(LobbyId),
    Queue(UserId),
    Tournament(TournamentId),
}

/// Items that cannot move until the viewer acts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeedsMyAction {
    pub enter_score: Vec<Match>,
    pub confirm_reject: Vec<Match>,
    pub respond_invitations: Vec<Lobby>,
    pub start_ready: Vec<Lobby>,
}

impl NeedsMyAction {
    pub fn len(&self) -> usize {
        self.enter_score.len()
            + self.confirm_reject.len()
            + self.respond_invitations.len()
            + self.start_ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Items where the viewer already did their part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwaitingOthers {
    pub matches: Vec<Match>,
    pub lobbies: Vec<Lobby>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Informational {
    pub matches: Vec<Match>,
    pub lobbies: Vec<Lobby>,
    /// The viewer's ready games whose slot has not come yet.
    pub scheduled: Vec<Lobby>,
    pub queue: Vec<QueueEntry>,
    pub tournaments: Vec<Tournament>,
}

/// Count of tournaments per status on the court.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TournamentBreakdown {
    pub live: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Classification of one court snapshot for one viewer. Never cached across refreshes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub court_id: CourtId,
    pub viewer: Option<UserId>,
    pub needs_my_action: NeedsMyAction,
    pub awaiting_others: AwaitingOthers,
    pub informational: Informational,
    pub tournaments: TournamentBreakdown,
}

impl ClassificationResult {
    /// Badge count: everything waiting on the viewer.
    pub fn pending_action_count(&self) -> usize {
        self.needs_my_action.len()
    }

    /// Every classified item with the bucket it landed in.
    pub fn item_keys(&self) -> Vec<(Bucket, ItemKey)> {
        let needs = &self.needs_my_action;
        let matches = |bucket: Bucket, list: &[Match]| {
            list.iter()
                .map(move |game| (bucket, ItemKey::Match(game.id)))
                .collect::<Vec<_>>()
        };
        let lobbies = |bucket: Bucket, list: &[Lobby]| {
            list.iter()
                .map(move |lobby| (bucket, ItemKey::Lobby(lobby.id)))
                .collect::<Vec<_>>()
        };

        let mut keys = Vec::new();
        keys.extend(matches(Bucket::EnterScore, &needs.enter_score));
        keys.extend(matches(Bucket::ConfirmReject, &needs.confirm_reject));
        keys.extend(lobbies(Bucket::RespondInvitations, &needs.respond_invitations));
        keys.extend(lobbies(Bucket::StartReady, &needs.start_ready));
        keys.extend(matches(Bucket::AwaitingOthers, &self.awaiting_others.matches));
        keys.extend(lobbies(Bucket::AwaitingOthers, &self.awaiting_others.lobbies));
        keys.extend(matches(Bucket::Informational, &self.informational.matches));
        keys.extend(lobbies(Bucket::Informational, &self.informational.lobbies));
        keys.extend(lobbies(Bucket::Scheduled, &self.informational.scheduled));
        keys.extend(
            self.informational
                .queue
                .iter()
                .map(|entry| (Bucket::Informational, ItemKey::Queue(entry.user_id))),
        );
        keys.extend(
            self.informational
                .tournaments
                .iter()
                .map(|tournament| (Bucket::Informational, ItemKey::Tournament(tournament.id))),
        );
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    EnterScore,
    ConfirmReject,
    RespondInvitations,
    StartReady,
    AwaitingOthers,
    Scheduled,
    Informational,
}

/// Classify `snapshot` for `viewer` at `now`. An anonymous viewer gets informational items only.
pub fn classify(
    snapshot: &CourtSnapshot,
    viewer: Option<UserId>,
    now: PrimitiveDateTime,
) -> ClassificationResult {
    let mut result = ClassificationResult {
        court_id: snapshot.court_id,
        viewer,
        needs_my_action: NeedsMyAction::default(),
        awaiting_others: AwaitingOthers::default(),
        informational: Informational::default(),
        tournaments: TournamentBreakdown::default(),
    };

    for game in snapshot.matches.values() {
        if !game.is_open() {
            continue;
        }
        let Some(viewer) = viewer.filter(|viewer| game.is_player(*viewer)) else {
            result.informational.matches.push(game.clone());
            continue;
        };
        match game.status {
            MatchStatus::InProgress => result.needs_my_action.enter_score.push(game.clone()),
            MatchStatus::PendingConfirmation { .. } if game.has_confirmed(viewer) => {
                result.awaiting_others.matches.push(game.clone())
            }
            MatchStatus::PendingConfirmation { .. } => {
                result.needs_my_action.confirm_reject.push(game.clone())
            }
            MatchStatus::Completed { .. } | MatchStatus::Cancelled => {}
        }
    }

    for lobby in snapshot.lobbies.values() {
        let acceptance = viewer.and_then(|viewer| lobby.acceptance_of(viewer));
        match (lobby.status, acceptance) {
            (LobbyStatus::Started { .. } | LobbyStatus::Void(_), _) => {}
            (LobbyStatus::PendingAcceptance, Some(AcceptanceStatus::Pending)) => {
                result.needs_my_action.respond_invitations.push(lobby.clone())
            }
            (LobbyStatus::PendingAcceptance, Some(AcceptanceStatus::Accepted)) => {
                result.awaiting_others.lobbies.push(lobby.clone())
            }
            (LobbyStatus::Ready, Some(AcceptanceStatus::Accepted)) if lobby.is_due(now) => {
                result.needs_my_action.start_ready.push(lobby.clone())
            }
            (LobbyStatus::Ready, Some(AcceptanceStatus::Accepted)) => {
                result.informational.scheduled.push(lobby.clone())
            }
            _ => result.informational.lobbies.push(lobby.clone()),
        }
    }

    result.informational.queue = snapshot.queue.clone();

    for tournament in snapshot.tournaments.values() {
        match tournament.status {
            TournamentStatusDto::Live => result.tournaments.live += 1,
            TournamentStatusDto::Upcoming => result.tournaments.upcoming += 1,
            TournamentStatusDto::Completed => result.tournaments.completed += 1,
            TournamentStatusDto::Cancelled => result.tournaments.cancelled += 1,
        }
        result.informational.tournaments.push(tournament.clone());
    }

    result
}

/// Actions on one tournament, split the same way as court items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TournamentActions {
    /// Join, answer an invitation, check in, or (host) start.
    pub needs_action: Vec<ActionKind>,
    /// Allowed but never urgent.
    pub available: Vec<ActionKind>,
    /// Host-only management.
    pub host_management: Vec<ActionKind>,
    /// What the viewer is waiting for, when nothing is asked of them.
    pub awaiting: Option<String>,
    /// Why the host cannot start yet.
    pub start_blocked: Option<GuardViolation>,
}

/// Classify a tournament detail for `viewer`.
pub fn classify_tournament(tournament: &Tournament, viewer: Option<UserId>) -> TournamentActions {
    let mut actions = TournamentActions::default();
    let Some(viewer) = viewer else {
        return actions;
    };

    let lifecycle = TournamentLifecycle::from(tournament);
    for action in lifecycle.actions(viewer) {
        match action {
            ActionKind::JoinTournament
            | ActionKind::AcceptTournamentInvite
            | ActionKind::DeclineTournamentInvite
            | ActionKind::CheckIn
            | ActionKind::StartTournament => actions.needs_action.push(action),
            ActionKind::Withdraw => actions.available.push(action),
            _ => actions.host_management.push(action),
        }
    }

    let upcoming = tournament.status == TournamentStatusDto::Upcoming;
    if tournament.is_host(viewer) && upcoming {
        actions.start_blocked = lifecycle.start_blocker();
        if let Some(reason) = &actions.start_blocked {
            actions.awaiting = Some(format!("Waiting for registrations: {reason}"));
        }
    } else if upcoming && actions.needs_action.is_empty() {
        let status = tournament
            .participation(viewer)
            .map(|participant| participant.status);
        if status.is_some_and(ParticipantStatus::is_registered) {
            actions.awaiting = Some("Registered; waiting for the host to start".into());
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use indexmap::IndexMap;
    use time::{Duration, macros::datetime};

    use super::*;
    use crate::dto::{MatchType, lobby::LobbySource};
    use crate::state::{
        guards::Score,
        model::{LobbyPlayer, MatchPlayer, Side, VoidReason},
    };

    fn game(id: i64, status: MatchStatus, players: &[(i64, Side, bool)]) -> Match {
        Match {
            id: MatchId(id),
            court_id: CourtId(1),
            match_type: if players.len() > 2 {
                MatchType::Doubles
            } else {
                MatchType::Singles
            },
            status,
            players: players
                .iter()
                .map(|(user, side, confirmed)| MatchPlayer {
                    user_id: UserId(*user),
                    side: *side,
                    confirmed: *confirmed,
                    elo_change: None,
                    name: format!("p{user}"),
                })
                .collect(),
            tournament_id: None,
            bracket_round: None,
            created_at: None,
        }
    }

    fn lobby(id: i64, status: LobbyStatus, players: &[(i64, AcceptanceStatus)]) -> Lobby {
        Lobby {
            id: LobbyId(id),
            court_id: CourtId(1),
            created_by: players.first().map(|(user, _)| UserId(*user)),
            match_type: MatchType::Doubles,
            source: LobbySource::CourtChallenge,
            scheduled_for: None,
            status,
            players: players
                .iter()
                .enumerate()
                .map(|(index, (user, acceptance))| LobbyPlayer {
                    user_id: UserId(*user),
                    side: if index % 2 == 0 { Side::Team1 } else { Side::Team2 },
                    acceptance: *acceptance,
                    name: format!("p{user}"),
                })
                .collect(),
        }
    }

    const NOW: PrimitiveDateTime = datetime!(2025-05-01 18:00);

    fn pending(score: (i64, i64)) -> MatchStatus {
        MatchStatus::PendingConfirmation {
            score: Score::new(score.0, score.1).unwrap(),
            submitted_by: Some(UserId(1)),
        }
    }

    fn snapshot(matches: Vec<Match>, lobbies: Vec<Lobby>) -> CourtSnapshot {
        let mut snapshot = CourtSnapshot::empty(CourtId(1));
        snapshot.matches = matches
            .into_iter()
            .map(|game| (game.id, game))
            .collect::<IndexMap<_, _>>();
        snapshot.lobbies = lobbies
            .into_iter()
            .map(|lobby| (lobby.id, lobby))
            .collect();
        snapshot
    }

    #[test]
    fn doubles_confirmation_badge_for_teammate() {
        use Side::{Team1, Team2};
        let game = game(
            1,
            pending((11, 7)),
            &[(1, Team1, true), (2, Team1, false), (3, Team2, false), (4, Team2, false)],
        );
        let snapshot = snapshot(vec![game], vec![]);

        let for_b = classify(&snapshot, Some(UserId(2)), NOW);
        assert_eq!(for_b.needs_my_action.confirm_reject.len(), 1);
        assert_eq!(for_b.pending_action_count(), 1);

        let for_a = classify(&snapshot, Some(UserId(1)), NOW);
        assert_eq!(for_a.awaiting_others.matches.len(), 1);
        assert_eq!(for_a.pending_action_count(), 0);

        let spectator = classify(&snapshot, Some(UserId(9)), NOW);
        assert_eq!(spectator.informational.matches.len(), 1);
        assert_eq!(spectator.pending_action_count(), 0);
    }

    #[test]
    fn lobby_respond_and_awaiting_split() {
        use AcceptanceStatus::{Accepted, Pending};
        let lobby = lobby(
            5,
            LobbyStatus::PendingAcceptance,
            &[(1, Accepted), (2, Pending), (3, Pending), (4, Pending)],
        );
        let snapshot = snapshot(vec![], vec![lobby]);

        let for_b = classify(&snapshot, Some(UserId(2)), NOW);
        assert_eq!(for_b.needs_my_action.respond_invitations.len(), 1);

        let for_a = classify(&snapshot, Some(UserId(1)), NOW);
        assert_eq!(for_a.awaiting_others.lobbies.len(), 1);
        assert!(for_a.needs_my_action.is_empty());
    }

    #[test]
    fn anonymous_viewer_gets_no_action_buckets() {
        let players = [(1, Side::Team1, false), (2, Side::Team2, false)];
        let snapshot = snapshot(
            vec![game(1, MatchStatus::InProgress, &players)],
            vec![lobby(2, LobbyStatus::Ready, &[(1, AcceptanceStatus::Accepted)])],
        );
        let result = classify(&snapshot, None, NOW);
        assert_eq!(result.pending_action_count(), 0);
        assert!(result.awaiting_others.matches.is_empty());
        assert_eq!(result.informational.matches.len(), 1);
        assert_eq!(result.informational.lobbies.len(), 1);
    }

    #[test]
    fn scheduled_ready_lobby_joins_the_badge_when_due() {
        let mut ready = lobby(
            6,
            LobbyStatus::Ready,
            &[(3, AcceptanceStatus::Accepted), (4, AcceptanceStatus::Accepted)],
        );
        ready.scheduled_for = Some(datetime!(2025-05-01 19:00));
        let snapshot = snapshot(vec![], vec![ready]);

        let early = classify(&snapshot, Some(UserId(3)), NOW);
        assert_eq!(early.pending_action_count(), 0);
        assert_eq!(early.informational.scheduled.len(), 1);
        assert_eq!(
            early.item_keys(),
            vec![(Bucket::Scheduled, ItemKey::Lobby(LobbyId(6)))]
        );

        let due = classify(&snapshot, Some(UserId(3)), NOW + Duration::hours(1));
        assert_eq!(due.pending_action_count(), 1);
        assert_eq!(due.needs_my_action.start_ready.len(), 1);
        assert!(due.informational.scheduled.is_empty());

        let spectator = classify(&snapshot, Some(UserId(9)), NOW);
        assert_eq!(spectator.informational.lobbies.len(), 1);
        assert!(spectator.informational.scheduled.is_empty());
    }

    #[test]
    fn finished_items_land_nowhere() {
        let players = [(1, Side::Team1, true), (2, Side::Team2, true)];
        let snapshot = snapshot(
            vec![
                game(
                    1,
                    MatchStatus::Completed {
                        score: Score::new(11, 2).unwrap(),
                        winner: Side::Team1,
                    },
                    &players,
                ),
                game(2, MatchStatus::Cancelled, &players),
            ],
            vec![
                lobby(
                    3,
                    LobbyStatus::Void(VoidReason::Expired),
                    &[(1, AcceptanceStatus::Pending)],
                ),
                lobby(
                    4,
                    LobbyStatus::Started { match_id: None },
                    &[(1, AcceptanceStatus::Accepted)],
                ),
            ],
        );
        assert!(classify(&snapshot, Some(UserId(1)), NOW).item_keys().is_empty());
    }

    /// Every combination of viewer, match status and confirmation over a small domain: each open
    /// item lands in exactly one bucket and the badge equals the needs-action total.
    #[test]
    fn no_item_is_counted_twice() {
        use AcceptanceStatus::{Accepted, Declined, Pending};
        let match_statuses = [MatchStatus::InProgress, pending((11, 3))];
        let lobby_statuses = [LobbyStatus::PendingAcceptance, LobbyStatus::Ready];
        let acceptances = [Pending, Accepted, Declined];

        let needs_action = |bucket: &Bucket| {
            !matches!(
                bucket,
                Bucket::AwaitingOthers | Bucket::Scheduled | Bucket::Informational
            )
        };

        for viewer in [None, Some(1), Some(2), Some(9)] {
            for status in &match_statuses {
                for confirmed in [false, true] {
                    for lobby_status in lobby_statuses {
                        for first in acceptances {
                            for second in acceptances {
                                let snapshot = snapshot(
                                    vec![
                                        game(
                                            1,
                                            status.clone(),
                                            &[(1, Side::Team1, confirmed), (2, Side::Team2, false)],
                                        ),
                                        game(
                                            2,
                                            status.clone(),
                                            &[
                                                (2, Side::Team1, !confirmed),
                                                (3, Side::Team2, false),
                                            ],
                                        ),
                                    ],
                                    vec![lobby(3, lobby_status, &[(1, first), (2, second)])],
                                );
                                let result = classify(&snapshot, viewer.map(UserId), NOW);
                                let keys = result.item_keys();
                                let unique: HashSet<ItemKey> =
                                    keys.iter().map(|(_, key)| *key).collect();

                                assert_eq!(unique.len(), keys.len(), "{viewer:?} {keys:?}");
                                assert_eq!(unique.len(), 3);
                                let needs =
                                    keys.iter().filter(|(bucket, _)| needs_action(bucket)).count();
                                assert_eq!(result.pending_action_count(), needs);
                                if viewer.is_none() {
                                    assert_eq!(needs, 0);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
