//! The ranked lifecycles: queue presence, matches, challenge lobbies and tournaments.
//!
//! Each lifecycle is rebuilt from the latest snapshot before an intent is planned, so the local
//! machine never drifts from the server; it only decides what may be attempted.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use time::PrimitiveDateTime;

use crate::dto::{
    MatchType, UserId,
    lobby::{AcceptanceStatus, RespondAction},
    tournament::{AccessMode, InviteStatus, ParticipantStatus, TournamentStatusDto},
};
use crate::state::{
    guards::{GuardViolation, Score, check_teams, is_power_of_two},
    model::{Lobby, LobbyStatus, Match, MatchStatus, Side, Tournament},
    state_machine::{Lifecycle, Refusal},
};

/// Every control the action center can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    JoinQueue(MatchType),
    LeaveQueue,
    EnterScore,
    ConfirmScore,
    RejectScore,
    CancelMatch,
    AcceptChallenge,
    DeclineChallenge,
    StartGame,
    JoinTournament,
    AcceptTournamentInvite,
    DeclineTournamentInvite,
    CheckIn,
    Withdraw,
    StartTournament,
    InvitePlayers,
    CancelTournament,
    MarkNoShow(UserId),
    ViewTournament,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::JoinQueue(MatchType::Singles) => "Join singles queue",
            ActionKind::JoinQueue(MatchType::Doubles) => "Join doubles queue",
            ActionKind::LeaveQueue => "Leave queue",
            ActionKind::EnterScore => "Enter score",
            ActionKind::ConfirmScore => "Confirm",
            ActionKind::RejectScore => "Reject",
            ActionKind::CancelMatch => "Cancel match",
            ActionKind::AcceptChallenge => "Accept",
            ActionKind::DeclineChallenge => "Decline",
            ActionKind::StartGame => "Start game",
            ActionKind::JoinTournament => "Join",
            ActionKind::AcceptTournamentInvite => "Accept invite",
            ActionKind::DeclineTournamentInvite => "Decline invite",
            ActionKind::CheckIn => "Check in",
            ActionKind::Withdraw => "Withdraw",
            ActionKind::StartTournament => "Start tournament",
            ActionKind::InvitePlayers => "Invite players",
            ActionKind::CancelTournament => "Cancel tournament",
            ActionKind::MarkNoShow(_) => "Mark no-show",
            ActionKind::ViewTournament => "View",
        }
    }

    /// Tournament controls reserved to the host.
    pub fn is_host_only(&self) -> bool {
        matches!(
            self,
            ActionKind::StartTournament
                | ActionKind::InvitePlayers
                | ActionKind::CancelTournament
                | ActionKind::MarkNoShow(_)
        )
    }
}

// Queue presence

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    Absent,
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    Join(MatchType),
    Leave,
}

/// Whether the viewer is waiting in one court's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLifecycle {
    queued: Option<MatchType>,
}

impl QueueLifecycle {
    pub fn new(queued: Option<MatchType>) -> Self {
        Self { queued }
    }

    pub fn actions(&self) -> Vec<ActionKind> {
        let candidates = [
            (QueueEvent::Join(MatchType::Singles), ActionKind::JoinQueue(MatchType::Singles)),
            (QueueEvent::Join(MatchType::Doubles), ActionKind::JoinQueue(MatchType::Doubles)),
            (QueueEvent::Leave, ActionKind::LeaveQueue),
        ];
        offered(self, candidates)
    }
}

impl Lifecycle for QueueLifecycle {
    type Phase = QueuePhase;
    type Event = QueueEvent;

    fn phase(&self) -> QueuePhase {
        match self.queued {
            Some(_) => QueuePhase::Queued,
            None => QueuePhase::Absent,
        }
    }

    fn transition(&self, event: &QueueEvent) -> Result<Self, Refusal> {
        match (self.queued, event) {
            (None, QueueEvent::Join(match_type)) => Ok(Self::new(Some(*match_type))),
            (Some(_), QueueEvent::Join(_)) => Err(GuardViolation::AlreadyQueued.into()),
            (Some(_), QueueEvent::Leave) => Ok(Self::new(None)),
            (None, QueueEvent::Leave) => Err(GuardViolation::NotQueued.into()),
        }
    }
}

// Matches

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Queued,
    InProgress,
    PendingConfirmation,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    CreateMatch {
        match_type: MatchType,
        team1: Vec<UserId>,
        team2: Vec<UserId>,
    },
    SubmitScore {
        by: UserId,
        score: Score,
    },
    Confirm {
        by: UserId,
    },
    Reject {
        by: UserId,
    },
    Cancel {
        by: UserId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchStage {
    Queued,
    InProgress,
    PendingConfirmation {
        score: Score,
        confirmed: BTreeSet<UserId>,
    },
    Completed {
        score: Score,
    },
    Cancelled,
}

/// Ranked match from team assembly to final result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLifecycle {
    match_type: Option<MatchType>,
    team1: Vec<UserId>,
    team2: Vec<UserId>,
    stage: MatchStage,
}

impl MatchLifecycle {
    /// A match that has not been assembled yet.
    pub fn queued() -> Self {
        Self {
            match_type: None,
            team1: Vec::new(),
            team2: Vec::new(),
            stage: MatchStage::Queued,
        }
    }

    pub fn score(&self) -> Option<Score> {
        match &self.stage {
            MatchStage::PendingConfirmation { score, .. } | MatchStage::Completed { score } => {
                Some(*score)
            }
            _ => None,
        }
    }

    pub fn confirmed(&self) -> BTreeSet<UserId> {
        match &self.stage {
            MatchStage::PendingConfirmation { confirmed, .. } => confirmed.clone(),
            _ => BTreeSet::new(),
        }
    }

    fn is_player(&self, user_id: UserId) -> bool {
        self.team1.contains(&user_id) || self.team2.contains(&user_id)
    }

    fn player_count(&self) -> usize {
        self.team1.len() + self.team2.len()
    }

    fn require_player(&self, user_id: UserId) -> Result<(), GuardViolation> {
        if self.is_player(user_id) {
            Ok(())
        } else {
            Err(GuardViolation::NotAPlayer)
        }
    }

    fn with_stage(&self, stage: MatchStage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }

    /// Controls `viewer` may use on this match.
    pub fn actions(&self, viewer: UserId) -> Vec<ActionKind> {
        let candidates = [
            (
                MatchEvent::SubmitScore {
                    by: viewer,
                    score: Score::SAMPLE,
                },
                ActionKind::EnterScore,
            ),
            (MatchEvent::Confirm { by: viewer }, ActionKind::ConfirmScore),
            (MatchEvent::Reject { by: viewer }, ActionKind::RejectScore),
            (MatchEvent::Cancel { by: viewer }, ActionKind::CancelMatch),
        ];
        offered(self, candidates)
    }
}

impl From<&Match> for MatchLifecycle {
    fn from(game: &Match) -> Self {
        let stage = match &game.status {
            MatchStatus::InProgress => MatchStage::InProgress,
            MatchStatus::PendingConfirmation { score, .. } => MatchStage::PendingConfirmation {
                score: *score,
                confirmed: game
                    .players
                    .iter()
                    .filter(|player| player.confirmed)
                    .map(|player| player.user_id)
                    .collect(),
            },
            MatchStatus::Completed { score, .. } => MatchStage::Completed { score: *score },
            MatchStatus::Cancelled => MatchStage::Cancelled,
        };
        Self {
            match_type: Some(game.match_type),
            team1: game.team(Side::Team1),
            team2: game.team(Side::Team2),
            stage,
        }
    }
}

impl Lifecycle for MatchLifecycle {
    type Phase = MatchPhase;
    type Event = MatchEvent;

    fn phase(&self) -> MatchPhase {
        match self.stage {
            MatchStage::Queued => MatchPhase::Queued,
            MatchStage::InProgress => MatchPhase::InProgress,
            MatchStage::PendingConfirmation { .. } => MatchPhase::PendingConfirmation,
            MatchStage::Completed { .. } => MatchPhase::Completed,
            MatchStage::Cancelled => MatchPhase::Cancelled,
        }
    }

    fn transition(&self, event: &MatchEvent) -> Result<Self, Refusal> {
        match (&self.stage, event) {
            (
                MatchStage::Queued,
                MatchEvent::CreateMatch {
                    match_type,
                    team1,
                    team2,
                },
            ) => {
                check_teams(*match_type, team1, team2)?;
                Ok(Self {
                    match_type: Some(*match_type),
                    team1: team1.clone(),
                    team2: team2.clone(),
                    stage: MatchStage::InProgress,
                })
            }
            (MatchStage::InProgress, MatchEvent::SubmitScore { by, score }) => {
                self.require_player(*by)?;
                Ok(self.with_stage(MatchStage::PendingConfirmation {
                    score: *score,
                    confirmed: BTreeSet::from([*by]),
                }))
            }
            (MatchStage::PendingConfirmation { score, confirmed }, MatchEvent::Confirm { by }) => {
                self.require_player(*by)?;
                if confirmed.contains(by) {
                    return Err(GuardViolation::AlreadyConfirmed.into());
                }
                let mut confirmed = confirmed.clone();
                confirmed.insert(*by);
                let stage = if confirmed.len() == self.player_count() {
                    MatchStage::Completed { score: *score }
                } else {
                    MatchStage::PendingConfirmation {
                        score: *score,
                        confirmed,
                    }
                };
                Ok(self.with_stage(stage))
            }
            (MatchStage::PendingConfirmation { .. }, MatchEvent::Reject { by }) => {
                self.require_player(*by)?;
                Ok(self.with_stage(MatchStage::InProgress))
            }
            (
                MatchStage::InProgress | MatchStage::PendingConfirmation { .. },
                MatchEvent::Cancel { by },
            ) => {
                self.require_player(*by)?;
                Ok(self.with_stage(MatchStage::Cancelled))
            }
            _ => Err(Refusal::Illegal),
        }
    }
}

// Challenge lobbies

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPhase {
    Pending,
    Ready,
    Started,
    Void,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    Respond { by: UserId, action: RespondAction },
    Start { by: UserId, at: PrimitiveDateTime },
}

/// Challenge lobby: every invited player accepts, then any of them starts the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyLifecycle {
    phase: LobbyPhase,
    acceptance: IndexMap<UserId, AcceptanceStatus>,
    scheduled_for: Option<PrimitiveDateTime>,
}

impl LobbyLifecycle {
    pub fn acceptance_of(&self, user_id: UserId) -> Option<AcceptanceStatus> {
        self.acceptance.get(&user_id).copied()
    }

    /// Controls `viewer` may use on this lobby at `now`.
    pub fn actions(&self, viewer: UserId, now: PrimitiveDateTime) -> Vec<ActionKind> {
        let candidates = [
            (
                LobbyEvent::Respond {
                    by: viewer,
                    action: RespondAction::Accept,
                },
                ActionKind::AcceptChallenge,
            ),
            (
                LobbyEvent::Respond {
                    by: viewer,
                    action: RespondAction::Decline,
                },
                ActionKind::DeclineChallenge,
            ),
            (LobbyEvent::Start { by: viewer, at: now }, ActionKind::StartGame),
        ];
        offered(self, candidates)
    }
}

impl From<&Lobby> for LobbyLifecycle {
    fn from(lobby: &Lobby) -> Self {
        let phase = match lobby.status {
            LobbyStatus::PendingAcceptance => LobbyPhase::Pending,
            LobbyStatus::Ready => LobbyPhase::Ready,
            LobbyStatus::Started { .. } => LobbyPhase::Started,
            LobbyStatus::Void(_) => LobbyPhase::Void,
        };
        Self {
            phase,
            acceptance: lobby
                .players
                .iter()
                .map(|player| (player.user_id, player.acceptance))
                .collect(),
            scheduled_for: lobby.scheduled_for,
        }
    }
}

impl Lifecycle for LobbyLifecycle {
    type Phase = LobbyPhase;
    type Event = LobbyEvent;

    fn phase(&self) -> LobbyPhase {
        self.phase
    }

    fn transition(&self, event: &LobbyEvent) -> Result<Self, Refusal> {
        match (self.phase, event) {
            (LobbyPhase::Pending, LobbyEvent::Respond { by, action }) => {
                match self.acceptance_of(*by) {
                    None => return Err(GuardViolation::NotInvited.into()),
                    Some(AcceptanceStatus::Pending) => {}
                    Some(_) => return Err(GuardViolation::AlreadyResponded.into()),
                }

                let mut next = self.clone();
                match action {
                    RespondAction::Decline => {
                        next.acceptance.insert(*by, AcceptanceStatus::Declined);
                        next.phase = LobbyPhase::Void;
                    }
                    RespondAction::Accept => {
                        next.acceptance.insert(*by, AcceptanceStatus::Accepted);
                        if next
                            .acceptance
                            .values()
                            .all(|status| *status == AcceptanceStatus::Accepted)
                        {
                            next.phase = LobbyPhase::Ready;
                        }
                    }
                }
                Ok(next)
            }
            (LobbyPhase::Ready, LobbyEvent::Start { by, at }) => {
                if self.acceptance_of(*by) != Some(AcceptanceStatus::Accepted) {
                    return Err(GuardViolation::NotAccepted.into());
                }
                if self.scheduled_for.is_some_and(|scheduled| scheduled > *at) {
                    return Err(GuardViolation::TooEarly.into());
                }
                Ok(Self {
                    phase: LobbyPhase::Started,
                    ..self.clone()
                })
            }
            _ => Err(Refusal::Illegal),
        }
    }
}

// Tournaments

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentPhase {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

impl From<TournamentStatusDto> for TournamentPhase {
    fn from(status: TournamentStatusDto) -> Self {
        match status {
            TournamentStatusDto::Upcoming => TournamentPhase::Upcoming,
            TournamentStatusDto::Live => TournamentPhase::Live,
            TournamentStatusDto::Completed => TournamentPhase::Completed,
            TournamentStatusDto::Cancelled => TournamentPhase::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TournamentEvent {
    Join { by: UserId },
    RespondInvite { by: UserId, action: RespondAction },
    CheckIn { by: UserId },
    Withdraw { by: UserId },
    Invite { by: UserId, users: Vec<UserId> },
    MarkNoShow { by: UserId, user: UserId },
    Start { by: UserId },
    Cancel { by: UserId },
    Resolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    status: ParticipantStatus,
    invite: InviteStatus,
}

/// Single-elimination tournament from registration to final standings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentLifecycle {
    phase: TournamentPhase,
    host: UserId,
    access_mode: AccessMode,
    min_participants: u32,
    max_players: u32,
    check_in_required: bool,
    registered: u32,
    checked_in: u32,
    bracket_resolved: bool,
    entries: IndexMap<UserId, Entry>,
}

impl TournamentLifecycle {
    pub fn registered(&self) -> u32 {
        self.registered
    }

    pub fn status_of(&self, user_id: UserId) -> Option<ParticipantStatus> {
        self.entries.get(&user_id).map(|entry| entry.status)
    }

    fn require_host(&self, by: UserId, message: &'static str) -> Result<(), GuardViolation> {
        if by == self.host {
            Ok(())
        } else {
            Err(GuardViolation::HostOnly(message))
        }
    }

    /// Players the bracket would be seeded with if the host started now.
    fn starting_field(&self) -> u32 {
        if self.check_in_required {
            self.checked_in
        } else {
            self.registered
        }
    }

    fn set_status(&mut self, user_id: UserId, status: ParticipantStatus, invite: InviteStatus) {
        let previous = self.entries.get(&user_id).map(|entry| entry.status);
        self.entries.insert(user_id, Entry { status, invite });
        let was_registered = previous.is_some_and(ParticipantStatus::is_registered);
        match (was_registered, status.is_registered()) {
            (false, true) => self.registered += 1,
            (true, false) => self.registered = self.registered.saturating_sub(1),
            _ => {}
        }
        let was_checked_in = previous == Some(ParticipantStatus::CheckedIn);
        match (was_checked_in, status == ParticipantStatus::CheckedIn) {
            (false, true) => self.checked_in += 1,
            (true, false) => self.checked_in = self.checked_in.saturating_sub(1),
            _ => {}
        }
    }

    /// Why the host could not start right now, if anything blocks it.
    pub fn start_blocker(&self) -> Option<GuardViolation> {
        match self.transition(&TournamentEvent::Start { by: self.host }) {
            Err(Refusal::Guard(violation)) => Some(violation),
            _ => None,
        }
    }

    /// Controls `viewer` may use on this tournament. No-show marks are listed per participant.
    pub fn actions(&self, viewer: UserId) -> Vec<ActionKind> {
        let mut candidates = vec![
            (TournamentEvent::Join { by: viewer }, ActionKind::JoinTournament),
            (
                TournamentEvent::RespondInvite {
                    by: viewer,
                    action: RespondAction::Accept,
                },
                ActionKind::AcceptTournamentInvite,
            ),
            (
                TournamentEvent::RespondInvite {
                    by: viewer,
                    action: RespondAction::Decline,
                },
                ActionKind::DeclineTournamentInvite,
            ),
            (TournamentEvent::Withdraw { by: viewer }, ActionKind::Withdraw),
            (TournamentEvent::Start { by: viewer }, ActionKind::StartTournament),
            (
                TournamentEvent::Invite {
                    by: viewer,
                    users: vec![UserId(0)],
                },
                ActionKind::InvitePlayers,
            ),
            (TournamentEvent::Cancel { by: viewer }, ActionKind::CancelTournament),
        ];
        if self.status_of(viewer) == Some(ParticipantStatus::Invited) {
            // an open invitation is answered, not joined over
            candidates.retain(|(_, action)| *action != ActionKind::JoinTournament);
        }
        if self.check_in_required {
            candidates.push((TournamentEvent::CheckIn { by: viewer }, ActionKind::CheckIn));
        }
        candidates.extend(self.entries.keys().map(|user| {
            (
                TournamentEvent::MarkNoShow {
                    by: viewer,
                    user: *user,
                },
                ActionKind::MarkNoShow(*user),
            )
        }));
        offered(self, candidates)
    }
}

impl From<&Tournament> for TournamentLifecycle {
    fn from(tournament: &Tournament) -> Self {
        let mut entries: IndexMap<UserId, Entry> = tournament
            .participants
            .values()
            .map(|participant| {
                (
                    participant.user_id,
                    Entry {
                        status: participant.status,
                        invite: participant.invite_status,
                    },
                )
            })
            .collect();
        if let Some(mine) = &tournament.my_participation {
            entries.entry(mine.user_id).or_insert(Entry {
                status: mine.status,
                invite: mine.invite_status,
            });
        }
        let checked_in_rows = entries
            .values()
            .filter(|entry| entry.status == ParticipantStatus::CheckedIn)
            .count() as u32;

        Self {
            phase: tournament.status.into(),
            host: tournament.host,
            access_mode: tournament.access_mode,
            min_participants: tournament.min_participants,
            max_players: tournament.max_players,
            check_in_required: tournament.check_in_required,
            registered: tournament.registered_count,
            checked_in: tournament.checked_in_count.max(checked_in_rows),
            bracket_resolved: tournament.bracket_resolved(),
            entries,
        }
    }
}

impl Lifecycle for TournamentLifecycle {
    type Phase = TournamentPhase;
    type Event = TournamentEvent;

    fn phase(&self) -> TournamentPhase {
        self.phase
    }

    fn transition(&self, event: &TournamentEvent) -> Result<Self, Refusal> {
        use TournamentPhase::{Cancelled, Completed, Live, Upcoming};

        let mut next = self.clone();
        match (self.phase, event) {
            (Upcoming, TournamentEvent::Join { by }) => {
                let entry = self.entries.get(by);
                if entry.is_some_and(|entry| entry.status.is_registered()) {
                    return Err(GuardViolation::AlreadyRegistered.into());
                }
                if self.registered >= self.max_players {
                    return Err(GuardViolation::TournamentFull.into());
                }
                if self.access_mode == AccessMode::InviteOnly {
                    match entry.map(|entry| entry.invite) {
                        None => return Err(GuardViolation::InviteOnly.into()),
                        Some(InviteStatus::Invited | InviteStatus::Accepted) => {}
                        Some(_) => return Err(GuardViolation::NotInvitedToTournament.into()),
                    }
                }
                next.set_status(*by, ParticipantStatus::Registered, InviteStatus::Accepted);
            }
            (Upcoming, TournamentEvent::RespondInvite { by, action }) => {
                let invited = self
                    .entries
                    .get(by)
                    .is_some_and(|entry| entry.invite == InviteStatus::Invited);
                if !invited {
                    return Err(GuardViolation::NotInvitedToTournament.into());
                }
                match action {
                    RespondAction::Accept => next.set_status(
                        *by,
                        ParticipantStatus::Registered,
                        InviteStatus::Accepted,
                    ),
                    RespondAction::Decline => next.set_status(
                        *by,
                        ParticipantStatus::Withdrawn,
                        InviteStatus::Declined,
                    ),
                }
            }
            (Upcoming, TournamentEvent::CheckIn { by }) => {
                let entry = self.entries.get(by).copied();
                match entry.map(|entry| entry.status) {
                    Some(ParticipantStatus::Registered) => {}
                    Some(ParticipantStatus::CheckedIn) => {
                        return Err(GuardViolation::AlreadyCheckedIn.into());
                    }
                    _ => return Err(GuardViolation::NotRegistered.into()),
                }
                let invite = entry.map_or(InviteStatus::Accepted, |entry| entry.invite);
                next.set_status(*by, ParticipantStatus::CheckedIn, invite);
            }
            (Upcoming, TournamentEvent::Withdraw { by }) => {
                if *by == self.host {
                    return Err(GuardViolation::HostCannotWithdraw.into());
                }
                let active = self.entries.get(by).is_some_and(|entry| {
                    entry.status.is_registered() || entry.status == ParticipantStatus::Invited
                });
                if !active {
                    return Err(GuardViolation::NotRegistered.into());
                }
                next.set_status(*by, ParticipantStatus::Withdrawn, InviteStatus::Declined);
            }
            (Upcoming, TournamentEvent::Invite { by, users }) => {
                self.require_host(*by, "Only the host can invite players")?;
                let invitees: Vec<UserId> =
                    users.iter().copied().filter(|user| user != by).collect();
                if invitees.is_empty() {
                    return Err(GuardViolation::EmptyInvite.into());
                }
                for user in invitees {
                    let registered = self
                        .entries
                        .get(&user)
                        .is_some_and(|entry| entry.status.is_registered());
                    if !registered {
                        next.set_status(user, ParticipantStatus::Invited, InviteStatus::Invited);
                    }
                }
            }
            (Upcoming, TournamentEvent::MarkNoShow { by, user }) => {
                self.require_host(*by, "Only the host can mark no-shows")?;
                if *user == self.host {
                    return Err(GuardViolation::HostNoShow.into());
                }
                let entry = self
                    .entries
                    .get(user)
                    .copied()
                    .ok_or(GuardViolation::ParticipantNotFound)?;
                match entry.status {
                    ParticipantStatus::Invited | ParticipantStatus::Registered => {}
                    ParticipantStatus::CheckedIn => {
                        return Err(GuardViolation::CheckedInNoShow.into());
                    }
                    _ => return Err(GuardViolation::NoShowIneligible.into()),
                }
                next.set_status(*user, ParticipantStatus::NoShow, entry.invite);
            }
            (Upcoming, TournamentEvent::Start { by }) => {
                self.require_host(*by, "Only the host can start this tournament")?;
                if self.registered < self.min_participants {
                    return Err(GuardViolation::NotEnoughParticipants(self.min_participants).into());
                }
                if self.registered > self.max_players {
                    return Err(GuardViolation::TooManyParticipants.into());
                }
                let field = self.starting_field();
                if field < self.min_participants {
                    return Err(GuardViolation::NotEnoughCheckedIn.into());
                }
                if !is_power_of_two(field) {
                    return Err(GuardViolation::NotPowerOfTwo.into());
                }
                next.phase = Live;
            }
            (Upcoming | Live, TournamentEvent::Cancel { by }) => {
                self.require_host(*by, "Only the host can cancel this tournament")?;
                next.phase = Cancelled;
            }
            (Live, TournamentEvent::Resolve) => {
                if !self.bracket_resolved {
                    return Err(GuardViolation::BracketUnresolved.into());
                }
                next.phase = Completed;
            }
            _ => return Err(Refusal::Illegal),
        }
        Ok(next)
    }
}

fn offered<L, I>(lifecycle: &L, candidates: I) -> Vec<ActionKind>
where
    L: Lifecycle,
    I: IntoIterator<Item = (L::Event, ActionKind)>,
{
    candidates
        .into_iter()
        .filter(|(event, _)| lifecycle.transition(event).is_ok())
        .map(|(_, action)| action)
        .collect()
}
