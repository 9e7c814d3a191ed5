//! Domain view of the ranked payloads.
//!
//! Wire DTOs are converted into these types with `TryFrom`; payloads that contradict themselves
//! (a completed match without a score, a player on team 3) are rejected instead of guessed at.

use std::collections::HashSet;

use indexmap::IndexMap;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::dto::{
    CourtId, LobbyId, MatchId, MatchType, TournamentId, UserId, UserSummary,
    lobby::{AcceptanceStatus, LobbyDto, LobbyPlayerDto, LobbySource, LobbyStatusDto},
    matches::{MatchDto, MatchPlayerDto, MatchStatusDto},
    queue::QueueEntryDto,
    tournament::{
        AccessMode, InviteStatus, NoShowPolicy, ParticipantDto, ParticipantStatus, TournamentDto,
        TournamentResultDto, TournamentStatusDto,
    },
};
use crate::state::guards::Score;

/// Payload rejected while building a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("match {id} is {status:?} but carries no valid score")]
    MissingScore { id: MatchId, status: MatchStatusDto },
    #[error("{entity} {id} places user {user_id} on unknown team {team}")]
    UnknownTeam {
        entity: &'static str,
        id: i64,
        user_id: UserId,
        team: u8,
    },
    #[error("{entity} {id} lists user {user_id} more than once")]
    DuplicatePlayer {
        entity: &'static str,
        id: i64,
        user_id: UserId,
    },
}

/// Which side of the net a player is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    fn from_wire(
        entity: &'static str,
        id: i64,
        user_id: UserId,
        team: u8,
    ) -> Result<Self, ModelError> {
        match team {
            1 => Ok(Side::Team1),
            2 => Ok(Side::Team2),
            team => Err(ModelError::UnknownTeam {
                entity,
                id,
                user_id,
                team,
            }),
        }
    }
}

/// A user holds at most one slot, so never one on each team.
fn ensure_unique_players(
    entity: &'static str,
    id: i64,
    players: impl IntoIterator<Item = UserId>,
) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    match players.into_iter().find(|user_id| !seen.insert(*user_id)) {
        Some(user_id) => Err(ModelError::DuplicatePlayer {
            entity,
            id,
            user_id,
        }),
        None => Ok(()),
    }
}

fn display_name(user_id: UserId, user: Option<&UserSummary>) -> String {
    user.map(|user| user.display_name().to_string())
        .unwrap_or_else(|| format!("Player {user_id}"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub court_id: CourtId,
    pub match_type: MatchType,
    pub joined_at: Option<PrimitiveDateTime>,
    pub name: String,
}

impl From<QueueEntryDto> for QueueEntry {
    fn from(dto: QueueEntryDto) -> Self {
        Self {
            name: display_name(dto.user_id, dto.user.as_ref()),
            user_id: dto.user_id,
            court_id: dto.court_id,
            match_type: dto.match_type,
            joined_at: dto.joined_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchPlayer {
    pub user_id: UserId,
    pub side: Side,
    pub confirmed: bool,
    pub elo_change: Option<f64>,
    pub name: String,
}

/// Server-side state of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    InProgress,
    PendingConfirmation {
        score: Score,
        submitted_by: Option<UserId>,
    },
    Completed {
        score: Score,
        winner: Side,
    },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: MatchId,
    pub court_id: CourtId,
    pub match_type: MatchType,
    pub status: MatchStatus,
    pub players: Vec<MatchPlayer>,
    pub tournament_id: Option<TournamentId>,
    pub bracket_round: Option<u32>,
    pub created_at: Option<PrimitiveDateTime>,
}

impl Match {
    pub fn player(&self, user_id: UserId) -> Option<&MatchPlayer> {
        self.players.iter().find(|player| player.user_id == user_id)
    }

    pub fn is_player(&self, user_id: UserId) -> bool {
        self.player(user_id).is_some()
    }

    pub fn has_confirmed(&self, user_id: UserId) -> bool {
        self.player(user_id).is_some_and(|player| player.confirmed)
    }

    pub fn team(&self, side: Side) -> Vec<UserId> {
        self.players
            .iter()
            .filter(|player| player.side == side)
            .map(|player| player.user_id)
            .collect()
    }

    /// Names of one side joined for display, e.g. `"Ana & Bo"`.
    pub fn team_label(&self, side: Side) -> String {
        let names: Vec<&str> = self
            .players
            .iter()
            .filter(|player| player.side == side)
            .map(|player| player.name.as_str())
            .collect();
        if names.is_empty() {
            "TBD".to_string()
        } else {
            names.join(" & ")
        }
    }

    pub fn confirmed_count(&self) -> usize {
        self.players.iter().filter(|player| player.confirmed).count()
    }

    /// Whether the match still occupies the court.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            MatchStatus::InProgress | MatchStatus::PendingConfirmation { .. }
        )
    }
}

impl TryFrom<MatchDto> for Match {
    type Error = ModelError;

    fn try_from(dto: MatchDto) -> Result<Self, Self::Error> {
        let score = match (dto.team1_score, dto.team2_score) {
            (Some(team1), Some(team2)) => Score::new(team1, team2).ok(),
            _ => None,
        };
        let missing_score = || ModelError::MissingScore {
            id: dto.id,
            status: dto.status,
        };

        let status = match dto.status {
            MatchStatusDto::InProgress => MatchStatus::InProgress,
            MatchStatusDto::PendingConfirmation => MatchStatus::PendingConfirmation {
                score: score.ok_or_else(missing_score)?,
                submitted_by: dto.submitted_by,
            },
            MatchStatusDto::Completed => {
                let score = score.ok_or_else(missing_score)?;
                let winner = match dto.winner_team.unwrap_or_else(|| score.winner()) {
                    1 => Side::Team1,
                    _ => Side::Team2,
                };
                MatchStatus::Completed { score, winner }
            }
            MatchStatusDto::Cancelled => MatchStatus::Cancelled,
        };

        let players = dto
            .players
            .into_iter()
            .map(|player: MatchPlayerDto| {
                Ok(MatchPlayer {
                    side: Side::from_wire("match", dto.id.0, player.user_id, player.team)?,
                    name: display_name(player.user_id, player.user.as_ref()),
                    user_id: player.user_id,
                    confirmed: player.confirmed,
                    elo_change: player.elo_change,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        ensure_unique_players("match", dto.id.0, players.iter().map(|player| player.user_id))?;

        Ok(Self {
            id: dto.id,
            court_id: dto.court_id,
            match_type: dto.match_type,
            status,
            players,
            tournament_id: dto.tournament_id,
            bracket_round: dto.bracket_round,
            created_at: dto.created_at,
        })
    }
}

/// Why a lobby will never start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoidReason {
    Declined,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyStatus {
    PendingAcceptance,
    Ready,
    Started { match_id: Option<MatchId> },
    Void(VoidReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPlayer {
    pub user_id: UserId,
    pub side: Side,
    pub acceptance: AcceptanceStatus,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lobby {
    pub id: LobbyId,
    pub court_id: CourtId,
    pub created_by: Option<UserId>,
    pub match_type: MatchType,
    pub source: LobbySource,
    pub scheduled_for: Option<PrimitiveDateTime>,
    pub status: LobbyStatus,
    pub players: Vec<LobbyPlayer>,
}

impl Lobby {
    pub fn acceptance_of(&self, user_id: UserId) -> Option<AcceptanceStatus> {
        self.players
            .iter()
            .find(|player| player.user_id == user_id)
            .map(|player| player.acceptance)
    }

    pub fn all_accepted(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .iter()
                .all(|player| player.acceptance == AcceptanceStatus::Accepted)
    }

    /// Whether a scheduled lobby's slot has arrived; unscheduled lobbies are always due.
    pub fn is_due(&self, now: PrimitiveDateTime) -> bool {
        !self.scheduled_for.is_some_and(|at| at > now)
    }

    pub fn accepted_count(&self) -> usize {
        self.players
            .iter()
            .filter(|player| player.acceptance == AcceptanceStatus::Accepted)
            .count()
    }

    pub fn team(&self, side: Side) -> Vec<UserId> {
        self.players
            .iter()
            .filter(|player| player.side == side)
            .map(|player| player.user_id)
            .collect()
    }

    pub fn team_label(&self, side: Side) -> String {
        let names: Vec<&str> = self
            .players
            .iter()
            .filter(|player| player.side == side)
            .map(|player| player.name.as_str())
            .collect();
        names.join(" & ")
    }
}

impl TryFrom<LobbyDto> for Lobby {
    type Error = ModelError;

    fn try_from(dto: LobbyDto) -> Result<Self, Self::Error> {
        let status = match dto.status {
            LobbyStatusDto::PendingAcceptance => LobbyStatus::PendingAcceptance,
            LobbyStatusDto::Ready => LobbyStatus::Ready,
            LobbyStatusDto::Started => LobbyStatus::Started {
                match_id: dto.started_match_id,
            },
            LobbyStatusDto::Declined => LobbyStatus::Void(VoidReason::Declined),
            LobbyStatusDto::Cancelled => LobbyStatus::Void(VoidReason::Cancelled),
            LobbyStatusDto::Expired => LobbyStatus::Void(VoidReason::Expired),
        };

        let players = dto
            .players
            .into_iter()
            .map(|player: LobbyPlayerDto| {
                Ok(LobbyPlayer {
                    side: Side::from_wire("lobby", dto.id.0, player.user_id, player.team)?,
                    name: display_name(player.user_id, player.user.as_ref()),
                    user_id: player.user_id,
                    acceptance: player.acceptance_status,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        ensure_unique_players("lobby", dto.id.0, players.iter().map(|player| player.user_id))?;

        Ok(Self {
            id: dto.id,
            court_id: dto.court_id,
            created_by: dto.created_by_id,
            match_type: dto.match_type,
            source: dto.source,
            scheduled_for: dto.scheduled_for,
            status,
            players,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub user_id: UserId,
    pub status: ParticipantStatus,
    pub invite_status: InviteStatus,
    pub checked_in_at: Option<PrimitiveDateTime>,
    pub name: String,
}

impl From<ParticipantDto> for Participant {
    fn from(dto: ParticipantDto) -> Self {
        Self {
            name: display_name(dto.user_id, dto.user.as_ref()),
            user_id: dto.user_id,
            status: dto.participant_status,
            invite_status: dto.invite_status,
            checked_in_at: dto.checked_in_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketRound {
    pub round: u32,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub placement: u32,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub points: i64,
}

impl From<TournamentResultDto> for Standing {
    fn from(dto: TournamentResultDto) -> Self {
        Self {
            placement: dto.placement,
            name: dto
                .user
                .as_ref()
                .map(|user| user.display_name().to_string())
                .unwrap_or_else(|| "Unknown player".to_string()),
            wins: dto.wins,
            losses: dto.losses,
            points: dto.points,
        }
    }
}

/// Tournament as listed for a court, plus detail fields when loaded individually.
#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub id: TournamentId,
    pub court_id: CourtId,
    pub host: UserId,
    pub name: String,
    pub status: TournamentStatusDto,
    pub access_mode: AccessMode,
    pub match_type: MatchType,
    pub start_time: Option<PrimitiveDateTime>,
    pub min_participants: u32,
    pub max_players: u32,
    pub check_in_required: bool,
    pub no_show_policy: NoShowPolicy,
    pub no_show_grace_minutes: u32,
    /// Registered plus checked-in participants, as counted by the backend.
    pub registered_count: u32,
    pub checked_in_count: u32,
    pub participants: IndexMap<UserId, Participant>,
    pub bracket: Vec<BracketRound>,
    pub results: Vec<Standing>,
    pub my_participation: Option<Participant>,
    /// Participation rows came with the payload. Court listings carry none.
    pub roster_loaded: bool,
}

impl Tournament {
    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host == user_id
    }

    /// Participation row of `user_id`, preferring the detailed list.
    pub fn participation(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.get(&user_id).or_else(|| {
            self.my_participation
                .as_ref()
                .filter(|participant| participant.user_id == user_id)
        })
    }

    pub fn is_full(&self) -> bool {
        self.registered_count >= self.max_players
    }

    /// True once every bracket match has a final result.
    pub fn bracket_resolved(&self) -> bool {
        let mut matches = self.bracket.iter().flat_map(|round| round.matches.iter());
        let mut any = false;
        let all_done = matches.all(|game| {
            any = true;
            matches!(
                game.status,
                MatchStatus::Completed { .. } | MatchStatus::Cancelled
            )
        });
        any && all_done
    }
}

impl TryFrom<TournamentDto> for Tournament {
    type Error = ModelError;

    fn try_from(dto: TournamentDto) -> Result<Self, Self::Error> {
        let roster_loaded = dto.participants.is_some() || dto.my_participation.is_some();
        let participants = dto
            .participants
            .unwrap_or_default()
            .into_iter()
            .map(|participant| (participant.user_id, Participant::from(participant)))
            .collect();

        let bracket = dto
            .bracket
            .map(|bracket| {
                bracket
                    .rounds
                    .into_iter()
                    .map(|round| {
                        Ok(BracketRound {
                            round: round.round,
                            matches: round
                                .matches
                                .into_iter()
                                .map(Match::try_from)
                                .collect::<Result<_, _>>()?,
                        })
                    })
                    .collect::<Result<Vec<_>, ModelError>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            id: dto.id,
            court_id: dto.court_id,
            host: dto.host_user_id,
            name: dto.name,
            status: dto.status,
            access_mode: dto.access_mode,
            match_type: dto.match_type,
            start_time: dto.start_time,
            min_participants: dto.min_participants,
            max_players: dto.max_players,
            check_in_required: dto.check_in_required,
            no_show_policy: dto.no_show_policy,
            no_show_grace_minutes: dto.no_show_grace_minutes,
            registered_count: dto.registered_count,
            checked_in_count: dto.checked_in_count,
            participants,
            bracket,
            results: dto.results.into_iter().map(Standing::from).collect(),
            my_participation: dto.my_participation.map(Participant::from),
            roster_loaded,
        })
    }
}
