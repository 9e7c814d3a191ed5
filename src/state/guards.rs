//! Checks run before any mutating request leaves the client.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::dto::{MatchType, UserId};

/// Highest score either side may report.
pub const MAX_SCORE: u8 = 99;

/// Local rule violation; the message is shown inline and no request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    #[error("Both teams must have players")]
    EmptyTeam,
    #[error("Pick both doubles partners.")]
    MissingPartner,
    #[error("{} requires {} per team", .0.label(), players_label(*.0))]
    WrongTeamSize(MatchType),
    #[error("Duplicate players across teams")]
    DuplicatePlayers,
    #[error("Scores must be between 0 and 99")]
    ScoreOutOfRange,
    #[error("Scores cannot be tied")]
    TiedScore,
    #[error("Scheduled time must be in the future")]
    NotInFuture,
    #[error("This scheduled ranked game cannot start yet")]
    TooEarly,
    #[error("You are not a player in this match")]
    NotAPlayer,
    #[error("You have already confirmed this score")]
    AlreadyConfirmed,
    #[error("You are not invited to this lobby")]
    NotInvited,
    #[error("You have already responded to this invitation")]
    AlreadyResponded,
    #[error("Only accepted participants can start this game")]
    NotAccepted,
    #[error("Already in queue at this court")]
    AlreadyQueued,
    #[error("You are not in the queue at this court")]
    NotQueued,
    #[error("{0}")]
    HostOnly(&'static str),
    #[error("Need at least {0} participants to start")]
    NotEnoughParticipants(u32),
    #[error("Not enough checked-in participants to start")]
    NotEnoughCheckedIn,
    #[error("Too many participants for tournament capacity")]
    TooManyParticipants,
    #[error("Single-elimination requires a power-of-two participant count (4, 8, 16, ...)")]
    NotPowerOfTwo,
    #[error("Tournament is full")]
    TournamentFull,
    #[error("This tournament is invite-only")]
    InviteOnly,
    #[error("Already registered")]
    AlreadyRegistered,
    #[error("You are not invited to this tournament")]
    NotInvitedToTournament,
    #[error("You are not registered for this tournament")]
    NotRegistered,
    #[error("You are already checked in")]
    AlreadyCheckedIn,
    #[error("Host cannot withdraw from their tournament")]
    HostCannotWithdraw,
    #[error("The host cannot be marked no-show")]
    HostNoShow,
    #[error("Checked-in participants cannot be marked no-show")]
    CheckedInNoShow,
    #[error("Participant is not eligible to be marked no-show")]
    NoShowIneligible,
    #[error("Participant not found")]
    ParticipantNotFound,
    #[error("Provide at least one player ID")]
    EmptyInvite,
    #[error("Bracket still has unresolved matches")]
    BracketUnresolved,
}

fn players_label(match_type: MatchType) -> &'static str {
    match match_type {
        MatchType::Singles => "1 player",
        MatchType::Doubles => "2 players",
    }
}

/// Reported final score. Constructing one enforces the range and no-tie rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Score {
    team1: u8,
    team2: u8,
}

impl Score {
    /// Any legal score; used to ask a lifecycle whether score entry is open at all.
    pub(crate) const SAMPLE: Self = Self { team1: 1, team2: 0 };

    pub fn new(team1: i64, team2: i64) -> Result<Self, GuardViolation> {
        let in_range = |value: i64| (0..=i64::from(MAX_SCORE)).contains(&value);
        if !in_range(team1) || !in_range(team2) {
            return Err(GuardViolation::ScoreOutOfRange);
        }
        if team1 == team2 {
            return Err(GuardViolation::TiedScore);
        }
        Ok(Self {
            team1: team1 as u8,
            team2: team2 as u8,
        })
    }

    pub fn team1(&self) -> u8 {
        self.team1
    }

    pub fn team2(&self) -> u8 {
        self.team2
    }

    /// Winning side, 1 or 2.
    pub fn winner(&self) -> u8 {
        if self.team1 > self.team2 { 1 } else { 2 }
    }
}

/// Parse the two score fields as typed by a user.
pub fn parse_score(team1: &str, team2: &str) -> Result<Score, GuardViolation> {
    let parse = |raw: &str| raw.trim().parse::<i64>().map_err(|_| GuardViolation::ScoreOutOfRange);
    Score::new(parse(team1)?, parse(team2)?)
}

/// Team assembly rule shared by queue games, challenges and lobby starts.
///
/// Singles needs exactly one player per side, doubles exactly two distinct partners, and no
/// player may appear twice anywhere across both sides.
pub fn check_teams(
    match_type: MatchType,
    team1: &[UserId],
    team2: &[UserId],
) -> Result<(), GuardViolation> {
    if team1.is_empty() || team2.is_empty() {
        return Err(GuardViolation::EmptyTeam);
    }

    let per_team = match_type.players_per_team();
    if match_type == MatchType::Doubles && (team1.len() < per_team || team2.len() < per_team) {
        return Err(GuardViolation::MissingPartner);
    }
    if team1.len() != per_team || team2.len() != per_team {
        return Err(GuardViolation::WrongTeamSize(match_type));
    }

    let mut seen = HashSet::with_capacity(team1.len() + team2.len());
    if !team1.iter().chain(team2).all(|id| seen.insert(*id)) {
        return Err(GuardViolation::DuplicatePlayers);
    }

    Ok(())
}

/// A scheduled challenge must point strictly into the future.
pub fn check_schedule(
    scheduled_for: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<(), GuardViolation> {
    crate::dto::validation::check_future(&scheduled_for, now)
        .map_err(|_| GuardViolation::NotInFuture)
}

/// Positive power of two (bracket sizes).
pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}
