//! Pure view model for the ranked action center and the renderer that only repaints on change.

use std::collections::HashSet;

use serde::Serialize;
use time::PrimitiveDateTime;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::dto::{CourtId, UserId, common::naive_iso, lobby::AcceptanceStatus};
use crate::services::classifier::{
    ClassificationResult, ItemKey, TournamentActions, TournamentBreakdown, classify,
};
use crate::state::{
    ActionTarget,
    lifecycle::{
        ActionKind, LobbyEvent, LobbyLifecycle, MatchLifecycle, QueueLifecycle,
        TournamentLifecycle,
    },
    model::{Lobby, LobbyStatus, Match, MatchStatus, QueueEntry, Side, Tournament},
    snapshot::CourtSnapshot,
    state_machine::{Lifecycle, Refusal},
};

/// Status banner shown above the sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Banner {
    /// The last refresh failed; the view shows the previous snapshot.
    Unavailable,
    /// The session expired; everything is shown read-only.
    SignedOut,
}

impl Banner {
    pub fn message(self) -> &'static str {
        match self {
            Banner::Unavailable => "unable to load",
            Banner::SignedOut => "Sign in to play ranked",
        }
    }
}

/// Everything `render` needs besides the classification.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub viewer: Option<UserId>,
    pub now: PrimitiveDateTime,
    /// Targets with a request in flight; their controls are disabled.
    pub busy: HashSet<ActionTarget>,
    pub banner: Option<Banner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    EnterScore,
    ConfirmReject,
    RespondInvitations,
    StartReady,
    AwaitingOthers,
    Scheduled,
    OnCourt,
    Queue,
    Tournaments,
}

impl SectionKind {
    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::EnterScore => "Enter score",
            SectionKind::ConfirmReject => "Confirm or reject",
            SectionKind::RespondInvitations => "Respond to invitations",
            SectionKind::StartReady => "Ready to start",
            SectionKind::AwaitingOthers => "Waiting on others",
            SectionKind::Scheduled => "Scheduled",
            SectionKind::OnCourt => "On this court",
            SectionKind::Queue => "Queue",
            SectionKind::Tournaments => "Tournaments",
        }
    }
}

/// One rendered item with the exact controls legal for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub key: ItemKey,
    pub title: String,
    pub subtitle: String,
    pub status: String,
    pub actions: Vec<ActionKind>,
    /// A request on this item is in flight.
    pub busy: bool,
    /// Why an otherwise expected control is missing.
    pub blocked_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub court_id: CourtId,
    pub badge: usize,
    pub banner: Option<Banner>,
    pub sections: Vec<Section>,
    /// Queue controls for the court itself.
    pub court_actions: Vec<ActionKind>,
    pub court_busy: bool,
    pub tournaments: TournamentBreakdown,
}

impl ViewModel {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|section| section.kind == kind)
    }

    pub fn card(&self, key: ItemKey) -> Option<&Card> {
        self.sections
            .iter()
            .flat_map(|section| section.cards.iter())
            .find(|card| card.key == key)
    }
}

/// Build the view for one classification. Same inputs always give an equal model.
pub fn render(result: &ClassificationResult, ctx: &RenderContext) -> ViewModel {
    let viewer = result.viewer;
    let needs = &result.needs_my_action;
    let mut sections = Vec::new();
    let mut push = |kind, cards: Vec<Card>| {
        if !cards.is_empty() {
            sections.push(Section { kind, cards });
        }
    };

    let match_cards = |matches: &[Match]| {
        matches
            .iter()
            .map(|game| match_card(game, viewer, ctx))
            .collect::<Vec<_>>()
    };
    let lobby_cards = |lobbies: &[Lobby]| {
        lobbies
            .iter()
            .map(|lobby| lobby_card(lobby, viewer, ctx))
            .collect::<Vec<_>>()
    };

    push(SectionKind::EnterScore, match_cards(&needs.enter_score));
    push(SectionKind::ConfirmReject, match_cards(&needs.confirm_reject));
    push(
        SectionKind::RespondInvitations,
        lobby_cards(&needs.respond_invitations),
    );
    push(SectionKind::StartReady, lobby_cards(&needs.start_ready));

    let mut awaiting = match_cards(&result.awaiting_others.matches);
    awaiting.extend(lobby_cards(&result.awaiting_others.lobbies));
    push(SectionKind::AwaitingOthers, awaiting);
    push(
        SectionKind::Scheduled,
        lobby_cards(&result.informational.scheduled),
    );

    let mut on_court = match_cards(&result.informational.matches);
    on_court.extend(lobby_cards(&result.informational.lobbies));
    push(SectionKind::OnCourt, on_court);

    push(
        SectionKind::Queue,
        result.informational.queue.iter().map(queue_card).collect(),
    );
    push(
        SectionKind::Tournaments,
        result
            .informational
            .tournaments
            .iter()
            .map(|tournament| tournament_card(tournament, viewer, ctx))
            .collect(),
    );

    let court_actions = match viewer {
        Some(viewer) => {
            let queued = result
                .informational
                .queue
                .iter()
                .find(|entry| entry.user_id == viewer)
                .map(|entry| entry.match_type);
            QueueLifecycle::new(queued).actions()
        }
        None => Vec::new(),
    };

    ViewModel {
        court_id: result.court_id,
        badge: result.pending_action_count(),
        banner: ctx.banner,
        sections,
        court_actions,
        court_busy: ctx.busy.contains(&ActionTarget::Queue(result.court_id)),
        tournaments: result.tournaments,
    }
}

fn versus(team1: String, team2: String) -> String {
    format!("{team1} vs {team2}")
}

fn match_card(game: &Match, viewer: Option<UserId>, ctx: &RenderContext) -> Card {
    let status = match &game.status {
        MatchStatus::InProgress => "In progress".to_string(),
        MatchStatus::PendingConfirmation { score, .. } => format!(
            "{}-{} awaiting confirmation ({}/{} confirmed)",
            score.team1(),
            score.team2(),
            game.confirmed_count(),
            game.players.len()
        ),
        MatchStatus::Completed { score, .. } => {
            format!("Final {}-{}", score.team1(), score.team2())
        }
        MatchStatus::Cancelled => "Cancelled".to_string(),
    };
    let subtitle = match game.bracket_round {
        Some(round) => format!("{} · Round {round}", game.match_type.label()),
        None => game.match_type.label().to_string(),
    };
    let actions = viewer
        .filter(|viewer| game.is_player(*viewer))
        .map(|viewer| MatchLifecycle::from(game).actions(viewer))
        .unwrap_or_default();

    Card {
        key: ItemKey::Match(game.id),
        title: versus(game.team_label(Side::Team1), game.team_label(Side::Team2)),
        subtitle,
        status,
        actions,
        busy: ctx.busy.contains(&ActionTarget::Match(game.id)),
        blocked_reason: None,
    }
}

fn lobby_card(lobby: &Lobby, viewer: Option<UserId>, ctx: &RenderContext) -> Card {
    let status = match lobby.status {
        LobbyStatus::PendingAcceptance => format!(
            "{}/{} accepted",
            lobby.accepted_count(),
            lobby.players.len()
        ),
        LobbyStatus::Ready => "Ready to start".to_string(),
        LobbyStatus::Started { .. } => "Started".to_string(),
        LobbyStatus::Void(reason) => format!("{reason:?}"),
    };
    let subtitle = match lobby.scheduled_for {
        Some(at) => format!(
            "{} · scheduled for {}",
            lobby.match_type.label(),
            naive_iso::format(&at)
        ),
        None => lobby.match_type.label().to_string(),
    };

    let mut actions = Vec::new();
    let mut blocked_reason = None;
    if let Some(viewer) = viewer.filter(|viewer| lobby.acceptance_of(*viewer).is_some()) {
        let lifecycle = LobbyLifecycle::from(lobby);
        actions = lifecycle.actions(viewer, ctx.now);
        if lobby.status == LobbyStatus::Ready
            && lifecycle.acceptance_of(viewer) == Some(AcceptanceStatus::Accepted)
            && !actions.contains(&ActionKind::StartGame)
        {
            let start = LobbyEvent::Start {
                by: viewer,
                at: ctx.now,
            };
            if let Err(Refusal::Guard(violation)) = lifecycle.transition(&start) {
                blocked_reason = Some(violation.to_string());
            }
        }
    }

    Card {
        key: ItemKey::Lobby(lobby.id),
        title: versus(lobby.team_label(Side::Team1), lobby.team_label(Side::Team2)),
        subtitle,
        status,
        actions,
        busy: ctx.busy.contains(&ActionTarget::Lobby(lobby.id)),
        blocked_reason,
    }
}

fn queue_card(entry: &QueueEntry) -> Card {
    Card {
        key: ItemKey::Queue(entry.user_id),
        title: entry.name.clone(),
        subtitle: entry.match_type.label().to_string(),
        status: entry
            .joined_at
            .map(|at| format!("Waiting since {}", naive_iso::format(&at)))
            .unwrap_or_else(|| "Waiting".to_string()),
        actions: Vec::new(),
        busy: false,
        blocked_reason: None,
    }
}

fn tournament_status(tournament: &Tournament) -> String {
    let status = tournament.status.as_query();
    match tournament.start_time {
        Some(at) => format!("{status} · starts {}", naive_iso::format(&at)),
        None => status.to_string(),
    }
}

fn tournament_subtitle(tournament: &Tournament) -> String {
    format!(
        "{} · {}/{} registered",
        tournament.match_type.label(),
        tournament.registered_count,
        tournament.max_players
    )
}

/// Court-list card. Without participation rows only host controls are offered; the rest come
/// with the detail view.
fn tournament_card(tournament: &Tournament, viewer: Option<UserId>, ctx: &RenderContext) -> Card {
    let mut actions = vec![ActionKind::ViewTournament];
    let mut blocked_reason = None;
    if let Some(viewer) = viewer {
        let lifecycle = TournamentLifecycle::from(tournament);
        actions.extend(
            lifecycle
                .actions(viewer)
                .into_iter()
                .filter(|action| tournament.roster_loaded || action.is_host_only()),
        );
        if tournament.is_host(viewer) && !actions.contains(&ActionKind::StartTournament) {
            blocked_reason = lifecycle.start_blocker().map(|violation| violation.to_string());
        }
    }

    Card {
        key: ItemKey::Tournament(tournament.id),
        title: tournament.name.clone(),
        subtitle: tournament_subtitle(tournament),
        status: tournament_status(tournament),
        actions,
        busy: ctx.busy.contains(&ActionTarget::Tournament(tournament.id)),
        blocked_reason,
    }
}

/// Detail view of one tournament.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentView {
    pub card: Card,
    pub needs_action: Vec<ActionKind>,
    pub available: Vec<ActionKind>,
    pub host_management: Vec<ActionKind>,
    pub awaiting: Option<String>,
    pub participants: Vec<String>,
    pub rounds: Vec<(u32, Vec<String>)>,
    pub standings: Vec<String>,
}

pub fn render_tournament(
    tournament: &Tournament,
    actions: &TournamentActions,
    busy: bool,
) -> TournamentView {
    let all_actions: Vec<ActionKind> = actions
        .needs_action
        .iter()
        .chain(&actions.available)
        .chain(&actions.host_management)
        .copied()
        .collect();

    let participants = tournament
        .participants
        .values()
        .map(|participant| format!("{} ({:?})", participant.name, participant.status))
        .collect();
    let rounds = tournament
        .bracket
        .iter()
        .map(|round| {
            let games = round
                .matches
                .iter()
                .map(|game| {
                    let score = match &game.status {
                        MatchStatus::Completed { score, .. } => {
                            format!(" {}-{}", score.team1(), score.team2())
                        }
                        _ => String::new(),
                    };
                    format!(
                        "{}{score}",
                        versus(game.team_label(Side::Team1), game.team_label(Side::Team2))
                    )
                })
                .collect();
            (round.round, games)
        })
        .collect();
    let standings = tournament
        .results
        .iter()
        .map(|standing| {
            format!(
                "{}. {} {}-{} ({} pts)",
                standing.placement, standing.name, standing.wins, standing.losses, standing.points
            )
        })
        .collect();

    TournamentView {
        card: Card {
            key: ItemKey::Tournament(tournament.id),
            title: tournament.name.clone(),
            subtitle: tournament_subtitle(tournament),
            status: tournament_status(tournament),
            actions: all_actions,
            busy,
            blocked_reason: actions.start_blocked.as_ref().map(|reason| reason.to_string()),
        },
        needs_action: actions.needs_action.clone(),
        available: actions.available.clone(),
        host_management: actions.host_management.clone(),
        awaiting: actions.awaiting.clone(),
        participants,
        rounds,
        standings,
    }
}

/// Compact plain-text rendering, one line per card.
pub fn to_text(model: &ViewModel) -> String {
    let mut lines = vec![format!("court {} · {} pending", model.court_id, model.badge)];
    if let Some(banner) = model.banner {
        lines.push(format!("! {}", banner.message()));
    }
    if !model.court_actions.is_empty() {
        let labels: Vec<&str> = model.court_actions.iter().map(ActionKind::label).collect();
        lines.push(format!("[{}]", labels.join("] [")));
    }
    for section in &model.sections {
        lines.push(format!("## {}", section.kind.heading()));
        for card in &section.cards {
            let mut line = format!("- {} | {} | {}", card.title, card.subtitle, card.status);
            if !card.actions.is_empty() {
                let labels: Vec<&str> = card.actions.iter().map(ActionKind::label).collect();
                line.push_str(&format!(" [{}]", labels.join("] [")));
            }
            if card.busy {
                line.push_str(" (working)");
            }
            if let Some(reason) = &card.blocked_reason {
                line.push_str(&format!(" ({reason})"));
            }
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Output adapter; only called when the view actually changed.
pub trait Paint: Send + Sync {
    fn paint(&self, model: &ViewModel);
}

/// Logs each new view as text.
pub struct TracingPainter;

impl Paint for TracingPainter {
    fn paint(&self, model: &ViewModel) {
        info!(
            court_id = %model.court_id,
            badge = model.badge,
            view = %to_text(model),
            "court view updated"
        );
    }
}

pub struct NullPainter;

impl Paint for NullPainter {
    fn paint(&self, _model: &ViewModel) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    Unchanged,
    Replaced(ViewModel),
}

/// Keeps the last rendered model and repaints only when a new one differs.
pub struct ReconcilingRenderer {
    last: Option<ViewModel>,
    last_result: Option<ClassificationResult>,
    painter: Box<dyn Paint>,
    tx: watch::Sender<Option<ViewModel>>,
}

impl ReconcilingRenderer {
    pub fn new(painter: Box<dyn Paint>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            last: None,
            last_result: None,
            painter,
            tx,
        }
    }

    pub fn reconcile(&mut self, result: &ClassificationResult, ctx: &RenderContext) -> ViewUpdate {
        let model = render(result, ctx);
        self.last_result = Some(result.clone());
        self.publish(model)
    }

    /// Re-render the last classification of `court_id` with a new context, keeping its content.
    ///
    /// Used when a refresh fails: the previous view stays and only the banner changes. Without
    /// a previous classification of that court an empty one is shown.
    pub fn refresh_banner(&mut self, court_id: CourtId, ctx: &RenderContext) -> ViewUpdate {
        let result = match self
            .last_result
            .as_ref()
            .filter(|result| result.court_id == court_id && result.viewer == ctx.viewer)
        {
            Some(result) => result.clone(),
            None => classify(&CourtSnapshot::empty(court_id), ctx.viewer, ctx.now),
        };
        self.reconcile(&result, ctx)
    }

    fn publish(&mut self, model: ViewModel) -> ViewUpdate {
        if self.last.as_ref() == Some(&model) {
            return ViewUpdate::Unchanged;
        }
        self.painter.paint(&model);
        self.tx.send_replace(Some(model.clone()));
        self.last = Some(model.clone());
        ViewUpdate::Replaced(model)
    }

    pub fn last_result(&self) -> Option<&ClassificationResult> {
        self.last_result.as_ref()
    }

    pub fn last(&self) -> Option<&ViewModel> {
        self.last.as_ref()
    }

    pub fn watcher(&self) -> watch::Receiver<Option<ViewModel>> {
        self.tx.subscribe()
    }

    /// Stream of every replaced view, starting with the current one.
    pub fn subscribe(&self) -> WatchStream<Option<ViewModel>> {
        WatchStream::new(self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serde_json::json;
    use time::{Duration, macros::datetime};

    use super::*;
    use crate::dto::{TournamentId, tournament::TournamentDto};
    use crate::state::guards::GuardViolation;

    struct CountingPainter(Arc<AtomicUsize>);

    impl Paint for CountingPainter {
        fn paint(&self, _model: &ViewModel) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    const NOW: PrimitiveDateTime = datetime!(2025-05-01 18:00);

    fn ctx(viewer: Option<i64>) -> RenderContext {
        RenderContext {
            viewer: viewer.map(UserId),
            now: NOW,
            busy: HashSet::new(),
            banner: None,
        }
    }

    fn court_snapshot() -> CourtSnapshot {
        let mut snapshot = CourtSnapshot::empty(CourtId(1));
        let game: crate::dto::matches::MatchDto = serde_json::from_value(json!({
            "id": 10, "court_id": 1, "match_type": "singles", "status": "in_progress",
            "players": [{"user_id": 1, "team": 1}, {"user_id": 2, "team": 2}]
        }))
        .unwrap();
        let lobby: crate::dto::lobby::LobbyDto = serde_json::from_value(json!({
            "id": 20, "court_id": 1, "match_type": "singles", "source": "scheduled_challenge",
            "status": "ready", "scheduled_for": "2025-05-01T19:00:00",
            "players": [
                {"user_id": 3, "team": 1, "acceptance_status": "accepted"},
                {"user_id": 4, "team": 2, "acceptance_status": "accepted"}
            ]
        }))
        .unwrap();
        snapshot
            .matches
            .insert(game.id, Match::try_from(game).unwrap());
        snapshot
            .lobbies
            .insert(lobby.id, Lobby::try_from(lobby).unwrap());
        snapshot
    }

    #[test]
    fn rendering_is_idempotent_and_paints_once() {
        let painted = Arc::new(AtomicUsize::new(0));
        let mut renderer = ReconcilingRenderer::new(Box::new(CountingPainter(painted.clone())));
        let result = classify(&court_snapshot(), Some(UserId(1)), NOW);

        assert_eq!(render(&result, &ctx(Some(1))), render(&result, &ctx(Some(1))));
        assert!(matches!(
            renderer.reconcile(&result, &ctx(Some(1))),
            ViewUpdate::Replaced(_)
        ));
        assert_eq!(
            renderer.reconcile(&result, &ctx(Some(1))),
            ViewUpdate::Unchanged
        );
        assert_eq!(painted.load(Ordering::SeqCst), 1);

        let mut busy = ctx(Some(1));
        busy.busy.insert(ActionTarget::Match(crate::dto::MatchId(10)));
        assert!(matches!(
            renderer.reconcile(&result, &busy),
            ViewUpdate::Replaced(_)
        ));
        assert_eq!(painted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn players_get_controls_and_spectators_do_not() {
        let snapshot = court_snapshot();
        let key = ItemKey::Match(crate::dto::MatchId(10));

        let player = render(&classify(&snapshot, Some(UserId(1)), NOW), &ctx(Some(1)));
        let card = player.card(key).unwrap();
        assert!(card.actions.contains(&ActionKind::EnterScore));
        assert!(card.actions.contains(&ActionKind::CancelMatch));
        assert_eq!(player.badge, 1);
        assert_eq!(
            player.court_actions,
            vec![
                ActionKind::JoinQueue(crate::dto::MatchType::Singles),
                ActionKind::JoinQueue(crate::dto::MatchType::Doubles)
            ]
        );

        let spectator = render(&classify(&snapshot, Some(UserId(9)), NOW), &ctx(Some(9)));
        assert!(spectator.card(key).unwrap().actions.is_empty());
        assert_eq!(spectator.badge, 0);

        let anonymous = render(&classify(&snapshot, None, NOW), &ctx(None));
        assert!(anonymous.court_actions.is_empty());
    }

    #[test]
    fn early_scheduled_start_shows_reason() {
        let snapshot = court_snapshot();
        let key = ItemKey::Lobby(crate::dto::LobbyId(20));

        let early = render(&classify(&snapshot, Some(UserId(3)), NOW), &ctx(Some(3)));
        assert_eq!(early.badge, 0);
        assert_eq!(early.section(SectionKind::Scheduled).unwrap().cards.len(), 1);
        let card = early.card(key).unwrap();
        assert!(!card.actions.contains(&ActionKind::StartGame));
        assert_eq!(
            card.blocked_reason.as_deref(),
            Some(GuardViolation::TooEarly.to_string().as_str())
        );

        let mut later = ctx(Some(3));
        later.now = NOW + Duration::hours(2);
        let on_time = render(&classify(&snapshot, Some(UserId(3)), later.now), &later);
        assert!(on_time.card(key).unwrap().actions.contains(&ActionKind::StartGame));
        assert_eq!(on_time.badge, 1);
        assert!(on_time.section(SectionKind::Scheduled).is_none());
    }

    #[test]
    fn host_sees_why_start_is_withheld() {
        let dto: TournamentDto = serde_json::from_value(json!({
            "id": 30, "court_id": 1, "host_user_id": 1, "name": "Friday Bash",
            "status": "upcoming", "match_type": "singles", "max_players": 8,
            "min_participants": 4, "registered_count": 3
        }))
        .unwrap();
        let mut snapshot = CourtSnapshot::empty(CourtId(1));
        snapshot
            .tournaments
            .insert(dto.id, Tournament::try_from(dto).unwrap());

        let view = render(&classify(&snapshot, Some(UserId(1)), NOW), &ctx(Some(1)));
        let card = view.card(ItemKey::Tournament(TournamentId(30))).unwrap();
        assert!(!card.actions.contains(&ActionKind::StartTournament));
        assert_eq!(
            card.blocked_reason.as_deref(),
            Some("Need at least 4 participants to start")
        );
        assert_eq!(view.tournaments.upcoming, 1);
    }

    fn listed_tournament(participants: Option<serde_json::Value>) -> CourtSnapshot {
        let mut payload = json!({
            "id": 31, "court_id": 1, "host_user_id": 1, "name": "Open Cup",
            "status": "upcoming", "match_type": "singles", "max_players": 8,
            "min_participants": 2, "registered_count": 1
        });
        if let Some(participants) = participants {
            payload["participants"] = participants;
        }
        let dto: TournamentDto = serde_json::from_value(payload).unwrap();
        let mut snapshot = CourtSnapshot::empty(CourtId(1));
        snapshot
            .tournaments
            .insert(dto.id, Tournament::try_from(dto).unwrap());
        snapshot
    }

    #[test]
    fn listed_tournament_without_roster_offers_view_only() {
        let key = ItemKey::Tournament(TournamentId(31));
        let listed = listed_tournament(None);

        let player = render(&classify(&listed, Some(UserId(5)), NOW), &ctx(Some(5)));
        assert_eq!(
            player.card(key).unwrap().actions,
            vec![ActionKind::ViewTournament]
        );
        let host = render(&classify(&listed, Some(UserId(1)), NOW), &ctx(Some(1)));
        let actions = &host.card(key).unwrap().actions;
        assert!(actions.contains(&ActionKind::CancelTournament));
        assert!(!actions.contains(&ActionKind::JoinTournament));

        let detailed = listed_tournament(Some(json!([
            {"user_id": 5, "participant_status": "registered", "invite_status": "accepted"}
        ])));
        let registered = render(&classify(&detailed, Some(UserId(5)), NOW), &ctx(Some(5)));
        assert_eq!(
            registered.card(key).unwrap().actions,
            vec![ActionKind::ViewTournament, ActionKind::Withdraw]
        );
        let stranger = render(&classify(&detailed, Some(UserId(6)), NOW), &ctx(Some(6)));
        assert!(
            stranger
                .card(key)
                .unwrap()
                .actions
                .contains(&ActionKind::JoinTournament)
        );
    }

    #[test]
    fn failed_refresh_keeps_content_and_adds_banner() {
        let mut renderer = ReconcilingRenderer::new(Box::new(NullPainter));
        let result = classify(&court_snapshot(), Some(UserId(1)), NOW);
        renderer.reconcile(&result, &ctx(Some(1)));

        let mut failing = ctx(Some(1));
        failing.banner = Some(Banner::Unavailable);
        let ViewUpdate::Replaced(model) = renderer.refresh_banner(CourtId(1), &failing) else {
            panic!("banner change must repaint");
        };
        assert_eq!(model.banner, Some(Banner::Unavailable));
        assert_eq!(model.badge, 1);
        assert!(to_text(&model).contains("unable to load"));
        assert_eq!(renderer.watcher().borrow().as_ref(), Some(&model));
    }
}
