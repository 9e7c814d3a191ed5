//! Periodic lightweight refresh of notifications and the open court.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    dto::{CourtId, UserId, common::utc_now},
    error::ServiceError,
    services::{
        classifier::classify,
        court_session::{load_court_session, remote},
        render::{Banner, RenderContext},
    },
    state::{InFlightGuard, RefreshScope, SharedState},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// Tick every `period` until `shutdown` flips to `true` or its sender goes away.
///
/// A tick whose scope is still being fetched is dropped rather than queued.
pub async fn run(state: SharedState, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_ms = period.as_millis() as u64, "ranked refresh scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => tick(&state),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("ranked refresh scheduler stopped");
}

fn tick(state: &SharedState) {
    match state.in_flight().try_begin(RefreshScope::Notifications) {
        Some(guard) => {
            let state = state.clone();
            tokio::spawn(async move {
                let _guard = guard;
                if let Err(err) = refresh_notifications(&state).await {
                    warn!(error = %err, "notification refresh failed");
                }
            });
        }
        None => debug!("notification refresh still running; tick dropped"),
    }

    let Some(court_id) = state.open_court() else {
        return;
    };
    match state.in_flight().try_begin(RefreshScope::Court(court_id)) {
        Some(guard) => {
            let state = state.clone();
            tokio::spawn(async move {
                if let Err(err) = drive_court(&state, guard, court_id).await {
                    warn!(court_id = %court_id, error = %err, "court refresh failed");
                }
            });
        }
        None => debug!(court_id = %court_id, "court refresh still running; tick dropped"),
    }
}

/// Reload the open court right away, outside the timer.
///
/// When a load of the same court is already running, that load is asked to run once more
/// and this call returns immediately.
pub async fn refresh_now(state: &SharedState) -> Result<(), ServiceError> {
    let Some(court_id) = state.open_court() else {
        return Ok(());
    };
    match state
        .in_flight()
        .begin_or_rerun(RefreshScope::Court(court_id))
    {
        Some(guard) => drive_court(state, guard, court_id).await,
        None => {
            debug!(court_id = %court_id, "court refresh running; requested another pass");
            Ok(())
        }
    }
}

async fn drive_court(
    state: &SharedState,
    mut guard: InFlightGuard,
    court_id: CourtId,
) -> Result<(), ServiceError> {
    loop {
        let outcome = reload_and_render(state, court_id).await;
        if guard.finish() {
            return outcome;
        }
    }
}

fn context(state: &SharedState, viewer: Option<UserId>, banner: Option<Banner>) -> RenderContext {
    RenderContext {
        viewer,
        now: utc_now(),
        busy: state.pending_targets(),
        banner,
    }
}

/// Re-render the last classification with the current busy targets, keeping its banner.
pub(crate) async fn repaint(state: &SharedState) {
    let mut renderer = state.renderer().lock().await;
    let Some(result) = renderer
        .last_result()
        .filter(|result| {
            Some(result.court_id) == state.open_court() && result.viewer == state.viewer()
        })
        .cloned()
    else {
        return;
    };
    let banner = renderer.last().and_then(|model| model.banner);
    let ctx = context(state, result.viewer, banner);
    renderer.reconcile(&result, &ctx);
}

async fn reload_and_render(state: &SharedState, court_id: CourtId) -> Result<(), ServiceError> {
    match load_court_session(state, court_id).await {
        Ok(snapshot) => {
            if state.open_court() != Some(court_id) {
                return Ok(());
            }
            let viewer = state.viewer();
            let ctx = context(state, viewer, None);
            let result = classify(&snapshot, viewer, ctx.now);
            state.renderer().lock().await.reconcile(&result, &ctx);
            Ok(())
        }
        Err(err) => {
            if state.open_court() == Some(court_id) {
                let banner = match err {
                    ServiceError::Unauthorized(_) => Banner::SignedOut,
                    _ => Banner::Unavailable,
                };
                let ctx = context(state, state.viewer(), Some(banner));
                state
                    .renderer()
                    .lock()
                    .await
                    .refresh_banner(court_id, &ctx);
            }
            Err(err)
        }
    }
}

/// Update the unread-notification count. Anonymous viewers have nothing unread.
pub async fn refresh_notifications(state: &SharedState) -> Result<usize, ServiceError> {
    if state.session().token().is_none() {
        state.set_unread(0);
        return Ok(0);
    }
    match remote(state, state.api().notifications()).await {
        Ok(response) => {
            let unread = response.unread_count();
            state.set_unread(unread);
            Ok(unread)
        }
        Err(err) => {
            if let ServiceError::Unauthorized(_) = err {
                state.set_unread(0);
            }
            Err(err)
        }
    }
}
