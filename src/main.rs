//! Courtside ranked binary: keeps one court's action center refreshed until shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtside_ranked::{
    config::AppConfig,
    dao::{
        api::ApiError,
        ranked_api::{
            RankedApi,
            http::{ApiConfig, HttpRankedApi},
        },
        session::{FileSessionStore, Session, SessionStore},
    },
    services::{render::TracingPainter, scheduler},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let api_config = match ApiConfig::from_env() {
        Ok(api_config) => api_config,
        Err(err) => {
            info!(
                reason = %err,
                base_url = %config.api_base_url,
                "using configured backend"
            );
            ApiConfig::new(config.api_base_url.clone())
        }
    };

    let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::open(&config.session_path));
    if let Some(token) = api_config.token.clone() {
        if session.token().as_deref() != Some(token.as_str()) {
            session
                .store(Session { token, user: None })
                .context("storing session token")?;
        }
    }

    let api: Arc<dyn RankedApi> = Arc::new(
        HttpRankedApi::new(api_config, session.clone()).context("building ranked api client")?,
    );
    resolve_viewer(api.as_ref(), session.as_ref()).await;

    let state = AppState::with_timeout(
        api,
        session,
        Box::new(TracingPainter),
        Some(config.transition_timeout),
    );
    state.set_open_court(config.court_id).await;
    match config.court_id {
        Some(court_id) => info!(court_id = %court_id, "opening court"),
        None => info!("no court configured; refreshing notifications only"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = tokio::spawn(scheduler::run(
        state.clone(),
        config.poll_interval,
        shutdown_rx,
    ));

    shutdown_signal().await;
    info!("shutting down");
    shutdown_tx.send_replace(true);
    refresher.await.context("joining refresh scheduler")?;

    Ok(())
}

/// Fill in the signed-in user when the session only carries a token.
async fn resolve_viewer(api: &dyn RankedApi, session: &dyn SessionStore) {
    let Some(token) = session.token() else {
        info!("no session; browsing anonymously");
        return;
    };
    if session.viewer().is_some() {
        return;
    }

    match api.profile().await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "signed in");
            if let Err(err) = session.store(Session {
                token,
                user: Some(user),
            }) {
                warn!(error = %err, "failed to persist session");
            }
        }
        Err(ApiError::Unauthorized) => info!("stored session expired; browsing anonymously"),
        Err(err) => warn!(error = %err, "could not resolve signed-in user"),
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,courtside_ranked=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
