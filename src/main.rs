//! tourney-desk binary entrypoint wiring REST, WebSocket, storage and Challonge layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tourney_desk::{
    challonge::Challonge,
    config::AppConfig,
    dao::tournament_store::{MemoryStore, TournamentStore},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let challonge = challonge_client(&config);
    let app_state = AppState::new(config, challonge);

    spawn_storage(app_state.clone());
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Challonge client when `CHALLONGE_API_KEY` is set.
#[cfg(feature = "challonge")]
fn challonge_client(config: &AppConfig) -> Option<Arc<dyn Challonge>> {
    let key = env::var("CHALLONGE_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())?;
    match tourney_desk::challonge::HttpChallonge::new(config.challonge_base_url(), key) {
        Ok(client) => {
            info!(base_url = config.challonge_base_url(), "Challonge sync enabled");
            Some(Arc::new(client))
        }
        Err(err) => {
            warn!(error = %err, "failed to build Challonge client; sync disabled");
            None
        }
    }
}

#[cfg(not(feature = "challonge"))]
fn challonge_client(_config: &AppConfig) -> Option<Arc<dyn Challonge>> {
    if env::var_os("CHALLONGE_API_KEY").is_some() {
        warn!("CHALLONGE_API_KEY set but the `challonge` feature is disabled");
    }
    None
}

/// Start the storage supervisor: MongoDB when `MONGO_URI` is set, memory otherwise.
fn spawn_storage(state: SharedState) {
    match env::var("MONGO_URI").ok() {
        #[cfg(feature = "mongo-store")]
        Some(uri) => {
            use tourney_desk::dao::tournament_store::mongodb::{MongoConfig, MongoTournamentStore};

            let db_name = env::var("MONGO_DB").ok();
            info!("using MongoDB tournament store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let uri = uri.clone();
                let db_name = db_name.clone();
                async move {
                    let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
                    let store = MongoTournamentStore::connect(config).await?;
                    Ok(Arc::new(store) as Arc<dyn TournamentStore>)
                }
            }));
        }
        other => {
            if other.is_some() {
                warn!("MONGO_URI set but the `mongo-store` feature is disabled");
            }
            info!("MONGO_URI not set; using the in-memory tournament store");
            tokio::spawn(storage_supervisor::run(state, || async {
                Ok(Arc::new(MemoryStore::new()) as Arc<dyn TournamentStore>)
            }));
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
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
                warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
