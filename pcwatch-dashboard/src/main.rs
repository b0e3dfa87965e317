/**
 * PCWATCH DASHBOARD - Point d'entrée du serveur de tableau de bord
 *
 * RÔLE : Charge la config, démarre la boucle de poll vers le backend de
 * monitoring, puis sert les pages HTTP.
 *
 * ARCHITECTURE : poll périodique -> DashboardState partagé -> rendu askama à
 * chaque requête ; les éditions passent par le backend puis re-pollent.
 */

mod backend;
mod config;
mod edits;
mod http;
mod models;
mod poller;
mod state;
mod status;
mod view;

use crate::backend::BackendClient;
use crate::config::load_config;
use crate::http::AppState;
use crate::poller::Dashboard;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pcwatch_dashboard=info,tower_http=info")),
        )
        .init();

    let cfg = load_config().await;
    info!(
        backend = %cfg.backend_url,
        every = ?cfg.refresh_interval(),
        "📊 PC Watch dashboard starting"
    );

    let backend = BackendClient::new(&cfg.backend_url, cfg.request_timeout())
        .with_context(|| format!("invalid backend url {}", cfg.backend_url))?;
    let dashboard = Dashboard::new(backend);

    // premier fetch immédiat puis toutes les N secondes
    dashboard.spawn_poll_loop(cfg.refresh_interval());

    let bind = cfg.bind.clone();
    let app = http::build_router(AppState {
        dashboard,
        config: Arc::new(cfg),
    });

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await.context("HTTP server stopped")?;
    Ok(())
}
