/**
 * HTTP - Serveur axum du dashboard
 *
 * RÔLE :
 * Sert la page principale (cartes, alertes, modale de détail), les formulaires
 * d'édition et un instantané JSON du cache.
 *
 * FONCTIONNEMENT :
 * - GET / : rendu askama depuis le DashboardState, `?detail=` ouvre la modale
 * - GET/POST /pcs/{name}/display-name et /pcs/{name}/archive-date : formulaires,
 *   puis redirection vers / avec `?notice=` ou `?error=` (Post/Redirect/Get)
 * - POST /refresh : poll manuel ; GET /api/snapshot : cache en JSON
 * - GET /health : liveness
 *
 * Les handlers ne tiennent jamais le verrou du state pendant un await.
 */

use crate::config::DashboardConfig;
use crate::edits::{self, archive_date_seed, EditOutcome};
use crate::models::Snapshot;
use crate::poller::SharedDashboard;
use crate::view::{
    format_clock, DashboardPage, DashboardView, DetailView, EditField, EditFormPage, Flash,
};
use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{Local, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use url::form_urlencoded;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: SharedDashboard,
    pub config: Arc<DashboardConfig>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/refresh", post(manual_refresh))
        .route("/api/snapshot", get(get_snapshot))
        .route("/pcs/{name}/display-name", get(display_name_form).post(submit_display_name))
        .route("/pcs/{name}/archive-date", get(archive_date_form).post(submit_archive_date))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

fn render<T: Template>(page: &T) -> Response {
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "rendering failed").into_response()
        }
    }
}

fn query_of(key: &str, value: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish()
}

fn back_with(key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("/?{}", query_of(key, message)))
}

fn back_with_outcome(outcome: &EditOutcome) -> Redirect {
    match outcome.message() {
        None => Redirect::to("/"),
        Some(message) if outcome.is_error() => back_with("error", message),
        Some(message) => back_with("notice", message),
    }
}

fn unknown_pc(name: &str) -> Redirect {
    back_with("error", &format!("Unknown computer: {name}"))
}

#[derive(Debug, Default, Deserialize)]
struct IndexParams {
    notice: Option<String>,
    error: Option<String>,
    detail: Option<String>,
}

// GET /
async fn index(State(app): State<AppState>, Query(params): Query<IndexParams>) -> Response {
    let now = Utc::now();
    let (view, detail_report) = {
        let state = app.dashboard.state().lock();
        let detail_report = params
            .detail
            .as_deref()
            .and_then(|name| state.find_report(name).cloned());
        (DashboardView::new(&state, now), detail_report)
    };

    let mut flash = match (params.error, params.notice) {
        (Some(message), _) => Some(Flash { is_error: true, message }),
        (None, Some(message)) => Some(Flash { is_error: false, message }),
        (None, None) => None,
    };

    let detail = match (&params.detail, detail_report) {
        (Some(_), Some(report)) => {
            let days = app.config.history_days;
            // best-effort : un échec masque juste la section historique
            let fetched = app
                .dashboard
                .backend()
                .fetch_history(&report.computer_name, days)
                .await;
            let history = match fetched {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!(
                        computer_name = %report.computer_name,
                        error = %e,
                        "history fetch failed"
                    );
                    None
                }
            };
            Some(DetailView::new(&report, history.as_deref(), days, now))
        }
        (Some(name), None) => {
            flash.get_or_insert(Flash {
                is_error: true,
                message: format!("Unknown computer: {name}"),
            });
            None
        }
        (None, _) => None,
    };

    let refresh_target = match &detail {
        Some(d) => format!("/?{}", query_of("detail", &d.card.computer_name)),
        None => "/".to_string(),
    };

    render(&DashboardPage {
        refresh_secs: app.config.refresh_interval().as_secs(),
        refresh_target,
        clock: format_clock(Local::now()),
        clock_tick_ms: app.config.clock_tick().as_millis() as u64,
        view,
        flash,
        detail,
    })
}

// POST /refresh
async fn manual_refresh(State(app): State<AppState>) -> Redirect {
    // l'échec reste visible via la notice de poll
    let _ = app.dashboard.refresh().await;
    Redirect::to("/")
}

// GET /api/snapshot
async fn get_snapshot(State(app): State<AppState>) -> Json<Snapshot> {
    Json(app.dashboard.state().lock().snapshot())
}

#[derive(Debug, Deserialize)]
struct EditForm {
    #[serde(default)]
    value: String,
}

// GET /pcs/{name}/display-name
async fn display_name_form(State(app): State<AppState>, Path(name): Path<String>) -> Response {
    let Some(report) = app.dashboard.find_report(&name) else {
        return unknown_pc(&name).into_response();
    };
    render(&EditFormPage {
        field: EditField::DisplayName,
        shown_name: report.shown_name().to_string(),
        value: report.shown_name().to_string(),
        computer_name: report.computer_name,
    })
}

// POST /pcs/{name}/display-name
async fn submit_display_name(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<EditForm>,
) -> Redirect {
    let Some(report) = app.dashboard.find_report(&name) else {
        return unknown_pc(&name);
    };
    let outcome = edits::rename(
        &app.dashboard,
        &report.computer_name,
        &report.user_name,
        report.shown_name(),
        &form.value,
    )
    .await;
    back_with_outcome(&outcome)
}

// GET /pcs/{name}/archive-date
async fn archive_date_form(State(app): State<AppState>, Path(name): Path<String>) -> Response {
    let Some(report) = app.dashboard.find_report(&name) else {
        return unknown_pc(&name).into_response();
    };
    render(&EditFormPage {
        field: EditField::ArchiveDate,
        shown_name: report.shown_name().to_string(),
        value: archive_date_seed(report.last_archive_date.as_deref()),
        computer_name: report.computer_name,
    })
}

// POST /pcs/{name}/archive-date
async fn submit_archive_date(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<EditForm>,
) -> Redirect {
    let Some(report) = app.dashboard.find_report(&name) else {
        return unknown_pc(&name);
    };
    let outcome = edits::set_archive_date(
        &app.dashboard,
        &report.computer_name,
        report.last_archive_date.as_deref(),
        &form.value,
    )
    .await;
    back_with_outcome(&outcome)
}
