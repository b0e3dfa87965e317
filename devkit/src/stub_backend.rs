/*!
Stub du backend de monitoring pour développement sans serveur réel

Sert les mêmes routes que le backend (lecture + écriture) depuis un état en
mémoire, sur un port éphémère. Enregistre toutes les écritures reçues et
permet de simuler des pannes par endpoint.
*/

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Endpoints de lecture pouvant être mis en panne
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadEndpoint {
    Statistics,
    Reports,
    Alerts,
    History,
}

/// Manière dont un endpoint de lecture échoue
#[derive(Debug, Clone)]
pub enum ReadFailure {
    /// HTTP 500 avec un corps non JSON
    ServerError,
    /// HTTP 200 avec un corps JSON illisible
    MalformedBody,
    /// Enveloppe `{"status": "error", "message": ...}`
    Rejected(String),
}

/// Écriture reçue par le stub (pour assertions de tests)
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    /// `user-mappings` ou `archive-date`
    pub kind: String,
    pub computer_name: String,
    pub body: Value,
}

#[derive(Debug, Default)]
struct StubData {
    statistics: Option<Value>,
    reports: Vec<Value>,
    alerts: Vec<Value>,
    history: HashMap<String, Vec<Value>>,
    failures: HashMap<ReadEndpoint, ReadFailure>,
    write_rejection: Option<String>,
    writes: Vec<RecordedWrite>,
    read_hits: HashMap<ReadEndpoint, usize>,
}

/// Backend simulé, partageable entre le test et le serveur
#[derive(Clone, Default)]
pub struct StubBackend {
    data: Arc<Mutex<StubData>>,
}

/// Serveur stub démarré ; arrêté au drop
pub struct RunningStub {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(self, reports: Vec<Value>) -> Self {
        self.set_reports(reports);
        self
    }

    pub fn with_alerts(self, alerts: Vec<Value>) -> Self {
        self.set_alerts(alerts);
        self
    }

    pub fn with_statistics(self, statistics: Value) -> Self {
        self.set_statistics(statistics);
        self
    }

    pub fn set_reports(&self, reports: Vec<Value>) {
        self.data.lock().reports = reports;
    }

    pub fn set_alerts(&self, alerts: Vec<Value>) {
        self.data.lock().alerts = alerts;
    }

    pub fn set_statistics(&self, statistics: Value) {
        self.data.lock().statistics = Some(statistics);
    }

    pub fn set_history(&self, computer_name: &str, history: Vec<Value>) {
        self.data.lock().history.insert(computer_name.to_string(), history);
    }

    /// Met un endpoint de lecture en panne jusqu'à `restore`
    pub fn fail(&self, endpoint: ReadEndpoint, failure: ReadFailure) {
        self.data.lock().failures.insert(endpoint, failure);
    }

    pub fn restore(&self, endpoint: ReadEndpoint) {
        self.data.lock().failures.remove(&endpoint);
    }

    /// Toutes les écritures suivantes répondent `{"status": "error", "message": ...}`
    pub fn reject_writes<S: Into<String>>(&self, message: S) {
        self.data.lock().write_rejection = Some(message.into());
    }

    pub fn accept_writes(&self) {
        self.data.lock().write_rejection = None;
    }

    /// Récupère toutes les écritures reçues
    pub fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.data.lock().writes.clone()
    }

    /// Écritures d'un type donné (`user-mappings`, `archive-date`)
    pub fn find_writes(&self, kind: &str) -> Vec<RecordedWrite> {
        self.data
            .lock()
            .writes
            .iter()
            .filter(|w| w.kind == kind)
            .cloned()
            .collect()
    }

    /// Nombre de requêtes reçues sur un endpoint de lecture
    pub fn read_hits(&self, endpoint: ReadEndpoint) -> usize {
        self.data.lock().read_hits.get(&endpoint).copied().unwrap_or(0)
    }

    /// Reset des écritures et compteurs entre deux étapes de test
    pub fn clear(&self) {
        let mut data = self.data.lock();
        data.writes.clear();
        data.read_hits.clear();
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/statistics", get(get_statistics))
            .route("/api/reports/latest", get(get_latest_reports))
            .route("/api/reports/history/{computer_name}", get(get_history))
            .route("/api/alerts", get(get_alerts))
            .route("/api/user-mappings/{computer_name}", put(put_user_mapping))
            .route("/api/archive-date/{computer_name}", put(put_archive_date))
            .with_state(self.clone())
    }

    /// Démarre le stub sur 127.0.0.1 avec un port éphémère
    pub async fn spawn(&self) -> Result<RunningStub> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ [STUB] server stopped: {}", e);
            }
        });

        log::info!("🧪 [STUB] backend listening on http://{}", addr);
        Ok(RunningStub {
            base_url: format!("http://{}", addr),
            handle,
        })
    }

    fn hit(&self, endpoint: ReadEndpoint) -> Option<ReadFailure> {
        let mut data = self.data.lock();
        *data.read_hits.entry(endpoint).or_insert(0) += 1;
        data.failures.get(&endpoint).cloned()
    }
}

fn success(data: Value) -> (StatusCode, String) {
    let body = serde_json::json!({ "status": "success", "data": data });
    (StatusCode::OK, body.to_string())
}

fn failure_response(failure: ReadFailure) -> (StatusCode, String) {
    match failure {
        ReadFailure::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>Internal Server Error</html>".to_string(),
        ),
        ReadFailure::MalformedBody => {
            (StatusCode::OK, "{\"status\": \"success\", \"data\": [".to_string())
        }
        ReadFailure::Rejected(message) => {
            let body = serde_json::json!({ "status": "error", "message": message });
            (StatusCode::INTERNAL_SERVER_ERROR, body.to_string())
        }
    }
}

// Les réponses sont du JSON brut : `MalformedBody` doit pouvoir renvoyer un corps invalide
fn json_response(
    (status, body): (StatusCode, String),
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    (status, [("content-type", "application/json")], body)
}

async fn get_statistics(State(stub): State<StubBackend>) -> impl axum::response::IntoResponse {
    if let Some(failure) = stub.hit(ReadEndpoint::Statistics) {
        return json_response(failure_response(failure));
    }
    let data = stub.data.lock();
    let statistics = data.statistics.clone().unwrap_or_else(|| {
        serde_json::json!({
            "total_pcs": data.reports.len(),
            "today_reports": data.reports.len(),
            "last_report_time": Value::Null
        })
    });
    json_response(success(statistics))
}

async fn get_latest_reports(State(stub): State<StubBackend>) -> impl axum::response::IntoResponse {
    if let Some(failure) = stub.hit(ReadEndpoint::Reports) {
        return json_response(failure_response(failure));
    }
    let reports = stub.data.lock().reports.clone();
    json_response(success(Value::Array(reports)))
}

async fn get_alerts(State(stub): State<StubBackend>) -> impl axum::response::IntoResponse {
    if let Some(failure) = stub.hit(ReadEndpoint::Alerts) {
        return json_response(failure_response(failure));
    }
    let alerts = stub.data.lock().alerts.clone();
    json_response(success(Value::Array(alerts)))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    days: Option<u32>,
}

async fn get_history(
    State(stub): State<StubBackend>,
    Path(computer_name): Path<String>,
    Query(params): Query<HistoryParams>,
) -> impl axum::response::IntoResponse {
    if let Some(failure) = stub.hit(ReadEndpoint::History) {
        return json_response(failure_response(failure));
    }
    log::debug!("📜 [STUB] history for {} ({:?} days)", computer_name, params.days);
    let history = stub
        .data
        .lock()
        .history
        .get(&computer_name)
        .cloned()
        .unwrap_or_default();
    json_response(success(Value::Array(history)))
}

fn record_write(
    stub: &StubBackend,
    kind: &str,
    computer_name: &str,
    body: &Value,
) -> Option<String> {
    let mut data = stub.data.lock();
    data.writes.push(RecordedWrite {
        kind: kind.to_string(),
        computer_name: computer_name.to_string(),
        body: body.clone(),
    });
    log::info!("📤 [STUB] {} write for {}", kind, computer_name);
    data.write_rejection.clone()
}

fn write_result(rejection: Option<String>, ok_message: &str) -> (StatusCode, Json<Value>) {
    match rejection {
        Some(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "status": "error", "message": message })),
        ),
        None => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success", "message": ok_message })),
        ),
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "status": "error", "message": message })),
    )
}

async fn put_user_mapping(
    State(stub): State<StubBackend>,
    Path(computer_name): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let rejection = record_write(&stub, "user-mappings", &computer_name, &body);
    let Some(display_name) = body.get("display_name").and_then(Value::as_str) else {
        return bad_request("display_name is required");
    };

    if rejection.is_none() {
        let mut data = stub.data.lock();
        for report in data.reports.iter_mut() {
            if report["computer_name"] == computer_name.as_str() {
                report["display_name"] = Value::String(display_name.to_string());
            }
        }
    }
    write_result(rejection, "display name updated")
}

async fn put_archive_date(
    State(stub): State<StubBackend>,
    Path(computer_name): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let rejection = record_write(&stub, "archive-date", &computer_name, &body);
    let Some(archive_date) = body.get("archive_date").and_then(Value::as_str) else {
        return bad_request("archive_date is required");
    };
    if chrono::NaiveDate::parse_from_str(archive_date, "%Y-%m-%d").is_err() {
        return bad_request("invalid date format (YYYY-MM-DD)");
    }

    if rejection.is_none() {
        let mut data = stub.data.lock();
        for report in data.reports.iter_mut() {
            if report["computer_name"] == computer_name.as_str() {
                report["last_archive_date"] = Value::String(archive_date.to_string());
            }
        }
    }
    write_result(rejection, "archive date updated")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ReportBuilder;

    #[tokio::test]
    async fn test_stub_serves_envelopes() {
        let stub = StubBackend::new().with_reports(vec![ReportBuilder::new("PC-01").build()]);
        let running = stub.spawn().await.unwrap();

        let body: Value = reqwest::get(format!("{}/api/reports/latest", running.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "success");
        assert_eq!(body["data"][0]["computer_name"], "PC-01");
        assert_eq!(stub.read_hits(ReadEndpoint::Reports), 1);
    }

    #[tokio::test]
    async fn test_stub_records_and_applies_writes() {
        let stub = StubBackend::new().with_reports(vec![ReportBuilder::new("PC 7").build()]);
        let running = stub.spawn().await.unwrap();

        let response = reqwest::Client::new()
            .put(format!("{}/api/user-mappings/PC%207", running.base_url))
            .json(&serde_json::json!({ "windows_user": "user", "display_name": "Kim" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let writes = stub.find_writes("user-mappings");
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].computer_name, "PC 7");
        assert_eq!(stub.data.lock().reports[0]["display_name"], "Kim");
    }

    #[tokio::test]
    async fn test_stub_failure_modes() {
        let stub = StubBackend::new();
        stub.fail(ReadEndpoint::Alerts, ReadFailure::Rejected("db locked".into()));
        let running = stub.spawn().await.unwrap();

        let response = reqwest::get(format!("{}/api/alerts", running.base_url)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "db locked");

        stub.restore(ReadEndpoint::Alerts);
        let body: Value = reqwest::get(format!("{}/api/alerts", running.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "success");
    }
}
