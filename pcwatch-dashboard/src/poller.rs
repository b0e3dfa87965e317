/**
 * POLLER - Boucle de rafraîchissement des données du dashboard
 *
 * RÔLE :
 * Récupère périodiquement statistiques + rapports + alertes et remplace le
 * cache en bloc. Point d'entrée unique des mises à jour du DashboardState.
 *
 * FONCTIONNEMENT :
 * - Un fetch immédiat au démarrage, puis un toutes les N secondes (30 par défaut)
 * - Tout ou rien par cycle : un échec garde l'affichage précédent + notice d'erreur
 * - Pas de backoff ni de budget de retry, on retente au tick suivant
 * - Chaque cycle prend un ticket au départ ; un cycle parti plus tôt ne peut
 *   jamais écraser le résultat d'un cycle parti plus tard
 */

use crate::backend::{BackendClient, BackendError};
use crate::models::Report;
use crate::state::{new_state, DashboardState, Shared};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub struct Dashboard {
    backend: BackendClient,
    state: Shared<DashboardState>,
    tickets: AtomicU64,
}

pub type SharedDashboard = Arc<Dashboard>;

impl Dashboard {
    pub fn new(backend: BackendClient) -> SharedDashboard {
        Arc::new(Self {
            backend,
            state: new_state(DashboardState::default()),
            tickets: AtomicU64::new(0),
        })
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn state(&self) -> &Shared<DashboardState> {
        &self.state
    }

    /// Runs one poll cycle and applies it unless a newer cycle already did.
    pub async fn refresh(&self) -> Result<(), BackendError> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();

        match self.backend.fetch_snapshot().await {
            Ok(snapshot) => {
                let (reports, alerts) = (snapshot.reports.len(), snapshot.alerts.len());
                let applied = self.state.lock().apply_snapshot(ticket, snapshot, Utc::now());
                if applied {
                    debug!(
                        ticket,
                        reports,
                        alerts,
                        elapsed = ?started.elapsed(),
                        "dashboard refreshed"
                    );
                } else {
                    debug!(ticket, "refresh superseded by a newer cycle, dropped");
                }
                Ok(())
            }
            Err(e) => {
                warn!(ticket, error = %e, "dashboard refresh failed, keeping previous data");
                self.state
                    .lock()
                    .record_failure(ticket, format!("Failed to load dashboard data: {e}"));
                Err(e)
            }
        }
    }

    pub fn find_report(&self, computer_name: &str) -> Option<Report> {
        self.state.lock().find_report(computer_name).cloned()
    }

    /// Fetch once immediately, then every `every`, forever.
    pub fn spawn_poll_loop(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let dashboard = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // un cycle lent ne doit pas provoquer une rafale de rattrapage
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                // l'erreur est déjà loggée et affichée, on attend le prochain tick
                let _ = dashboard.refresh().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcwatch_devkit::fixtures::ReportBuilder;
    use pcwatch_devkit::{ReadEndpoint, ReadFailure, StubBackend, TestHarness};

    async fn setup(backend: StubBackend) -> (TestHarness, SharedDashboard) {
        let harness = TestHarness::with_backend(backend).await.unwrap();
        let client = BackendClient::new(harness.base_url(), None).unwrap();
        (harness, Dashboard::new(client))
    }

    #[tokio::test]
    async fn test_refresh_fills_state() {
        let (_harness, dashboard) =
            setup(StubBackend::new().with_reports(vec![ReportBuilder::new("PC-01").build()])).await;

        dashboard.refresh().await.unwrap();

        let state = dashboard.state().lock();
        assert_eq!(state.reports.len(), 1);
        assert!(state.last_refresh.is_some());
        assert!(state.poll_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_render() {
        let (harness, dashboard) =
            setup(StubBackend::new().with_reports(vec![ReportBuilder::new("PC-01").build()])).await;
        dashboard.refresh().await.unwrap();

        harness.backend.set_reports(vec![]);
        harness.backend.fail(ReadEndpoint::Statistics, ReadFailure::ServerError);
        assert!(dashboard.refresh().await.is_err());

        {
            let state = dashboard.state().lock();
            assert_eq!(state.reports.len(), 1);
            let notice = state.poll_error.as_deref().unwrap();
            assert!(notice.starts_with("Failed to load dashboard data"));
        }

        // le cycle suivant réussit et efface la notice
        harness.backend.restore(ReadEndpoint::Statistics);
        dashboard.refresh().await.unwrap();
        let state = dashboard.state().lock();
        assert!(state.reports.is_empty());
        assert!(state.poll_error.is_none());
    }

    #[tokio::test]
    async fn test_poll_loop_fetches_immediately_and_repeats() {
        let (harness, dashboard) = setup(StubBackend::new()).await;

        let handle = dashboard.spawn_poll_loop(Duration::from_millis(50));
        assert!(harness.wait_for_reads(ReadEndpoint::Reports, 1, 1000).await);
        assert!(harness.wait_for_reads(ReadEndpoint::Reports, 3, 2000).await);
        handle.abort();
    }

    #[tokio::test]
    async fn test_poll_loop_survives_failures() {
        let backend = StubBackend::new();
        backend.fail(ReadEndpoint::Alerts, ReadFailure::MalformedBody);
        let (harness, dashboard) = setup(backend).await;

        let handle = dashboard.spawn_poll_loop(Duration::from_millis(50));
        assert!(harness.wait_for_reads(ReadEndpoint::Alerts, 3, 2000).await);
        assert!(dashboard.state().lock().poll_error.is_some());
        handle.abort();
    }
}
