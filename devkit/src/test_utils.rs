/*!
Test Harness pour le dashboard PC-Watch

Facilite l'écriture de tests avec:
- Démarrage automatique du backend stub
- Assertions sur les écritures reçues par le backend
- Attente active sur les lectures (boucle de poll)
*/

use crate::stub_backend::{ReadEndpoint, RecordedWrite, RunningStub, StubBackend};
use anyhow::Result;
use serde_json::Value;
use std::time::Duration;

/// Harness de test complet : backend stub démarré + helpers d'assertion
pub struct TestHarness {
    pub backend: StubBackend,
    running: RunningStub,
}

impl TestHarness {
    /// Démarre un backend stub vide
    pub async fn start() -> Result<Self> {
        Self::with_backend(StubBackend::new()).await
    }

    /// Démarre un backend stub préconfiguré
    pub async fn with_backend(backend: StubBackend) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let running = backend.spawn().await?;
        Ok(Self { backend, running })
    }

    pub fn base_url(&self) -> &str {
        &self.running.base_url
    }

    /// Assert qu'une écriture avec ce corps a été reçue
    pub fn assert_write_sent(
        &self,
        kind: &str,
        computer_name: &str,
        expected_body: &Value,
    ) -> Result<()> {
        let writes = self.backend.find_writes(kind);

        for write in &writes {
            if write.computer_name == computer_name && write.body == *expected_body {
                log::info!("✅ Found expected {} write for {}", kind, computer_name);
                return Ok(());
            }
        }

        anyhow::bail!(
            "Expected {} write for {} not found (got {:?})",
            kind,
            computer_name,
            writes
        );
    }

    /// Assert qu'aucune écriture n'a atteint le backend
    pub fn assert_no_writes(&self) -> Result<()> {
        let writes: Vec<RecordedWrite> = self.backend.recorded_writes();
        if !writes.is_empty() {
            anyhow::bail!("Expected no backend writes, got {:?}", writes);
        }
        Ok(())
    }

    /// Attend qu'un endpoint de lecture ait été appelé au moins `count` fois
    pub async fn wait_for_reads(
        &self,
        endpoint: ReadEndpoint,
        count: usize,
        timeout_ms: u64,
    ) -> bool {
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if self.backend.read_hits(endpoint) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        log::warn!("⏰ Timeout waiting for {} reads on {:?}", count, endpoint);
        false
    }
}
