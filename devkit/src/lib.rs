/*!
# PC-Watch DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le développement du dashboard PC-Watch avec:
- Backend stub HTTP pour tests sans serveur de monitoring
- Builders des payloads JSON (rapports, alertes, statistiques)
- Harness de test avec assertions sur les écritures
*/

pub mod stub_backend;
pub mod fixtures;
pub mod test_utils;

pub use stub_backend::{ReadEndpoint, ReadFailure, RecordedWrite, StubBackend};
pub use fixtures::ReportBuilder;
pub use test_utils::TestHarness;
