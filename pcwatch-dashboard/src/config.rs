use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the monitoring backend, ex: "http://10.0.0.5:5000"
    pub backend_url: String,
    pub bind: String,
    pub refresh_interval_secs: u64,
    pub clock_tick_millis: u64,
    pub history_days: u32,
    pub request_timeout_secs: Option<u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".into(),
            bind: "0.0.0.0:8080".into(),
            refresh_interval_secs: 30,
            clock_tick_millis: 1000,
            history_days: 7,
            request_timeout_secs: None,
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_millis.max(100))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// PCWATCH_BACKEND_URL / PCWATCH_BIND prennent le pas sur le fichier
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("PCWATCH_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend_url = url;
            }
        }
        if let Ok(bind) = std::env::var("PCWATCH_BIND") {
            if !bind.trim().is_empty() {
                self.bind = bind;
            }
        }
        self
    }
}

pub async fn load_config() -> DashboardConfig {
    let path =
        std::env::var("PCWATCH_DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard.yaml".into());
    load_config_from(&path).await.apply_env_overrides()
}

pub async fn load_config_from(path: &str) -> DashboardConfig {
    if Path::new(path).exists() {
        let txt = fs::read_to_string(path).await.unwrap_or_default();
        if txt.trim().is_empty() { return DashboardConfig::default(); }
        parse_config(&txt).unwrap_or_else(|e| {
            tracing::warn!("invalid config {path}: {e}, using defaults");
            DashboardConfig::default()
        })
    } else {
        tracing::info!("no {path}, using default config");
        DashboardConfig::default()
    }
}

fn parse_config(txt: &str) -> Result<DashboardConfig, serde_yaml::Error> {
    let mut cfg: DashboardConfig = serde_yaml::from_str(txt)?;
    cfg.backend_url = cfg.backend_url.trim_end_matches('/').to_string();
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg =
            parse_config("backend_url: http://monitor.local:5000/\nrefresh_interval_secs: 10\n")
                .unwrap();
        assert_eq!(cfg.backend_url, "http://monitor.local:5000");
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(10));
        assert_eq!(cfg.bind, "0.0.0.0:8080");
        assert_eq!(cfg.history_days, 7);
        assert!(cfg.request_timeout().is_none());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_config("refresh_interval_secs: [not, a, number]").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let cfg = load_config_from("/nonexistent/pcwatch/dashboard.yaml").await;
        assert_eq!(cfg.refresh_interval_secs, 30);
        assert_eq!(cfg.clock_tick(), Duration::from_secs(1));
    }
}
