//! Inline edit flows: display name and last archive date.
//!
//! Both flows share one shape: validate locally, PUT to the backend, then
//! re-poll on success. The caller gets the result as an [`EditOutcome`].

use crate::backend::BackendError;
use crate::poller::Dashboard;
use chrono::Local;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Empty or unchanged input, nothing sent.
    Unchanged,
    /// Rejected before any network call.
    Invalid(String),
    Applied(String),
    /// The backend answered with a non-success status.
    Rejected(String),
    /// Transport or decode failure.
    Failed(String),
}

impl EditOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, EditOutcome::Invalid(_) | EditOutcome::Rejected(_) | EditOutcome::Failed(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            EditOutcome::Unchanged => None,
            EditOutcome::Invalid(m)
            | EditOutcome::Applied(m)
            | EditOutcome::Rejected(m)
            | EditOutcome::Failed(m) => Some(m),
        }
    }
}

fn date_shape() -> &'static Regex {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    // [0-9] et pas \d : \d est Unicode dans `regex`
    DATE_SHAPE.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("static regex"))
}

/// Strict `YYYY-MM-DD` shape; calendar validity is left to the backend.
pub fn is_valid_date_shape(input: &str) -> bool {
    date_shape().is_match(input)
}

/// Seed of the archive-date form: the current value, else today.
pub fn archive_date_seed(current: Option<&str>) -> String {
    match current {
        Some(date) if !date.trim().is_empty() => date.to_string(),
        _ => Local::now().date_naive().format("%Y-%m-%d").to_string(),
    }
}

async fn after_write(dashboard: &Dashboard, what: &str, computer_name: &str) {
    info!(computer_name, "{what} updated, re-polling");
    // la notice de poll couvre déjà l'échec éventuel
    if let Err(e) = dashboard.refresh().await {
        warn!(error = %e, "re-poll after {what} update failed");
    }
}

pub async fn rename(
    dashboard: &Dashboard,
    computer_name: &str,
    windows_user: &str,
    current: &str,
    input: &str,
) -> EditOutcome {
    let new_name = input.trim();
    if new_name.is_empty() || new_name == current {
        return EditOutcome::Unchanged;
    }

    match dashboard
        .backend()
        .update_display_name(computer_name, windows_user, new_name)
        .await
    {
        Ok(_) => {
            after_write(dashboard, "display name", computer_name).await;
            EditOutcome::Applied(format!("Display name changed to \"{new_name}\"."))
        }
        Err(BackendError::Rejected { message }) => {
            EditOutcome::Rejected(format!("Display name change failed: {message}"))
        }
        Err(e) => {
            warn!(computer_name, error = %e, "display name update failed");
            EditOutcome::Failed("An error occurred while changing the display name.".into())
        }
    }
}

pub async fn set_archive_date(
    dashboard: &Dashboard,
    computer_name: &str,
    current: Option<&str>,
    input: &str,
) -> EditOutcome {
    let new_date = input.trim();
    if new_date.is_empty() || Some(new_date) == current {
        return EditOutcome::Unchanged;
    }
    if !is_valid_date_shape(new_date) {
        return EditOutcome::Invalid("Invalid date format (YYYY-MM-DD).".into());
    }

    match dashboard.backend().update_archive_date(computer_name, new_date).await {
        Ok(_) => {
            after_write(dashboard, "archive date", computer_name).await;
            EditOutcome::Applied(format!("Archive date changed to \"{new_date}\"."))
        }
        Err(BackendError::Rejected { message }) => {
            EditOutcome::Rejected(format!("Archive date change failed: {message}"))
        }
        Err(e) => {
            warn!(computer_name, error = %e, "archive date update failed");
            EditOutcome::Failed("An error occurred while changing the archive date.".into())
        }
    }
}
