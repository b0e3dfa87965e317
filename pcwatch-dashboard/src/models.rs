use serde::{Deserialize, Deserializer, Serialize};

// Tout ce que renvoie le backend est tolérant : champs absents ou `null` => défaut.

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Enveloppe commune `{status, data | message}` de toutes les réponses backend
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Latest self-reported snapshot of one machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub computer_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub user_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_default")]
    pub drives: Vec<Drive>,
    #[serde(default, deserialize_with = "null_default")]
    pub pst_files: Vec<PstFile>,
    #[serde(default, deserialize_with = "null_default")]
    pub total_pst_size_gb: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub active_email_accounts: Vec<EmailAccount>,
    #[serde(default)]
    pub mail_info: Option<MailInfo>,
    #[serde(default)]
    pub last_archive_date: Option<String>,
}

impl Report {
    /// display_name override, falling back to the Windows user name
    pub fn shown_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.user_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    #[serde(default, deserialize_with = "null_default")]
    pub drive: String,
    #[serde(default, deserialize_with = "null_default")]
    pub total_gb: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub used_gb: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub free_gb: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub used_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PstFile {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub size_gb: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAccount {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    #[serde(default)]
    pub total_emails: Option<u64>,
    #[serde(default)]
    pub period_emails: Option<u64>,
    #[serde(default)]
    pub today_emails: Option<u64>,
    #[serde(default)]
    pub inbox_size_mb: Option<f64>,
}

impl MailInfo {
    pub fn is_available(&self) -> bool {
        self.status == "success"
    }

    /// period_emails, else today_emails (older agents), else 0
    pub fn period_count(&self) -> u64 {
        self.period_emails
            .filter(|n| *n > 0)
            .or(self.today_emails)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// CSS class of the alert row
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub computer_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub severity: Severity,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default, deserialize_with = "null_default")]
    pub total_pcs: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub today_reports: u64,
    #[serde(default)]
    pub last_report_time: Option<String>,
}

/// Corps de `PUT /api/user-mappings/{computer_name}`
#[derive(Debug, Serialize)]
pub struct UserMappingUpdate<'a> {
    pub windows_user: &'a str,
    pub display_name: &'a str,
}

/// Corps de `PUT /api/archive-date/{computer_name}`
#[derive(Debug, Serialize)]
pub struct ArchiveDateUpdate<'a> {
    pub archive_date: &'a str,
}

/// Result of one successful poll cycle: the three read endpoints together.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub statistics: Statistics,
    pub reports: Vec<Report>,
    pub alerts: Vec<Alert>,
}
