/**
 * VIEW - Modèles de vue et pages askama
 *
 * RÔLE :
 * Projette le DashboardState (et un rapport pour la modale de détail) en
 * structures prêtes à afficher. Les templates ne font aucun calcul : seuils,
 * formats de date et troncatures sont résolus ici.
 *
 * Toutes les chaînes venant du backend passent par l'échappement automatique
 * d'askama ; aucun HTML n'est construit à la main.
 */

use crate::models::{Alert, Report, Statistics};
use crate::state::DashboardState;
use crate::status::{archive_age, derive_status, drive_level, parse_timestamp};
use askama::Template;
use chrono::{DateTime, Local, NaiveDate, Utc};

const EMAIL_MAX_CHARS: usize = 25;
const EMAIL_KEEP_CHARS: usize = 22;

pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server-side seed of the header clock; the page script ticks it from there.
pub fn format_clock(at: DateTime<Local>) -> String {
    at.format(CLOCK_FORMAT).to_string()
}

/// "just now", "N min ago", "N h ago", "N days ago"; "-" when unknown.
pub fn relative_age(then: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(then) = then else {
        return "-".into();
    };
    let minutes = (now - then).num_minutes().max(0);
    if minutes < 1 {
        "just now".into()
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else if minutes < 60 * 24 {
        format!("{} h ago", minutes / 60)
    } else {
        format!("{} days ago", minutes / (60 * 24))
    }
}

/// `YYYY-MM-DD HH:MM` in local time; unreadable values are shown as received.
pub fn format_datetime(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => "-".into(),
        Some(raw) => match parse_timestamp(raw) {
            Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            None => raw.to_string(),
        },
    }
}

pub fn truncate_email(address: &str) -> String {
    if address.chars().count() > EMAIL_MAX_CHARS {
        let head: String = address.chars().take(EMAIL_KEEP_CHARS).collect();
        format!("{head}...")
    } else {
        address.to_string()
    }
}

fn gb(value: f64) -> String {
    format!("{value:.2} GB")
}

#[derive(Debug, Clone)]
pub struct StatsView {
    pub total_pcs: u64,
    pub today_reports: u64,
    pub total_alerts: usize,
    pub last_report: String,
}

impl StatsView {
    pub fn new(statistics: &Statistics, alerts: &[Alert], now: DateTime<Utc>) -> Self {
        let last = statistics.last_report_time.as_deref().and_then(parse_timestamp);
        Self {
            total_pcs: statistics.total_pcs,
            today_reports: statistics.today_reports,
            total_alerts: alerts.len(),
            last_report: relative_age(last, now),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertView {
    pub computer_name: String,
    pub severity_class: &'static str,
    pub kind: String,
    pub message: String,
    pub time: String,
}

impl From<&Alert> for AlertView {
    fn from(alert: &Alert) -> Self {
        Self {
            computer_name: alert.computer_name.clone(),
            severity_class: alert.severity.css_class(),
            kind: alert.kind.clone().unwrap_or_default(),
            message: alert.message.clone(),
            time: format_datetime(alert.timestamp.as_deref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriveBar {
    pub drive: String,
    pub percent: String,
    /// Bar width in percent, clamped to 0..=100
    pub width: String,
    pub level_class: &'static str,
    pub usage: String,
}

impl DriveBar {
    fn new(drive: &crate::models::Drive) -> Self {
        Self {
            drive: drive.drive.clone(),
            percent: format!("{:.1}%", drive.used_percent),
            width: format!("{:.0}", drive.used_percent.clamp(0.0, 100.0)),
            level_class: drive_level(drive.used_percent).css_class(),
            usage: format!(
                "{:.1} / {:.1} GB ({:.1} GB free)",
                drive.used_gb, drive.total_gb, drive.free_gb
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CardView {
    pub computer_name: String,
    pub shown_name: String,
    pub user_name: String,
    pub status_class: &'static str,
    pub status_label: &'static str,
    pub ip_address: String,
    pub last_seen: String,
    pub drives: Vec<DriveBar>,
    pub pst_total: String,
    pub primary_email: String,
    pub period_emails: u64,
    pub archive_class: &'static str,
    pub archive_label: String,
}

impl CardView {
    pub fn new(report: &Report, now: DateTime<Utc>, today: NaiveDate) -> Self {
        let status = derive_status(report, now);
        let archive = archive_age(report.last_archive_date.as_deref(), today);
        let primary_email = report
            .active_email_accounts
            .first()
            .and_then(|a| a.email_address.as_deref())
            .filter(|a| !a.trim().is_empty())
            .map(truncate_email)
            .unwrap_or_else(|| "-".into());

        Self {
            computer_name: report.computer_name.clone(),
            shown_name: report.shown_name().to_string(),
            user_name: report.user_name.clone(),
            status_class: status.css_class(),
            status_label: status.label(),
            ip_address: report
                .ip_address
                .clone()
                .filter(|ip| !ip.trim().is_empty())
                .unwrap_or_else(|| "-".into()),
            last_seen: format_datetime(Some(&report.timestamp)),
            drives: report.drives.iter().map(DriveBar::new).collect(),
            pst_total: gb(report.total_pst_size_gb),
            primary_email,
            period_emails: report.mail_info.as_ref().map(|m| m.period_count()).unwrap_or(0),
            archive_class: archive.tier.css_class(),
            archive_label: archive.label,
        }
    }
}

/// Everything the main page shows, computed from one locked read of the state.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub stats: StatsView,
    pub alerts: Vec<AlertView>,
    pub cards: Vec<CardView>,
    pub poll_error: Option<String>,
    pub last_refresh: String,
}

impl DashboardView {
    pub fn new(state: &DashboardState, now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        Self {
            stats: StatsView::new(&state.statistics, &state.alerts, now),
            alerts: state.alerts.iter().map(AlertView::from).collect(),
            cards: state.reports.iter().map(|r| CardView::new(r, now, today)).collect(),
            poll_error: state.poll_error.clone(),
            last_refresh: state
                .last_refresh
                .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "never".into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PstRow {
    pub name: String,
    pub size: String,
    pub last_modified: String,
}

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub display_name: String,
    pub email_address: String,
    pub account_type: String,
}

#[derive(Debug, Clone)]
pub struct MailView {
    pub total_emails: String,
    pub period_emails: u64,
    pub inbox_size: String,
}

#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub time: String,
    pub peak_drive: String,
    pub pst_total: String,
}

impl HistoryRow {
    fn new(report: &Report) -> Self {
        let peak = report
            .drives
            .iter()
            .map(|d| d.used_percent)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))));
        Self {
            time: format_datetime(Some(&report.timestamp)),
            peak_drive: peak.map(|p| format!("{p:.1}%")).unwrap_or_else(|| "-".into()),
            pst_total: gb(report.total_pst_size_gb),
        }
    }
}

/// Detail modal: optional sections are empty vectors, mail is `None` when
/// Outlook figures are unavailable.
#[derive(Debug, Clone)]
pub struct DetailView {
    pub card: CardView,
    pub pst_files: Vec<PstRow>,
    pub accounts: Vec<AccountRow>,
    pub mail: Option<MailView>,
    /// `None` when the history fetch failed
    pub history: Option<Vec<HistoryRow>>,
    pub history_days: u32,
}

impl DetailView {
    pub fn new(
        report: &Report,
        history: Option<&[Report]>,
        history_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        let or_dash = |v: &Option<String>| {
            v.clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "-".into())
        };

        Self {
            card: CardView::new(report, now, today),
            pst_files: report
                .pst_files
                .iter()
                .map(|p| PstRow {
                    name: p.name.clone(),
                    size: gb(p.size_gb),
                    last_modified: format_datetime(Some(&p.last_modified)),
                })
                .collect(),
            accounts: report
                .active_email_accounts
                .iter()
                .map(|a| AccountRow {
                    display_name: or_dash(&a.display_name),
                    email_address: or_dash(&a.email_address),
                    account_type: or_dash(&a.account_type),
                })
                .collect(),
            mail: report.mail_info.as_ref().filter(|m| m.is_available()).map(|m| MailView {
                total_emails: m.total_emails.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                period_emails: m.period_count(),
                inbox_size: m
                    .inbox_size_mb
                    .map(|mb| format!("{mb:.1} MB"))
                    .unwrap_or_else(|| "-".into()),
            }),
            history: history.map(|rows| rows.iter().map(HistoryRow::new).collect()),
            history_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub is_error: bool,
    pub message: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub refresh_secs: u64,
    /// Where the meta refresh goes: `/`, keeping an open detail modal
    pub refresh_target: String,
    pub clock: String,
    /// Period of the in-page clock ticker
    pub clock_tick_ms: u64,
    pub view: DashboardView,
    pub flash: Option<Flash>,
    pub detail: Option<DetailView>,
}

/// Which inline edit a form page is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    DisplayName,
    ArchiveDate,
}

impl EditField {
    pub fn slug(&self) -> &'static str {
        match self {
            EditField::DisplayName => "display-name",
            EditField::ArchiveDate => "archive-date",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            EditField::DisplayName => "Change display name",
            EditField::ArchiveDate => "Set last archive date",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            EditField::DisplayName => "Shown on the card instead of the Windows user name.",
            EditField::ArchiveDate => "Format: YYYY-MM-DD",
        }
    }
}

#[derive(Template)]
#[template(path = "edit_form.html")]
pub struct EditFormPage {
    pub field: EditField,
    pub computer_name: String,
    pub shown_name: String,
    pub value: String,
}
