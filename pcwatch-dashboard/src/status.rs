/**
 * STATUS - Dérivation locale de l'état d'un PC
 *
 * RÔLE :
 * Calcule, à chaque rendu, l'état affiché d'un rapport à partir de règles
 * purement locales évaluées contre l'horloge murale.
 *
 * FONCTIONNEMENT :
 * - État de carte : offline (> 24h) > warning (disque ≥ 80% ou PST ≥ 2 Go) > online
 * - Barres disque : normal < 80%, warning 80-89%, danger ≥ 90% (évaluées par disque)
 * - Âge d'archive : vert < 90 j, orange < 180 j, rouge sinon, neutre si non défini
 *
 * Rien n'est persisté : une carte peut changer d'état entre deux polls
 * uniquement parce que l'horloge avance.
 */

use crate::models::Report;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub const STALE_AFTER_HOURS: i64 = 24;
pub const DRIVE_WARNING_PERCENT: f64 = 80.0;
pub const DRIVE_DANGER_PERCENT: f64 = 90.0;
pub const PST_WARNING_GB: f64 = 2.0;
pub const ARCHIVE_AMBER_DAYS: i64 = 90;
pub const ARCHIVE_RED_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcStatus {
    Online,
    Warning,
    Offline,
}

impl PcStatus {
    pub fn css_class(&self) -> &'static str {
        match self {
            PcStatus::Online => "online",
            PcStatus::Warning => "warning",
            PcStatus::Offline => "offline",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PcStatus::Online => "Normal",
            PcStatus::Warning => "Warning",
            PcStatus::Offline => "Stale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveLevel {
    Normal,
    Warning,
    Danger,
}

impl DriveLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            DriveLevel::Normal => "normal",
            DriveLevel::Warning => "warning",
            DriveLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveTier {
    Green,
    Amber,
    Red,
    Neutral,
}

impl ArchiveTier {
    pub fn css_class(&self) -> &'static str {
        match self {
            ArchiveTier::Green => "archive-green",
            ArchiveTier::Amber => "archive-amber",
            ArchiveTier::Red => "archive-red",
            ArchiveTier::Neutral => "archive-unset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveAge {
    pub tier: ArchiveTier,
    pub days: Option<i64>,
    pub label: String,
}

/// RFC 3339, or naive `YYYY-MM-DD HH:MM:SS` read in the local time zone.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

pub fn drive_level(used_percent: f64) -> DriveLevel {
    if used_percent >= DRIVE_DANGER_PERCENT {
        DriveLevel::Danger
    } else if used_percent >= DRIVE_WARNING_PERCENT {
        DriveLevel::Warning
    } else {
        DriveLevel::Normal
    }
}

/// Storage or PST pressure, independent of report age.
pub fn has_warnings(report: &Report) -> bool {
    report.drives.iter().any(|d| d.used_percent >= DRIVE_WARNING_PERCENT)
        || report.total_pst_size_gb >= PST_WARNING_GB
}

/// Offline wins over warning; an unreadable timestamp counts as stale.
pub fn derive_status(report: &Report, now: DateTime<Utc>) -> PcStatus {
    match parse_timestamp(&report.timestamp) {
        None => PcStatus::Offline,
        Some(seen) if now - seen > Duration::hours(STALE_AFTER_HOURS) => PcStatus::Offline,
        Some(_) if has_warnings(report) => PcStatus::Warning,
        Some(_) => PcStatus::Online,
    }
}

pub fn archive_age(last_archive_date: Option<&str>, today: NaiveDate) -> ArchiveAge {
    let raw = match last_archive_date.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return ArchiveAge {
                tier: ArchiveTier::Neutral,
                days: None,
                label: "unset".into(),
            }
        }
    };

    // the backend may still hand back "YYYY-MM-DD HH:MM:SS"
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
        return ArchiveAge {
            tier: ArchiveTier::Neutral,
            days: None,
            label: raw.to_string(),
        };
    };

    let days = (today - date).num_days();
    if days < 0 {
        // date saisie dans le futur : âge nul, signalé tel quel
        return ArchiveAge {
            tier: ArchiveTier::Green,
            days: Some(0),
            label: format!("{} (in {} days)", date.format("%Y-%m-%d"), -days),
        };
    }
    let tier = if days >= ARCHIVE_RED_DAYS {
        ArchiveTier::Red
    } else if days >= ARCHIVE_AMBER_DAYS {
        ArchiveTier::Amber
    } else {
        ArchiveTier::Green
    };

    ArchiveAge {
        tier,
        days: Some(days),
        label: format!("{} ({} days ago)", date.format("%Y-%m-%d"), days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcwatch_devkit::fixtures::ReportBuilder;

    fn report(builder: ReportBuilder) -> Report {
        serde_json::from_value(builder.build()).unwrap()
    }

    #[test]
    fn test_stale_report_is_offline_whatever_the_load() {
        let now = Utc::now();
        let r = report(
            ReportBuilder::new("PC-01")
                .reported_at(now - Duration::hours(25))
                .drive("C:", 100.0, 99.0)
                .total_pst_size_gb(10.0),
        );
        assert_eq!(derive_status(&r, now), PcStatus::Offline);

        let r = report(ReportBuilder::new("PC-02").reported_at(now - Duration::hours(25)));
        assert_eq!(derive_status(&r, now), PcStatus::Offline);
    }

    #[test]
    fn test_exactly_24h_is_not_stale() {
        let now = Utc::now();
        let r = report(ReportBuilder::new("PC-01").reported_at(now - Duration::hours(24)));
        assert_eq!(derive_status(&r, now), PcStatus::Online);
    }

    #[test]
    fn test_warning_thresholds() {
        let now = Utc::now();
        let fresh = || ReportBuilder::new("PC-01").reported_at(now - Duration::hours(1));

        let with_drive =
            |percent: f64| derive_status(&report(fresh().drive("C:", 100.0, percent)), now);
        assert_eq!(with_drive(85.0), PcStatus::Warning);
        assert_eq!(with_drive(80.0), PcStatus::Warning);
        assert_eq!(with_drive(79.9), PcStatus::Online);
        assert_eq!(derive_status(&report(fresh().total_pst_size_gb(2.0)), now), PcStatus::Warning);
        assert_eq!(derive_status(&report(fresh().total_pst_size_gb(1.99)), now), PcStatus::Online);
        assert_eq!(
            derive_status(&report(fresh().drive("C:", 100.0, 40.0).drive("D:", 500.0, 92.0)), now),
            PcStatus::Warning
        );
    }

    #[test]
    fn test_unreadable_timestamp_is_offline() {
        let r = report(ReportBuilder::new("PC-01").reported_naive("yesterday-ish"));
        assert_eq!(derive_status(&r, Utc::now()), PcStatus::Offline);
    }

    #[test]
    fn test_naive_timestamp_is_local_time() {
        let now = Utc::now();
        let local = (now - Duration::hours(2)).with_timezone(&Local);
        let naive = local.format("%Y-%m-%d %H:%M:%S").to_string();
        let r = report(ReportBuilder::new("PC-01").reported_naive(naive));
        assert_eq!(derive_status(&r, now), PcStatus::Online);

        let parsed = parse_timestamp(&r.timestamp).unwrap();
        assert!((now - parsed - Duration::hours(2)).num_seconds().abs() <= 1);
    }

    #[test]
    fn test_drive_levels() {
        assert_eq!(drive_level(0.0), DriveLevel::Normal);
        assert_eq!(drive_level(79.99), DriveLevel::Normal);
        assert_eq!(drive_level(80.0), DriveLevel::Warning);
        assert_eq!(drive_level(89.9), DriveLevel::Warning);
        assert_eq!(drive_level(90.0), DriveLevel::Danger);
        assert_eq!(drive_level(100.0).css_class(), "danger");
    }

    #[test]
    fn test_archive_tiers() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let ago = |days: i64| (today - Duration::days(days)).format("%Y-%m-%d").to_string();
        let tier = |days: i64| archive_age(Some(ago(days).as_str()), today).tier;

        assert_eq!(tier(0), ArchiveTier::Green);
        assert_eq!(tier(89), ArchiveTier::Green);
        assert_eq!(tier(90), ArchiveTier::Amber);
        assert_eq!(tier(179), ArchiveTier::Amber);
        assert_eq!(tier(180), ArchiveTier::Red);

        let age = archive_age(Some(ago(200).as_str()), today);
        assert_eq!(age.tier, ArchiveTier::Red);
        assert_eq!(age.days, Some(200));
        assert_eq!(age.label, format!("{} (200 days ago)", ago(200)));
    }

    #[test]
    fn test_archive_unset_and_garbage() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();

        let unset = archive_age(None, today);
        assert_eq!(unset.tier, ArchiveTier::Neutral);
        assert_eq!(unset.days, None);
        assert_eq!(unset.label, "unset");
        assert_eq!(archive_age(Some("  "), today).label, "unset");

        let garbage = archive_age(Some("2024-13-45"), today);
        assert_eq!(garbage.tier, ArchiveTier::Neutral);
        assert_eq!(garbage.label, "2024-13-45");

        let with_time = archive_age(Some("2024-09-01 18:00:00"), today);
        assert_eq!(with_time.days, Some(30));
    }

    #[test]
    fn test_future_archive_date_is_flagged() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();

        let future = archive_age(Some("2024-10-04"), today);
        assert_eq!(future.tier, ArchiveTier::Green);
        assert_eq!(future.days, Some(0));
        assert_eq!(future.label, "2024-10-04 (in 3 days)");
        assert!(!future.label.contains("days ago"));
    }
}
