/*!
Builders pour les payloads JSON du backend de monitoring

Facilite l'écriture de tests en fournissant des constructeurs pour:
- Les rapports PC (`/api/reports/latest`, `/api/reports/history/{pc}`)
- Les alertes (`/api/alerts`)
- Les statistiques (`/api/statistics`)

Les payloads sont produits en `serde_json::Value` afin de tester aussi le
décodage côté dashboard, champs manquants et `null` compris.
*/

use chrono::{DateTime, Duration, Local, Utc};
use serde_json::{Map, Value};

/// Construction d'un rapport PC tel que le backend le renvoie
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    payload: Map<String, Value>,
    drives: Vec<Value>,
    pst_files: Vec<Value>,
    accounts: Vec<Value>,
}

impl ReportBuilder {
    /// Rapport frais (horodaté maintenant) sans disque ni PST
    pub fn new<S: Into<String>>(computer_name: S) -> Self {
        let mut payload = Map::new();
        payload.insert("computer_name".into(), Value::String(computer_name.into()));
        payload.insert("user_name".into(), Value::String("user".into()));
        payload.insert("ip_address".into(), Value::String("192.168.0.10".into()));
        payload.insert("timestamp".into(), Value::String(Utc::now().to_rfc3339()));
        payload.insert("total_pst_size_gb".into(), Value::from(0.0));
        payload.insert(
            "mail_info".into(),
            serde_json::json!({
                "status": "success",
                "total_emails": 0,
                "period_emails": 0,
                "inbox_size_mb": 0
            }),
        );

        Self {
            payload,
            drives: Vec::new(),
            pst_files: Vec::new(),
            accounts: Vec::new(),
        }
    }

    /// Définit un champ brut dans le payload
    pub fn set_field<S: Into<String>>(mut self, field: S, value: Value) -> Self {
        self.payload.insert(field.into(), value);
        self
    }

    pub fn user<S: Into<String>>(self, user_name: S) -> Self {
        self.set_field("user_name", Value::String(user_name.into()))
    }

    pub fn display_name<S: Into<String>>(self, display_name: S) -> Self {
        self.set_field("display_name", Value::String(display_name.into()))
    }

    pub fn ip<S: Into<String>>(self, ip_address: S) -> Self {
        self.set_field("ip_address", Value::String(ip_address.into()))
    }

    /// Horodatage RFC 3339
    pub fn reported_at(self, at: DateTime<Utc>) -> Self {
        self.set_field("timestamp", Value::String(at.to_rfc3339()))
    }

    pub fn reported_hours_ago(self, hours: i64) -> Self {
        self.reported_at(Utc::now() - Duration::hours(hours))
    }

    /// Horodatage naïf `YYYY-MM-DD HH:MM:SS`, comme l'écrivent les agents Windows
    pub fn reported_naive<S: Into<String>>(self, timestamp: S) -> Self {
        self.set_field("timestamp", Value::String(timestamp.into()))
    }

    /// Ajoute un disque ; used/free sont déduits du pourcentage
    pub fn drive<S: Into<String>>(mut self, letter: S, total_gb: f64, used_percent: f64) -> Self {
        let used_gb = (total_gb * used_percent / 100.0 * 100.0).round() / 100.0;
        let free_gb = ((total_gb - used_gb) * 100.0).round() / 100.0;
        self.drives.push(serde_json::json!({
            "drive": letter.into(),
            "total_gb": total_gb,
            "used_gb": used_gb,
            "free_gb": free_gb,
            "used_percent": used_percent
        }));
        self
    }

    /// Ajoute un fichier PST et l'additionne au total
    pub fn pst_file<S: Into<String>>(mut self, name: S, size_gb: f64, last_modified: S) -> Self {
        self.pst_files.push(serde_json::json!({
            "name": name.into(),
            "size_gb": size_gb,
            "last_modified": last_modified.into()
        }));
        let total = self
            .payload
            .get("total_pst_size_gb")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        self.set_field("total_pst_size_gb", Value::from(total + size_gb))
    }

    pub fn total_pst_size_gb(self, total: f64) -> Self {
        self.set_field("total_pst_size_gb", Value::from(total))
    }

    pub fn email_account<S: Into<String>>(
        mut self,
        display_name: S,
        address: S,
        account_type: S,
    ) -> Self {
        self.accounts.push(serde_json::json!({
            "display_name": display_name.into(),
            "email_address": address.into(),
            "account_type": account_type.into()
        }));
        self
    }

    pub fn mail_info(self, total_emails: u64, period_emails: u64, inbox_size_mb: f64) -> Self {
        self.set_field(
            "mail_info",
            serde_json::json!({
                "status": "success",
                "total_emails": total_emails,
                "period_emails": period_emails,
                "inbox_size_mb": inbox_size_mb
            }),
        )
    }

    /// Outlook injoignable côté agent
    pub fn mail_unavailable(self) -> Self {
        self.set_field(
            "mail_info",
            serde_json::json!({ "status": "error", "message": "Outlook not running" }),
        )
    }

    pub fn archive_date<S: Into<String>>(self, date: S) -> Self {
        self.set_field("last_archive_date", Value::String(date.into()))
    }

    pub fn archived_days_ago(self, days: i64) -> Self {
        let date = Local::now().date_naive() - Duration::days(days);
        self.archive_date(date.format("%Y-%m-%d").to_string())
    }

    pub fn build(&self) -> Value {
        let mut payload = self.payload.clone();
        payload.insert("drives".into(), Value::Array(self.drives.clone()));
        payload.insert("pst_files".into(), Value::Array(self.pst_files.clone()));
        payload.insert("active_email_accounts".into(), Value::Array(self.accounts.clone()));
        Value::Object(payload)
    }
}

/// Alerte telle que produite par `/api/alerts`
pub fn alert(computer_name: &str, severity: &str, kind: &str, message: &str) -> Value {
    serde_json::json!({
        "type": kind,
        "severity": severity,
        "computer_name": computer_name,
        "message": message,
        "timestamp": Utc::now().to_rfc3339()
    })
}

/// Statistiques telles que produites par `/api/statistics`
pub fn statistics(total_pcs: u64, today_reports: u64, last_report_time: Option<&str>) -> Value {
    serde_json::json!({
        "total_pcs": total_pcs,
        "today_reports": today_reports,
        "last_report_time": last_report_time
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_builder_defaults() {
        let report = ReportBuilder::new("PC-01").build();

        assert_eq!(report["computer_name"], "PC-01");
        assert_eq!(report["user_name"], "user");
        assert!(report["timestamp"].is_string());
        assert_eq!(report["drives"], Value::Array(vec![]));
        assert_eq!(report["mail_info"]["status"], "success");
        assert!(report.get("display_name").is_none());
        assert!(report.get("last_archive_date").is_none());
    }

    #[test]
    fn test_drive_and_pst_accumulation() {
        let report = ReportBuilder::new("PC-02")
            .drive("C:", 200.0, 85.0)
            .pst_file("archive.pst", 1.5, "2024-01-02 10:00:00")
            .pst_file("inbox.pst", 0.75, "2024-03-04 09:00:00")
            .build();

        assert_eq!(report["drives"][0]["used_gb"], 170.0);
        assert_eq!(report["drives"][0]["free_gb"], 30.0);
        assert_eq!(report["total_pst_size_gb"], 2.25);
        assert_eq!(report["pst_files"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_archive_days_ago_format() {
        let report = ReportBuilder::new("PC-03").archived_days_ago(200).build();
        let date = report["last_archive_date"].as_str().unwrap();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
    }
}
