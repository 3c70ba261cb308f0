//! Tracking metrics and threshold alerts
//!
//! Tables: tracking_metrics, tracking_alerts

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

text_enum! {
    pub enum Comparator: "comparator" {
        Gt => "gt",
        Gte => "gte",
        Lt => "lt",
        Lte => "lte",
        Eq => "eq",
    }
}

impl Comparator {
    /// Whether `value <op> threshold` holds
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Gt => value > threshold,
            Comparator::Gte => value >= threshold,
            Comparator::Lt => value < threshold,
            Comparator::Lte => value <= threshold,
            Comparator::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

text_enum! {
    #[derive(Default, PartialOrd, Ord)]
    pub enum AlertSeverity: "severity" {
        Info => "info",
        #[default]
        Warning => "warning",
        Critical => "critical",
    }
}

/// Metric keys recorded by a snapshot
pub mod builtin {
    pub const MEMBERS_TOTAL: &str = "members.total";
    pub const EVENTS_UPCOMING: &str = "events.upcoming";
    pub const INSCRIPTIONS_REGISTERED: &str = "inscriptions.registered";
    pub const LOANS_OPEN: &str = "loans.open";
    pub const LOANS_OVERDUE: &str = "loans.overdue";
    pub const IDEAS_PENDING: &str = "ideas.pending";
    pub const TASKS_OPEN: &str = "tasks.open";
    pub const DEV_REQUESTS_OPEN: &str = "dev_requests.open";

    pub const ALL: &[&str] = &[
        MEMBERS_TOTAL,
        EVENTS_UPCOMING,
        INSCRIPTIONS_REGISTERED,
        LOANS_OPEN,
        LOANS_OVERDUE,
        IDEAS_PENDING,
        TASKS_OPEN,
        DEV_REQUESTS_OPEN,
    ];
}

/// Record a metric value by hand
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetric {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub key: String,
    pub value: f64,
    /// Defaults to now
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlert {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub metric_key: String,
    pub comparator: Comparator,
    pub threshold: f64,
    #[serde(default)]
    pub severity: AlertSeverity,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlert {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub metric_key: Option<String>,
    pub comparator: Option<Comparator>,
    pub threshold: Option<f64>,
    pub severity: Option<AlertSeverity>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparators() {
        assert!(Comparator::Gt.holds(5.0, 4.0));
        assert!(!Comparator::Gt.holds(4.0, 4.0));
        assert!(Comparator::Gte.holds(4.0, 4.0));
        assert!(Comparator::Lt.holds(3.0, 4.0));
        assert!(!Comparator::Lte.holds(4.5, 4.0));
        assert!(Comparator::Eq.holds(4.0, 4.0));
        assert!(!Comparator::Eq.holds(4.0, 4.1));
    }

    #[test]
    fn test_severity_order() {
        assert!(AlertSeverity::Critical > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }

    #[test]
    fn test_create_alert_defaults() {
        let dto: CreateAlert = serde_json::from_str(
            r#"{"name":"Prêts en retard","metricKey":"loans.overdue","comparator":"gte","threshold":3}"#,
        )
        .unwrap();
        assert!(dto.active);
        assert_eq!(dto.severity, AlertSeverity::Warning);
        assert_eq!(dto.comparator, Comparator::Gte);
    }

    #[test]
    fn test_builtin_keys_are_unique() {
        let mut keys = builtin::ALL.to_vec();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), builtin::ALL.len());
    }
}
