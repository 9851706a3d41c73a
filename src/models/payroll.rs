//! Payroll record model.
//!
//! This module contains the [`PayrollRecord`] produced by payroll computation
//! and the [`PayPeriod`] it covers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::UserSummary;

/// Processing status of a payroll record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollStatus {
    /// Computed, not yet accepted by the accounting system.
    Pending,
    /// Posted to the accounting system.
    Processed,
}

impl PayrollStatus {
    /// Returns the stored representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Pending => "PENDING",
            PayrollStatus::Processed => "PROCESSED",
        }
    }
}

impl FromStr for PayrollStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PayrollStatus::Pending),
            "PROCESSED" => Ok(PayrollStatus::Processed),
            other => Err(format!("unknown payroll status '{}'", other)),
        }
    }
}

/// An inclusive date range covered by a payroll run.
///
/// # Example
///
/// ```
/// use backoffice_engine::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::new(
///     NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
/// )
/// .unwrap();
///
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()));
/// assert!(!period.contains_date(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
/// assert!(PayPeriod::new(period.end_date, period.start_date).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPeriod {
    /// First day of the period (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
}

impl PayPeriod {
    /// Creates a period, or `None` when `start_date` is after `end_date`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Option<Self> {
        (start_date <= end_date).then_some(Self {
            start_date,
            end_date,
        })
    }

    /// Checks if a given date falls within this period, inclusive of both ends.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A payroll run for one user over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecord {
    /// Unique identifier for the record.
    pub id: Uuid,
    /// The paid user.
    pub user_id: Uuid,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period.
    pub period_end: NaiveDate,
    /// Total REGULAR hours in the period.
    pub regular_hours: Decimal,
    /// Total OVERTIME hours in the period.
    pub overtime_hours: Decimal,
    /// Pay before deductions.
    pub gross_pay: Decimal,
    /// Pay after deductions; zero until deductions are computed.
    pub net_pay: Decimal,
    /// Processing status.
    pub status: PayrollStatus,
    /// The user's employee reference at the time of the run.
    #[serde(rename = "qbEmployeeId")]
    pub accounting_employee_ref: String,
    /// The accounting system's reference for the posted entry.
    #[serde(rename = "qbPaycheckId")]
    pub accounting_paycheck_ref: Option<String>,
}

/// A payroll record with the paid user's name and email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecordDetails {
    /// The record itself.
    #[serde(flatten)]
    pub record: PayrollRecord,
    /// The paid user.
    pub user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pay_period_single_day_is_valid() {
        let period = PayPeriod::new(date(2026, 3, 1), date(2026, 3, 1)).unwrap();
        assert!(period.contains_date(date(2026, 3, 1)));
    }

    #[test]
    fn test_pay_period_rejects_reversed_range() {
        assert!(PayPeriod::new(date(2026, 3, 2), date(2026, 3, 1)).is_none());
    }

    #[test]
    fn test_payroll_record_serializes_accounting_names() {
        let record = PayrollRecord {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            period_start: date(2026, 3, 1),
            period_end: date(2026, 3, 14),
            regular_hours: Decimal::from(80),
            overtime_hours: Decimal::from(5),
            gross_pay: Decimal::new(21875, 1),
            net_pay: Decimal::ZERO,
            status: PayrollStatus::Processed,
            accounting_employee_ref: "QB-EMP-003".to_string(),
            accounting_paycheck_ref: Some("QB-EXP-1".to_string()),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["qbEmployeeId"], "QB-EMP-003");
        assert_eq!(json["qbPaycheckId"], "QB-EXP-1");
        assert_eq!(json["status"], "PROCESSED");
        assert_eq!(json["periodEnd"], "2026-03-14");
    }
}
