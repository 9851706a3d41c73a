//! Time entry model.
//!
//! Time entries are logged against projects and feed payroll computation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// The kind of hours recorded by a time entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeEntryType {
    /// Ordinary hours.
    Regular,
    /// Hours paid at the overtime rate.
    Overtime,
    /// Paid leave.
    Vacation,
    /// Sick leave.
    SickLeave,
}

impl TimeEntryType {
    /// Returns the stored representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeEntryType::Regular => "REGULAR",
            TimeEntryType::Overtime => "OVERTIME",
            TimeEntryType::Vacation => "VACATION",
            TimeEntryType::SickLeave => "SICK_LEAVE",
        }
    }
}

impl FromStr for TimeEntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGULAR" => Ok(TimeEntryType::Regular),
            "OVERTIME" => Ok(TimeEntryType::Overtime),
            "VACATION" => Ok(TimeEntryType::Vacation),
            "SICK_LEAVE" => Ok(TimeEntryType::SickLeave),
            other => Err(format!("unknown time entry type '{}'", other)),
        }
    }
}

/// Review status of a time entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeEntryStatus {
    /// Logged, not yet reviewed.
    Pending,
    /// Accepted by a manager.
    Approved,
    /// Refused by a manager.
    Rejected,
}

impl TimeEntryStatus {
    /// Returns the stored representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeEntryStatus::Pending => "PENDING",
            TimeEntryStatus::Approved => "APPROVED",
            TimeEntryStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for TimeEntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TimeEntryStatus::Pending),
            "APPROVED" => Ok(TimeEntryStatus::Approved),
            "REJECTED" => Ok(TimeEntryStatus::Rejected),
            other => Err(format!("unknown time entry status '{}'", other)),
        }
    }
}

/// Hours logged by a user against a project on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    /// Unique identifier for the entry.
    pub id: Uuid,
    /// The user who worked the hours.
    pub user_id: Uuid,
    /// The project the hours were worked on.
    pub project_id: Uuid,
    /// The day worked.
    pub date: NaiveDate,
    /// Hours worked; never negative.
    pub hours: Decimal,
    /// The kind of hours.
    #[serde(rename = "type")]
    pub entry_type: TimeEntryType,
    /// Review status.
    pub status: TimeEntryStatus,
}
