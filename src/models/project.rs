//! Project model.
//!
//! Projects group expenses and time entries. They are seeded and read by the
//! relation loader; project management itself lives outside this engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a construction project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// Being scoped and estimated.
    Planning,
    /// Work is under way.
    InProgress,
    /// Temporarily paused.
    OnHold,
    /// Finished.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl ProjectStatus {
    /// Returns the stored representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "PLANNING",
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::OnHold => "ON_HOLD",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNING" => Ok(ProjectStatus::Planning),
            "IN_PROGRESS" => Ok(ProjectStatus::InProgress),
            "ON_HOLD" => Ok(ProjectStatus::OnHold),
            "COMPLETED" => Ok(ProjectStatus::Completed),
            "CANCELLED" => Ok(ProjectStatus::Cancelled),
            other => Err(format!("unknown project status '{}'", other)),
        }
    }
}

/// A construction project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier for the project.
    pub id: Uuid,
    /// Display name; also the key used by expense analytics.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Planned start date.
    pub start_date: NaiveDate,
    /// Planned end date, if scheduled.
    pub end_date: Option<NaiveDate>,
    /// Approved budget.
    pub budget: Decimal,
    /// The client commissioning the work.
    pub client_name: String,
    /// The user who created the project.
    pub creator_id: Uuid,
}

impl Project {
    /// Returns the summary embedded in expense responses.
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// The subset of project fields included alongside expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Unique identifier for the project.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}
