//! Expense, receipt and analytics models.
//!
//! This module contains the [`Expense`] record, its [`ExpenseStatus`] state
//! machine and [`ExpenseCategory`], the immutable [`ExpenseReceipt`], and the
//! aggregated [`ExpenseAnalytics`] returned by the reporting query.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{ProjectSummary, UserSummary};

/// The workflow status of an expense.
///
/// Expenses move `DRAFT → SUBMITTED → {APPROVED, REJECTED}`. Approved and
/// rejected are terminal.
///
/// # Example
///
/// ```
/// use backoffice_engine::models::ExpenseStatus;
///
/// assert!(ExpenseStatus::Draft.can_transition_to(ExpenseStatus::Submitted));
/// assert!(!ExpenseStatus::Draft.can_transition_to(ExpenseStatus::Approved));
/// assert!(ExpenseStatus::Rejected.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
    /// Created but not yet sent for approval.
    Draft,
    /// Waiting for a manager decision.
    Submitted,
    /// Approved and posted to the accounting system.
    Approved,
    /// Rejected by a manager.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the stored representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "DRAFT",
            ExpenseStatus::Submitted => "SUBMITTED",
            ExpenseStatus::Approved => "APPROVED",
            ExpenseStatus::Rejected => "REJECTED",
        }
    }

    /// Returns true if the workflow allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ExpenseStatus) -> bool {
        matches!(
            (self, next),
            (ExpenseStatus::Draft, ExpenseStatus::Submitted)
                | (ExpenseStatus::Submitted, ExpenseStatus::Approved)
                | (ExpenseStatus::Submitted, ExpenseStatus::Rejected)
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpenseStatus::Approved | ExpenseStatus::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ExpenseStatus::Draft),
            "SUBMITTED" => Ok(ExpenseStatus::Submitted),
            "APPROVED" => Ok(ExpenseStatus::Approved),
            "REJECTED" => Ok(ExpenseStatus::Rejected),
            other => Err(format!("unknown expense status '{}'", other)),
        }
    }
}

/// The spending category of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    /// Building materials.
    Materials,
    /// Tools and equipment.
    Equipment,
    /// Vehicle running costs.
    Vehicle,
    /// Travel and accommodation.
    Travel,
    /// Meals.
    Meals,
    /// Consumable supplies.
    Supplies,
    /// Anything else.
    Other,
}

impl ExpenseCategory {
    /// Every category, in declaration order.
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Materials,
        ExpenseCategory::Equipment,
        ExpenseCategory::Vehicle,
        ExpenseCategory::Travel,
        ExpenseCategory::Meals,
        ExpenseCategory::Supplies,
        ExpenseCategory::Other,
    ];

    /// Returns the stored representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Materials => "MATERIALS",
            ExpenseCategory::Equipment => "EQUIPMENT",
            ExpenseCategory::Vehicle => "VEHICLE",
            ExpenseCategory::Travel => "TRAVEL",
            ExpenseCategory::Meals => "MEALS",
            ExpenseCategory::Supplies => "SUPPLIES",
            ExpenseCategory::Other => "OTHER",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown expense category '{}'", s))
    }
}

/// A receipt file attached to an expense.
///
/// At most one receipt exists per expense and it never changes once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReceipt {
    /// Unique identifier for the receipt.
    pub id: Uuid,
    /// The owning expense.
    pub expense_id: Uuid,
    /// Original file name.
    pub file_name: String,
    /// Location returned by the groupware service.
    pub file_url: String,
}

/// An expense claim as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Unique identifier for the expense.
    pub id: Uuid,
    /// The user claiming the expense.
    pub user_id: Uuid,
    /// The project the expense is charged to, if any.
    pub project_id: Option<Uuid>,
    /// What was bought.
    pub description: String,
    /// The claimed amount.
    pub amount: Decimal,
    /// The date the cost was incurred.
    pub date: NaiveDate,
    /// Spending category.
    pub category: ExpenseCategory,
    /// Workflow status.
    pub status: ExpenseStatus,
    /// Claimant or approver notes.
    pub notes: Option<String>,
    /// Reference of the entry created in the accounting system on approval.
    #[serde(rename = "qbExpenseId")]
    pub accounting_ref: Option<String>,
    /// The manager who approved or rejected the expense.
    pub approved_by_id: Option<Uuid>,
    /// When the expense was approved or rejected.
    pub approved_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// An expense together with the records it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDetails {
    /// The expense itself.
    #[serde(flatten)]
    pub expense: Expense,
    /// The claimant.
    pub user: UserSummary,
    /// The project, when the expense is charged to one.
    pub project: Option<ProjectSummary>,
    /// The attached receipt, if one was uploaded.
    pub receipt: Option<ExpenseReceipt>,
}

/// A receipt file supplied when creating an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptUpload {
    /// The file name to store under.
    pub file_name: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

/// Input for creating an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// The user claiming the expense.
    pub user_id: Uuid,
    /// The project to charge, if any.
    pub project_id: Option<Uuid>,
    /// What was bought.
    pub description: String,
    /// The claimed amount; must be positive.
    pub amount: Decimal,
    /// The date the cost was incurred.
    pub date: NaiveDate,
    /// Spending category.
    pub category: ExpenseCategory,
    /// Optional notes.
    pub notes: Option<String>,
    /// Optional receipt to upload.
    pub receipt: Option<ReceiptUpload>,
}

/// Label used in [`ExpenseAnalytics::by_project`] for expenses without a project.
pub const NO_PROJECT_LABEL: &str = "No Project";

/// Totals over approved expenses in a date range.
///
/// `total_amount` always equals the sum of `by_category` and the sum of
/// `by_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseAnalytics {
    /// Sum of all approved amounts.
    pub total_amount: Decimal,
    /// Amount per category; every category is present.
    pub by_category: BTreeMap<ExpenseCategory, Decimal>,
    /// Amount per project name.
    pub by_project: BTreeMap<String, Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_follow_workflow() {
        use ExpenseStatus::*;

        assert!(Draft.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Approved));
        assert!(Submitted.can_transition_to(Rejected));

        assert!(!Draft.can_transition_to(Approved));
        assert!(!Draft.can_transition_to(Rejected));
        assert!(!Submitted.can_transition_to(Draft));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Submitted));
        assert!(!Approved.can_transition_to(Approved));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ExpenseStatus::Approved.is_terminal());
        assert!(ExpenseStatus::Rejected.is_terminal());
        assert!(!ExpenseStatus::Draft.is_terminal());
        assert!(!ExpenseStatus::Submitted.is_terminal());
    }

    #[test]
    fn test_category_parse_matches_as_str() {
        for category in ExpenseCategory::ALL {
            assert_eq!(category.as_str().parse::<ExpenseCategory>().unwrap(), category);
        }
        assert!("FUEL".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&ExpenseCategory::Materials).unwrap(),
            "\"MATERIALS\""
        );
    }

    #[test]
    fn test_analytics_serializes_category_keys() {
        let mut by_category = BTreeMap::new();
        by_category.insert(ExpenseCategory::Meals, Decimal::new(1250, 2));
        let analytics = ExpenseAnalytics {
            total_amount: Decimal::new(1250, 2),
            by_category,
            by_project: BTreeMap::from([(NO_PROJECT_LABEL.to_string(), Decimal::new(1250, 2))]),
        };

        let json = serde_json::to_value(&analytics).unwrap();
        assert_eq!(json["byCategory"]["MEALS"], "12.50");
        assert_eq!(json["byProject"]["No Project"], "12.50");
    }
}
