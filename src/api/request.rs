//! Request types for the back-office API.
//!
//! Bodies are camelCase JSON. Query strings are taken as raw strings and
//! parsed here so a bad value produces the same JSON error body as a bad
//! request body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BackofficeError, BackofficeResult};
use crate::models::{ExpenseCategory, ExpenseStatus, NewExpense, ReceiptUpload};

/// Request body for `POST /api/expenses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    /// The claimant.
    pub user_id: Uuid,
    /// The project to charge.
    #[serde(default)]
    pub project_id: Option<Uuid>,
    /// What was bought.
    pub description: String,
    /// The claimed amount, as a JSON number or decimal string.
    pub amount: Decimal,
    /// Spending category.
    pub category: ExpenseCategory,
    /// The date the cost was incurred; today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Receipt to upload with the expense.
    #[serde(default)]
    pub receipt: Option<ReceiptRequest>,
}

/// A receipt file carried inline in a create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRequest {
    pub file_name: String,
    /// File content, standard base64.
    pub content: String,
}

impl CreateExpenseRequest {
    /// Converts the request into workflow input, decoding the receipt.
    pub fn into_new_expense(self, today: NaiveDate) -> BackofficeResult<NewExpense> {
        let receipt = self
            .receipt
            .map(|receipt| {
                BASE64
                    .decode(receipt.content.trim())
                    .map(|content| ReceiptUpload {
                        file_name: receipt.file_name.trim().to_string(),
                        content,
                    })
                    .map_err(|_| {
                        BackofficeError::validation("receipt.content", "must be base64 encoded")
                    })
            })
            .transpose()?;

        Ok(NewExpense {
            user_id: self.user_id,
            project_id: self.project_id,
            description: self.description,
            amount: self.amount,
            date: self.date.unwrap_or(today),
            category: self.category,
            notes: self.notes,
            receipt,
        })
    }
}

/// Request body for `POST /api/expenses/:id/approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveExpenseRequest {
    pub approver_id: Uuid,
}

/// Request body for `POST /api/expenses/:id/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectExpenseRequest {
    pub approver_id: Uuid,
    /// Reason for the rejection; replaces the expense notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for `POST /api/payroll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputePayrollRequest {
    pub user_id: Uuid,
    /// First day of the period (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
}

/// Query string of `GET /api/expenses`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseListQuery {
    pub user_id: Option<String>,
    pub status: Option<String>,
}

impl ExpenseListQuery {
    /// Parses the optional user id and status filters.
    pub fn parse(&self) -> BackofficeResult<(Option<Uuid>, Option<ExpenseStatus>)> {
        let user_id = non_empty(&self.user_id)
            .map(|raw| parse_uuid("userId", raw))
            .transpose()?;
        let status = non_empty(&self.status)
            .map(|raw| {
                raw.parse::<ExpenseStatus>()
                    .map_err(|message| BackofficeError::validation("status", message))
            })
            .transpose()?;
        Ok((user_id, status))
    }
}

/// Query string of `GET /api/expenses/analytics`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl AnalyticsQuery {
    /// Parses both required dates.
    pub fn parse(&self) -> BackofficeResult<(NaiveDate, NaiveDate)> {
        Ok((
            required_date("startDate", &self.start_date)?,
            required_date("endDate", &self.end_date)?,
        ))
    }
}

/// Query string of `GET /api/payroll`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollListQuery {
    pub user_id: Option<String>,
}

impl PayrollListQuery {
    /// Parses the required user id.
    pub fn parse(&self) -> BackofficeResult<Uuid> {
        let raw = non_empty(&self.user_id)
            .ok_or_else(|| BackofficeError::validation("userId", "User ID is required"))?;
        parse_uuid("userId", raw)
    }
}

/// Query string of the accounting OAuth callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountingCallbackQuery {
    pub code: Option<String>,
    #[serde(rename = "realmId")]
    pub realm_id: Option<String>,
    pub state: Option<String>,
}

impl AccountingCallbackQuery {
    /// Checks that the provider sent the code, the company id and the state.
    pub fn validate(&self) -> BackofficeResult<()> {
        if non_empty(&self.code).is_none() {
            return Err(BackofficeError::validation(
                "code",
                "Missing authorization code in callback",
            ));
        }
        if non_empty(&self.realm_id).is_none() {
            return Err(BackofficeError::validation(
                "realmId",
                "Missing realmId in callback",
            ));
        }
        if non_empty(&self.state).is_none() {
            return Err(BackofficeError::validation(
                "state",
                "Missing state in callback",
            ));
        }
        Ok(())
    }
}

/// Parses an id taken from the request path.
pub fn parse_path_id(raw: &str) -> BackofficeResult<Uuid> {
    parse_uuid("id", raw)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_uuid(field: &str, raw: &str) -> BackofficeResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| BackofficeError::validation(field, "must be a UUID"))
}

fn required_date(field: &str, value: &Option<String>) -> BackofficeResult<NaiveDate> {
    let raw = non_empty(value).ok_or_else(|| BackofficeError::validation(field, "is required"))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| BackofficeError::validation(field, "must be a YYYY-MM-DD date"))
}
