//! HTTP API module for the back-office engine.
//!
//! This module provides the JSON endpoints for the expense workflow,
//! payroll and the accounting connection flow.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    AccountingCallbackQuery, AnalyticsQuery, ApproveExpenseRequest, ComputePayrollRequest,
    CreateExpenseRequest, ExpenseListQuery, PayrollListQuery, ReceiptRequest, RejectExpenseRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::{AppState, AuthorizationStates};
