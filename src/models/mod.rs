//! Core data models for the back-office engine.
//!
//! This module contains all the domain models used throughout the engine.

mod expense;
mod payroll;
mod project;
mod time_entry;
mod user;

pub use expense::{
    Expense, ExpenseAnalytics, ExpenseCategory, ExpenseDetails, ExpenseReceipt, ExpenseStatus,
    NO_PROJECT_LABEL, NewExpense, ReceiptUpload,
};
pub use payroll::{PayPeriod, PayrollRecord, PayrollRecordDetails, PayrollStatus};
pub use project::{Project, ProjectStatus, ProjectSummary};
pub use time_entry::{TimeEntry, TimeEntryStatus, TimeEntryType};
pub use user::{Role, User, UserSummary};
