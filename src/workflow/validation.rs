//! Input checks for new expenses.

use rust_decimal::Decimal;

use crate::error::{BackofficeError, BackofficeResult};
use crate::models::NewExpense;

/// Largest amount a single expense may claim.
pub const MAX_EXPENSE_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Checks the fields of a new expense that need no store lookup.
///
/// Returns a `Validation` error naming the first offending field:
/// - `description` must contain non-whitespace text
/// - `amount` must be greater than zero and at most [`MAX_EXPENSE_AMOUNT`]
/// - `receipt.fileName` must be non-empty, free of path separators and of
///   surrounding whitespace
pub fn validate_new_expense(input: &NewExpense) -> BackofficeResult<()> {
    if input.description.trim().is_empty() {
        return Err(BackofficeError::validation(
            "description",
            "must not be empty",
        ));
    }
    if input.amount <= Decimal::ZERO {
        return Err(BackofficeError::validation(
            "amount",
            "must be greater than zero",
        ));
    }
    if input.amount > MAX_EXPENSE_AMOUNT {
        return Err(BackofficeError::validation(
            "amount",
            format!("must not exceed {}", MAX_EXPENSE_AMOUNT),
        ));
    }
    if let Some(receipt) = &input.receipt {
        let name = receipt.file_name.as_str();
        if name.trim().is_empty() {
            return Err(BackofficeError::validation(
                "receipt.fileName",
                "must not be empty",
            ));
        }
        if name != name.trim() {
            return Err(BackofficeError::validation(
                "receipt.fileName",
                "must not start or end with whitespace",
            ));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(BackofficeError::validation(
                "receipt.fileName",
                "must be a plain file name",
            ));
        }
    }
    Ok(())
}
