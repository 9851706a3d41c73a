//! Approved-expense aggregation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::{BackofficeError, BackofficeResult};
use crate::models::{Expense, ExpenseAnalytics, ExpenseCategory, NO_PROJECT_LABEL};

/// Aggregates expenses by category and by project name.
///
/// Every category appears in `by_category`, with zero when no expense uses
/// it. Expenses without a project (or whose project name is unknown) are
/// totalled under [`NO_PROJECT_LABEL`].
///
/// # Arguments
///
/// * `expenses` - Expenses paired with the name of their project, if any
///
/// # Errors
///
/// `Internal` when a running sum no longer fits in a `Decimal`.
///
/// # Examples
///
/// ```
/// use backoffice_engine::workflow::summarize_expenses;
///
/// let analytics = summarize_expenses(&[]).unwrap();
/// assert!(analytics.total_amount.is_zero());
/// assert_eq!(analytics.by_category.len(), 7);
/// assert!(analytics.by_project.is_empty());
/// ```
pub fn summarize_expenses(
    expenses: &[(Expense, Option<String>)],
) -> BackofficeResult<ExpenseAnalytics> {
    let mut by_category: BTreeMap<ExpenseCategory, Decimal> = ExpenseCategory::ALL
        .into_iter()
        .map(|category| (category, Decimal::ZERO))
        .collect();
    let mut by_project: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut total_amount = Decimal::ZERO;

    for (expense, project_name) in expenses {
        accumulate(&mut total_amount, expense.amount)?;
        accumulate(
            by_category.entry(expense.category).or_insert(Decimal::ZERO),
            expense.amount,
        )?;

        let project = project_name.as_deref().unwrap_or(NO_PROJECT_LABEL);
        accumulate(
            by_project.entry(project.to_string()).or_insert(Decimal::ZERO),
            expense.amount,
        )?;
    }

    Ok(ExpenseAnalytics {
        total_amount,
        by_category,
        by_project,
    })
}

fn accumulate(sum: &mut Decimal, amount: Decimal) -> BackofficeResult<()> {
    *sum = sum
        .checked_add(amount)
        .ok_or_else(|| BackofficeError::Internal {
            message: "expense analytics total overflowed".to_string(),
        })?;
    Ok(())
}
