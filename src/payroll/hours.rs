//! Hours aggregation and gross pay.

use rust_decimal::Decimal;

use crate::config::PayrollRates;
use crate::models::{TimeEntry, TimeEntryType};

/// Hours worked in a pay period, split by pay treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HoursSummary {
    /// Sum of REGULAR entries.
    pub regular_hours: Decimal,
    /// Sum of OVERTIME entries.
    pub overtime_hours: Decimal,
}

/// Totals REGULAR and OVERTIME hours. VACATION and SICK_LEAVE entries are
/// not paid through this path and are skipped.
pub fn summarize_hours(entries: &[TimeEntry]) -> HoursSummary {
    entries
        .iter()
        .fold(HoursSummary::default(), |mut summary, entry| {
            match entry.entry_type {
                TimeEntryType::Regular => summary.regular_hours += entry.hours,
                TimeEntryType::Overtime => summary.overtime_hours += entry.hours,
                TimeEntryType::Vacation | TimeEntryType::SickLeave => {}
            }
            summary
        })
}

/// Computes gross pay for the hours at the configured rates.
///
/// # Examples
///
/// ```
/// use backoffice_engine::config::PayrollRates;
/// use backoffice_engine::payroll::{HoursSummary, gross_pay};
/// use rust_decimal::Decimal;
///
/// let hours = HoursSummary {
///     regular_hours: Decimal::from(80),
///     overtime_hours: Decimal::from(5),
/// };
/// assert_eq!(gross_pay(hours, &PayrollRates::default()), Decimal::new(21875, 1));
/// ```
pub fn gross_pay(hours: HoursSummary, rates: &PayrollRates) -> Decimal {
    hours.regular_hours * rates.regular_rate + hours.overtime_hours * rates.overtime_rate
}
