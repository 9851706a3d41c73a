//! Payroll computation from time entries.
//!
//! A payroll run totals a user's REGULAR and OVERTIME hours for a period,
//! prices them at the configured rates, stores a PENDING record, posts the
//! gross amount to the accounting system and marks the record PROCESSED.
//! The whole sequence is one store transaction: if the accounting call
//! fails, no record remains.

mod hours;

pub use hours::{HoursSummary, gross_pay, summarize_hours};

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::config::PayrollRates;
use crate::connectors::{AccountingConnector, AccountingExpenseEntry};
use crate::error::{BackofficeError, BackofficeResult};
use crate::models::{PayPeriod, PayrollRecord, PayrollRecordDetails, PayrollStatus};
use crate::store::Database;
use crate::store::integrations::save_rotated_credentials;
use crate::store::payroll::{find_record, insert_record, list_for_user, mark_processed};
use crate::store::time_entries::entries_in_period;
use crate::store::users::find_user;

/// Computes and lists payroll records.
#[derive(Clone)]
pub struct PayrollService {
    db: Arc<Database>,
    accounting: Arc<dyn AccountingConnector>,
    rates: PayrollRates,
}

impl PayrollService {
    /// Creates a service pricing hours at `rates`.
    pub fn new(
        db: Arc<Database>,
        accounting: Arc<dyn AccountingConnector>,
        rates: PayrollRates,
    ) -> Self {
        Self {
            db,
            accounting,
            rates,
        }
    }

    /// Runs payroll for one user over `[start_date, end_date]`.
    ///
    /// # Errors
    ///
    /// - `Validation` when `start_date` is after `end_date`
    /// - `NotFound` when the user does not exist
    /// - `NotLinked` when the user has no accounting employee record
    /// - `Accounting` when posting fails; no record is kept then
    pub fn compute_payroll(
        &self,
        user_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> BackofficeResult<PayrollRecord> {
        let period = PayPeriod::new(start_date, end_date).ok_or_else(|| {
            BackofficeError::validation("startDate", "must not be after endDate")
        })?;

        let result = self.db.transaction(|tx| {
            let user = find_user(tx, user_id)?
                .ok_or_else(|| BackofficeError::not_found("User", user_id))?;
            let entries = entries_in_period(tx, user_id, period)?;
            let hours = summarize_hours(&entries);

            let employee_ref = user
                .linked_employee_ref()
                .ok_or(BackofficeError::NotLinked { user_id })?
                .to_string();

            let mut record = PayrollRecord {
                id: Uuid::new_v4(),
                user_id,
                period_start: period.start_date,
                period_end: period.end_date,
                regular_hours: hours.regular_hours,
                overtime_hours: hours.overtime_hours,
                gross_pay: gross_pay(hours, &self.rates),
                net_pay: Decimal::ZERO,
                status: PayrollStatus::Pending,
                accounting_employee_ref: employee_ref.clone(),
                accounting_paycheck_ref: None,
            };
            insert_record(tx, &record)?;

            let paycheck_ref = self.accounting.create_expense_entry(&AccountingExpenseEntry {
                employee_ref,
                amount: record.gross_pay,
                description: format!("Payroll {} to {}", period.start_date, period.end_date),
                date: Utc::now().date_naive(),
                receipt_url: None,
            })?;

            if !mark_processed(tx, record.id, &paycheck_ref)? {
                return Err(BackofficeError::Internal {
                    message: format!("payroll record {} left PENDING", record.id),
                });
            }
            record = find_record(tx, record.id)?
                .ok_or_else(|| BackofficeError::not_found("PayrollRecord", record.id))?;
            Ok(record)
        });
        save_rotated_credentials(&self.db, self.accounting.as_ref());

        let record = result?;
        info!(
            record_id = %record.id,
            user_id = %user_id,
            regular_hours = %record.regular_hours,
            overtime_hours = %record.overtime_hours,
            gross_pay = %record.gross_pay,
            "Payroll processed"
        );
        Ok(record)
    }

    /// Lists a user's payroll records, latest period first.
    pub fn list_payroll(&self, user_id: Uuid) -> BackofficeResult<Vec<PayrollRecordDetails>> {
        self.db.read(|conn| list_for_user(conn, user_id))
    }
}
