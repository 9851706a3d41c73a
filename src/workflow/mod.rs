//! Expense workflow.
//!
//! [`ExpenseWorkflow`] drives an expense through its lifecycle:
//!
//! ```text
//! DRAFT -> SUBMITTED -> APPROVED
//!                    -> REJECTED
//! ```
//!
//! Every mutating operation runs inside one store transaction, including the
//! calls to the groupware and accounting connectors, so a failed external
//! call leaves no trace locally.

mod analytics;
mod validation;

pub use analytics::summarize_expenses;
pub use validation::{MAX_EXPENSE_AMOUNT, validate_new_expense};

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::connectors::{AccountingConnector, AccountingExpenseEntry, GroupwareConnector};
use crate::error::{BackofficeError, BackofficeResult};
use crate::models::{
    Expense, ExpenseAnalytics, ExpenseDetails, ExpenseReceipt, ExpenseStatus, NewExpense,
};
use crate::store::Database;
use crate::store::expenses::{
    ExpenseFilter, approved_in_range, find_details, insert_expense, insert_receipt,
    list_details, mark_approved, mark_rejected, mark_submitted,
};
use crate::store::integrations::save_rotated_credentials;
use crate::store::projects::find_project;
use crate::store::users::find_user;

/// Orchestrates the expense state machine and its side effects.
#[derive(Clone)]
pub struct ExpenseWorkflow {
    db: Arc<Database>,
    accounting: Arc<dyn AccountingConnector>,
    groupware: Arc<dyn GroupwareConnector>,
    receipt_container: String,
}

fn load_details(conn: &Connection, id: Uuid) -> BackofficeResult<ExpenseDetails> {
    find_details(conn, id)?.ok_or_else(|| BackofficeError::not_found("Expense", id))
}

fn ensure_transition(expense: &Expense, requested: ExpenseStatus) -> BackofficeResult<()> {
    if expense.status.can_transition_to(requested) {
        Ok(())
    } else {
        warn!(
            expense_id = %expense.id,
            current = %expense.status,
            requested = %requested,
            "Expense transition refused"
        );
        Err(BackofficeError::InvalidTransition {
            expense_id: expense.id,
            current: expense.status,
            requested,
        })
    }
}

/// A guarded update that touched no row lost a race with another writer.
fn lost_race(expense: &Expense, requested: ExpenseStatus) -> BackofficeError {
    BackofficeError::InvalidTransition {
        expense_id: expense.id,
        current: expense.status,
        requested,
    }
}

impl ExpenseWorkflow {
    /// Creates a workflow. Receipts are uploaded into `receipt_container`.
    pub fn new(
        db: Arc<Database>,
        accounting: Arc<dyn AccountingConnector>,
        groupware: Arc<dyn GroupwareConnector>,
        receipt_container: impl Into<String>,
    ) -> Self {
        Self {
            db,
            accounting,
            groupware,
            receipt_container: receipt_container.into(),
        }
    }

    /// Creates a DRAFT expense, uploading its receipt when one is supplied.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty description, a non-positive amount or a
    ///   bad receipt file name
    /// - `NotFound` when the user or the project does not exist
    /// - `Groupware` when the receipt upload fails; nothing is stored then
    pub fn create_expense(&self, input: NewExpense) -> BackofficeResult<ExpenseDetails> {
        validate_new_expense(&input)?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            project_id: input.project_id,
            description: input.description.trim().to_string(),
            amount: input.amount,
            date: input.date,
            category: input.category,
            status: ExpenseStatus::Draft,
            notes: input.notes.clone(),
            accounting_ref: None,
            approved_by_id: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };

        let details = self.db.transaction(|tx| {
            if find_user(tx, input.user_id)?.is_none() {
                return Err(BackofficeError::not_found("User", input.user_id));
            }
            if let Some(project_id) = input.project_id {
                if find_project(tx, project_id)?.is_none() {
                    return Err(BackofficeError::not_found("Project", project_id));
                }
            }

            insert_expense(tx, &expense)?;

            if let Some(upload) = &input.receipt {
                let folder = format!("expenses/{}", expense.id);
                let file_url = self.groupware.upload_file(
                    &self.receipt_container,
                    &folder,
                    &upload.file_name,
                    &upload.content,
                )?;
                let receipt = ExpenseReceipt {
                    id: Uuid::new_v4(),
                    expense_id: expense.id,
                    file_name: upload.file_name.clone(),
                    file_url,
                };
                insert_receipt(tx, &receipt, now)?;
            }

            load_details(tx, expense.id)
        })?;

        info!(
            expense_id = %details.expense.id,
            user_id = %details.expense.user_id,
            amount = %details.expense.amount,
            has_receipt = details.receipt.is_some(),
            "Expense created"
        );
        Ok(details)
    }

    /// Moves a DRAFT expense to SUBMITTED.
    pub fn submit_expense(&self, expense_id: Uuid) -> BackofficeResult<ExpenseDetails> {
        let details = self.db.transaction(|tx| {
            let current = load_details(tx, expense_id)?;
            ensure_transition(&current.expense, ExpenseStatus::Submitted)?;
            if !mark_submitted(tx, expense_id, Utc::now())? {
                return Err(lost_race(&current.expense, ExpenseStatus::Submitted));
            }
            load_details(tx, expense_id)
        })?;

        info!(expense_id = %expense_id, "Expense submitted");
        Ok(details)
    }

    /// Approves a SUBMITTED expense and posts it to the accounting system.
    ///
    /// The owner must be linked to an accounting employee record. The link
    /// is checked before anything is written or sent, and the accounting
    /// entry is created inside the same transaction that flips the status,
    /// so a connector failure leaves the expense SUBMITTED.
    pub fn approve_expense(
        &self,
        expense_id: Uuid,
        approver_id: Uuid,
    ) -> BackofficeResult<ExpenseDetails> {
        let result = self.db.transaction(|tx| {
            let current = load_details(tx, expense_id)?;
            ensure_transition(&current.expense, ExpenseStatus::Approved)?;

            if find_user(tx, approver_id)?.is_none() {
                return Err(BackofficeError::not_found("User", approver_id));
            }
            let owner = find_user(tx, current.expense.user_id)?
                .ok_or_else(|| BackofficeError::not_found("User", current.expense.user_id))?;
            let employee_ref = owner
                .linked_employee_ref()
                .ok_or(BackofficeError::NotLinked { user_id: owner.id })?;

            let entry = AccountingExpenseEntry {
                employee_ref: employee_ref.to_string(),
                amount: current.expense.amount,
                description: current.expense.description.clone(),
                date: current.expense.date,
                receipt_url: current.receipt.as_ref().map(|r| r.file_url.clone()),
            };
            let accounting_ref = self.accounting.create_expense_entry(&entry)?;

            if !mark_approved(tx, expense_id, approver_id, &accounting_ref, Utc::now())? {
                return Err(lost_race(&current.expense, ExpenseStatus::Approved));
            }
            load_details(tx, expense_id)
        });
        save_rotated_credentials(&self.db, self.accounting.as_ref());

        let details = result?;
        info!(
            expense_id = %expense_id,
            approver_id = %approver_id,
            accounting_ref = details.expense.accounting_ref.as_deref().unwrap_or_default(),
            "Expense approved"
        );
        Ok(details)
    }

    /// Rejects a SUBMITTED expense, replacing its notes.
    pub fn reject_expense(
        &self,
        expense_id: Uuid,
        approver_id: Uuid,
        notes: Option<String>,
    ) -> BackofficeResult<ExpenseDetails> {
        let details = self.db.transaction(|tx| {
            let current = load_details(tx, expense_id)?;
            ensure_transition(&current.expense, ExpenseStatus::Rejected)?;
            if find_user(tx, approver_id)?.is_none() {
                return Err(BackofficeError::not_found("User", approver_id));
            }
            if !mark_rejected(tx, expense_id, approver_id, notes.as_deref(), Utc::now())? {
                return Err(lost_race(&current.expense, ExpenseStatus::Rejected));
            }
            load_details(tx, expense_id)
        })?;

        info!(expense_id = %expense_id, approver_id = %approver_id, "Expense rejected");
        Ok(details)
    }

    /// Totals APPROVED expenses dated within `[start_date, end_date]`.
    pub fn get_expense_analytics(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> BackofficeResult<ExpenseAnalytics> {
        if start_date > end_date {
            return Err(BackofficeError::validation(
                "startDate",
                "must not be after endDate",
            ));
        }
        let rows = self
            .db
            .read(|conn| approved_in_range(conn, start_date, end_date))?;
        summarize_expenses(&rows)
    }

    /// Lists a user's expenses, newest first, optionally by status.
    pub fn get_user_expenses(
        &self,
        user_id: Uuid,
        status: Option<ExpenseStatus>,
    ) -> BackofficeResult<Vec<ExpenseDetails>> {
        self.db.read(|conn| {
            list_details(
                conn,
                ExpenseFilter {
                    user_id: Some(user_id),
                    status,
                },
            )
        })
    }

    /// Lists every expense waiting for approval, newest first.
    pub fn get_pending_approvals(&self) -> BackofficeResult<Vec<ExpenseDetails>> {
        self.list_expenses(Some(ExpenseStatus::Submitted))
    }

    /// Lists all expenses, newest first, optionally by status.
    pub fn list_expenses(
        &self,
        status: Option<ExpenseStatus>,
    ) -> BackofficeResult<Vec<ExpenseDetails>> {
        self.db.read(|conn| {
            list_details(
                conn,
                ExpenseFilter {
                    user_id: None,
                    status,
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{AccountingTokens, DisabledGroupwareConnector};
    use crate::models::{
        ExpenseCategory, NO_PROJECT_LABEL, Project, ProjectStatus, ReceiptUpload, Role, User,
    };
    use crate::store::projects::insert_project;
    use crate::store::users::insert_user;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAccounting {
        entries: Mutex<Vec<AccountingExpenseEntry>>,
        fail: bool,
    }

    impl AccountingConnector for RecordingAccounting {
        fn create_expense_entry(&self, entry: &AccountingExpenseEntry) -> BackofficeResult<String> {
            if self.fail {
                return Err(BackofficeError::Accounting {
                    message: "service unavailable".to_string(),
                });
            }
            let mut entries = self.entries.lock().unwrap();
            entries.push(entry.clone());
            Ok(format!("QB-EXP-{}", entries.len()))
        }

        fn authorization_url(&self, state: &str) -> BackofficeResult<String> {
            Ok(format!("https://auth.example/?state={state}"))
        }

        fn exchange_authorization_code(&self, _: &str) -> BackofficeResult<AccountingTokens> {
            Err(BackofficeError::Accounting {
                message: "not used".to_string(),
            })
        }
    }

    struct StaticGroupware;

    impl GroupwareConnector for StaticGroupware {
        fn upload_file(
            &self,
            container_id: &str,
            folder_path: &str,
            file_name: &str,
            _content: &[u8],
        ) -> BackofficeResult<String> {
            Ok(format!("https://files.example/{container_id}/{folder_path}/{file_name}"))
        }
    }

    struct Fixture {
        workflow: ExpenseWorkflow,
        accounting: Arc<RecordingAccounting>,
        db: Arc<Database>,
        employee: User,
        unlinked: User,
        manager: User,
        project: Project,
    }

    fn user(email: &str, role: Role, employee_ref: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            position: None,
            department: None,
            accounting_employee_ref: employee_ref.map(str::to_string),
        }
    }

    fn fixture_with(
        accounting: RecordingAccounting,
        groupware: Arc<dyn GroupwareConnector>,
    ) -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let employee = user("employee1@company.com", Role::Employee, Some("QB-EMP-003"));
        let unlinked = user("employee2@company.com", Role::Employee, None);
        let manager = user("manager@company.com", Role::Manager, Some("QB-EMP-002"));
        let project = Project {
            id: Uuid::new_v4(),
            name: "Depot".to_string(),
            description: None,
            status: ProjectStatus::InProgress,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: None,
            budget: Decimal::from(50_000),
            client_name: "Council".to_string(),
            creator_id: manager.id,
        };
        db.transaction(|tx| {
            insert_user(tx, &employee)?;
            insert_user(tx, &unlinked)?;
            insert_user(tx, &manager)?;
            insert_project(tx, &project)
        })
        .unwrap();

        let accounting = Arc::new(accounting);
        let workflow = ExpenseWorkflow::new(
            db.clone(),
            accounting.clone(),
            groupware,
            "site-1",
        );
        Fixture {
            workflow,
            accounting,
            db,
            employee,
            unlinked,
            manager,
            project,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingAccounting::default(), Arc::new(StaticGroupware))
    }

    fn new_expense(user_id: Uuid, date: &str) -> NewExpense {
        NewExpense {
            user_id,
            project_id: None,
            description: "Timber".to_string(),
            amount: Decimal::new(24999, 2),
            date: date.parse().unwrap(),
            category: ExpenseCategory::Materials,
            notes: None,
            receipt: None,
        }
    }

    fn count_expenses(db: &Database) -> i64 {
        db.read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM expenses", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_create_without_receipt_is_draft() {
        let f = fixture();
        let created = f
            .workflow
            .create_expense(new_expense(f.employee.id, "2026-03-02"))
            .unwrap();

        assert_eq!(created.expense.status, ExpenseStatus::Draft);
        assert!(created.receipt.is_none());
        assert!(created.expense.accounting_ref.is_none());
        assert_eq!(created.user.email, "employee1@company.com");
    }

    #[test]
    fn test_create_with_receipt_uploads_into_expense_folder() {
        let f = fixture();
        let mut input = new_expense(f.employee.id, "2026-03-02");
        input.project_id = Some(f.project.id);
        input.receipt = Some(ReceiptUpload {
            file_name: "receipt.pdf".to_string(),
            content: b"%PDF".to_vec(),
        });

        let created = f.workflow.create_expense(input).unwrap();
        let receipt = created.receipt.unwrap();
        assert_eq!(
            receipt.file_url,
            format!(
                "https://files.example/site-1/expenses/{}/receipt.pdf",
                created.expense.id
            )
        );
        assert_eq!(created.project.unwrap().name, "Depot");
    }

    #[test]
    fn test_failed_upload_stores_nothing() {
        let f = fixture_with(
            RecordingAccounting::default(),
            Arc::new(DisabledGroupwareConnector),
        );
        let mut input = new_expense(f.employee.id, "2026-03-02");
        input.receipt = Some(ReceiptUpload {
            file_name: "receipt.pdf".to_string(),
            content: b"%PDF".to_vec(),
        });

        let result = f.workflow.create_expense(input);
        assert!(matches!(result, Err(BackofficeError::Groupware { .. })));
        assert_eq!(count_expenses(&f.db), 0);
    }

    #[test]
    fn test_create_rejects_unknown_user_and_project() {
        let f = fixture();
        let unknown_user = f.workflow.create_expense(new_expense(Uuid::new_v4(), "2026-03-02"));
        assert!(matches!(
            unknown_user,
            Err(BackofficeError::NotFound { entity: "User", .. })
        ));

        let mut input = new_expense(f.employee.id, "2026-03-02");
        input.project_id = Some(Uuid::new_v4());
        let unknown_project = f.workflow.create_expense(input);
        assert!(matches!(
            unknown_project,
            Err(BackofficeError::NotFound { entity: "Project", .. })
        ));
        assert_eq!(count_expenses(&f.db), 0);
    }

    #[test]
    fn test_submit_twice_is_invalid_transition() {
        let f = fixture();
        let created = f
            .workflow
            .create_expense(new_expense(f.employee.id, "2026-03-02"))
            .unwrap();

        let submitted = f.workflow.submit_expense(created.expense.id).unwrap();
        assert_eq!(submitted.expense.status, ExpenseStatus::Submitted);

        let again = f.workflow.submit_expense(created.expense.id);
        assert!(matches!(
            again,
            Err(BackofficeError::InvalidTransition {
                current: ExpenseStatus::Submitted,
                requested: ExpenseStatus::Submitted,
                ..
            })
        ));
    }

    #[test]
    fn test_submit_unknown_expense_is_not_found() {
        let f = fixture();
        let result = f.workflow.submit_expense(Uuid::new_v4());
        assert!(matches!(
            result,
            Err(BackofficeError::NotFound { entity: "Expense", .. })
        ));
    }

    #[test]
    fn test_approve_posts_entry_and_records_reference() {
        let f = fixture();
        let created = f
            .workflow
            .create_expense(new_expense(f.employee.id, "2026-03-02"))
            .unwrap();
        f.workflow.submit_expense(created.expense.id).unwrap();

        let approved = f
            .workflow
            .approve_expense(created.expense.id, f.manager.id)
            .unwrap();

        assert_eq!(approved.expense.status, ExpenseStatus::Approved);
        assert_eq!(approved.expense.accounting_ref.as_deref(), Some("QB-EXP-1"));
        assert_eq!(approved.expense.approved_by_id, Some(f.manager.id));
        assert!(approved.expense.approved_at.is_some());

        let entries = f.accounting.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].employee_ref, "QB-EMP-003");
        assert_eq!(entries[0].amount, Decimal::new(24999, 2));
    }

    #[test]
    fn test_approve_draft_fails_and_leaves_status() {
        let f = fixture();
        let created = f
            .workflow
            .create_expense(new_expense(f.employee.id, "2026-03-02"))
            .unwrap();

        let result = f.workflow.approve_expense(created.expense.id, f.manager.id);
        assert!(matches!(result, Err(BackofficeError::InvalidTransition { .. })));

        let stored = f.workflow.get_user_expenses(f.employee.id, None).unwrap();
        assert_eq!(stored[0].expense.status, ExpenseStatus::Draft);
        assert!(f.accounting.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_approve_unlinked_owner_fails_before_any_call() {
        let f = fixture();
        let created = f
            .workflow
            .create_expense(new_expense(f.unlinked.id, "2026-03-02"))
            .unwrap();
        f.workflow.submit_expense(created.expense.id).unwrap();

        let result = f.workflow.approve_expense(created.expense.id, f.manager.id);
        assert!(matches!(result, Err(BackofficeError::NotLinked { user_id }) if user_id == f.unlinked.id));

        let stored = f.workflow.get_pending_approvals().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].expense.status, ExpenseStatus::Submitted);
        assert!(f.accounting.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_accounting_failure_keeps_expense_submitted() {
        let f = fixture_with(
            RecordingAccounting {
                fail: true,
                ..RecordingAccounting::default()
            },
            Arc::new(StaticGroupware),
        );
        let created = f
            .workflow
            .create_expense(new_expense(f.employee.id, "2026-03-02"))
            .unwrap();
        f.workflow.submit_expense(created.expense.id).unwrap();

        let result = f.workflow.approve_expense(created.expense.id, f.manager.id);
        assert!(matches!(result, Err(BackofficeError::Accounting { .. })));

        let pending = f.workflow.get_pending_approvals().unwrap();
        assert_eq!(pending[0].expense.id, created.expense.id);
        assert!(pending[0].expense.accounting_ref.is_none());
    }

    #[test]
    fn test_reject_requires_submitted_and_overwrites_notes() {
        let f = fixture();
        let mut input = new_expense(f.employee.id, "2026-03-02");
        input.notes = Some("Urgent".to_string());
        let created = f.workflow.create_expense(input).unwrap();

        let early = f.workflow.reject_expense(created.expense.id, f.manager.id, None);
        assert!(matches!(early, Err(BackofficeError::InvalidTransition { .. })));

        f.workflow.submit_expense(created.expense.id).unwrap();
        let rejected = f
            .workflow
            .reject_expense(
                created.expense.id,
                f.manager.id,
                Some("Missing receipt".to_string()),
            )
            .unwrap();
        assert_eq!(rejected.expense.status, ExpenseStatus::Rejected);
        assert_eq!(rejected.expense.notes.as_deref(), Some("Missing receipt"));
        assert!(rejected.expense.accounting_ref.is_none());

        let after = f.workflow.approve_expense(created.expense.id, f.manager.id);
        assert!(matches!(after, Err(BackofficeError::InvalidTransition { .. })));
    }

    #[test]
    fn test_user_expenses_are_newest_first_and_stable() {
        let f = fixture();
        for date in ["2026-03-01", "2026-03-05", "2026-03-03", "2026-03-05"] {
            f.workflow
                .create_expense(new_expense(f.employee.id, date))
                .unwrap();
        }

        let first = f.workflow.get_user_expenses(f.employee.id, None).unwrap();
        let second = f.workflow.get_user_expenses(f.employee.id, None).unwrap();
        assert_eq!(first, second);

        let dates: Vec<String> = first.iter().map(|d| d.expense.date.to_string()).collect();
        assert_eq!(dates, ["2026-03-05", "2026-03-05", "2026-03-03", "2026-03-01"]);
    }

    #[test]
    fn test_analytics_counts_only_approved_in_range() {
        let f = fixture();
        let mut in_project = new_expense(f.employee.id, "2026-03-10");
        in_project.project_id = Some(f.project.id);
        let mut meals = new_expense(f.employee.id, "2026-03-12");
        meals.category = ExpenseCategory::Meals;
        meals.amount = Decimal::from(30);
        let outside = new_expense(f.employee.id, "2026-04-02");
        let draft_only = new_expense(f.employee.id, "2026-03-11");

        for input in [in_project, meals, outside] {
            let created = f.workflow.create_expense(input).unwrap();
            f.workflow.submit_expense(created.expense.id).unwrap();
            f.workflow
                .approve_expense(created.expense.id, f.manager.id)
                .unwrap();
        }
        f.workflow.create_expense(draft_only).unwrap();

        let analytics = f
            .workflow
            .get_expense_analytics(
                "2026-03-01".parse().unwrap(),
                "2026-03-31".parse().unwrap(),
            )
            .unwrap();

        assert_eq!(analytics.total_amount, Decimal::new(27999, 2));
        assert_eq!(analytics.by_project["Depot"], Decimal::new(24999, 2));
        assert_eq!(analytics.by_project[NO_PROJECT_LABEL], Decimal::from(30));
        assert_eq!(analytics.by_category[&ExpenseCategory::Equipment], Decimal::ZERO);
    }

    #[test]
    fn test_analytics_rejects_reversed_range() {
        let f = fixture();
        let result = f.workflow.get_expense_analytics(
            "2026-03-31".parse().unwrap(),
            "2026-03-01".parse().unwrap(),
        );
        assert!(matches!(result, Err(BackofficeError::Validation { .. })));
    }
}
