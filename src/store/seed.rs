//! Demo data for local development.
//!
//! [`seed_demo_data`] wipes every table and loads a small, consistent data
//! set: one admin, one manager, three employees linked to accounting
//! employee records, a project with its team, a draft expense with a receipt
//! and a pending payroll record.

use chrono::{NaiveDate, TimeDelta, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::connectors::RealmCredentials;
use crate::error::BackofficeResult;
use crate::models::{
    Expense, ExpenseCategory, ExpenseReceipt, ExpenseStatus, PayrollRecord, PayrollStatus,
    Project, ProjectStatus, Role, User,
};

use super::Database;
use super::expenses::{insert_expense, insert_receipt};
use super::integrations::{insert_groupware_integration, upsert_accounting_credentials};
use super::payroll::insert_record;
use super::projects::{add_member, insert_project};
use super::users::insert_user;

/// Tables in dependency order, children first.
const TABLES: [&str; 10] = [
    "expense_receipts",
    "expenses",
    "payroll_records",
    "time_entries",
    "documents",
    "project_members",
    "projects",
    "users",
    "microsoft_integrations",
    "quickbooks_integrations",
];

/// Ids of the seeded rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub admin_id: Uuid,
    pub manager_id: Uuid,
    pub employee_ids: Vec<Uuid>,
    pub project_id: Uuid,
    pub expense_id: Uuid,
    pub payroll_record_id: Uuid,
}

struct Profile<'a> {
    microsoft_id: &'a str,
    phone: &'a str,
    hire_date: NaiveDate,
}

fn insert_with_profile(conn: &Connection, user: &User, profile: Profile<'_>) -> BackofficeResult<()> {
    insert_user(conn, user)?;
    conn.execute(
        "UPDATE users SET microsoft_id = ?2, phone = ?3, hire_date = ?4 WHERE id = ?1",
        params![
            user.id.to_string(),
            profile.microsoft_id,
            profile.phone,
            profile.hire_date,
        ],
    )?;
    Ok(())
}

fn staff(
    email: &str,
    first_name: &str,
    last_name: &str,
    role: Role,
    position: &str,
    department: &str,
    employee_ref: &str,
) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        role,
        position: Some(position.to_string()),
        department: Some(department.to_string()),
        accounting_employee_ref: Some(employee_ref.to_string()),
    }
}

/// Replaces all data with the demo data set.
pub fn seed_demo_data(db: &Database) -> BackofficeResult<SeedSummary> {
    let summary = db.transaction(|tx| {
        for table in TABLES {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        let now = Utc::now();
        let today = now.date_naive();

        insert_groupware_integration(
            tx,
            "demo-tenant-id",
            &serde_json::json!({
                "teamsEnabled": true,
                "sharepointEnabled": true,
                "defaultTeamId": "default-team-id"
            }),
        )?;
        upsert_accounting_credentials(
            tx,
            &RealmCredentials {
                realm_id: "demo-realm-id".to_string(),
                access_token: "demo-access-token".to_string(),
                refresh_token: "demo-refresh-token".to_string(),
                expires_at: now + TimeDelta::hours(1),
            },
        )?;

        let admin = staff(
            "admin@company.com",
            "Admin",
            "User",
            Role::Admin,
            "Administrator",
            "Administration",
            "QB-EMP-001",
        );
        insert_with_profile(
            tx,
            &admin,
            Profile {
                microsoft_id: "admin-ms-id",
                phone: "555-0100",
                hire_date: today,
            },
        )?;

        let manager = staff(
            "manager@company.com",
            "Project",
            "Manager",
            Role::Manager,
            "Project Manager",
            "Operations",
            "QB-EMP-002",
        );
        insert_with_profile(
            tx,
            &manager,
            Profile {
                microsoft_id: "manager-ms-id",
                phone: "555-0200",
                hire_date: today,
            },
        )?;

        let mut employees = Vec::with_capacity(3);
        for n in 1..=3 {
            let employee = staff(
                &format!("employee{n}@company.com"),
                "Employee",
                &n.to_string(),
                Role::Employee,
                "Construction Worker",
                "Construction",
                &format!("QB-EMP-00{}", n + 2),
            );
            insert_with_profile(
                tx,
                &employee,
                Profile {
                    microsoft_id: &format!("employee-ms-id-{n}"),
                    phone: &format!("555-0{}", 299 + n),
                    hire_date: today,
                },
            )?;
            employees.push(employee);
        }

        let project = Project {
            id: Uuid::new_v4(),
            name: "Demo Construction Project".to_string(),
            description: Some("Initial demo project for testing".to_string()),
            status: ProjectStatus::InProgress,
            start_date: today,
            end_date: Some(today + TimeDelta::days(30)),
            budget: Decimal::from(100_000),
            client_name: "Demo Client".to_string(),
            creator_id: manager.id,
        };
        insert_project(tx, &project)?;
        add_member(tx, project.id, manager.id, "manager")?;
        for employee in &employees {
            add_member(tx, project.id, employee.id, "worker")?;
        }

        tx.execute(
            "INSERT INTO documents (id, title, description, sharepoint_url, project_id,
                                    uploaded_by_id, file_size, mime_type, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)",
            params![
                Uuid::new_v4().to_string(),
                "Project Plan",
                "Initial project planning document",
                "https://sharepoint.com/doc1",
                project.id.to_string(),
                manager.id.to_string(),
                1024 * 1024,
                "application/pdf",
                now,
            ],
        )?;

        let first = &employees[0];
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id: first.id,
            project_id: Some(project.id),
            description: "Construction materials".to_string(),
            amount: Decimal::from(1500),
            date: today,
            category: ExpenseCategory::Materials,
            status: ExpenseStatus::Draft,
            notes: Some("Emergency supplies needed".to_string()),
            accounting_ref: None,
            approved_by_id: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        insert_expense(tx, &expense)?;
        insert_receipt(
            tx,
            &ExpenseReceipt {
                id: Uuid::new_v4(),
                expense_id: expense.id,
                file_name: "receipt.pdf".to_string(),
                file_url: "https://sharepoint.com/receipts/1".to_string(),
            },
            now,
        )?;

        let payroll = PayrollRecord {
            id: Uuid::new_v4(),
            user_id: first.id,
            period_start: today - TimeDelta::days(14),
            period_end: today,
            regular_hours: Decimal::from(80),
            overtime_hours: Decimal::from(5),
            gross_pay: Decimal::from(2500),
            net_pay: Decimal::from(1875),
            status: PayrollStatus::Pending,
            accounting_employee_ref: "QB-EMP-003".to_string(),
            accounting_paycheck_ref: None,
        };
        insert_record(tx, &payroll)?;

        Ok(SeedSummary {
            admin_id: admin.id,
            manager_id: manager.id,
            employee_ids: employees.iter().map(|e| e.id).collect(),
            project_id: project.id,
            expense_id: expense.id,
            payroll_record_id: payroll.id,
        })
    })?;

    info!(
        employees = summary.employee_ids.len(),
        project_id = %summary.project_id,
        "Demo data seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::expenses::find_details;
    use crate::store::integrations::latest_accounting_credentials;
    use crate::store::payroll::find_record;
    use crate::store::users::find_user;

    #[test]
    fn test_seed_creates_linked_staff_and_demo_records() {
        let db = Database::open_in_memory().unwrap();
        let summary = seed_demo_data(&db).unwrap();
        assert_eq!(summary.employee_ids.len(), 3);

        let manager = db.read(|conn| find_user(conn, summary.manager_id)).unwrap().unwrap();
        assert_eq!(manager.role, Role::Manager);
        assert_eq!(manager.linked_employee_ref(), Some("QB-EMP-002"));

        let last = db
            .read(|conn| find_user(conn, summary.employee_ids[2]))
            .unwrap()
            .unwrap();
        assert_eq!(last.email, "employee3@company.com");
        assert_eq!(last.linked_employee_ref(), Some("QB-EMP-005"));

        let expense = db
            .read(|conn| find_details(conn, summary.expense_id))
            .unwrap()
            .unwrap();
        assert_eq!(expense.expense.amount, Decimal::from(1500));
        assert_eq!(expense.expense.status, ExpenseStatus::Draft);
        assert_eq!(expense.project.unwrap().name, "Demo Construction Project");
        assert_eq!(expense.receipt.unwrap().file_name, "receipt.pdf");

        let payroll = db
            .read(|conn| find_record(conn, summary.payroll_record_id))
            .unwrap()
            .unwrap();
        assert_eq!(payroll.net_pay, Decimal::from(1875));

        let credentials = db.read(latest_accounting_credentials).unwrap().unwrap();
        assert_eq!(credentials.realm_id, "demo-realm-id");
    }

    #[test]
    fn test_seed_twice_replaces_previous_data() {
        let db = Database::open_in_memory().unwrap();
        let first = seed_demo_data(&db).unwrap();
        let second = seed_demo_data(&db).unwrap();

        assert!(db.read(|conn| find_user(conn, first.admin_id)).unwrap().is_none());
        assert!(db.read(|conn| find_user(conn, second.admin_id)).unwrap().is_some());

        let users: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(users, 5);
    }
}
