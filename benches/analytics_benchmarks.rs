//! Performance benchmarks for the back-office engine.
//!
//! Covers the pure aggregations and one read-heavy HTTP endpoint:
//! - Expense analytics over growing numbers of approved expenses
//! - Hour summaries and gross pay for growing timesheets
//! - Listing a user's expenses through the router
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use axum::{body::Body, http::Request};
use chrono::{NaiveDate, TimeDelta, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tower::ServiceExt;
use uuid::Uuid;

use backoffice_engine::api::{AppState, create_router};
use backoffice_engine::config::{AppConfig, PayrollRates};
use backoffice_engine::connectors::{DisabledGroupwareConnector, SandboxAccountingConnector};
use backoffice_engine::models::{
    Expense, ExpenseCategory, ExpenseStatus, NewExpense, Role, TimeEntry, TimeEntryStatus,
    TimeEntryType, User,
};
use backoffice_engine::payroll::{gross_pay, summarize_hours};
use backoffice_engine::store::Database;
use backoffice_engine::store::users::insert_user;
use backoffice_engine::workflow::summarize_expenses;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

/// Creates `count` approved expenses spread over categories and projects.
fn create_expenses(count: usize) -> Vec<(Expense, Option<String>)> {
    let now = Utc::now();
    (0..count)
        .map(|i| {
            let expense = Expense {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                project_id: None,
                description: format!("Purchase {}", i),
                amount: Decimal::new(1000 + i as i64 * 37, 2),
                date: base_date() + TimeDelta::days((i % 28) as i64),
                category: ExpenseCategory::ALL[i % ExpenseCategory::ALL.len()],
                status: ExpenseStatus::Approved,
                notes: None,
                accounting_ref: Some(format!("QB-EXP-{}", i)),
                approved_by_id: Some(Uuid::nil()),
                approved_at: Some(now),
                created_at: now,
                updated_at: now,
            };
            let project = (i % 4 != 0).then(|| format!("Site {}", i % 5));
            (expense, project)
        })
        .collect()
}

/// Creates a timesheet with one regular entry per day and overtime every fifth day.
fn create_entries(days: usize) -> Vec<TimeEntry> {
    (0..days)
        .flat_map(|day| {
            let date = base_date() + TimeDelta::days(day as i64);
            let regular = Some((Decimal::from(8), TimeEntryType::Regular));
            let overtime = (day % 5 == 4).then(|| (Decimal::new(25, 1), TimeEntryType::Overtime));
            regular.into_iter().chain(overtime).map(move |(hours, entry_type)| TimeEntry {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                project_id: Uuid::nil(),
                date,
                hours,
                entry_type,
                status: TimeEntryStatus::Approved,
            })
        })
        .collect()
}

/// Benchmark: Expense analytics scaling.
fn bench_expense_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("expense_analytics");

    for count in [10usize, 100, 1_000, 10_000] {
        let expenses = create_expenses(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("expenses", count), &expenses, |b, expenses| {
            b.iter(|| black_box(summarize_expenses(black_box(expenses)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark: Hour summary and gross pay scaling.
fn bench_payroll_hours(c: &mut Criterion) {
    let rates = PayrollRates::default();
    let mut group = c.benchmark_group("payroll_hours");

    for days in [14usize, 31, 365] {
        let entries = create_entries(days);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_with_input(BenchmarkId::new("days", days), &entries, |b, entries| {
            b.iter(|| {
                let hours = summarize_hours(black_box(entries));
                black_box(gross_pay(hours, &rates))
            })
        });
    }

    group.finish();
}

/// Benchmark: Listing 200 expenses of one user through the router.
fn bench_list_expenses(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let user = User {
        id: Uuid::new_v4(),
        email: "employee1@company.com".to_string(),
        first_name: "Employee".to_string(),
        last_name: "1".to_string(),
        role: Role::Employee,
        position: None,
        department: None,
        accounting_employee_ref: Some("QB-EMP-003".to_string()),
    };
    db.transaction(|tx| insert_user(tx, &user)).unwrap();

    let config = AppConfig::default();
    let state = AppState::new(
        db,
        Arc::new(SandboxAccountingConnector::new(config.accounting.clone())),
        Arc::new(DisabledGroupwareConnector),
        &config,
    );
    for i in 0..200 {
        state
            .workflow()
            .create_expense(NewExpense {
                user_id: user.id,
                project_id: None,
                description: format!("Purchase {}", i),
                amount: Decimal::new(2500 + i, 2),
                date: base_date(),
                category: ExpenseCategory::ALL[i as usize % ExpenseCategory::ALL.len()],
                notes: None,
                receipt: None,
            })
            .unwrap();
    }

    let router = create_router(state);
    let uri = format!("/api/expenses?userId={}", user.id);

    let mut group = c.benchmark_group("http");
    group.throughput(Throughput::Elements(200));
    group.bench_function("list_200_expenses", |b| {
        b.to_async(&rt).iter(|| async {
            let response = router
                .clone()
                .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
                .await
                .unwrap();
            black_box(response)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_expense_analytics,
    bench_payroll_hours,
    bench_list_expenses
);
criterion_main!(benches);
