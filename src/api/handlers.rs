//! HTTP request handlers for the back-office API.
//!
//! Every handler tags its log lines with a fresh correlation id and runs the
//! service call on a blocking worker, since the store and the connectors are
//! synchronous.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::connectors::RealmCredentials;
use crate::error::{BackofficeError, BackofficeResult};
use crate::store::integrations::upsert_accounting_credentials;

use super::request::{
    AccountingCallbackQuery, AnalyticsQuery, ApproveExpenseRequest, ComputePayrollRequest,
    CreateExpenseRequest, ExpenseListQuery, PayrollListQuery, RejectExpenseRequest,
    parse_path_id,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/expenses",
            get(list_expenses_handler).post(create_expense_handler),
        )
        .route("/api/expenses/pending", get(pending_expenses_handler))
        .route("/api/expenses/analytics", get(expense_analytics_handler))
        .route("/api/expenses/:id/submit", post(submit_expense_handler))
        .route("/api/expenses/:id/approve", post(approve_expense_handler))
        .route("/api/expenses/:id/reject", post(reject_expense_handler))
        .route(
            "/api/payroll",
            get(list_payroll_handler).post(compute_payroll_handler),
        )
        .route(
            "/api/integrations/accounting/connect",
            get(accounting_connect_handler),
        )
        .route(
            "/api/integrations/accounting/callback",
            get(accounting_callback_handler),
        )
        .with_state(state)
}

/// Runs synchronous service work on the blocking pool.
async fn run_blocking<T, F>(work: F) -> BackofficeResult<T>
where
    F: FnOnce() -> BackofficeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BackofficeError::Internal {
            message: format!("worker task failed: {}", e),
        })?
}

fn json_ok<T: Serialize>(value: T) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(value),
    )
        .into_response()
}

/// Converts a service error into a response, logging it by severity.
fn error_response(correlation_id: Uuid, err: BackofficeError) -> Response {
    let message = err.to_string();
    let api_error: ApiErrorResponse = err.into();
    if api_error.is_server_error() {
        error!(correlation_id = %correlation_id, error = %message, "Request failed");
    } else {
        warn!(
            correlation_id = %correlation_id,
            status = api_error.status.as_u16(),
            error = %message,
            "Request rejected"
        );
    }
    api_error.into_response()
}

fn respond<T: Serialize>(correlation_id: Uuid, result: BackofficeResult<T>) -> Response {
    match result {
        Ok(value) => json_ok(value),
        Err(err) => error_response(correlation_id, err),
    }
}

/// Maps a JSON body rejection to a 400 response.
fn json_rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    ApiErrorResponse {
        status: StatusCode::BAD_REQUEST,
        error,
    }
    .into_response()
}

/// Handler for GET /health.
async fn health_handler() -> Response {
    json_ok(serde_json::json!({ "status": "ok" }))
}

/// Handler for POST /api/expenses.
async fn create_expense_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing create expense request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let workflow = state.workflow().clone();
    let result = run_blocking(move || {
        let input = request.into_new_expense(Utc::now().date_naive())?;
        workflow.create_expense(input)
    })
    .await;
    respond(correlation_id, result)
}

/// Handler for GET /api/expenses.
///
/// Lists the given user's expenses, or every expense when no user is named.
async fn list_expenses_handler(
    State(state): State<AppState>,
    Query(query): Query<ExpenseListQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let workflow = state.workflow().clone();
    let result = run_blocking(move || {
        let (user_id, status) = query.parse()?;
        match user_id {
            Some(user_id) => workflow.get_user_expenses(user_id, status),
            None => workflow.list_expenses(status),
        }
    })
    .await;
    respond(correlation_id, result)
}

/// Handler for GET /api/expenses/pending.
async fn pending_expenses_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    let workflow = state.workflow().clone();
    let result = run_blocking(move || workflow.get_pending_approvals()).await;
    respond(correlation_id, result)
}

/// Handler for GET /api/expenses/analytics.
async fn expense_analytics_handler(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let workflow = state.workflow().clone();
    let result = run_blocking(move || {
        let (start_date, end_date) = query.parse()?;
        workflow.get_expense_analytics(start_date, end_date)
    })
    .await;
    respond(correlation_id, result)
}

/// Handler for POST /api/expenses/:id/submit.
async fn submit_expense_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, expense_id = %id, "Processing submit request");

    let workflow = state.workflow().clone();
    let result = run_blocking(move || workflow.submit_expense(parse_path_id(&id)?)).await;
    respond(correlation_id, result)
}

/// Handler for POST /api/expenses/:id/approve.
async fn approve_expense_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApproveExpenseRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, expense_id = %id, "Processing approve request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let workflow = state.workflow().clone();
    let result = run_blocking(move || {
        workflow.approve_expense(parse_path_id(&id)?, request.approver_id)
    })
    .await;
    respond(correlation_id, result)
}

/// Handler for POST /api/expenses/:id/reject.
async fn reject_expense_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RejectExpenseRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, expense_id = %id, "Processing reject request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let workflow = state.workflow().clone();
    let result = run_blocking(move || {
        workflow.reject_expense(parse_path_id(&id)?, request.approver_id, request.notes)
    })
    .await;
    respond(correlation_id, result)
}

/// Handler for POST /api/payroll.
async fn compute_payroll_handler(
    State(state): State<AppState>,
    payload: Result<Json<ComputePayrollRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing payroll request");

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejection_response(correlation_id, rejection),
    };

    let payroll = state.payroll().clone();
    let result = run_blocking(move || {
        payroll.compute_payroll(request.user_id, request.start_date, request.end_date)
    })
    .await;
    respond(correlation_id, result)
}

/// Handler for GET /api/payroll.
async fn list_payroll_handler(
    State(state): State<AppState>,
    Query(query): Query<PayrollListQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let payroll = state.payroll().clone();
    let result = run_blocking(move || payroll.list_payroll(query.parse()?)).await;
    respond(correlation_id, result)
}

/// Handler for GET /api/integrations/accounting/connect.
///
/// Redirects the browser to the accounting provider's consent page.
async fn accounting_connect_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    let authorization_url = state
        .authorization_states()
        .issue(Utc::now())
        .and_then(|oauth_state| state.accounting().authorization_url(&oauth_state));

    match authorization_url {
        Ok(url) => {
            info!(correlation_id = %correlation_id, "Redirecting to accounting authorization");
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        Err(err) => error_response(correlation_id, err),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedRealm {
    realm_id: String,
    expires_at: chrono::DateTime<Utc>,
}

/// Handler for GET /api/integrations/accounting/callback.
///
/// Exchanges the authorization code and stores the company file tokens.
/// The `state` must be one issued by the connect endpoint and not yet used.
async fn accounting_callback_handler(
    State(state): State<AppState>,
    Query(query): Query<AccountingCallbackQuery>,
    uri: Uri,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing accounting callback");

    if let Err(err) = query.validate() {
        return error_response(correlation_id, err);
    }
    let oauth_state = query.state.as_deref().unwrap_or_default().trim();
    match state.authorization_states().consume(oauth_state, Utc::now()) {
        Ok(true) => {}
        Ok(false) => {
            let err =
                BackofficeError::validation("state", "Unknown or expired authorization state");
            return error_response(correlation_id, err);
        }
        Err(err) => return error_response(correlation_id, err),
    }

    let callback_url = format!(
        "{}?{}",
        state.callback_url(),
        uri.query().unwrap_or_default()
    );
    let accounting = state.accounting().clone();
    let db = state.db().clone();
    let result = run_blocking(move || {
        let tokens = accounting.exchange_authorization_code(&callback_url)?;
        let credentials = RealmCredentials::from_tokens(&tokens, Utc::now());
        db.transaction(|tx| upsert_accounting_credentials(tx, &credentials))?;
        info!(realm_id = %credentials.realm_id, "Accounting credentials stored");
        Ok(ConnectedRealm {
            realm_id: credentials.realm_id,
            expires_at: credentials.expires_at,
        })
    })
    .await;
    respond(correlation_id, result)
}
