// src/routes.rs

use axum::{
    extract::{Path, State},
    http::{
        header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::attendance::{parse_date, AttendanceInput};
use crate::auth::{self, SessionStore};
use crate::config::Config;
use crate::error::AppError;
use crate::model::{DailyAttendance, EmployeeId, EmployeeInput, Month, WeekNum};
use crate::payroll::{PaymentRequest, PayrollService};
use crate::report;
use crate::store::PayrollStore;

#[derive(Clone)]
pub struct AppState {
    pub payroll: PayrollService,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<PayrollStore>) -> Self {
        Self {
            payroll: PayrollService::new(store),
            sessions: Arc::new(SessionStore::new(config.session_ttl_hours)),
            config: Arc::new(config),
        }
    }

    fn store(&self) -> &PayrollStore {
        self.payroll.store()
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let origin: HeaderValue = state.config.cors_origin.parse().map_err(|_| {
        AppError::Config(format!("Invalid CORS_ORIGIN: {}", state.config.cors_origin))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let protected = Router::new()
        .route("/admin/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/{employee_id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/employees/{employee_id}/loans", post(add_loan))
        .route(
            "/employees/{employee_id}/loans/{loan_id}/deduct",
            put(deduct_loan),
        )
        .route(
            "/employees/{employee_id}/attendance",
            put(upsert_attendance_for_dates),
        )
        .route(
            "/employees/{employee_id}/attendance/{date}",
            put(upsert_attendance).delete(remove_attendance),
        )
        .route("/attendance/{date}", put(upsert_attendance_for_employees))
        .route(
            "/employees/{employee_id}/months/{month}/attendance",
            get(monthly_attendance),
        )
        .route(
            "/employees/{employee_id}/months/{month}/salary",
            get(monthly_salary),
        )
        .route(
            "/employees/{employee_id}/months/{month}/weekly-pay",
            get(employee_month_pay),
        )
        .route(
            "/employees/{employee_id}/months/{month}/weeks/{week}/quote",
            get(weekly_quote),
        )
        .route(
            "/employees/{employee_id}/months/{month}/weeks/{week}/pay",
            get(get_weekly_pay)
                .post(process_weekly_payment)
                .delete(delete_weekly_pay),
        )
        .route("/months/{month}/weeks/{week}/report", get(weekly_report))
        .route("/months/{month}/weeks/{week}/pay", get(week_pay_for_all))
        .route("/months/{month}/report", get(monthly_report))
        .route("/months/{month}/report/csv", get(monthly_report_csv))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api = Router::new()
        .route("/admin/login", post(auth::login))
        .merge(protected);

    Ok(Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

// --- Path parsing ---

fn parse_month(text: &str) -> Result<Month, AppError> {
    Ok(text.parse::<Month>()?)
}

fn parse_week(text: &str) -> Result<WeekNum, AppError> {
    text.parse::<WeekNum>()
        .map_err(|_| AppError::Validation(format!("Invalid week number '{}'", text)))
}

fn parse_day(text: &str) -> Result<NaiveDate, AppError> {
    Ok(parse_date(text)?)
}

// --- Public ---

async fn banner() -> impl IntoResponse {
    "Paydesk payroll API"
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// --- Employees ---

async fn list_employees(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store().list_employees()?))
}

async fn create_employee(
    State(state): State<AppState>,
    Json(input): Json<EmployeeInput>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let employee = state.store().insert_employee(input.into_employee())?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn get_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store().get_employee(&employee_id)?))
}

async fn update_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
    Json(input): Json<EmployeeInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store().update_employee(&employee_id, input)?))
}

async fn delete_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> Result<impl IntoResponse, AppError> {
    let employee = state.store().delete_employee(&employee_id)?;
    Ok(Json(json!({
        "message": format!("Employee {} deleted", employee.name),
        "employee": employee,
    })))
}

// --- Loans ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoanInput {
    amount: Decimal,
    date_taken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeductInput {
    amount: Decimal,
}

async fn add_loan(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
    Json(input): Json<LoanInput>,
) -> Result<impl IntoResponse, AppError> {
    let date_taken = match input.date_taken.as_deref() {
        Some(text) => parse_day(text)?,
        None => Utc::now().date_naive(),
    };
    let employee = state
        .store()
        .add_loan(&employee_id, input.amount, date_taken)?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn deduct_loan(
    State(state): State<AppState>,
    Path((employee_id, loan_id)): Path<(EmployeeId, String)>,
    Json(input): Json<DeductInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store().deduct_loan(
        &employee_id,
        &loan_id,
        input.amount,
    )?))
}

// --- Attendance ---

#[derive(Debug, Deserialize)]
struct BulkDatesInput {
    dates: Vec<String>,
    attendance: AttendanceInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkEmployeesInput {
    employee_ids: Vec<EmployeeId>,
    attendance: AttendanceInput,
}

fn bulk_response(results: Vec<(DailyAttendance, bool)>) -> impl IntoResponse {
    let created = results.iter().filter(|(_, created)| *created).count();
    let updated = results.len() - created;
    let records: Vec<DailyAttendance> = results.into_iter().map(|(record, _)| record).collect();
    Json(json!({
        "created": created,
        "updated": updated,
        "records": records,
    }))
}

async fn upsert_attendance(
    State(state): State<AppState>,
    Path((employee_id, date)): Path<(EmployeeId, String)>,
    Json(input): Json<AttendanceInput>,
) -> Result<impl IntoResponse, AppError> {
    let record = input.into_record(&employee_id, parse_day(&date)?)?;
    let (record, created) = state.store().upsert_attendance(record)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(record)))
}

async fn upsert_attendance_for_dates(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
    Json(input): Json<BulkDatesInput>,
) -> Result<impl IntoResponse, AppError> {
    if input.dates.is_empty() {
        return Err(AppError::Validation("At least one date is required".to_string()));
    }
    let records = input
        .dates
        .iter()
        .map(|date| Ok(input.attendance.into_record(&employee_id, parse_day(date)?)?))
        .collect::<Result<Vec<_>, AppError>>()?;
    let results = state.store().upsert_attendance_many(records)?;
    Ok(bulk_response(results))
}

async fn upsert_attendance_for_employees(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(input): Json<BulkEmployeesInput>,
) -> Result<impl IntoResponse, AppError> {
    if input.employee_ids.is_empty() {
        return Err(AppError::Validation(
            "At least one employee is required".to_string(),
        ));
    }
    let date = parse_day(&date)?;
    let records = input
        .employee_ids
        .iter()
        .map(|employee_id| input.attendance.into_record(employee_id, date))
        .collect::<Result<Vec<_>, _>>()?;
    let results = state.store().upsert_attendance_many(records)?;
    info!("Marked attendance on {} for {} employees", date, results.len());
    Ok(bulk_response(results))
}

async fn remove_attendance(
    State(state): State<AppState>,
    Path((employee_id, date)): Path<(EmployeeId, String)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state
        .store()
        .remove_attendance(&employee_id, parse_day(&date)?)?;
    Ok(Json(removed))
}

async fn monthly_attendance(
    State(state): State<AppState>,
    Path((employee_id, month)): Path<(EmployeeId, String)>,
) -> Result<impl IntoResponse, AppError> {
    let month = parse_month(&month)?;
    Ok(Json(state.payroll.monthly_attendance(&employee_id, month)?))
}

async fn monthly_salary(
    State(state): State<AppState>,
    Path((employee_id, month)): Path<(EmployeeId, String)>,
) -> Result<impl IntoResponse, AppError> {
    let month = parse_month(&month)?;
    Ok(Json(state.payroll.monthly_salary(&employee_id, month)?))
}

// --- Weekly pay ---

async fn employee_month_pay(
    State(state): State<AppState>,
    Path((employee_id, month)): Path<(EmployeeId, String)>,
) -> Result<impl IntoResponse, AppError> {
    let month = parse_month(&month)?;
    Ok(Json(state.payroll.employee_month_pay(&employee_id, month)?))
}

async fn weekly_quote(
    State(state): State<AppState>,
    Path((employee_id, month, week)): Path<(EmployeeId, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (month, week) = (parse_month(&month)?, parse_week(&week)?);
    Ok(Json(state.payroll.quote(&employee_id, month, week)?))
}

async fn get_weekly_pay(
    State(state): State<AppState>,
    Path((employee_id, month, week)): Path<(EmployeeId, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (month, week) = (parse_month(&month)?, parse_week(&week)?);
    Ok(Json(state.store().weekly_pay(&employee_id, month, week)?))
}

async fn process_weekly_payment(
    State(state): State<AppState>,
    Path((employee_id, month, week)): Path<(EmployeeId, String, String)>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (month, week) = (parse_month(&month)?, parse_week(&week)?);
    let outcome = state
        .payroll
        .process_weekly_payment(&employee_id, month, week, request)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn delete_weekly_pay(
    State(state): State<AppState>,
    Path((employee_id, month, week)): Path<(EmployeeId, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (month, week) = (parse_month(&month)?, parse_week(&week)?);
    Ok(Json(state.store().delete_weekly_pay(&employee_id, month, week)?))
}

async fn weekly_report(
    State(state): State<AppState>,
    Path((month, week)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (month, week) = (parse_month(&month)?, parse_week(&week)?);
    Ok(Json(state.payroll.weekly_report(month, week)?))
}

async fn week_pay_for_all(
    State(state): State<AppState>,
    Path((month, week)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (month, week) = (parse_month(&month)?, parse_week(&week)?);
    Ok(Json(state.payroll.week_pay_for_all(month, week)?))
}

// --- Reports ---

async fn monthly_report(
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let month = parse_month(&month)?;
    Ok(Json(state.payroll.monthly_report(month)?))
}

async fn monthly_report_csv(
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.payroll.monthly_report(parse_month(&month)?)?;
    let body = report::monthly_csv_string(&report)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report::monthly_csv_filename(&report)
    );
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
