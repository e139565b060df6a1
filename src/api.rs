use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use parishdb_core::{ParishKey, Record, RecordBody, RecordId, RecordKind, Role, StorageError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};

use crate::{
    access::{AccessError, Session},
    aggregate::ParishStats,
    auth::{self, SessionRegistry, SessionToken},
    lifecycle::{Decision, LifecycleError},
    office::{ParishOffice, ServiceError},
};

pub struct AppState {
    pub office: ParishOffice,
    pub sessions: SessionRegistry,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(office: ParishOffice, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            office,
            sessions: SessionRegistry::new(),
            metrics,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/parishes", get(list_parishes).post(add_parish))
        .route("/parishes/:id/login", post(login))
        .route("/logout", post(logout))
        .route("/parishes/:id/records", get(list_records).post(add_record))
        .route("/records/:id", put(update_record).delete(delete_record))
        .route("/parishes/:id/search", get(search))
        .route("/parishes/:id/stats", get(stats))
        .route("/parishes/:id/pending", get(pending))
        .route("/parishes/:id/calendar", get(calendar))
        .route("/parishes/:id/appointments", post(submit_appointment))
        .route("/parishes/:id/appointments/:appointment", get(check_status))
        .route("/parishes/:id/appointments/:appointment/review", post(review))
        .route("/parishes/:id/access-codes", put(update_access_codes))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .merge(protected)
        .with_state(state)
}

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Access(AccessError::InvalidCredential) => StatusCode::UNAUTHORIZED,
            ServiceError::Access(AccessError::AccessDenied) => StatusCode::FORBIDDEN,
            ServiceError::Access(AccessError::NotAParish(_)) => StatusCode::NOT_FOUND,
            ServiceError::Lifecycle(LifecycleError::AlreadyReviewed { .. }) => StatusCode::CONFLICT,
            ServiceError::Lifecycle(LifecycleError::NotAppointment(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(
                StorageError::DuplicateParish(_)
                | StorageError::UnknownParish(_)
                | StorageError::KindMismatch,
            ) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Access codes never leave the service.
fn redact(mut record: Record) -> Record {
    if let RecordBody::Parish(p) = &mut record.body {
        p.staff_access_code = None;
        p.priest_access_code = None;
    }
    record
}

fn redact_all(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().map(redact).collect()
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn list_parishes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(redact_all(state.office.search_parishes(&params.q)?)))
}

async fn add_parish(
    State(state): State<Arc<AppState>>,
    Json(key): Json<ParishKey>,
) -> ApiResult<Record> {
    Ok(Json(redact(state.office.add_parish(key)?)))
}

#[derive(Deserialize)]
struct LoginRequest {
    code: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    role: Role,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let session = state.office.login(&RecordId::from(id), &req.code)?;
    let role = session.role();
    let token = state.sessions.issue(session);
    Ok(Json(LoginResponse { token, role }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    token: Option<Extension<SessionToken>>,
) -> StatusCode {
    if let Some(Extension(SessionToken(token))) = token {
        state.sessions.revoke(&token);
    }
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct KindParams {
    kind: Option<RecordKind>,
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<KindParams>,
) -> ApiResult<Vec<Record>> {
    let records = state
        .office
        .records(&session, &RecordId::from(id), params.kind)?;
    Ok(Json(redact_all(records)))
}

async fn add_record(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<RecordBody>,
) -> ApiResult<Record> {
    Ok(Json(state.office.add_record(&session, &RecordId::from(id), body)?))
}

async fn update_record(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<RecordBody>,
) -> ApiResult<Record> {
    let record = Record::new(RecordId::from(id), body);
    Ok(Json(redact(state.office.update_record(&session, record)?)))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.office.delete_record(&session, &RecordId::from(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Record>> {
    Ok(Json(state.office.search(&session, &RecordId::from(id), &params.q)?))
}

#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: ParishStats,
    net_funds: Decimal,
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatsResponse> {
    let stats = state.office.stats(&RecordId::from(id))?;
    let net_funds = stats.net_funds();
    Ok(Json(StatsResponse { stats, net_funds }))
}

async fn pending(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<BTreeMap<RecordKind, usize>> {
    Ok(Json(state.office.pending_counts(&session, &RecordId::from(id))?))
}

#[derive(Deserialize)]
struct CalendarParams {
    date: String,
}

async fn calendar(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<CalendarParams>,
) -> ApiResult<Vec<Record>> {
    let date = Date::parse(&params.date, format_description!("[year]-[month]-[day]"))
        .map_err(|e| ServiceError::Validation(format!("invalid date {}: {}", params.date, e)))?;
    Ok(Json(state.office.calendar(&session, &RecordId::from(id), date)?))
}

#[derive(Serialize)]
struct SubmitResponse {
    appointment_id: RecordId,
    record: Record,
}

async fn submit_appointment(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<RecordBody>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let record = state
        .office
        .submit_appointment(&session, &RecordId::from(id), body)?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            appointment_id: record.id.clone(),
            record,
        }),
    ))
}

async fn check_status(
    State(state): State<Arc<AppState>>,
    Path((id, appointment)): Path<(String, String)>,
) -> ApiResult<Record> {
    Ok(Json(state.office.check_status(
        &RecordId::from(id),
        &RecordId::from(appointment),
    )?))
}

#[derive(Deserialize)]
struct ReviewRequest {
    decision: Decision,
    #[serde(default)]
    reply: Option<String>,
}

async fn review(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((id, appointment)): Path<(String, String)>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Record> {
    Ok(Json(state.office.review_appointment(
        &session,
        &RecordId::from(id),
        &RecordId::from(appointment),
        req.decision,
        req.reply.as_deref(),
    )?))
}

#[derive(Deserialize)]
struct AccessCodesRequest {
    #[serde(default)]
    staff_access_code: Option<String>,
    #[serde(default)]
    priest_access_code: Option<String>,
}

async fn update_access_codes(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(req): Json<AccessCodesRequest>,
) -> Result<StatusCode, ApiError> {
    state.office.update_access_codes(
        &session,
        &RecordId::from(id),
        req.staff_access_code,
        req.priest_access_code,
    )?;
    Ok(StatusCode::NO_CONTENT)
}
