//! # API Endpoint Handlers
//!
//! Each handler takes the engine lock for the shortest span it needs. The
//! assist call runs after the read lock is released.

use super::{
    AppState,
    types::{
        ApiError, CreateTrrRequest, HealthResponse, ListQuery, ListResponse, MetricsViewRequest,
        UpdateTrrRequest, ValidationStageRequest, ValidationStageResponse, VersionQuery,
    },
};
use crate::assist;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use trr_core::{
    ApprovalRequest, AssistField, DorReport, PlaybookMetricsView, RiskAssessment, RiskInputs,
    SdwProgress, SdwStatus, Suggestion, TransitionRequest, Trr, TrrId, compute_metrics_view,
    derive_stage, score_risk,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let persistent = state.engine.read().await.repository().is_persistent();
    Json(HealthResponse::new(persistent, state.assist.is_some()))
}

// =============================================================================
// RECORD HANDLERS
// =============================================================================

/// `POST /trrs`
pub async fn create_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateTrrRequest>,
) -> Result<(StatusCode, Json<Trr>), ApiError> {
    let trr = state
        .engine
        .write()
        .await
        .create_trr(request.fields, &request.author_id)?;
    tracing::info!(event = "trr_created", trr = %trr.id, author = %request.author_id);
    Ok((StatusCode::CREATED, Json(trr)))
}

/// `GET /trrs`
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListResponse> {
    let filter = query.into_filter()?;
    let items = state.engine.read().await.list_trrs(&filter)?;
    Ok(Json(ListResponse {
        count: items.len(),
        items,
    }))
}

/// `GET /trrs/{id}`
pub async fn get_handler(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Trr> {
    Ok(Json(state.engine.read().await.get_trr(TrrId(id))?))
}

/// `PATCH /trrs/{id}`
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateTrrRequest>,
) -> ApiResult<Trr> {
    let trr = state.engine.write().await.update_trr(
        TrrId(id),
        request.patch,
        request.expected_version,
    )?;
    tracing::info!(event = "trr_updated", trr = %trr.id, version = trr.version());
    Ok(Json(trr))
}

/// `DELETE /trrs/{id}?expected_version=N`
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<Trr> {
    let expected = query.required()?;
    let trr = state.engine.write().await.delete_trr(TrrId(id), expected)?;
    tracing::info!(event = "trr_archived", trr = %trr.id);
    Ok(Json(trr))
}

// =============================================================================
// LIFECYCLE HANDLERS
// =============================================================================

/// `POST /trrs/{id}/transition`
pub async fn transition_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<Trr> {
    let to = request.to;
    let trr = state.engine.write().await.transition(TrrId(id), request)?;
    tracing::info!(event = "trr_transitioned", trr = %trr.id, to = %to);
    Ok(Json(trr))
}

/// `POST /trrs/{id}/approvals`
pub async fn approval_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ApprovalRequest>,
) -> ApiResult<SdwStatus> {
    let (role, decision) = (request.role, request.decision);
    let sdw = state
        .engine
        .write()
        .await
        .set_approval(TrrId(id), request)?;
    tracing::info!(
        event = "approval_recorded",
        trr = %TrrId(id),
        role = %role,
        decision = ?decision
    );
    Ok(Json(sdw))
}

/// `POST /trrs/{id}/advance?expected_version=N`
pub async fn advance_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<SdwStatus> {
    let expected = query.required()?;
    let sdw = state
        .engine
        .write()
        .await
        .advance_stage(TrrId(id), expected)?;
    tracing::info!(event = "stage_advanced", trr = %TrrId(id), stage = %sdw.current_stage);
    Ok(Json(sdw))
}

// =============================================================================
// READINESS & PROGRESS HANDLERS
// =============================================================================

/// `GET /trrs/{id}/dor`
pub async fn dor_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<DorReport> {
    let trr = state.engine.read().await.get_trr(TrrId(id))?;
    Ok(Json(assist::assisted_dor(state.assist.as_ref(), &trr).await))
}

/// `GET /trrs/{id}/suggestions/{field}`
pub async fn suggestion_handler(
    State(state): State<AppState>,
    Path((id, field)): Path<(u64, AssistField)>,
) -> ApiResult<Suggestion> {
    let trr = state.engine.read().await.get_trr(TrrId(id))?;
    Ok(Json(
        assist::suggest_field(state.assist.as_ref(), field, &trr).await,
    ))
}

/// `GET /trrs/{id}/sdw`
pub async fn sdw_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<SdwProgress> {
    Ok(Json(state.engine.read().await.sdw_progress(TrrId(id))?))
}

/// `GET /trrs/{id}/risk`
pub async fn trr_risk_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<RiskAssessment> {
    Ok(Json(state.engine.read().await.assess_risk(TrrId(id))?))
}

// =============================================================================
// PURE VIEW HANDLERS
// =============================================================================

/// `POST /validation-stage`
pub async fn validation_stage_handler(
    Json(request): Json<ValidationStageRequest>,
) -> Json<ValidationStageResponse> {
    Json(derive_stage(&request.phase, &request.status).into())
}

/// `POST /metrics-view`
pub async fn metrics_view_handler(
    Json(request): Json<MetricsViewRequest>,
) -> Json<PlaybookMetricsView> {
    Json(compute_metrics_view(&request.framework, &request.scenarios))
}

/// `POST /risk`
pub async fn risk_handler(Json(inputs): Json<RiskInputs>) -> Json<RiskAssessment> {
    Json(score_risk(&inputs))
}
