//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API and the mapping
//! from engine errors to status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use trr_core::{
    NewTrr, OutcomesFramework, ScenarioResult, TrrError, TrrFilter, TrrPatch, TrrStatus,
    ValidationStage,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub assist_enabled: bool,
}

impl HealthResponse {
    pub fn new(persistent: bool, assist_enabled: bool) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: if persistent { "redb" } else { "memory" }.to_string(),
            assist_enabled,
        }
    }
}

// =============================================================================
// TRR REQUESTS
// =============================================================================

/// `POST /trrs` body: the author plus the descriptive fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrrRequest {
    pub author_id: String,
    #[serde(flatten)]
    pub fields: NewTrr,
}

/// `PATCH /trrs/{id}` body: the observed version plus the fields to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTrrRequest {
    pub expected_version: u64,
    #[serde(flatten)]
    pub patch: TrrPatch,
}

/// `?expected_version=N` on delete and advance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VersionQuery {
    pub expected_version: Option<u64>,
}

impl VersionQuery {
    /// The version, required for operations that must not race.
    pub fn required(self) -> Result<u64, TrrError> {
        self.expected_version
            .ok_or_else(|| TrrError::validation("expected_version", "is required"))
    }
}

/// `GET /trrs` query string. List values are comma-separated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub assignee: Option<String>,
    pub tag: Option<String>,
    pub include_archived: bool,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn into_filter(self) -> Result<TrrFilter, TrrError> {
        Ok(TrrFilter {
            statuses: parse_list(self.status.as_deref())?,
            priorities: parse_list(self.priority.as_deref())?,
            categories: parse_list(self.category.as_deref())?,
            assignee: self.assignee.filter(|a| !a.trim().is_empty()),
            tag: self.tag.filter(|t| !t.trim().is_empty()),
            include_archived: self.include_archived,
            limit: self.limit,
        })
    }
}

fn parse_list<T: FromStr<Err = TrrError>>(raw: Option<&str>) -> Result<Vec<T>, TrrError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// `GET /trrs` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub count: usize,
    pub items: Vec<trr_core::Trr>,
}

// =============================================================================
// VIEW REQUESTS/RESPONSES
// =============================================================================

/// `POST /validation-stage` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStageRequest {
    pub phase: String,
    #[serde(default)]
    pub status: String,
}

/// Derived stage with its static playbook description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStageResponse {
    pub stage: ValidationStage,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub key_activities: Vec<String>,
    pub deliverables: Vec<String>,
    pub exit_criteria: Vec<String>,
}

impl From<ValidationStage> for ValidationStageResponse {
    fn from(stage: ValidationStage) -> Self {
        let def = stage.definition();
        let owned = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| (*s).to_string()).collect()
        };
        Self {
            stage,
            name: def.name.to_string(),
            description: def.description.to_string(),
            duration: def.duration.to_string(),
            key_activities: owned(def.key_activities),
            deliverables: owned(def.deliverables),
            exit_criteria: owned(def.exit_criteria),
        }
    }
}

/// `POST /metrics-view` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsViewRequest {
    pub framework: OutcomesFramework,
    pub scenarios: Vec<ScenarioResult>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<TrrStatus>,
}

/// Engine error carried out of a handler.
#[derive(Debug)]
pub struct ApiError(pub TrrError);

impl From<TrrError> for ApiError {
    fn from(e: TrrError) -> Self {
        Self(e)
    }
}

impl ApiError {
    /// Status code and machine-readable kind for the wrapped error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            TrrError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            TrrError::InvalidTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
            }
            TrrError::RoleNotApplicable { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "role_not_applicable")
            }
            TrrError::StageIncomplete { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "stage_incomplete")
            }
            TrrError::PipelineFinished => (StatusCode::UNPROCESSABLE_ENTITY, "pipeline_finished"),
            TrrError::Archived(_) => (StatusCode::UNPROCESSABLE_ENTITY, "archived"),
            TrrError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            TrrError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            TrrError::AugmentationUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "augmentation_unavailable")
            }
            TrrError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            TrrError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();
        if self.0.is_client_error() {
            tracing::debug!(kind, error = %self.0, "Request rejected");
        } else {
            tracing::error!(kind, error = %self.0, "Request failed");
        }

        let (field, allowed) = match &self.0 {
            TrrError::Validation { field, .. } => (Some(field.clone()), Vec::new()),
            TrrError::InvalidTransition { allowed, .. } => (None, allowed.clone()),
            _ => (None, Vec::new()),
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: kind.to_string(),
            field,
            allowed,
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
