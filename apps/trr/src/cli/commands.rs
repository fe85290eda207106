//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{CreateArgs, UpdateArgs};
use crate::api::{self, AppState, MetricsViewRequest};
use crate::assist::{self, AssistClient};
use crate::config::{AppConfig, StorageKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use trr_core::{
    ApprovalRequest, NewTrr, RiskAssessment, RiskInputs, SdwProgress, SdwStatus, StorageBackend,
    TransitionRequest, Trr, TrrEngine, TrrError, TrrFilter, TrrId, TrrPatch, compute_metrics_view,
    derive_stage, score_risk,
};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size for JSON input files (10 MB).
const MAX_INPUT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Validate file path and size before reading.
///
/// The path is canonicalized (resolving ".." and symlinks) and must be a
/// regular file.
fn validate_input_file(path: &Path) -> Result<PathBuf, TrrError> {
    let canonical = path.canonicalize().map_err(|e| {
        TrrError::Storage(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(TrrError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| TrrError::Storage(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(TrrError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }
    Ok(canonical)
}

/// Read a JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TrrError> {
    let canonical = validate_input_file(path)?;
    let data = std::fs::read(&canonical)
        .map_err(|e| TrrError::Storage(format!("Read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&data)
        .map_err(|e| TrrError::Serialization(format!("Parse {}: {}", path.display(), e)))
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Print `value` as pretty JSON, or through `human` otherwise.
fn emit<T: Serialize>(json_mode: bool, value: &T, human: impl FnOnce(&T)) -> Result<(), TrrError> {
    if json_mode {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| TrrError::Serialization(e.to_string()))?;
        println!("{}", text);
    } else {
        human(value);
    }
    Ok(())
}

fn print_trr(trr: &Trr) {
    println!("{}  {}", trr.id, trr.title);
    println!("=====================================");
    println!("Status:    {} (version {})", trr.status(), trr.version());
    if trr.is_archived() {
        println!("Archived:  yes");
    }
    println!("Priority:  {}", trr.priority);
    println!("Risk:      {}", trr.risk_level);
    println!("Category:  {}", display_opt(trr.category.map(|c| c.to_string())));
    println!("Assignee:  {}", display_opt(trr.assignee.clone()));
    println!("Customer:  {}", display_opt(trr.customer.clone()));
    if !trr.description.is_empty() {
        println!();
        println!("{}", trr.description);
    }
    if !trr.acceptance_criteria.is_empty() {
        println!();
        println!("Acceptance criteria:");
        for criterion in &trr.acceptance_criteria {
            println!("  - {}", criterion);
        }
    }
    println!();
    print_dor(trr.dor_status());
    println!(
        "SDW:       {} ({}% overall)",
        trr.sdw_status().current_stage,
        trr.sdw_status().overall_progress()
    );
}

fn print_dor(dor: &trr_core::DorStatus) {
    let state = if dor.is_ready { "ready" } else { "not ready" };
    println!("DOR:       {}% ({})", dor.score, state);
    for unmet in &dor.unmet_criteria {
        println!("  - {}", unmet);
    }
}

fn print_sdw(progress: &SdwProgress) {
    println!("SDW Progress");
    println!("============");
    println!("Current stage:  {}", progress.current);
    println!(
        "Next stage:     {}",
        display_opt(progress.next.map(|s| s.to_string()))
    );
    println!("Overall:        {}%", progress.overall_percent);
    println!(
        "Next approver:  {}",
        display_opt(progress.next_approver.map(|r| r.to_string()))
    );
    if !progress.rejections.is_empty() {
        let names: Vec<String> = progress.rejections.iter().map(|r| r.to_string()).collect();
        println!("Rejected by:    {}", names.join(", "));
    }
    println!();
    for stage in &progress.stages {
        let (min_days, max_days) = stage.estimated_days;
        println!(
            "  {:<16} {:>3}%  ({}/{})  {}-{} days",
            stage.stage.as_str(),
            stage.percent,
            stage.approved,
            stage.required,
            min_days,
            max_days
        );
    }
}

fn print_sdw_status(sdw: &SdwStatus) {
    print_sdw(&sdw.progress());
}

fn print_risk(assessment: &RiskAssessment) {
    println!("Risk:      {} (score {})", assessment.level, assessment.score);
    if !assessment.reasons.is_empty() {
        println!("Reasons:   {}", assessment.rationale());
    }
}

fn display_opt(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

// =============================================================================
// ENGINE
// =============================================================================

/// Open the engine over the configured storage.
pub fn open_engine(config: &AppConfig) -> Result<TrrEngine<StorageBackend>, TrrError> {
    Ok(TrrEngine::new(config.storage.open()?))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), TrrError> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let engine = open_engine(&config)?;
    let assist = AssistClient::from_config(&config.assist);

    println!("TRR Workflow Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", config.storage.backend.as_str());
    if config.storage.backend == StorageKind::Redb {
        println!("  Database: {:?}", config.storage.path);
    }
    match &assist {
        Some(client) => println!(
            "  Assist:   {} (timeout {} ms)",
            client.endpoint(),
            client.timeout().as_millis()
        ),
        None => println!("  Assist:   disabled"),
    }
    println!();
    println!("Endpoints:");
    println!("  GET    /health                - Health check");
    println!("  GET    /trrs                  - List TRRs");
    println!("  POST   /trrs                  - Create a TRR");
    println!("  GET    /trrs/{{id}}             - Show a TRR");
    println!("  PATCH  /trrs/{{id}}             - Update a TRR");
    println!("  DELETE /trrs/{{id}}             - Archive a TRR");
    println!("  POST   /trrs/{{id}}/transition  - Change status");
    println!("  POST   /trrs/{{id}}/approvals   - Record an approval");
    println!("  POST   /trrs/{{id}}/advance     - Advance SDW stage");
    println!("  GET    /trrs/{{id}}/dor         - Readiness");
    println!("  GET    /trrs/{{id}}/sdw         - Approval progress");
    println!("  GET    /trrs/{{id}}/risk        - Risk as of now");
    println!("  GET    /trrs/{{id}}/suggestions/{{field}} - Field suggestion");
    println!("  POST   /validation-stage      - Derive validation stage");
    println!("  POST   /metrics-view          - Playbook metrics");
    println!("  POST   /risk                  - Score risk inputs");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(engine).with_assist(assist);
    api::run_server(&format!("{}:{}", host, port), state).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), TrrError> {
    if config.storage.backend == StorageKind::Memory {
        println!("Memory backend needs no initialization");
        return Ok(());
    }

    let path = &config.storage.path;
    if path.exists() {
        if !force {
            return Err(TrrError::Storage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| TrrError::Storage(format!("Remove existing database: {}", e)))?;
        tracing::warn!(path = %path.display(), "Existing database removed");
    }

    let _engine = open_engine(config)?;
    println!("Initialized new redb database at {:?}", path);
    Ok(())
}

/// Reclaim free space in the database file.
pub fn cmd_compact(config: &AppConfig, json_mode: bool) -> Result<(), TrrError> {
    let compacted = config.storage.open()?.compact()?;
    tracing::info!(event = "storage_compacted", compacted);
    emit(
        json_mode,
        &serde_json::json!({ "compacted": compacted }),
        |_| {
            if compacted {
                println!("Compacted {:?}", config.storage.path);
            } else {
                println!("Nothing to compact");
            }
        },
    )
}

// =============================================================================
// RECORD COMMANDS
// =============================================================================

/// Create a draft TRR.
pub fn cmd_create(config: &AppConfig, json_mode: bool, args: CreateArgs) -> Result<(), TrrError> {
    let mut fields: NewTrr = match &args.file {
        Some(path) => read_json(path)?,
        None => NewTrr::default(),
    };
    if let Some(title) = args.title {
        fields.title = title;
    }
    if let Some(description) = args.description {
        fields.description = description;
    }
    if let Some(priority) = args.priority {
        fields.priority = priority;
    }
    if let Some(complexity) = args.complexity {
        fields.complexity = complexity;
    }
    fields.category = args.category.or(fields.category);
    fields.assignee = args.assignee.or(fields.assignee);
    fields.expected_outcome = args.expected_outcome.or(fields.expected_outcome);
    fields.customer = args.customer.or(fields.customer);
    if !args.criteria.is_empty() {
        fields.acceptance_criteria = args.criteria;
    }
    fields.tags.extend(args.tags);

    let mut engine = open_engine(config)?;
    let trr = engine.create_trr(fields, &args.author)?;
    tracing::info!(event = "trr_created", trr = %trr.id, author = %args.author);
    emit(json_mode, &trr, |t| {
        println!("Created {}", t.id);
        println!();
        print_trr(t);
    })
}

/// List TRRs matching `filter`.
pub fn cmd_list(config: &AppConfig, json_mode: bool, filter: &TrrFilter) -> Result<(), TrrError> {
    let engine = open_engine(config)?;
    let items = engine.list_trrs(filter)?;
    emit(json_mode, &items, |items| {
        if items.is_empty() {
            println!("No TRRs found");
            return;
        }
        println!(
            "{:<8} {:<14} {:<9} {:>4}  {}",
            "ID", "STATUS", "PRIORITY", "DOR", "TITLE"
        );
        for trr in items {
            println!(
                "{:<8} {:<14} {:<9} {:>3}%  {}{}",
                trr.id.to_string(),
                trr.status().as_str(),
                trr.priority.as_str(),
                trr.dor_status().score,
                trr.title,
                if trr.is_archived() { " (archived)" } else { "" }
            );
        }
    })
}

/// Show one TRR.
pub fn cmd_show(config: &AppConfig, json_mode: bool, id: u64) -> Result<(), TrrError> {
    let trr = open_engine(config)?.get_trr(TrrId(id))?;
    emit(json_mode, &trr, |t| {
        print_trr(t);
        println!();
        println!("History:");
        for event in t.status_history() {
            let note = event.note.as_deref().unwrap_or("");
            println!(
                "  {:>15}  {:<14} {}  {}",
                event.timestamp.as_millis(),
                event.status.as_str(),
                event.author_id,
                note
            );
        }
    })
}

/// Update descriptive fields.
pub fn cmd_update(config: &AppConfig, json_mode: bool, args: UpdateArgs) -> Result<(), TrrError> {
    let mut patch: TrrPatch = match &args.file {
        Some(path) => read_json(path)?,
        None => TrrPatch::default(),
    };
    patch.title = args.title.or(patch.title);
    patch.description = args.description.or(patch.description);
    patch.assignee = args.assignee.or(patch.assignee);
    patch.expected_outcome = args.expected_outcome.or(patch.expected_outcome);
    patch.priority = args.priority.or(patch.priority);
    patch.category = args.category.or(patch.category);
    patch.complexity = args.complexity.or(patch.complexity);
    if !args.criteria.is_empty() {
        patch.acceptance_criteria = Some(args.criteria);
    }

    let mut engine = open_engine(config)?;
    let trr = engine.update_trr(TrrId(args.id), patch, args.expected_version)?;
    tracing::info!(event = "trr_updated", trr = %trr.id, version = trr.version());
    emit(json_mode, &trr, print_trr)
}

/// Archive a TRR.
pub fn cmd_delete(
    config: &AppConfig,
    json_mode: bool,
    id: u64,
    expected_version: u64,
) -> Result<(), TrrError> {
    let trr = open_engine(config)?.delete_trr(TrrId(id), expected_version)?;
    tracing::info!(event = "trr_archived", trr = %trr.id);
    emit(json_mode, &trr, |t| {
        println!("Archived {} (version {})", t.id, t.version());
    })
}

// =============================================================================
// LIFECYCLE COMMANDS
// =============================================================================

pub fn cmd_transition(
    config: &AppConfig,
    json_mode: bool,
    id: u64,
    request: TransitionRequest,
) -> Result<(), TrrError> {
    let trr = open_engine(config)?.transition(TrrId(id), request)?;
    tracing::info!(event = "trr_transitioned", trr = %trr.id, to = %trr.status());
    emit(json_mode, &trr, |t| {
        println!("{} is now {} (version {})", t.id, t.status(), t.version());
        let allowed: Vec<&str> = t.status().allowed_next().iter().map(|s| s.as_str()).collect();
        if allowed.is_empty() {
            println!("No further transitions");
        } else {
            println!("Next:  {}", allowed.join(", "));
        }
    })
}

pub fn cmd_approve(
    config: &AppConfig,
    json_mode: bool,
    id: u64,
    request: ApprovalRequest,
) -> Result<(), TrrError> {
    let (role, decision) = (request.role, request.decision);
    let sdw = open_engine(config)?.set_approval(TrrId(id), request)?;
    tracing::info!(
        event = "approval_recorded",
        trr = %TrrId(id),
        role = %role,
        decision = ?decision
    );
    emit(json_mode, &sdw, print_sdw_status)
}

pub fn cmd_advance(
    config: &AppConfig,
    json_mode: bool,
    id: u64,
    expected_version: u64,
) -> Result<(), TrrError> {
    let sdw = open_engine(config)?.advance_stage(TrrId(id), expected_version)?;
    tracing::info!(event = "stage_advanced", trr = %TrrId(id), stage = %sdw.current_stage);
    emit(json_mode, &sdw, print_sdw_status)
}

// =============================================================================
// READINESS & PROGRESS COMMANDS
// =============================================================================

pub async fn cmd_dor(
    config: &AppConfig,
    json_mode: bool,
    id: u64,
    assisted: bool,
) -> Result<(), TrrError> {
    let trr = open_engine(config)?.get_trr(TrrId(id))?;
    let client = if assisted {
        let client = AssistClient::from_config(&config.assist);
        if client.is_none() {
            tracing::warn!("--assisted given but no [assist] endpoint is configured");
        }
        client
    } else {
        None
    };

    let report = assist::assisted_dor(client.as_ref(), &trr).await;
    emit(json_mode, &report, |r| {
        print_dor(&r.status);
        if let Some(opinion) = &r.augmented {
            println!();
            println!("Assist opinion ({}):", opinion.source);
            if let Some(completeness) = opinion.completeness {
                println!("  Completeness: {}%", completeness);
            }
            for missing in &opinion.missing {
                println!("  - {}", missing);
            }
            if !opinion.rationale.is_empty() {
                println!("  {}", opinion.rationale);
            }
        }
    })
}

pub fn cmd_sdw(config: &AppConfig, json_mode: bool, id: u64) -> Result<(), TrrError> {
    let progress = open_engine(config)?.sdw_progress(TrrId(id))?;
    emit(json_mode, &progress, print_sdw)
}

// =============================================================================
// VIEW COMMANDS
// =============================================================================

pub fn cmd_derive_stage(json_mode: bool, phase: &str, status: &str) -> Result<(), TrrError> {
    let stage = derive_stage(phase, status);
    emit(json_mode, &api::ValidationStageResponse::from(stage), |r| {
        println!("{}", r.stage);
        println!("{}", r.description);
        println!("Duration: {}", r.duration);
        println!();
        println!("Exit criteria:");
        for criterion in &r.exit_criteria {
            println!("  - {}", criterion);
        }
    })
}

pub fn cmd_metrics(json_mode: bool, file: &Path) -> Result<(), TrrError> {
    let request: MetricsViewRequest = read_json(file)?;
    let view = compute_metrics_view(&request.framework, &request.scenarios);
    if view.is_empty() && !json_mode {
        println!("No metric sources present");
        return Ok(());
    }
    // The view is always printed as JSON: it is a keyed document.
    let text = serde_json::to_string_pretty(&view)
        .map_err(|e| TrrError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

pub fn cmd_risk(
    config: &AppConfig,
    json_mode: bool,
    id: Option<u64>,
    inputs: RiskInputs,
) -> Result<(), TrrError> {
    let assessment = match id {
        Some(id) => open_engine(config)?.assess_risk(TrrId(id))?,
        None => score_risk(&inputs),
    };
    emit(json_mode, &assessment, print_risk)
}

// =============================================================================
// TESTS
// =============================================================================
