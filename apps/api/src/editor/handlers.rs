//! Axum route handlers for editing sessions.
//!
//! Opening a session loads the draft (database for an existing resume,
//! draft cache for recovered unsaved edits, empty otherwise) and spawns the
//! auto-save driver. Every edit is a full-draft PUT; status exposes the
//! saving flag, the unsaved-changes boolean, and the failure/retry surface.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::draft::autosave::{self, AutoSaveOptions};
use crate::draft::cache::draft_cache_key;
use crate::draft::model::{Photo, ResumeDraft};
use crate::draft::reorder::move_entry;
use crate::editor::session::{DbSaver, EditorSession, SharedLocation};
use crate::errors::AppError;
use crate::resumes::store::get_resume;
use crate::resumes::validation::validate_photo_upload;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub user_id: String,
    pub resume_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub draft: ResumeDraft,
}

/// POST /api/v1/editor/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<OpenSessionResponse>, AppError> {
    let cache_key = draft_cache_key(&request.user_id, request.resume_id);

    // Persisted state seeds the snapshot; cached unsaved edits (if any) are
    // replayed as an edit so the auto-saver picks them up.
    let persisted = match request.resume_id {
        Some(resume_id) => {
            let detail = get_resume(&state.db, &request.user_id, resume_id).await?;
            ResumeDraft::from_rows(
                &detail.resume,
                &detail.work_experiences,
                &detail.educations,
                &detail.projects,
            )
        }
        None => ResumeDraft::default(),
    };

    let recovered = match state.draft_cache.load(&cache_key).await {
        Ok(cached) => cached,
        Err(err) => {
            warn!("Draft cache load failed for {cache_key}: {err}");
            None
        }
    };

    let (location, location_rx) = SharedLocation::channel(persisted.id);
    let saver = Arc::new(DbSaver::new(
        state.db.clone(),
        state.s3.clone(),
        state.config.clone(),
        request.user_id,
    ));

    let handle = autosave::spawn(
        persisted.clone(),
        saver,
        Some(state.draft_cache.clone()),
        location,
        AutoSaveOptions {
            quiescence: Duration::from_millis(state.config.autosave_debounce_ms),
            cache_key: Some(cache_key),
        },
    );

    let draft = match recovered {
        Some(cached) if cached != persisted => {
            handle.update(cached.clone());
            cached
        }
        _ => persisted,
    };

    let session_id = Uuid::new_v4();
    let resume_id = draft.id;
    let session = EditorSession::new(handle, location_rx);
    state.sessions.write().await.insert(session_id, session);

    info!("Opened editor session {session_id}");
    Ok(Json(OpenSessionResponse {
        session_id,
        resume_id,
        draft,
    }))
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub resume_id: Option<Uuid>,
    pub is_saving: bool,
    /// Live draft vs last persisted snapshot — drives the navigate-away warning.
    pub has_unsaved_changes: bool,
    /// Set while a save failure awaits a retry.
    pub error: Option<String>,
}

/// GET /api/v1/editor/sessions/:id
pub async fn handle_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let sessions = state.sessions.read().await;
    let session = get_session(&sessions, session_id)?;

    let status = session.handle.status();
    Ok(Json(SessionStatusResponse {
        resume_id: session.location_resume_id().or(status.resume_id),
        is_saving: status.is_saving,
        has_unsaved_changes: session.handle.has_unsaved_changes(),
        error: status.error,
    }))
}

/// PUT /api/v1/editor/sessions/:id/draft
///
/// Replaces the session's live draft — the form layer calls this on every
/// edit. Oversized or non-image photo payloads are rejected up front so they
/// never reach the save path.
pub async fn handle_update_draft(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(draft): Json<ResumeDraft>,
) -> Result<StatusCode, AppError> {
    if let Some(Photo::Local {
        content_type,
        size_bytes,
        data,
        ..
    }) = &draft.photo
    {
        validate_photo_upload(content_type, *size_bytes, data.len())?;
    }

    let sessions = state.sessions.read().await;
    let session = get_session(&sessions, session_id)?;
    session.handle.update(draft);
    Ok(StatusCode::NO_CONTENT)
}

/// Which ordered list a reorder targets.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderSection {
    WorkExperiences,
    Educations,
    Projects,
    Skills,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub section: ReorderSection,
    pub from: usize,
    pub to: usize,
}

/// POST /api/v1/editor/sessions/:id/reorder
///
/// Moves one entry of the named list to a new index; counts as an edit.
pub async fn handle_reorder(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ResumeDraft>, AppError> {
    let sessions = state.sessions.read().await;
    let session = get_session(&sessions, session_id)?;

    let mut draft = session.handle.current_draft();
    let result = match request.section {
        ReorderSection::WorkExperiences => {
            move_entry(&mut draft.work_experiences, request.from, request.to)
        }
        ReorderSection::Educations => move_entry(&mut draft.educations, request.from, request.to),
        ReorderSection::Projects => move_entry(&mut draft.projects, request.from, request.to),
        ReorderSection::Skills => move_entry(&mut draft.skills, request.from, request.to),
    };
    result.map_err(|e| AppError::Validation(e.to_string()))?;

    session.handle.update(draft.clone());
    Ok(Json(draft))
}

/// POST /api/v1/editor/sessions/:id/retry
///
/// The user-facing retry affordance after a failed save.
pub async fn handle_retry(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let sessions = state.sessions.read().await;
    let session = get_session(&sessions, session_id)?;
    session.handle.retry();
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/editor/sessions/:id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let session = state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("Editor session {session_id} not found")))?;
    session.handle.shutdown();
    info!("Closed editor session {session_id}");
    Ok(StatusCode::NO_CONTENT)
}

fn get_session(
    sessions: &std::collections::HashMap<Uuid, EditorSession>,
    session_id: Uuid,
) -> Result<&EditorSession, AppError> {
    sessions
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("Editor session {session_id} not found")))
}
