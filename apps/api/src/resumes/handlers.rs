//! Axum route handlers for the Resumes API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::draft::model::SavePayload;
use crate::errors::AppError;
use crate::resumes::store::{delete_resume, get_resume, list_resumes, save_resume, ResumeDetail};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeDetail>,
    pub total_count: usize,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let resumes = list_resumes(&state.db, &params.user_id).await?;
    let total_count = resumes.len();
    Ok(Json(ResumeListResponse {
        resumes,
        total_count,
    }))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ResumeDetail>, AppError> {
    let detail = get_resume(&state.db, &params.user_id, resume_id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct SaveResumeRequest {
    pub user_id: String,
    pub resume_id: Option<Uuid>,
    pub payload: SavePayload,
}

#[derive(Debug, Serialize)]
pub struct SaveResumeResponse {
    pub resume_id: Uuid,
}

/// PUT /api/v1/resumes
///
/// The save operation: persists a draft payload (creating the resume when no
/// identifier is supplied) and returns the persisted identifier. This is the
/// same operation the editor-session auto-saver drives.
pub async fn handle_save_resume(
    State(state): State<AppState>,
    Json(request): Json<SaveResumeRequest>,
) -> Result<Json<SaveResumeResponse>, AppError> {
    let resume_id = save_resume(
        &state.db,
        &state.s3,
        &state.config,
        &request.user_id,
        request.resume_id,
        request.payload,
    )
    .await?;
    Ok(Json(SaveResumeResponse { resume_id }))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    delete_resume(&state.db, &state.s3, &state.config, &params.user_id, resume_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
