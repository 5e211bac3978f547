//! Axum route handlers for the AI drafting endpoints. Every endpoint is
//! gated on the caller's subscription level.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::ai::generate::{
    generate_project, generate_summary, generate_work_experience, ProjectInput, SummaryInput,
    WorkExperienceInput,
};
use crate::billing::permissions::can_use_ai_tools;
use crate::billing::subscription::get_user_subscription_level;
use crate::draft::model::{ProjectDraft, WorkExperienceDraft};
use crate::errors::AppError;
use crate::state::AppState;

const UPGRADE_MESSAGE: &str =
    "This feature is only available for premium or premium+ users. Please upgrade to use it.";

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub input: SummaryInput,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// POST /api/v1/ai/summary
pub async fn handle_generate_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    require_ai_access(&state, &request.user_id).await?;
    let summary = generate_summary(&state.llm, &request.input).await?;
    Ok(Json(SummaryResponse { summary }))
}

#[derive(Debug, Deserialize)]
pub struct WorkExperienceRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub input: WorkExperienceInput,
}

/// POST /api/v1/ai/work-experience
pub async fn handle_generate_work_experience(
    State(state): State<AppState>,
    Json(request): Json<WorkExperienceRequest>,
) -> Result<Json<WorkExperienceDraft>, AppError> {
    require_ai_access(&state, &request.user_id).await?;
    let entry = generate_work_experience(&state.llm, &request.input).await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub input: ProjectInput,
}

/// POST /api/v1/ai/project
pub async fn handle_generate_project(
    State(state): State<AppState>,
    Json(request): Json<ProjectRequest>,
) -> Result<Json<ProjectDraft>, AppError> {
    require_ai_access(&state, &request.user_id).await?;
    let entry = generate_project(&state.llm, &request.input).await?;
    Ok(Json(entry))
}

async fn require_ai_access(state: &AppState, user_id: &str) -> Result<(), AppError> {
    let level = get_user_subscription_level(
        &state.db,
        &state.config.stripe_price_id_premium,
        &state.config.stripe_price_id_premium_plus,
        user_id,
    )
    .await?;
    if !can_use_ai_tools(level) {
        return Err(AppError::Forbidden(UPGRADE_MESSAGE.to_string()));
    }
    Ok(())
}
