pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::ai::handlers as ai_handlers;
use crate::billing::handlers as billing_handlers;
use crate::editor::handlers as editor_handlers;
use crate::resumes::handlers as resume_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resumes API
        .route(
            "/api/v1/resumes",
            get(resume_handlers::handle_list_resumes).put(resume_handlers::handle_save_resume),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resume_handlers::handle_get_resume).delete(resume_handlers::handle_delete_resume),
        )
        // Editor sessions (draft auto-save)
        .route(
            "/api/v1/editor/sessions",
            post(editor_handlers::handle_open_session),
        )
        .route(
            "/api/v1/editor/sessions/:id",
            get(editor_handlers::handle_session_status)
                .delete(editor_handlers::handle_close_session),
        )
        .route(
            "/api/v1/editor/sessions/:id/draft",
            put(editor_handlers::handle_update_draft),
        )
        .route(
            "/api/v1/editor/sessions/:id/reorder",
            post(editor_handlers::handle_reorder),
        )
        .route(
            "/api/v1/editor/sessions/:id/retry",
            post(editor_handlers::handle_retry),
        )
        // AI drafting
        .route("/api/v1/ai/summary", post(ai_handlers::handle_generate_summary))
        .route(
            "/api/v1/ai/work-experience",
            post(ai_handlers::handle_generate_work_experience),
        )
        .route("/api/v1/ai/project", post(ai_handlers::handle_generate_project))
        // Billing
        .route(
            "/api/v1/billing/checkout-session",
            post(billing_handlers::handle_create_checkout_session),
        )
        .route(
            "/api/v1/billing/portal-session",
            post(billing_handlers::handle_create_portal_session),
        )
        .route(
            "/api/v1/billing/webhook",
            post(billing_handlers::handle_webhook),
        )
        .with_state(state)
}
