//! Axum route handlers for billing: checkout sessions, billing portal
//! sessions, and the Stripe webhook.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::billing::stripe::{
    verify_webhook_signature, CheckoutSessionParams, StripeError, SubscriptionObject, WebhookEvent,
};
use crate::errors::AppError;
use crate::models::subscription::UserSubscriptionRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionRequest {
    pub user_id: String,
    pub email: Option<String>,
    pub price_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUrlResponse {
    pub url: String,
}

/// POST /api/v1/billing/checkout-session
///
/// Creates a Stripe subscription checkout session for one of the configured
/// prices and returns the hosted URL.
pub async fn handle_create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CheckoutSessionRequest>,
) -> Result<Json<SessionUrlResponse>, AppError> {
    let config = &state.config;
    if request.price_id != config.stripe_price_id_premium
        && request.price_id != config.stripe_price_id_premium_plus
    {
        return Err(AppError::Validation("Unknown price id".to_string()));
    }

    let existing: Option<UserSubscriptionRow> =
        sqlx::query_as("SELECT * FROM user_subscriptions WHERE user_id = $1")
            .bind(&request.user_id)
            .fetch_optional(&state.db)
            .await?;

    let success_url = format!("{}/billing/success", config.base_url);
    let cancel_url = format!("{}/billing/cancel", config.base_url);
    let tos_url = format!("{}/tos", config.base_url);

    let url = state
        .stripe
        .create_checkout_session(CheckoutSessionParams {
            price_id: &request.price_id,
            user_id: &request.user_id,
            customer_id: existing.as_ref().map(|row| row.stripe_customer_id.as_str()),
            customer_email: request.email.as_deref(),
            success_url: &success_url,
            cancel_url: &cancel_url,
            tos_url: &tos_url,
        })
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    Ok(Json(SessionUrlResponse { url }))
}

#[derive(Debug, Deserialize)]
pub struct PortalSessionRequest {
    pub user_id: String,
}

/// POST /api/v1/billing/portal-session
///
/// Creates a billing portal session for the user's Stripe customer.
pub async fn handle_create_portal_session(
    State(state): State<AppState>,
    Json(request): Json<PortalSessionRequest>,
) -> Result<Json<SessionUrlResponse>, AppError> {
    let existing: Option<UserSubscriptionRow> =
        sqlx::query_as("SELECT * FROM user_subscriptions WHERE user_id = $1")
            .bind(&request.user_id)
            .fetch_optional(&state.db)
            .await?;

    let row = existing.ok_or_else(|| {
        AppError::Validation("No billing customer on record for this user".to_string())
    })?;

    let return_url = format!("{}/billing", state.config.base_url);
    let url = state
        .stripe
        .create_portal_session(&row.stripe_customer_id, &return_url)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    Ok(Json(SessionUrlResponse { url }))
}

/// POST /api/v1/billing/webhook
///
/// Verifies the Stripe signature, then mirrors subscription lifecycle events
/// into `user_subscriptions`. Unhandled event types are acknowledged.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    verify_webhook_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| match e {
        StripeError::InvalidSignature => AppError::Unauthorized,
        other => AppError::Payment(other.to_string()),
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {e}")))?;

    match event.event_type.as_str() {
        "customer.subscription.created" | "customer.subscription.updated" => {
            let object: SubscriptionObject = serde_json::from_value(event.data.object)
                .map_err(|e| AppError::Validation(format!("Malformed subscription object: {e}")))?;
            upsert_subscription(&state, &object).await?;
        }
        "customer.subscription.deleted" => {
            let object: SubscriptionObject = serde_json::from_value(event.data.object)
                .map_err(|e| AppError::Validation(format!("Malformed subscription object: {e}")))?;
            sqlx::query("DELETE FROM user_subscriptions WHERE stripe_subscription_id = $1")
                .bind(&object.id)
                .execute(&state.db)
                .await?;
            info!("Removed subscription {} (deleted at Stripe)", object.id);
        }
        other => {
            debug!("Ignoring webhook event type {other}");
        }
    }

    Ok(Json(json!({ "received": true })))
}

async fn upsert_subscription(
    state: &AppState,
    object: &SubscriptionObject,
) -> Result<(), AppError> {
    let Some(user_id) = object.metadata.user_id.as_deref() else {
        // Not one of ours (no userId metadata) — acknowledge and move on so
        // Stripe does not retry forever.
        warn!("Subscription {} carries no userId metadata; skipped", object.id);
        return Ok(());
    };
    let Some(price_id) = object.price_id() else {
        warn!("Subscription {} carries no price; skipped", object.id);
        return Ok(());
    };
    let period_end: DateTime<Utc> = DateTime::from_timestamp(object.current_period_end, 0)
        .ok_or_else(|| {
            AppError::Validation("Subscription period end is not a valid timestamp".to_string())
        })?;

    sqlx::query(
        r#"
        INSERT INTO user_subscriptions
            (user_id, stripe_customer_id, stripe_subscription_id, stripe_price_id,
             stripe_current_period_end, stripe_cancel_at_period_end, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            stripe_customer_id = EXCLUDED.stripe_customer_id,
            stripe_subscription_id = EXCLUDED.stripe_subscription_id,
            stripe_price_id = EXCLUDED.stripe_price_id,
            stripe_current_period_end = EXCLUDED.stripe_current_period_end,
            stripe_cancel_at_period_end = EXCLUDED.stripe_cancel_at_period_end,
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(&object.customer)
    .bind(&object.id)
    .bind(price_id)
    .bind(period_end)
    .bind(object.cancel_at_period_end)
    .execute(&state.db)
    .await?;

    info!(
        "Mirrored subscription {} for user {} (price {})",
        object.id, user_id, price_id
    );
    Ok(())
}
