//! Stripe REST client and webhook signature verification.
//!
//! Sessions (checkout, billing portal) are created against Stripe's
//! form-encoded REST API; the webhook handler verifies the
//! `Stripe-Signature` header (HMAC-SHA256 over `timestamp.payload`) before
//! trusting an event.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";
/// Reject webhook timestamps further than this from now (replay protection).
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("missing field in Stripe response: {0}")]
    MissingField(&'static str),

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("webhook payload parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

pub struct CheckoutSessionParams<'a> {
    pub price_id: &'a str,
    pub user_id: &'a str,
    /// Reuse an existing Stripe customer when one is on record.
    pub customer_id: Option<&'a str>,
    /// Fallback when no customer exists yet.
    pub customer_email: Option<&'a str>,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub tos_url: &'a str,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            secret_key,
        }
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, StripeError> {
        let response = self
            .client
            .post(format!("{STRIPE_API_URL}{path}"))
            .bearer_auth(&self.secret_key)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Creates a subscription checkout session and returns its hosted URL.
    /// The user id is attached as metadata on both the session and the
    /// resulting subscription so webhook events can be traced back.
    pub async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams<'_>,
    ) -> Result<String, StripeError> {
        let mut form: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", params.price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("success_url", params.success_url.to_string()),
            ("cancel_url", params.cancel_url.to_string()),
            ("metadata[userId]", params.user_id.to_string()),
            (
                "subscription_data[metadata][userId]",
                params.user_id.to_string(),
            ),
            ("consent_collection[terms_of_service]", "required".to_string()),
            (
                "custom_text[terms_of_service_acceptance][message]",
                format!(
                    "By subscribing, you agree to our [Terms of Service]({})",
                    params.tos_url
                ),
            ),
        ];
        if let Some(customer_id) = params.customer_id {
            form.push(("customer", customer_id.to_string()));
        } else if let Some(email) = params.customer_email {
            form.push(("customer_email", email.to_string()));
        }

        let session = self.post_form("/checkout/sessions", &form).await?;
        session
            .get("url")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or(StripeError::MissingField("url"))
    }

    /// Creates a billing portal session for an existing customer.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, StripeError> {
        let form = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];
        let session = self.post_form("/billing_portal/sessions", &form).await?;
        session
            .get("url")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or(StripeError::MissingField("url"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Webhook verification and event shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// The slice of a Stripe subscription object the webhook mirrors.
#[derive(Debug, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    #[serde(default)]
    pub metadata: SubscriptionMetadata,
    pub items: SubscriptionItems,
    pub current_period_end: i64,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionMetadata {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItems {
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItem {
    pub price: SubscriptionPrice,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionPrice {
    pub id: String,
}

impl SubscriptionObject {
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix>,v1=<hex hmac>[,v1=...]`; the signed payload
/// is `<t>.<body>`. Signatures are compared in constant time and timestamps
/// outside the tolerance window are rejected.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
    now_unix: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
    if candidates.is_empty() {
        return Err(StripeError::InvalidSignature);
    }
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| StripeError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex_encode(&mac.finalize().into_bytes());

    if candidates
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
    {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex_encode(&mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = br#"{"type":"customer.subscription.updated"}"#;
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(payload, now));
        assert!(verify_webhook_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let payload = br#"{"type":"customer.subscription.updated"}"#;
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(payload, now));
        let tampered = br#"{"type":"customer.subscription.deleted"}"#;
        assert!(matches!(
            verify_webhook_signature(tampered, &header, SECRET, now),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let payload = b"{}";
        let signed_at = 1_700_000_000;
        let header = format!("t={signed_at},v1={}", sign(payload, signed_at));
        let now = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(verify_webhook_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn test_header_without_v1_fails() {
        assert!(verify_webhook_signature(b"{}", "t=1700000000", SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn test_any_matching_v1_candidate_passes() {
        // Stripe sends multiple v1 entries during secret rotation.
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = format!("t={now},v1=deadbeef,v1={}", sign(payload, now));
        assert!(verify_webhook_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn test_subscription_object_parses_from_event_json() {
        let json = r#"{
            "id": "sub_123",
            "customer": "cus_456",
            "metadata": {"userId": "user_789"},
            "items": {"data": [{"price": {"id": "price_premium"}}]},
            "current_period_end": 1735689600,
            "cancel_at_period_end": false
        }"#;
        let object: SubscriptionObject = serde_json::from_str(json).unwrap();
        assert_eq!(object.id, "sub_123");
        assert_eq!(object.customer, "cus_456");
        assert_eq!(object.metadata.user_id.as_deref(), Some("user_789"));
        assert_eq!(object.price_id(), Some("price_premium"));
    }

    #[test]
    fn test_subscription_object_tolerates_missing_metadata() {
        let json = r#"{
            "id": "sub_123",
            "customer": "cus_456",
            "items": {"data": []},
            "current_period_end": 1735689600
        }"#;
        let object: SubscriptionObject = serde_json::from_str(json).unwrap();
        assert!(object.metadata.user_id.is_none());
        assert!(object.price_id().is_none());
    }
}
