//! WhatsApp webhook subscription and event intake.

use super::types::required;
use super::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, info, warn};
use whatsapp_client::{WebhookEvent, WebhookPayload};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex>` of the raw body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Webhook credentials.
#[derive(Clone, Default)]
pub struct WebhookConfig {
    /// Token the provider must present when subscribing
    pub verify_token: Option<String>,
    /// App secret used to sign deliveries; unset skips the check
    pub app_secret: Option<SecretString>,
}

impl WebhookConfig {
    pub fn new(verify_token: Option<String>, app_secret: Option<String>) -> Self {
        Self {
            verify_token: verify_token.filter(|t| !t.is_empty()),
            app_secret: app_secret.filter(|s| !s.is_empty()).map(SecretString::new),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Subscription handshake: echo the challenge when the token matches.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let (Some(mode), Some(token)) = (required(&query.mode), required(&query.verify_token)) else {
        return (StatusCode::BAD_REQUEST, "Bad Request: Missing parameters").into_response();
    };

    let expected = state.webhook.verify_token.as_deref();
    if mode == "subscribe" && expected == Some(token) {
        info!("Webhook verified");
        return (StatusCode::OK, query.challenge.unwrap_or_default()).into_response();
    }

    warn!(%mode, "Webhook verification rejected");
    (StatusCode::FORBIDDEN, "Forbidden: Invalid verification token").into_response()
}

/// Event delivery. Acknowledged whenever the body names an `object`.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.webhook.app_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());

        if !signature.is_some_and(|s| verify_signature(secret.expose_secret(), &body, s)) {
            warn!("Webhook signature mismatch");
            return (StatusCode::FORBIDDEN, "Forbidden: Invalid signature").into_response();
        }
    }

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Webhook body is not JSON: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad Request: Invalid JSON").into_response();
        }
    };

    if raw.get("object").map_or(true, |o| o.is_null()) {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    match serde_json::from_value::<WebhookPayload>(raw) {
        Ok(payload) => log_event(payload.first_event()),
        Err(e) => debug!("Unrecognized webhook shape: {}", e),
    }

    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}

fn log_event(event: WebhookEvent) {
    match event {
        WebhookEvent::Message {
            phone_number_id,
            from,
            body,
        } => {
            info!(%from, ?phone_number_id, body = body.as_deref().unwrap_or(""), "Incoming message");
        }
        WebhookEvent::Status { id, status } => match status.as_str() {
            "failed" => warn!(message_id = %id, "Message failed"),
            _ => info!(message_id = %id, %status, "Message status update"),
        },
        WebhookEvent::Other => debug!("Webhook event ignored"),
    }
}

/// Check `sha256=<hex>` against HMAC-SHA256 of `body` in constant time.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// `sha256=<hex>` header value for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}
