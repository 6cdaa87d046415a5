//! Webhook routes: the ingress gate in front of the billing core.
//!
//! Inbound provider messages are resolved to a tenant, gated by status
//! and wallet balance (the kill switch), logged, and forwarded to the
//! external AI workflow. The workflow calls back after sending the reply
//! so the outbound message can be logged and billed.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use botmeter_core::{ChargePolicy, CoreError, MessageDirection, TenantStatus};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooks/provider/incoming", post(provider_incoming))
        .route("/webhooks/provider/status", post(provider_status))
        .route("/webhooks/workflow/callback", post(workflow_callback))
        .route("/health", get(health))
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

/// Translates core errors into HTTP responses: business outcomes become
/// 4xx, infrastructure failures fail closed as 5xx.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::NotFound => StatusCode::NOT_FOUND,
            CoreError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            CoreError::TenantNotActive { .. } => StatusCode::FORBIDDEN,
            CoreError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            CoreError::Configuration(_)
            | CoreError::Store(_)
            | CoreError::Vault(_)
            | CoreError::Corrupt(_) => {
                error!(error = %self.0, "request failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        (status, self.0.to_string()).into_response()
    }
}

// =============================================================================
// Provider webhooks
// =============================================================================

/// Provider webhook body (form-encoded, provider field casing).
#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "Body")]
    body: String,
    #[serde(rename = "MessageSid")]
    message_sid: Option<String>,
}

/// Payload forwarded to the external AI workflow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowPayload {
    tenant_id: Uuid,
    business_name: String,
    from_phone: String,
    to_phone: String,
    message: String,
    message_sid: Option<String>,
    system_prompt: String,
    ai_model: String,
    provider_sid: Option<String>,
    provider_token: Option<String>,
    callback_url: String,
}

const SUSPENDED_REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Message>Service suspended. Please top up your balance to continue.</Message>
</Response>"#;

async fn provider_incoming(
    State(state): State<Arc<AppState>>,
    Form(msg): Form<IncomingMessage>,
) -> Result<Response, ApiError> {
    info!(from = %msg.from, to = %msg.to, "incoming provider message");

    // 1. Route the destination channel to a tenant.
    let tenant = state.resolver.resolve_by_channel(&msg.to).await?;

    // 2. Banned tenants get no service at all.
    if tenant.status == TenantStatus::Banned {
        warn!(tenant_id = %tenant.tenant_id, "banned tenant addressed");
        return Ok((StatusCode::FORBIDDEN, "Service unavailable").into_response());
    }

    // 3. The kill switch: paused or underfunded tenants get a canned
    //    suspension reply instead of the bot.
    let per_message = state.ledger.config().cost_per_message;
    let has_balance = state
        .ledger
        .has_sufficient_balance(tenant.tenant_id, per_message)
        .await?;

    if !has_balance || tenant.status == TenantStatus::Paused {
        info!(tenant_id = %tenant.tenant_id, "kill switch engaged");
        return Ok((
            [(header::CONTENT_TYPE, "text/xml")],
            SUSPENDED_REPLY,
        )
            .into_response());
    }

    // 4. Log the inbound message (not billed; the outbound reply is).
    state
        .recorder
        .log_message(
            tenant.tenant_id,
            MessageDirection::Inbound,
            &msg.body,
            Some(&msg.from),
            Some(&msg.to),
            msg.message_sid.as_deref(),
            ChargePolicy::for_direction(MessageDirection::Inbound),
        )
        .await?;

    // 5. Fire-and-forget forward to the AI workflow; the reply arrives
    //    via the callback route.
    let payload = WorkflowPayload {
        tenant_id: tenant.tenant_id,
        business_name: tenant.business_name,
        from_phone: msg.from,
        to_phone: msg.to,
        message: msg.body,
        message_sid: msg.message_sid,
        system_prompt: tenant
            .system_prompt
            .unwrap_or_else(|| "You are a helpful assistant.".to_string()),
        ai_model: tenant.ai_model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        provider_sid: tenant.provider_sid,
        provider_token: tenant.provider_token,
        callback_url: format!("{}/webhooks/workflow/callback", state.public_url),
    };

    let http = state.http.clone();
    let workflow_url = state.workflow_url.clone();
    tokio::spawn(async move {
        if let Err(e) = http.post(&workflow_url).json(&payload).send().await {
            error!(error = %e, "failed to forward message to workflow");
        }
    });

    Ok((StatusCode::OK, "OK").into_response())
}

#[derive(Debug, Deserialize)]
struct DeliveryStatus {
    #[serde(rename = "MessageSid")]
    message_sid: Option<String>,
    #[serde(rename = "MessageStatus")]
    message_status: Option<String>,
}

async fn provider_status(Form(status): Form<DeliveryStatus>) -> StatusCode {
    info!(
        message_sid = status.message_sid.as_deref().unwrap_or("-"),
        status = status.message_status.as_deref().unwrap_or("-"),
        "delivery status update"
    );
    StatusCode::OK
}

// =============================================================================
// Workflow callback
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowCallback {
    tenant_id: Uuid,
    success: bool,
    response_message: Option<String>,
    message_sid: Option<String>,
    from_phone: Option<String>,
    to_phone: Option<String>,
    error: Option<String>,
}

async fn workflow_callback(
    State(state): State<Arc<AppState>>,
    Json(cb): Json<WorkflowCallback>,
) -> Result<Response, ApiError> {
    if !cb.success {
        error!(
            tenant_id = %cb.tenant_id,
            error = cb.error.as_deref().unwrap_or("unknown"),
            "workflow reported failure"
        );
        return Ok((StatusCode::OK, "Error logged").into_response());
    }

    // The outbound reply is the billed leg of the exchange.
    state
        .recorder
        .log_message(
            cb.tenant_id,
            MessageDirection::Outbound,
            cb.response_message.as_deref().unwrap_or("AI response sent"),
            cb.to_phone.as_deref(),
            cb.from_phone.as_deref(),
            cb.message_sid.as_deref(),
            ChargePolicy::for_direction(MessageDirection::Outbound),
        )
        .await?;

    info!(tenant_id = %cb.tenant_id, "outbound reply logged and billed");
    Ok((StatusCode::OK, "Logged").into_response())
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.db.health_check().await {
        Ok(status) if status.healthy => Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "services": { "postgres": status.postgres, "redis": status.redis },
        }))
        .into_response(),
        Ok(status) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "services": { "postgres": status.postgres, "redis": status.redis },
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
