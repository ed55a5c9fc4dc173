//! Template registry endpoints.

use super::types::{
    GroupedTemplates, ProviderTemplatesResponse, SuccessResponse, TemplateResponse,
    TemplatesByTypeResponse, TemplatesResponse,
};
use super::extract::ApiJson;
use super::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Path, State},
    Json,
};
use member_store::{TemplateType, TemplateUpdate};
use serde_json::Value;
use tracing::{debug, info};

/// All templates, grouped by type and keyed by id.
pub async fn list_templates(State(state): State<AppState>) -> Json<TemplatesResponse> {
    let all = state.templates.get_all().await;

    let mut grouped = GroupedTemplates::default();
    for template in all.values() {
        let bucket = match template.kind {
            TemplateType::Approval => &mut grouped.approval,
            TemplateType::Otp => &mut grouped.otp,
            TemplateType::Registration => &mut grouped.registration,
            TemplateType::Custom => &mut grouped.custom,
        };
        bucket.push(template.clone());
    }

    debug!("Retrieved {} templates", all.len());

    Json(TemplatesResponse {
        success: true,
        templates: grouped,
        all,
    })
}

pub async fn templates_by_type(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Json<TemplatesByTypeResponse> {
    let templates = state.templates.get_by_type(&kind).await;

    Json(TemplatesByTypeResponse {
        success: true,
        kind,
        templates,
    })
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state.templates.get_by_id(&id).await?;

    Ok(Json(TemplateResponse {
        success: true,
        template,
    }))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<TemplateUpdate>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state.templates.update(&id, update).await?;
    info!(template = %id, "Template updated");

    Ok(Json(TemplateResponse {
        success: true,
        template,
    }))
}

/// Always 403: the template set is fixed.
pub async fn create_template(
    State(state): State<AppState>,
    body: Option<ApiJson<Value>>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let payload = body.map(|ApiJson(v)| v).unwrap_or(Value::Null);
    let template = state.templates.create(&payload).await?;

    Ok(Json(TemplateResponse {
        success: true,
        template,
    }))
}

/// Always 403: system templates cannot be removed.
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.templates.delete(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Always 403: system templates are always at their defaults.
pub async fn reset_templates(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.templates.reset_to_defaults().await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Templates registered on the WhatsApp business account.
pub async fn provider_templates(
    State(state): State<AppState>,
) -> Result<Json<ProviderTemplatesResponse>, ApiError> {
    let list = state.notifier.whatsapp().list_message_templates().await?;

    Ok(Json(ProviderTemplatesResponse {
        success: true,
        templates: list.data,
    }))
}
