//! HTTP request handlers.

use super::types::{
    required, ApprovalEmailRequest, ApprovalResponse, DownloadCheckResponse, DownloadRequest,
    EmailSentResponse, HealthResponse, MessageResponse, NotifyApprovalRequest,
    RegistrationEmailRequest, SaveCardTemplateRequest, SavedResponse, SendOtpRequest,
    SendRegistrationRequest, SendResponse, SendTemplateRequest, SendTemplateResponse,
    SettingsResponse, SkippedResponse, SuccessResponse, VerifyOtpRequest,
};
use super::extract::ApiJson;
use super::AppState;
use crate::error::ApiError;
use crate::mailer::{approval_email, registration_email, EmailOutcome};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{error, info, warn};
use whatsapp_client::{TemplateButton, TemplateMessage};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        pending_otps: state.otp.pending_count().await,
        templates: state.templates.len().await,
        whatsapp_configured: state.notifier.whatsapp().is_configured(),
    })
}

/// Liveness check kept for the admin frontend.
pub async fn test() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Server is running".to_string(),
    })
}

/// Issue an OTP and deliver it with the OTP template.
pub async fn send_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendOtpRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let phone = required(&request.phone).ok_or_else(|| ApiError::validation("phone is required"))?;
    let config = &state.notifications;
    let template = config.otp_template.clone();

    info!(%phone, %template, "OTP requested");

    let code = state.otp.request(phone).await;
    let language = state
        .notifier
        .resolve_language(&template, request.language.as_deref(), "en_US")
        .await;

    let message = TemplateMessage::new(&template, language)
        .with_parameters([
            code.clone(),
            config.card_label.clone(),
            validity_label(state.otp.ttl().as_secs()),
            config.support_contact.clone(),
        ])
        .with_button(Some(TemplateButton::copy_code(&code)));

    let result = state.notifier.send(phone, &message).await.map_err(|e| {
        error!(%phone, %template, "OTP send failed: {}", e);
        ApiError::internal("Failed to send OTP")
    })?;

    Ok(Json(SendResponse {
        success: true,
        template,
        result,
    }))
}

/// "5 min" for a five minute validity; partial minutes round up.
fn validity_label(ttl_secs: u64) -> String {
    format!("{} min", ttl_secs.div_ceil(60).max(1))
}

/// Check a submitted OTP.
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyOtpRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let (Some(phone), Some(code)) = (required(&request.phone), required(&request.code)) else {
        return Err(ApiError::validation("phone and code required"));
    };

    state.otp.verify(phone, code).await.map_err(|e| {
        info!(%phone, "OTP rejected: {}", e);
        e
    })?;

    Ok(Json(SuccessResponse::ok()))
}

/// Tell a member their membership was approved, by WhatsApp and optionally email.
pub async fn notify_approval(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NotifyApprovalRequest>,
) -> Result<Response, ApiError> {
    let phone = required(&request.phone).ok_or_else(|| ApiError::validation("phone is required"))?;

    let settings = state.settings.load().await;
    if !settings.whatsapp_enabled {
        info!(%phone, "WhatsApp disabled, approval notification skipped");
        return Ok(Json(SkippedResponse {
            success: false,
            reason: "whatsapp_disabled".to_string(),
        })
        .into_response());
    }

    let template = state.notifications.approval_template.clone();
    let language = state
        .notifier
        .resolve_language(&template, request.language.as_deref(), "en")
        .await;
    let first_name = request.first_name.clone().unwrap_or_default();
    let membership_id = request.membership_id.clone().unwrap_or_default();

    info!(%phone, %template, %membership_id, "Sending approval notification");

    let message = TemplateMessage::new(&template, language)
        .with_parameters([first_name.clone(), membership_id.clone()]);

    let text_result = state.notifier.send(phone, &message).await.map_err(|e| {
        error!(%phone, %template, "Approval send failed: {}", e);
        ApiError::internal("Failed to notify approval")
    })?;

    let email_result = match (required(&request.email), required(&request.first_name)) {
        (Some(email), Some(name)) => {
            let outcome = EmailOutcome::from(
                state
                    .mailer
                    .send(&approval_email(email, name, &membership_id))
                    .await,
            );
            if !outcome.success {
                warn!(%email, error = ?outcome.error, "Approval email not sent");
            }
            outcome
        }
        _ => EmailOutcome::skipped(),
    };

    Ok(Json(ApprovalResponse {
        success: true,
        template,
        text_result,
        email_result,
    })
    .into_response())
}

/// Confirm a new registration over WhatsApp.
pub async fn send_registration(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendRegistrationRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let phone = required(&request.phone).ok_or_else(|| ApiError::validation("phone is required"))?;
    let config = &state.notifications;
    let template = config.registration_template.clone();

    info!(%phone, %template, "Sending registration notification");

    let language = state
        .notifier
        .resolve_language(&template, request.language.as_deref(), "en_US")
        .await;

    let message = TemplateMessage::new(&template, language)
        .with_parameters([
            request.first_name.clone().unwrap_or_default(),
            request.membership_id.clone().unwrap_or_default(),
        ])
        .with_button(Some(TemplateButton::url(&config.registration_button_url)));

    let result = state.notifier.send(phone, &message).await.map_err(|e| {
        error!(%phone, %template, "Registration send failed: {}", e);
        ApiError::internal("Failed to send registration notification")
    })?;

    Ok(Json(SendResponse {
        success: true,
        template,
        result,
    }))
}

/// Send any registered template with caller-supplied body parameters.
pub async fn send_template(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendTemplateRequest>,
) -> Result<Json<SendTemplateResponse>, ApiError> {
    let template_ref = request.template.as_ref();
    let (Some(to), Some(name)) = (
        required(&request.to),
        template_ref.and_then(|t| required(&t.name)),
    ) else {
        return Err(ApiError::validation("to and template.name are required"));
    };

    let explicit = template_ref
        .and_then(|t| t.language.as_ref())
        .and_then(|l| required(&l.code));
    let language = match explicit {
        Some(code) => code.to_string(),
        None => state
            .templates
            .language_of(name)
            .await
            .unwrap_or_else(|| "en".to_string()),
    };
    let parameters = template_ref.map(|t| t.body_parameters()).unwrap_or_default();

    let message = TemplateMessage::new(name, language).with_parameters(parameters);

    let result = state.notifier.send(to, &message).await.map_err(|e| {
        error!(%to, template = %name, "Template proxy send failed: {}", e);
        ApiError::internal("Failed to send template")
    })?;

    Ok(Json(SendTemplateResponse {
        success: true,
        result,
    }))
}

/// Whether a member may download their card again this week.
pub async fn check_download_allowed(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DownloadRequest>,
) -> Result<Json<DownloadCheckResponse>, ApiError> {
    let membership_id = required(&request.membership_id)
        .ok_or_else(|| ApiError::validation("membership_id is required"))?;

    let limit = state.settings.load().await.downloads_per_week;
    let status = state.downloads.check_allowed(membership_id, limit).await;

    Ok(Json(DownloadCheckResponse {
        success: true,
        allowed: status.allowed,
        downloads_this_week: status.count_this_week,
        limit,
    }))
}

/// Log a completed card download.
pub async fn record_download(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DownloadRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let membership_id = required(&request.membership_id)
        .ok_or_else(|| ApiError::validation("membership_id is required"))?;

    state.downloads.record(membership_id).await?;

    Ok(Json(SuccessResponse::ok()))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        success: true,
        settings: state.settings.load().await,
    })
}

/// Replace the notification settings.
pub async fn save_settings(
    State(state): State<AppState>,
    ApiJson(raw): ApiJson<Value>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = state.settings.save(&raw).await?;

    Ok(Json(SettingsResponse {
        success: true,
        settings,
    }))
}

pub async fn send_registration_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegistrationEmailRequest>,
) -> Result<Json<EmailSentResponse>, ApiError> {
    let (Some(email), Some(full_name)) = (required(&request.email), required(&request.full_name))
    else {
        return Err(ApiError::validation("email and full_name are required"));
    };

    info!(%email, "Sending registration email");

    let receipt = state
        .mailer
        .send(&registration_email(email, full_name))
        .await
        .map_err(|e| {
            warn!(%email, "Registration email send failed: {}", e);
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(EmailSentResponse {
        success: true,
        message_id: receipt.message_id,
    }))
}

pub async fn send_approval_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ApprovalEmailRequest>,
) -> Result<Json<EmailSentResponse>, ApiError> {
    let (Some(email), Some(full_name), Some(membership_id)) = (
        required(&request.email),
        required(&request.full_name),
        required(&request.membership_id),
    ) else {
        return Err(ApiError::validation(
            "email, full_name, and membership_id are required",
        ));
    };

    info!(%email, %membership_id, "Sending approval email");

    let receipt = state
        .mailer
        .send(&approval_email(email, full_name, membership_id))
        .await
        .map_err(|e| {
            warn!(%email, "Approval email send failed: {}", e);
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(EmailSentResponse {
        success: true,
        message_id: receipt.message_id,
    }))
}

/// Store the card designer's layout document.
pub async fn save_card_template(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaveCardTemplateRequest>,
) -> Result<Json<SavedResponse>, ApiError> {
    let template = request
        .template
        .ok_or_else(|| ApiError::validation("No template data provided"))?;

    state.card_template.save(&template).await?;

    Ok(Json(SavedResponse {
        success: true,
        message: "Template saved successfully".to_string(),
    }))
}

pub async fn load_card_template(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.card_template.load().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_label() {
        assert_eq!(validity_label(300), "5 min");
        assert_eq!(validity_label(90), "2 min");
        assert_eq!(validity_label(10), "1 min");
    }
}
