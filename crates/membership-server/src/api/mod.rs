//! HTTP API for the membership server.

mod extract;
mod handlers;
mod middleware;
mod templates;
mod types;
mod webhook;

pub use extract::ApiJson;
pub use handlers::*;
pub use middleware::{logging_middleware, panic_response, rate_limit_middleware, RateLimitState};
pub use templates::*;
pub use types::*;
pub use webhook::{sign, verify_signature, WebhookConfig, SIGNATURE_HEADER};

use crate::config::{NotificationConfig, StorageConfig};
use crate::mailer::Mailer;
use crate::notify::Notifier;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use member_store::{
    CardTemplateStore, DownloadTracker, JsonStore, OtpStore, SettingsStore, StoreError,
    TemplateRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use whatsapp_client::WhatsAppClient;

/// Card layouts can embed a whole base PDF.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Every store the handlers touch.
pub struct Stores {
    pub otp: OtpStore,
    pub downloads: DownloadTracker,
    pub templates: TemplateRegistry,
    pub settings: SettingsStore,
    pub card_template: CardTemplateStore,
}

impl Stores {
    /// Open the JSON documents under `storage.dir`.
    pub async fn open(storage: &StorageConfig, otp_ttl: Duration) -> Result<Self, StoreError> {
        info!("Opening storage in {:?}", storage.dir);

        Ok(Self {
            otp: OtpStore::new(otp_ttl),
            downloads: DownloadTracker::open(JsonStore::file(storage.downloads_path())).await?,
            templates: TemplateRegistry::open(JsonStore::file(storage.templates_path())).await?,
            settings: SettingsStore::new(JsonStore::file(storage.settings_path())),
            card_template: CardTemplateStore::new(JsonStore::file(storage.card_template_path())),
        })
    }

    /// Stores that never touch disk.
    pub fn memory(otp_ttl: Duration) -> Self {
        Self {
            otp: OtpStore::new(otp_ttl),
            downloads: DownloadTracker::memory(),
            templates: TemplateRegistry::memory(),
            settings: SettingsStore::memory(),
            card_template: CardTemplateStore::memory(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Pending one-time codes
    pub otp: OtpStore,
    /// Weekly card download log
    pub downloads: Arc<DownloadTracker>,
    /// Template metadata
    pub templates: Arc<TemplateRegistry>,
    /// Notification settings
    pub settings: Arc<SettingsStore>,
    /// Card designer layout
    pub card_template: Arc<CardTemplateStore>,
    /// WhatsApp template sender
    pub notifier: Notifier,
    /// Transactional email
    pub mailer: Arc<dyn Mailer>,
    /// Template names and message content
    pub notifications: Arc<NotificationConfig>,
    /// Webhook credentials
    pub webhook: Arc<WebhookConfig>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        stores: Stores,
        whatsapp: WhatsAppClient,
        mailer: Arc<dyn Mailer>,
        notifications: NotificationConfig,
    ) -> Self {
        let templates = Arc::new(stores.templates);

        Self {
            otp: stores.otp,
            downloads: Arc::new(stores.downloads),
            notifier: Notifier::new(Arc::new(whatsapp), templates.clone()),
            templates,
            settings: Arc::new(stores.settings),
            card_template: Arc::new(stores.card_template),
            mailer,
            notifications: Arc::new(notifications),
            webhook: Arc::new(WebhookConfig::default()),
        }
    }

    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhook = Arc::new(webhook);
        self
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(600))
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let limited = Router::new()
        .route("/test", get(handlers::test))
        // OTP
        .route("/whatsapp/send-otp", post(handlers::send_otp))
        .route("/whatsapp/verify-otp", post(handlers::verify_otp))
        // Notifications
        .route("/whatsapp/notify-approval", post(handlers::notify_approval))
        .route("/whatsapp/send-registration", post(handlers::send_registration))
        .route("/whatsapp/send-template", post(handlers::send_template))
        // Download quota
        .route(
            "/whatsapp/check-download-allowed",
            post(handlers::check_download_allowed),
        )
        .route("/whatsapp/record-download", post(handlers::record_download))
        // Template registry; the second segment is a type for GET and an id otherwise
        .route(
            "/whatsapp/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/whatsapp/templates/:key",
            get(templates::templates_by_type)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route(
            "/whatsapp/templates/reset/defaults",
            post(templates::reset_templates),
        )
        .route("/whatsapp/template/:id", get(templates::get_template))
        .route(
            "/whatsapp/provider-templates",
            get(templates::provider_templates),
        )
        // Admin
        .route(
            "/admin/settings",
            get(handlers::get_settings).post(handlers::save_settings),
        )
        // Email
        .route(
            "/send-registration-email",
            post(handlers::send_registration_email),
        )
        .route("/send-approval-email", post(handlers::send_approval_email))
        // Card layout
        .route("/save-template", post(handlers::save_card_template))
        .route("/load-template", get(handlers::load_card_template))
        // Provider webhook
        .route(
            "/webhook",
            get(webhook::verify_webhook).post(webhook::receive_webhook),
        )
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(limited)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
