//! Membership server - Entry point.

use membership_server::{
    api::{create_router_with_rate_limit, AppState, RateLimitState, Stores, WebhookConfig},
    config::Config,
    DisabledMailer, HttpMailer, Mailer, StatusLog,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use whatsapp_client::WhatsAppClient;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let status_log = StatusLog::new(&config.log.status_path);
    status_log.install_panic_hook();

    info!("Starting membership server");

    // Initialize storage
    let otp_ttl = config.notifications.otp_ttl;
    let stores = if config.storage.persist {
        match Stores::open(&config.storage, otp_ttl).await {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to open storage: {}", e);
                status_log.record(&format!("Failed to open storage: {}", e));
                std::process::exit(1);
            }
        }
    } else {
        info!("Persistence disabled, using in-memory storage");
        Stores::memory(otp_ttl)
    };

    // Initialize WhatsApp client
    let wa = &config.whatsapp;
    let whatsapp = match WhatsAppClient::new(&wa.api_url, &wa.api_version, wa.timeout) {
        Ok(c) => c
            .with_credentials(wa.token.clone(), wa.phone_number_id.clone())
            .with_business_account(wa.business_account_id.clone())
            .with_country_code(&wa.country_code),
        Err(e) => {
            error!("Failed to create WhatsApp client: {}", e);
            std::process::exit(1);
        }
    };

    if !whatsapp.is_configured() {
        warn!("WhatsApp credentials not configured, messages will be skipped");
    }

    // Initialize email relay
    let mailer: Arc<dyn Mailer> = match HttpMailer::from_config(&config.mail) {
        Ok(Some(m)) => Arc::new(m),
        Ok(None) => {
            info!("Mail relay not configured, email disabled");
            Arc::new(DisabledMailer)
        }
        Err(e) => {
            error!("Failed to create mail client: {}", e);
            std::process::exit(1);
        }
    };

    // Create application state
    let state = AppState::new(stores, whatsapp, mailer, config.notifications.clone()).with_webhook(
        WebhookConfig::new(wa.webhook_verify_token.clone(), wa.app_secret.clone()),
    );

    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);
    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            status_log.record(&format!("Failed to start server: {}", e));
            std::process::exit(1);
        }
    };

    let msg = format!("Server running on http://{}", addr);
    info!("{}", msg);
    status_log.record(&msg);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        status_log.record(&format!("Server error: {}", e));
        std::process::exit(1);
    }
}
