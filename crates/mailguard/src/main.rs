//! Mailguard worker.
//!
//! Runs the four scheduled jobs (suppress, restore, tag-due, untag-expired)
//! and serves the billing-date webhook on port 3002.
//!
//! # Lifecycle
//!
//! 1. Load configuration; any error is fatal
//! 2. Restore a suppression left pending by a previous process
//! 3. Start the scheduler and the webhook listener
//! 4. On Ctrl+C or SIGTERM stop accepting requests, stop the scheduler and
//!    restore any suppressed customers before exiting

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use mailguard::config::{MailguardConfig, SentryConfig};
use mailguard::directory::CustomerDirectory;
use mailguard::shopify::AdminClient;
use mailguard::state::AppState;
use mailguard::{routes, scheduler};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Start Sentry when a DSN is configured. The guard flushes on drop.
fn init_sentry(sentry: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = sentry.dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: sentry.environment.clone().map(Into::into),
        sample_rate: sentry.sample_rate,
        traces_sample_rate: sentry.traces_sample_rate,
        attach_stacktrace: true,
        // Logged fields include customer emails
        send_default_pii: false,
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

/// Warnings and errors become Sentry events, info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    use sentry_tracing::EventFilter;

    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
        tracing::Level::TRACE => EventFilter::Ignore,
        _ => EventFilter::Breadcrumb,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mailguard=info,tower_http=info".into());

    // JSON on Fly.io or when asked for, text otherwise
    let json = std::env::var("FLY_APP_NAME").is_ok()
        || std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = MailguardConfig::from_env().expect("Failed to load configuration");

    // Sentry before the subscriber so the tracing layer finds a client
    let sentry_guard = init_sentry(&config.sentry);
    init_tracing();
    tracing::info!(sentry = sentry_guard.is_some(), "mailguard starting");

    let client = AdminClient::new(&config.shopify).expect("Failed to create Shopify client");
    tracing::info!(store = client.store(), "Shopify client created");

    let directory: Arc<dyn CustomerDirectory> = Arc::new(client);
    let state = AppState::new(config.clone(), directory)
        .await
        .expect("Failed to load state");
    let billing_entries = state.billing().len().await;
    tracing::info!(
        state_dir = %config.state_dir.display(),
        billing_entries,
        "State loaded"
    );

    scheduler::recover_pending(&state).await;

    let job_scheduler = scheduler::start(&state)
        .await
        .expect("Failed to start scheduler");

    let app = routes::app(state.clone())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // NOTE: Binding to 127.0.0.1 by default - put a proxy in front for the partner
    let addr = config.socket_addr();
    tracing::info!("mailguard listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    scheduler::shutdown(job_scheduler, &state).await;
    tracing::info!("Shutdown complete");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
