use crate::{
    auth::JwtKeys,
    axum_http::{
        default_routers,
        routers::{self, Collaborators},
    },
    config::config_model::DotEnvyConfig,
    usecases::side_effects::BookingSideEffects,
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::{
        cache::memory_view_cache::MemoryViewCache,
        db::postgres::postgres_connection::PgPoolSquad,
        notifications::{
            dispatcher::{DEFAULT_QUEUE_CAPACITY, NotificationDispatcher, NotificationProvider},
            log_provider::LogNotificationProvider,
            webhook_provider::WebhookNotificationProvider,
        },
    },
    payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let collaborators = collaborators(Arc::clone(&config), db_pool)?;
    let jwt_keys = Arc::new(JwtKeys::new(&config.auth.jwt_secret));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1/bookings", routers::bookings::routes(&collaborators))
        .nest(
            "/api/v1/availability",
            routers::availability::routes(&collaborators),
        )
        .nest(
            "/api/v1/public",
            routers::public_booking::routes(&collaborators),
        )
        .nest("/api/v1/payments", routers::payments::routes(&collaborators))
        .nest(
            "/api/v1/plan-limits",
            routers::plan_limits::routes(&collaborators),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(jwt_keys))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static("stripe-signature"),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(
        port = config.backend_server.port,
        stage = %config.stage,
        "Server is running"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn collaborators(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<Collaborators> {
    let view_cache = Arc::new(MemoryViewCache::new(
        Duration::from_secs(config.cache.ttl_seconds),
        config.cache.max_entries,
    ));

    let mut providers: Vec<Arc<dyn NotificationProvider>> =
        vec![Arc::new(LogNotificationProvider)];
    if let Some(endpoint) = config.notifications.webhook_url.clone() {
        info!(%endpoint, "notifications: webhook delivery enabled");
        providers.push(Arc::new(WebhookNotificationProvider::new(endpoint)?));
    }
    let notifier = Arc::new(NotificationDispatcher::new(
        providers,
        DEFAULT_QUEUE_CAPACITY,
    ));

    let stripe = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
        config.stripe.success_url.clone(),
        config.stripe.cancel_url.clone(),
        config.stripe.currency.clone(),
        config.stripe.webhook_tolerance_seconds,
    ));

    Ok(Collaborators {
        config,
        db_pool,
        side_effects: Arc::new(BookingSideEffects::new(view_cache, notifier)),
        stripe,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(signal_error = ?err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(signal_error = ?err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
