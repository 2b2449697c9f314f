mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod repos;
mod seed;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{self, HeaderValue, Method, header::CONTENT_TYPE},
};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    models::TokenVerdict,
    repos::{PgStatusRepo, PgSubmissionRepo, PgTokenRepo, Repos},
    state::AppState,
    stores::{MemoryRateLimiter, Stores, TtlCache, spawn_sweeper},
};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "Contest entry API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,

    /// Generate this many new tokens, print their codes, and exit
    #[arg(long, value_name = "COUNT")]
    seed_tokens: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = envy::prefixed("CONTEST_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let tokens = Arc::new(PgTokenRepo::new(database.clone()));

    if let Some(count) = args.seed_tokens {
        let codes = seed::seed_tokens(tokens.as_ref(), count).await?;
        for code in codes {
            println!("{}", code);
        }
        return Ok(());
    }

    let repos = Repos {
        tokens,
        submissions: Arc::new(PgSubmissionRepo::new(database.clone())),
        status: Arc::new(PgStatusRepo::new(database)),
    };

    // Both stores are swept in the background; the sweepers stop when the stores are dropped.
    let token_cache = Arc::new(TtlCache::<TokenVerdict>::new(config.cache_max_entries));
    spawn_sweeper(
        &token_cache,
        Duration::from_secs(config.cache_sweep_secs),
        "token_cache",
    );
    let rate_limiter = Arc::new(MemoryRateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window(),
        config.rate_limit_max_clients,
    ));
    spawn_sweeper(&rate_limiter, config.rate_limit_window(), "rate_limiter");

    let stores = Stores {
        token_cache,
        rate_limiter,
    };

    let state = AppState {
        config: config.clone(),
        repos,
        stores,
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = handlers::router()
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(64 * 1024));
    let app = with_cors(app, &config)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Allow the configured page origins to call the API from a browser.
fn with_cors(app: Router, config: &Config) -> Result<Router> {
    let origins = config
        .cors_origins()
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    if origins.is_empty() {
        return Ok(app);
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Ok(app.layer(cors))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
