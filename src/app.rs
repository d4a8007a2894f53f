use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use std::{panic, process, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::well_known;
use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::repos::refresh_token_repo::RefreshTokenRepo;
use crate::repos::user_repo::UserRepo;
use crate::services::auth::account::AccountService;
use crate::services::auth::credentials::CredentialService;
use crate::services::auth::keys::{AccessTokenVerifier, JwksCache, RefreshTokenVerifier};
use crate::services::auth::token_issuer::TokenIssuer;
use crate::services::auth::token_service::TokenService;
use crate::state::{AppState, CookiePolicy};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing so they don't get lost when stderr is
        // hidden by the launcher.
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            // Configuration faults are fatal; never serve with bad or
            // missing key material.
            tracing::error!(error = %e, "refusing to start");
            return Err(e.into());
        }
    };

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting auth service in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await.map_err(|e| {
        tracing::error!(error = %e, "refusing to start");
        AppError::Internal
    })?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|_| AppError::Internal)?;
    axum::serve(listener, app)
        .await
        .map_err(|_| AppError::Internal)?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, ConfigError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url)
        .map_err(|_| ConfigError::Invalid("DATABASE_URL"))?;

    let issuer = TokenIssuer::new(
        &config.access_private_key_pem,
        config.access_key_id.clone(),
        &config.refresh_token_secret,
        config.access_token_ttl_seconds,
        config.refresh_token_ttl_seconds,
    )?;

    let jwks: serde_json::Value = serde_json::from_str(&config.jwks_json)
        .map_err(|_| ConfigError::Invalid("JWKS_JSON"))?;

    // Other services fetch our keys over the wire; in-process we verify
    // against the same document unless a remote key set is configured.
    let keys = match &config.jwks_url {
        Some(url) => JwksCache::remote(url.clone())?,
        None => JwksCache::from_document(&config.jwks_json)?,
    };

    let directory = Arc::new(UserRepo::new(pool.clone()));
    let refresh_store = Arc::new(RefreshTokenRepo::new(pool));

    let accounts = Arc::new(AccountService::new(
        directory.clone(),
        CredentialService::new(),
    ));
    let tokens = Arc::new(TokenService::new(issuer, refresh_store.clone()));

    Ok(AppState {
        accounts,
        tokens,
        access_verifier: Arc::new(AccessTokenVerifier::new(keys)),
        refresh_verifier: Arc::new(RefreshTokenVerifier::new(&config.refresh_token_secret)),
        refresh_store,
        directory,
        cookies: CookiePolicy {
            domain: config.cookie_domain.clone(),
            secure: config.app_env.is_production(),
        },
        jwks: Arc::new(jwks),
    })
}

pub fn router(state: AppState) -> Router {
    async fn health() -> &'static str {
        "ok"
    }

    Router::new()
        .route("/health", get(health))
        .route("/.well-known/jwks.json", get(well_known::jwks))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
