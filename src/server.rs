//! Startup wiring: configuration to stores to services to router.

use crate::auth::AuthService;
use crate::config::Config;
use crate::http::{AppState, router};
use crate::library::{PhotoLibrary, Reconciler, RescanReport};
use crate::services::blob::BlobStore;
use crate::services::metadata::MetadataStore;
use crate::services::tokens::TokenStore;
use anyhow::{Context, Result, bail};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

/// How often expired refresh records are purged while serving.
const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Opens the configured blob provider and metadata store.
///
/// # Errors
///
/// Returns an error if either store cannot be opened.
pub async fn build_library(config: &Config) -> Result<PhotoLibrary> {
    let blobs = BlobStore::from_config(&config.storage).await?;

    let metadata = match &config.metadata.path {
        Some(path) => MetadataStore::file(path)
            .with_context(|| format!("Failed to open metadata store at {}", path.display()))?,
        None => MetadataStore::memory(),
    };

    Ok(PhotoLibrary::new(blobs, metadata))
}

/// Runs one reconciliation pass against the persistent metadata store.
///
/// # Errors
///
/// Returns an error if no metadata path is configured, since records
/// imported into an in-memory store would be lost on exit.
pub async fn rescan(config: &Config) -> Result<RescanReport> {
    if config.metadata.path.is_none() {
        bail!("PHOTOVAULT_METADATA_PATH must be set for an offline rescan");
    }
    let library = build_library(config).await?;
    Ok(Reconciler::new(library).rescan().await?)
}

/// Builds the full application state.
///
/// # Errors
///
/// Returns an error if any store cannot be opened.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let library = build_library(config).await?;

    let tokens = TokenStore::open(&config.auth.token_store_address()?)
        .context("Failed to open token store")?;
    let auth = AuthService::new(&config.auth, tokens);

    Ok(AppState::new(library, auth, config.server.cookie_secure))
}

/// Validates `config`, binds the listener and serves until Ctrl-C or
/// SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a store cannot be
/// opened or the listener cannot bind.
pub async fn serve(config: Config) -> Result<()> {
    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let state = build_state(&config).await?;
    info!(
        provider = state.library.blobs().name(),
        listen = %config.server.listen,
        "Starting photovault"
    );

    let purge = tokio::spawn(purge_tokens(state.auth.clone()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error");

    purge.abort();
    info!("Server stopped");
    result
}

async fn purge_tokens(auth: AuthService) {
    let mut interval = tokio::time::interval(TOKEN_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        match auth.purge_expired().await {
            Ok(0) => {},
            Ok(removed) => info!(removed, "Purged expired refresh tokens"),
            Err(e) => warn!(error = %e, "Token purge failed"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
