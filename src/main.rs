use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use kuusi::config::AppConfig;
use kuusi::store::{LibSqlBackend, SeedData, WizardStore, load_seed};
use kuusi::web::{MiniJinjaRenderer, SelectionForwarder, WizardService, wizard_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Arc::new(AppConfig::from_env().context("invalid configuration")?);

    eprintln!("🌲 {} v{}", config.name, env!("CARGO_PKG_VERSION"));
    eprintln!("   Languages: {}", config.language_codes.join(", "));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Listening: http://0.0.0.0:{}/{}", config.port, config.default_language_code);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn WizardStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    if let Some(seed_path) = &config.seed_path {
        let seed = SeedData::from_file(seed_path)
            .with_context(|| format!("failed to read seed file {}", seed_path.display()))?;
        load_seed(store.as_ref(), &seed)
            .await
            .context("failed to load seed data")?;
    }

    // ── HTTP ─────────────────────────────────────────────────────────────
    let service = WizardService::new(
        Arc::clone(&store),
        Arc::clone(&config),
        Arc::new(MiniJinjaRenderer::new()?),
        Arc::new(SelectionForwarder::new(Arc::clone(&store))),
    );
    let app = wizard_routes(Arc::new(service));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Wizard server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
