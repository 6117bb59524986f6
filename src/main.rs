use std::sync::Arc;

use anyhow::Context;

use mail_triage::api::{self, AppState};
use mail_triage::config::ServiceConfig;
use mail_triage::llm::create_provider;
use mail_triage::pipeline::{AnalysisPipeline, ClassificationEngine};
use mail_triage::store::{AnalysisStore, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let config = ServiceConfig::from_env().context("Invalid configuration")?;

    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    eprintln!("📬 Mail Triage v{}", env!("CARGO_PKG_VERSION"));

    // ── Classifier ───────────────────────────────────────────────────────
    let provider = match config.llm_config() {
        Some(llm_config) => Some(create_provider(&llm_config).context("Failed to create provider")?),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; analyses will report a configuration error");
            None
        }
    };
    let engine = ClassificationEngine::new(provider, config.engine_config());
    eprintln!(
        "   Models: {}",
        engine.candidates().iter().collect::<Vec<_>>().join(", ")
    );
    eprintln!("   Language: {}", config.language);
    let pipeline = Arc::new(AnalysisPipeline::with_engine(engine));

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn AnalysisStore> = Arc::new(
        LibSqlBackend::new_local(&config.database_path)
            .await
            .with_context(|| {
                format!("Failed to open database at {}", config.database_path.display())
            })?,
    );
    eprintln!("   Database: {}", config.database_path.display());

    // ── HTTP ─────────────────────────────────────────────────────────────
    let addr = config.bind_addr();
    let app = api::router(AppState::new(pipeline, store, config));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    eprintln!("   API: http://{addr}\n");
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
