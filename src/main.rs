use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shade_finder::artifacts::ensure_artifact;
use shade_finder::config::{Config, LogFormat};
use shade_finder::{router, AppState, RecommendationTable, UndertonePredictor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    ensure_artifact(&config.model_path, config.model_url.as_deref()).await?;
    ensure_artifact(
        &config.recommendations_path,
        config.recommendations_url.as_deref(),
    )
    .await?;

    let predictor = UndertonePredictor::new(&config.model_path).with_context(|| {
        format!("failed to load model from {}", config.model_path.display())
    })?;
    let recommendations = RecommendationTable::load(&config.recommendations_path)
        .with_context(|| {
            format!(
                "failed to load recommendations from {}",
                config.recommendations_path.display()
            )
        })?;
    tracing::info!(
        model = predictor.model().name.as_deref().unwrap_or("unnamed"),
        recommendations = recommendations.len(),
        "artifacts loaded"
    );

    let mut state = AppState::new(predictor, recommendations);
    if let Some(dir) = &config.upload_tmp_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        state = state.with_upload_dir(dir.clone());
    }

    let app = router(state, config.body_limit_bytes());
    let addr = config.bind_addr();

    tracing::info!(%addr, body_limit_mb = config.body_limit_mb, "listening");
    axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "shade_finder=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
