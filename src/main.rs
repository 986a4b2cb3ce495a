use code_assist_api::{config::load_dotenv, router, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    match load_dotenv() {
        Some(path) => tracing::debug!("loaded environment from {}", path.display()),
        None => tracing::debug!("no .env file found"),
    }

    let config = Config::from_env()?;
    tracing::info!(
        ocr_model = %config.ocr.model,
        llm_model = %config.llm.model,
        "configuration loaded"
    );

    let state = AppState::from_config(&config)?;
    let app = router(state, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
