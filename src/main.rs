use std::sync::Arc;

use anyhow::Context;

use catalog_reply_bot::catalog::{CatalogSource, SheetsCatalog};
use catalog_reply_bot::channels::{AppState, app_router};
use catalog_reply_bot::config::BotConfig;
use catalog_reply_bot::llm::create_provider;
use catalog_reply_bot::pipeline::ReplyPipeline;

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

    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GOOGLE_SHEET_ID=... GOOGLE_APPLICATION_CREDENTIALS=credentials.json");
        eprintln!("  (or GOOGLE_API_KEY=... for a public sheet)");
        std::process::exit(1);
    });

    let catalog: Arc<dyn CatalogSource> = Arc::new(SheetsCatalog::new(&config.catalog));

    let llm = match &config.llm {
        Some(llm_config) => Some(create_provider(llm_config).context("creating LLM provider")?),
        None => None,
    };

    let pipeline = ReplyPipeline::from_config(&config.reply, catalog, llm);
    let state = AppState::new(Arc::new(pipeline)).with_messenger_config(&config.messenger);
    let app = app_router(state);

    let addr = config.listen_addr();
    eprintln!("🤖 Catalog reply bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Sheet: {} ({})", config.catalog.sheet_id, config.catalog.sheet_name);
    eprintln!(
        "   Matching: {} threshold {:.2}, list limit {}",
        config.reply.similarity, config.reply.threshold, config.reply.max_list
    );
    eprintln!(
        "   LLM: {}",
        config
            .llm
            .as_ref()
            .map(|l| l.model.as_str())
            .unwrap_or("disabled")
    );
    eprintln!("   Webhooks: http://{addr}/manychat  http://{addr}/webhook\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Server started");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
