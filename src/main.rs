use std::sync::Arc;

use futures::StreamExt;

use txn_triage::channels::{ChatSurface, TelegramSurface};
use txn_triage::config::TriageConfig;
use txn_triage::queue::PendingQueue;
use txn_triage::remote::{EdgeCacheClient, WebhookDispatcher};
use txn_triage::sync::QueueSync;
use txn_triage::triage::TriageEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TriageConfig::from_env().unwrap_or_else(|e| {
        tracing::error!("Configuration error: {e}");
        std::process::exit(1);
    });

    eprintln!("🧾 Transaction triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Chat: {}", config.chat_id);
    eprintln!("   Source: {}", config.cache_url);
    eprintln!("   Cache write: {} (key {})", config.cache_write_url, config.cache_key);
    eprintln!("   Commit webhook: {}", config.webhook_url);
    eprintln!(
        "   Refresh: every {} min\n",
        config.poll_interval.as_secs() / 60
    );

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let auth_token = Arc::new(config.auth_token);

    // ── Remote collaborators ────────────────────────────────────────────
    let cache = Arc::new(EdgeCacheClient::new(
        http.clone(),
        config.cache_url.clone(),
        config.cache_write_url.clone(),
        config.cache_key.clone(),
        Arc::clone(&auth_token),
    ));
    let dispatcher = Arc::new(WebhookDispatcher::new(
        http.clone(),
        config.webhook_url.clone(),
        Arc::clone(&auth_token),
    ));

    // ── Chat surface ────────────────────────────────────────────────────
    // getUpdates long-polls for 30s, so the surface gets a client without
    // the request timeout.
    let surface: Arc<dyn ChatSurface> = Arc::new(TelegramSurface::new(
        config.bot_token,
        config.chat_id.clone(),
        config.allowed_users.clone(),
        reqwest::Client::new(),
    ));
    if let Err(e) = surface.health_check().await {
        tracing::warn!("Chat surface health check failed: {e}");
    }

    // ── Triage ──────────────────────────────────────────────────────────
    let queue = PendingQueue::new(cache.clone());
    let engine = TriageEngine::new(Arc::clone(&surface), dispatcher, Arc::clone(&queue));

    let mut interactions = surface.start().await?;

    let sync = Arc::new(QueueSync::new(
        cache,
        queue,
        Arc::clone(&engine),
        config.poll_interval,
    ));
    let (_sync_handle, _shutdown) = sync.spawn();

    while let Some(interaction) = interactions.next().await {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine.handle_interaction(interaction).await;
        });
    }

    tracing::info!("Interaction stream closed; exiting");
    Ok(())
}
