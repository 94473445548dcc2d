use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatroom::auto_reply::{AutoReplyScheduler, HttpQuoteSource};
use chatroom::config::AppConfig;
use chatroom::realtime::BroadcastHub;
use chatroom::routes::configure_routes;
use chatroom::service::ChatService;
use chatroom::store::{ChatStore, PgChatStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;

    let store: Arc<dyn ChatStore> = Arc::new(PgChatStore::connect(config.store.clone()).await?);
    info!(host = %config.store.host, database = %config.store.database, "connected to chat store");

    let hub = BroadcastHub::new(config.broadcast_scope);
    let quotes = Arc::new(HttpQuoteSource::new(config.quote_api_url.clone())?);
    info!(quote_api = %quotes.url(), "auto-reply quotes configured");
    let auto_reply =
        AutoReplyScheduler::new(store.clone(), hub.clone(), quotes, config.auto_reply_delay);
    let service = ChatService::new(store, hub, auto_reply.clone());

    let routes = configure_routes(service, &config.cors_origin);

    let addr = config.bind_addr();
    info!(
        addr = %addr,
        cors_origin = %config.cors_origin,
        broadcast_scope = ?config.broadcast_scope,
        auto_reply_delay_ms = auto_reply.delay().as_millis() as u64,
        "Server is running"
    );

    tokio::select! {
        _ = warp::serve(routes).run(addr) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    auto_reply.shutdown();
    Ok(())
}
