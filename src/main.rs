use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bot;
mod cache;
mod config;
mod download;
mod locales;
mod sources;
mod storage;
mod ui;

use crate::bot::DownloaderBot;
use crate::cache::SearchCache;
use crate::config::Config;
use crate::download::{DownloadService, ServiceLimits};
use crate::sources::{ytdlp::YtDlpSettings, YtDlpClient};
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_downloader=debug".parse()?)
                .add_directive("serenity=info".parse()?),
        )
        .init();

    info!("🎬 Iniciando Open Downloader v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    let ytdlp = Arc::new(YtDlpClient::new(YtDlpSettings {
        binary: config.ytdlp_path.clone(),
        download_dir: config.download_dir.clone(),
        cookies_file: Some(config.cookies_file.clone()),
        max_file_size_mb: config.max_file_size_mb,
    }));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        ytdlp.verify_dependencies().await?;
        println!("OK");
        return Ok(());
    }

    info!("{}", config.summary());

    // Inicializar almacenamiento JSON
    let storage = Arc::new(tokio::sync::Mutex::new(
        JsonStorage::new(config.data_dir.clone()).await?,
    ));
    info!("{}", storage.lock().await.get_storage_stats().await?);

    // Inicializar caché y servicio de descargas
    let cache = Arc::new(SearchCache::new(config.cache_size, config.cache_ttl));
    let service = Arc::new(DownloadService::new(
        cache,
        ytdlp,
        ServiceLimits {
            max_search_results: config.max_search_results,
            max_playlist_size: config.max_playlist_size,
            download_timeout: config.download_timeout,
        },
    ));

    // Slash commands y DMs; no se necesita MESSAGE_CONTENT
    let intents = GatewayIntents::GUILDS | GatewayIntents::DIRECT_MESSAGES;

    let shutdown = CancellationToken::new();
    let handler = DownloaderBot::new(config.clone(), service, storage, shutdown.clone());

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shutdown.cancel();
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
