//! # Bot Module
//!
//! Discord front-end for Open Downloader.
//!
//! This module contains the chat glue around the download service:
//! - Slash command registration and handling
//! - Component handling (result select menu, format buttons, start menu)
//! - Per-user search sessions
//! - Background maintenance tasks
//!
//! ## Architecture
//!
//! The bot is built around the [`DownloaderBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It holds:
//!
//! - The shared [`DownloadService`] (search cache, download queue, yt-dlp)
//! - Persistent storage with [`JsonStorage`]
//! - The last search each user ran, so a menu choice maps back to a video
//!
//! ## Example
//!
//! ```rust,ignore
//! use crate::{bot::DownloaderBot, config::Config, download::DownloadService, storage::JsonStorage};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn build(service: Arc<DownloadService>) -> anyhow::Result<DownloaderBot> {
//!     let config = Config::load()?;
//!     let storage = JsonStorage::new(config.data_dir.clone()).await?;
//!     let storage = Arc::new(tokio::sync::Mutex::new(storage));
//!     Ok(DownloaderBot::new(config, service, storage, CancellationToken::new()))
//! }
//! ```

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;
pub mod session;

use crate::{
    config::Config, download::DownloadService, locales::Language, sources::ytdlp,
    storage::JsonStorage,
};
use session::SessionStore;

/// Main Discord bot handler for Open Downloader.
///
/// ## Thread Safety
///
/// - [`Arc`] for state shared with the maintenance task
/// - [`tokio::sync::Mutex`] for storage, which awaits on disk writes
/// - [`DashMap`](dashmap::DashMap) inside [`SessionStore`] for per-user sessions
pub struct DownloaderBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Cache de búsquedas, cola por usuario y backend yt-dlp
    pub service: Arc<DownloadService>,
    /// Historial, favoritos e idioma de cada usuario
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    sessions: SessionStore,
    shutdown: CancellationToken,
    maintenance_started: AtomicBool,
}

impl DownloaderBot {
    pub fn new(
        config: Config,
        service: Arc<DownloadService>,
        storage: Arc<tokio::sync::Mutex<JsonStorage>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service,
            storage,
            sessions: SessionStore::new(),
            shutdown,
            maintenance_started: AtomicBool::new(false),
        }
    }

    /// Idioma guardado por el usuario o el idioma por defecto
    pub async fn language(&self, user_id: u64) -> Language {
        self.storage
            .lock()
            .await
            .language(user_id)
            .unwrap_or(self.config.default_language)
    }

    /// Registers slash commands with Discord.
    ///
    /// Guild commands propagate almost immediately and are meant for
    /// development; global commands can take up to an hour.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                let guild_id = GuildId::from(guild_id);

                commands::register_guild_commands(ctx, guild_id).await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos globales: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                    })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for DownloaderBot {
    /// Registers commands and starts the maintenance task.
    ///
    /// `ready` fires again after a reconnect; the maintenance task is only
    /// spawned the first time.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        if self.maintenance_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let service = self.service.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            maintenance_tasks(config, service, shutdown).await;
        });
    }

    /// Errors are logged but don't crash the bot.
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }
}

/// Runs periodic maintenance tasks in the background.
///
/// Every `cleanup_interval`:
/// 1. **Cache Cleanup**: drops expired search results
/// 2. **Download Cleanup**: deletes files older than `file_max_age` left in
///    the download directory (failed uploads, interrupted downloads)
///
/// Stops when `shutdown` is cancelled.
async fn maintenance_tasks(config: Arc<Config>, service: Arc<DownloadService>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(config.cleanup_interval);
    // El primer tick es inmediato
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("🛑 Tareas de mantenimiento detenidas");
                break;
            }
            _ = interval.tick() => {
                service.cache().cleanup_old_entries();
                info!("📥 {} usuarios con descargas pendientes", service.queue().active_users());

                let removed = ytdlp::cleanup_old_files(&config.download_dir, config.file_max_age).await;
                if removed == 0 {
                    info!("🧹 Tareas de mantenimiento completadas");
                } else {
                    warn!("🧹 Mantenimiento: {} archivos huérfanos eliminados", removed);
                }
            }
        }
    }
}
