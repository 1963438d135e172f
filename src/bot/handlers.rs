use anyhow::Result;
use chrono::Utc;
use serenity::{
    builder::{
        CreateAttachment, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::application::{CommandInteraction, ComponentInteraction, ComponentInteractionDataKind},
    prelude::Context,
};
use tracing::{error, info, warn};

use super::{session::SearchSession, DownloaderBot};
use crate::{
    locales::{self, Language, Message},
    sources::{self, ytdlp, AudioQuality, DownloadError, DownloadFormat, YtDlpClient},
    storage::DownloadRecord,
    ui::{
        buttons::{self, ComponentAction},
        embeds,
    },
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &DownloaderBot,
) -> Result<()> {
    info!(
        "📝 Comando /{} usado por {}",
        command.data.name, command.user.name
    );

    let lang = bot.language(command.user.id.get()).await;

    match command.data.name.as_str() {
        "start" => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .embed(embeds::welcome_embed(lang))
                            .components(buttons::start_menu(lang)),
                    ),
                )
                .await?;
        }
        "search" => handle_search(ctx, &command, bot, lang).await?,
        "playlist" => handle_playlist(ctx, &command, bot, lang).await?,
        "queue" => {
            let pending = bot.service.pending(command.user.id.get());
            command
                .create_response(&ctx.http, ephemeral(embeds::queue_embed(&pending, lang)))
                .await?;
        }
        "next" => handle_next(ctx, &command, bot, lang).await?,
        "clearqueue" => {
            let removed = bot.service.clear_queue(command.user.id.get());
            let text = locales::format(lang, Message::QueueCleared, &[&removed]);
            command
                .create_response(&ctx.http, ephemeral(embeds::success_embed(text)))
                .await?;
        }
        "stats" => {
            let stats = bot.storage.lock().await.get_user_stats(command.user.id.get());
            command
                .create_response(&ctx.http, ephemeral(embeds::stats_embed(stats.as_ref(), lang)))
                .await?;
        }
        "favorites" => {
            let favorites = bot
                .storage
                .lock()
                .await
                .get_user_favorites(command.user.id.get());
            command
                .create_response(&ctx.http, ephemeral(embeds::favorites_embed(&favorites, lang)))
                .await?;
        }
        "language" => handle_language(ctx, &command, bot).await?,
        "help" => {
            command
                .create_response(&ctx.http, ephemeral(help(bot, lang)))
                .await?;
        }
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Comando no reconocido")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

/// Maneja interacciones con componentes (botones, menús, etc.)
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &DownloaderBot,
) -> Result<()> {
    info!(
        "🔘 Componente {} usado por {}",
        component.data.custom_id, component.user.name
    );

    let user_id = component.user.id.get();
    let lang = bot.language(user_id).await;

    let values: &[String] = match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values,
        _ => &[],
    };

    match ComponentAction::parse(&component.data.custom_id, values) {
        ComponentAction::SelectVideo(index) => {
            let response = match bot.sessions.video(user_id, index) {
                Some(video) => CreateInteractionResponseMessage::new()
                    .embed(embeds::video_details_embed(&video, lang))
                    .components(buttons::format_buttons(&video.id, lang)),
                None => CreateInteractionResponseMessage::new()
                    .embed(embeds::error_embed(locales::text(lang, Message::VideoNotFound)))
                    .components(vec![]),
            };
            component
                .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(response))
                .await?;
        }
        ComponentAction::Format { format, video_id } => {
            // Acknowledge para editar el mensaje original durante la descarga
            component.defer(&ctx.http).await?;

            let title = bot
                .sessions
                .find(user_id, &video_id)
                .map_or_else(|| video_id.clone(), |video| video.title);
            let request = DownloadRequest {
                user_id,
                username: component.user.name.clone(),
                video_id,
                title,
                format,
                quality: bot.sessions.quality(user_id).unwrap_or(bot.config.default_quality),
                lang,
            };
            run_download(ctx, Reply::Component(&component), bot, request).await?;
        }
        ComponentAction::QueueAdd(video_id) => {
            let position = bot.service.enqueue(user_id, &video_id);
            let text = locales::format(lang, Message::QueuePosition, &[&position]);
            component
                .create_response(&ctx.http, ephemeral(embeds::success_embed(text)))
                .await?;
        }
        ComponentAction::Favorite(video_id) => {
            let title = bot
                .sessions
                .find(user_id, &video_id)
                .map_or_else(|| video_id.clone(), |video| video.title);
            // El botón alterna: un segundo clic quita el favorito
            let mut storage = bot.storage.lock().await;
            let text = if storage.add_favorite(user_id, &video_id, &title).await? {
                locales::format(lang, Message::FavoriteAdded, &[&title])
            } else {
                storage.remove_favorite(user_id, &video_id).await?;
                locales::format(lang, Message::FavoriteRemoved, &[&title])
            };
            drop(storage);

            component
                .create_response(&ctx.http, ephemeral(embeds::success_embed(text)))
                .await?;
        }
        ComponentAction::Cancel => {
            bot.sessions.end(user_id);
            component
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::UpdateMessage(
                        CreateInteractionResponseMessage::new()
                            .content(locales::text(lang, Message::Cancelled))
                            .embeds(vec![])
                            .components(vec![]),
                    ),
                )
                .await?;
        }
        ComponentAction::MenuHelp => {
            component
                .create_response(&ctx.http, ephemeral(help(bot, lang)))
                .await?;
        }
        ComponentAction::MenuStats => {
            let stats = bot.storage.lock().await.get_user_stats(user_id);
            component
                .create_response(&ctx.http, ephemeral(embeds::stats_embed(stats.as_ref(), lang)))
                .await?;
        }
        ComponentAction::MenuQueue => {
            let pending = bot.service.pending(user_id);
            component
                .create_response(&ctx.http, ephemeral(embeds::queue_embed(&pending, lang)))
                .await?;
        }
        ComponentAction::Unknown => {
            component
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Acción no reconocida")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_search(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &DownloaderBot,
    lang: Language,
) -> Result<()> {
    let query = string_option(command, "query")
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .trim();

    if query.is_empty() {
        command
            .create_response(
                &ctx.http,
                ephemeral(embeds::error_embed(locales::text(lang, Message::SearchPrompt))),
            )
            .await?;
        return Ok(());
    }

    // Solo se aceptan URLs de YouTube
    if YtDlpClient::is_url(query) && !YtDlpClient::is_youtube_url(query) {
        let text = locales::format(lang, Message::Error, &[&"solo se aceptan URLs de YouTube"]);
        command
            .create_response(&ctx.http, ephemeral(embeds::error_embed(text)))
            .await?;
        return Ok(());
    }
    let quality = string_option(command, "quality")
        .and_then(|q| q.parse::<AudioQuality>().ok())
        .unwrap_or(bot.config.default_quality);

    // Defer la respuesta ya que puede tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;
    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().content(locales::text(lang, Message::Searching)),
        )
        .await?;

    info!("🔍 Búsqueda iniciada por {}: {}", command.user.name, query);

    let response = match bot.service.search(query).await {
        Ok(results) if results.is_empty() => EditInteractionResponse::new()
            .content("")
            .embed(embeds::error_embed(locales::text(lang, Message::NoResults))),
        Ok(results) => {
            let embed = embeds::search_results_embed(query, &results, lang);
            let menu = buttons::video_select_menu(&results, lang);
            bot.sessions.start(
                command.user.id.get(),
                SearchSession {
                    query: query.to_string(),
                    results,
                    quality,
                },
            );
            EditInteractionResponse::new()
                .content("")
                .embed(embed)
                .components(menu)
        }
        Err(e) => {
            error!("❌ Error en búsqueda '{}': {}", query, e);
            EditInteractionResponse::new()
                .content("")
                .embed(embeds::error_embed(locales::format(lang, Message::Error, &[&e])))
        }
    };

    command.edit_response(&ctx.http, response).await?;
    Ok(())
}

async fn handle_playlist(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &DownloaderBot,
    lang: Language,
) -> Result<()> {
    let url = string_option(command, "url")
        .ok_or_else(|| anyhow::anyhow!("URL no proporcionada"))?;

    if !YtDlpClient::is_playlist_url(url) {
        let text = locales::format(lang, Message::Error, &[&"URL de playlist inválida"]);
        command
            .create_response(&ctx.http, ephemeral(embeds::error_embed(text)))
            .await?;
        return Ok(());
    }

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
        )
        .await?;

    let embed = match bot.service.enqueue_playlist(command.user.id.get(), url).await {
        Ok(entries) if entries.is_empty() => {
            embeds::error_embed(locales::text(lang, Message::NoResults))
        }
        Ok(entries) => {
            let listing = entries
                .iter()
                .take(10)
                .map(|(title, position)| format!("`#{}` {}", position, embeds::truncate(title, 60)))
                .collect::<Vec<_>>()
                .join("\n");
            let header = locales::format(lang, Message::PlaylistInfo, &[&url, &entries.len()]);
            embeds::success_embed(format!("{}\n\n{}", header, listing))
        }
        Err(e) => {
            error!("❌ Error cargando playlist {}: {}", url, e);
            embeds::error_embed(locales::format(lang, Message::Error, &[&e]))
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;
    Ok(())
}

async fn handle_next(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &DownloaderBot,
    lang: Language,
) -> Result<()> {
    let user_id = command.user.id.get();

    let Some(video_id) = bot.service.next_download(user_id) else {
        command
            .create_response(
                &ctx.http,
                ephemeral(embeds::error_embed(locales::text(lang, Message::QueueEmpty))),
            )
            .await?;
        return Ok(());
    };

    let format = string_option(command, "format")
        .and_then(|f| f.parse::<DownloadFormat>().ok())
        .unwrap_or(DownloadFormat::Mp3);

    if let Err(e) = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await
    {
        bot.service.requeue(user_id, &video_id);
        return Err(e.into());
    }

    let title = bot
        .sessions
        .find(user_id, &video_id)
        .map_or_else(|| video_id.clone(), |video| video.title);
    let request = DownloadRequest {
        user_id,
        username: command.user.name.clone(),
        video_id: video_id.clone(),
        title,
        format,
        quality: bot.sessions.quality(user_id).unwrap_or(bot.config.default_quality),
        lang,
    };

    // El video sale de la cola solo si se entregó o si nunca podrá entregarse
    let outcome = run_download(ctx, Reply::Command(command), bot, request).await;
    match outcome {
        Ok(DownloadOutcome::Delivered) => Ok(()),
        Ok(DownloadOutcome::Rejected) => {
            warn!("🚫 {} descartado de la cola de {}", video_id, user_id);
            Ok(())
        }
        Ok(DownloadOutcome::Failed) => {
            let remaining = bot.service.requeue(user_id, &video_id);
            warn!("↩️ {} vuelve a la cola de {} ({} pendientes)", video_id, user_id, remaining);
            Ok(())
        }
        Err(e) => {
            bot.service.requeue(user_id, &video_id);
            Err(e)
        }
    }
}

async fn handle_language(ctx: &Context, command: &CommandInteraction, bot: &DownloaderBot) -> Result<()> {
    let lang: Language = string_option(command, "lang")
        .ok_or_else(|| anyhow::anyhow!("Idioma no proporcionado"))?
        .parse()?;

    bot.storage
        .lock()
        .await
        .set_language(command.user.id.get(), lang)
        .await?;

    command
        .create_response(
            &ctx.http,
            ephemeral(embeds::success_embed(locales::text(lang, Message::LanguageSet))),
        )
        .await?;
    Ok(())
}

/// Datos de una descarga pedida desde un botón o desde `/next`
struct DownloadRequest {
    user_id: u64,
    username: String,
    video_id: String,
    title: String,
    format: DownloadFormat,
    quality: AudioQuality,
    lang: Language,
}

/// Interacción ya diferida sobre la que se informa el progreso
enum Reply<'a> {
    Command(&'a CommandInteraction),
    Component(&'a ComponentInteraction),
}

impl Reply<'_> {
    async fn edit(&self, ctx: &Context, response: EditInteractionResponse) -> Result<()> {
        match self {
            Reply::Command(command) => {
                command.edit_response(&ctx.http, response).await?;
            }
            Reply::Component(component) => {
                component.edit_response(&ctx.http, response).await?;
            }
        }
        Ok(())
    }

    async fn followup(&self, ctx: &Context, followup: CreateInteractionResponseFollowup) -> Result<()> {
        match self {
            Reply::Command(command) => {
                command.create_followup(&ctx.http, followup).await?;
            }
            Reply::Component(component) => {
                component.create_followup(&ctx.http, followup).await?;
            }
        }
        Ok(())
    }
}

/// Resultado de una descarga pedida por el usuario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DownloadOutcome {
    Delivered,
    /// Falló algo pasajero (timeout, yt-dlp, subida); vale la pena reintentar
    Failed,
    /// El video nunca se podrá enviar: demasiado grande o inexistente
    Rejected,
}

impl DownloadOutcome {
    fn from_error(error: &DownloadError) -> Self {
        match error {
            DownloadError::TooLarge { .. } | DownloadError::NotFound(_) => Self::Rejected,
            _ => Self::Failed,
        }
    }
}

/// Descarga, envía el archivo como adjunto, registra la descarga y borra el archivo local.
///
/// Solo devuelve `Err` si no se pudo avisar que la descarga empezaba; los
/// fallos posteriores se informan al usuario y quedan en el resultado.
async fn run_download(
    ctx: &Context,
    reply: Reply<'_>,
    bot: &DownloaderBot,
    request: DownloadRequest,
) -> Result<DownloadOutcome> {
    let lang = request.lang;
    let downloading = locales::format(
        lang,
        Message::Downloading,
        &[&request.title, &request.format.label(), &bot.config.max_file_size_mb],
    );
    reply
        .edit(
            ctx,
            EditInteractionResponse::new()
                .embed(embeds::success_embed(downloading))
                .components(vec![]),
        )
        .await?;

    let url = sources::watch_url(&request.video_id);
    let media = match bot.service.fetch(&url, request.format, request.quality).await {
        Ok(media) => media,
        Err(e @ DownloadError::TooLarge { .. }) => {
            warn!("📦 {} demasiado grande para {}", request.video_id, request.username);
            let text = locales::format(lang, Message::TooLarge, &[&e]);
            report_error(ctx, &reply, text).await;
            return Ok(DownloadOutcome::from_error(&e));
        }
        Err(e) => {
            error!("❌ Descarga fallida de {}: {}", request.video_id, e);
            let text = locales::format(lang, Message::Error, &[&e]);
            report_error(ctx, &reply, text).await;
            return Ok(DownloadOutcome::from_error(&e));
        }
    };

    let complete = locales::format(
        lang,
        Message::DownloadComplete,
        &[
            &media.metadata.title,
            &request.format.label(),
            &format!("{:.1}", media.size_mb),
        ],
    );

    let hash = match ytdlp::file_hash(&media.path).await {
        Ok(hash) => hash,
        Err(e) => {
            warn!("No se pudo calcular el hash de {}: {}", media.path.display(), e);
            String::new()
        }
    };

    let uploaded = match CreateAttachment::path(&media.path).await {
        Ok(attachment) => {
            reply
                .followup(
                    ctx,
                    CreateInteractionResponseFollowup::new()
                        .content(complete.clone())
                        .add_file(attachment),
                )
                .await
        }
        Err(e) => Err(e.into()),
    };

    // El archivo local ya no se necesita, se haya enviado o no
    if let Err(e) = tokio::fs::remove_file(&media.path).await {
        warn!("No se pudo eliminar {}: {}", media.path.display(), e);
    }

    if let Err(e) = uploaded {
        error!("❌ Error enviando {}: {:?}", media.path.display(), e);
        let text = locales::format(lang, Message::Error, &[&e]);
        report_error(ctx, &reply, text).await;
        return Ok(DownloadOutcome::Failed);
    }

    let record = DownloadRecord {
        video_id: media.metadata.id.clone(),
        title: media.metadata.title.clone(),
        download_date: Utc::now(),
        file_hash: hash,
        quality: format!("{}/{}", request.format.extension(), request.quality.as_str()),
        file_size_mb: media.size_mb,
    };
    if let Err(e) = bot
        .storage
        .lock()
        .await
        .record_download(request.user_id, Some(&request.username), record)
        .await
    {
        error!("Error registrando descarga de {}: {:?}", request.user_id, e);
    }

    info!("✅ {} descargó {}", request.username, media.metadata.id);
    if let Err(e) = reply
        .edit(ctx, EditInteractionResponse::new().embed(embeds::success_embed(complete)))
        .await
    {
        warn!("No se pudo actualizar el mensaje de {}: {:?}", request.user_id, e);
    }
    Ok(DownloadOutcome::Delivered)
}

async fn report_error(ctx: &Context, reply: &Reply<'_>, text: String) {
    if let Err(e) = reply
        .edit(ctx, EditInteractionResponse::new().embed(embeds::error_embed(text)))
        .await
    {
        warn!("No se pudo mostrar el error: {:?}", e);
    }
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn ephemeral(embed: CreateEmbed) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(embed)
            .ephemeral(true),
    )
}

fn help(bot: &DownloaderBot, lang: Language) -> CreateEmbed {
    embeds::help_embed(lang, bot.config.max_file_size_mb, bot.config.rate_limit_seconds)
}
