use num_format::{Locale, ToFormattedString};
use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    locales::{self, Language, Message},
    sources::VideoMetadata,
    storage::{Favorite, UserStats},
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MEDIA_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎬 Open Downloader";

/// Discord rechaza títulos de embed más largos
const MAX_TITLE_CHARS: usize = 256;

fn base_embed() -> CreateEmbed {
    CreateEmbed::default()
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn welcome_embed(lang: Language) -> CreateEmbed {
    base_embed()
        .description(locales::text(lang, Message::Welcome))
        .color(colors::MEDIA_PURPLE)
}

/// Crea embed con resultados de búsqueda
pub fn search_results_embed(query: &str, results: &[VideoMetadata], lang: Language) -> CreateEmbed {
    let listing = results
        .iter()
        .enumerate()
        .map(|(i, video)| {
            format!(
                "**{}**. {} - {} `[{}]`",
                i + 1,
                truncate(&video.title, 50),
                video.uploader,
                format_duration(video.duration())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    base_embed()
        .title(search_title(query))
        .description(format!("{}\n\n{}", locales::text(lang, Message::SelectVideo), listing))
        .color(colors::INFO_BLUE)
}

/// Detalle del video elegido antes de escoger formato
pub fn video_details_embed(video: &VideoMetadata, lang: Language) -> CreateEmbed {
    let (duration, channel, size) = match lang {
        Language::En => ("📊 Duration", "👤 Channel", "💾 Estimated size"),
        Language::Fr => ("📊 Durée", "👤 Chaîne", "💾 Taille estimée"),
    };

    let mut embed = base_embed()
        .title(&video.title)
        .url(&video.url)
        .description(locales::text(lang, Message::SelectFormat))
        .color(colors::MEDIA_PURPLE)
        .field(duration, format_duration(video.duration()), true)
        .field(channel, &video.uploader, true)
        .field(size, format!("{:.1} MB", video.estimated_size_mb()), true);

    if let Some(thumbnail) = &video.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
}

pub fn stats_embed(stats: Option<&UserStats>, lang: Language) -> CreateEmbed {
    let embed = base_embed()
        .title(locales::text(lang, Message::StatsTitle))
        .color(colors::INFO_BLUE);

    let Some(stats) = stats else {
        return embed.description(locales::text(lang, Message::NoStats));
    };

    let (total, unique, favorites, size, last) = match lang {
        Language::En => ("Total downloads", "Unique downloads", "Favorites", "Total size", "Last download"),
        Language::Fr => ("Téléchargements totaux", "Téléchargements uniques", "Favoris", "Taille totale", "Dernier téléchargement"),
    };

    let last_download = stats
        .last_download_date
        .map(|date| date.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| locales::text(lang, Message::Never).to_string());

    embed.description(format!(
        "• {}: {}\n• {}: {}\n• {}: {}\n• {}: {:.1} MB\n• {}: {}",
        total,
        stats.total_downloads.to_formatted_string(&Locale::en),
        unique,
        stats.unique_downloads.to_formatted_string(&Locale::en),
        favorites,
        stats.favorites_count.to_formatted_string(&Locale::en),
        size,
        stats.total_size_mb,
        last,
        last_download
    ))
}

pub fn favorites_embed(favorites: &[Favorite], lang: Language) -> CreateEmbed {
    let embed = base_embed().title("⭐").color(colors::WARNING_ORANGE);

    if favorites.is_empty() {
        return embed.description(locales::text(lang, Message::NoFavorites));
    }

    let listing = favorites
        .iter()
        .take(20)
        .enumerate()
        .map(|(i, fav)| {
            format!(
                "**{}**. [{}]({}) - {}",
                i + 1,
                truncate(&fav.title, 60),
                crate::sources::watch_url(&fav.video_id),
                fav.added_date.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    embed.description(listing)
}

pub fn queue_embed(pending: &[String], lang: Language) -> CreateEmbed {
    let embed = base_embed().title("📥").color(colors::INFO_BLUE);

    if pending.is_empty() {
        return embed.description(locales::text(lang, Message::QueueEmpty));
    }

    let listing = pending
        .iter()
        .take(20)
        .enumerate()
        .map(|(i, id)| format!("**{}**. {}", i + 1, crate::sources::watch_url(id)))
        .collect::<Vec<_>>()
        .join("\n");

    let extra = pending.len().saturating_sub(20);
    if extra > 0 {
        embed.description(format!("{}\n… +{}", listing, extra))
    } else {
        embed.description(listing)
    }
}

pub fn help_embed(lang: Language, max_file_size_mb: u64, rate_limit_seconds: u64) -> CreateEmbed {
    base_embed()
        .description(locales::format(
            lang,
            Message::Help,
            &[&max_file_size_mb, &rate_limit_seconds],
        ))
        .color(colors::INFO_BLUE)
}

pub fn error_embed(description: impl Into<String>) -> CreateEmbed {
    base_embed().description(description).color(colors::ERROR_RED)
}

pub fn success_embed(description: impl Into<String>) -> CreateEmbed {
    base_embed().description(description).color(colors::SUCCESS_GREEN)
}

/// Título de resultados; la consulta del usuario puede ser arbitrariamente larga
fn search_title(query: &str) -> String {
    truncate(&format!("🔍 {}", query), MAX_TITLE_CHARS)
}

/// Formatea duración en formato legible
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Corta el texto a `max` caracteres, terminando en "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
