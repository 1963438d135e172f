use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::{Command, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    Command::set_global_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        start_command(),
        search_command(),
        playlist_command(),
        queue_command(),
        next_command(),
        clearqueue_command(),
        stats_command(),
        favorites_command(),
        language_command(),
        help_command(),
    ]
}

fn start_command() -> CreateCommand {
    CreateCommand::new("start").description("Muestra el menú de bienvenida")
}

// Búsqueda y descarga

fn search_command() -> CreateCommand {
    CreateCommand::new("search")
        .description("Busca videos en YouTube para descargarlos")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "Título o URL de YouTube",
            )
            .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "quality", "Calidad del MP3")
                .add_string_choice("Low (96 kbps)", "low")
                .add_string_choice("Medium (192 kbps)", "medium")
                .add_string_choice("High (320 kbps)", "high"),
        )
}

fn playlist_command() -> CreateCommand {
    CreateCommand::new("playlist")
        .description("Agrega todos los videos de una playlist a tu cola")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "url", "URL de la playlist")
                .required(true),
        )
}

// Cola de descargas

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Muestra tu cola de descargas")
}

fn next_command() -> CreateCommand {
    CreateCommand::new("next")
        .description("Descarga el siguiente video de tu cola")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "format", "Formato de descarga")
                .add_string_choice("MP3", "mp3")
                .add_string_choice("MP4", "mp4"),
        )
}

fn clearqueue_command() -> CreateCommand {
    CreateCommand::new("clearqueue").description("Vacía tu cola de descargas")
}

// Usuario

fn stats_command() -> CreateCommand {
    CreateCommand::new("stats").description("Muestra tus estadísticas de descarga")
}

fn favorites_command() -> CreateCommand {
    CreateCommand::new("favorites").description("Muestra tus videos favoritos")
}

fn language_command() -> CreateCommand {
    CreateCommand::new("language")
        .description("Cambia el idioma de las respuestas")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "lang", "Idioma")
                .required(true)
                .add_string_choice("English", "en")
                .add_string_choice("Français", "fr"),
        )
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Muestra la guía de uso")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_is_registered() {
        assert_eq!(all_commands().len(), 10);
    }
}
