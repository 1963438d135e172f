use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Idiomas soportados por los mensajes del bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Fr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "fr" | "french" | "français" => Ok(Language::Fr),
            other => anyhow::bail!("Idioma no soportado: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Welcome,
    SearchPrompt,
    Searching,
    NoResults,
    SelectVideo,
    SelectFormat,
    Downloading,
    DownloadComplete,
    Error,
    QueuePosition,
    QueueEmpty,
    QueueCleared,
    PlaylistInfo,
    StatsTitle,
    NoStats,
    Never,
    FavoriteAdded,
    FavoriteRemoved,
    NoFavorites,
    Cancelled,
    VideoNotFound,
    TooLarge,
    Help,
    LanguageSet,
}

/// Texto fijo de un mensaje
pub fn text(lang: Language, msg: Message) -> &'static str {
    use Message::*;

    match (lang, msg) {
        (Language::En, Welcome) => "🎵 **Welcome to YouTube Downloader** 🎵\n\nI can download audio or video from any YouTube video!\n\nUse `/search` or choose an option:",
        (Language::Fr, Welcome) => "🎵 **Bienvenue sur YouTube Downloader** 🎵\n\nJe peux télécharger l'audio ou la vidéo de n'importe quelle vidéo YouTube !\n\nUtilisez `/search` ou choisissez une option :",
        (Language::En, SearchPrompt) => "🔍 Send me a video title or URL to search:",
        (Language::Fr, SearchPrompt) => "🔍 Envoyez un titre ou une URL à rechercher :",
        (Language::En, Searching) => "🔍 Searching...\nPlease wait a few seconds ⏳",
        (Language::Fr, Searching) => "🔍 Recherche en cours...\nVeuillez patienter quelques secondes ⏳",
        (Language::En, NoResults) => "❌ No results found.",
        (Language::Fr, NoResults) => "❌ Aucun résultat trouvé.",
        (Language::En, SelectVideo) => "🎵 Select a video:",
        (Language::Fr, SelectVideo) => "🎵 Sélectionnez une vidéo :",
        (Language::En, SelectFormat) => "Choose download format:",
        (Language::Fr, SelectFormat) => "Choisissez le format :",
        (Language::En, Downloading) => "🔽 Downloading: **{}**\nFormat: {}\nMaximum size: {}MB",
        (Language::Fr, Downloading) => "🔽 Téléchargement en cours : **{}**\nFormat : {}\nTaille maximale autorisée : {}MB",
        (Language::En, DownloadComplete) => "✅ Downloaded: **{}**\nFormat: {}\nSize: {}MB",
        (Language::Fr, DownloadComplete) => "✅ Téléchargé : **{}**\nFormat : {}\nTaille : {}MB",
        (Language::En, Error) => "❌ Error: {}",
        (Language::Fr, Error) => "❌ Erreur : {}",
        (Language::En, QueuePosition) => "🎵 Added to queue. Position: {}",
        (Language::Fr, QueuePosition) => "🎵 Ajouté à la file. Position : {}",
        (Language::En, QueueEmpty) => "📭 Your download queue is empty.",
        (Language::Fr, QueueEmpty) => "📭 Votre file de téléchargement est vide.",
        (Language::En, QueueCleared) => "🗑️ Removed {} videos from your queue.",
        (Language::Fr, QueueCleared) => "🗑️ {} vidéos retirées de votre file.",
        (Language::En, PlaylistInfo) => "📑 Playlist: **{}**\nTotal tracks: {}",
        (Language::Fr, PlaylistInfo) => "📑 Playlist : **{}**\nTotal pistes : {}",
        (Language::En, StatsTitle) => "📊 Your Statistics",
        (Language::Fr, StatsTitle) => "📊 Vos Statistiques",
        (Language::En, NoStats) => "No statistics available.",
        (Language::Fr, NoStats) => "Aucune statistique disponible.",
        (Language::En, Never) => "Never",
        (Language::Fr, Never) => "Jamais",
        (Language::En, FavoriteAdded) => "⭐ Added to favorites: **{}**",
        (Language::Fr, FavoriteAdded) => "⭐ Ajouté aux favoris : **{}**",
        (Language::En, FavoriteRemoved) => "☆ Removed from favorites: **{}**",
        (Language::Fr, FavoriteRemoved) => "☆ Retiré des favoris : **{}**",
        (Language::En, NoFavorites) => "You have no favorites yet.",
        (Language::Fr, NoFavorites) => "Vous n'avez pas encore de favoris.",
        (Language::En, Cancelled) => "❌ Search cancelled.",
        (Language::Fr, Cancelled) => "❌ Recherche annulée.",
        (Language::En, VideoNotFound) => "❌ Video not found.",
        (Language::Fr, VideoNotFound) => "❌ Vidéo non trouvée.",
        (Language::En, TooLarge) => "❌ **Error**: {}\nTry a shorter video or a different format.",
        (Language::Fr, TooLarge) => "❌ **Erreur** : {}\nEssayez une vidéo plus courte ou un format différent.",
        (Language::En, Help) => "**🤖 User guide**\n\n• `/search` a title or a YouTube URL\n• The bot will show you the results\n• Select the video to download and its format\n• `/playlist` queues a whole playlist, `/next` downloads the next one\n\n_Limits_:\n• Files < {} MB\n• One download every {} seconds",
        (Language::Fr, Help) => "**🤖 Guide d'utilisation**\n\n• `/search` un titre ou une URL YouTube\n• Le bot vous proposera les résultats\n• Sélectionnez la vidéo à télécharger et son format\n• `/playlist` met une playlist en file, `/next` télécharge la suivante\n\n_Limitations_ :\n• Fichiers < {} MB\n• Téléchargement toutes les {} secondes",
        (Language::En, LanguageSet) => "🌐 Language set to English.",
        (Language::Fr, LanguageSet) => "🌐 Langue définie sur le français.",
    }
}

/// Texto con los `{}` reemplazados en orden
pub fn format(lang: Language, msg: Message, args: &[&dyn std::fmt::Display]) -> String {
    let template = text(lang, msg);
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut parts = template.split("{}").peekable();

    while let Some(part) = parts.next() {
        out.push_str(part);
        if parts.peek().is_some() {
            if let Some(arg) = args.next() {
                out.push_str(&arg.to_string());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn placeholders_are_filled_in_order() {
        assert_eq!(
            format(Language::En, Message::QueuePosition, &[&3]),
            "🎵 Added to queue. Position: 3"
        );
        assert_eq!(
            format(Language::Fr, Message::PlaylistInfo, &[&"Mix", &12]),
            "📑 Playlist : **Mix**\nTotal pistes : 12"
        );
    }

    #[test]
    fn missing_arguments_leave_gaps() {
        assert_eq!(format(Language::En, Message::Error, &[]), "❌ Error: ");
    }

    #[test]
    fn language_parsing() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!("fr".parse::<Language>().unwrap(), Language::Fr);
        assert!("de".parse::<Language>().is_err());
        assert_eq!(Language::default(), Language::Fr);
    }

    #[test]
    fn every_message_exists_in_both_languages() {
        for msg in [Message::Welcome, Message::Help, Message::TooLarge, Message::Never] {
            assert_ne!(text(Language::En, msg), text(Language::Fr, msg));
        }
    }
}
