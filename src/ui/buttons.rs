use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption},
};

use super::embeds::{format_duration, truncate};
use crate::{
    locales::{self, Language, Message},
    sources::{DownloadFormat, VideoMetadata},
};

/// IDs personalizados para los componentes
pub mod button_ids {
    pub const VIDEO_SELECT: &str = "video_select";
    pub const VIDEO_OPTION_PREFIX: &str = "video_";
    pub const FORMAT: &str = "format";
    pub const QUEUE_ADD: &str = "queue_add";
    pub const FAVORITE: &str = "favorite";
    pub const CANCEL: &str = "cancel";

    // Menú de /start
    pub const MENU_HELP: &str = "menu_help";
    pub const MENU_STATS: &str = "menu_stats";
    pub const MENU_QUEUE: &str = "menu_queue";
}

/// Acción decodificada desde el `custom_id` de un componente
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    SelectVideo(usize),
    Format { format: DownloadFormat, video_id: String },
    QueueAdd(String),
    Favorite(String),
    Cancel,
    MenuHelp,
    MenuStats,
    MenuQueue,
    Unknown,
}

impl ComponentAction {
    /// `values` son los valores elegidos en un menú de selección
    pub fn parse(custom_id: &str, values: &[String]) -> Self {
        if custom_id == button_ids::VIDEO_SELECT {
            return values
                .first()
                .and_then(|value| value.strip_prefix(button_ids::VIDEO_OPTION_PREFIX))
                .and_then(|index| index.parse().ok())
                .map_or(Self::Unknown, Self::SelectVideo);
        }

        match custom_id.split_once(':') {
            Some((button_ids::FORMAT, rest)) => match rest.split_once(':') {
                Some((format, video_id)) if !video_id.is_empty() => match format.parse() {
                    Ok(format) => Self::Format {
                        format,
                        video_id: video_id.to_string(),
                    },
                    Err(_) => Self::Unknown,
                },
                _ => Self::Unknown,
            },
            Some((button_ids::QUEUE_ADD, video_id)) if !video_id.is_empty() => {
                Self::QueueAdd(video_id.to_string())
            }
            Some((button_ids::FAVORITE, video_id)) if !video_id.is_empty() => {
                Self::Favorite(video_id.to_string())
            }
            Some(_) => Self::Unknown,
            None => match custom_id {
                button_ids::CANCEL => Self::Cancel,
                button_ids::MENU_HELP => Self::MenuHelp,
                button_ids::MENU_STATS => Self::MenuStats,
                button_ids::MENU_QUEUE => Self::MenuQueue,
                _ => Self::Unknown,
            },
        }
    }
}

pub fn format_button_id(format: DownloadFormat, video_id: &str) -> String {
    format!("{}:{}:{}", button_ids::FORMAT, format.extension(), video_id)
}

/// Botones del menú de bienvenida
pub fn start_menu(lang: Language) -> Vec<CreateActionRow> {
    let (help, stats, queue) = match lang {
        Language::En => ("Help", "My Stats", "My Queue"),
        Language::Fr => ("Aide", "Mes Stats", "Ma File"),
    };

    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::MENU_HELP)
            .label(help)
            .emoji('❓')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::MENU_STATS)
            .label(stats)
            .emoji('📊')
            .style(ButtonStyle::Primary),
        CreateButton::new(button_ids::MENU_QUEUE)
            .label(queue)
            .emoji('📥')
            .style(ButtonStyle::Secondary),
    ])]
}

/// Menú de selección con los resultados de búsqueda
pub fn video_select_menu(results: &[VideoMetadata], lang: Language) -> Vec<CreateActionRow> {
    let options = results
        .iter()
        .enumerate()
        .map(|(i, video)| {
            let label = truncate(&format!("{}. {}", i + 1, video.title), 100);
            let description = truncate(
                &format!("{} • {}", video.uploader, format_duration(video.duration())),
                100,
            );
            CreateSelectMenuOption::new(label, format!("{}{}", button_ids::VIDEO_OPTION_PREFIX, i))
                .description(description)
        })
        .collect();

    let menu = CreateSelectMenu::new(button_ids::VIDEO_SELECT, CreateSelectMenuKind::String { options })
        .placeholder(locales::text(lang, Message::SelectVideo))
        .min_values(1)
        .max_values(1);

    vec![
        CreateActionRow::SelectMenu(menu),
        CreateActionRow::Buttons(vec![cancel_button(lang)]),
    ]
}

/// Botones de formato para un video elegido
pub fn format_buttons(video_id: &str, lang: Language) -> Vec<CreateActionRow> {
    let (audio, video, queue, favorite) = match lang {
        Language::En => ("MP3 (Audio)", "MP4 (Video)", "Add to queue", "Favorite"),
        Language::Fr => ("MP3 (Audio)", "MP4 (Vidéo)", "Ajouter à la file", "Favori"),
    };

    vec![
        CreateActionRow::Buttons(vec![
            CreateButton::new(format_button_id(DownloadFormat::Mp3, video_id))
                .label(audio)
                .emoji('🎵')
                .style(ButtonStyle::Primary),
            CreateButton::new(format_button_id(DownloadFormat::Mp4, video_id))
                .label(video)
                .emoji('🎥')
                .style(ButtonStyle::Primary),
        ]),
        CreateActionRow::Buttons(vec![
            CreateButton::new(format!("{}:{}", button_ids::QUEUE_ADD, video_id))
                .label(queue)
                .emoji('📥')
                .style(ButtonStyle::Secondary),
            CreateButton::new(format!("{}:{}", button_ids::FAVORITE, video_id))
                .label(favorite)
                .emoji('⭐')
                .style(ButtonStyle::Secondary),
            cancel_button(lang),
        ]),
    ]
}

fn cancel_button(lang: Language) -> CreateButton {
    let label = match lang {
        Language::En => "Cancel",
        Language::Fr => "Annuler",
    };
    CreateButton::new(button_ids::CANCEL)
        .label(label)
        .emoji('🔙')
        .style(ButtonStyle::Danger)
}
