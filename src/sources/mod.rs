pub mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

pub use ytdlp::YtDlpClient;

/// Backend que busca y descarga medios (yt-dlp en producción)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Busca videos, en orden de relevancia
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoMetadata>, DownloadError>;

    /// Lista las entradas de una playlist
    async fn playlist(&self, url: &str, limit: usize) -> Result<Vec<VideoMetadata>, DownloadError>;

    /// Descarga un video en el formato pedido
    async fn fetch(
        &self,
        url: &str,
        format: DownloadFormat,
        quality: AudioQuality,
    ) -> Result<DownloadedMedia, DownloadError>;
}

/// Metadata de un video devuelto por la búsqueda
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    /// Duración en segundos
    pub duration: u64,
    pub url: String,
    pub uploader: String,
    pub thumbnail: Option<String>,
    /// Tamaño estimado en bytes
    pub filesize: Option<u64>,
}

impl VideoMetadata {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration)
    }

    pub fn estimated_size_mb(&self) -> f64 {
        self.filesize.unwrap_or(0) as f64 / (1024.0 * 1024.0)
    }
}

/// Formato de salida de una descarga
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// Solo audio, extraído a mp3
    Mp3,
    /// Video con audio, hasta 720p
    Mp4,
}

impl DownloadFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DownloadFormat::Mp3 => "mp3",
            DownloadFormat::Mp4 => "mp4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DownloadFormat::Mp3 => "🎵 MP3",
            DownloadFormat::Mp4 => "🎥 MP4",
        }
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DownloadFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(DownloadFormat::Mp3),
            "mp4" => Ok(DownloadFormat::Mp4),
            other => anyhow::bail!("Formato desconocido: {}", other),
        }
    }
}

/// Calidad del audio extraído (solo MP3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl AudioQuality {
    /// Bitrate en kbps
    pub fn bitrate_kbps(self) -> u32 {
        match self {
            AudioQuality::Low => 96,
            AudioQuality::Medium => 192,
            AudioQuality::High => 320,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioQuality::Low => "low",
            AudioQuality::Medium => "medium",
            AudioQuality::High => "high",
        }
    }
}

impl FromStr for AudioQuality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(AudioQuality::Low),
            "medium" => Ok(AudioQuality::Medium),
            "high" => Ok(AudioQuality::High),
            other => anyhow::bail!("Calidad desconocida: {}", other),
        }
    }
}

/// Resultado de una descarga completada
#[derive(Debug, Clone)]
pub struct DownloadedMedia {
    pub path: PathBuf,
    pub metadata: VideoMetadata,
    pub size_mb: f64,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("yt-dlp falló: {0}")]
    Process(String),

    #[error("respuesta de yt-dlp inválida: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("el archivo es demasiado grande ({size_mb:.1}MB > {limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    #[error("la descarga superó el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("video no encontrado: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// URL canónica de un video a partir de su id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("mp3".parse::<DownloadFormat>().unwrap(), DownloadFormat::Mp3);
        assert_eq!(" MP4 ".parse::<DownloadFormat>().unwrap(), DownloadFormat::Mp4);
        assert!("flac".parse::<DownloadFormat>().is_err());
    }

    #[test]
    fn test_quality_bitrates() {
        assert_eq!(AudioQuality::Low.bitrate_kbps(), 96);
        assert_eq!(AudioQuality::default().bitrate_kbps(), 192);
        assert_eq!("high".parse::<AudioQuality>().unwrap().bitrate_kbps(), 320);
    }

    #[test]
    fn test_too_large_message() {
        let err = DownloadError::TooLarge {
            size_mb: 61.3,
            limit_mb: 50,
        };
        assert_eq!(
            err.to_string(),
            "el archivo es demasiado grande (61.3MB > 50MB)"
        );
    }
}
