use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::{locales::Language, sources::AudioQuality};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Paths
    pub download_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cookies_file: PathBuf,
    pub ytdlp_path: String,

    // Límites
    pub max_file_size_mb: u64,
    pub max_search_results: usize,
    pub max_playlist_size: usize,
    pub rate_limit_seconds: u64, // Solo informativo, se muestra en /help

    // Cache
    pub cache_size: usize,
    pub cache_ttl: Duration,

    // Mantenimiento
    pub cleanup_interval: Duration,
    pub file_max_age: Duration,
    pub download_timeout: Duration,

    // Preferencias
    pub default_language: Language,
    pub default_quality: AudioQuality,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,
            application_id: std::env::var("APPLICATION_ID")
                .context("APPLICATION_ID no definido")?
                .parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Paths
            download_dir: env_or("DOWNLOAD_DIR", "./downloads").into(),
            data_dir: env_or("DATA_DIR", "./data").into(),
            cookies_file: env_or("COOKIES_FILE", "cookies.txt").into(),
            ytdlp_path: env_or("YTDLP_PATH", "yt-dlp"),

            // Límites
            max_file_size_mb: parse_env("MAX_FILE_SIZE_MB", 50)?,
            max_search_results: parse_env("MAX_SEARCH_RESULTS", 5)?,
            max_playlist_size: parse_env("MAX_PLAYLIST_SIZE", 50)?,
            rate_limit_seconds: parse_env("RATE_LIMIT_SECONDS", 30)?,

            // Cache
            cache_size: parse_env("CACHE_SIZE", 1000)?,
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL", 24 * 60 * 60)?),

            // Mantenimiento
            cleanup_interval: Duration::from_secs(parse_env("CLEANUP_INTERVAL", 3600)?),
            file_max_age: Duration::from_secs(parse_env("FILE_MAX_AGE", 3600)?),
            download_timeout: Duration::from_secs(parse_env("DOWNLOAD_TIMEOUT", 600)?),

            // Preferencias
            default_language: env_or("DEFAULT_LANGUAGE", "fr").parse()?,
            default_quality: env_or("DEFAULT_QUALITY", "medium").parse()?,
        };

        // Create directories if they don't exist
        std::fs::create_dir_all(&config.download_dir)?;
        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Cache size and TTL must be greater than 0
    /// - Search results must fit a Discord select menu (1..=25)
    /// - File size limit, playlist size and intervals must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.cache_size == 0 {
            anyhow::bail!("Cache size must be greater than 0");
        }

        if self.cache_ttl.is_zero() {
            anyhow::bail!("Cache TTL must be greater than 0");
        }

        if !(1..=25).contains(&self.max_search_results) {
            anyhow::bail!(
                "Max search results must be between 1 and 25, got: {}",
                self.max_search_results
            );
        }

        if self.max_file_size_mb == 0 {
            anyhow::bail!("Max file size must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.cleanup_interval.is_zero() || self.download_timeout.is_zero() {
            anyhow::bail!("Cleanup interval and download timeout must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Cache: {} entries, TTL {}\n  \
            Limits: {}MB files, {} results, {} playlist entries, timeout {}\n  \
            Cleanup: every {}, files older than {}\n  \
            Defaults: language={}, quality={}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.cache_size,
            humantime::format_duration(self.cache_ttl),
            self.max_file_size_mb,
            self.max_search_results,
            self.max_playlist_size,
            humantime::format_duration(self.download_timeout),
            humantime::format_duration(self.cleanup_interval),
            humantime::format_duration(self.file_max_age),
            self.default_language.code(),
            self.default_quality.as_str(),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            download_dir: "./downloads".into(),
            data_dir: "./data".into(),
            cookies_file: "cookies.txt".into(),
            ytdlp_path: "yt-dlp".to_string(),

            max_file_size_mb: 50,
            max_search_results: 5,
            max_playlist_size: 50,
            rate_limit_seconds: 30,

            cache_size: 1000,
            cache_ttl: Duration::from_secs(24 * 60 * 60),

            cleanup_interval: Duration::from_secs(3600), // 1 hora
            file_max_age: Duration::from_secs(3600),
            download_timeout: Duration::from_secs(600),

            default_language: Language::Fr,
            default_quality: AudioQuality::Medium,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val,
        _ => default.to_string(),
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .with_context(|| format!("Valor inválido para {}: {}", key, val)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_size, 1000);
        assert_eq!(config.cache_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn zero_cache_is_rejected() {
        let config = Config {
            cache_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn search_results_must_fit_select_menu() {
        let config = Config {
            max_search_results: 26,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn summary_hides_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..Config::default()
        };
        let summary = config.summary();
        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("TTL 1day"));
    }
}
