use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::locales::Language;

/// Descarga registrada en el historial del usuario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub video_id: String,
    pub title: String,
    pub download_date: DateTime<Utc>,
    pub file_hash: String,
    /// Formato y calidad, p. ej. "mp3/medium"
    pub quality: String,
    pub file_size_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub video_id: String,
    pub title: String,
    pub added_date: DateTime<Utc>,
}

/// Documento JSON por usuario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: u64,
    pub username: Option<String>,
    pub language: Option<Language>,
    pub join_date: DateTime<Utc>,
    pub total_downloads: u64,
    pub total_size_mb: f64,
    pub last_download_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub downloads: Vec<DownloadRecord>,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

impl UserRecord {
    fn new(user_id: u64) -> Self {
        Self {
            user_id,
            username: None,
            language: None,
            join_date: Utc::now(),
            total_downloads: 0,
            total_size_mb: 0.0,
            last_download_date: None,
            downloads: Vec::new(),
            favorites: Vec::new(),
        }
    }

    fn stats(&self) -> UserStats {
        let unique: HashSet<&str> = self.downloads.iter().map(|d| d.video_id.as_str()).collect();
        UserStats {
            total_downloads: self.total_downloads,
            unique_downloads: unique.len() as u64,
            favorites_count: self.favorites.len() as u64,
            total_size_mb: self.total_size_mb,
            last_download_date: self.last_download_date,
        }
    }
}

/// Estadísticas agregadas de un usuario
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub total_downloads: u64,
    pub unique_downloads: u64,
    pub favorites_count: u64,
    pub total_size_mb: f64,
    pub last_download_date: Option<DateTime<Utc>>,
}

/// Manager de almacenamiento basado en archivos JSON
pub struct JsonStorage {
    data_dir: PathBuf,
    users_cache: HashMap<u64, UserRecord>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let users_dir = data_dir.join("users");
        fs::create_dir_all(&users_dir).await?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        let mut storage = Self {
            data_dir,
            users_cache: HashMap::new(),
        };

        storage.load_all_users().await?;

        Ok(storage)
    }

    /// Registra una descarga y actualiza los totales del usuario
    pub async fn record_download(
        &mut self,
        user_id: u64,
        username: Option<&str>,
        record: DownloadRecord,
    ) -> Result<()> {
        let user = self
            .users_cache
            .entry(user_id)
            .or_insert_with(|| UserRecord::new(user_id));

        if let Some(name) = username {
            user.username = Some(name.to_string());
        }
        user.total_downloads += 1;
        user.total_size_mb += record.file_size_mb;
        user.last_download_date = Some(record.download_date);

        debug!("💾 Descarga registrada para {}: {}", user_id, record.video_id);
        user.downloads.push(record);

        self.save_user(user_id).await
    }

    /// Obtiene estadísticas del usuario, si tiene registro
    pub fn get_user_stats(&self, user_id: u64) -> Option<UserStats> {
        self.users_cache.get(&user_id).map(UserRecord::stats)
    }

    /// Agrega un favorito; devuelve false si ya existía
    pub async fn add_favorite(&mut self, user_id: u64, video_id: &str, title: &str) -> Result<bool> {
        let user = self
            .users_cache
            .entry(user_id)
            .or_insert_with(|| UserRecord::new(user_id));

        if user.favorites.iter().any(|f| f.video_id == video_id) {
            return Ok(false);
        }

        user.favorites.push(Favorite {
            video_id: video_id.to_string(),
            title: title.to_string(),
            added_date: Utc::now(),
        });

        self.save_user(user_id).await?;
        info!("⭐ Favorito agregado para {}: {}", user_id, video_id);
        Ok(true)
    }

    pub async fn remove_favorite(&mut self, user_id: u64, video_id: &str) -> Result<bool> {
        let removed = match self.users_cache.get_mut(&user_id) {
            Some(user) => {
                let before = user.favorites.len();
                user.favorites.retain(|f| f.video_id != video_id);
                user.favorites.len() != before
            }
            None => false,
        };

        if removed {
            self.save_user(user_id).await?;
        }
        Ok(removed)
    }

    /// Favoritos del usuario, más recientes primero
    pub fn get_user_favorites(&self, user_id: u64) -> Vec<Favorite> {
        let mut favorites = self
            .users_cache
            .get(&user_id)
            .map(|user| user.favorites.clone())
            .unwrap_or_default();
        favorites.sort_by(|a, b| b.added_date.cmp(&a.added_date));
        favorites
    }

    /// Idioma elegido por el usuario, si lo configuró
    pub fn language(&self, user_id: u64) -> Option<Language> {
        self.users_cache.get(&user_id).and_then(|user| user.language)
    }

    pub async fn set_language(&mut self, user_id: u64, language: Language) -> Result<()> {
        self.users_cache
            .entry(user_id)
            .or_insert_with(|| UserRecord::new(user_id))
            .language = Some(language);
        self.save_user(user_id).await
    }

    /// Obtiene estadísticas de almacenamiento
    pub async fn get_storage_stats(&self) -> Result<StorageStats> {
        let mut files = fs::read_dir(self.users_dir()).await?;
        let mut file_count = 0;
        let mut total_size = 0;

        while let Some(entry) = files.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                file_count += 1;
                if let Ok(metadata) = entry.metadata().await {
                    total_size += metadata.len();
                }
            }
        }

        Ok(StorageStats {
            user_files: file_count,
            cached_users: self.users_cache.len(),
            total_downloads: self.users_cache.values().map(|u| u.total_downloads).sum(),
            total_size_bytes: total_size,
            data_dir: self.data_dir.clone(),
        })
    }

    // Métodos privados

    fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    fn get_user_file_path(&self, user_id: u64) -> PathBuf {
        self.users_dir().join(format!("user_{}.json", user_id))
    }

    async fn save_user(&self, user_id: u64) -> Result<()> {
        let Some(user) = self.users_cache.get(&user_id) else {
            return Ok(());
        };

        let file_path = self.get_user_file_path(user_id);
        let tmp_path = file_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(user)?;

        // Escribir y renombrar para no dejar archivos a medias
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &file_path).await?;
        Ok(())
    }

    async fn load_user(&self, user_id: u64) -> Result<UserRecord> {
        let content = fs::read_to_string(self.get_user_file_path(user_id)).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn load_all_users(&mut self) -> Result<()> {
        let mut files = fs::read_dir(self.users_dir()).await?;
        let mut loaded_count = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let Some(user_id) = path
                .file_stem()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("user_"))
                .and_then(|id| id.parse::<u64>().ok())
            else {
                continue;
            };

            match self.load_user(user_id).await {
                Ok(user) => {
                    self.users_cache.insert(user_id, user);
                    loaded_count += 1;
                }
                Err(e) => {
                    warn!("Error cargando datos del usuario {}: {}", user_id, e);
                }
            }
        }

        if loaded_count > 0 {
            info!("📂 Cargados {} usuarios", loaded_count);
        }

        Ok(())
    }
}

/// Estadísticas de almacenamiento
#[derive(Debug)]
pub struct StorageStats {
    pub user_files: usize,
    pub cached_users: usize,
    pub total_downloads: u64,
    pub total_size_bytes: u64,
    pub data_dir: PathBuf,
}

impl std::fmt::Display for StorageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "📊 Storage Stats: {} ({} user files, {} in memory, {} downloads, {:.2} KB)",
            self.data_dir.display(),
            self.user_files,
            self.cached_users,
            self.total_downloads,
            self.total_size_bytes as f64 / 1024.0
        )
    }
}
