use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
    time::{Duration, SystemTime},
};
use tokio::{fs, sync::Semaphore};
use tracing::{debug, error, info, warn};

use super::{watch_url, AudioQuality, DownloadError, DownloadFormat, DownloadedMedia, MediaBackend, VideoMetadata};

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/|playlist\?list=)|youtu\.be/|music\.youtube\.com/)",
    )
    .expect("regex de YouTube inválida")
});

/// Configuración del cliente yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpSettings {
    pub binary: String,
    pub download_dir: PathBuf,
    pub cookies_file: Option<PathBuf>,
    pub max_file_size_mb: u64,
}

/// Cliente que ejecuta yt-dlp como proceso hijo
pub struct YtDlpClient {
    settings: YtDlpSettings,
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp (`--dump-json`)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    #[serde(default)]
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
}

impl From<YtDlpInfo> for VideoMetadata {
    fn from(info: YtDlpInfo) -> Self {
        let url = info
            .webpage_url
            .or(info.url)
            .unwrap_or_else(|| watch_url(&info.id));

        Self {
            title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
            duration: info.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
            uploader: info
                .uploader
                .or(info.channel)
                .unwrap_or_else(|| "Unknown".to_string()),
            thumbnail: info.thumbnail,
            filesize: info
                .filesize
                .or(info.filesize_approx.map(|size| size.max(0.0) as u64)),
            id: info.id,
            url,
        }
    }
}

impl YtDlpClient {
    pub fn new(settings: YtDlpSettings) -> Self {
        Self {
            settings,
            // Limitar procesos concurrentes para evitar rate limiting
            rate_limiter: Semaphore::new(3),
        }
    }

    /// Verifica si una URL es válida para YouTube
    pub fn is_youtube_url(url: &str) -> bool {
        YOUTUBE_URL.is_match(url)
    }

    /// ¿El texto es una URL http(s)?
    pub fn is_url(text: &str) -> bool {
        url::Url::parse(text.trim())
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    /// ¿La URL apunta a una playlist (`list=`)?
    pub fn is_playlist_url(text: &str) -> bool {
        url::Url::parse(text.trim())
            .map(|url| url.query_pairs().any(|(key, _)| key == "list"))
            .unwrap_or(false)
    }

    /// Verifica que yt-dlp y ffmpeg estén disponibles
    pub async fn verify_dependencies(&self) -> anyhow::Result<()> {
        let yt_dlp = Command::new(&self.settings.binary)
            .arg("--version")
            .output()
            .await?;
        let ffmpeg = Command::new("ffmpeg").arg("-version").output().await?;

        if yt_dlp.status.success() && ffmpeg.status.success() {
            info!(
                "✅ yt-dlp {} disponible",
                String::from_utf8_lossy(&yt_dlp.stdout).trim()
            );
            Ok(())
        } else {
            anyhow::bail!("Dependencias faltantes (yt-dlp / ffmpeg)");
        }
    }

    /// Obtiene información de una URL específica
    pub async fn get_info(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        debug!("📊 Obteniendo info de: {}", url);

        let mut args = self.base_args();
        args.extend(["--no-playlist", "--dump-json", url].map(String::from));
        let stdout = self.run(&args).await?;

        let info: YtDlpInfo = serde_json::from_str(stdout.trim())?;
        Ok(info.into())
    }

    /// Argumentos comunes a todas las invocaciones
    fn base_args(&self) -> Vec<String> {
        let mut args = vec!["--no-warnings".to_string(), "--geo-bypass".to_string()];

        match &self.settings.cookies_file {
            Some(path) if path.exists() => {
                debug!("🍪 Usando cookies de: {}", path.display());
                args.push("--cookies".to_string());
                args.push(path.display().to_string());
            }
            _ => {}
        }

        args
    }

    /// Argumentos de descarga según formato y calidad
    fn download_args(&self, url: &str, format: DownloadFormat, quality: AudioQuality) -> Vec<String> {
        let mut args = self.base_args();
        let template = self.settings.download_dir.join("%(id)s.%(ext)s");

        args.extend(
            [
                "--no-playlist",
                "--no-overwrites",
                "--quiet",
                "--max-filesize",
            ]
            .map(String::from),
        );
        args.push(format!("{}M", self.settings.max_file_size_mb));
        args.push("-o".to_string());
        args.push(template.display().to_string());
        args.push("--print".to_string());
        args.push("after_move:filepath".to_string());

        match format {
            DownloadFormat::Mp3 => {
                args.extend(
                    ["-f", "bestaudio/best", "-x", "--audio-format", "mp3", "--audio-quality"]
                        .map(String::from),
                );
                args.push(format!("{}K", quality.bitrate_kbps()));
            }
            DownloadFormat::Mp4 => {
                args.extend(
                    ["-f", "best[height<=720]/bestvideo[height<=720]+bestaudio", "--merge-output-format", "mp4"]
                        .map(String::from),
                );
            }
        }

        args.push(url.to_string());
        args
    }

    /// Ejecuta yt-dlp y devuelve stdout
    async fn run(&self, args: &[String]) -> Result<String, DownloadError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| DownloadError::Process(e.to_string()))?;

        let output = Command::new(&self.settings.binary)
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Process(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn expected_path(&self, video_id: &str, format: DownloadFormat) -> PathBuf {
        self.settings
            .download_dir
            .join(format!("{}.{}", video_id, format.extension()))
    }

    async fn download_file(
        &self,
        metadata: &VideoMetadata,
        format: DownloadFormat,
        quality: AudioQuality,
    ) -> Result<(PathBuf, f64), DownloadError> {
        let args = self.download_args(&metadata.url, format, quality);
        let stdout = self.run(&args).await?;

        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.expected_path(&metadata.id, format));

        if !path.exists() {
            // --max-filesize hace que yt-dlp omita la descarga sin fallar
            let estimated = metadata.estimated_size_mb();
            if estimated > self.settings.max_file_size_mb as f64 {
                return Err(DownloadError::TooLarge {
                    size_mb: estimated,
                    limit_mb: self.settings.max_file_size_mb,
                });
            }
            return Err(DownloadError::NotFound(metadata.url.clone()));
        }

        let size_mb = fs::metadata(&path).await?.len() as f64 / (1024.0 * 1024.0);
        if size_mb > self.settings.max_file_size_mb as f64 {
            remove_quietly(&path).await;
            return Err(DownloadError::TooLarge {
                size_mb,
                limit_mb: self.settings.max_file_size_mb,
            });
        }

        Ok((path, size_mb))
    }
}

#[async_trait]
impl MediaBackend for YtDlpClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoMetadata>, DownloadError> {
        info!("🔍 Buscando en YouTube: {}", query);

        let mut args = self.base_args();
        args.extend(["--no-playlist", "--dump-json", "--skip-download"].map(String::from));
        if Self::is_url(query) {
            // Una URL directa devuelve solo ese video
            args.push(query.trim().to_string());
        } else {
            args.push(format!("ytsearch{}:{}", limit, query));
        }

        let stdout = self.run(&args).await?;
        let results = parse_entries(&stdout);
        debug!("🔍 {} resultados para: {}", results.len(), query);
        Ok(results)
    }

    async fn playlist(&self, url: &str, limit: usize) -> Result<Vec<VideoMetadata>, DownloadError> {
        info!("📋 Obteniendo playlist: {}", url);

        let mut args = self.base_args();
        args.extend(["--flat-playlist", "--dump-json", "--playlist-end"].map(String::from));
        args.push(limit.to_string());
        args.push(url.to_string());

        let stdout = self.run(&args).await?;
        Ok(parse_entries(&stdout))
    }

    async fn fetch(
        &self,
        url: &str,
        format: DownloadFormat,
        quality: AudioQuality,
    ) -> Result<DownloadedMedia, DownloadError> {
        let metadata = self.get_info(url).await?;
        info!("⬇️ Descargando {} como {}: {}", metadata.id, format, metadata.title);

        match self.download_file(&metadata, format, quality).await {
            Ok((path, size_mb)) => {
                info!("✅ Descargado {} ({:.1}MB)", path.display(), size_mb);
                Ok(DownloadedMedia {
                    path,
                    metadata,
                    size_mb,
                })
            }
            Err(e) => {
                remove_quietly(&self.expected_path(&metadata.id, format)).await;
                error!("❌ Error de descarga para {}: {}", url, e);
                Err(e)
            }
        }
    }
}

/// Una entrada JSON por línea; las líneas inválidas se ignoran
fn parse_entries(stdout: &str) -> Vec<VideoMetadata> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<YtDlpInfo>(line) {
            Ok(info) => Some(info.into()),
            Err(e) => {
                debug!("Línea de yt-dlp ignorada: {}", e);
                None
            }
        })
        .collect()
}

async fn remove_quietly(path: &Path) {
    if fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = fs::remove_file(path).await {
            warn!("No se pudo eliminar {}: {}", path.display(), e);
        }
    }
}

/// Hash SHA-256 del archivo, usado para deduplicar el historial
pub async fn file_hash(path: &Path) -> Result<String, DownloadError> {
    let bytes = fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Elimina archivos del directorio de descargas más viejos que `max_age`
pub async fn cleanup_old_files(dir: &Path, max_age: Duration) -> usize {
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error de limpieza en {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Error de limpieza en {}: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        let modified = match entry.metadata().await.and_then(|m| {
            if m.is_file() {
                m.modified()
            } else {
                Err(std::io::Error::other("no es un archivo"))
            }
        }) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        if modified <= cutoff {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("No se pudo eliminar {}: {}", path.display(), e),
            }
        }
    }

    if removed > 0 {
        info!("🧹 Eliminados {} archivos antiguos de {}", removed, dir.display());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client(dir: &Path) -> YtDlpClient {
        YtDlpClient::new(YtDlpSettings {
            binary: "yt-dlp".to_string(),
            download_dir: dir.to_path_buf(),
            cookies_file: None,
            max_file_size_mb: 50,
        })
    }

    #[test]
    fn test_youtube_url_detection() {
        assert!(YtDlpClient::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YtDlpClient::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YtDlpClient::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YtDlpClient::is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn test_url_and_playlist_detection() {
        assert!(YtDlpClient::is_url("https://youtu.be/abc"));
        assert!(!YtDlpClient::is_url("daft punk around the world"));
        assert!(!YtDlpClient::is_url("ftp://example.com/file"));

        assert!(YtDlpClient::is_playlist_url(
            "https://www.youtube.com/playlist?list=PL123"
        ));
        assert!(!YtDlpClient::is_playlist_url(
            "https://www.youtube.com/watch?v=abc"
        ));
    }

    #[test]
    fn test_parse_search_output() {
        let stdout = concat!(
            r#"{"id":"abc","title":"First","duration":215.0,"uploader":"Chan","thumbnail":"https://i.ytimg.com/abc.jpg","webpage_url":"https://www.youtube.com/watch?v=abc","filesize":1048576}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"id":"def","title":"Second","url":"https://www.youtube.com/watch?v=def","filesize_approx":2097152.0}"#,
            "\n",
        );

        let results = parse_entries(stdout);
        assert_eq!(results.len(), 2);

        assert_eq!(
            results[0],
            VideoMetadata {
                id: "abc".to_string(),
                title: "First".to_string(),
                duration: 215,
                url: "https://www.youtube.com/watch?v=abc".to_string(),
                uploader: "Chan".to_string(),
                thumbnail: Some("https://i.ytimg.com/abc.jpg".to_string()),
                filesize: Some(1_048_576),
            }
        );
        assert_eq!(results[1].uploader, "Unknown");
        assert_eq!(results[1].duration, 0);
        assert_eq!(results[1].filesize, Some(2_097_152));
    }

    #[test]
    fn test_missing_url_falls_back_to_watch_url() {
        let results = parse_entries(r#"{"id":"xyz","title":"T"}"#);
        assert_eq!(results[0].url, "https://www.youtube.com/watch?v=xyz");
    }

    #[test]
    fn test_download_args_per_format() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path());

        let mp3 = client.download_args("https://youtu.be/a", DownloadFormat::Mp3, AudioQuality::High);
        assert!(mp3.windows(2).any(|w| w[0] == "--audio-quality" && w[1] == "320K"));
        assert!(mp3.windows(2).any(|w| w[0] == "--max-filesize" && w[1] == "50M"));
        assert_eq!(mp3.last().map(String::as_str), Some("https://youtu.be/a"));

        let mp4 = client.download_args("https://youtu.be/a", DownloadFormat::Mp4, AudioQuality::High);
        assert!(mp4.windows(2).any(|w| w[0] == "--merge-output-format" && w[1] == "mp4"));
        assert!(!mp4.iter().any(|arg| arg == "--audio-quality"));
    }

    #[tokio::test]
    async fn test_file_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(
            file_hash(&path).await.unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("old.mp3");
        let fresh = dir.path().join("new.mp3");
        std::fs::write(&stale, b"old").unwrap();
        std::fs::write(&fresh, b"new").unwrap();

        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 3600);
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        let removed = cleanup_old_files(dir.path(), Duration::from_secs(3600)).await;
        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_cleanup_missing_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            cleanup_old_files(&dir.path().join("missing"), Duration::ZERO).await,
            0
        );
    }
}
