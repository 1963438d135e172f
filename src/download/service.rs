use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::queue::DownloadQueue;
use crate::{
    cache::SearchCache,
    sources::{AudioQuality, DownloadError, DownloadFormat, DownloadedMedia, MediaBackend, VideoMetadata},
};

/// Límites que el servicio aplica al backend
#[derive(Debug, Clone)]
pub struct ServiceLimits {
    pub max_search_results: usize,
    pub max_playlist_size: usize,
    pub download_timeout: Duration,
}

/// Punto de entrada del bot hacia el cache, la cola y el backend.
///
/// Una sola instancia vive durante todo el proceso y se comparte entre todas
/// las sesiones de chat.
pub struct DownloadService {
    cache: Arc<SearchCache>,
    queue: DownloadQueue,
    backend: Arc<dyn MediaBackend>,
    limits: ServiceLimits,
}

impl DownloadService {
    pub fn new(cache: Arc<SearchCache>, backend: Arc<dyn MediaBackend>, limits: ServiceLimits) -> Self {
        Self {
            cache,
            queue: DownloadQueue::new(),
            backend,
            limits,
        }
    }

    /// Busca en el cache y, si no hay entrada vigente, en el backend.
    ///
    /// Solo se guardan resultados no vacíos; los errores del backend se
    /// propagan sin tocar el cache.
    pub async fn search(&self, query: &str) -> Result<Arc<Vec<VideoMetadata>>, DownloadError> {
        if let Some(results) = self.cache.get(query) {
            debug!("🎯 Resultados en cache para: {}", query);
            return Ok(results);
        }

        info!("🔍 Buscando: {}", query);
        let results = self
            .backend
            .search(query, self.limits.max_search_results)
            .await?;

        let results = Arc::new(results);
        if !results.is_empty() {
            self.cache.set_shared(query, results.clone());
        }
        Ok(results)
    }

    pub fn enqueue(&self, user_id: u64, video_id: &str) -> usize {
        self.queue.enqueue(user_id, video_id)
    }

    pub fn next_download(&self, user_id: u64) -> Option<String> {
        self.queue.dequeue(user_id)
    }

    /// Devuelve al frente un video cuya descarga no se completó
    pub fn requeue(&self, user_id: u64, video_id: &str) -> usize {
        self.queue.requeue_front(user_id, video_id)
    }

    pub fn pending(&self, user_id: u64) -> Vec<String> {
        self.queue.pending(user_id)
    }

    pub fn clear_queue(&self, user_id: u64) -> usize {
        self.queue.clear(user_id)
    }

    /// Encola todas las entradas de una playlist, en orden.
    ///
    /// Devuelve los títulos junto con la posición que recibió cada uno.
    pub async fn enqueue_playlist(
        &self,
        user_id: u64,
        url: &str,
    ) -> Result<Vec<(String, usize)>, DownloadError> {
        let entries = self
            .backend
            .playlist(url, self.limits.max_playlist_size)
            .await?;

        if entries.is_empty() {
            warn!("📋 Playlist vacía: {}", url);
        }

        Ok(entries
            .into_iter()
            .take(self.limits.max_playlist_size)
            .map(|entry| {
                let position = self.queue.enqueue(user_id, entry.id.as_str());
                (entry.title, position)
            })
            .collect())
    }

    /// Descarga un video con el tiempo límite configurado
    pub async fn fetch(
        &self,
        url: &str,
        format: DownloadFormat,
        quality: AudioQuality,
    ) -> Result<DownloadedMedia, DownloadError> {
        let timeout = self.limits.download_timeout;
        match tokio::time::timeout(timeout, self.backend.fetch(url, format, quality)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("⏱️ Descarga cancelada por tiempo límite: {}", url);
                Err(DownloadError::Timeout(timeout))
            }
        }
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn queue(&self) -> &DownloadQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockMediaBackend;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn video(id: &str) -> VideoMetadata {
        VideoMetadata {
            id: id.to_string(),
            title: format!("Video {}", id),
            duration: 215,
            url: crate::sources::watch_url(id),
            uploader: "Uploader".to_string(),
            thumbnail: None,
            filesize: Some(3 * 1024 * 1024),
        }
    }

    fn limits() -> ServiceLimits {
        ServiceLimits {
            max_search_results: 5,
            max_playlist_size: 3,
            download_timeout: Duration::from_secs(5),
        }
    }

    fn service(backend: MockMediaBackend) -> DownloadService {
        let cache = Arc::new(SearchCache::new(100, Duration::from_secs(86400)));
        DownloadService::new(cache, Arc::new(backend), limits())
    }

    #[tokio::test]
    async fn search_hits_backend_once() {
        let mut backend = MockMediaBackend::new();
        backend
            .expect_search()
            .with(eq("lofi"), eq(5usize))
            .times(1)
            .returning(|_, _| Ok(vec![video("a"), video("b")]));

        let service = service(backend);
        let first = service.search("lofi").await.unwrap();
        let second = service.search("lofi").await.unwrap();

        assert_eq!(*first, vec![video("a"), video("b")]);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn backend_errors_are_not_cached() {
        let mut backend = MockMediaBackend::new();
        let mut calls = 0;
        backend.expect_search().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(DownloadError::Process("network down".to_string()))
            } else {
                Ok(vec![video("a")])
            }
        });

        let service = service(backend);
        assert!(matches!(
            service.search("q").await,
            Err(DownloadError::Process(_))
        ));
        assert!(service.cache().get("q").is_none());
        assert_eq!(service.search("q").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_results_are_not_cached() {
        let mut backend = MockMediaBackend::new();
        backend
            .expect_search()
            .times(2)
            .returning(|_, _| Ok(Vec::new()));

        let service = service(backend);
        assert!(service.search("nothing").await.unwrap().is_empty());
        assert!(service.search("nothing").await.unwrap().is_empty());
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn playlist_entries_are_queued_in_order() {
        let mut backend = MockMediaBackend::new();
        backend
            .expect_playlist()
            .with(eq("https://www.youtube.com/playlist?list=PL1"), eq(3usize))
            .returning(|_, _| Ok(vec![video("a"), video("b"), video("c"), video("d")]));

        let service = service(backend);
        service.enqueue(9, "first");
        let queued = service
            .enqueue_playlist(9, "https://www.youtube.com/playlist?list=PL1")
            .await
            .unwrap();

        let positions: Vec<usize> = queued.iter().map(|(_, pos)| *pos).collect();
        assert_eq!(positions, vec![2, 3, 4]);
        assert_eq!(service.next_download(9).as_deref(), Some("first"));
        assert_eq!(service.next_download(9).as_deref(), Some("a"));
        assert_eq!(service.pending(9), vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn failed_next_download_can_be_requeued() {
        let service = service(MockMediaBackend::new());
        service.enqueue(3, "a");
        service.enqueue(3, "b");

        let next = service.next_download(3).unwrap();
        assert_eq!(service.requeue(3, &next), 2);
        assert_eq!(service.next_download(3).as_deref(), Some("a"));
        assert_eq!(service.queue().len(3), 1);
    }

    #[tokio::test]
    async fn queue_does_not_touch_cache() {
        let mut backend = MockMediaBackend::new();
        backend
            .expect_search()
            .times(1)
            .returning(|_, _| Ok(vec![video("a")]));

        let service = service(backend);
        service.search("q").await.unwrap();
        service.enqueue(1, "a");
        service.enqueue(2, "b");
        assert_eq!(service.clear_queue(1), 1);

        assert_eq!(service.cache().len(), 1);
        assert_eq!(service.next_download(2).as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn fetch_passes_format_through() {
        let mut backend = MockMediaBackend::new();
        backend
            .expect_fetch()
            .with(
                eq("https://www.youtube.com/watch?v=a"),
                eq(DownloadFormat::Mp4),
                eq(AudioQuality::High),
            )
            .returning(|_, _, _| {
                Ok(DownloadedMedia {
                    path: PathBuf::from("/tmp/a.mp4"),
                    metadata: video("a"),
                    size_mb: 12.5,
                })
            });

        let service = service(backend);
        let media = service
            .fetch("https://www.youtube.com/watch?v=a", DownloadFormat::Mp4, AudioQuality::High)
            .await
            .unwrap();
        assert_eq!(media.path, PathBuf::from("/tmp/a.mp4"));
        assert_eq!(media.metadata.id, "a");
    }
}
