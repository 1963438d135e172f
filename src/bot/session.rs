use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::sources::{AudioQuality, VideoMetadata};

/// Última búsqueda que vio un usuario
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub query: String,
    pub results: Arc<Vec<VideoMetadata>>,
    pub quality: AudioQuality,
}

impl SearchSession {
    pub fn video(&self, index: usize) -> Option<&VideoMetadata> {
        self.results.get(index)
    }

    pub fn find(&self, video_id: &str) -> Option<&VideoMetadata> {
        self.results.iter().find(|video| video.id == video_id)
    }
}

/// Sesiones de búsqueda por usuario; una nueva búsqueda reemplaza la anterior
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<u64, SearchSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, user_id: u64, session: SearchSession) {
        debug!(
            "💬 Sesión de {}: '{}' ({} resultados)",
            user_id,
            session.query,
            session.results.len()
        );
        self.sessions.insert(user_id, session);
    }

    pub fn video(&self, user_id: u64, index: usize) -> Option<VideoMetadata> {
        self.sessions
            .get(&user_id)
            .and_then(|session| session.video(index).cloned())
    }

    pub fn find(&self, user_id: u64, video_id: &str) -> Option<VideoMetadata> {
        self.sessions
            .get(&user_id)
            .and_then(|session| session.find(video_id).cloned())
    }

    pub fn quality(&self, user_id: u64) -> Option<AudioQuality> {
        self.sessions.get(&user_id).map(|session| session.quality)
    }

    pub fn end(&self, user_id: u64) -> bool {
        self.sessions.remove(&user_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn video(id: &str) -> VideoMetadata {
        VideoMetadata {
            id: id.to_string(),
            title: format!("Video {}", id),
            duration: 60,
            url: crate::sources::watch_url(id),
            uploader: "Uploader".to_string(),
            thumbnail: None,
            filesize: None,
        }
    }

    fn session(ids: &[&str]) -> SearchSession {
        SearchSession {
            query: "lofi".to_string(),
            results: Arc::new(ids.iter().map(|id| video(id)).collect()),
            quality: AudioQuality::High,
        }
    }

    #[test]
    fn lookups_by_index_and_id() {
        let store = SessionStore::new();
        store.start(1, session(&["a", "b"]));

        assert_eq!(store.video(1, 1).map(|v| v.id), Some("b".to_string()));
        assert_eq!(store.video(1, 5), None);
        assert_eq!(store.find(1, "a").map(|v| v.title), Some("Video a".to_string()));
        assert_eq!(store.quality(1), Some(AudioQuality::High));
        assert_eq!(store.video(2, 0), None);
    }

    #[test]
    fn new_search_replaces_previous_session() {
        let store = SessionStore::new();
        store.start(1, session(&["a"]));
        store.start(1, session(&["z"]));

        assert_eq!(store.find(1, "a"), None);
        assert!(store.find(1, "z").is_some());
        assert!(store.end(1));
        assert!(!store.end(1));
    }
}
