//! # Cache Module
//!
//! In-process cache for search results.
//!
//! Repeated or rapid-fire identical queries are answered from memory instead
//! of spawning another `yt-dlp` search. The cache is bounded in two ways:
//!
//! - **TTL**: an entry is valid while it is younger than the configured
//!   time-to-live (24 hours by default). Expired entries are removed lazily
//!   when a lookup finds them, and by the periodic maintenance sweep.
//! - **Capacity**: when an insertion pushes the cache over `max_size`
//!   (1000 by default), the entry written longest ago is evicted. Reads do
//!   not refresh an entry, so this is eviction by write time rather than LRU.
//!
//! ## Configuration
//!
//! ```env
//! CACHE_SIZE=1000             # Maximum number of cached queries
//! CACHE_TTL=86400             # Time-to-live in seconds (24 hours)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use crate::{cache::SearchCache, sources::VideoMetadata};
//! use std::time::Duration;
//!
//! fn remember(results: Vec<VideoMetadata>) {
//!     let cache = SearchCache::new(1000, Duration::from_secs(86400));
//!
//!     cache.set("daft punk", results);
//!
//!     if let Some(cached) = cache.get("daft punk") {
//!         println!("{} cached results", cached.len());
//!     }
//! }
//! ```

pub mod result_cache;

pub use result_cache::ResultCache;

use crate::sources::VideoMetadata;
use tracing::{debug, info};

/// Cache of search results keyed by the exact query string.
///
/// Results keep the relevance order returned by the backend and are shared
/// behind an [`Arc`](std::sync::Arc); the cache never mutates them.
pub type SearchCache = ResultCache<Vec<VideoMetadata>>;

impl SearchCache {
    /// Performs cache maintenance by removing expired entries.
    ///
    /// Called from the bot's maintenance task. Lookups already ignore expired
    /// entries, so this only reclaims memory held by queries nobody repeats.
    /// Returns how many entries were dropped.
    pub fn cleanup_old_entries(&self) -> usize {
        if self.is_empty() {
            debug!("📦 Cache vacío, nada que limpiar");
            return 0;
        }

        let removed = self.cleanup_expired();
        let metrics = self.metrics();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired entries", removed);
        }
        info!(
            "📦 Cache: {}/{} entries (TTL {}), hit rate {:.1}%, {} evictions",
            self.len(),
            self.capacity(),
            humantime::format_duration(self.ttl()),
            metrics.hit_rate() * 100.0,
            metrics.evictions
        );
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn video(id: &str) -> VideoMetadata {
        VideoMetadata {
            id: id.to_string(),
            title: format!("Video {}", id),
            duration: 60,
            url: crate::sources::watch_url(id),
            uploader: "Channel".to_string(),
            thumbnail: None,
            filesize: None,
        }
    }

    #[test]
    fn cleanup_on_empty_cache_is_a_no_op() {
        let cache = SearchCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.cleanup_old_entries(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn cleanup_drops_expired_searches() {
        let cache = SearchCache::new(10, Duration::from_millis(20));
        cache.set("lofi", vec![video("a")]);
        cache.set("jazz", vec![video("b")]);
        assert!(!cache.is_empty());

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.cleanup_old_entries(), 2);
        assert!(cache.is_empty());
    }
}
