use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::debug;

/// Entrada del cache con su instante de inserción
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    /// Orden de inserción, desempata expulsiones con el mismo instante
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

/// Cache de resultados con TTL y capacidad máxima.
///
/// Cuando se supera `max_size` se expulsa la entrada escrita hace más tiempo;
/// las lecturas no renuevan la entrada. Todo el estado vive bajo un único
/// mutex, de modo que una expulsión nunca se observa a medias.
#[derive(Debug)]
pub struct ResultCache<V> {
    inner: Mutex<Inner<V>>,
    max_size: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired_removals: AtomicU64,
}

impl<V> ResultCache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expired_removals: AtomicU64::new(0),
        }
    }

    /// Devuelve los resultados de `query` si siguen vigentes
    pub fn get(&self, query: &str) -> Option<Arc<V>> {
        self.get_at(query, Instant::now())
    }

    /// Guarda (o reemplaza) los resultados de `query`
    pub fn set(&self, query: impl Into<String>, value: V) {
        self.set_at(query.into(), value, Instant::now());
    }

    pub(crate) fn get_at(&self, query: &str, now: Instant) -> Option<Arc<V>> {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(query) {
            Some(entry) if !entry.is_expired(now, self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {:?}", query);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(query);
            self.expired_removals.fetch_add(1, Ordering::Relaxed);
            debug!("Entrada expirada eliminada: {:?}", query);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Guarda resultados ya compartidos, sin copiarlos
    pub fn set_shared(&self, query: impl Into<String>, value: Arc<V>) {
        self.insert_entry(query.into(), value, Instant::now());
    }

    pub(crate) fn set_at(&self, query: String, value: V, now: Instant) {
        self.insert_entry(query, Arc::new(value), now);
    }

    fn insert_entry(&self, query: String, value: Arc<V>, now: Instant) {
        let mut inner = self.inner.lock();

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            query,
            CacheEntry {
                value,
                inserted_at: now,
                seq,
            },
        );

        while inner.entries.len() > self.max_size {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.inserted_at, entry.seq))
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    inner.entries.remove(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!("Entrada expulsada por capacidad: {:?}", key);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Limpia entradas expiradas y retorna el número de elementos removidos
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    pub(crate) fn cleanup_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        let ttl = self.ttl;
        inner.entries.retain(|_, entry| !entry.is_expired(now, ttl));

        let removed = before - inner.entries.len();
        if removed > 0 {
            self.expired_removals
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Limpiadas {} entradas expiradas del cache", removed);
        }

        removed
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired_removals: self.expired_removals.load(Ordering::Relaxed),
        }
    }
}

/// Métricas básicas del cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired_removals: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn miss_then_hit() {
        let cache: ResultCache<Vec<&str>> = ResultCache::new(10, DAY);
        assert!(cache.get("x").is_none());

        cache.set("x", vec!["a", "b"]);
        assert_eq!(cache.get("x").as_deref(), Some(&vec!["a", "b"]));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = ResultCache::new(10, DAY);
        let t0 = Instant::now();
        cache.set_at("q".to_string(), vec![1, 2, 3], t0);

        assert_eq!(
            cache.get_at("q", t0 + DAY - secs(1)).as_deref(),
            Some(&vec![1, 2, 3])
        );
        assert!(cache.get_at("q", t0 + DAY + secs(1)).is_none());
    }

    #[test]
    fn expired_lookup_removes_entry() {
        let cache = ResultCache::new(10, secs(60));
        let t0 = Instant::now();
        cache.set_at("q".to_string(), 1, t0);
        assert_eq!(cache.len(), 1);

        assert!(cache.get_at("q", t0 + secs(61)).is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.metrics().expired_removals, 1);

        // Una lectura anterior ya no ve la entrada borrada
        assert!(cache.get_at("q", t0).is_none());
    }

    #[test]
    fn keys_are_case_sensitive() {
        let cache = ResultCache::new(10, DAY);
        cache.set("Daft Punk", 1);
        assert!(cache.get("daft punk").is_none());
        assert_eq!(cache.get("Daft Punk").as_deref(), Some(&1));
    }

    #[test]
    fn empty_query_is_a_valid_key() {
        let cache = ResultCache::new(10, DAY);
        cache.set("", 7);
        assert_eq!(cache.get("").as_deref(), Some(&7));
    }

    #[test]
    fn overwrite_replaces_value_and_resets_age() {
        let cache = ResultCache::new(10, secs(100));
        let t0 = Instant::now();
        cache.set_at("q".to_string(), "first", t0);
        cache.set_at("q".to_string(), "second", t0 + secs(50));

        assert_eq!(cache.len(), 1);
        // 120s después del primer set, 70s después del segundo
        assert_eq!(cache.get_at("q", t0 + secs(120)).as_deref(), Some(&"second"));
        assert!(cache.get_at("q", t0 + secs(151)).is_none());
    }

    #[test]
    fn capacity_evicts_oldest_insertion() {
        let cache = ResultCache::new(2, DAY);
        let t0 = Instant::now();
        cache.set_at("a".to_string(), 1, t0);
        cache.set_at("b".to_string(), 2, t0 + secs(1));
        cache.set_at("c".to_string(), 3, t0 + secs(2));

        let now = t0 + secs(3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", now).is_none());
        assert_eq!(cache.get_at("b", now).as_deref(), Some(&2));
        assert_eq!(cache.get_at("c", now).as_deref(), Some(&3));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn reads_do_not_protect_from_eviction() {
        let cache = ResultCache::new(2, DAY);
        let t0 = Instant::now();
        cache.set_at("a".to_string(), 1, t0);
        cache.set_at("b".to_string(), 2, t0 + secs(1));

        // Leer "a" no la convierte en la más reciente
        assert!(cache.get_at("a", t0 + secs(2)).is_some());
        cache.set_at("c".to_string(), 3, t0 + secs(3));

        assert!(cache.get_at("a", t0 + secs(4)).is_none());
        assert!(cache.get_at("b", t0 + secs(4)).is_some());
    }

    #[test]
    fn inserting_max_plus_one_leaves_max_entries() {
        let max = 50;
        let cache = ResultCache::new(max, DAY);
        let t0 = Instant::now();
        for i in 0..=max as u64 {
            cache.set_at(format!("query-{}", i), i, t0 + secs(i));
        }

        assert_eq!(cache.len(), max);
        assert!(cache.get_at("query-0", t0 + secs(100)).is_none());
        assert!(cache.get_at("query-1", t0 + secs(100)).is_some());
    }

    #[test]
    fn equal_timestamps_evict_first_written() {
        let cache = ResultCache::new(2, DAY);
        let t0 = Instant::now();
        cache.set_at("a".to_string(), 1, t0);
        cache.set_at("b".to_string(), 2, t0);
        cache.set_at("c".to_string(), 3, t0);

        assert!(cache.get_at("a", t0).is_none());
        assert!(cache.get_at("b", t0).is_some());
        assert!(cache.get_at("c", t0).is_some());
    }

    #[test]
    fn cleanup_keeps_fresh_entries() {
        let cache = ResultCache::new(10, secs(60));
        let t0 = Instant::now();
        cache.set_at("old".to_string(), 1, t0);
        cache.set_at("new".to_string(), 2, t0 + secs(50));

        assert_eq!(cache.cleanup_expired_at(t0 + secs(70)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("new", t0 + secs(70)).as_deref(), Some(&2));
    }

    #[test]
    fn metrics_track_hits_and_misses() {
        let cache = ResultCache::new(10, DAY);
        cache.get("missing");
        cache.set("q", 1);
        cache.get("q");
        cache.get("q");

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.misses, 1);
        assert!((metrics.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn concurrent_writers_never_exceed_capacity() {
        let cache = Arc::new(ResultCache::new(16, DAY));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        cache.set(format!("w{}-{}", worker, i), i);
                        assert!(cache.len() <= 16);
                        cache.get(&format!("w{}-{}", worker, i / 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 16);
    }
}
