use dashmap::DashMap;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Colas de descarga pendientes, una por usuario.
///
/// Cada cola es estrictamente FIFO y nunca se reordena. Las operaciones de
/// un usuario no tocan la cola de otro.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    queues: DashMap<u64, VecDeque<String>>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un video al final de la cola del usuario.
    ///
    /// Devuelve la posición (1-based) del video recién agregado.
    pub fn enqueue(&self, user_id: u64, video_id: impl Into<String>) -> usize {
        let video_id = video_id.into();
        let mut queue = self.queues.entry(user_id).or_default();
        queue.push_back(video_id.clone());
        let position = queue.len();

        info!("➕ {} agregado a la cola de {} (posición {})", video_id, user_id, position);
        position
    }

    /// Saca el video más antiguo de la cola del usuario (FIFO)
    pub fn dequeue(&self, user_id: u64) -> Option<String> {
        let next = self
            .queues
            .get_mut(&user_id)
            .and_then(|mut queue| queue.pop_front());

        // Limpiar colas vacías; remove_if evita borrar una cola que otro hilo acaba de llenar
        self.queues.remove_if(&user_id, |_, queue| queue.is_empty());

        match &next {
            Some(video_id) => info!("➡️ Siguiente descarga de {}: {}", user_id, video_id),
            None => debug!("📭 Cola vacía para {}", user_id),
        }
        next
    }

    /// Copia de la cola del usuario en orden FIFO
    pub fn pending(&self, user_id: u64) -> Vec<String> {
        self.queues
            .get(&user_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Devuelve un video al frente de la cola, p. ej. tras una descarga fallida
    pub fn requeue_front(&self, user_id: u64, video_id: impl Into<String>) -> usize {
        let video_id = video_id.into();
        let mut queue = self.queues.entry(user_id).or_default();
        queue.push_front(video_id.clone());

        info!("↩️ {} devuelto al frente de la cola de {}", video_id, user_id);
        queue.len()
    }

    /// Videos pendientes del usuario; 0 si no tiene cola
    pub fn len(&self, user_id: u64) -> usize {
        self.queues.get(&user_id).map_or(0, |queue| queue.len())
    }

    /// Vacía la cola del usuario y devuelve cuántos videos tenía
    pub fn clear(&self, user_id: u64) -> usize {
        let removed = self
            .queues
            .remove(&user_id)
            .map_or(0, |(_, queue)| queue.len());

        if removed > 0 {
            info!("🗑️ Cola de {} limpiada ({} videos)", user_id, removed);
        }
        removed
    }

    /// Número de usuarios con descargas pendientes
    pub fn active_users(&self) -> usize {
        self.queues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{sync::Arc, thread};

    #[test]
    fn dequeue_is_fifo() {
        let queue = DownloadQueue::new();
        queue.enqueue(1, "v1");
        queue.enqueue(1, "v2");
        queue.enqueue(1, "v3");

        assert_eq!(queue.dequeue(1).as_deref(), Some("v1"));
        assert_eq!(queue.dequeue(1).as_deref(), Some("v2"));
        assert_eq!(queue.dequeue(1).as_deref(), Some("v3"));
        assert_eq!(queue.dequeue(1), None);
    }

    #[test]
    fn positions_are_per_user() {
        let queue = DownloadQueue::new();
        assert_eq!(queue.enqueue(1, "v1"), 1);
        assert_eq!(queue.enqueue(1, "v2"), 2);
        assert_eq!(queue.enqueue(2, "v3"), 1);
    }

    #[test]
    fn unknown_user_yields_none() {
        let queue = DownloadQueue::new();
        assert_eq!(queue.dequeue(42), None);
        assert_eq!(queue.len(42), 0);
        assert!(queue.pending(42).is_empty());
    }

    #[test]
    fn users_are_isolated() {
        let queue = DownloadQueue::new();
        queue.enqueue(1, "a1");
        queue.enqueue(2, "b1");
        queue.enqueue(1, "a2");

        assert_eq!(queue.dequeue(2).as_deref(), Some("b1"));
        assert_eq!(queue.dequeue(2), None);
        assert_eq!(queue.pending(1), vec!["a1".to_string(), "a2".to_string()]);

        assert_eq!(queue.clear(1), 2);
        assert_eq!(queue.dequeue(1), None);
    }

    #[test]
    fn drained_queue_restarts_positions() {
        let queue = DownloadQueue::new();
        queue.enqueue(7, "v1");
        assert_eq!(queue.dequeue(7).as_deref(), Some("v1"));
        assert_eq!(queue.active_users(), 0);

        assert_eq!(queue.enqueue(7, "v2"), 1);
    }

    #[test]
    fn len_tracks_enqueue_and_dequeue() {
        let queue = DownloadQueue::new();
        queue.enqueue(3, "a");
        queue.enqueue(3, "b");
        queue.enqueue(4, "c");
        assert_eq!(queue.len(3), 2);
        assert_eq!(queue.len(4), 1);

        queue.dequeue(3);
        assert_eq!(queue.len(3), 1);
        queue.dequeue(3);
        assert_eq!(queue.len(3), 0);
    }

    #[test]
    fn requeued_video_is_next_again() {
        let queue = DownloadQueue::new();
        queue.enqueue(5, "a");
        queue.enqueue(5, "b");

        let taken = queue.dequeue(5).unwrap();
        assert_eq!(queue.requeue_front(5, taken), 2);
        assert_eq!(queue.pending(5), vec!["a".to_string(), "b".to_string()]);

        // También sobre una cola que ya se había vaciado
        assert_eq!(queue.requeue_front(6, "z"), 1);
        assert_eq!(queue.dequeue(6).as_deref(), Some("z"));
    }

    #[test]
    fn empty_video_id_and_zero_user_are_accepted() {
        let queue = DownloadQueue::new();
        assert_eq!(queue.enqueue(0, ""), 1);
        assert_eq!(queue.dequeue(0).as_deref(), Some(""));
    }

    #[test]
    fn concurrent_enqueues_keep_every_item() {
        let queue = Arc::new(DownloadQueue::new());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.enqueue(1, format!("w{}-{}", worker, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(1), 400);

        // El orden relativo de cada productor se conserva
        let pending = queue.pending(1);
        for worker in 0..4 {
            let prefix = format!("w{}-", worker);
            let seen: Vec<usize> = pending
                .iter()
                .filter_map(|id| id.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..100).collect::<Vec<_>>());
        }
    }
}
