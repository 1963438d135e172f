//! Orquestación de búsquedas y descargas.
//!
//! [`DownloadService`] es lo único que el bot ve: combina el cache de
//! búsquedas, la cola de descargas por usuario y el backend de medios.

pub mod queue;
pub mod service;

pub use service::{DownloadService, ServiceLimits};
