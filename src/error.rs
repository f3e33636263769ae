//! # Errores del servidor
//! src/error.rs
//!
//! Un enum por frontera: configuración, dataset, motor de análisis,
//! almacén de resultados, fachada de jobs y servidor TCP.

use std::path::PathBuf;
use thiserror::Error;

/// Configuración inválida; aborta el arranque
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be >= 1")]
    NoWorkers,

    #[error("worker idle timeout must be > 0")]
    ZeroIdleTimeout,

    #[error("max body size must be > 0")]
    ZeroBodyLimit,

    #[error("read timeout must be > 0")]
    ZeroReadTimeout,

    #[error("log retention must keep at least one file")]
    ZeroLogFiles,
}

/// Fallos al cargar el CSV
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// Fallos de un cálculo individual
///
/// Una consulta sin filas no es un fallo: produce un resultado vacío.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("analysis failed: {0}")]
    Computation(String),
}

/// Fallos de I/O del almacén de resultados
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("result store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fallos de `JobManager::status`
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Invalid job_id")]
    UnknownJob,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fallos al levantar el servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
