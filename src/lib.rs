//! # Stats Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 que calcula estadísticas sobre un dataset de salud
//! pública de forma asíncrona: cada request encola un job y el cliente
//! consulta después el resultado.
//!
//! ## Arquitectura
//!
//! - `http`: parsing y construcción de mensajes HTTP/1.0
//! - `server`: listener TCP, un thread por conexión
//! - `router`: rutas con parámetros de path
//! - `jobs`: registro, cola, pool de workers y almacenamiento de resultados
//! - `analytics`: dataset y los nueve cálculos
//! - `config` y `logging`: configuración CLI/entorno y `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use stats_server::analytics::{Analytics, Dataset};
//! use stats_server::config::Config;
//! use stats_server::jobs::{JobManager, JobManagerConfig};
//! use stats_server::server::Server;
//!
//! let config = Config::default();
//! let dataset = Dataset::load(Path::new(&config.dataset)).unwrap();
//! let manager = JobManager::start(
//!     &JobManagerConfig::from_config(&config),
//!     Arc::new(Analytics::new(dataset)),
//! )
//! .unwrap();
//! let server = Server::bind(&config, Arc::new(manager)).unwrap();
//! server.run().unwrap();
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod router;
pub mod server;
