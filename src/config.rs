//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de análisis con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./stats_server --port 5000 \
//!   --dataset ./nutrition_activity_obesity_usa_subset.csv \
//!   --workers 4 \
//!   --worker-idle-timeout-secs 120
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! TP_NUM_OF_THREADS=8 HTTP_HOST=0.0.0.0 ./stats_server
//! ```

use crate::error::ConfigError;
use crate::jobs::manager::default_workers;
use clap::Parser;
use tracing::info;

/// Configuración del servidor HTTP/1.0
#[derive(Debug, Clone, Parser)]
#[command(name = "stats_server")]
#[command(about = "Servidor HTTP/1.0 de análisis estadístico con jobs asíncronos")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "5000", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Datos ===

    /// CSV con el dataset, se carga una vez al arrancar
    #[arg(
        long,
        default_value = "./nutrition_activity_obesity_usa_subset.csv",
        env = "DATASET_PATH"
    )]
    pub dataset: String,

    /// Directorio donde se escriben los `<job_id>.json`
    #[arg(long = "results-dir", default_value = "./results", env = "RESULTS_DIR")]
    pub results_dir: String,

    // === Workers ===

    /// Máximo de workers; por defecto, el paralelismo del host
    #[arg(long, env = "TP_NUM_OF_THREADS")]
    pub workers: Option<usize>,

    /// Segundos sin trabajo tras los cuales un worker termina
    #[arg(
        long = "worker-idle-timeout-secs",
        default_value = "120",
        env = "WORKER_IDLE_TIMEOUT_SECS"
    )]
    pub worker_idle_timeout_secs: u64,

    // === Conexiones ===

    /// Tamaño máximo del body de un request
    #[arg(long = "max-body-bytes", default_value = "1048576", env = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// Timeout de lectura por conexión en milisegundos
    #[arg(long = "read-timeout-ms", default_value = "30000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    // === Logging ===

    /// Directorio del archivo de log
    #[arg(long = "log-dir", default_value = ".", env = "LOG_DIR")]
    pub log_dir: String,

    /// Prefijo del archivo de log; rota a diario como `<prefijo>.<fecha>`
    #[arg(long = "log-file", default_value = "webserver.log", env = "LOG_FILE")]
    pub log_file: String,

    /// Archivos de log rotados que se conservan
    #[arg(long = "log-max-files", default_value = "5", env = "LOG_MAX_FILES")]
    pub log_max_files: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI y entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use stats_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:5000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Workers configurados o, si no hay, el paralelismo del host
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::NoWorkers);
        }
        if self.worker_idle_timeout_secs == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroReadTimeout);
        }
        if self.log_max_files == 0 {
            return Err(ConfigError::ZeroLogFiles);
        }
        Ok(())
    }

    /// Registra un resumen de la configuración efectiva
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            dataset = %self.dataset,
            results_dir = %self.results_dir,
            workers = self.effective_workers(),
            worker_idle_timeout_secs = self.worker_idle_timeout_secs,
            max_body_bytes = self.max_body_bytes,
            read_timeout_ms = self.read_timeout_ms,
            log = %format!("{}/{}", self.log_dir, self.log_file),
            log_max_files = self.log_max_files,
            "configuration loaded"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".to_string(),
            dataset: "./nutrition_activity_obesity_usa_subset.csv".to_string(),
            results_dir: "./results".to_string(),
            workers: None,
            worker_idle_timeout_secs: 120,
            max_body_bytes: 1024 * 1024,
            read_timeout_ms: 30_000,
            log_dir: ".".to_string(),
            log_file: "webserver.log".to_string(),
            log_max_files: 5,
        }
    }
}
