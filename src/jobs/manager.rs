//! # Gestor Central de Jobs
//! src/jobs/manager.rs
//!
//! Fachada de envío y consulta: emite ids, registra, encola, reescala el
//! pool y responde estado/listado/profundidad combinando registro, almacén
//! y cola. También implementa el apagado ordenado.

use crate::analytics::Engine;
use crate::config::Config;
use crate::error::{ServerError, StatusError, StoreError};
use crate::jobs::pool::{WorkerContext, WorkerPool};
use crate::jobs::queue::JobQueue;
use crate::jobs::registry::JobRegistry;
use crate::jobs::storage::{ResultStore, StoredResult};
use crate::jobs::types::{JobKind, JobParams, JobState, JobStatus, ListedJob, WorkItem};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Motivo registrado para los jobs recibidos durante el apagado
pub const SHUTDOWN_MESSAGE: &str = "Shutdown in progress. Not accepting new jobs.";

/// Configuración del Job Manager
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Máximo de workers simultáneos
    pub workers: usize,

    /// Tiempo sin trabajo tras el cual un worker termina
    pub idle_timeout: Duration,

    /// Directorio de archivos `<job_id>.json`
    pub results_dir: PathBuf,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            idle_timeout: Duration::from_secs(120),
            results_dir: PathBuf::from("./results"),
        }
    }
}

impl JobManagerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.effective_workers(),
            idle_timeout: Duration::from_secs(config.worker_idle_timeout_secs),
            results_dir: PathBuf::from(&config.results_dir),
        }
    }
}

/// Paralelismo del host, 1 si no se puede determinar
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Gestor central de jobs
pub struct JobManager {
    registry: Arc<JobRegistry>,
    queue: JobQueue<WorkItem>,
    store: ResultStore,
    pool: WorkerPool,
}

impl JobManager {
    /// Abre el almacén y arranca el pool de workers
    pub fn start(config: &JobManagerConfig, engine: Arc<dyn Engine>) -> Result<Self, ServerError> {
        let store = ResultStore::open(&config.results_dir)?;
        let registry = Arc::new(JobRegistry::new());
        let queue = JobQueue::new();

        let ctx = WorkerContext {
            registry: Arc::clone(&registry),
            queue: queue.clone(),
            store: store.clone(),
            engine,
            idle_timeout: config.idle_timeout,
        };
        let pool = WorkerPool::start(ctx, config.workers).map_err(ServerError::Spawn)?;

        Ok(Self {
            registry,
            queue,
            store,
            pool,
        })
    }

    /// Registra y encola un job; retorna de inmediato con su id
    ///
    /// Tras el apagado el id se emite igual, pero el job no se encola y
    /// queda fallido con [`SHUTDOWN_MESSAGE`].
    pub fn submit(&self, kind: JobKind, params: JobParams) -> String {
        let job_id = self.registry.issue(kind);
        let item = WorkItem {
            job_id: job_id.clone(),
            params,
        };

        if self.queue.enqueue(item).is_err() {
            warn!(%job_id, %kind, "{}", SHUTDOWN_MESSAGE);
            self.registry.mark_failed(&job_id, SHUTDOWN_MESSAGE);
            return job_id;
        }

        if let Err(e) = self.pool.replenish() {
            error!(error = %e, "cannot spawn replacement worker");
        }

        info!(%job_id, %kind, "Job added to the queue");
        job_id
    }

    /// Estado de un job para quien hace polling
    pub fn status(&self, job_id: &str) -> Result<JobState, StatusError> {
        let entry = self.registry.entry(job_id).ok_or(StatusError::UnknownJob)?;

        match entry.status {
            JobStatus::Pending | JobStatus::Running => Ok(JobState::Running),
            JobStatus::Failed => Ok(JobState::Failed(
                entry.reason.unwrap_or_else(|| "Job failed".to_string()),
            )),
            JobStatus::Done => Ok(match self.store.read(job_id)? {
                StoredResult::Parsed(result) => JobState::Done(result),
                StoredResult::Corrupt => {
                    error!(%job_id, "Invalid or corrupt result file");
                    JobState::Corrupt
                }
                StoredResult::Empty | StoredResult::NotFound => JobState::Running,
            }),
        }
    }

    /// Lista los archivos de resultado (no consulta el registro)
    pub fn list_jobs(&self) -> Result<Vec<ListedJob>, StoreError> {
        self.store.list()
    }

    /// Jobs esperando en la cola (no incluye los que se están calculando)
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn active_workers(&self) -> usize {
        self.pool.active_workers()
    }

    pub fn is_accepting(&self) -> bool {
        !self.queue.is_closed()
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Cierra la admisión y espera a que cada worker termine
    ///
    /// Los workers siguen vaciando la cola y solo salen por su timeout de
    /// inactividad, así que esto puede tardar hasta
    /// `workers × idle_timeout`.
    pub fn shutdown(&self) {
        let started = Instant::now();
        self.queue.close();
        info!(
            pending = self.queue.len(),
            workers = self.pool.active_workers(),
            "Shutting down, waiting for workers"
        );

        self.pool.join_all();
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "All workers stopped");
    }
}
