//! # Sistema de Jobs
//! src/jobs/mod.rs
//!
//! Ejecuta los análisis en segundo plano sin bloquear las conexiones HTTP.
//!
//! ```text
//! submit → JobRegistry (running) → JobQueue → WorkerPool → ResultStore
//! ```
//!
//! Los workers terminan solos tras un periodo sin trabajo y se vuelven a
//! crear cuando llega un job nuevo.

pub mod handlers;
pub mod manager;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod storage;
pub mod types;

pub use manager::{JobManager, JobManagerConfig};
pub use pool::{WorkerContext, WorkerPool};
pub use queue::{JobQueue, QueueClosed};
pub use registry::{JobEntry, JobRegistry};
pub use storage::{ResultStore, StoredResult};
pub use types::{
    AnalysisResult, JobKind, JobParams, JobState, JobStatus, ListedJob, ListedStatus, WorkItem,
};
