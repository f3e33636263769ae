//! # Pool de Workers
//! src/jobs/pool.rs
//!
//! Hasta `size` threads de larga vida consumen la cola. Un worker que pasa
//! `idle_timeout` sin recibir trabajo termina solo; cuando vuelve a haber
//! backlog el pool lanza reemplazos hasta completar `size` otra vez.

use crate::analytics::Engine;
use crate::jobs::queue::JobQueue;
use crate::jobs::registry::JobRegistry;
use crate::jobs::storage::ResultStore;
use crate::jobs::types::{AnalysisResult, WorkItem};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

/// Todo lo que un worker necesita para procesar jobs
#[derive(Clone)]
pub struct WorkerContext {
    pub registry: Arc<JobRegistry>,
    pub queue: JobQueue<WorkItem>,
    pub store: ResultStore,
    pub engine: Arc<dyn Engine>,
    pub idle_timeout: Duration,
}

/// Pool de workers con tamaño máximo fijo
pub struct WorkerPool {
    ctx: WorkerContext,
    size: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Numeración de threads, solo para nombres
    spawned: AtomicUsize,
}

impl WorkerPool {
    /// Crea el pool y lanza `size` workers
    pub fn start(ctx: WorkerContext, size: usize) -> io::Result<Self> {
        let pool = Self {
            ctx,
            size,
            handles: Mutex::new(Vec::new()),
            spawned: AtomicUsize::new(0),
        };
        pool.replenish()?;
        info!(
            workers = pool.size,
            idle_timeout_secs = pool.ctx.idle_timeout.as_secs_f64(),
            "worker pool started"
        );
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers actualmente enganchados a la cola
    pub fn active_workers(&self) -> usize {
        self.ctx.queue.consumers()
    }

    /// Lanza workers hasta completar `size`; retorna cuántos se lanzaron
    pub fn replenish(&self) -> io::Result<usize> {
        let mut started = 0;
        while self.ctx.queue.try_attach_consumer(self.size) {
            if let Err(e) = self.spawn_worker() {
                self.ctx.queue.detach_consumer();
                return Err(e);
            }
            started += 1;
        }
        if started > 0 {
            debug!(started, "workers spawned");
        }
        Ok(started)
    }

    fn spawn_worker(&self) -> io::Result<()> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("worker-{n}");
        let ctx = self.ctx.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(name, ctx))?;

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
        Ok(())
    }

    /// Espera a cada worker, uno a la vez
    pub fn join_all(&self) {
        loop {
            let next = {
                let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
                handles.pop()
            };
            let Some(handle) = next else { break };

            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!(worker = %name, "worker panicked");
            } else {
                debug!(worker = %name, "worker joined");
            }
        }
    }
}

/// Loop principal del worker
pub fn run_worker(name: String, ctx: WorkerContext) {
    let _span = info_span!("worker", worker = %name).entered();
    info!("worker started");

    while let Some(item) = ctx.queue.dequeue_timeout(ctx.idle_timeout) {
        process(&ctx, item);
    }

    info!("worker idle, exiting");
}

/// Procesa un job; ningún fallo escapa de aquí
pub fn process(ctx: &WorkerContext, item: WorkItem) {
    let WorkItem { job_id, params } = item;

    let Some(kind) = ctx.registry.lookup(&job_id) else {
        error!(%job_id, "job not found in registry, dropping");
        return;
    };

    ctx.registry.mark_running(&job_id);
    info!(%job_id, %kind, "job picked up");
    let started = Instant::now();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        ctx.engine.compute(kind, &params.question, params.state.as_deref())
    }));

    match outcome {
        Ok(Ok(result)) => persist(ctx, &job_id, &result, started),
        Ok(Err(e)) => fail(ctx, &job_id, &e),
        Err(payload) => fail(ctx, &job_id, &panic_message(payload.as_ref())),
    }
}

fn persist(ctx: &WorkerContext, job_id: &str, result: &AnalysisResult, started: Instant) {
    match ctx.store.save(job_id, result) {
        Ok(()) => {
            ctx.registry.mark_done(job_id);
            info!(%job_id, elapsed_ms = started.elapsed().as_millis() as u64, "job done");
        }
        Err(e) => {
            error!(%job_id, error = %e, "cannot persist result");
            ctx.registry.mark_failed(job_id, format!("Failed to persist result: {e}"));
        }
    }
}

fn fail(ctx: &WorkerContext, job_id: &str, reason: &dyn std::fmt::Display) {
    let reason = reason.to_string();
    warn!(%job_id, %reason, "job failed");

    if let Err(e) = ctx.store.save_error(job_id, &reason) {
        error!(%job_id, error = %e, "cannot persist error record");
    }
    ctx.registry.mark_failed(job_id, reason);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Engine panicked: {detail}")
}
