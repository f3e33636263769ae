//! # Registro de Jobs
//! src/jobs/registry.rs
//!
//! Mapa en memoria `job_id -> JobEntry`, autoridad sobre "¿existe este id?".
//! El contador de ids y el mapa comparten un único mutex, así que emitir un
//! id y registrarlo es atómico.

use crate::jobs::types::{JobKind, JobStatus};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Metadatos de un job registrado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub kind: JobKind,
    pub status: JobStatus,
    /// Motivo del fallo cuando `status == Failed`
    pub reason: Option<String>,
}

impl JobEntry {
    fn pending(kind: JobKind) -> Self {
        Self {
            kind,
            status: JobStatus::Pending,
            reason: None,
        }
    }
}

struct RegistryState {
    next_id: u64,
    jobs: HashMap<String, JobEntry>,
}

/// Registro thread-safe de jobs
pub struct JobRegistry {
    state: Mutex<RegistryState>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_id: 1,
                jobs: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emite el siguiente `job_id_<n>` y lo registra como pendiente
    ///
    /// # Ejemplo
    /// ```
    /// use stats_server::jobs::{JobKind, JobRegistry};
    ///
    /// let registry = JobRegistry::new();
    /// assert_eq!(registry.issue(JobKind::GlobalMean), "job_id_1");
    /// assert_eq!(registry.issue(JobKind::Best5), "job_id_2");
    /// ```
    pub fn issue(&self, kind: JobKind) -> String {
        let mut state = self.lock();
        let job_id = format!("job_id_{}", state.next_id);
        state.next_id += 1;
        state.jobs.insert(job_id.clone(), JobEntry::pending(kind));
        job_id
    }

    /// Inserta sin verificar duplicados (sobrescribe una entrada previa)
    pub fn register(&self, job_id: impl Into<String>, kind: JobKind) {
        self.lock().jobs.insert(job_id.into(), JobEntry::pending(kind));
    }

    pub fn lookup(&self, job_id: &str) -> Option<JobKind> {
        self.lock().jobs.get(job_id).map(|entry| entry.kind)
    }

    pub fn entry(&self, job_id: &str) -> Option<JobEntry> {
        self.lock().jobs.get(job_id).cloned()
    }

    pub fn mark_running(&self, job_id: &str) {
        self.set_status(job_id, JobStatus::Running, None);
    }

    pub fn mark_done(&self, job_id: &str) {
        self.set_status(job_id, JobStatus::Done, None);
    }

    pub fn mark_failed(&self, job_id: &str, reason: impl Into<String>) {
        self.set_status(job_id, JobStatus::Failed, Some(reason.into()));
    }

    fn set_status(&self, job_id: &str, status: JobStatus, reason: Option<String>) {
        if let Some(entry) = self.lock().jobs.get_mut(job_id) {
            entry.status = status;
            entry.reason = reason;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_issue_is_sequential() {
        let registry = JobRegistry::new();
        let ids: Vec<_> = (0..3).map(|_| registry.issue(JobKind::StatesMean)).collect();

        assert_eq!(ids, vec!["job_id_1", "job_id_2", "job_id_3"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_issued_job_starts_pending() {
        let registry = JobRegistry::new();
        let id = registry.issue(JobKind::StateMean);

        let entry = registry.entry(&id).unwrap();
        assert_eq!(entry.kind, JobKind::StateMean);
        assert_eq!(entry.status, JobStatus::Pending);
        assert_eq!(entry.reason, None);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = JobRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup("job_id_unknown"), None);
        assert_eq!(registry.entry("job_id_unknown"), None);
    }

    #[test]
    fn test_register_overwrites() {
        let registry = JobRegistry::new();
        registry.register("job_id_7", JobKind::Best5);
        registry.mark_failed("job_id_7", "boom");
        registry.register("job_id_7", JobKind::Worst5);

        let entry = registry.entry("job_id_7").unwrap();
        assert_eq!(entry.kind, JobKind::Worst5);
        assert_eq!(entry.status, JobStatus::Pending);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_status_transitions() {
        let registry = JobRegistry::new();
        let id = registry.issue(JobKind::GlobalMean);

        registry.mark_running(&id);
        assert_eq!(registry.entry(&id).unwrap().status, JobStatus::Running);

        registry.mark_done(&id);
        assert_eq!(registry.entry(&id).unwrap().status, JobStatus::Done);

        let other = registry.issue(JobKind::GlobalMean);
        registry.mark_failed(&other, "engine exploded");
        let entry = registry.entry(&other).unwrap();
        assert_eq!(entry.status, JobStatus::Failed);
        assert_eq!(entry.reason.as_deref(), Some("engine exploded"));
    }

    #[test]
    fn test_mark_unknown_is_noop() {
        let registry = JobRegistry::new();
        registry.mark_done("job_id_404");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_issue_unique_ids() {
        let registry = Arc::new(JobRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..50).map(|_| registry.issue(JobKind::Best5)).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }

        assert_eq!(all.len(), 400);
        assert_eq!(registry.len(), 400);
        assert!(all.contains("job_id_400"));
        assert!(!all.contains("job_id_401"));
    }
}
