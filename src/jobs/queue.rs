//! # Cola FIFO para Jobs
//! src/jobs/queue.rs
//!
//! Cola thread-safe sin límite de capacidad. Además de los items guarda la
//! bandera de admisión (abierta/cerrada) y cuántos consumidores (workers)
//! están enganchados, todo bajo el mismo mutex que el push/pop.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// La cola ya no admite trabajo nuevo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is closed")]
pub struct QueueClosed;

struct QueueState<T> {
    items: VecDeque<T>,
    consumers: usize,
    closed: bool,
}

/// Cola FIFO compartida entre la fachada y los workers
pub struct JobQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,

    /// Condvar para despertar workers cuando llega trabajo
    available: Arc<Condvar>,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                consumers: 0,
                closed: false,
            })),
            available: Arc::new(Condvar::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola al final y retorna la profundidad resultante
    pub fn enqueue(&self, item: T) -> Result<usize, QueueClosed> {
        let mut state = self.lock();
        if state.closed {
            return Err(QueueClosed);
        }

        state.items.push_back(item);
        let depth = state.items.len();
        drop(state);

        self.available.notify_one();
        Ok(depth)
    }

    /// Desencola esperando como máximo `idle`
    ///
    /// Si vence el plazo con la cola vacía, el consumidor que llama queda
    /// retirado (el contador baja en uno) y retorna `None`.
    pub fn dequeue_timeout(&self, idle: Duration) -> Option<T> {
        let state = self.lock();
        let (mut state, _) = self
            .available
            .wait_timeout_while(state, idle, |state| state.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        match state.items.pop_front() {
            Some(item) => Some(item),
            None => {
                state.consumers = state.consumers.saturating_sub(1);
                None
            }
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Engancha un consumidor si la cola está abierta y hay cupo bajo `max`
    pub fn try_attach_consumer(&self, max: usize) -> bool {
        let mut state = self.lock();
        if state.closed || state.consumers >= max {
            return false;
        }
        state.consumers += 1;
        true
    }

    /// Deshace un `try_attach_consumer` cuyo thread no llegó a arrancar
    pub fn detach_consumer(&self) {
        let mut state = self.lock();
        state.consumers = state.consumers.saturating_sub(1);
    }

    pub fn consumers(&self) -> usize {
        self.lock().consumers
    }

    /// Cierra la admisión; los items ya encolados se siguen entregando
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            available: Arc::clone(&self.available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();
        queue.enqueue("c").unwrap();

        assert_eq!(queue.try_dequeue(), Some("a"));
        assert_eq!(queue.try_dequeue(), Some("b"));
        assert_eq!(queue.try_dequeue(), Some("c"));
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn test_enqueue_reports_depth() {
        let queue = JobQueue::new();
        assert_eq!(queue.enqueue(1), Ok(1));
        assert_eq!(queue.enqueue(2), Ok(2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_depth_drops_by_one_per_dequeue() {
        let queue = JobQueue::new();
        for i in 0..5 {
            queue.enqueue(i).unwrap();
        }

        for expected in (0..5).rev() {
            queue.dequeue_timeout(Duration::from_millis(10)).unwrap();
            assert_eq!(queue.len(), expected);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_closed_queue_rejects() {
        let queue = JobQueue::new();
        queue.enqueue(1).unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(2), Err(QueueClosed));
        assert_eq!(queue.len(), 1);

        // Lo ya encolado se sigue entregando
        assert_eq!(queue.try_dequeue(), Some(1));
    }

    #[test]
    fn test_timeout_retires_consumer() {
        let queue: JobQueue<u32> = JobQueue::new();
        assert!(queue.try_attach_consumer(2));
        assert_eq!(queue.consumers(), 1);

        let start = Instant::now();
        assert_eq!(queue.dequeue_timeout(Duration::from_millis(50)), None);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(queue.consumers(), 0);
    }

    #[test]
    fn test_attach_respects_max_and_close() {
        let queue: JobQueue<u32> = JobQueue::new();
        assert!(queue.try_attach_consumer(2));
        assert!(queue.try_attach_consumer(2));
        assert!(!queue.try_attach_consumer(2));

        queue.detach_consumer();
        assert_eq!(queue.consumers(), 1);

        queue.close();
        assert!(!queue.try_attach_consumer(2));
    }

    #[test]
    fn test_blocked_consumer_wakes_on_enqueue() {
        let queue = JobQueue::new();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue_timeout(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(50));
        queue.enqueue("job").unwrap();

        assert_eq!(consumer.join().unwrap(), Some("job"));
    }
}
