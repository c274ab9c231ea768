//! # Worker Pool Module
//!
//! Bounded pool of tokio tasks. `spawn` waits for a free slot before starting
//! the task, so a producer feeding the pool pauses while it is full.
//! A failing or panicking task never cancels its siblings.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    handles: Vec<JoinHandle<()>>,
    panicked: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        debug!("Worker pool with {} slots", max_workers);
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
            handles: Vec::new(),
            panicked: 0,
        }
    }

    /// Start `task` as soon as a slot is free
    pub async fn spawn<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self.semaphore.clone().acquire_owned().await?;

        self.handles.push(tokio::spawn(async move {
            let _permit = permit; // released when the task ends
            task.await;
        }));

        self.reap_finished().await;
        Ok(())
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for every dispatched task; returns how many panicked
    pub async fn join(mut self) -> usize {
        for handle in std::mem::take(&mut self.handles) {
            self.reap(handle).await;
        }
        self.panicked
    }

    async fn reap_finished(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.handles).into_iter().partition(|h| h.is_finished());
        self.handles = running;

        for handle in finished {
            self.reap(handle).await;
        }
    }

    async fn reap(&mut self, handle: JoinHandle<()>) {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
            self.panicked += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrency_never_exceeds_bound() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(3);

        for _ in 0..25 {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            let completed = completed.clone();
            pool.spawn(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                completed.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        assert_eq!(pool.join().await, 0);
        assert_eq!(completed.load(Ordering::SeqCst), 25);
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(2);

        for i in 0..6 {
            let completed = completed.clone();
            pool.spawn(async move {
                if i == 2 {
                    panic!("worker {} exploded", i);
                }
                completed.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        assert_eq!(pool.join().await, 1);
        assert_eq!(completed.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_slots_are_released() {
        let mut pool = WorkerPool::new(2);
        pool.spawn(async {}).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while pool.available() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(pool.join().await, 0);
    }
}
