use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};

use crate::error::DispatchError;

/// Fixed-size pool of workers draining a task channel.
///
/// All items are queued up front and the channel is closed, so each item is
/// handed to exactly one worker and at most `size` calls to the work function
/// are outstanding at any instant.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn run<T, F, Fut>(&self, items: Vec<T>, work: F) -> Result<(), DispatchError>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = ()>,
    {
        if items.is_empty() {
            return Ok(());
        }

        let workers = self.size.min(items.len());
        let (tx, rx) = mpsc::channel(items.len());
        for item in items {
            tx.send(item)
                .await
                .map_err(|_| DispatchError::Worker("task channel closed unexpectedly".into()))?;
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let work = &work;
        let mut futs: FuturesUnordered<_> = (0..workers)
            .map(|worker_id| {
                let rx = rx.clone();
                async move {
                    let mut handled = 0usize;
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(item) = next else {
                            break;
                        };
                        work(item).await;
                        handled += 1;
                    }
                    tracing::trace!(worker_id, handled, "worker drained");
                }
            })
            .collect();

        while futs.next().await.is_some() {}

        Ok(())
    }
}
