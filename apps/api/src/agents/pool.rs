//! Bounded job queue drained by a fixed pool of tokio workers.
//!
//! Pipelines are submitted as boxed futures. A full queue is reported to the
//! caller instead of blocking it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::errors::{AgentError, AgentResult};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_CAPACITY: usize = 64;

pub struct JobQueue {
    sender: std::sync::Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    /// Starts `workers` tasks sharing a queue of `capacity` pending jobs
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        let Some(job) = job else { break };
                        // A panicking job must not take the worker down with it
                        if let Err(e) = tokio::spawn(job).await {
                            tracing::error!(worker, error = %e, "Job panicked");
                        }
                    }
                    tracing::debug!(worker, "Worker stopped");
                })
            })
            .collect();

        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Queues `job` without waiting
    ///
    /// # Errors
    /// `LaunchFailed` when the queue is full or has been shut down.
    pub fn submit<F>(&self, label: &str, job: F) -> AgentResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let Some(sender) = sender else {
            return Err(AgentError::LaunchFailed(format!(
                "{}: job queue is shut down",
                label
            )));
        };

        sender.try_send(Box::pin(job)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AgentError::LaunchFailed(format!("{}: job queue is full", label))
            }
            mpsc::error::TrySendError::Closed(_) => {
                AgentError::LaunchFailed(format!("{}: job queue is shut down", label))
            }
        })?;

        tracing::debug!(job = label, "Job queued");
        Ok(())
    }

    /// Stops accepting jobs and waits until every queued job has run
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Worker ended abnormally");
            }
        }
        tracing::info!("Job queue drained");
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_CAPACITY)
    }
}
