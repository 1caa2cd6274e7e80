//! One tokio task per subject.
//!
//! Each subject gets a bounded queue and a task that owns its
//! [`SubjectState`]. Samples and acknowledgments share the queue, so a clear
//! is ordered against location samples for the same subject and cannot be
//! overtaken by a sample that arrived before it. Clock ticks go through the
//! same queue.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vigil_core::{ingest, Ingested, Sample, SubjectId};

use crate::pipeline::Pipeline;
use crate::sink::EventSink;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker for subject '{0}' has stopped")]
    Stopped(SubjectId),
}

/// Work item for a subject's task.
#[derive(Debug)]
pub enum Command {
    Sample(Ingested),
    ClearEmergency { at: DateTime<Utc> },
    Tick { at: DateTime<Utc> },
}

struct WorkerHandle {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

pub struct WorkerPool {
    pipeline: Arc<Pipeline>,
    sink: Arc<dyn EventSink>,
    queue_capacity: usize,
    workers: HashMap<SubjectId, WorkerHandle>,
}

impl WorkerPool {
    pub fn new(pipeline: Arc<Pipeline>, sink: Arc<dyn EventSink>, queue_capacity: usize) -> Self {
        Self {
            pipeline,
            sink,
            queue_capacity: queue_capacity.max(1),
            workers: HashMap::new(),
        }
    }

    /// Queue a validated sample on its subject's worker, spawning the worker
    /// on first sight. Waits while the queue is full.
    pub async fn submit(&mut self, sample: Ingested) -> Result<(), WorkerError> {
        let subject_id = sample.subject_id().to_string();
        self.send(&subject_id, Command::Sample(sample)).await
    }

    /// Validate a raw sample, then queue it. Rejections are emitted directly.
    pub async fn submit_sample(&mut self, sample: Sample, line: Option<usize>) -> Result<(), WorkerError> {
        let subject_id = sample.subject_id().to_string();
        match ingest(sample) {
            Ok(ingested) => self.submit(ingested).await,
            Err(e) => {
                let subject = Some(subject_id.as_str()).filter(|s| !s.trim().is_empty());
                let event = self.pipeline.reject(subject, &e, line);
                self.sink.emit(event).await;
                Ok(())
            }
        }
    }

    /// Queue an acknowledgment behind every sample already queued for the
    /// subject. Unknown subjects are ignored.
    pub async fn clear_emergency(&mut self, subject_id: &str) -> Result<(), WorkerError> {
        if !self.workers.contains_key(subject_id) {
            debug!(subject_id, "clear requested for unknown subject");
            return Ok(());
        }
        self.send(subject_id, Command::ClearEmergency { at: Utc::now() }).await
    }

    /// Queue a clock tick on every worker.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<(), WorkerError> {
        for (subject_id, handle) in &self.workers {
            handle
                .tx
                .send(Command::Tick { at: now })
                .await
                .map_err(|_| WorkerError::Stopped(subject_id.clone()))?;
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Close every queue and wait for the workers to drain them.
    pub async fn shutdown(self) {
        let count = self.workers.len();
        let mut tasks = Vec::with_capacity(count);
        for (subject_id, handle) in self.workers {
            drop(handle.tx);
            tasks.push((subject_id, handle.task));
        }
        for (subject_id, task) in tasks {
            if let Err(e) = task.await {
                warn!(subject_id = %subject_id, error = %e, "subject worker panicked");
            }
        }
        info!(workers = count, "worker pool drained");
    }

    async fn send(&mut self, subject_id: &str, command: Command) -> Result<(), WorkerError> {
        let tx = match self.workers.get(subject_id) {
            Some(handle) => handle.tx.clone(),
            None => {
                let handle = self.spawn(subject_id);
                let tx = handle.tx.clone();
                self.workers.insert(subject_id.to_string(), handle);
                tx
            }
        };
        tx.send(command)
            .await
            .map_err(|_| WorkerError::Stopped(subject_id.to_string()))
    }

    fn spawn(&self, subject_id: &str) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let pipeline = Arc::clone(&self.pipeline);
        let sink = Arc::clone(&self.sink);
        let subject_id = subject_id.to_string();
        debug!(subject_id = %subject_id, "spawning subject worker");
        let task = tokio::spawn(run_subject(pipeline, sink, subject_id, rx));
        WorkerHandle { tx, task }
    }
}

/// Drain one subject's queue until every sender is dropped.
async fn run_subject(
    pipeline: Arc<Pipeline>,
    sink: Arc<dyn EventSink>,
    subject_id: SubjectId,
    mut rx: mpsc::Receiver<Command>,
) {
    let mut state = pipeline.new_subject(&subject_id);
    while let Some(command) = rx.recv().await {
        let events = match command {
            Command::Sample(sample) => pipeline.handle(&mut state, sample),
            Command::ClearEmergency { at } => pipeline.clear_emergency(&mut state, at),
            Command::Tick { at } => pipeline.tick(&mut state, at),
        };
        for event in events {
            sink.emit(event).await;
        }
    }
    debug!(subject_id = %subject_id, "subject worker stopped");
}
