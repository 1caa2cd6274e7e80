//! Single-threaded event loop over all subjects.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use vigil_core::{ingest, Ingested, Sample, SubjectId};

use crate::events::PipelineEvent;
use crate::pipeline::Pipeline;
use crate::sink::EventSink;
use crate::state::SubjectState;

/// Owns every subject's state and processes samples strictly in the order
/// they are submitted.
pub struct Engine {
    pipeline: Arc<Pipeline>,
    sink: Arc<dyn EventSink>,
    subjects: HashMap<SubjectId, SubjectState>,
}

impl Engine {
    pub fn new(pipeline: Arc<Pipeline>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            pipeline,
            sink,
            subjects: HashMap::new(),
        }
    }

    /// Run a validated sample and return its events without emitting them.
    pub fn process(&mut self, sample: Ingested) -> Vec<PipelineEvent> {
        let pipeline = &self.pipeline;
        let state = self
            .subjects
            .entry(sample.subject_id().to_string())
            .or_insert_with(|| pipeline.new_subject(sample.subject_id()));
        pipeline.handle(state, sample)
    }

    /// Run a validated sample and emit its events.
    pub async fn submit(&mut self, sample: Ingested) {
        let events = self.process(sample);
        self.emit_all(events).await;
    }

    /// Validate a raw sample, then run it. `line` is reported on rejection.
    pub async fn submit_sample(&mut self, sample: Sample, line: Option<usize>) {
        let subject_id = sample.subject_id().to_string();
        match ingest(sample) {
            Ok(ingested) => self.submit(ingested).await,
            Err(e) => {
                let subject = Some(subject_id.as_str()).filter(|s| !s.trim().is_empty());
                let event = self.pipeline.reject(subject, &e, line);
                self.sink.emit(event).await;
            }
        }
    }

    /// Clear a subject's emergency latch. Unknown subjects are ignored.
    pub async fn clear_emergency(&mut self, subject_id: &str) {
        let Some(state) = self.subjects.get_mut(subject_id) else {
            tracing::debug!(subject_id, "clear requested for unknown subject");
            return;
        };
        let events = self.pipeline.clear_emergency(state, Utc::now());
        self.emit_all(events).await;
    }

    /// Advance every subject's geofence clock to `now` and return the events.
    pub fn advance_clock(&mut self, now: DateTime<Utc>) -> Vec<PipelineEvent> {
        let pipeline = &self.pipeline;
        self.subjects
            .values_mut()
            .flat_map(|state| pipeline.tick(state, now))
            .collect()
    }

    /// Advance every subject to `now` and emit whatever escalates.
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        let events = self.advance_clock(now);
        self.emit_all(events).await;
    }

    pub fn subject(&self, subject_id: &str) -> Option<&SubjectState> {
        self.subjects.get(subject_id)
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    async fn emit_all(&self, events: Vec<PipelineEvent>) {
        for event in events {
            self.sink.emit(event).await;
        }
    }
}
