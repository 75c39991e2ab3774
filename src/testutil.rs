//! In-memory [`Transport`] fake for exercising the connection manager
//! without a real daemon or network. Modeled on the shape of a seeded
//! in-memory test double backed by a mutex-guarded store, keyed by
//! container id, with builder methods to seed state before running test
//! code.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use tokio::sync::Mutex;

use crate::error::{NodeClientError, NodeResult};
use crate::node::client::{ContainerSpec, Transport};
use crate::node::model::{InspectionRecord, RawContainerSummary};

#[derive(Default, Debug, Clone)]
pub struct CallLog {
    pub start: Vec<String>,
    pub kill: Vec<String>,
    pub stop: Vec<String>,
    pub remove: Vec<String>,
    pub create: Vec<String>,
}

struct FakeState {
    summaries: Vec<RawContainerSummary>,
    inspections: HashMap<String, InspectionRecord>,
    calls: CallLog,
    reachable: bool,
    remove_fails_for: Vec<String>,
    log_blob: Bytes,
    log_frames: Vec<Bytes>,
    next_created_id: String,
}

/// A fake node transport with seeded containers and instrumented calls.
pub struct FakeTransport {
    inner: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(FakeState {
                summaries: Vec::new(),
                inspections: HashMap::new(),
                calls: CallLog::default(),
                reachable: true,
                remove_fails_for: Vec::new(),
                log_blob: Bytes::new(),
                log_frames: Vec::new(),
                next_created_id: "created-container".to_string(),
            }),
        })
    }

    pub async fn seed(&self, summary: RawContainerSummary, inspection: InspectionRecord) {
        let mut state = self.inner.lock().await;
        state.inspections.insert(summary.id.clone(), inspection);
        state.summaries.push(summary);
    }

    pub async fn set_unreachable(&self) {
        self.inner.lock().await.reachable = false;
    }

    pub async fn fail_remove_for(&self, id: &str) {
        self.inner.lock().await.remove_fails_for.push(id.to_string());
    }

    pub async fn set_log_blob(&self, blob: impl Into<Bytes>) {
        self.inner.lock().await.log_blob = blob.into();
    }

    pub async fn set_log_frames(&self, frames: Vec<Bytes>) {
        self.inner.lock().await.log_frames = frames;
    }

    pub async fn set_next_created_id(&self, id: impl Into<String>) {
        self.inner.lock().await.next_created_id = id.into();
    }

    pub async fn calls(&self) -> CallLog {
        self.inner.lock().await.calls.clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn ping(&self) -> NodeResult<()> {
        if self.inner.lock().await.reachable {
            Ok(())
        } else {
            Err(NodeClientError::Api { status: 0, message: "connection refused".into() })
        }
    }

    async fn list_containers(&self) -> NodeResult<Vec<RawContainerSummary>> {
        let state = self.inner.lock().await;
        if !state.reachable {
            return Err(NodeClientError::Api { status: 0, message: "connection refused".into() });
        }
        Ok(state.summaries.clone())
    }

    async fn inspect(&self, id: &str) -> NodeResult<InspectionRecord> {
        let state = self.inner.lock().await;
        state
            .inspections
            .get(id)
            .cloned()
            .ok_or_else(|| NodeClientError::NotFound(id.to_string()))
    }

    async fn create(&self, spec: &ContainerSpec) -> NodeResult<String> {
        let mut state = self.inner.lock().await;
        state.calls.create.push(spec.name.clone());
        Ok(state.next_created_id.clone())
    }

    async fn start(&self, id: &str) -> NodeResult<()> {
        self.inner.lock().await.calls.start.push(id.to_string());
        Ok(())
    }

    async fn stop(&self, id: &str) -> NodeResult<()> {
        self.inner.lock().await.calls.stop.push(id.to_string());
        Ok(())
    }

    async fn kill(&self, id: &str) -> NodeResult<()> {
        self.inner.lock().await.calls.kill.push(id.to_string());
        Ok(())
    }

    async fn remove(&self, id: &str, _force: bool) -> NodeResult<()> {
        let mut state = self.inner.lock().await;
        state.calls.remove.push(id.to_string());
        if state.remove_fails_for.contains(&id.to_string()) {
            return Err(NodeClientError::Api { status: 500, message: "remove failed".into() });
        }
        Ok(())
    }

    async fn logs_blob(&self, _id: &str) -> NodeResult<Bytes> {
        Ok(self.inner.lock().await.log_blob.clone())
    }

    async fn logs_stream(&self, _id: &str) -> NodeResult<BoxStream<'static, NodeResult<Bytes>>> {
        let frames = self.inner.lock().await.log_frames.clone();
        let framed: Vec<NodeResult<Bytes>> = frames
            .into_iter()
            .map(|payload| {
                let mut framed = Vec::with_capacity(8 + payload.len());
                framed.push(1u8);
                framed.extend_from_slice(&[0, 0, 0]);
                framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                framed.extend_from_slice(&payload);
                Ok(Bytes::from(framed))
            })
            .collect();
        Ok(Box::pin(futures_util::stream::iter(framed)))
    }
}
