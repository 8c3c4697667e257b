//! In-process cancellation registry.
//!
//! Maps running job ids to their cancellation tokens so the HTTP surface
//! can interrupt dispatch. The persisted `cancel_requested` flag on the
//! job record is the durable, client-visible side of the same request.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
pub struct CancelRegistry {
    inner: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token for a job about to run.
    pub fn register(&self, job_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        self.inner
            .lock()
            .expect("cancel registry lock poisoned")
            .insert(job_id, token.clone());
        token
    }

    /// Cancel a running job's token, if it is still registered.
    pub fn cancel(&self, job_id: Uuid) {
        if let Some(token) = self
            .inner
            .lock()
            .expect("cancel registry lock poisoned")
            .get(&job_id)
        {
            token.cancel();
        }
    }

    /// Drop a finished job's token.
    pub fn remove(&self, job_id: Uuid) {
        self.inner
            .lock()
            .expect("cancel registry lock poisoned")
            .remove(&job_id);
    }
}
