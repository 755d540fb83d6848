use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use predictport_core::{BackendCapabilities, BackendModel, NodeId, Tensor};

use crate::EventError;

/// Owns the loaded model for one inference site.
///
/// Backends that cannot run concurrently get a lock, held by a
/// [`SessionGuard`] for a whole feed/run/decode cycle so that two threads
/// never interleave on the same model.
pub struct SessionHandle {
    model: Box<dyn BackendModel>,
    lock: Option<Mutex<()>>,
}

pub struct SessionGuard<'a> {
    model: &'a dyn BackendModel,
    _lock: Option<MutexGuard<'a, ()>>,
}

impl SessionHandle {
    pub fn new(model: Box<dyn BackendModel>, capabilities: BackendCapabilities) -> Self {
        let lock = (!capabilities.thread_safe_run).then(|| Mutex::new(()));
        Self { model, lock }
    }

    pub fn serializes_runs(&self) -> bool {
        self.lock.is_some()
    }

    pub fn acquire(&self) -> Result<SessionGuard<'_>, EventError> {
        let lock = match &self.lock {
            Some(lock) => Some(lock.lock().map_err(|_| EventError::SessionPoisoned)?),
            None => None,
        };
        Ok(SessionGuard {
            model: self.model.as_ref(),
            _lock: lock,
        })
    }
}

impl SessionGuard<'_> {
    pub fn run(&self, feeds: Vec<(NodeId, Tensor)>, fetches: &[NodeId]) -> Result<Vec<Tensor>> {
        self.model.run(feeds, fetches)
    }
}
