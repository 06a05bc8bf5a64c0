use std::sync::Arc;

use parking_lot::RwLock;

/// Ambient run identifier shared by the hooks of one session.
///
/// Clones share the same slot, so a `set` through any handle is seen by every
/// tracer and mocker built from it.
#[derive(Debug, Clone)]
pub struct RunContext {
    current: Arc<RwLock<String>>,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(run_id.into())),
        }
    }

    /// A context holding a random v4 UUID.
    pub fn fresh() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn get(&self) -> String {
        self.current.read().clone()
    }

    pub fn set(&self, run_id: impl Into<String>) {
        *self.current.write() = run_id.into();
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::fresh()
    }
}
