use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::replay::cache::BehaviorCache;
use crate::replay::canonical::canonicalize_all;
use crate::replay::error::ReplayError;
use crate::runtime::RunContext;

/// Replay position for one (source path, function) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallCursor {
    pub run_id: String,
    pub behavior_index: usize,
}

/// Answers mocked calls from a [`BehaviorCache`], one recorded behavior per call.
pub struct Mocker {
    cache: Arc<BehaviorCache>,
    run: RunContext,
    cursors: Mutex<HashMap<(String, String), CallCursor>>,
}

impl Mocker {
    pub fn new(cache: Arc<BehaviorCache>, run: RunContext) -> Self {
        Self {
            cache,
            run,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &BehaviorCache {
        &self.cache
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    /// Return the next recorded result for `name` after verifying `args`.
    ///
    /// The cursor advances even when the lookup or verification fails.
    pub fn replay(&self, name: &str, source_path: &str, args: &[Value]) -> Result<Value, ReplayError> {
        let run_id = self.run.get();
        let index = self.advance(source_path, name, &run_id);

        let Some(behavior) = self.cache.behavior(source_path, name, &run_id, index) else {
            return Err(ReplayError::BehaviorNotFound {
                source_path: source_path.to_string(),
                function: name.to_string(),
                run_id,
                index,
            });
        };

        if behavior.args.len() != args.len() {
            return Err(ReplayError::ArgumentCount {
                function: name.to_string(),
                index,
                expected: behavior.args.len(),
                actual: args.len(),
            });
        }

        let expected = canonicalize_all(&behavior.args);
        let actual = canonicalize_all(args);
        if expected != actual {
            return Err(ReplayError::ArgumentMismatch {
                function: name.to_string(),
                index,
                expected,
                actual,
            });
        }

        tracing::debug!(function = name, source_path, run_id = %run_id, index, "Replayed call");
        Ok(behavior.result.clone())
    }

    /// [`Mocker::replay`], decoding the recorded result into `T`.
    pub fn mock_sync<T: DeserializeOwned>(
        &self,
        name: &str,
        source_path: &str,
        args: &[Value],
    ) -> Result<T, ReplayError> {
        let result = self.replay(name, source_path, args)?;
        serde_json::from_value(result).map_err(|source| ReplayError::ResultDecode {
            function: name.to_string(),
            source,
        })
    }

    pub fn cursor(&self, source_path: &str, name: &str) -> Option<CallCursor> {
        self.cursors
            .lock()
            .get(&(source_path.to_string(), name.to_string()))
            .cloned()
    }

    /// Claim the current index for this call and move the cursor past it.
    fn advance(&self, source_path: &str, name: &str, run_id: &str) -> usize {
        let mut cursors = self.cursors.lock();
        let cursor = cursors
            .entry((source_path.to_string(), name.to_string()))
            .or_insert_with(|| CallCursor {
                run_id: run_id.to_string(),
                behavior_index: 0,
            });
        if cursor.run_id != run_id {
            cursor.run_id = run_id.to_string();
            cursor.behavior_index = 0;
        }
        let index = cursor.behavior_index;
        cursor.behavior_index += 1;
        index
    }
}
