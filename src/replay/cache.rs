use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::replay::error::CacheError;
use crate::trace::record::{TraceReader, TraceRecord};

/// One recorded call: the arguments it received and the result it returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub args: Vec<Value>,
    pub result: Value,
}

type RunBehaviors = BTreeMap<String, Vec<Behavior>>;
type FunctionRuns = BTreeMap<String, RunBehaviors>;

/// Recorded behaviors indexed by source path, function name, and run id.
///
/// Behaviors under one key keep the order their records were emitted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorCache {
    paths: BTreeMap<String, FunctionRuns>,
}

impl BehaviorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the cache. Returns whether it contributed a behavior.
    pub fn push(&mut self, record: &TraceRecord) -> bool {
        if !record.data.is_function_return() {
            return false;
        }
        let Some(result) = record.data.result.clone() else {
            return false;
        };
        let args = match &record.data.args {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => {
                tracing::warn!(
                    message = %record.message,
                    args = %other,
                    "Skipping return record whose args are not an array"
                );
                return false;
            }
        };

        self.paths
            .entry(record.source_path.clone())
            .or_default()
            .entry(record.function_name.clone())
            .or_default()
            .entry(record.run_id.clone())
            .or_default()
            .push(Behavior { args, result });
        true
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = TraceRecord>,
    {
        let mut cache = Self::new();
        for record in records {
            cache.push(&record);
        }
        cache
    }

    /// Build a cache from one JSONL trace stream.
    pub fn from_stream(path: &Path) -> Result<Self, CacheError> {
        let reader = TraceReader::open(path)
            .map_err(|err| CacheError::from_stream(path.to_path_buf(), err))?;
        let mut cache = Self::new();
        let mut skipped = 0usize;
        for record in reader {
            let record = record.map_err(|err| CacheError::from_stream(path.to_path_buf(), err))?;
            if !cache.push(&record) {
                skipped += 1;
            }
        }
        tracing::debug!(
            path = %path.display(),
            behaviors = cache.len(),
            skipped,
            "Built behavior cache from trace stream"
        );
        Ok(cache)
    }

    /// Build a cache from several streams. A later stream replaces an earlier
    /// one's behaviors for any (source path, function, run) it also recorded.
    pub fn from_streams<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CacheError> {
        let mut cache = Self::new();
        for path in paths {
            cache.merge(Self::from_stream(path.as_ref())?);
        }
        Ok(cache)
    }

    pub fn merge(&mut self, other: BehaviorCache) {
        for (source_path, functions) in other.paths {
            let target = self.paths.entry(source_path).or_default();
            for (function, runs) in functions {
                let target = target.entry(function).or_default();
                for (run_id, behaviors) in runs {
                    target.insert(run_id, behaviors);
                }
            }
        }
    }

    pub fn behaviors(&self, source_path: &str, function: &str, run_id: &str) -> Option<&[Behavior]> {
        self.paths
            .get(source_path)?
            .get(function)?
            .get(run_id)
            .map(Vec::as_slice)
    }

    pub fn behavior(
        &self,
        source_path: &str,
        function: &str,
        run_id: &str,
        index: usize,
    ) -> Option<&Behavior> {
        self.behaviors(source_path, function, run_id)?.get(index)
    }

    /// Total number of behaviors across every key.
    pub fn len(&self) -> usize {
        self.paths
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json_pretty(&self) -> Result<String, CacheError> {
        serde_json::to_string_pretty(self).map_err(CacheError::Encode)
    }

    /// Write the cache artifact whole.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let json = self.to_json_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json + "\n").map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a cache artifact written by [`BehaviorCache::save`].
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CacheError::Artifact {
            path: PathBuf::from(path),
            source,
        })
    }
}
