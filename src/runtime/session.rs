//! Test sessions: turn a [`Config`] into installed hooks.

use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, Mode};
use crate::replay::{BehaviorCache, CacheError, Mocker};
use crate::runtime::{
    install_mocker, install_shared_mocker, install_shared_tracer, install_tracer, HookGuard,
    RunContext, SharedHookGuard,
};
use crate::trace::{StreamError, TraceSink, TraceWriter, Tracer};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

enum Hooks {
    Off,
    Record(Arc<dyn TraceSink>),
    Replay(Arc<BehaviorCache>),
}

/// Shared, thread-safe state of one record or replay session.
///
/// A session is typically created once per test binary; each test calls
/// [`Session::begin`] on its own thread.
pub struct Session {
    hooks: Hooks,
}

impl Session {
    /// Build a session from configuration. `test_file` locates the trace
    /// stream when no explicit path is configured.
    pub fn from_config(config: &Config, test_file: Option<&Path>) -> Result<Self, SessionError> {
        let session = match config.mode {
            Mode::Off => Self::off(),
            Mode::Record => {
                let path = config.trace_path_for(test_file);
                tracing::debug!(path = %path.display(), "Recording trace stream");
                Self::recording(Arc::new(TraceWriter::append_to(&path)?))
            }
            Mode::Replay => {
                let path = config.cache_path();
                tracing::debug!(path = %path.display(), "Replaying behavior cache");
                Self::replaying(Arc::new(BehaviorCache::load(&path)?))
            }
        };
        Ok(session)
    }

    /// [`Session::from_config`] with [`Config::load`].
    pub fn from_env(test_file: Option<&Path>) -> anyhow::Result<Self> {
        let config = Config::load()?;
        Ok(Self::from_config(&config, test_file)?)
    }

    pub fn off() -> Self {
        Self { hooks: Hooks::Off }
    }

    pub fn recording(sink: Arc<dyn TraceSink>) -> Self {
        Self {
            hooks: Hooks::Record(sink),
        }
    }

    pub fn replaying(cache: Arc<BehaviorCache>) -> Self {
        Self {
            hooks: Hooks::Replay(cache),
        }
    }

    pub fn mode(&self) -> Mode {
        match self.hooks {
            Hooks::Off => Mode::Off,
            Hooks::Record(_) => Mode::Record,
            Hooks::Replay(_) => Mode::Replay,
        }
    }

    /// Start one logical run on the current thread. Hooks stay installed until
    /// the guard drops; replay cursors start fresh for every run.
    ///
    /// Calls made on other threads or spawned tasks do not see these hooks;
    /// use [`Session::begin_shared`] for runs that fan out.
    pub fn begin(&self, run_id: impl Into<String>) -> RunGuard {
        self.start(RunContext::new(run_id), false)
    }

    /// Start a run whose hooks serve every thread that has none of its own,
    /// including tokio worker threads. Concurrent shared runs are not
    /// isolated from each other: the most recent one wins.
    pub fn begin_shared(&self, run_id: impl Into<String>) -> RunGuard {
        self.start(RunContext::new(run_id), true)
    }

    fn start(&self, run: RunContext, shared: bool) -> RunGuard {
        let hook = match &self.hooks {
            Hooks::Off => None,
            Hooks::Record(sink) => {
                let tracer = Tracer::new(sink.clone(), run.clone());
                Some(if shared {
                    Installed::Shared(install_shared_tracer(tracer))
                } else {
                    Installed::Thread(install_tracer(tracer))
                })
            }
            Hooks::Replay(cache) => {
                let mocker = Arc::new(Mocker::new(cache.clone(), run.clone()));
                Some(if shared {
                    Installed::Shared(install_shared_mocker(mocker))
                } else {
                    Installed::Thread(install_mocker(mocker))
                })
            }
        };
        tracing::debug!(run_id = %run.get(), shared, "Started run");
        RunGuard { run, _hook: hook }
    }

    /// [`Session::begin`] under a random run id.
    pub fn begin_fresh(&self) -> RunGuard {
        self.begin(uuid::Uuid::new_v4().to_string())
    }
}

enum Installed {
    Thread(HookGuard),
    Shared(SharedHookGuard),
}

/// One active run. Dropping it uninstalls the run's hooks.
#[must_use = "hooks are uninstalled when the guard is dropped"]
pub struct RunGuard {
    run: RunContext,
    _hook: Option<Installed>,
}

impl RunGuard {
    pub fn run_id(&self) -> String {
        self.run.get()
    }

    /// Context shared with the installed hooks; setting it switches runs.
    pub fn context(&self) -> &RunContext {
        &self.run
    }
}
