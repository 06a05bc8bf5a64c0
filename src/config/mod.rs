mod settings;

pub use settings::{
    Config, ConfigError, Mode, TransformConfig, CONFIG_FILE, DEFAULT_CACHE_FILE, ENV_CACHE,
    ENV_MODE, ENV_TRACE, TRACE_SUFFIX,
};
