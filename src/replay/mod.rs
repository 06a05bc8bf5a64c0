//! Behavior caches built from trace streams, and the mock hook that replays them.

pub mod cache;
pub mod canonical;
pub mod error;
pub mod mocker;

pub use cache::{Behavior, BehaviorCache};
pub use error::{CacheError, ReplayError};
pub use mocker::{CallCursor, Mocker};
