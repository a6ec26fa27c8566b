//! Error types for configuration, construction, and asset loading.

use crate::key::ResourceKey;

/// Reason a backend could not resolve a [`ResourceKey`].
///
/// Load errors never escape [`ResourceCycler::tick`](crate::ResourceCycler::tick);
/// they are logged and the request is dropped without retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The backend has no asset for this key.
    NotFound {
        /// Key that could not be resolved.
        key: ResourceKey,
    },
    /// Backend-specific failure, carried as a message.
    Backend(String),
    /// The worker running the load panicked before producing a result.
    WorkerPanicked {
        /// Key whose load panicked.
        key: ResourceKey,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound { key } => write!(f, "no asset found for key {key}"),
            LoadError::Backend(message) => write!(f, "backend failure: {message}"),
            LoadError::WorkerPanicked { key } => {
                write!(f, "load worker panicked while loading key {key}")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Rejected [`CyclerConfig`](crate::CyclerConfig) values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `universe_size` was zero, so no key can ever be drawn.
    EmptyUniverse,
    /// `admission_range` had `low > high`.
    InvertedAdmissionRange {
        /// Configured lower bound.
        low: usize,
        /// Configured upper bound.
        high: usize,
    },
    /// `cycle_interval` was zero.
    ZeroCycleInterval,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyUniverse => write!(f, "universe_size must be at least 1"),
            ConfigError::InvertedAdmissionRange { low, high } => write!(
                f,
                "admission range is inverted (low {low} > high {high})"
            ),
            ConfigError::ZeroCycleInterval => write!(f, "cycle_interval must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Error returned when a cycler or one of its backends cannot be built.
#[derive(Debug)]
pub enum CyclerError {
    /// The configuration failed [`CyclerConfig::validate`](crate::CyclerConfig::validate).
    Config(ConfigError),
    /// The private loader thread pool could not be created.
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for CyclerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CyclerError::Config(e) => write!(f, "invalid cycler configuration: {e}"),
            CyclerError::ThreadPool(e) => write!(f, "failed to build loader thread pool: {e}"),
        }
    }
}

impl std::error::Error for CyclerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CyclerError::Config(e) => Some(e),
            CyclerError::ThreadPool(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CyclerError {
    fn from(e: ConfigError) -> Self {
        CyclerError::Config(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for CyclerError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        CyclerError::ThreadPool(e)
    }
}
