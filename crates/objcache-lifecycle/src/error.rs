use thiserror::Error;

/// Errors that prevent the cache lifecycle from starting.
///
/// Once running, the lifecycle never fails a client session: load and save
/// problems are logged and reported through outcomes instead.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("object cache is disabled (module = {module:?})")]
    Disabled { module: String },

    #[error("no tokio runtime available to schedule checkpoint loads")]
    NoRuntime,

    #[error("persistence error: {0}")]
    Persist(#[from] objcache_persist::PersistError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
