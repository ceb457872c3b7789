use std::error::Error as StdError;

use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("lifecycle scope is already torn down")]
    LifecycleClosed,

    /// Engine failure raised from a deferred job, passed through untouched.
    #[error(transparent)]
    Engine(Box<dyn StdError + 'static>),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl ChartError {
    #[must_use]
    pub fn engine<E>(err: E) -> Self
    where
        E: StdError + 'static,
    {
        Self::Engine(Box::new(err))
    }

    /// Returns the original engine error when this is an engine failure of type `E`.
    #[must_use]
    pub fn engine_error<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Engine(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}
