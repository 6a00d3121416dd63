use std::time::Duration;

/// The errors produced by this crate, parameterised over the failure type of the routines
/// being driven.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// [drive][crate::Driver::drive] was given a plain value rather than a deferred result, a
    /// routine or a routine constructor.
    #[error("expected a deferred result, a routine or a routine constructor")]
    InvalidInput,

    /// The routine did not settle within the limit given to [timeout][crate::timeout].
    #[error("routine did not settle within {0:?}")]
    Timeout(Duration),

    /// The routine settled with a failure.
    #[error("routine failed: {0}")]
    Routine(E),
}
