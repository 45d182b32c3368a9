/// Error taxonomy and the per-object diagnostics accumulator
///
/// Fallible operations return [`Result`]. Fluent operations that must keep a
/// chain going after a failure push the failure into a [`Diagnostics`] value
/// owned by the object instead of returning it.
use crate::value::ValueType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The caller violated a precondition. Object state is left unchanged.
    #[error("usage error: {0}")]
    Usage(String),

    /// The engine reported a failure; `message` is its diagnostic text verbatim.
    #[error("{context}: {message}")]
    Engine { context: String, message: String },

    /// A [`crate::Value`] was narrowed to a variant that is not active.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueType, found: ValueType },

    /// A registry mutex was poisoned by a panic on another thread.
    #[error("mutex poisoned in {0}")]
    Poisoned(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    pub(crate) fn engine(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Engine {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    pub fn is_engine(&self) -> bool {
        matches!(self, Error::Engine { .. })
    }
}

/// Failures recorded by fluent calls on a [`crate::Connection`] or [`crate::Statement`].
///
/// Errors are kept in the order they occurred. Each one is also emitted as a
/// `tracing` warning when recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<Error>,
}

impl Diagnostics {
    /// Keep the success value, or record the failure and return `None`.
    pub(crate) fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %err, "operation failed");
                self.errors.push(err);
                None
            }
        }
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn last(&self) -> Option<&Error> {
        self.errors.last()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Drain every recorded error.
    pub fn take(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    /// `Err` with the earliest recorded failure, clearing the accumulator.
    pub fn check(&mut self) -> Result<()> {
        let mut errors = self.take().into_iter();
        match errors.next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}
