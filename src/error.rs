use thiserror::Error;

/// Result type for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Boxed error returned by fallible caller callables
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building or evaluating a stream
#[derive(Error, Debug)]
pub enum StreamError {
    /// Construction input is not a sequence of the requested element type
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Repeated generation was asked for a negative number of elements
    #[error("Repetition count must not be negative, got {0}")]
    NegativeCount(isize),

    /// A type-erased callable does not have the required shape
    #[error("Callable shape mismatch: {0}")]
    ShapeError(String),

    /// A step or terminal callable failed while the queue was running
    #[error("Invocation of {operation} failed: {reason}")]
    InvocationError {
        /// Step or terminal operation that was running
        operation: String,
        /// Panic payload or error message
        reason: String,
        /// Error returned by the callable, if it returned one
        #[source]
        source: Option<BoxError>,
    },

    /// A generator loop did not signal stop within its bound
    #[error("Generator exceeded the limit of {0} iterations")]
    IterationLimitExceeded(usize),

    /// A generator loop observed its cancel token
    #[error("Generator cancelled after producing {produced} elements")]
    Cancelled {
        /// Elements produced before cancellation was observed
        produced: usize,
    },
}

impl StreamError {
    /// Create an invocation error without an underlying source
    pub fn invocation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvocationError {
            operation: operation.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Wrap an error returned by a caller callable
    pub fn callback(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::InvocationError {
            operation: operation.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Whether the error was raised while constructing a stream
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::InvalidSource(_)
                | Self::NegativeCount(_)
                | Self::ShapeError(_)
                | Self::IterationLimitExceeded(_)
                | Self::Cancelled { .. }
        )
    }
}
