//! A deferred-execution operation pipeline over in-memory sequences.
//!
//! A [`Stream`] owns a source sequence and a queue of steps. Chaining methods
//! only append to the queue; a terminal operation replays the whole queue
//! against a fresh copy of the source each time it is called, so one stream
//! can be evaluated any number of times until it is [`Stream::reset`].
//!
//! # Features
//!
//! - Typed steps: filter, map, flat-map, sort, distinct, peek, call, check,
//!   limit and skip, with indexed variants where the position matters
//! - Terminal operations: materialize, for-each, match, count, max/min,
//!   first/last, reduce and group
//! - Empty intermediate sequences short-circuit the rest of the queue
//! - Panicking or failing callables surface as [`StreamError::InvocationError`]
//! - Bounded and cancellable generator constructors
//! - Per-step metrics: runs, element counts, latency percentiles
//!
//! # Example
//!
//! ```
//! use deferred_stream::Stream;
//!
//! let stream = Stream::of([1, 2, 3, 4, 5, 6, 7, 8, 9, 0])
//!     .filter(|x| x % 2 == 0)
//!     .map(|x| x * 2);
//!
//! assert_eq!(stream.reduce(0, |sum, x| sum + x)?, 40);
//! assert_eq!(stream.count()?, 5);
//! # Ok::<(), deferred_stream::StreamError>(())
//! ```

pub mod config;
pub mod error;
pub mod invoke;
pub mod metrics;
pub mod pipeline;
pub mod source;
pub mod step;
pub mod terminal;

// Re-exports for convenience
pub use config::{CancelToken, CheckPolicy, GeneratorOptions, StreamConfig};
pub use error::{BoxError, Result, StreamError};
pub use invoke::{Callable, Signature, TypeTag};
pub use metrics::{MetricsSnapshot, StepMetrics};
pub use pipeline::Stream;
pub use step::{StepInfo, StepKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
