use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a check step does when its callable returns `false`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckPolicy {
    /// Clear the intermediate sequence so every remaining step is skipped
    #[default]
    Halt,
    /// Invoke the callable and carry on regardless of its answer
    Ignore,
}

/// Evaluation settings attached to a stream
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    check_policy: CheckPolicy,
}

impl StreamConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy applied to failed check steps
    pub fn with_check_policy(mut self, policy: CheckPolicy) -> Self {
        self.check_policy = policy;
        self
    }

    /// Get the check policy
    pub fn check_policy(&self) -> CheckPolicy {
        self.check_policy
    }
}

/// Cooperative stop signal for generator loops
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not yet cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every clone of this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was signalled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Options for the stepping and generator constructors
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    strict: bool,
    max_iterations: Option<usize>,
    cancel: Option<CancelToken>,
}

impl GeneratorOptions {
    /// Permissive options: no shape check, no bound, no cancellation
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the shape of type-erased generators before the first call
    pub fn strict(mut self, enable: bool) -> Self {
        self.strict = enable;
        self
    }

    /// Fail with `IterationLimitExceeded` once this many elements were produced
    /// without a stop signal
    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// Stop the loop with `Cancelled` once the token fires
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }
}
