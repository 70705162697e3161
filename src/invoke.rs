//! Uniform invocation of caller-supplied callables.
//!
//! Typed step closures are checked by the compiler, so the engine only has to
//! turn a panicking callable into an [`StreamError::InvocationError`]. Callables
//! that arrive type-erased are wrapped in a [`Callable`], which records a
//! [`Signature`] so the shape can be validated before first use.

use crate::error::{Result, StreamError};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Run `f`, converting a panic inside it into an invocation error for `operation`
pub(crate) fn guarded<R>(operation: &str, f: impl FnOnce() -> Result<R>) -> Result<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(operation, %reason, "callable panicked");
            Err(StreamError::invocation(operation, reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "callable panicked".to_string()
    }
}

/// A runtime tag for a concrete type
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Readable type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Argument and result types of a callable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inputs: Vec<TypeTag>,
    output: TypeTag,
}

impl Signature {
    /// Signature taking `inputs` and returning `output`
    pub fn new(inputs: Vec<TypeTag>, output: TypeTag) -> Self {
        Self { inputs, output }
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[TypeTag] {
        &self.inputs
    }

    pub fn output(&self) -> TypeTag {
        self.output
    }

    /// Compare against an expected shape: arity first, then each argument,
    /// then the result
    pub fn validate(&self, expected: &Signature) -> Result<()> {
        if self.arity() != expected.arity() {
            return Err(StreamError::ShapeError(format!(
                "expected {} arguments, found {} in `{}`",
                expected.arity(),
                self.arity(),
                self
            )));
        }
        for (i, (found, wanted)) in self.inputs.iter().zip(&expected.inputs).enumerate() {
            if found != wanted {
                return Err(StreamError::ShapeError(format!(
                    "argument {} is `{}`, expected `{}`",
                    i, found, wanted
                )));
            }
        }
        if self.output != expected.output {
            return Err(StreamError::ShapeError(format!(
                "result is `{}`, expected `{}`",
                self.output, expected.output
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", input)?;
        }
        write!(f, ") -> {}", self.output)
    }
}

/// A type-erased callable together with its recorded signature
pub struct Callable {
    signature: Signature,
    inner: Box<dyn Any>,
}

impl Callable {
    /// Erase a zero-argument callable
    pub fn nullary<R: 'static>(f: impl FnMut() -> R + 'static) -> Self {
        let f: Box<dyn FnMut() -> R> = Box::new(f);
        Self {
            signature: Signature::new(Vec::new(), TypeTag::of::<R>()),
            inner: Box::new(f),
        }
    }

    /// Shape recorded when the callable was erased
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke as `fn() -> R`
    pub fn call0<R: 'static>(&mut self) -> Result<R> {
        let expected = Signature::new(Vec::new(), TypeTag::of::<R>());
        match self.inner.downcast_mut::<Box<dyn FnMut() -> R>>() {
            Some(f) => Ok(f()),
            None => Err(self.mismatch(&expected)),
        }
    }

    fn mismatch(&self, expected: &Signature) -> StreamError {
        StreamError::invocation(
            format!("`{}`", self.signature),
            format!("cannot convert arguments for a call as `{}`", expected),
        )
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("signature", &self.signature.to_string())
            .finish()
    }
}
