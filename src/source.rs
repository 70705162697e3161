//! Constructors that normalize a source into a stream's owned sequence.

use crate::config::GeneratorOptions;
use crate::error::{Result, StreamError};
use crate::invoke::{guarded, Callable, Signature, TypeTag};
use crate::pipeline::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;

/// Try each fixed array length in turn
macro_rules! array_items {
    ($elem:ty, $candidate:expr; $($n:literal)*) => {
        None $(.or_else(|| array_of::<$elem, $n>($candidate)))*
    };
}

impl<S: Clone + 'static> Stream<S> {
    /// Take ownership of `source` as the stream's sequence
    pub fn from_vec(source: Vec<S>) -> Self {
        Self::with_source(source)
    }

    /// Copy `source` into a new stream, preserving order
    pub fn from_slice(source: &[S]) -> Self {
        Self::with_source(source.to_vec())
    }

    /// Build a stream from a fixed list of values
    pub fn of<const N: usize>(values: [S; N]) -> Self {
        Self::with_source(Vec::from(values))
    }

    /// Build a stream from a dynamically typed candidate.
    ///
    /// Accepts `Vec<S>`, `VecDeque<S>`, `Box<[S]>`, `Rc<[S]>`, `Arc<[S]>`,
    /// arrays `[S; N]` with `N` up to 32, and `Box`, `Rc` or `Arc` pointing at
    /// a vector. Anything else fails with `InvalidSource`; longer arrays go
    /// through [`Stream::of`].
    pub fn from_any(candidate: &dyn Any) -> Result<Self> {
        let items = sequence_items::<S>(candidate)
            .or_else(|| array_items!(S, candidate; 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16
                17 18 19 20 21 22 23 24 25 26 27 28 29 30 31 32))
            .ok_or_else(|| {
                StreamError::InvalidSource(format!(
                    "expected a sequence of `{}` or a pointer to one",
                    type_name::<S>()
                ))
            })?;
        Ok(Self::with_source(items))
    }

    /// Run a stepping function from `seed`: each call receives the previous
    /// value and returns the next one plus whether to continue. The value that
    /// signals stop is kept.
    pub fn iterate(seed: S, step: impl FnMut(&S) -> (S, bool)) -> Result<Self> {
        Self::iterate_with(seed, step, &GeneratorOptions::default())
    }

    pub fn iterate_with(
        seed: S,
        mut step: impl FnMut(&S) -> (S, bool),
        options: &GeneratorOptions,
    ) -> Result<Self> {
        let items = guarded("iterate", || {
            drive(options, |items| Ok(step(items.last().unwrap_or(&seed))))
        })?;
        Ok(Self::with_source(items))
    }

    /// Call a generator until it signals stop; the final value is kept
    pub fn generate(generator: impl FnMut() -> (S, bool)) -> Result<Self> {
        Self::generate_with(generator, &GeneratorOptions::default())
    }

    pub fn generate_with(
        mut generator: impl FnMut() -> (S, bool),
        options: &GeneratorOptions,
    ) -> Result<Self> {
        let items = guarded("generate", || drive(options, |_| Ok(generator())))?;
        Ok(Self::with_source(items))
    }

    /// Drive a type-erased generator of shape `() -> (S, bool)`.
    ///
    /// In strict mode the recorded signature is validated before the first
    /// call and a mismatch is reported as `ShapeError`. Otherwise the mismatch
    /// shows up as `InvocationError` on the first call.
    pub fn generate_callable(mut generator: Callable, options: &GeneratorOptions) -> Result<Self> {
        if options.is_strict() {
            let expected = Signature::new(Vec::new(), TypeTag::of::<(S, bool)>());
            if let Err(StreamError::ShapeError(reason)) = generator.signature().validate(&expected) {
                warn!(%reason, "generator rejected by strict validation");
                return Err(StreamError::ShapeError(format!(
                    "{}, must be like `{}`",
                    reason, expected
                )));
            }
        }
        let items = guarded("generate_callable", || {
            drive(options, |_| generator.call0::<(S, bool)>())
        })?;
        Ok(Self::with_source(items))
    }

    /// Call `f(i)` for `i` in `0..count`. A count of zero gives an empty stream.
    pub fn generate_n(count: isize, f: impl FnMut(usize) -> S) -> Result<Self> {
        let count = usize::try_from(count).map_err(|_| StreamError::NegativeCount(count))?;
        let items: Vec<S> = guarded("generate_n", || Ok((0..count).map(f).collect()))?;
        Ok(Self::with_source(items))
    }
}

impl<S: Clone + DeserializeOwned + 'static> Stream<S> {
    /// Build a stream from a JSON array, deserializing every element into `S`
    pub fn from_json(value: Value) -> Result<Self> {
        let elements = match value {
            Value::Array(elements) => elements,
            other => {
                return Err(StreamError::InvalidSource(format!(
                    "expected a JSON array, found {}",
                    json_kind(&other)
                )))
            }
        };
        let items = elements
            .into_iter()
            .enumerate()
            .map(|(i, element)| {
                serde_json::from_value(element).map_err(|e| {
                    StreamError::InvalidSource(format!(
                        "element {} is not a `{}`: {}",
                        i,
                        type_name::<S>(),
                        e
                    ))
                })
            })
            .collect::<Result<Vec<S>>>()?;
        Ok(Self::with_source(items))
    }
}

impl Stream<i64> {
    pub fn ints(values: impl IntoIterator<Item = i64>) -> Self {
        values.into_iter().collect()
    }
}

impl Stream<f64> {
    pub fn floats(values: impl IntoIterator<Item = f64>) -> Self {
        values.into_iter().collect()
    }
}

impl Stream<String> {
    pub fn strings<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        values.into_iter().map(Into::<String>::into).collect()
    }
}

impl<S: Clone + 'static> From<Vec<S>> for Stream<S> {
    fn from(source: Vec<S>) -> Self {
        Self::with_source(source)
    }
}

impl<S: Clone + 'static> FromIterator<S> for Stream<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::with_source(iter.into_iter().collect())
    }
}

fn array_of<S: Clone + 'static, const N: usize>(candidate: &dyn Any) -> Option<Vec<S>> {
    candidate.downcast_ref::<[S; N]>().map(|items| items.to_vec())
}

fn sequence_items<S: Clone + 'static>(candidate: &dyn Any) -> Option<Vec<S>> {
    if let Some(items) = candidate.downcast_ref::<Vec<S>>() {
        Some(items.clone())
    } else if let Some(items) = candidate.downcast_ref::<VecDeque<S>>() {
        Some(items.iter().cloned().collect())
    } else if let Some(items) = candidate.downcast_ref::<Box<[S]>>() {
        Some(items.to_vec())
    } else if let Some(items) = candidate.downcast_ref::<Rc<[S]>>() {
        Some(items.to_vec())
    } else if let Some(items) = candidate.downcast_ref::<Arc<[S]>>() {
        Some(items.to_vec())
    } else if let Some(items) = candidate.downcast_ref::<Box<Vec<S>>>() {
        Some(items.as_ref().clone())
    } else if let Some(items) = candidate.downcast_ref::<Rc<Vec<S>>>() {
        Some(items.as_ref().clone())
    } else {
        candidate
            .downcast_ref::<Arc<Vec<S>>>()
            .map(|items| items.as_ref().clone())
    }
}

/// Shared generator loop. Stops on the first `false`, fails on cancellation,
/// and fails once the bound is reached while the generator still asks for more.
fn drive<S>(
    options: &GeneratorOptions,
    mut next: impl FnMut(&[S]) -> Result<(S, bool)>,
) -> Result<Vec<S>> {
    let mut items = Vec::new();
    loop {
        if options.cancel_token().is_some_and(|token| token.is_cancelled()) {
            warn!(produced = items.len(), "generator cancelled");
            return Err(StreamError::Cancelled {
                produced: items.len(),
            });
        }

        let (value, more) = next(&items)?;
        items.push(value);
        if !more {
            return Ok(items);
        }
        if let Some(limit) = options.max_iterations() {
            if items.len() >= limit {
                warn!(limit, "generator hit its iteration limit");
                return Err(StreamError::IterationLimitExceeded(limit));
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CancelToken;
    use std::cell::Cell;

    #[test]
    fn test_from_any_accepts_sequences() {
        let vec: Vec<i32> = vec![1, 2, 3];
        assert_eq!(Stream::<i32>::from_any(&vec).unwrap().source(), &[1, 2, 3]);

        let boxed: Box<Vec<i32>> = Box::new(vec![4, 5]);
        assert_eq!(Stream::<i32>::from_any(&boxed).unwrap().source(), &[4, 5]);

        let deque: VecDeque<i32> = VecDeque::from(vec![6]);
        assert_eq!(Stream::<i32>::from_any(&deque).unwrap().source(), &[6]);

        let shared = Arc::new(vec![7, 8]);
        assert_eq!(Stream::<i32>::from_any(&shared).unwrap().source(), &[7, 8]);

        let slice: Rc<[i32]> = Rc::from(vec![9, 10]);
        assert_eq!(Stream::<i32>::from_any(&slice).unwrap().source(), &[9, 10]);

        let slice: Arc<[i32]> = Arc::from(vec![11]);
        assert_eq!(Stream::<i32>::from_any(&slice).unwrap().source(), &[11]);
    }

    #[test]
    fn test_from_any_accepts_fixed_arrays() {
        assert_eq!(Stream::<i32>::from_any(&[1, 2, 3]).unwrap().source(), &[1, 2, 3]);
        let empty: [i32; 0] = [];
        assert!(Stream::<i32>::from_any(&empty).unwrap().source().is_empty());
        assert_eq!(Stream::<u8>::from_any(&[7_u8; 32]).unwrap().source().len(), 32);
        assert!(matches!(
            Stream::<u8>::from_any(&[7_u8; 33]),
            Err(StreamError::InvalidSource(_))
        ));
        assert!(matches!(
            Stream::<i64>::from_any(&[1_i32, 2]),
            Err(StreamError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_from_any_rejects_scalars_and_wrong_types() {
        assert!(matches!(
            Stream::<i32>::from_any(&42_i32),
            Err(StreamError::InvalidSource(_))
        ));
        let strings = vec!["a".to_string()];
        assert!(matches!(
            Stream::<i32>::from_any(&strings),
            Err(StreamError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_iterate_keeps_stop_value() {
        let stream = Stream::iterate(1, |prev| (prev * 2, *prev < 16)).unwrap();
        assert_eq!(stream.source(), &[2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_generate_until_stop() {
        let n = Cell::new(0);
        let stream = Stream::generate(|| {
            n.set(n.get() + 1);
            (n.get(), n.get() < 4)
        })
        .unwrap();
        assert_eq!(stream.source(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_generator_bound() {
        let options = GeneratorOptions::new().with_max_iterations(5);
        let err = Stream::generate_with(|| (0_u8, true), &options).unwrap_err();
        assert!(matches!(err, StreamError::IterationLimitExceeded(5)));

        let stops_in_time = Stream::iterate_with(0, |p| (p + 1, *p + 1 < 5), &options).unwrap();
        assert_eq!(stops_in_time.source(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_zero_bound_still_allows_a_stopping_call() {
        let options = GeneratorOptions::new().with_max_iterations(0);
        let once = Stream::generate_with(|| (1, false), &options).unwrap();
        assert_eq!(once.source(), &[1]);

        let err = Stream::generate_with(|| (1, true), &options).unwrap_err();
        assert!(matches!(err, StreamError::IterationLimitExceeded(0)));
    }

    #[test]
    fn test_generator_cancellation() {
        let token = CancelToken::new();
        let options = GeneratorOptions::new().with_cancel_token(token.clone());
        let produced = Cell::new(0);
        let err = Stream::generate_with(
            || {
                produced.set(produced.get() + 1);
                if produced.get() == 3 {
                    token.cancel();
                }
                (produced.get(), true)
            },
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Cancelled { produced: 3 }));
    }

    #[test]
    fn test_generate_callable_strict_and_lazy() {
        let strict = GeneratorOptions::new().strict(true);
        let wrong = Callable::nullary(|| 1_i32);
        let err = Stream::<i32>::generate_callable(wrong, &strict).unwrap_err();
        assert!(matches!(err, StreamError::ShapeError(_)));

        let wrong = Callable::nullary(|| 1_i32);
        let err = Stream::<i32>::generate_callable(wrong, &GeneratorOptions::new()).unwrap_err();
        assert!(matches!(err, StreamError::InvocationError { .. }));

        let mut left = 3;
        let right = Callable::nullary(move || {
            left -= 1;
            (left, left > 0)
        });
        let stream = Stream::<i32>::generate_callable(right, &strict).unwrap();
        assert_eq!(stream.source(), &[2, 1, 0]);
    }

    #[test]
    fn test_generate_n() {
        let stream = Stream::generate_n(4, |i| i * i).unwrap();
        assert_eq!(stream.source(), &[0, 1, 4, 9]);
        assert!(Stream::generate_n(0, |i| i).unwrap().source().is_empty());
        assert!(matches!(
            Stream::generate_n(-2, |i| i),
            Err(StreamError::NegativeCount(-2))
        ));
    }

    #[test]
    fn test_from_json() {
        let stream = Stream::<u32>::from_json(serde_json::json!([3, 1, 2])).unwrap();
        assert_eq!(stream.source(), &[3, 1, 2]);

        let err = Stream::<u32>::from_json(serde_json::json!(7)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid source: expected a JSON array, found a number");

        let err = Stream::<u32>::from_json(serde_json::json!([1, "two"])).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_typed_constructors() {
        assert_eq!(Stream::ints([3, -1]).source(), &[3, -1]);
        assert_eq!(Stream::floats([0.5]).source(), &[0.5]);
        assert_eq!(Stream::strings(["a", "b"]).source(), &["a".to_string(), "b".to_string()]);
        assert_eq!(Stream::of([1, 2]).element_type(), "i32");
        let collected: Stream<char> = "hi".chars().collect();
        assert_eq!(collected.source(), &['h', 'i']);
    }
}
