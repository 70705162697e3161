use crate::config::CheckPolicy;
use crate::error::Result;
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// The kind of a queued step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Filter,
    Map,
    FlatMap,
    Sort,
    Distinct,
    Peek,
    Call,
    Check,
    Limit,
    Skip,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Filter => "filter",
            StepKind::Map => "map",
            StepKind::FlatMap => "flat_map",
            StepKind::Sort => "sort",
            StepKind::Distinct => "distinct",
            StepKind::Peek => "peek",
            StepKind::Call => "call",
            StepKind::Check => "check",
            StepKind::Limit => "limit",
            StepKind::Skip => "skip",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one entry in a stream's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    /// Zero-based position in the queue
    pub position: usize,
    pub kind: StepKind,
    /// Whether the callable receives the element's position in the current sequence
    pub uses_index: bool,
}

impl StepInfo {
    pub(crate) fn label(&self) -> String {
        format!("{} step #{}", self.kind, self.position)
    }
}

pub(crate) type Predicate<T> = Box<dyn Fn(&T, usize) -> bool>;
pub(crate) type Relation<T> = Box<dyn Fn(&T, &T) -> bool>;
pub(crate) type Inspector<T> = Box<dyn Fn(&T, usize)>;
pub(crate) type Mapper<T, U> = Box<dyn Fn(T, usize) -> Result<U>>;
pub(crate) type Expander<T, U> = Box<dyn Fn(T, usize) -> Vec<U>>;

/// A step that changes the element type
pub(crate) enum Transform<T, U> {
    Map(Mapper<T, U>),
    FlatMap(Expander<T, U>),
}

impl<T, U> Transform<T, U> {
    pub(crate) fn apply(&self, items: Vec<T>) -> Result<Vec<U>> {
        match self {
            Transform::Map(f) => map_all(items, f),
            Transform::FlatMap(f) => Ok(flat_map_all(items, f)),
        }
    }
}

/// A step that keeps the element type
pub(crate) enum Step<T> {
    Filter(Predicate<T>),
    Sort(Relation<T>),
    Distinct(Relation<T>),
    Peek(Inspector<T>),
    Call(Box<dyn Fn()>),
    Check(Box<dyn Fn(&[T]) -> bool>),
    Limit(usize),
    Skip(usize),
}

impl<T> Step<T> {
    pub(crate) fn kind(&self) -> StepKind {
        match self {
            Step::Filter(_) => StepKind::Filter,
            Step::Sort(_) => StepKind::Sort,
            Step::Distinct(_) => StepKind::Distinct,
            Step::Peek(_) => StepKind::Peek,
            Step::Call(_) => StepKind::Call,
            Step::Check(_) => StepKind::Check,
            Step::Limit(_) => StepKind::Limit,
            Step::Skip(_) => StepKind::Skip,
        }
    }

    /// Apply the step to a non-empty intermediate sequence
    pub(crate) fn apply(&self, items: Vec<T>, policy: CheckPolicy) -> Vec<T> {
        match self {
            Step::Filter(keep) => filter(items, keep),
            Step::Sort(less) => sort(items, less),
            Step::Distinct(eq) => distinct(items, eq),
            Step::Peek(inspect) => {
                for (i, item) in items.iter().enumerate() {
                    inspect(item, i);
                }
                items
            }
            Step::Call(call) => {
                call();
                items
            }
            Step::Check(check) => {
                if check(&items) || policy == CheckPolicy::Ignore {
                    items
                } else {
                    debug!(len = items.len(), "check failed, halting queue");
                    Vec::new()
                }
            }
            Step::Limit(n) => limit(items, *n),
            Step::Skip(n) => skip(items, *n),
        }
    }
}

/// Turn a strict less-than relation into a total ordering for the slice sorts
fn ordering<T>(less: &dyn Fn(&T, &T) -> bool, a: &T, b: &T) -> Ordering {
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

fn filter<T>(items: Vec<T>, keep: &Predicate<T>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(i, item)| keep(item, *i))
        .map(|(_, item)| item)
        .collect()
}

fn sort<T>(mut items: Vec<T>, less: &Relation<T>) -> Vec<T> {
    items.sort_unstable_by(|a, b| ordering(&**less, a, b));
    items
}

// Every candidate is compared against the elements kept so far.
fn distinct<T>(items: Vec<T>, eq: &Relation<T>) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|seen| eq(&item, seen)) {
            kept.push(item);
        }
    }
    kept
}

fn limit<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    items.truncate(n);
    items
}

fn skip<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let n = n.min(items.len());
    items.drain(..n);
    items
}

fn map_all<T, U>(items: Vec<T>, f: &Mapper<T, U>) -> Result<Vec<U>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| f(item, i))
        .collect()
}

fn flat_map_all<T, U>(items: Vec<T>, f: &Expander<T, U>) -> Vec<U> {
    items
        .into_iter()
        .enumerate()
        .flat_map(|(i, item)| f(item, i))
        .collect()
}

/// Clamp a caller-supplied count; negative requests become zero
pub(crate) fn clamp_count(n: isize) -> usize {
    usize::try_from(n).unwrap_or(0)
}
