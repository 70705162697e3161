use crate::config::StreamConfig;
use crate::error::{BoxError, Result, StreamError};
use crate::invoke::guarded;
use crate::metrics::StepMetrics;
use crate::step::{clamp_count, Step, StepInfo, StepKind, Transform};
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, trace};

/// A type-erased intermediate sequence. Steps may change the element type,
/// so the queue passes sequences between steps behind this trait.
trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: 'static> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

type Batch = Box<dyn Sequence>;
type StageFn = Box<dyn Fn(Batch, &StreamConfig) -> Result<Batch>>;

/// One queued step: its label, its metrics and the typed work it does
struct Stage {
    label: String,
    metrics: StepMetrics,
    apply: StageFn,
}

impl Stage {
    /// Run the stage, skipping it when the sequence is already empty
    fn run(&self, batch: Batch, config: &StreamConfig) -> Result<Batch> {
        if batch.is_empty() {
            self.metrics.record_skip();
            trace!(step = %self.label, "sequence empty, step skipped");
            return Ok(batch);
        }

        let input_len = batch.len();
        let start = Instant::now();
        let output = guarded(&self.label, || (self.apply)(batch, config))?;
        self.metrics.record_run(input_len, output.len(), start.elapsed());
        trace!(
            step = %self.label,
            input_len,
            output_len = output.len(),
            "step executed"
        );
        Ok(output)
    }
}

/// Recover the typed sequence handed over by the previous stage
fn downcast<T: 'static>(batch: Batch, operation: &str) -> Result<Vec<T>> {
    batch
        .into_any()
        .downcast::<Vec<T>>()
        .map(|items| *items)
        .map_err(|_| {
            StreamError::invocation(
                operation,
                format!("intermediate sequence is not a `Vec<{}>`", type_name::<T>()),
            )
        })
}

/// A deferred pipeline over an owned source sequence.
///
/// `S` is the source element type, `T` the element type produced by the
/// queued steps. Chaining methods append to the queue and return the stream;
/// nothing runs until a terminal operation is called, and every terminal
/// operation replays the whole queue from the source.
pub struct Stream<S, T = S> {
    source: Vec<S>,
    stages: Vec<Stage>,
    steps: Vec<StepInfo>,
    config: StreamConfig,
    output: PhantomData<fn() -> T>,
}

impl<S: Clone + 'static> Stream<S> {
    pub(crate) fn with_source(source: Vec<S>) -> Self {
        debug!(
            element_type = type_name::<S>(),
            len = source.len(),
            "stream created"
        );
        Self {
            source,
            stages: Vec::new(),
            steps: Vec::new(),
            config: StreamConfig::default(),
            output: PhantomData,
        }
    }
}

impl<S: Clone + 'static, T: 'static> Stream<S, T> {
    /// Attach evaluation settings
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Evaluation settings in effect
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The stored source, never modified by the queue
    pub fn source(&self) -> &[S] {
        &self.source
    }

    /// Name of the source element type
    pub fn element_type(&self) -> &'static str {
        type_name::<S>()
    }

    /// The queued steps in execution order
    pub fn steps(&self) -> &[StepInfo] {
        &self.steps
    }

    /// Get metrics for the step at `position`
    pub fn step_metrics(&self, position: usize) -> Option<&StepMetrics> {
        self.stages.get(position).map(|stage| &stage.metrics)
    }

    /// Metrics of every queued step, in queue order
    pub fn all_metrics(&self) -> Vec<&StepMetrics> {
        self.stages.iter().map(|stage| &stage.metrics).collect()
    }

    /// Get a summary of all step metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Stream Metrics Summary:\n");
        for (i, stage) in self.stages.iter().enumerate() {
            summary.push_str(&format!("  Step {}: {}\n", i, stage.metrics.snapshot().format()));
        }
        summary
    }

    /// Drop every queued step, keeping the source and config
    pub fn reset(self) -> Stream<S> {
        debug!(dropped = self.steps.len(), "queue reset");
        Stream::with_source(self.source).with_config(self.config)
    }

    /// Run the queue against the source, one stage after another
    pub(crate) fn evaluate(&self, operation: &'static str) -> Result<Vec<T>> {
        debug!(
            operation,
            steps = self.steps.len(),
            source_len = self.source.len(),
            "evaluating queue"
        );
        let mut batch: Batch = Box::new(self.source.clone());
        for stage in &self.stages {
            batch = stage.run(batch, &self.config)?;
        }
        // Once empty, the remaining stages were skipped and the batch may
        // still hold an earlier element type.
        let items = if batch.is_empty() {
            Vec::new()
        } else {
            downcast::<T>(batch, operation)?
        };
        debug!(operation, output_len = items.len(), "queue evaluated");
        Ok(items)
    }

    fn enqueue(&mut self, kind: StepKind, uses_index: bool, apply: StageFn) {
        let info = StepInfo {
            position: self.steps.len(),
            kind,
            uses_index,
        };
        self.stages.push(Stage {
            label: info.label(),
            metrics: StepMetrics::new(kind),
            apply,
        });
        self.steps.push(info);
    }

    fn push(mut self, uses_index: bool, step: Step<T>) -> Self {
        let kind = step.kind();
        let apply: StageFn = Box::new(move |batch: Batch, config: &StreamConfig| {
            let items = downcast::<T>(batch, kind.as_str())?;
            Ok(Box::new(step.apply(items, config.check_policy())) as Batch)
        });
        self.enqueue(kind, uses_index, apply);
        self
    }

    fn convert<U: 'static>(
        mut self,
        kind: StepKind,
        uses_index: bool,
        transform: Transform<T, U>,
    ) -> Stream<S, U> {
        let apply: StageFn = Box::new(move |batch: Batch, _config: &StreamConfig| {
            let items = downcast::<T>(batch, kind.as_str())?;
            Ok(Box::new(transform.apply(items)?) as Batch)
        });
        self.enqueue(kind, uses_index, apply);
        Stream {
            source: self.source,
            stages: self.stages,
            steps: self.steps,
            config: self.config,
            output: PhantomData,
        }
    }

    /// Label the next appended step will carry
    fn pending_label(&self, kind: StepKind) -> String {
        StepInfo {
            position: self.steps.len(),
            kind,
            uses_index: false,
        }
        .label()
    }

    /// Keep elements for which `keep` returns true
    pub fn filter(self, keep: impl Fn(&T) -> bool + 'static) -> Self {
        self.push(false, Step::Filter(Box::new(move |item, _| keep(item))))
    }

    /// Filter with the element's position in the current sequence
    pub fn filter_indexed(self, keep: impl Fn(&T, usize) -> bool + 'static) -> Self {
        self.push(true, Step::Filter(Box::new(keep)))
    }

    /// Replace each element with `f(element)`
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Stream<S, U> {
        self.convert(
            StepKind::Map,
            false,
            Transform::Map(Box::new(move |item, _| Ok(f(item)))),
        )
    }

    /// Map with the element's position in the current sequence
    pub fn map_indexed<U: 'static>(self, f: impl Fn(T, usize) -> U + 'static) -> Stream<S, U> {
        self.convert(
            StepKind::Map,
            true,
            Transform::Map(Box::new(move |item, i| Ok(f(item, i)))),
        )
    }

    /// Map with a fallible conversion; the first error aborts the terminal
    /// operation with an `InvocationError`
    pub fn try_map<U: 'static, E: Into<BoxError> + 'static>(
        self,
        f: impl Fn(T) -> std::result::Result<U, E> + 'static,
    ) -> Stream<S, U> {
        let label = self.pending_label(StepKind::Map);
        self.convert(
            StepKind::Map,
            false,
            Transform::Map(Box::new(move |item, _| {
                f(item).map_err(|e| StreamError::callback(label.as_str(), e))
            })),
        )
    }

    /// Fallible map with the element's position in the current sequence
    pub fn try_map_indexed<U: 'static, E: Into<BoxError> + 'static>(
        self,
        f: impl Fn(T, usize) -> std::result::Result<U, E> + 'static,
    ) -> Stream<S, U> {
        let label = self.pending_label(StepKind::Map);
        self.convert(
            StepKind::Map,
            true,
            Transform::Map(Box::new(move |item, i| {
                f(item, i).map_err(|e| StreamError::callback(label.as_str(), e))
            })),
        )
    }

    /// Replace each element with the items of `f(element)`, concatenated in order
    pub fn flat_map<U: 'static, I: IntoIterator<Item = U>>(
        self,
        f: impl Fn(T) -> I + 'static,
    ) -> Stream<S, U> {
        self.convert(
            StepKind::FlatMap,
            false,
            Transform::FlatMap(Box::new(move |item, _| f(item).into_iter().collect())),
        )
    }

    /// Flat-map with the element's position in the current sequence
    pub fn flat_map_indexed<U: 'static, I: IntoIterator<Item = U>>(
        self,
        f: impl Fn(T, usize) -> I + 'static,
    ) -> Stream<S, U> {
        self.convert(
            StepKind::FlatMap,
            true,
            Transform::FlatMap(Box::new(move |item, i| f(item, i).into_iter().collect())),
        )
    }

    /// Reorder with a strict less-than comparator. The sort is not stable.
    pub fn sort(self, less: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.push(false, Step::Sort(Box::new(less)))
    }

    /// Keep the first occurrence of each element under `eq`
    pub fn distinct(self, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.push(false, Step::Distinct(Box::new(eq)))
    }

    /// Observe each element without changing the sequence
    pub fn peek(self, inspect: impl Fn(&T) + 'static) -> Self {
        self.push(false, Step::Peek(Box::new(move |item, _| inspect(item))))
    }

    /// Observe each element together with its position
    pub fn peek_indexed(self, inspect: impl Fn(&T, usize) + 'static) -> Self {
        self.push(true, Step::Peek(Box::new(inspect)))
    }

    /// Invoke `f` once when the queue reaches this point
    pub fn call(self, f: impl Fn() + 'static) -> Self {
        self.push(false, Step::Call(Box::new(f)))
    }

    /// Hand the whole intermediate sequence to `check`. A `false` answer halts
    /// the queue unless the config says `CheckPolicy::Ignore`.
    pub fn check(self, check: impl Fn(&[T]) -> bool + 'static) -> Self {
        self.push(false, Step::Check(Box::new(check)))
    }

    /// Keep at most `n` leading elements; negative `n` keeps none
    pub fn limit(self, n: isize) -> Self {
        self.push(false, Step::Limit(clamp_count(n)))
    }

    /// Drop the first `n` elements; negative `n` drops none
    pub fn skip(self, n: isize) -> Self {
        self.push(false, Step::Skip(clamp_count(n)))
    }
}

impl<S, T> fmt::Debug for Stream<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("element_type", &type_name::<S>())
            .field("source_len", &self.source.len())
            .field("steps", &self.steps)
            .field("config", &self.config)
            .finish()
    }
}
