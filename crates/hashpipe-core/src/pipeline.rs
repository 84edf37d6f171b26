//! Pipeline executor: wires stages together with bounded streams
//!
//! For N stages the executor creates N+1 streams. Stream 0 is fed from the
//! caller's input on a feeder thread, stream N is drained by the calling
//! thread. Stage i runs on its own thread reading stream i and writing
//! stream i+1; the writer lives on that thread and is dropped (closing the
//! stream) right after the stage returns.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::PipelineError;
use crate::item::Item;
use crate::shutdown::CancelToken;
use crate::stream::{StreamReader, StreamWriter, stream};

/// Default number of unread items a stream holds before blocking its writer
pub const DEFAULT_STREAM_CAPACITY: usize = 16;

/// One pipeline step.
///
/// Contract: consume `input` until end-of-stream, emit zero or more items to
/// `output`, and return only after every worker the stage spawned has joined.
/// The output stream is borrowed, so a stage cannot close it.
pub trait Stage: Send + Sync {
    /// Short name used for thread names, logs and statistics
    fn name(&self) -> &str;

    fn run(&self, input: StreamReader, output: &StreamWriter) -> Result<(), PipelineError>;
}

/// Stage backed by a plain function or closure. See [`stage_fn`].
pub struct FnStage<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a [`Stage`].
pub fn stage_fn<F>(name: impl Into<String>, f: F) -> FnStage<F>
where
    F: Fn(StreamReader, &StreamWriter) -> Result<(), PipelineError> + Send + Sync,
{
    FnStage {
        name: name.into(),
        f,
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(StreamReader, &StreamWriter) -> Result<(), PipelineError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: StreamReader, output: &StreamWriter) -> Result<(), PipelineError> {
        (self.f)(input, output)
    }
}

/// Per-stage execution statistics
#[derive(Debug, Clone)]
pub struct StageStats {
    pub name: String,
    /// Items written to the stage's output stream
    pub emitted: usize,
    pub elapsed: Duration,
}

/// Result of a successful run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Everything read from the final stream, in arrival order
    pub items: Vec<Item>,
    /// One entry per stage, in pipeline order
    pub stages: Vec<StageStats>,
}

/// Ordered list of stages, executed once.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    stream_capacity: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Append a stage
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Set the capacity of every stream created for this run
    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage concurrently over `input` and collect the final stream.
    ///
    /// Returns once all stages finished and the final stream is closed. If a
    /// stage fails or panics the run is cancelled and the first root-cause
    /// error is returned; no partial output is reported.
    pub fn execute<I>(self, input: I) -> Result<PipelineOutput, PipelineError>
    where
        I: IntoIterator<Item = Item>,
        I::IntoIter: Send,
    {
        let cancel = CancelToken::new();
        let capacity = self.stream_capacity;
        let input = input.into_iter();

        if self.is_empty() {
            log::debug!("Executing empty pipeline; input is returned unchanged");
        } else {
            log::debug!(
                "Executing pipeline with {} stages (stream capacity {capacity})",
                self.len()
            );
        }

        thread::scope(|scope| -> Result<PipelineOutput, PipelineError> {
            let (feed, mut upstream) = stream(capacity, &cancel);
            thread::Builder::new()
                .name("pipeline-input".into())
                .spawn_scoped(scope, move || feed_input(feed, input))
                .map_err(|e| abort(&cancel, PipelineError::Spawn(e)))?;

            let mut running = Vec::with_capacity(self.len());
            for stage in &self.stages {
                let (writer, reader) = stream(capacity, &cancel);
                let stage_input = std::mem::replace(&mut upstream, reader);
                let counter = writer.counter();
                let stage_cancel = cancel.clone();
                let name = stage.name().to_string();

                let handle = thread::Builder::new()
                    .name(format!("stage-{name}"))
                    .spawn_scoped(scope, move || {
                        run_stage(stage.as_ref(), stage_input, writer, &stage_cancel)
                    })
                    .map_err(|e| abort(&cancel, PipelineError::Spawn(e)))?;
                running.push((name, counter, handle));
            }

            let mut items = Vec::new();
            let mut first_error = None;
            loop {
                match upstream.recv() {
                    Ok(Some(item)) => items.push(item),
                    Ok(None) => break,
                    Err(e) => {
                        first_error = Some(e);
                        break;
                    }
                }
            }
            drop(upstream);

            let mut stages = Vec::with_capacity(running.len());
            for (name, counter, handle) in running {
                let outcome = match handle.join() {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        cancel.cancel();
                        Err(PipelineError::StagePanicked {
                            stage: name.clone(),
                        })
                    }
                };
                match outcome {
                    Ok(elapsed) => stages.push(StageStats {
                        emitted: counter.load(Ordering::Relaxed),
                        name,
                        elapsed,
                    }),
                    Err(e) => keep_root_cause(&mut first_error, e),
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(PipelineOutput { items, stages }),
            }
        })
    }
}

/// Write caller input into stream 0, then close it by dropping the writer.
fn feed_input(feed: StreamWriter, input: impl Iterator<Item = Item>) {
    for item in input {
        // First stage may ignore its input and hang up early
        if feed.send(item).is_err() {
            break;
        }
    }
}

/// Stage thread body. `output` is dropped on return, closing the stream.
fn run_stage(
    stage: &dyn Stage,
    input: StreamReader,
    output: StreamWriter,
    cancel: &CancelToken,
) -> Result<Duration, PipelineError> {
    let start = Instant::now();
    log::debug!("{}: started", stage.name());

    // Cancel siblings even if the stage unwinds
    let guard = CancelOnUnwind(cancel);
    let result = stage.run(input, &output);
    std::mem::forget(guard);

    match result {
        Ok(()) => {
            log::debug!(
                "{}: finished, {} items emitted in {:.3}s",
                stage.name(),
                output.sent(),
                start.elapsed().as_secs_f64()
            );
            Ok(start.elapsed())
        }
        Err(e) => {
            if !e.is_secondary() {
                log::error!("{}: {e}", stage.name());
            }
            cancel.cancel();
            Err(e)
        }
    }
}

struct CancelOnUnwind<'a>(&'a CancelToken);

impl Drop for CancelOnUnwind<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Cancel the run and hand back `err` for early return.
fn abort(cancel: &CancelToken, err: PipelineError) -> PipelineError {
    cancel.cancel();
    err
}

/// Keep the first primary error; secondary errors only fill an empty slot.
fn keep_root_cause(slot: &mut Option<PipelineError>, err: PipelineError) {
    match slot {
        None => *slot = Some(err),
        Some(current) if current.is_secondary() && !err.is_secondary() => *slot = Some(err),
        Some(_) => {}
    }
}
