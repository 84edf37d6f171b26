//! Signing stages and the bounded worker pool they share

mod combine;
mod multi_hash;
mod single_hash;

pub use combine::{COMBINE_SEPARATOR, CombineResults};
pub use multi_hash::{MULTI_HASH_WIDTH, MultiHash, multi_hash};
pub use single_hash::{SingleHash, single_hash};

use std::panic::{AssertUnwindSafe, catch_unwind};

use hashpipe_core::{ErrorSlot, PipelineError, Semaphore, StreamReader};

/// Per-stage rayon pool with a cap on in-flight items.
///
/// The stage thread reads items and blocks on a permit once `workers` items
/// are being processed, so a slow stage pushes back on its input stream.
pub(crate) struct ItemPool {
    stage: String,
    pool: rayon::ThreadPool,
    workers: usize,
}

impl ItemPool {
    pub(crate) fn new(stage: &str, workers: usize) -> Result<Self, PipelineError> {
        let workers = workers.max(1);
        let prefix = stage.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        Ok(Self {
            stage: stage.to_string(),
            pool,
            workers,
        })
    }

    /// Run `work` on every item of `input`, returning after all of it joined.
    ///
    /// Items are normalized to their string form first. The first worker
    /// failure stops further reads and is returned; otherwise a read error
    /// (cancellation) is returned. A panicking worker counts as a failure.
    pub(crate) fn for_each_item<F>(&self, input: StreamReader, work: F) -> Result<(), PipelineError>
    where
        F: Fn(String) -> Result<(), PipelineError> + Sync,
    {
        let in_flight = Semaphore::new(self.workers);
        let errors = ErrorSlot::new();

        let read = self.pool.in_place_scope(|s| -> Result<(), PipelineError> {
            for item in input {
                let data = item?.into_data();
                let permit = in_flight.acquire();
                if errors.is_set() {
                    break;
                }
                let (work, errors, stage) = (&work, &errors, &self.stage);
                s.spawn(move |_| {
                    let _permit = permit;
                    match catch_unwind(AssertUnwindSafe(|| work(data))) {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => errors.record(e),
                        Err(_) => {
                            log::error!("{stage}: worker panicked");
                            errors.record(PipelineError::StagePanicked {
                                stage: stage.clone(),
                            });
                        }
                    }
                });
            }
            Ok(())
        });

        errors.into_result().and(read)
    }
}
