//! Main runner for the signing pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use hashpipe_core::{Item, Pipeline, PipelineError, StageStats};

use crate::config::Config;
use crate::signer::{DataSigner, Signer};
use crate::stages::{CombineResults, MultiHash, SingleHash};

/// Pipeline execution summary
#[derive(Debug)]
pub struct Summary {
    pub input_items: usize,
    /// The single combined signature
    pub result: String,
    pub stages: Vec<StageStats>,
    /// md5 calls that collided with another one (0 when serialization holds)
    pub md5_overheats: usize,
    pub elapsed: Duration,
}

impl Summary {
    pub fn log(&self) {
        log::info!("=== Signing Pipeline Summary ===");
        log::info!("Items: {}", self.input_items);
        for stage in &self.stages {
            log::info!(
                "{:<12} {:>6} emitted in {:.3}s",
                stage.name,
                stage.emitted,
                stage.elapsed.as_secs_f64()
            );
        }
        if self.md5_overheats > 0 {
            log::warn!("md5 overheats: {}", self.md5_overheats);
        }
        log::info!("Time: {:.3}s", self.elapsed.as_secs_f64());
        if self.input_items > 0 {
            let rate = self.input_items as f64 / self.elapsed.as_secs_f64();
            log::info!("Throughput: {rate:.0} items/sec");
        }
    }
}

/// Build SingleHash -> MultiHash -> CombineResults over `signer`.
///
/// Callers may append further stages before executing.
pub fn build_pipeline(
    config: &Config,
    signer: Arc<dyn Signer>,
) -> Result<Pipeline, PipelineError> {
    Ok(Pipeline::new()
        .stream_capacity(config.pipeline.stream_capacity)
        .stage(SingleHash::new(signer.clone(), config.workers.single_hash)?)
        .stage(MultiHash::new(signer, config.workers.multi_hash)?)
        .stage(CombineResults))
}

/// Run the signing pipeline over `items` with a [`DataSigner`] from config
pub fn run(config: &Config, items: Vec<Item>) -> Result<Summary> {
    config.validate()?;
    let signer = Arc::new(DataSigner::new(&config.signer));
    let mut summary = execute(config, signer.clone(), items)?;
    summary.md5_overheats = signer.overheats();
    summary.log();
    Ok(summary)
}

/// Run the signing pipeline with a caller-supplied signer
pub fn run_with_signer(
    config: &Config,
    signer: Arc<dyn Signer>,
    items: Vec<Item>,
) -> Result<Summary> {
    config.validate()?;
    let summary = execute(config, signer, items)?;
    summary.log();
    Ok(summary)
}

fn execute(config: &Config, signer: Arc<dyn Signer>, items: Vec<Item>) -> Result<Summary> {
    let start = Instant::now();
    let input_items = items.len();

    log::info!(
        "Signing {} items ({} single_hash / {} multi_hash workers)",
        input_items,
        config.workers.single_hash,
        config.workers.multi_hash
    );

    let pipeline = build_pipeline(config, signer).context("Failed to build pipeline")?;
    let output = pipeline.execute(items).context("Pipeline failed")?;

    let mut items = output.items;
    if items.len() != 1 {
        bail!("expected exactly one combined result, got {}", items.len());
    }
    let result = items.remove(0).into_data();

    Ok(Summary {
        input_items,
        result,
        stages: output.stages,
        md5_overheats: 0,
        elapsed: start.elapsed(),
    })
}
