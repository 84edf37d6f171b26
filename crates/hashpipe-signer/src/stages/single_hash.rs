//! SingleHash: `crc32(data) ~ crc32(md5(data))` per item

use std::sync::{Arc, Mutex};

use hashpipe_core::{PipelineError, Stage, StreamReader, StreamWriter};

use super::ItemPool;
use crate::signer::Signer;

/// Process-wide guard around md5: no two calls may overlap, whichever
/// worker, stage or pipeline makes them.
static MD5_LOCK: Mutex<()> = Mutex::new(());

/// Call `signer.md5` while holding the process-wide md5 lock.
pub(crate) fn locked_md5(signer: &dyn Signer, data: &str) -> String {
    let _guard = MD5_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    signer.md5(data)
}

/// Hash one value: both halves are computed concurrently, the md5 half
/// under the global lock. The outer crc32 runs after the lock is released.
pub fn single_hash(signer: &dyn Signer, data: &str) -> String {
    let (plain, digested) = rayon::join(
        || signer.crc32(data),
        || signer.crc32(&locked_md5(signer, data)),
    );
    format!("{plain}~{digested}")
}

/// Stage emitting [`single_hash`] of every input item, in completion order.
pub struct SingleHash {
    signer: Arc<dyn Signer>,
    pool: ItemPool,
}

impl SingleHash {
    pub const NAME: &'static str = "single_hash";

    /// `workers` bounds both the pool size and the items in flight.
    pub fn new(signer: Arc<dyn Signer>, workers: usize) -> Result<Self, PipelineError> {
        Ok(Self {
            signer,
            pool: ItemPool::new(Self::NAME, workers)?,
        })
    }
}

impl Stage for SingleHash {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, input: StreamReader, output: &StreamWriter) -> Result<(), PipelineError> {
        let signer = self.signer.as_ref();
        self.pool.for_each_item(input, |data| {
            let hash = single_hash(signer, &data);
            log::trace!("{data} single_hash {hash}");
            output.send(hash)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::DataSigner;
    use hashpipe_core::{Item, Pipeline};

    #[test]
    fn known_value_for_zero() {
        let signer = DataSigner::instant();
        assert_eq!(single_hash(&signer, "0"), "4108050209~502633748");
    }

    #[test]
    fn shape_is_crc_tilde_crc_of_md5() {
        let signer = DataSigner::instant();
        let data = "hello";
        let expected = format!(
            "{}~{}",
            signer.crc32(data),
            signer.crc32(&signer.md5(data))
        );
        assert_eq!(single_hash(&signer, data), expected);
    }

    #[test]
    fn stage_emits_one_hash_per_item() {
        let signer: Arc<dyn Signer> = Arc::new(DataSigner::instant());
        let stage = SingleHash::new(signer.clone(), 4).unwrap();
        let input: Vec<Item> = (0..20).map(Item::Int).collect();

        let out = Pipeline::new().stage(stage).execute(input).unwrap();

        let mut got: Vec<String> = out.items.into_iter().map(Item::into_data).collect();
        let mut expected: Vec<String> = (0..20)
            .map(|i| single_hash(signer.as_ref(), &i.to_string()))
            .collect();
        got.sort();
        expected.sort();
        assert_eq!(got, expected);
        assert_eq!(out.stages[0].name, "single_hash");
        assert_eq!(out.stages[0].emitted, 20);
    }

    #[test]
    fn concurrent_items_never_overlap_md5() {
        let signer = Arc::new(DataSigner::new(&crate::config::SignerConfig {
            md5_delay_ms: 2,
            overheat_penalty_ms: 1,
            ..Default::default()
        }));
        let stage = SingleHash::new(signer.clone(), 8).unwrap();

        Pipeline::new()
            .stage(stage)
            .execute((0..30).map(Item::Int))
            .unwrap();

        assert_eq!(signer.overheats(), 0);
    }
}
