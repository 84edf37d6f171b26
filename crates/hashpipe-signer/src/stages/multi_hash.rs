//! MultiHash: six indexed crc32 hashes per item, joined in index order

use std::sync::Arc;

use hashpipe_core::{PipelineError, Stage, StreamReader, StreamWriter};
use rayon::prelude::*;

use super::ItemPool;
use crate::signer::Signer;

/// Number of indexed sub-hashes per item
pub const MULTI_HASH_WIDTH: usize = 6;

/// Concatenate `crc32(th + data)` for `th` in `0..6`.
///
/// Slots are filled in parallel; the result depends only on slot index,
/// never on completion order.
pub fn multi_hash(signer: &dyn Signer, data: &str) -> String {
    let mut slots = vec![String::new(); MULTI_HASH_WIDTH];
    slots
        .par_iter_mut()
        .enumerate()
        .for_each(|(th, slot)| *slot = signer.crc32(&format!("{th}{data}")));
    slots.concat()
}

/// Stage emitting [`multi_hash`] of every input item, in completion order.
pub struct MultiHash {
    signer: Arc<dyn Signer>,
    pool: ItemPool,
}

impl MultiHash {
    pub const NAME: &'static str = "multi_hash";

    pub fn new(signer: Arc<dyn Signer>, workers: usize) -> Result<Self, PipelineError> {
        Ok(Self {
            signer,
            pool: ItemPool::new(Self::NAME, workers)?,
        })
    }
}

impl Stage for MultiHash {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, input: StreamReader, output: &StreamWriter) -> Result<(), PipelineError> {
        let signer = self.signer.as_ref();
        self.pool.for_each_item(input, |data| {
            let hash = multi_hash(signer, &data);
            log::trace!("{data} multi_hash {hash}");
            output.send(hash)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::DataSigner;
    use hashpipe_core::{Item, Pipeline};
    use std::time::Duration;

    /// crc32 with a per-input delay so sub-hashes finish out of order
    struct JitterSigner(DataSigner);

    impl Signer for JitterSigner {
        fn crc32(&self, data: &str) -> String {
            let hash = self.0.crc32(data);
            let jitter = hash
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
                % 7;
            std::thread::sleep(Duration::from_millis(jitter));
            hash
        }

        fn md5(&self, data: &str) -> String {
            self.0.md5(data)
        }
    }

    fn expected(signer: &dyn Signer, data: &str) -> String {
        (0..MULTI_HASH_WIDTH)
            .map(|th| signer.crc32(&format!("{th}{data}")))
            .collect()
    }

    #[test]
    fn known_value() {
        let signer = DataSigner::instant();
        assert_eq!(
            multi_hash(&signer, "4108050209~502633748"),
            "29568666068035183841425683795340791879727309630931025356555"
        );
    }

    #[test]
    fn index_order_despite_jitter() {
        let signer = JitterSigner(DataSigner::instant());
        for data in ["a", "hello", "4108050209~502633748", ""] {
            assert_eq!(multi_hash(&signer, data), expected(&signer, data));
        }
    }

    #[test]
    fn stage_output_matches_reference() {
        let signer: Arc<dyn Signer> = Arc::new(JitterSigner(DataSigner::instant()));
        let stage = MultiHash::new(signer.clone(), 3).unwrap();
        let input: Vec<Item> = ["x", "y", "z", "w"].into_iter().map(Item::from).collect();

        let out = Pipeline::new().stage(stage).execute(input).unwrap();

        let mut got: Vec<String> = out.items.into_iter().map(Item::into_data).collect();
        got.sort();
        let mut want: Vec<String> = ["x", "y", "z", "w"]
            .iter()
            .map(|d| expected(signer.as_ref(), d))
            .collect();
        want.sort();
        assert_eq!(got, want);
    }
}
