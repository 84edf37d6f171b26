//! Hash collaborators used by the signing stages
//!
//! `crc32` is safe to call from any number of threads. `md5` is not: the
//! stock [`DataSigner`] treats overlapping calls as an overheat, stalls the
//! late caller and counts the event.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use md5::{Digest, Md5};

use crate::config::SignerConfig;

/// Black-box hash functions consumed by the pipeline stages.
pub trait Signer: Send + Sync {
    /// Checksum of `data`. Pure and safe under unlimited concurrency.
    fn crc32(&self, data: &str) -> String;

    /// Digest of `data`. Pure, but callers must never overlap two calls.
    fn md5(&self, data: &str) -> String;
}

/// Stock signer: IEEE CRC-32 as unsigned decimal, MD5 as lowercase hex.
///
/// Optional delays emulate slow external hashing devices.
#[derive(Debug)]
pub struct DataSigner {
    crc32_delay: Duration,
    md5_delay: Duration,
    overheat_penalty: Duration,
    md5_busy: AtomicBool,
    overheats: AtomicUsize,
}

impl DataSigner {
    pub fn new(config: &SignerConfig) -> Self {
        Self {
            crc32_delay: Duration::from_millis(config.crc32_delay_ms),
            md5_delay: Duration::from_millis(config.md5_delay_ms),
            overheat_penalty: Duration::from_millis(config.overheat_penalty_ms),
            md5_busy: AtomicBool::new(false),
            overheats: AtomicUsize::new(0),
        }
    }

    /// Signer without artificial delays
    pub fn instant() -> Self {
        Self::new(&SignerConfig::default())
    }

    /// How many times an md5 call found another one in progress
    pub fn overheats(&self) -> usize {
        self.overheats.load(Ordering::Relaxed)
    }

    fn enter_md5(&self) -> Md5Busy<'_> {
        while self
            .md5_busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.overheats.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "md5 overheat: concurrent call detected, stalling {}ms",
                self.overheat_penalty.as_millis()
            );
            thread::sleep(self.overheat_penalty);
        }
        Md5Busy(&self.md5_busy)
    }
}

impl Default for DataSigner {
    fn default() -> Self {
        Self::instant()
    }
}

/// Clears the busy flag on drop, including on unwind.
struct Md5Busy<'a>(&'a AtomicBool);

impl Drop for Md5Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Signer for DataSigner {
    fn crc32(&self, data: &str) -> String {
        if !self.crc32_delay.is_zero() {
            thread::sleep(self.crc32_delay);
        }
        crc32fast::hash(data.as_bytes()).to_string()
    }

    fn md5(&self, data: &str) -> String {
        let _busy = self.enter_md5();
        if !self.md5_delay.is_zero() {
            thread::sleep(self.md5_delay);
        }
        format!("{:x}", Md5::digest(data.as_bytes()))
    }
}
