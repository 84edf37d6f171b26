//! Hashpipe Signer - concurrent signing pipeline
//!
//! Computes a combined signature of a list of values through three stages:
//!
//! - `SingleHash`: `crc32(x) ~ crc32(md5(x))`, with md5 serialized process-wide
//! - `MultiHash`: six indexed `crc32(th + x)` joined in index order
//! - `CombineResults`: sort all results and join with `_`
//!
//! # Example
//!
//! ```ignore
//! use hashpipe_signer::{Config, Item, run};
//!
//! let items = vec![Item::Int(0), Item::Int(1)];
//! let summary = run(&Config::default(), items)?;
//! println!("{}", summary.result);
//! ```

pub mod config;
pub mod runner;
pub mod sequential;
pub mod signer;
pub mod stages;

// Re-exports
pub use config::Config;
pub use hashpipe_core::Item;
pub use runner::{Summary, build_pipeline, run, run_with_signer};
pub use sequential::sign_sequential;
pub use signer::{DataSigner, Signer};
pub use stages::{CombineResults, MultiHash, SingleHash};
