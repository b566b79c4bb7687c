pub mod batch;
pub mod client;
pub mod digest;

pub use batch::{BatchReport, BatchScheduler};
pub use client::{DownloadEntry, Downloader};
pub use digest::Digest;
