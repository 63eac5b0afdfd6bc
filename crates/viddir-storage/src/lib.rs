//! Viddir Storage Library
//!
//! Two kinds of storage back the pipeline:
//!
//! - a **content-addressed store** (an IPFS daemon's HTTP API) where published
//!   renditions are added and pinned, addressed afterwards by their hash;
//! - **working storage** on the local filesystem, split into three buckets
//!   (videos, thumbnails, scratch audio) addressed by generated file names.
//!
//! File names handed to working storage must not contain `..` or a path
//! separator; they always resolve directly inside their bucket.

pub mod ipfs;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use ipfs::IpfsContentStore;
pub use local::{remove_if_exists, Bucket, WorkingStorage};
pub use traits::{ContentStore, StorageError, StorageResult};
