//! # offload-store
//!
//! Content-addressed transfer layer.
//!
//! - [`client`]: the object-store adapter seam ([`ObjectStoreClient`]) and
//!   its tagged error kinds
//! - [`s3`] / [`memory`]: S3-compatible and in-process clients
//! - [`store`]: [`ContentStore`]: lazy buckets, metadata, presigned handles
//! - [`gate`]: [`TransferGate`]: skip uploads whose checksum already matches
//! - [`workspace`]: ship and fetch whole directories as archives

pub mod client;
pub mod error;
pub mod gate;
pub mod memory;
pub mod s3;
pub mod store;
pub mod workspace;

pub use client::{Metadata, ObjectStoreClient, ObjectStoreError};
pub use error::StoreError;
pub use gate::{TransferGate, TransferOutcome, CHECKSUM_METADATA_KEY};
pub use memory::MemoryObjectStore;
pub use s3::S3Client;
pub use store::{ContentStore, RetrievalHandle, StorageLocation};
pub use workspace::{fetch_directory, ship_directory, workspace_key, ShippedWorkspace};
