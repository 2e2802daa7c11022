//! # offload-archive
//!
//! Portable directory archives that round-trip POSIX permission bits.
//!
//! [`pack`] walks a tree into a deterministic tar stream wrapped in zstd;
//! [`unpack`] restores it, recreating directories and exact 9-bit file modes.

pub mod codec;
pub mod error;
pub mod permissions;

pub use codec::{pack, pack_to_file, unpack, unpack_file, UnpackSummary};
pub use error::ArchiveError;
pub use permissions::{Permission, PermissionSet};
