//! In-memory implementations of the stores the asset snapshot queue depends on.
//! Every store is cheap to clone; clones share the same data.

#![deny(unused_crate_dependencies)]
#![deny(clippy::cast_possible_truncation)]
#![deny(unused_variables)]

use payout_snapshot_types::{
    MerkleHash,
    primitives::{
        MerkleTreeRootId,
        ProjectId,
    },
};

pub mod asset_snapshots;
pub mod merkle_trees;
pub mod projects;

pub use asset_snapshots::InMemoryAssetSnapshotRepository;
pub use merkle_trees::InMemoryMerkleTreeRepository;
pub use projects::InMemoryProjectRepository;

/// The error occurred during work with any of the stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("Project {0} already exists")]
    ProjectAlreadyExists(ProjectId),
    /// The leaves stored for a tree no longer produce its root hash.
    #[error(
        "Merkle tree {id} is corrupted: stored root {stored}, rebuilt root {rebuilt}"
    )]
    CorruptedTree {
        id: MerkleTreeRootId,
        stored: MerkleHash,
        rebuilt: MerkleHash,
    },
    /// The index of trees points to a tree that is not stored.
    #[error("Merkle tree {0} is indexed but not stored")]
    MissingTree(MerkleTreeRootId),
}

#[cfg(test)]
payout_snapshot_trace::enable_tracing!();
