//! The crate `payout-snapshot-types` contains the domain types shared by the payout
//! snapshot engine: chain primitives, the canonical Merkle tree built over holder
//! balances together with its inclusion proofs, and the asset snapshot entities
//! persisted by the stores.

#![deny(unused_crate_dependencies)]
#![deny(clippy::cast_possible_truncation)]
#![deny(unused_variables)]

pub mod entities;
pub mod merkle;
pub mod primitives;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use merkle::{
    HashFunction,
    MerkleHash,
    MerkleTree,
    MerkleTreeError,
    PathSegment,
};
