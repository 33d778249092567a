//! Canonical Merkle tree over payout account balances.
//!
//! The tree shape is a pure function of the *set* of balances: leaves are sorted by
//! the numeric value of their hashes and every combined pair puts the numerically
//! smaller child on the left. Two computations over the same holders therefore always
//! agree on the root hash, which is what gets anchored on chain.

mod hash;
mod json;
mod node;
mod proof;
mod tree;


pub use hash::{
    HashFunction,
    MerkleHash,
    NIL_HASH,
};
pub use json::SerializedTreeError;
pub use node::{
    IndexedValue,
    LeafNode,
    MiddleNode,
    Node,
    RootNode,
};
pub use proof::{
    PathSegment,
    PayoutProof,
    compute_root,
};
pub use tree::{
    MerkleTree,
    MerkleTreeError,
};

/// Hash function used for every tree built from a live asset snapshot.
pub const SNAPSHOT_HASH_FUNCTION: HashFunction = HashFunction::Keccak256;
