use super::hash::{
    HashFunction,
    MerkleHash,
};
use crate::primitives::{
    Balance,
    WalletAddress,
};
use serde::{
    Deserialize,
    Serialize,
};

/// One step of an inclusion proof: the hash of the sibling node and the side it
/// sits on relative to the node being proven.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub sibling_hash: MerkleHash,
    pub is_left: bool,
}

impl PathSegment {
    pub fn new(sibling_hash: MerkleHash, is_left: bool) -> Self {
        Self {
            sibling_hash,
            is_left,
        }
    }
}

/// Recomputes the root hash from a leaf hash and its inclusion proof.
pub fn compute_root(
    hash_fn: HashFunction,
    leaf_hash: &MerkleHash,
    path: &[PathSegment],
) -> MerkleHash {
    path.iter().fold(leaf_hash.clone(), |current, segment| {
        if segment.is_left {
            segment.sibling_hash.combine(&current, hash_fn)
        } else {
            current.combine(&segment.sibling_hash, hash_fn)
        }
    })
}

/// Everything a holder needs to claim a payout backed by a snapshot tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutProof {
    pub address: WalletAddress,
    pub balance: Balance,
    pub leaf_index: u64,
    pub path: Vec<PathSegment>,
}

impl PayoutProof {
    /// The share of `total_reward` proportional to the holder balance, minus what
    /// was already claimed. `None` on overflow, division by zero, or when more
    /// than the share was already claimed.
    pub fn claimable_amount(
        &self,
        total_reward: Balance,
        total_asset_amount: Balance,
        already_claimed: Balance,
    ) -> Option<Balance> {
        total_reward
            .checked_mul(self.balance)?
            .checked_div(total_asset_amount)?
            .checked_sub(already_claimed)
    }
}
