//! Lookup keys and records of the Merkle tree store.

use crate::{
    merkle::{
        MerkleHash,
        MerkleTree,
    },
    primitives::{
        ChainId,
        ContractAddress,
        MerkleTreeRootId,
        WalletAddress,
    },
};

/// Identifies a stored tree. Trees are deduplicated on this key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchMerkleTreeParams {
    pub root_hash: MerkleHash,
    pub chain_id: ChainId,
    pub asset_contract_address: ContractAddress,
}

/// Identifies a holder inside a stored tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchMerkleTreePathParams {
    pub root_hash: MerkleHash,
    pub chain_id: ChainId,
    pub asset_contract_address: ContractAddress,
    pub wallet_address: WalletAddress,
}

impl FetchMerkleTreePathParams {
    pub fn tree_params(&self) -> FetchMerkleTreeParams {
        FetchMerkleTreeParams {
            root_hash: self.root_hash.clone(),
            chain_id: self.chain_id,
            asset_contract_address: self.asset_contract_address,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTreeWithId {
    pub id: MerkleTreeRootId,
    pub tree: MerkleTree,
}
