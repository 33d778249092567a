//! Asset snapshot requests and their outcome.
//!
//! A snapshot is created pending and moves exactly once to either successful or
//! failed. The identity and the request parameters never change.

use crate::{
    merkle::{
        HashFunction,
        MerkleHash,
    },
    primitives::{
        AssetSnapshotId,
        Balance,
        BlockNumber,
        ChainId,
        ContractAddress,
        IpfsHash,
        MerkleTreeRootId,
        ProjectId,
        WalletAddress,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeSet;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetSnapshotStatus {
    Pending,
    Success,
    Failed,
}

/// Why processing of a snapshot failed.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetSnapshotFailureCause {
    /// The RPC provider refused a log query because its response was too large.
    LogResponseLimit,
    Other,
}

/// Parameters of a snapshot request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateAssetSnapshotParams {
    pub name: String,
    pub project_id: ProjectId,
    pub chain_id: ChainId,
    pub asset_contract_address: ContractAddress,
    /// Block at which holder balances are taken.
    pub block_number: BlockNumber,
    pub ignored_holder_addresses: BTreeSet<WalletAddress>,
}

/// A snapshot waiting to be processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAssetSnapshot {
    pub id: AssetSnapshotId,
    pub project_id: ProjectId,
    pub name: String,
    pub chain_id: ChainId,
    pub asset_contract_address: ContractAddress,
    pub block_number: BlockNumber,
    pub ignored_holder_addresses: BTreeSet<WalletAddress>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuccessfulAssetSnapshotData {
    pub merkle_tree_root_id: MerkleTreeRootId,
    pub merkle_tree_ipfs_hash: IpfsHash,
    pub total_asset_amount: Balance,
}

/// State dependent part of a stored snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSnapshotData {
    Pending,
    Successful(SuccessfulAssetSnapshotData),
    Failed(AssetSnapshotFailureCause),
}

impl AssetSnapshotData {
    pub fn status(&self) -> AssetSnapshotStatus {
        match self {
            AssetSnapshotData::Pending => AssetSnapshotStatus::Pending,
            AssetSnapshotData::Successful(_) => AssetSnapshotStatus::Success,
            AssetSnapshotData::Failed(_) => AssetSnapshotStatus::Failed,
        }
    }

    pub fn failure_cause(&self) -> Option<AssetSnapshotFailureCause> {
        match self {
            AssetSnapshotData::Failed(cause) => Some(*cause),
            _ => None,
        }
    }
}

/// A snapshot as kept by the snapshot store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetSnapshot {
    pub id: AssetSnapshotId,
    pub project_id: ProjectId,
    pub name: String,
    pub chain_id: ChainId,
    pub asset_contract_address: ContractAddress,
    pub block_number: BlockNumber,
    pub ignored_holder_addresses: BTreeSet<WalletAddress>,
    pub data: AssetSnapshotData,
}

impl AssetSnapshot {
    /// Creates a pending snapshot from the request parameters.
    pub fn pending(id: AssetSnapshotId, params: CreateAssetSnapshotParams) -> Self {
        let CreateAssetSnapshotParams {
            name,
            project_id,
            chain_id,
            asset_contract_address,
            block_number,
            ignored_holder_addresses,
        } = params;

        Self {
            id,
            project_id,
            name,
            chain_id,
            asset_contract_address,
            block_number,
            ignored_holder_addresses,
            data: AssetSnapshotData::Pending,
        }
    }

    pub fn status(&self) -> AssetSnapshotStatus {
        self.data.status()
    }

    /// The pending view of this snapshot, if it was not processed yet.
    pub fn as_pending(&self) -> Option<PendingAssetSnapshot> {
        match self.data {
            AssetSnapshotData::Pending => Some(PendingAssetSnapshot {
                id: self.id,
                project_id: self.project_id,
                name: self.name.clone(),
                chain_id: self.chain_id,
                asset_contract_address: self.asset_contract_address,
                block_number: self.block_number,
                ignored_holder_addresses: self.ignored_holder_addresses.clone(),
            }),
            _ => None,
        }
    }
}

/// Summary of the tree backing a successful snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullAssetSnapshotData {
    pub total_asset_amount: Balance,
    pub merkle_root_hash: MerkleHash,
    pub merkle_tree_ipfs_hash: IpfsHash,
    pub merkle_tree_depth: u32,
    pub hash_fn: HashFunction,
}

/// A snapshot as returned to readers.
///
/// `data` is only present for successful snapshots whose tree is still stored,
/// `failure_cause` only for failed ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullAssetSnapshot {
    pub id: AssetSnapshotId,
    pub project_id: ProjectId,
    pub name: String,
    pub chain_id: ChainId,
    pub asset_contract_address: ContractAddress,
    pub block_number: BlockNumber,
    pub ignored_holder_addresses: BTreeSet<WalletAddress>,
    pub status: AssetSnapshotStatus,
    pub failure_cause: Option<AssetSnapshotFailureCause>,
    pub data: Option<FullAssetSnapshotData>,
}

impl FullAssetSnapshot {
    pub fn to_response(&self) -> AssetSnapshotResponse {
        AssetSnapshotResponse {
            id: self.id,
            project_id: self.project_id,
            name: self.name.clone(),
            chain_id: self.chain_id,
            status: self.status,
            failure_cause: self.failure_cause,
            asset: self.asset_contract_address,
            total_asset_amount: self.data.as_ref().map(|data| data.total_asset_amount),
            ignored_holder_addresses: self.ignored_holder_addresses.clone(),
            asset_snapshot_merkle_root: self
                .data
                .as_ref()
                .map(|data| data.merkle_root_hash.clone()),
            asset_snapshot_merkle_depth: self
                .data
                .as_ref()
                .map(|data| data.merkle_tree_depth),
            asset_snapshot_block_number: self.block_number,
            asset_snapshot_merkle_ipfs_hash: self
                .data
                .as_ref()
                .map(|data| data.merkle_tree_ipfs_hash.clone()),
        }
    }
}

/// Flat projection of [`FullAssetSnapshot`] for API consumers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshotResponse {
    pub id: AssetSnapshotId,
    pub project_id: ProjectId,
    pub name: String,
    pub chain_id: ChainId,
    pub status: AssetSnapshotStatus,
    pub failure_cause: Option<AssetSnapshotFailureCause>,
    pub asset: ContractAddress,
    pub total_asset_amount: Option<Balance>,
    pub ignored_holder_addresses: BTreeSet<WalletAddress>,
    pub asset_snapshot_merkle_root: Option<MerkleHash>,
    pub asset_snapshot_merkle_depth: Option<u32>,
    pub asset_snapshot_block_number: BlockNumber,
    pub asset_snapshot_merkle_ipfs_hash: Option<IpfsHash>,
}
