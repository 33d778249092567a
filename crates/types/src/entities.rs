//! Higher level domain types

pub use asset_snapshot::{
    AssetSnapshot,
    AssetSnapshotData,
    AssetSnapshotFailureCause,
    AssetSnapshotResponse,
    AssetSnapshotStatus,
    CreateAssetSnapshotParams,
    FullAssetSnapshot,
    FullAssetSnapshotData,
    PendingAssetSnapshot,
    SuccessfulAssetSnapshotData,
};
pub use balance::PayoutAccountBalance;
pub use merkle_tree::{
    FetchMerkleTreeParams,
    FetchMerkleTreePathParams,
    MerkleTreeWithId,
};
pub use project::{
    ChainSpec,
    Project,
};
pub use transaction::ContractDeploymentTransactionInfo;

pub mod asset_snapshot;
pub mod balance;
pub mod merkle_tree;
pub mod project;
pub mod transaction;
