//! Ports this service requires to function.

use payout_snapshot_types::{
    MerkleTree,
    entities::{
        AssetSnapshot,
        AssetSnapshotFailureCause,
        AssetSnapshotStatus,
        ChainSpec,
        ContractDeploymentTransactionInfo,
        CreateAssetSnapshotParams,
        FetchMerkleTreeParams,
        FetchMerkleTreePathParams,
        MerkleTreeWithId,
        PayoutAccountBalance,
        PendingAssetSnapshot,
        Project,
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
use std::collections::{
    BTreeSet,
    HashSet,
};

#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
#[async_trait::async_trait]
/// Port for reading the state of the chain the asset lives on.
pub trait BlockchainService: Send + Sync {
    /// The transaction that deployed `contract_address`, if it can be found.
    async fn find_contract_deployment_transaction(
        &self,
        chain_spec: &ChainSpec,
        contract_address: ContractAddress,
    ) -> anyhow::Result<Option<ContractDeploymentTransactionInfo>>;

    /// Balances of every holder of the ERC-20 `contract_address` at `end_block`,
    /// scanning transfers from `start_block`. Holders in `ignored_addresses` and
    /// holders with a zero balance are left out.
    async fn fetch_erc20_account_balances(
        &self,
        chain_spec: &ChainSpec,
        contract_address: ContractAddress,
        ignored_addresses: &BTreeSet<WalletAddress>,
        start_block: BlockNumber,
        end_block: BlockNumber,
    ) -> anyhow::Result<Vec<PayoutAccountBalance>>;
}

#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
#[async_trait::async_trait]
/// Port for the content-addressed store the tree is published to.
pub trait IpfsService: Send + Sync {
    async fn pin_json_to_ipfs(&self, json: serde_json::Value) -> anyhow::Result<IpfsHash>;
}

#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
/// Port for the persistent store of snapshot trees.
pub trait MerkleTreeRepository: Send + Sync {
    fn get_by_id(&self, id: MerkleTreeRootId) -> anyhow::Result<Option<MerkleTree>>;

    /// Stores the tree and returns its identifier. Storing a tree whose root hash
    /// is already known for the chain and contract returns the existing identifier.
    fn store_tree(
        &self,
        tree: &MerkleTree,
        chain_id: ChainId,
        asset_contract_address: ContractAddress,
        block_number: BlockNumber,
    ) -> anyhow::Result<MerkleTreeRootId>;

    fn fetch_tree(
        &self,
        params: &FetchMerkleTreeParams,
    ) -> anyhow::Result<Option<MerkleTreeWithId>>;

    fn contains_address(&self, params: &FetchMerkleTreePathParams) -> anyhow::Result<bool>;
}

#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
/// Port for the persistent store of snapshot requests.
pub trait AssetSnapshotRepository: Send + Sync {
    /// Persists a pending snapshot.
    fn create_asset_snapshot(
        &self,
        params: CreateAssetSnapshotParams,
    ) -> anyhow::Result<AssetSnapshotId>;

    fn get_by_id(&self, id: AssetSnapshotId) -> anyhow::Result<Option<AssetSnapshot>>;

    /// Snapshots of the project whose status is in `statuses`.
    fn get_all_by_project_id_and_statuses(
        &self,
        project_id: ProjectId,
        statuses: &HashSet<AssetSnapshotStatus>,
    ) -> anyhow::Result<Vec<AssetSnapshot>>;

    fn get_pending(&self) -> anyhow::Result<Vec<PendingAssetSnapshot>>;

    /// Moves a pending snapshot to successful. Returns `None` when the snapshot does
    /// not exist or is not pending anymore.
    fn complete_asset_snapshot(
        &self,
        id: AssetSnapshotId,
        merkle_tree_root_id: MerkleTreeRootId,
        merkle_tree_ipfs_hash: IpfsHash,
        total_asset_amount: Balance,
    ) -> anyhow::Result<Option<AssetSnapshot>>;

    /// Moves a pending snapshot to failed. Returns `None` when the snapshot does
    /// not exist or is not pending anymore.
    fn fail_asset_snapshot(
        &self,
        id: AssetSnapshotId,
        cause: AssetSnapshotFailureCause,
    ) -> anyhow::Result<Option<AssetSnapshot>>;
}

#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
/// Port for looking up projects.
pub trait ProjectRepository: Send + Sync {
    fn get_by_id(&self, id: ProjectId) -> anyhow::Result<Option<Project>>;
}
