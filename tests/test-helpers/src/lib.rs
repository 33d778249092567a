//! Fake chain and IPFS collaborators, and a context wiring them with the in-memory
//! stores into a queue service.

#![deny(unused_crate_dependencies)]

use anyhow::anyhow;
use parking_lot::Mutex;
use payout_snapshot_database::{
    InMemoryAssetSnapshotRepository,
    InMemoryMerkleTreeRepository,
    InMemoryProjectRepository,
};
use payout_snapshot_queue::{
    AssetSnapshotQueue,
    Config,
    Service,
    new_service,
    ports::{
        BlockchainService,
        IpfsService,
    },
};
use payout_snapshot_types::{
    entities::{
        ChainSpec,
        ContractDeploymentTransactionInfo,
        CreateAssetSnapshotParams,
        PayoutAccountBalance,
        Project,
    },
    primitives::{
        Balance,
        BlockNumber,
        ChainId,
        ContractAddress,
        IpfsHash,
        ProjectId,
        TransactionHash,
        WalletAddress,
    },
};
use std::{
    collections::{
        BTreeSet,
        HashMap,
    },
    sync::Arc,
    time::Duration,
};

pub const CHAIN_ID: ChainId = ChainId::new(137);

pub fn asset() -> ContractAddress {
    ContractAddress::new([0xa5; 20])
}

/// One call of [`BlockchainService::fetch_erc20_account_balances`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceRequest {
    pub chain_spec: ChainSpec,
    pub contract_address: ContractAddress,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
}

#[derive(Default)]
struct ChainState {
    holders: HashMap<ContractAddress, Vec<PayoutAccountBalance>>,
    deployments: HashMap<ContractAddress, ContractDeploymentTransactionInfo>,
    failure: Option<String>,
    latency: Duration,
    requests: Vec<BalanceRequest>,
    in_flight: usize,
    max_in_flight: usize,
}

/// A chain whose holder balances are set by the test. Balance queries take
/// `latency` of (tokio) time.
#[derive(Clone, Default)]
pub struct FakeBlockchain {
    state: Arc<Mutex<ChainState>>,
}

impl FakeBlockchain {
    /// The holders returned for `contract`, including zero balances that the
    /// chain access filters out.
    pub fn set_holders(&self, contract: ContractAddress, holders: Vec<PayoutAccountBalance>) {
        self.state.lock().holders.insert(contract, holders);
    }

    pub fn deploy(&self, contract: ContractAddress, block_number: Option<BlockNumber>) {
        let info = ContractDeploymentTransactionInfo {
            hash: TransactionHash::new([0xde; 32]),
            contract_address: contract,
            deployer: WalletAddress::new([0xd0; 20]),
            block_number,
        };
        self.state.lock().deployments.insert(contract, info);
    }

    /// Makes every following balance query fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().failure = Some(message.into());
    }

    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    pub fn balance_requests(&self) -> Vec<BalanceRequest> {
        self.state.lock().requests.clone()
    }

    /// The highest number of balance queries that were in flight at once.
    pub fn max_concurrent_requests(&self) -> usize {
        self.state.lock().max_in_flight
    }
}

#[async_trait::async_trait]
impl BlockchainService for FakeBlockchain {
    async fn find_contract_deployment_transaction(
        &self,
        _: &ChainSpec,
        contract_address: ContractAddress,
    ) -> anyhow::Result<Option<ContractDeploymentTransactionInfo>> {
        Ok(self.state.lock().deployments.get(&contract_address).cloned())
    }

    async fn fetch_erc20_account_balances(
        &self,
        chain_spec: &ChainSpec,
        contract_address: ContractAddress,
        ignored_addresses: &BTreeSet<WalletAddress>,
        start_block: BlockNumber,
        end_block: BlockNumber,
    ) -> anyhow::Result<Vec<PayoutAccountBalance>> {
        let latency = {
            let mut state = self.state.lock();
            state.requests.push(BalanceRequest {
                chain_spec: chain_spec.clone(),
                contract_address,
                start_block,
                end_block,
            });
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };

        tokio::time::sleep(latency).await;

        let mut state = self.state.lock();
        state.in_flight -= 1;
        if let Some(message) = &state.failure {
            return Err(anyhow!("{message}"))
        }

        let holders = state
            .holders
            .get(&contract_address)
            .into_iter()
            .flatten()
            .filter(|holder| {
                holder.balance != Balance::ZERO
                    && !ignored_addresses.contains(&holder.address)
            })
            .copied()
            .collect();
        Ok(holders)
    }
}

#[derive(Default)]
struct IpfsState {
    pinned: HashMap<IpfsHash, serde_json::Value>,
    failure: Option<String>,
}

/// Pins JSON documents in memory under sequential hashes.
#[derive(Clone, Default)]
pub struct FakeIpfs {
    state: Arc<Mutex<IpfsState>>,
}

impl FakeIpfs {
    pub fn pinned(&self, hash: &IpfsHash) -> Option<serde_json::Value> {
        self.state.lock().pinned.get(hash).cloned()
    }

    pub fn pinned_count(&self) -> usize {
        self.state.lock().pinned.len()
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().failure = Some(message.into());
    }
}

#[async_trait::async_trait]
impl IpfsService for FakeIpfs {
    async fn pin_json_to_ipfs(&self, json: serde_json::Value) -> anyhow::Result<IpfsHash> {
        let mut state = self.state.lock();
        if let Some(message) = &state.failure {
            return Err(anyhow!("{message}"))
        }

        let hash = IpfsHash::new(format!("QmFake{:04}", state.pinned.len()));
        tracing::debug!(%hash, "Pinned JSON document");
        state.pinned.insert(hash.clone(), json);
        Ok(hash)
    }
}

pub type TestQueue = AssetSnapshotQueue<
    FakeBlockchain,
    FakeIpfs,
    InMemoryAssetSnapshotRepository,
    InMemoryMerkleTreeRepository,
    InMemoryProjectRepository,
>;

pub type TestService = Service<
    FakeBlockchain,
    FakeIpfs,
    InMemoryAssetSnapshotRepository,
    InMemoryMerkleTreeRepository,
    InMemoryProjectRepository,
>;

/// The queue service wired to fakes the test can inspect and steer.
pub struct TestContext {
    pub blockchain: FakeBlockchain,
    pub ipfs: FakeIpfs,
    pub snapshots: InMemoryAssetSnapshotRepository,
    pub trees: InMemoryMerkleTreeRepository,
    pub projects: InMemoryProjectRepository,
    pub service: TestService,
}

impl TestContext {
    pub fn new(config: Config) -> Self {
        let blockchain = FakeBlockchain::default();
        let ipfs = FakeIpfs::default();
        let snapshots = InMemoryAssetSnapshotRepository::new();
        let trees = InMemoryMerkleTreeRepository::new();
        let projects = InMemoryProjectRepository::new();
        let service = new_service(
            blockchain.clone(),
            ipfs.clone(),
            snapshots.clone(),
            trees.clone(),
            projects.clone(),
            config,
        );

        Self {
            blockchain,
            ipfs,
            snapshots,
            trees,
            projects,
            service,
        }
    }

    pub fn queue(&self) -> &TestQueue {
        &self.service.shared
    }

    pub fn create_project(&self) -> anyhow::Result<ProjectId> {
        let project = Project {
            id: ProjectId::new_random(),
            issuer_contract_address: ContractAddress::new([0x15; 20]),
            chain_id: CHAIN_ID,
            custom_rpc_url: None,
        };
        let id = project.id;
        self.projects.insert(project)?;
        Ok(id)
    }
}

pub fn snapshot_params(project_id: ProjectId, block_number: u64) -> CreateAssetSnapshotParams {
    CreateAssetSnapshotParams {
        name: format!("snapshot at {block_number}"),
        project_id,
        chain_id: CHAIN_ID,
        asset_contract_address: asset(),
        block_number: BlockNumber::new(block_number),
        ignored_holder_addresses: BTreeSet::new(),
    }
}
