use crate::{
    config::{
        Config,
        Trigger,
    },
    failure::classify_failure,
    ports::{
        AssetSnapshotRepository,
        BlockchainService,
        IpfsService,
        MerkleTreeRepository,
        ProjectRepository,
    },
};
use anyhow::{
    Context,
    anyhow,
};
use payout_snapshot_services::{
    RunnableService,
    RunnableTask,
    ServiceRunner,
    StateWatcher,
    TaskNextAction,
};
use payout_snapshot_types::{
    MerkleTree,
    entities::{
        AssetSnapshot,
        AssetSnapshotData,
        AssetSnapshotStatus,
        ChainSpec,
        CreateAssetSnapshotParams,
        FetchMerkleTreeParams,
        FullAssetSnapshot,
        FullAssetSnapshotData,
        PendingAssetSnapshot,
        SuccessfulAssetSnapshotData,
    },
    merkle::SNAPSHOT_HASH_FUNCTION,
    primitives::{
        AssetSnapshotId,
        Balance,
        MerkleTreeRootId,
        ProjectId,
    },
};
use std::{
    collections::HashSet,
    sync::Arc,
};
use strum::IntoEnumIterator;
use tokio::{
    sync::Mutex,
    time::{
        Instant,
        Interval,
        MissedTickBehavior,
    },
};


pub type Service<B, I, A, M, P> = ServiceRunner<NotInitializedTask<B, I, A, M, P>>;

/// Outcome of one processing run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// The public contract of the queue, shared between the background task and the
/// callers submitting and reading snapshots.
pub struct AssetSnapshotQueue<B, I, A, M, P> {
    blockchain: B,
    ipfs: I,
    snapshots: A,
    trees: M,
    projects: P,
    /// Held for a whole processing run.
    processing: Mutex<()>,
}

impl<B, I, A, M, P> AssetSnapshotQueue<B, I, A, M, P>
where
    B: BlockchainService,
    I: IpfsService,
    A: AssetSnapshotRepository,
    M: MerkleTreeRepository,
    P: ProjectRepository,
{
    pub fn new(blockchain: B, ipfs: I, snapshots: A, trees: M, projects: P) -> Self {
        Self {
            blockchain,
            ipfs,
            snapshots,
            trees,
            projects,
            processing: Mutex::new(()),
        }
    }

    /// Persists a pending snapshot and returns its identifier. No chain access
    /// happens here.
    pub fn submit_asset_snapshot(
        &self,
        params: CreateAssetSnapshotParams,
    ) -> anyhow::Result<AssetSnapshotId> {
        tracing::info!(
            project_id = %params.project_id,
            chain_id = %params.chain_id,
            asset = %params.asset_contract_address,
            block_number = %params.block_number,
            "Asset snapshot requested"
        );
        self.snapshots.create_asset_snapshot(params)
    }

    pub fn get_asset_snapshot_by_id(
        &self,
        id: AssetSnapshotId,
    ) -> anyhow::Result<Option<FullAssetSnapshot>> {
        tracing::debug!(snapshot_id = %id, "Fetching asset snapshot");
        self.snapshots
            .get_by_id(id)?
            .map(|snapshot| self.to_full_snapshot(snapshot))
            .transpose()
    }

    /// Snapshots of the project in any of `statuses`. An empty set selects every
    /// status.
    pub fn get_all_asset_snapshots_by_project_id_and_statuses(
        &self,
        project_id: ProjectId,
        statuses: &HashSet<AssetSnapshotStatus>,
    ) -> anyhow::Result<Vec<FullAssetSnapshot>> {
        tracing::debug!(%project_id, ?statuses, "Fetching asset snapshots of project");

        let all_statuses;
        let statuses = if statuses.is_empty() {
            all_statuses = AssetSnapshotStatus::iter().collect::<HashSet<_>>();
            &all_statuses
        } else {
            statuses
        };

        self.snapshots
            .get_all_by_project_id_and_statuses(project_id, statuses)?
            .into_iter()
            .map(|snapshot| self.to_full_snapshot(snapshot))
            .collect()
    }

    /// Handles every snapshot pending at the time of the call, one after another.
    /// A failing snapshot is recorded as failed and does not stop the run. Runs
    /// never overlap: a second caller waits for the current run to finish.
    pub async fn process_snapshots(&self) -> anyhow::Result<ProcessingReport> {
        let _guard = self.processing.lock().await;

        let pending = self
            .snapshots
            .get_pending()
            .context("failed to fetch pending asset snapshots")?;
        let mut report = ProcessingReport::default();

        for snapshot in pending {
            match self.handle_pending_snapshot(&snapshot).await {
                Ok(tree_id) => {
                    tracing::info!(
                        snapshot_id = %snapshot.id,
                        merkle_tree_root_id = %tree_id,
                        "Asset snapshot completed"
                    );
                    report.succeeded += 1;
                }
                Err(error) => {
                    let cause = classify_failure(&error);
                    tracing::error!(
                        snapshot_id = %snapshot.id,
                        %cause,
                        "Failed to handle pending asset snapshot: {error:?}"
                    );
                    if let Err(error) = self.snapshots.fail_asset_snapshot(snapshot.id, cause)
                    {
                        tracing::error!(
                            snapshot_id = %snapshot.id,
                            "Failed to mark asset snapshot as failed: {error:?}"
                        );
                    }
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn handle_pending_snapshot(
        &self,
        snapshot: &PendingAssetSnapshot,
    ) -> anyhow::Result<MerkleTreeRootId> {
        let project = self
            .projects
            .get_by_id(snapshot.project_id)?
            .ok_or_else(|| anyhow!("project {} does not exist", snapshot.project_id))?;
        let chain_spec = ChainSpec::new(snapshot.chain_id, project.custom_rpc_url);
        let asset = snapshot.asset_contract_address;

        let deployment = self
            .blockchain
            .find_contract_deployment_transaction(&chain_spec, asset)
            .await
            .with_context(|| format!("failed to find deployment of {asset}"))?;
        // Unknown deployments are scanned from the genesis block.
        let start_block = deployment
            .and_then(|transaction| transaction.block_number)
            .unwrap_or_default();

        let balances = self
            .blockchain
            .fetch_erc20_account_balances(
                &chain_spec,
                asset,
                &snapshot.ignored_holder_addresses,
                start_block,
                snapshot.block_number,
            )
            .await
            .with_context(|| {
                format!(
                    "failed to fetch balances of {asset} between blocks {start_block} and {}",
                    snapshot.block_number
                )
            })?;
        tracing::debug!(
            snapshot_id = %snapshot.id,
            holders = balances.len(),
            "Fetched holder balances"
        );

        let tree = MerkleTree::new(balances, SNAPSHOT_HASH_FUNCTION)?;
        let tree_id = self.find_or_store_tree(&tree, snapshot)?;

        let json = serde_json::to_value(&tree).context("failed to serialize the tree")?;
        let ipfs_hash = self
            .ipfs
            .pin_json_to_ipfs(json)
            .await
            .context("failed to pin the tree")?;

        let total_asset_amount =
            Balance::checked_sum(tree.balances().into_iter().map(|holder| holder.balance))
                .ok_or_else(|| anyhow!("total asset amount overflows 256 bits"))?;

        self.snapshots
            .complete_asset_snapshot(snapshot.id, tree_id, ipfs_hash, total_asset_amount)?
            .ok_or_else(|| anyhow!("asset snapshot {} is not pending anymore", snapshot.id))?;

        Ok(tree_id)
    }

    fn find_or_store_tree(
        &self,
        tree: &MerkleTree,
        snapshot: &PendingAssetSnapshot,
    ) -> anyhow::Result<MerkleTreeRootId> {
        let params = FetchMerkleTreeParams {
            root_hash: tree.root().hash().clone(),
            chain_id: snapshot.chain_id,
            asset_contract_address: snapshot.asset_contract_address,
        };

        if let Some(existing) = self.trees.fetch_tree(&params)? {
            tracing::debug!(
                snapshot_id = %snapshot.id,
                root_hash = %params.root_hash,
                merkle_tree_root_id = %existing.id,
                "Reusing stored tree"
            );
            return Ok(existing.id)
        }

        self.trees.store_tree(
            tree,
            snapshot.chain_id,
            snapshot.asset_contract_address,
            snapshot.block_number,
        )
    }

    fn to_full_snapshot(&self, snapshot: AssetSnapshot) -> anyhow::Result<FullAssetSnapshot> {
        let data = match &snapshot.data {
            AssetSnapshotData::Successful(successful) => self.full_data(successful)?,
            AssetSnapshotData::Pending | AssetSnapshotData::Failed(_) => None,
        };

        Ok(FullAssetSnapshot {
            status: snapshot.status(),
            failure_cause: snapshot.data.failure_cause(),
            id: snapshot.id,
            project_id: snapshot.project_id,
            name: snapshot.name,
            chain_id: snapshot.chain_id,
            asset_contract_address: snapshot.asset_contract_address,
            block_number: snapshot.block_number,
            ignored_holder_addresses: snapshot.ignored_holder_addresses,
            data,
        })
    }

    fn full_data(
        &self,
        successful: &SuccessfulAssetSnapshotData,
    ) -> anyhow::Result<Option<FullAssetSnapshotData>> {
        let tree = self.trees.get_by_id(successful.merkle_tree_root_id)?;

        Ok(tree.map(|tree| FullAssetSnapshotData {
            total_asset_amount: successful.total_asset_amount,
            merkle_root_hash: tree.root().hash().clone(),
            merkle_tree_ipfs_hash: successful.merkle_tree_ipfs_hash.clone(),
            merkle_tree_depth: tree.root().depth(),
            hash_fn: tree.hash_fn(),
        }))
    }
}

pub struct NotInitializedTask<B, I, A, M, P> {
    queue: Arc<AssetSnapshotQueue<B, I, A, M, P>>,
    config: Config,
}

pub struct Task<B, I, A, M, P> {
    queue: Arc<AssetSnapshotQueue<B, I, A, M, P>>,
    timer: Option<Interval>,
}

#[async_trait::async_trait]
impl<B, I, A, M, P> RunnableService for NotInitializedTask<B, I, A, M, P>
where
    B: BlockchainService + 'static,
    I: IpfsService + 'static,
    A: AssetSnapshotRepository + 'static,
    M: MerkleTreeRepository + 'static,
    P: ProjectRepository + 'static,
{
    const NAME: &'static str = "AssetSnapshotQueue";

    type SharedData = Arc<AssetSnapshotQueue<B, I, A, M, P>>;
    type Task = Task<B, I, A, M, P>;
    type TaskParams = ();

    fn shared_data(&self) -> Self::SharedData {
        self.queue.clone()
    }

    async fn into_task(
        self,
        _: &StateWatcher,
        _: Self::TaskParams,
    ) -> anyhow::Result<Self::Task> {
        let timer = match self.config.trigger {
            Trigger::Never => None,
            Trigger::FixedRate {
                initial_delay,
                period,
            } => {
                if period.is_zero() {
                    anyhow::bail!("the polling period of the asset snapshot queue is zero")
                }
                let mut timer =
                    tokio::time::interval_at(Instant::now() + initial_delay, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(timer)
            }
        };

        Ok(Task {
            queue: self.queue,
            timer,
        })
    }
}

impl<B, I, A, M, P> RunnableTask for Task<B, I, A, M, P>
where
    B: BlockchainService + 'static,
    I: IpfsService + 'static,
    A: AssetSnapshotRepository + 'static,
    M: MerkleTreeRepository + 'static,
    P: ProjectRepository + 'static,
{
    async fn run(&mut self, watcher: &mut StateWatcher) -> TaskNextAction {
        let Some(timer) = self.timer.as_mut() else {
            let _ = watcher.while_started().await;
            return TaskNextAction::Stop
        };

        tokio::select! {
            biased;

            _ = watcher.while_started() => {
                TaskNextAction::Stop
            }
            _ = timer.tick() => {
                let result = self.queue.process_snapshots().await;
                if let Ok(report) = &result {
                    if report.succeeded + report.failed > 0 {
                        tracing::info!(
                            succeeded = report.succeeded,
                            failed = report.failed,
                            "Processed pending asset snapshots"
                        );
                    }
                }
                TaskNextAction::always_continue(result)
            }
        }
    }

    async fn shutdown(self) -> anyhow::Result<()> {
        // A run in progress already completed inside `run`.
        Ok(())
    }
}

/// Creates the queue service. The returned runner exposes the queue through
/// `shared` and processes snapshots as configured once started.
pub fn new_service<B, I, A, M, P>(
    blockchain: B,
    ipfs: I,
    snapshots: A,
    trees: M,
    projects: P,
    config: Config,
) -> Service<B, I, A, M, P>
where
    B: BlockchainService + 'static,
    I: IpfsService + 'static,
    A: AssetSnapshotRepository + 'static,
    M: MerkleTreeRepository + 'static,
    P: ProjectRepository + 'static,
{
    let queue = Arc::new(AssetSnapshotQueue::new(
        blockchain, ipfs, snapshots, trees, projects,
    ));
    ServiceRunner::new(NotInitializedTask { queue, config })
}
