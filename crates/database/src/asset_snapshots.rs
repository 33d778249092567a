use parking_lot::RwLock;
use payout_snapshot_queue::ports::AssetSnapshotRepository;
use payout_snapshot_types::{
    entities::{
        AssetSnapshot,
        AssetSnapshotData,
        AssetSnapshotFailureCause,
        AssetSnapshotStatus,
        CreateAssetSnapshotParams,
        PendingAssetSnapshot,
        SuccessfulAssetSnapshotData,
    },
    primitives::{
        AssetSnapshotId,
        Balance,
        IpfsHash,
        MerkleTreeRootId,
        ProjectId,
    },
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Arc,
};

/// Snapshot requests kept in creation order.
#[derive(Clone, Default)]
pub struct InMemoryAssetSnapshotRepository {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    order: Vec<AssetSnapshotId>,
    snapshots: HashMap<AssetSnapshotId, AssetSnapshot>,
}

impl Inner {
    fn ordered(&self) -> impl Iterator<Item = &AssetSnapshot> {
        self.order.iter().filter_map(|id| self.snapshots.get(id))
    }

    /// Replaces the data of a pending snapshot. Processed snapshots are final.
    fn transition(
        &mut self,
        id: AssetSnapshotId,
        data: AssetSnapshotData,
    ) -> Option<AssetSnapshot> {
        let snapshot = self.snapshots.get_mut(&id)?;
        if snapshot.data != AssetSnapshotData::Pending {
            tracing::warn!(
                snapshot_id = %id,
                status = %snapshot.status(),
                "Refusing to update an already processed asset snapshot"
            );
            return None
        }
        snapshot.data = data;
        Some(snapshot.clone())
    }
}

impl InMemoryAssetSnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetSnapshotRepository for InMemoryAssetSnapshotRepository {
    fn create_asset_snapshot(
        &self,
        params: CreateAssetSnapshotParams,
    ) -> anyhow::Result<AssetSnapshotId> {
        let id = AssetSnapshotId::new_random();
        let snapshot = AssetSnapshot::pending(id, params);

        let mut inner = self.inner.write();
        inner.order.push(id);
        inner.snapshots.insert(id, snapshot);

        Ok(id)
    }

    fn get_by_id(&self, id: AssetSnapshotId) -> anyhow::Result<Option<AssetSnapshot>> {
        Ok(self.inner.read().snapshots.get(&id).cloned())
    }

    fn get_all_by_project_id_and_statuses(
        &self,
        project_id: ProjectId,
        statuses: &HashSet<AssetSnapshotStatus>,
    ) -> anyhow::Result<Vec<AssetSnapshot>> {
        let inner = self.inner.read();
        let snapshots = inner
            .ordered()
            .filter(|snapshot| {
                snapshot.project_id == project_id && statuses.contains(&snapshot.status())
            })
            .cloned()
            .collect();

        Ok(snapshots)
    }

    fn get_pending(&self) -> anyhow::Result<Vec<PendingAssetSnapshot>> {
        let inner = self.inner.read();
        Ok(inner.ordered().filter_map(AssetSnapshot::as_pending).collect())
    }

    fn complete_asset_snapshot(
        &self,
        id: AssetSnapshotId,
        merkle_tree_root_id: MerkleTreeRootId,
        merkle_tree_ipfs_hash: IpfsHash,
        total_asset_amount: Balance,
    ) -> anyhow::Result<Option<AssetSnapshot>> {
        let data = AssetSnapshotData::Successful(SuccessfulAssetSnapshotData {
            merkle_tree_root_id,
            merkle_tree_ipfs_hash,
            total_asset_amount,
        });
        Ok(self.inner.write().transition(id, data))
    }

    fn fail_asset_snapshot(
        &self,
        id: AssetSnapshotId,
        cause: AssetSnapshotFailureCause,
    ) -> anyhow::Result<Option<AssetSnapshot>> {
        Ok(self
            .inner
            .write()
            .transition(id, AssetSnapshotData::Failed(cause)))
    }
}
