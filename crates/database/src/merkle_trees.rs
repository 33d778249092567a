use crate::StorageError;
use anyhow::Context;
use parking_lot::RwLock;
use payout_snapshot_queue::ports::MerkleTreeRepository;
use payout_snapshot_types::{
    HashFunction,
    MerkleHash,
    MerkleTree,
    entities::{
        FetchMerkleTreeParams,
        FetchMerkleTreePathParams,
        MerkleTreeWithId,
        PayoutAccountBalance,
    },
    primitives::{
        BlockNumber,
        ChainId,
        ContractAddress,
        MerkleTreeRootId,
    },
};
use std::{
    collections::HashMap,
    sync::Arc,
};

/// Trees are stored as their root hash, hash function and leaves, and rebuilt on
/// every read.
#[derive(Clone, Default)]
pub struct InMemoryMerkleTreeRepository {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    trees: HashMap<MerkleTreeRootId, StoredMerkleTree>,
    index: HashMap<FetchMerkleTreeParams, MerkleTreeRootId>,
}

#[derive(Clone, Debug)]
struct StoredMerkleTree {
    root_hash: MerkleHash,
    hash_fn: HashFunction,
    block_number: BlockNumber,
    leaves: Vec<PayoutAccountBalance>,
}

impl StoredMerkleTree {
    fn rebuild(&self, id: MerkleTreeRootId) -> anyhow::Result<MerkleTree> {
        let tree = MerkleTree::new(self.leaves.clone(), self.hash_fn)
            .with_context(|| format!("failed to rebuild merkle tree {id}"))?;

        let rebuilt = tree.root().hash();
        if rebuilt != &self.root_hash {
            return Err(StorageError::CorruptedTree {
                id,
                stored: self.root_hash.clone(),
                rebuilt: rebuilt.clone(),
            }
            .into())
        }

        Ok(tree)
    }
}

impl Inner {
    fn stored(
        &self,
        params: &FetchMerkleTreeParams,
    ) -> anyhow::Result<Option<(MerkleTreeRootId, &StoredMerkleTree)>> {
        let Some(id) = self.index.get(params).copied() else {
            return Ok(None)
        };
        let stored = self.trees.get(&id).ok_or(StorageError::MissingTree(id))?;
        Ok(Some((id, stored)))
    }
}

impl InMemoryMerkleTreeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The block number the tree was first computed at.
    pub fn block_number(&self, id: MerkleTreeRootId) -> Option<BlockNumber> {
        self.inner.read().trees.get(&id).map(|stored| stored.block_number)
    }
}

impl MerkleTreeRepository for InMemoryMerkleTreeRepository {
    fn get_by_id(&self, id: MerkleTreeRootId) -> anyhow::Result<Option<MerkleTree>> {
        let inner = self.inner.read();
        inner
            .trees
            .get(&id)
            .map(|stored| stored.rebuild(id))
            .transpose()
    }

    fn store_tree(
        &self,
        tree: &MerkleTree,
        chain_id: ChainId,
        asset_contract_address: ContractAddress,
        block_number: BlockNumber,
    ) -> anyhow::Result<MerkleTreeRootId> {
        let root_hash = tree.root().hash().clone();
        let key = FetchMerkleTreeParams {
            root_hash: root_hash.clone(),
            chain_id,
            asset_contract_address,
        };

        let mut inner = self.inner.write();
        if let Some(id) = inner.index.get(&key) {
            tracing::debug!(
                merkle_tree_root_id = %id,
                %root_hash,
                "Merkle tree is already stored"
            );
            return Ok(*id)
        }

        let id = MerkleTreeRootId::new_random();
        inner.trees.insert(
            id,
            StoredMerkleTree {
                root_hash: root_hash.clone(),
                hash_fn: tree.hash_fn(),
                block_number,
                leaves: tree.balances(),
            },
        );
        inner.index.insert(key, id);
        tracing::debug!(
            merkle_tree_root_id = %id,
            %root_hash,
            %chain_id,
            asset = %asset_contract_address,
            "Stored merkle tree"
        );

        Ok(id)
    }

    fn fetch_tree(
        &self,
        params: &FetchMerkleTreeParams,
    ) -> anyhow::Result<Option<MerkleTreeWithId>> {
        let inner = self.inner.read();
        let Some((id, stored)) = inner.stored(params)? else {
            return Ok(None)
        };

        Ok(Some(MerkleTreeWithId {
            id,
            tree: stored.rebuild(id)?,
        }))
    }

    fn contains_address(&self, params: &FetchMerkleTreePathParams) -> anyhow::Result<bool> {
        let inner = self.inner.read();
        let contains = inner.stored(&params.tree_params())?.is_some_and(|(_, stored)| {
            stored
                .leaves
                .iter()
                .any(|leaf| leaf.address == params.wallet_address)
        });

        Ok(contains)
    }
}
