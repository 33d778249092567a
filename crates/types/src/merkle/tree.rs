use super::{
    hash::{
        HashFunction,
        MerkleHash,
    },
    node::{
        IndexedValue,
        LeafNode,
        MiddleNode,
        Node,
        RootNode,
    },
    proof::{
        PathSegment,
        PayoutProof,
        compute_root,
    },
};
use crate::{
    entities::PayoutAccountBalance,
    primitives::WalletAddress,
};
use std::collections::{
    HashMap,
    HashSet,
};

/// Errors raised while building a tree from a list of balances.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleTreeError {
    #[error("cannot build a Merkle tree from an empty list of balances")]
    EmptyBalances,
    #[error("more than one balance produces the leaf hash {0}")]
    DuplicateLeafHash(MerkleHash),
    #[error("address {0} appears more than once in the list of balances")]
    DuplicateAddress(WalletAddress),
}

/// An immutable Merkle tree over a non-empty set of holder balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    root: RootNode,
    hash_fn: HashFunction,
    leaf_nodes_by_hash: HashMap<MerkleHash, IndexedValue<LeafNode>>,
    leaf_nodes_by_address: HashMap<WalletAddress, IndexedValue<LeafNode>>,
}

impl MerkleTree {
    /// Builds the canonical tree for `balances`. The input order does not matter.
    pub fn new(
        balances: Vec<PayoutAccountBalance>,
        hash_fn: HashFunction,
    ) -> Result<Self, MerkleTreeError> {
        if balances.is_empty() {
            return Err(MerkleTreeError::EmptyBalances)
        }

        let mut leaves: Vec<LeafNode> = balances
            .into_iter()
            .map(|balance| LeafNode::new(balance, hash_fn))
            .collect();
        ensure_unique(&leaves)?;
        leaves.sort_by(|a, b| a.hash().numeric_cmp(b.hash()));

        let root = build_root(leaves.into_iter().map(Node::Leaf).collect(), hash_fn);

        let mut indexed = Vec::new();
        let half = subtree_width(root.depth() - 1);
        collect_leaves(root.left(), 0, root.depth() - 1, &mut indexed);
        collect_leaves(root.right(), half, root.depth() - 1, &mut indexed);

        let mut leaf_nodes_by_hash = HashMap::with_capacity(indexed.len());
        let mut leaf_nodes_by_address = HashMap::with_capacity(indexed.len());
        for IndexedValue { value, index } in indexed {
            leaf_nodes_by_address.insert(
                value.data().address,
                IndexedValue {
                    value: value.clone(),
                    index,
                },
            );
            leaf_nodes_by_hash.insert(value.hash().clone(), IndexedValue { value, index });
        }

        Ok(Self {
            root,
            hash_fn,
            leaf_nodes_by_hash,
            leaf_nodes_by_address,
        })
    }

    pub fn root(&self) -> &RootNode {
        &self.root
    }

    pub fn hash_fn(&self) -> HashFunction {
        self.hash_fn
    }

    pub fn leaf_nodes_by_hash(&self) -> &HashMap<MerkleHash, IndexedValue<LeafNode>> {
        &self.leaf_nodes_by_hash
    }

    pub fn leaf_nodes_by_address(
        &self,
    ) -> &HashMap<WalletAddress, IndexedValue<LeafNode>> {
        &self.leaf_nodes_by_address
    }

    /// All balances of the tree ordered by their leaf index.
    pub fn balances(&self) -> Vec<PayoutAccountBalance> {
        let mut leaves: Vec<_> = self.leaf_nodes_by_hash.values().collect();
        leaves.sort_by_key(|leaf| leaf.index);
        leaves.into_iter().map(|leaf| *leaf.value.data()).collect()
    }

    /// Returns the inclusion proof of `balance`, ordered from the leaf level up to
    /// the root, or `None` when this exact address and amount pair is not a leaf.
    pub fn path_to(&self, balance: &PayoutAccountBalance) -> Option<Vec<PathSegment>> {
        let leaf_hash = self.hash_fn.hash(&balance.abi_encode());
        let leaf = self.leaf_nodes_by_hash.get(&leaf_hash)?;

        if leaf.value.data() != balance {
            return None
        }

        self.path_to_index(leaf.index)
    }

    /// Looks up the holder and returns everything needed to claim a payout.
    pub fn proof_for_address(&self, address: &WalletAddress) -> Option<PayoutProof> {
        let leaf = self.leaf_nodes_by_address.get(address)?;
        let path = self.path_to_index(leaf.index)?;

        Some(PayoutProof {
            address: *address,
            balance: leaf.value.data().balance,
            leaf_index: leaf.index,
            path,
        })
    }

    /// Replays `path` from `leaf_hash` with the hash function of this tree and
    /// compares the result with `root_hash`.
    pub fn verify_path(
        &self,
        leaf_hash: &MerkleHash,
        path: &[PathSegment],
        root_hash: &MerkleHash,
    ) -> bool {
        compute_root(self.hash_fn, leaf_hash, path) == *root_hash
    }

    fn path_to_index(&self, index: u64) -> Option<Vec<PathSegment>> {
        let goes_right = |height: u32| (index >> height) & 1 == 1;

        let mut path = Vec::new();
        let mut height = self.root.depth() - 1;
        let mut current = step(
            self.root.left(),
            self.root.right(),
            goes_right(height),
            &mut path,
        );

        while height > 0 {
            let Node::Middle(middle) = current else {
                return None
            };
            height -= 1;
            current = step(middle.left(), middle.right(), goes_right(height), &mut path);
        }

        if !matches!(current, Node::Leaf(_)) {
            return None
        }

        path.reverse();
        Some(path)
    }
}

/// Descends into one child and records the other one as the sibling.
fn step<'a>(
    left: &'a Node,
    right: &'a Node,
    goes_right: bool,
    path: &mut Vec<PathSegment>,
) -> &'a Node {
    if goes_right {
        path.push(PathSegment::new(left.hash().clone(), true));
        right
    } else {
        path.push(PathSegment::new(right.hash().clone(), false));
        left
    }
}

fn ensure_unique(leaves: &[LeafNode]) -> Result<(), MerkleTreeError> {
    let mut hashes = HashSet::with_capacity(leaves.len());
    for leaf in leaves {
        if !hashes.insert(leaf.hash()) {
            return Err(MerkleTreeError::DuplicateLeafHash(leaf.hash().clone()))
        }
    }

    let mut addresses = HashSet::with_capacity(leaves.len());
    for leaf in leaves {
        if !addresses.insert(leaf.data().address) {
            return Err(MerkleTreeError::DuplicateAddress(leaf.data().address))
        }
    }

    Ok(())
}

/// Places the numerically smaller hash on the left. Ties keep their order.
fn ordered(first: Node, second: Node) -> (Node, Node) {
    if second.hash().numeric_cmp(first.hash()).is_lt() {
        (second, first)
    } else {
        (first, second)
    }
}

fn build_root(mut level: Vec<Node>, hash_fn: HashFunction) -> RootNode {
    let mut depth = 0u32;

    loop {
        if level.len() % 2 == 1 {
            level.push(Node::Nil);
        }
        depth += 1;

        level = match <[Node; 2]>::try_from(level) {
            Ok([first, second]) => {
                let (left, right) = ordered(first, second);
                return RootNode::new(left, right, depth, hash_fn)
            }
            Err(level) => combine_level(level, hash_fn),
        };
    }
}

fn combine_level(level: Vec<Node>, hash_fn: HashFunction) -> Vec<Node> {
    let mut nodes = level.into_iter();
    let mut parents = Vec::with_capacity(nodes.len() / 2);

    while let (Some(first), Some(second)) = (nodes.next(), nodes.next()) {
        let (left, right) = ordered(first, second);
        parents.push(Node::Middle(MiddleNode::new(left, right, hash_fn)));
    }

    parents
}

/// Number of bottom level slots below a node at `height` levels above the leaves.
fn subtree_width(height: u32) -> u64 {
    1u64 << height
}

fn collect_leaves(
    node: &Node,
    offset: u64,
    height: u32,
    out: &mut Vec<IndexedValue<LeafNode>>,
) {
    match node {
        Node::Nil => {}
        Node::Leaf(leaf) => out.push(IndexedValue {
            value: leaf.clone(),
            index: offset,
        }),
        Node::Middle(middle) => {
            let child_height = height.saturating_sub(1);
            let half = subtree_width(child_height);
            collect_leaves(middle.left(), offset, child_height, out);
            collect_leaves(middle.right(), offset + half, child_height, out);
        }
    }
}
