use super::hash::{
    HashFunction,
    MerkleHash,
    NIL_HASH,
};
use crate::entities::PayoutAccountBalance;

/// A node below the root of the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Sentinel padding an odd level. Never a balance leaf.
    Nil,
    Leaf(LeafNode),
    Middle(MiddleNode),
}

impl Node {
    pub fn hash(&self) -> &MerkleHash {
        match self {
            Node::Nil => &NIL_HASH,
            Node::Leaf(leaf) => &leaf.hash,
            Node::Middle(middle) => &middle.hash,
        }
    }
}

/// A leaf wrapping a single holder balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafNode {
    data: PayoutAccountBalance,
    hash: MerkleHash,
}

impl LeafNode {
    pub fn new(data: PayoutAccountBalance, hash_fn: HashFunction) -> Self {
        let hash = hash_fn.hash(&data.abi_encode());
        Self { data, hash }
    }

    pub fn data(&self) -> &PayoutAccountBalance {
        &self.data
    }

    pub fn hash(&self) -> &MerkleHash {
        &self.hash
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiddleNode {
    left: Box<Node>,
    right: Box<Node>,
    hash: MerkleHash,
}

impl MiddleNode {
    pub fn new(left: Node, right: Node, hash_fn: HashFunction) -> Self {
        let hash = left.hash().combine(right.hash(), hash_fn);
        Self {
            left: Box::new(left),
            right: Box::new(right),
            hash,
        }
    }

    pub fn left(&self) -> &Node {
        &self.left
    }

    pub fn right(&self) -> &Node {
        &self.right
    }

    pub fn hash(&self) -> &MerkleHash {
        &self.hash
    }
}

/// The apex of the tree. `depth` is the number of levels between the root and the
/// leaves, so a tree over one or two balances has depth 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootNode {
    left: Node,
    right: Node,
    hash: MerkleHash,
    depth: u32,
}

impl RootNode {
    pub fn new(left: Node, right: Node, depth: u32, hash_fn: HashFunction) -> Self {
        let hash = left.hash().combine(right.hash(), hash_fn);
        Self {
            left,
            right,
            hash,
            depth,
        }
    }

    pub fn left(&self) -> &Node {
        &self.left
    }

    pub fn right(&self) -> &Node {
        &self.right
    }

    pub fn hash(&self) -> &MerkleHash {
        &self.hash
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// A value tagged with its position in the bottom level of the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedValue<T> {
    pub value: T,
    pub index: u64,
}
