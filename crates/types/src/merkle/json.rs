//! JSON form of a tree, the artifact pinned for third parties.
//!
//! The root carries `depth`, `hash`, `hash_fn`, `left` and `right`; middle nodes
//! carry `hash`, `left` and `right`; leaves carry `hash` and `data`; the nil
//! sentinel carries only its `hash`. Decoding rebuilds the tree from the leaves and
//! refuses documents whose stored hashes disagree with the rebuilt ones.

use super::{
    hash::{
        HashFunction,
        MerkleHash,
        NIL_HASH,
    },
    node::Node,
    tree::{
        MerkleTree,
        MerkleTreeError,
    },
};
use crate::entities::PayoutAccountBalance;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de::Error as _,
    ser::SerializeStruct,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializedTreeError {
    #[error("leaf hash {stored} does not match the hash of its data {computed}")]
    LeafHashMismatch {
        stored: MerkleHash,
        computed: MerkleHash,
    },
    #[error("nil node carries hash {0}")]
    InvalidNilHash(MerkleHash),
    #[error("rebuilt root hash {rebuilt} differs from the stored root hash {stored}")]
    RootHashMismatch {
        stored: MerkleHash,
        rebuilt: MerkleHash,
    },
    #[error("rebuilt depth {rebuilt} differs from the stored depth {stored}")]
    DepthMismatch { stored: u32, rebuilt: u32 },
    #[error(transparent)]
    Tree(#[from] MerkleTreeError),
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Nil => {
                let mut node = serializer.serialize_struct("NilNode", 1)?;
                node.serialize_field("hash", &*NIL_HASH)?;
                node.end()
            }
            Node::Leaf(leaf) => {
                let mut node = serializer.serialize_struct("LeafNode", 2)?;
                node.serialize_field("hash", leaf.hash())?;
                node.serialize_field("data", leaf.data())?;
                node.end()
            }
            Node::Middle(middle) => {
                let mut node = serializer.serialize_struct("MiddleNode", 3)?;
                node.serialize_field("hash", middle.hash())?;
                node.serialize_field("left", middle.left())?;
                node.serialize_field("right", middle.right())?;
                node.end()
            }
        }
    }
}

impl Serialize for MerkleTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let root = self.root();
        let mut tree = serializer.serialize_struct("MerkleTree", 5)?;
        tree.serialize_field("depth", &root.depth())?;
        tree.serialize_field("hash", root.hash())?;
        tree.serialize_field("hash_fn", &self.hash_fn())?;
        tree.serialize_field("left", root.left())?;
        tree.serialize_field("right", root.right())?;
        tree.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SerializedNode {
    Middle {
        left: Box<SerializedNode>,
        right: Box<SerializedNode>,
    },
    Leaf {
        hash: MerkleHash,
        data: PayoutAccountBalance,
    },
    Nil {
        hash: MerkleHash,
    },
}

#[derive(Deserialize)]
struct SerializedTree {
    depth: u32,
    hash: MerkleHash,
    hash_fn: HashFunction,
    left: SerializedNode,
    right: SerializedNode,
}

impl SerializedNode {
    fn collect_balances(
        self,
        hash_fn: HashFunction,
        balances: &mut Vec<PayoutAccountBalance>,
    ) -> Result<(), SerializedTreeError> {
        match self {
            SerializedNode::Middle { left, right } => {
                left.collect_balances(hash_fn, balances)?;
                right.collect_balances(hash_fn, balances)
            }
            SerializedNode::Leaf { hash, data } => {
                let computed = hash_fn.hash(&data.abi_encode());
                if computed != hash {
                    return Err(SerializedTreeError::LeafHashMismatch {
                        stored: hash,
                        computed,
                    })
                }
                balances.push(data);
                Ok(())
            }
            SerializedNode::Nil { hash } => {
                if hash != *NIL_HASH {
                    return Err(SerializedTreeError::InvalidNilHash(hash))
                }
                Ok(())
            }
        }
    }
}

impl SerializedTree {
    fn rebuild(self) -> Result<MerkleTree, SerializedTreeError> {
        let SerializedTree {
            depth,
            hash,
            hash_fn,
            left,
            right,
        } = self;

        let mut balances = Vec::new();
        left.collect_balances(hash_fn, &mut balances)?;
        right.collect_balances(hash_fn, &mut balances)?;

        let tree = MerkleTree::new(balances, hash_fn)?;

        if *tree.root().hash() != hash {
            return Err(SerializedTreeError::RootHashMismatch {
                stored: hash,
                rebuilt: tree.root().hash().clone(),
            })
        }
        if tree.root().depth() != depth {
            return Err(SerializedTreeError::DepthMismatch {
                stored: depth,
                rebuilt: tree.root().depth(),
            })
        }

        Ok(tree)
    }
}

impl<'de> Deserialize<'de> for MerkleTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let serialized = SerializedTree::deserialize(deserializer)?;
        serialized.rebuild().map_err(D::Error::custom)
    }
}
