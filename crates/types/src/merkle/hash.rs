use crate::primitives::{
    ParseError,
    decode_hex,
};
use core::{
    cmp::Ordering,
    fmt,
    str::FromStr,
};
use once_cell::sync::Lazy;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de::Error as _,
};
use sha3::{
    Digest,
    Keccak256,
};

/// Hash of the nil sentinel used to pad odd levels.
pub static NIL_HASH: Lazy<MerkleHash> = Lazy::new(|| MerkleHash::new(vec![0u8; 32]));

/// An opaque hash value of a tree node.
///
/// Equality is byte equality. Ordering inside the tree uses [`MerkleHash::numeric_cmp`]
/// which compares the big-endian unsigned value and ignores leading zero bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MerkleHash(Vec<u8>);

impl MerkleHash {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Compares two hashes as big-endian unsigned integers.
    pub fn numeric_cmp(&self, other: &Self) -> Ordering {
        let lhs = strip_leading_zeros(&self.0);
        let rhs = strip_leading_zeros(&other.0);
        lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
    }

    /// Combines two child hashes into the hash of their parent.
    pub fn combine(&self, other: &Self, hash_fn: HashFunction) -> Self {
        let mut input = Vec::with_capacity(self.0.len() + other.0.len());
        input.extend_from_slice(&self.0);
        input.extend_from_slice(&other.0);
        hash_fn.hash(&input)
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_non_zero = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len());
    &bytes[first_non_zero..]
}

impl From<[u8; 32]> for MerkleHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes.to_vec())
    }
}

impl FromStr for MerkleHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl fmt::Display for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for MerkleHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MerkleHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(D::Error::custom)
    }
}

/// The hashing strategy of a tree instance.
///
/// The names are stable: they are written into the JSON form of the tree and into
/// the tree store.
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
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
pub enum HashFunction {
    /// Returns its input unchanged. Only useful to inspect tree layouts in tests.
    #[serde(rename = "IDENTITY")]
    #[strum(serialize = "IDENTITY")]
    Identity,
    /// Returns the same 32 bytes for any input. Used to provoke collisions in tests.
    #[serde(rename = "FIXED")]
    #[strum(serialize = "FIXED")]
    Fixed,
    #[serde(rename = "KECCAK_256")]
    #[strum(serialize = "KECCAK_256")]
    Keccak256,
}

impl HashFunction {
    pub fn hash(&self, data: &[u8]) -> MerkleHash {
        match self {
            HashFunction::Identity => MerkleHash::new(data.to_vec()),
            HashFunction::Fixed => {
                let mut fixed = [0u8; 32];
                fixed[31] = 1;
                MerkleHash::from(fixed)
            }
            HashFunction::Keccak256 => MerkleHash::new(Keccak256::digest(data).to_vec()),
        }
    }
}
