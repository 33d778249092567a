//! Strongly typed primitives exchanged with the chain and the stores.

use core::{
    fmt,
    str::FromStr,
};
use primitive_types::{
    H160,
    H256,
    U256,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de::Error as _,
};
use uuid::Uuid;

/// Errors produced while parsing primitives from their textual form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("value is {actual} bytes long, at most {max} bytes are allowed")]
    TooLong { max: usize, actual: usize },
    #[error("invalid decimal number `{0}`")]
    InvalidDecimal(String),
}

/// Decodes a `0x`-prefixed or bare hex string. Odd-length strings are
/// treated as if they had a leading zero nibble, so `0x1` decodes to `[0x01]`.
pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>, ParseError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.len() % 2 == 1 {
        Ok(hex::decode(format!("0{digits}"))?)
    } else {
        Ok(hex::decode(digits)?)
    }
}

fn left_pad<const N: usize>(bytes: &[u8]) -> Result<[u8; N], ParseError> {
    if bytes.len() > N {
        return Err(ParseError::TooLong {
            max: N,
            actual: bytes.len(),
        })
    }
    let mut padded = [0u8; N];
    padded[N - bytes.len()..].copy_from_slice(bytes);
    Ok(padded)
}

macro_rules! string_serde {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(D::Error::custom)
            }
        }
    };
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(H160);

        impl $name {
            /// Size of the address in bytes.
            pub const LEN: usize = 20;

            /// Creates the address from its raw bytes.
            pub const fn new(bytes: [u8; 20]) -> Self {
                Self(H160(bytes))
            }

            /// Raw bytes of the address.
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }

            /// The address left-padded to a single 32 bytes ABI word.
            pub fn to_abi_word(&self) -> [u8; 32] {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(self.0.as_bytes());
                word
            }
        }

        impl From<H160> for $name {
            fn from(value: H160) -> Self {
                Self(value)
            }
        }

        impl From<$name> for H160 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = decode_hex(s)?;
                Ok(Self::new(left_pad::<20>(&bytes)?))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0.as_bytes()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        string_serde!($name);
    };
}

address_type!(
    /// Address of an externally owned account or a token holder.
    WalletAddress
);

address_type!(
    /// Address of a deployed contract, e.g. the ERC-20 asset of a snapshot.
    ContractAddress
);

/// Unsigned 256 bits token amount.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Balance(U256);

impl Balance {
    /// The zero amount.
    pub const ZERO: Self = Self(U256([0; 4]));

    /// Wraps a raw 256 bits value.
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    /// The raw 256 bits value.
    pub fn value(&self) -> U256 {
        self.0
    }

    /// Big-endian representation, which is also the ABI encoding of `uint256`.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        bytes
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.0.checked_mul(other.0).map(Self)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.0.checked_div(other.0).map(Self)
    }

    /// Sums all amounts, returning `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }
}

impl From<U256> for Balance {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for Balance {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for Balance {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|_| ParseError::InvalidDecimal(s.to_string()))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

string_serde!(Balance);

/// Height of a block on the chain the asset lives on.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct BlockNumber(u64);

impl BlockNumber {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

/// EIP-155 chain identifier.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            derive_more::Display,
            derive_more::From,
            derive_more::Into,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of an asset snapshot request.
    AssetSnapshotId
);

uuid_id!(
    /// Identifier of a stored Merkle tree root.
    MerkleTreeRootId
);

uuid_id!(
    /// Identifier of the project owning snapshots.
    ProjectId
);

/// Content identifier returned by the pinning service.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    derive_more::From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct IpfsHash(String);

impl IpfsHash {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hash of a transaction on the asset's chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransactionHash(H256);

impl TransactionHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for TransactionHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        Ok(Self::new(left_pad::<32>(&bytes)?))
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

string_serde!(TransactionHash);
