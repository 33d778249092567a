//! Holder balances, the input of a Merkle tree.

use crate::primitives::{
    Balance,
    WalletAddress,
};
use serde::{
    Deserialize,
    Serialize,
};

/// The balance of a single holder at the payout block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutAccountBalance {
    pub address: WalletAddress,
    pub balance: Balance,
}

impl PayoutAccountBalance {
    pub fn new(address: WalletAddress, balance: Balance) -> Self {
        Self { address, balance }
    }

    /// ABI encoding of `(address, uint256)`: two 32 bytes words, the address left
    /// padded and the balance in big-endian order.
    pub fn abi_encode(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(64);
        encoded.extend_from_slice(&self.address.to_abi_word());
        encoded.extend_from_slice(&self.balance.to_be_bytes());
        encoded
    }
}
