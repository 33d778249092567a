//! Builders shared by the tests of the workspace.

use crate::{
    entities::PayoutAccountBalance,
    primitives::{
        Balance,
        WalletAddress,
    },
};
use proptest::prelude::*;
use rand::Rng;
use std::collections::HashSet;

/// A balance for the address whose value is `address` left padded to 20 bytes,
/// e.g. `balance(0x1, 10)` belongs to `0x00..01`.
pub fn balance(address: u64, amount: u64) -> PayoutAccountBalance {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&address.to_be_bytes());
    PayoutAccountBalance::new(WalletAddress::new(bytes), Balance::from(amount))
}

/// Balances for `count` distinct random holders.
pub fn random_balances<R: Rng>(rng: &mut R, count: usize) -> Vec<PayoutAccountBalance> {
    let mut seen = HashSet::with_capacity(count);
    let mut balances = Vec::with_capacity(count);

    while balances.len() < count {
        let address = WalletAddress::new(rng.r#gen());
        if seen.insert(address) {
            balances.push(PayoutAccountBalance::new(
                address,
                Balance::from(rng.gen_range(1..1_000_000_000u64)),
            ));
        }
    }

    balances
}

/// Strategy producing between 1 and `max_len` balances with distinct addresses.
pub fn arb_balances(max_len: usize) -> impl Strategy<Value = Vec<PayoutAccountBalance>> {
    prop::collection::hash_map(any::<[u8; 20]>(), any::<u64>(), 1..=max_len).prop_map(
        |holders| {
            holders
                .into_iter()
                .map(|(address, amount)| {
                    PayoutAccountBalance::new(
                        WalletAddress::new(address),
                        Balance::from(amount),
                    )
                })
                .collect()
        },
    )
}
