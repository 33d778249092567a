//! The asset snapshot queue: accepts snapshot requests without blocking, and processes
//! pending snapshots in a single recurring background task that fetches holder
//! balances, builds the canonical Merkle tree, deduplicates it, pins it and records
//! the outcome.

#![deny(unused_crate_dependencies)]
#![deny(unused_variables)]

pub mod config;
pub mod failure;
pub mod ports;
pub mod service;

pub use config::{
    Config,
    Trigger,
};
pub use service::{
    AssetSnapshotQueue,
    ProcessingReport,
    Service,
    new_service,
};

#[cfg(test)]
payout_snapshot_trace::enable_tracing!();
