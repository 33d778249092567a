#![deny(unused_must_use)]

mod snapshot_queue;

payout_snapshot_trace::enable_tracing!();
