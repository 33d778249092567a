//! The runnable-service framework: a service is split into an uninitialized part that
//! exposes shared data and a task that runs in a loop until it is asked to stop. The
//! [`ServiceRunner`] owns the lifecycle and reports it through a [`StateWatcher`].

#![deny(unused_crate_dependencies)]
#![deny(unused_variables)]

mod service;
mod state;

pub use service::{
    RunnableService,
    RunnableTask,
    Service,
    ServiceRunner,
    TaskNextAction,
};
pub use state::{
    State,
    StateWatcher,
};

#[cfg(test)]
payout_snapshot_trace::enable_tracing!();
