use std::time::Duration;

/// When pending snapshots are processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Never processed automatically. Callers drive
    /// [`AssetSnapshotQueue::process_snapshots`](crate::AssetSnapshotQueue::process_snapshots).
    Never,
    /// The first run happens `initial_delay` after start, then every `period`. A run
    /// that overruns the period delays the next one, runs never overlap.
    FixedRate {
        initial_delay: Duration,
        period: Duration,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub trigger: Trigger,
}

impl Config {
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(15);
    pub const DEFAULT_POLLING_PERIOD: Duration = Duration::from_secs(5);
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger: Trigger::FixedRate {
                initial_delay: Self::DEFAULT_INITIAL_DELAY,
                period: Self::DEFAULT_POLLING_PERIOD,
            },
        }
    }
}
