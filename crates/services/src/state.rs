use tokio::sync::watch;

/// The lifecycle state of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Created but `start` was not called yet.
    NotStarted,
    /// `start` was called and the task is being initialized.
    Starting,
    Started,
    /// The stop signal was received, the task is finishing its current iteration.
    Stopping,
    Stopped,
    /// The service stopped because initialization failed or the task panicked.
    StoppedWithError(String),
}

impl State {
    pub fn not_started(&self) -> bool {
        self == &State::NotStarted
    }

    pub fn starting(&self) -> bool {
        self == &State::Starting
    }

    pub fn started(&self) -> bool {
        self == &State::Started
    }

    pub fn stopping(&self) -> bool {
        self == &State::Stopping
    }

    pub fn stopped(&self) -> bool {
        matches!(self, State::Stopped | State::StoppedWithError(_))
    }
}

/// Read side of the lifecycle state, handed to tasks so they can react to the stop
/// signal.
#[derive(Clone)]
pub struct StateWatcher(watch::Receiver<State>);

impl StateWatcher {
    /// Resolves as soon as the service leaves [`State::Started`]. Cancel safe, meant
    /// to be raced against the work of the task in `tokio::select!`.
    pub async fn while_started(&mut self) -> anyhow::Result<State> {
        loop {
            let state = self.0.borrow_and_update().clone();
            if !state.started() {
                return Ok(state)
            }
            self.0.changed().await?;
        }
    }

    pub fn borrow(&self) -> watch::Ref<'_, State> {
        self.0.borrow()
    }

    pub fn borrow_and_update(&mut self) -> watch::Ref<'_, State> {
        self.0.borrow_and_update()
    }

    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.0.changed().await
    }
}

impl From<watch::Receiver<State>> for StateWatcher {
    fn from(receiver: watch::Receiver<State>) -> Self {
        Self(receiver)
    }
}
