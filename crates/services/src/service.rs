use crate::state::{
    State,
    StateWatcher,
};
use futures::FutureExt;
use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
};
use tokio::sync::watch;
use tracing::Instrument;

/// What the runner should do after one iteration of a task.
#[derive(Debug)]
pub enum TaskNextAction {
    Continue,
    Stop,
    /// The iteration failed, the error is logged and the loop goes on.
    ErrorContinue(anyhow::Error),
}

impl TaskNextAction {
    /// Maps a fallible iteration onto `Continue` or `ErrorContinue`.
    pub fn always_continue<T, E: Into<anyhow::Error>>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => TaskNextAction::Continue,
            Err(e) => TaskNextAction::ErrorContinue(e.into()),
        }
    }
}

/// The uninitialized part of a service.
#[async_trait::async_trait]
pub trait RunnableService: Send {
    /// Name used in logs.
    const NAME: &'static str;

    /// Data available to the owner of the runner while the task runs.
    type SharedData: Clone + Send + Sync;

    type Task: RunnableTask;

    type TaskParams: Send;

    fn shared_data(&self) -> Self::SharedData;

    /// Turns the service into its task. Called once, after `start`.
    async fn into_task(
        self,
        state_watcher: &StateWatcher,
        params: Self::TaskParams,
    ) -> anyhow::Result<Self::Task>;
}

/// The body of a service, called in a loop while the service is started.
pub trait RunnableTask: Send {
    /// One iteration. Long waits should race `watcher.while_started()` so a stop
    /// signal is observed promptly.
    fn run(
        &mut self,
        watcher: &mut StateWatcher,
    ) -> impl Future<Output = TaskNextAction> + Send;

    /// Called once after the loop ended.
    fn shutdown(self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Lifecycle control of a running service.
#[async_trait::async_trait]
pub trait Service {
    /// Sends the start signal. Fails if the service was already started.
    fn start(&self) -> anyhow::Result<()>;

    /// Sends the start signal and waits until the task is running or stopped.
    async fn start_and_await(&self) -> anyhow::Result<State>;

    async fn await_start_or_stop(&self) -> anyhow::Result<State>;

    /// Sends the stop signal. Returns `false` if the service was already stopping.
    fn stop(&self) -> bool;

    /// Sends the stop signal and waits for the current iteration to finish.
    async fn stop_and_await(&self) -> anyhow::Result<State>;

    async fn await_stop(&self) -> anyhow::Result<State>;

    fn state(&self) -> State;

    fn state_watcher(&self) -> StateWatcher;
}

/// Owns the background task of a [`RunnableService`].
///
/// The task is spawned on creation and waits for [`Service::start`]. Dropping the
/// runner sends the stop signal.
pub struct ServiceRunner<S>
where
    S: RunnableService + 'static,
{
    pub shared: S::SharedData,
    state: Arc<watch::Sender<State>>,
}

impl<S> ServiceRunner<S>
where
    S: RunnableService<TaskParams = ()> + 'static,
{
    pub fn new(service: S) -> Self {
        Self::new_with_params(service, ())
    }
}

impl<S> ServiceRunner<S>
where
    S: RunnableService + 'static,
{
    pub fn new_with_params(service: S, params: S::TaskParams) -> Self
    where
        S::TaskParams: 'static,
    {
        let shared = service.shared_data();
        let state = initialize_loop(service, params);
        Self { shared, state }
    }

    async fn await_state(
        &self,
        condition: impl Fn(&State) -> bool + Send,
    ) -> anyhow::Result<State> {
        let mut watcher = self.state.subscribe();
        loop {
            let state = watcher.borrow_and_update().clone();
            if condition(&state) {
                return Ok(state)
            }
            watcher.changed().await?;
        }
    }
}

#[async_trait::async_trait]
impl<S> Service for ServiceRunner<S>
where
    S: RunnableService + 'static,
{
    fn start(&self) -> anyhow::Result<()> {
        let started = self.state.send_if_modified(|state| {
            if state.not_started() {
                *state = State::Starting;
                true
            } else {
                false
            }
        });

        if started {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "The service `{}` already has been started.",
                S::NAME
            ))
        }
    }

    async fn start_and_await(&self) -> anyhow::Result<State> {
        self.start()?;
        self.await_start_or_stop().await
    }

    async fn await_start_or_stop(&self) -> anyhow::Result<State> {
        self.await_state(|state| state.started() || state.stopped())
            .await
    }

    fn stop(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.not_started() || state.starting() || state.started() {
                *state = State::Stopping;
                true
            } else {
                false
            }
        })
    }

    async fn stop_and_await(&self) -> anyhow::Result<State> {
        self.stop();
        self.await_stop().await
    }

    async fn await_stop(&self) -> anyhow::Result<State> {
        self.await_state(State::stopped).await
    }

    fn state(&self) -> State {
        self.state.borrow().clone()
    }

    fn state_watcher(&self) -> StateWatcher {
        self.state.subscribe().into()
    }
}

impl<S> Drop for ServiceRunner<S>
where
    S: RunnableService + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn panic_to_string(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn initialize_loop<S>(
    service: S,
    params: S::TaskParams,
) -> Arc<watch::Sender<State>>
where
    S: RunnableService + 'static,
    S::TaskParams: 'static,
{
    let (sender, _) = watch::channel(State::NotStarted);
    let state = Arc::new(sender);
    let stop_sender = state.clone();

    tokio::task::spawn(
        async move {
            tracing::debug!("running");
            let run = AssertUnwindSafe(run(service, &stop_sender, params));
            let final_state = match run.catch_unwind().await {
                Ok(Ok(())) => State::Stopped,
                Ok(Err(error)) => {
                    tracing::error!("The service failed: {error:?}");
                    State::StoppedWithError(error.to_string())
                }
                Err(panic) => {
                    let message = panic_to_string(panic);
                    tracing::error!("The service panicked: {message}");
                    State::StoppedWithError(message)
                }
            };
            stop_sender.send_replace(final_state);
            tracing::debug!("stopped");
        }
        .instrument(tracing::info_span!("service", name = S::NAME)),
    );

    state
}

async fn run<S>(
    service: S,
    sender: &watch::Sender<State>,
    params: S::TaskParams,
) -> anyhow::Result<()>
where
    S: RunnableService + 'static,
{
    let mut watcher: StateWatcher = sender.subscribe().into();

    if watcher.borrow_and_update().not_started() {
        // Either the start or the stop signal.
        watcher.changed().await?;
    }

    if !watcher.borrow_and_update().starting() {
        return Ok(())
    }

    let mut task = service.into_task(&watcher, params).await?;

    sender.send_if_modified(|state| {
        if state.starting() {
            *state = State::Started;
            true
        } else {
            false
        }
    });

    while watcher.borrow_and_update().started() {
        match task.run(&mut watcher).await {
            TaskNextAction::Continue => {}
            TaskNextAction::Stop => break,
            TaskNextAction::ErrorContinue(error) => {
                tracing::error!("Task iteration failed: {error:?}");
            }
        }
    }

    sender.send_if_modified(|state| {
        if state.stopped() || state.stopping() {
            false
        } else {
            *state = State::Stopping;
            true
        }
    });

    task.shutdown().await
}
