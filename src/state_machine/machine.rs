//! [`StateMachine`] and [`StateMachineBuilder`]: the polled, event-aware FSM.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::component::{Component, ComponentCore, PublisherComponent, SubscriberComponent};
use crate::event::{Event, EventType};

use super::types::{OnEventHook, StateHandler, StateHandlerSpec, StateMachineError, StateOutcome};

const DEFAULT_MAX_CONSECUTIVE_ERRORS: usize = 5;
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(100);
const ERROR_STATE: &str = "error";

struct StateMachineState {
    core: ComponentCore,
    current_state: RwLock<Option<String>>,
    previous_state: RwLock<Option<String>>,
    state_handlers: RwLock<HashMap<String, StateHandlerSpec>>,
    transition_map: RwLock<HashMap<String, HashSet<String>>>,
    initial_state: RwLock<Option<String>>,
    state_start_time: RwLock<Instant>,
    current_event: Mutex<Option<Event>>,
    consecutive_errors: AtomicUsize,
    max_consecutive_errors: usize,
    running: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    poll_overrides: RwLock<HashMap<String, Duration>>,
    state_change_event: Option<EventType>,
    on_event: Option<OnEventHook>,
}

/// A polled, event-aware finite-state machine.
///
/// Assembled via [`StateMachineBuilder`] rather than method annotations,
/// since Rust has no runtime reflection over decorated methods. Cheaply
/// `Clone`-able (an `Arc` handle internally), so the running loop can hold
/// its own owned reference independent of the value returned to callers.
#[derive(Clone)]
pub struct StateMachine(Arc<StateMachineState>);

impl StateMachine {
    /// The state currently active, if the machine has been started at
    /// least once.
    pub fn current_state(&self) -> Option<String> {
        self.0.current_state.read().clone()
    }

    /// The state active immediately before the current one.
    pub fn previous_state(&self) -> Option<String> {
        self.0.previous_state.read().clone()
    }

    /// How long the machine has been in its current state. Zero if there
    /// is no current state.
    pub fn state_uptime(&self) -> Duration {
        if self.0.current_state.read().is_none() {
            return Duration::ZERO;
        }
        self.0.state_start_time.read().elapsed()
    }

    /// The set of all registered state names.
    pub fn available_states(&self) -> HashSet<String> {
        self.0.state_handlers.read().keys().cloned().collect()
    }

    /// Whether the run loop is currently active.
    pub fn is_running(&self) -> bool {
        if !self.0.running.load(Ordering::SeqCst) {
            return false;
        }
        match self.0.task.lock().as_ref() {
            Some(task) => !task.is_finished(),
            None => false,
        }
    }

    fn is_valid_transition(&self, from: &str, to: &str) -> bool {
        let map = self.0.transition_map.read();
        if map.is_empty() {
            return true;
        }
        map.get(from).is_some_and(|allowed| allowed.contains(to))
    }

    /// Attempts to move from the current state to `target`.
    ///
    /// Returns `false` (and logs) if `target` has no registered handler, or
    /// if a transition map is configured and does not allow this move. On
    /// success, publishes a state-change event if one was configured.
    pub async fn transition_to(&self, target: impl Into<String>) -> bool {
        let target = target.into();
        if !self.0.state_handlers.read().contains_key(&target) {
            tracing::warn!(target = %target, "Unknown state: {target}");
            return false;
        }
        let previous = self.0.current_state.read().clone();
        if let Some(from) = &previous {
            if !self.is_valid_transition(from, &target) {
                tracing::warn!(from = %from, to = %target, "Invalid transition from {from} to {target}");
                return false;
            }
        }

        *self.0.previous_state.write() = previous.clone();
        *self.0.current_state.write() = Some(target.clone());
        *self.0.state_start_time.write() = Instant::now();

        if let Some(tag) = self.0.state_change_event {
            let payload = [
                ("current_state".to_string(), json!(target)),
                ("previous_state".to_string(), json!(previous)),
                ("uptime".to_string(), json!(0.0)),
            ]
            .into_iter()
            .collect();
            self.publish(Event::new(tag, self.core().type_name(), payload))
                .await;
        }
        true
    }

    /// Overrides the poll interval for `state` at runtime. Takes priority
    /// over the builder-supplied default for that state.
    pub fn set_poll_interval(&self, state: impl Into<String>, interval: Duration) {
        self.0.poll_overrides.write().insert(state.into(), interval);
    }

    /// Resolves the poll interval for `state`: a runtime override, else the
    /// state's builder-supplied default, else a 100ms fallback.
    pub fn get_poll_interval(&self, state: &str) -> Duration {
        if let Some(interval) = self.0.poll_overrides.read().get(state) {
            return *interval;
        }
        if let Some(spec) = self.0.state_handlers.read().get(state) {
            if let Some(interval) = spec.default_poll_interval {
                return interval;
            }
        }
        FALLBACK_POLL_INTERVAL
    }

    /// Starts the run loop as a background task.
    ///
    /// Returns `false` (and logs) if no initial state was configured, or if
    /// the machine is already running.
    pub async fn start(&self) -> bool {
        if self.0.initial_state.read().is_none() {
            tracing::warn!("No initial state defined");
            return false;
        }
        if self.is_running() {
            tracing::warn!("already running");
            return false;
        }

        *self.0.current_state.write() = self.0.initial_state.read().clone();
        *self.0.state_start_time.write() = Instant::now();
        self.0.running.store(true, Ordering::SeqCst);

        let handle = self.clone();
        let task = tokio::spawn(async move { handle.run_loop().await });
        *self.0.task.lock() = Some(task);
        true
    }

    /// Stops the run loop. Safe to call when not running.
    pub async fn stop(&self) {
        self.0.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.0.task.lock().take() {
            task.abort();
        }
    }

    /// Stops (if running) then starts the machine again, resetting the
    /// consecutive-error count.
    pub async fn restart(&self) {
        if self.is_running() {
            self.stop().await;
        }
        self.0.consecutive_errors.store(0, Ordering::SeqCst);
        self.start().await;
    }

    async fn run_loop(&self) {
        while self.0.running.load(Ordering::SeqCst) {
            let Some(state) = self.0.current_state.read().clone() else {
                break;
            };
            let handler = self.0.state_handlers.read().get(&state).map(|spec| spec.handler.clone());
            let Some(handler) = handler else {
                break;
            };

            let event = self.0.current_event.lock().take();
            let outcome = handler(event).await;

            let mut transitioned = false;
            match outcome {
                Ok(StateOutcome::Stay) => {
                    self.0.consecutive_errors.store(0, Ordering::SeqCst);
                }
                Ok(StateOutcome::Stop) => {
                    self.0.consecutive_errors.store(0, Ordering::SeqCst);
                    self.0.running.store(false, Ordering::SeqCst);
                    break;
                }
                Ok(StateOutcome::Transition(next)) => {
                    self.0.consecutive_errors.store(0, Ordering::SeqCst);
                    if next != state {
                        transitioned = self.transition_to(next).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(state = %state, error = %err, "State machine error in {state}: {err}");
                    let errors = self.0.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
                    if self.0.state_handlers.read().contains_key(ERROR_STATE) && state != ERROR_STATE
                    {
                        transitioned = self.transition_to(ERROR_STATE).await;
                    }
                    if errors >= self.0.max_consecutive_errors {
                        tracing::error!("Too many consecutive errors, stopping state machine");
                        self.0.running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }

            if !transitioned {
                tokio::time::sleep(self.get_poll_interval(&state)).await;
            }
        }
    }
}

impl Component for StateMachine {
    fn core(&self) -> &ComponentCore {
        &self.0.core
    }
}

#[async_trait]
impl PublisherComponent for StateMachine {}

#[async_trait]
impl SubscriberComponent for StateMachine {
    /// Stashes `event` as the machine's current event for the run loop's
    /// next iteration, then calls the builder-configured `on_event` hook, if
    /// any. This is the explicit-wrapper replacement for the original's
    /// monkey-patched `handle_event`.
    async fn handle_event(&self, event: Event) {
        *self.0.current_event.lock() = Some(event.clone());
        if let Some(hook) = &self.0.on_event {
            hook(event).await;
        }
    }
}

/// Fluent builder assembling a [`StateMachine`].
pub struct StateMachineBuilder {
    type_name: &'static str,
    handlers: HashMap<String, StateHandlerSpec>,
    transitions: HashMap<String, HashSet<String>>,
    initial_state: Option<String>,
    max_consecutive_errors: usize,
    state_change_event: Option<EventType>,
    on_event: Option<OnEventHook>,
}

impl StateMachineBuilder {
    /// Starts a builder for a machine of the given declared type name.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            handlers: HashMap::new(),
            transitions: HashMap::new(),
            initial_state: None,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            state_change_event: None,
            on_event: None,
        }
    }

    /// Sets the state the machine enters on `start()`.
    pub fn initial_state(mut self, name: impl Into<String>) -> Self {
        self.initial_state = Some(name.into());
        self
    }

    /// Registers a state handler with no builder-supplied poll default.
    pub fn state(
        self,
        name: impl Into<String>,
        handler: impl Fn(Option<Event>) -> BoxFuture<'static, Result<StateOutcome, StateMachineError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.state_with_spec(name, handler, None)
    }

    /// Registers a state handler along with its default poll interval.
    pub fn state_with_poll(
        self,
        name: impl Into<String>,
        handler: impl Fn(Option<Event>) -> BoxFuture<'static, Result<StateOutcome, StateMachineError>>
            + Send
            + Sync
            + 'static,
        interval: Duration,
    ) -> Self {
        self.state_with_spec(name, handler, Some(interval))
    }

    fn state_with_spec(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(Option<Event>) -> BoxFuture<'static, Result<StateOutcome, StateMachineError>>
            + Send
            + Sync
            + 'static,
        default_poll_interval: Option<Duration>,
    ) -> Self {
        self.handlers.insert(
            name.into(),
            StateHandlerSpec {
                handler: Arc::new(handler) as StateHandler,
                default_poll_interval,
            },
        );
        self
    }

    /// Sets the transition map: `from -> [allowed successors]`. An empty or
    /// never-called map leaves all transitions valid.
    pub fn transitions<const N: usize>(mut self, map: [(&str, Vec<&str>); N]) -> Self {
        self.transitions = map
            .into_iter()
            .map(|(from, tos)| (from.to_string(), tos.into_iter().map(str::to_string).collect()))
            .collect();
        self
    }

    /// Overrides the consecutive-error threshold (default: 5).
    pub fn max_consecutive_errors(mut self, n: usize) -> Self {
        self.max_consecutive_errors = n;
        self
    }

    /// Configures a tag to publish a state-change event under whenever
    /// `transition_to` succeeds.
    pub fn state_change_event(mut self, tag: EventType) -> Self {
        self.state_change_event = Some(tag);
        self
    }

    /// Registers a hook called with every event delivered to this machine,
    /// after `current_event` is set but before the run loop consumes it on
    /// its next iteration. Default: no hook.
    pub fn on_event(
        mut self,
        hook: impl Fn(Event) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(hook));
        self
    }

    /// Validates and builds the machine.
    ///
    /// Fails if an initial state was configured but has no matching
    /// handler.
    pub fn build(self) -> Result<StateMachine, StateMachineError> {
        if let Some(initial) = &self.initial_state {
            if !self.handlers.contains_key(initial) {
                return Err(StateMachineError::UnknownState(initial.clone()));
            }
        }
        Ok(StateMachine(Arc::new(StateMachineState {
            core: ComponentCore::new(self.type_name),
            current_state: RwLock::new(None),
            previous_state: RwLock::new(None),
            state_handlers: RwLock::new(self.handlers),
            transition_map: RwLock::new(self.transitions),
            initial_state: RwLock::new(self.initial_state),
            state_start_time: RwLock::new(Instant::now()),
            current_event: Mutex::new(None),
            consecutive_errors: AtomicUsize::new(0),
            max_consecutive_errors: self.max_consecutive_errors,
            running: AtomicBool::new(false),
            task: Mutex::new(None),
            poll_overrides: RwLock::new(HashMap::new()),
            state_change_event: self.state_change_event,
            on_event: self.on_event,
        })))
    }
}
