//! Core state machine implementation
//!
//! A [`StateGraph`] is built once (states plus their rules) and then handed
//! to a [`StateMachine`], which only ever mutates its current [`StateId`].

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

/// Side effect run when a rule fires. A failing action aborts the transition.
pub type Action<C, E> = fn(&mut C) -> Result<(), E>;

/// Callback told the name of the state a rule just moved to.
pub type Notification<C> = fn(&C, &str);

/// A named trigger with no payload; two events are equal when their names are
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    name: Cow<'static, str>,
}

impl Event {
    /// Create an event from a static name
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// Create an event from a runtime name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Index of a state inside the [`StateGraph`] that minted it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(usize);

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors that can occur while building or driving a state machine
#[derive(Debug, thiserror::Error)]
pub enum FsmError<E> {
    #[error("no rule for event `{event}` in state `{state}`")]
    UnhandledEvent { state: String, event: String },

    #[error(transparent)]
    Action(E),

    #[error("state {0} does not belong to this graph")]
    UnknownState(StateId),
}

/// A transition: on `event`, run the optional action, notify, move to `target`
pub struct Rule<C, E> {
    event: Event,
    action: Option<Action<C, E>>,
    notification: Option<Notification<C>>,
    target: StateId,
}

impl<C, E> Rule<C, E> {
    /// Create a rule with neither action nor notification
    pub fn new(event: Event, target: StateId) -> Self {
        Self {
            event,
            action: None,
            notification: None,
            target,
        }
    }

    pub fn with_action(mut self, action: Action<C, E>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_notification(mut self, notification: Notification<C>) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    /// Run the action, then the notification with the target's name
    fn apply(&self, ctx: &mut C, target_name: &str) -> Result<StateId, E> {
        if let Some(action) = self.action {
            action(ctx)?;
        }

        if let Some(notification) = self.notification {
            notification(ctx, target_name);
        }

        Ok(self.target)
    }
}

/// A named state and the rules it reacts to, keyed by event name
pub struct State<C, E> {
    name: Cow<'static, str>,
    rules: HashMap<Cow<'static, str>, Rule<C, E>>,
}

impl<C, E> State<C, E> {
    fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            rules: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a rule under its event name.
    ///
    /// A second rule for the same event replaces the first; the replaced rule
    /// is returned.
    pub fn add_rule(&mut self, rule: Rule<C, E>) -> Option<Rule<C, E>> {
        self.rules.insert(rule.event.name.clone(), rule)
    }

    /// Look up the rule registered for `event`
    pub fn rule(&self, event: &Event) -> Option<&Rule<C, E>> {
        self.rules.get(event.name())
    }

    /// Check if this state has a rule for `event`
    pub fn handles(&self, event: &Event) -> bool {
        self.rules.contains_key(event.name())
    }
}

impl<C, E> std::fmt::Display for State<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Arena of states. Rules refer to their targets by [`StateId`].
pub struct StateGraph<C, E> {
    states: Vec<State<C, E>>,
}

impl<C, E> Default for StateGraph<C, E> {
    fn default() -> Self {
        Self { states: Vec::new() }
    }
}

impl<C, E> StateGraph<C, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state with no rules and return its id
    pub fn add_state(&mut self, name: impl Into<Cow<'static, str>>) -> StateId {
        self.states.push(State::new(name.into()));
        StateId(self.states.len() - 1)
    }

    /// Register `rule` on state `from`.
    ///
    /// Both `from` and the rule's target must belong to this graph. Returns
    /// the rule previously registered for the same event, if any.
    pub fn add_rule(
        &mut self,
        from: StateId,
        rule: Rule<C, E>,
    ) -> Result<Option<Rule<C, E>>, FsmError<E>> {
        if self.state(rule.target).is_none() {
            return Err(FsmError::UnknownState(rule.target));
        }

        let state = self
            .states
            .get_mut(from.0)
            .ok_or(FsmError::UnknownState(from))?;

        Ok(state.add_rule(rule))
    }

    pub fn state(&self, id: StateId) -> Option<&State<C, E>> {
        self.states.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Resolve the rule for `event` in state `from` and apply it.
    ///
    /// Returns the target state. The graph itself is never modified, so the
    /// same `(from, event)` pair always resolves to the same target.
    pub fn on_event(
        &self,
        from: StateId,
        event: &Event,
        ctx: &mut C,
    ) -> Result<StateId, FsmError<E>> {
        let state = self.state(from).ok_or(FsmError::UnknownState(from))?;

        let rule = state.rule(event).ok_or_else(|| FsmError::UnhandledEvent {
            state: state.name().to_string(),
            event: event.name().to_string(),
        })?;

        let target = self
            .state(rule.target)
            .ok_or(FsmError::UnknownState(rule.target))?;

        rule.apply(ctx, target.name()).map_err(FsmError::Action)
    }
}

/// Drives a [`StateGraph`] from an initial state.
///
/// Takes `&mut self` to dispatch, so callers sharing a machine across threads
/// must serialize access themselves.
pub struct StateMachine<C, E> {
    graph: StateGraph<C, E>,
    current: StateId,
}

impl<C, E> StateMachine<C, E> {
    /// Create a state machine positioned at `initial`
    pub fn new(graph: StateGraph<C, E>, initial: StateId) -> Result<Self, FsmError<E>> {
        if graph.state(initial).is_none() {
            return Err(FsmError::UnknownState(initial));
        }

        Ok(Self {
            graph,
            current: initial,
        })
    }

    /// Get the current state
    pub fn current(&self) -> StateId {
        self.current
    }

    /// Get the name of the current state
    pub fn current_name(&self) -> &str {
        // `current` is only ever set from ids validated against `graph`.
        self.graph.states[self.current.0].name()
    }

    pub fn graph(&self) -> &StateGraph<C, E> {
        &self.graph
    }

    /// Apply `event` to the current state and commit the result.
    ///
    /// On error the current state is left untouched.
    pub fn on_event(&mut self, event: &Event, ctx: &mut C) -> Result<StateId, FsmError<E>> {
        let next = self.graph.on_event(self.current, event, ctx)?;

        debug!(
            from = %self.current_name(),
            to = %self.graph.states[next.0].name(),
            %event,
            "state transition"
        );

        self.current = next;
        Ok(next)
    }
}
