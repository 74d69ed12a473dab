use std::fmt;

use crate::animation::{
    ActionHandle, AnimationMixer, ClipLoader, CrossfadeOptions, RateCorrection, RateValidator,
    crossfade, instant_switch,
};
use crate::context::AnimationContext;
use crate::errors::{AnimatorError, Result};
use crate::settings::AnimatorSettings;
use crate::state::registry::{StateDescriptor, StateRegistry, StateSpec};
use crate::state::transition::{
    Transition, TransitionHandle, TransitionOutcome, TransitionPhase, TransitionTracker,
};

type Condition = Box<dyn Fn(&AnimationContext) -> bool>;
type Callback = Box<dyn FnMut()>;

/// Declarative transition evaluated once per tick by [`StateMachine::update`].
pub struct TransitionRule {
    /// Source state; `None` matches any state.
    pub from: Option<String>,
    pub to: String,
    /// Fade length; `None` uses the target's fade-in or the default.
    pub duration: Option<f32>,
    condition: Condition,
    on_start: Option<Callback>,
    on_complete: Option<Callback>,
}

impl TransitionRule {
    pub fn new(
        from: &str,
        to: &str,
        condition: impl Fn(&AnimationContext) -> bool + 'static,
    ) -> Self {
        Self {
            from: Some(from.to_string()),
            to: to.to_string(),
            duration: None,
            condition: Box::new(condition),
            on_start: None,
            on_complete: None,
        }
    }

    /// A rule that may fire from whatever state is current.
    pub fn from_any(to: &str, condition: impl Fn(&AnimationContext) -> bool + 'static) -> Self {
        Self {
            from: None,
            ..Self::new("", to, condition)
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = Some(duration.max(0.0));
        self
    }

    #[must_use]
    pub fn on_start(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    /// Runs when the fade finishes, unless a later transition superseded it.
    #[must_use]
    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    fn matches(&self, current: Option<&str>, ctx: &AnimationContext) -> bool {
        if current == Some(self.to.as_str()) {
            return false;
        }
        let from_ok = match &self.from {
            None => true,
            Some(from) => current == Some(from.as_str()),
        };
        from_ok && (self.condition)(ctx)
    }
}

impl fmt::Debug for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRule")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

/// Options for [`StateMachine::transition_to`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransitionRequest {
    /// Fade length; `None` uses the target's fade-in or the default.
    pub duration: Option<f32>,
    /// Restart the target even if it is already current.
    pub force: bool,
    pub crossfade: CrossfadeOptions,
}

impl TransitionRequest {
    #[must_use]
    pub fn with_duration(duration: f32) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }
}

/// Single-track animation state machine.
///
/// Used where full layering is overkill: one mixer track, named states,
/// explicit transitions plus optional declarative rules.
pub struct StateMachine {
    name: String,
    settings: AnimatorSettings,
    mixer: AnimationMixer,
    states: StateRegistry,
    rules: Vec<TransitionRule>,
    current: Option<String>,
    tracker: TransitionTracker,
    /// Rule index awaiting `on_complete`, tagged with its transition generation.
    pending_rule: Option<(usize, u64)>,
    validator: RateValidator,
    last_corrections: Vec<RateCorrection>,
    clock: f64,
}

impl StateMachine {
    #[must_use]
    pub fn new(name: &str, settings: AnimatorSettings) -> Self {
        Self {
            name: name.to_string(),
            settings,
            mixer: AnimationMixer::new().with_poll_interval(settings.blend_poll_interval),
            states: StateRegistry::new(),
            rules: Vec::new(),
            current: None,
            tracker: TransitionTracker::new(),
            pending_rule: None,
            validator: RateValidator::new(settings.validator),
            last_corrections: Vec::new(),
            clock: 0.0,
        }
    }

    /// Loads the state table. Missing clips only make their state unselectable.
    pub async fn initialize<L: ClipLoader>(&mut self, specs: &[StateSpec], loader: &L) {
        let registry = StateRegistry::load(specs, loader).await;
        for descriptor in registry.iter() {
            self.states.insert(descriptor.clone());
        }
        for spec in specs {
            if registry.is_unavailable(&spec.name) {
                self.states.mark_unavailable(&spec.name);
            }
        }
    }

    pub fn add_state(&mut self, descriptor: StateDescriptor) {
        self.states.insert(descriptor);
    }

    /// Appends a rule. Rules are evaluated in registration order.
    pub fn add_rule(&mut self, rule: TransitionRule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    #[must_use]
    pub fn is_in_transition(&self) -> bool {
        self.tracker.is_in_transition()
    }

    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        self.tracker.phase()
    }

    #[must_use]
    pub fn active_transition(&self) -> Option<&Transition> {
        self.tracker.active()
    }

    #[must_use]
    pub fn get_state(&self, name: &str) -> Option<&StateDescriptor> {
        self.states.get(name)
    }

    #[must_use]
    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    #[must_use]
    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut AnimationMixer {
        &mut self.mixer
    }

    #[must_use]
    pub fn state_action(&self, name: &str) -> Option<ActionHandle> {
        self.mixer.existing_action(&self.name, name)
    }

    /// Rate repairs made during the last [`update`](Self::update).
    #[must_use]
    pub fn last_corrections(&self) -> &[RateCorrection] {
        &self.last_corrections
    }

    /// Seconds advanced through [`update`](Self::update).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock
    }

    fn unknown_state(&self, name: &str) -> AnimatorError {
        log::warn!("State machine '{}': unknown state '{name}'", self.name);
        AnimatorError::UnknownState {
            layer: self.name.clone(),
            state: name.to_string(),
        }
    }

    /// Crossfades to `name`. The handle resolves once the fade has elapsed.
    ///
    /// Requesting the current state without `force` succeeds without doing
    /// anything. Unknown states fail and leave the current state untouched.
    pub fn transition_to(
        &mut self,
        name: &str,
        request: TransitionRequest,
    ) -> Result<TransitionHandle> {
        let Some(descriptor) = self.states.get(name) else {
            return Err(self.unknown_state(name));
        };
        if !request.force && self.current.as_deref() == Some(name) {
            return Ok(TransitionHandle::resolved(TransitionOutcome::Immediate));
        }

        let duration = request
            .duration
            .or(descriptor.fade_in)
            .unwrap_or(self.settings.default_fade_duration)
            .max(0.0);
        let to = descriptor.action_in(&mut self.mixer, &self.name);
        let from = self
            .current
            .as_deref()
            .and_then(|c| self.mixer.existing_action(&self.name, c));

        crossfade(&mut self.mixer, from, to, duration, request.crossfade)?;

        let previous = self.current.replace(name.to_string());
        log::debug!(
            "State machine '{}': {} -> {name} over {duration}s",
            self.name,
            previous.as_deref().unwrap_or("<none>")
        );
        let (handle, superseded) = self.tracker.begin(Transition {
            track: self.name.clone(),
            from_state: previous,
            to_state: Some(name.to_string()),
            start_time: self.clock,
            duration,
            elapsed: 0.0,
            crossfade: duration > 0.0,
        });
        if superseded.is_some() {
            self.pending_rule = None;
        }
        Ok(handle)
    }

    /// Stops everything and plays `name` at full weight with no fade.
    ///
    /// Meant for resets, e.g. before the first tick so the default pose is
    /// never shown.
    pub fn instant_transition_to(&mut self, name: &str) -> Result<()> {
        let Some(descriptor) = self.states.get(name) else {
            return Err(self.unknown_state(name));
        };
        let to = descriptor.action_in(&mut self.mixer, &self.name);
        self.mixer.stop_all();
        instant_switch(&mut self.mixer, None, to, 0.0)?;

        self.tracker.supersede();
        self.pending_rule = None;
        self.current = Some(name.to_string());
        Ok(())
    }

    fn evaluate_rules(&mut self, ctx: &AnimationContext) {
        let current = self.current.as_deref();
        let Some(index) = self.rules.iter().position(|r| r.matches(current, ctx)) else {
            return;
        };

        let to = self.rules[index].to.clone();
        let request = TransitionRequest {
            duration: self.rules[index].duration,
            ..TransitionRequest::default()
        };
        match self.transition_to(&to, request) {
            Ok(_handle) => {
                if let Some(on_start) = self.rules[index].on_start.as_mut() {
                    on_start();
                }
                if self.tracker.is_in_transition() {
                    self.pending_rule = Some((index, self.tracker.generation()));
                } else if let Some(on_complete) = self.rules[index].on_complete.as_mut() {
                    on_complete();
                }
            }
            Err(err) => log::warn!("State machine '{}': rule skipped: {err}", self.name),
        }
    }

    /// Advances the machine by `dt` seconds.
    ///
    /// At most one rule fires per tick: the first one, in registration
    /// order, whose source and condition match.
    pub fn update(&mut self, dt: f32, ctx: &AnimationContext) {
        self.evaluate_rules(ctx);

        self.mixer.update(dt);
        self.clock += f64::from(dt);

        if let Some((_, generation)) = self.tracker.advance(dt) {
            if let Some((index, pending)) = self.pending_rule.take() {
                if pending == generation {
                    if let Some(on_complete) = self.rules[index].on_complete.as_mut() {
                        on_complete();
                    }
                }
            }
        }

        self.last_corrections = self.validator.validate(&mut self.mixer);
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name)
            .field("current", &self.current)
            .field("phase", &self.tracker.phase())
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
