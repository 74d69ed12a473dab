//! Layer Composer
//!
//! [`LayerComposer`] is the per-character coordinator of the layered
//! animator. It owns every layer, the shared [`AnimationMixer`], one
//! [`TransitionTracker`] per layer and the [`EventBus`].
//!
//! # Tick order
//!
//! Each [`update`](LayerComposer::update):
//!
//! 1. Walks the layers in ascending priority. Disabled layers are only asked
//!    whether they want to activate, and one that does is enabled into its
//!    initial state; enabled layers decide a target state, and a differing
//!    target is crossfaded in.
//! 2. Advances the mixer (fades, warps, weight ramps, playback time).
//! 3. Settles finished transitions and emits `TransitionEnd`.
//! 4. Runs the rate validator over every action.
//!
//! # Example
//!
//! ```rust,ignore
//! use myth_animator::{AnimatorSettings, LayerComposer, LocomotionLayer};
//!
//! let mut locomotion = LocomotionLayer::new("locomotion");
//! locomotion.initialize(&loader).await;
//!
//! let mut composer = LayerComposer::new(AnimatorSettings::default());
//! composer.add_layer(Box::new(locomotion))?;
//!
//! loop {
//!     composer.update(dt, &ctx);
//! }
//! ```

use rustc_hash::FxHashSet;

use crate::animation::{
    ActionHandle, AnimationAction, AnimationMixer, CrossfadeOptions, RateCorrection,
    RateValidator, crossfade, instant_switch,
};
use crate::context::AnimationContext;
use crate::errors::{AnimatorError, Result};
use crate::events::{AnimationEvent, EventBus, EventType, SubscriptionId};
use crate::layers::core::Layer;
use crate::settings::AnimatorSettings;
use crate::state::{
    Transition, TransitionHandle, TransitionOutcome, TransitionPhase, TransitionTracker,
};

/// How [`LayerComposer::enable_layer`] brings a layer in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnableOptions {
    /// Overrides the initial state's fade-in.
    pub fade_duration: Option<f32>,
    /// Re-enters the initial state even if the layer already shows it.
    pub force_refresh: bool,
}

struct LayerSlot {
    layer: Box<dyn Layer>,
    tracker: TransitionTracker,
}

/// Composites prioritized layers onto one character.
pub struct LayerComposer {
    settings: AnimatorSettings,
    /// Stable-sorted by priority; registration order breaks ties.
    slots: Vec<LayerSlot>,
    mixer: AnimationMixer,
    events: EventBus,
    validator: RateValidator,
    last_context: Option<AnimationContext>,
    last_corrections: Vec<RateCorrection>,
    clock: f64,
}

impl LayerComposer {
    #[must_use]
    pub fn new(mut settings: AnimatorSettings) -> Self {
        settings.sanitize();
        Self {
            settings,
            slots: Vec::new(),
            mixer: AnimationMixer::new().with_poll_interval(settings.blend_poll_interval),
            events: EventBus::new(),
            validator: RateValidator::new(settings.validator),
            last_context: None,
            last_corrections: Vec::new(),
            clock: 0.0,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a layer after the existing layers of the same priority.
    ///
    /// If no enabled layer is visible yet, this one is cut straight into its
    /// bootstrap state so the skeleton never shows its bind pose.
    pub fn add_layer(&mut self, layer: Box<dyn Layer>) -> Result<()> {
        if self.index_of(layer.name()).is_some() {
            log::error!("Layer '{}' is already registered", layer.name());
            return Err(AnimatorError::DuplicateLayer(layer.name().to_string()));
        }
        let priority = layer.config().priority;
        let index = self
            .slots
            .iter()
            .position(|s| s.layer.config().priority > priority)
            .unwrap_or(self.slots.len());

        log::debug!("Registered layer '{}' ({priority:?})", layer.name());
        self.slots.insert(
            index,
            LayerSlot {
                layer,
                tracker: TransitionTracker::new(),
            },
        );
        self.bootstrap_if_first(index);
        Ok(())
    }

    /// Unregisters a layer, dropping all of its actions.
    pub fn remove_layer(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let index = self.index_of(name)?;
        for handle in self.mixer.actions_of(name) {
            self.mixer.remove(handle);
        }
        let mut slot = self.slots.remove(index);
        slot.tracker.reset();
        Some(slot.layer)
    }

    fn bootstrap_if_first(&mut self, index: usize) {
        let layer = &self.slots[index].layer;
        if !layer.is_enabled() || layer.current_state().is_some() {
            return;
        }
        let visible = self
            .slots
            .iter()
            .any(|s| s.layer.is_enabled() && s.layer.current_state().is_some());
        if visible {
            return;
        }
        if let Some(state) = layer.bootstrap_state() {
            let _ = self.transition_index(index, &state, Some(0.0), false);
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advances every layer, the mixer and the live transitions by `dt` seconds.
    pub fn update(&mut self, dt: f32, ctx: &AnimationContext) {
        self.last_context = Some(*ctx);

        for index in 0..self.slots.len() {
            if !self.slots[index].layer.is_enabled() {
                if !self.slots[index].layer.poll_activation(ctx) {
                    continue;
                }
                // Enabling already ran this tick's decision.
                self.enable_index(index, EnableOptions::default(), Some(*ctx));
                continue;
            }

            let layer = &mut self.slots[index].layer;
            let target = layer.update(dt, ctx);
            let restart = layer.take_restart_request();
            if let Some(target) = target {
                if restart || layer.current_state() != Some(target.as_str()) {
                    let _ = self.transition_index(index, &target, None, restart);
                }
            }

            if self.slots[index].layer.take_disable_request() {
                self.disable_index(index, None);
            }
        }

        self.mixer.update(dt);
        self.clock += f64::from(dt);

        for slot in &mut self.slots {
            if let Some((finished, _)) = slot.tracker.advance(dt) {
                if finished.to_state.is_none() {
                    slot.tracker.reset();
                }
                self.events.emit(&AnimationEvent::TransitionEnd {
                    layer: finished.track,
                    from: finished.from_state,
                    to: finished.to_state,
                });
            }
        }

        self.last_corrections = self.validator.validate(&mut self.mixer);
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Crossfades a layer into `state` outside of its own decision function.
    ///
    /// `fade` overrides the state's fade-in. The layer's next decision may
    /// move it somewhere else again.
    pub fn transition_layer(
        &mut self,
        layer: &str,
        state: &str,
        fade: Option<f32>,
    ) -> Result<TransitionHandle> {
        let index = self.require(layer)?;
        self.transition_index(index, state, fade, false)
    }

    fn transition_index(
        &mut self,
        index: usize,
        target: &str,
        fade: Option<f32>,
        force: bool,
    ) -> Result<TransitionHandle> {
        let slot = &mut self.slots[index];
        let layer_name = slot.layer.name().to_string();
        let core = slot.layer.core();

        let Some(resolved) = core.states.resolve(target, core.fallback()) else {
            log::warn!("Layer '{layer_name}': cannot enter unknown state '{target}'");
            return Err(AnimatorError::UnknownState {
                layer: layer_name,
                state: target.to_string(),
            });
        };
        if resolved != target {
            log::warn!("Layer '{layer_name}': state '{target}' not registered, using '{resolved}'");
        }
        let Some(descriptor) = core.states.get(resolved).cloned() else {
            return Err(AnimatorError::UnknownState {
                layer: layer_name,
                state: target.to_string(),
            });
        };
        let previous = core.current_state().map(ToString::to_string);
        if !force && previous.as_deref() == Some(descriptor.name.as_str()) {
            return Ok(TransitionHandle::resolved(TransitionOutcome::Immediate));
        }

        let mut duration = fade
            .or(descriptor.fade_in)
            .or_else(|| {
                previous
                    .as_deref()
                    .and_then(|p| core.states.get(p))
                    .and_then(|d| d.fade_out)
            })
            .unwrap_or(self.settings.default_fade_duration)
            .max(0.0);
        let layer_weight = core.config.weight;

        let from = previous
            .as_deref()
            .and_then(|p| self.mixer.existing_action(&layer_name, p));
        let to = descriptor.action_in(&mut self.mixer, &layer_name);
        if let Some(action) = self.mixer.get_mut(to) {
            action.layer_weight = layer_weight;
        }

        if force && from == Some(to) {
            // Restarting the playing state is a cut back to its first frame.
            duration = 0.0;
            instant_switch(&mut self.mixer, None, to, 0.0)?;
        } else {
            let options = CrossfadeOptions {
                match_pose: self.settings.match_pose_on_crossfade,
                ..CrossfadeOptions::default()
            };
            crossfade(&mut self.mixer, from, to, duration, options)?;
        }

        slot.layer
            .core_mut()
            .set_current_state(Some(descriptor.name.clone()));
        log::debug!(
            "Layer '{layer_name}': {} -> {} over {duration}s",
            previous.as_deref().unwrap_or("<none>"),
            descriptor.name
        );

        let (handle, _superseded) = slot.tracker.begin(Transition {
            track: layer_name.clone(),
            from_state: previous.clone(),
            to_state: Some(descriptor.name.clone()),
            start_time: self.clock,
            duration,
            elapsed: 0.0,
            crossfade: from.is_some() && duration > 0.0,
        });
        let settled = !slot.tracker.is_in_transition();

        if let Some(state) = previous.clone() {
            self.events.emit(&AnimationEvent::StateExit {
                layer: layer_name.clone(),
                state,
            });
        }
        self.events.emit(&AnimationEvent::TransitionStart {
            layer: layer_name.clone(),
            from: previous.clone(),
            to: Some(descriptor.name.clone()),
            duration,
        });
        self.events.emit(&AnimationEvent::StateEnter {
            layer: layer_name.clone(),
            state: descriptor.name.clone(),
        });
        if settled {
            self.events.emit(&AnimationEvent::TransitionEnd {
                layer: layer_name,
                from: previous,
                to: Some(descriptor.name),
            });
        }
        Ok(handle)
    }

    // ========================================================================
    // Enable / Disable
    // ========================================================================

    /// Enables a layer and immediately crossfades it into its initial state.
    ///
    /// With a context from a previous tick the initial state is the layer's
    /// own decision; before the first tick it is the layer's bootstrap state.
    pub fn enable_layer(&mut self, name: &str, options: EnableOptions) -> Result<()> {
        let index = self.require(name)?;
        self.enable_index(index, options, self.last_context);
        Ok(())
    }

    fn enable_index(
        &mut self,
        index: usize,
        options: EnableOptions,
        ctx: Option<AnimationContext>,
    ) {
        let layer = &mut self.slots[index].layer;
        let was_enabled = layer.is_enabled();
        if was_enabled && !options.force_refresh {
            return;
        }
        if !was_enabled {
            layer.enable();
            log::debug!("Layer '{}' enabled", layer.name());
        }
        let layer_name = layer.name().to_string();
        let weight = layer.config().weight;
        for handle in self.mixer.actions_of(&layer_name) {
            if let Some(action) = self.mixer.get_mut(handle) {
                action.layer_weight = weight;
            }
        }
        if !was_enabled {
            self.events
                .emit(&AnimationEvent::LayerEnabled { layer: layer_name });
        }

        let layer = &mut self.slots[index].layer;
        let decided = ctx.and_then(|c| layer.update(0.0, &c));
        let restart = layer.take_restart_request();
        let initial = decided.or_else(|| {
            if options.force_refresh {
                layer
                    .current_state()
                    .map(ToString::to_string)
                    .or_else(|| layer.bootstrap_state())
            } else if layer.current_state().is_none() {
                layer.bootstrap_state()
            } else {
                None
            }
        });

        if let Some(state) = initial {
            let force = options.force_refresh || restart;
            let _ = self.transition_index(index, &state, options.fade_duration, force);
        }
    }

    /// Fades a layer out and marks it disabled. Its current state is cleared
    /// at once; its actions stop when their fade-out completes.
    pub fn disable_layer(&mut self, name: &str, fade_out: Option<f32>) -> Result<()> {
        let index = self.require(name)?;
        self.disable_index(index, fade_out);
        Ok(())
    }

    fn disable_index(&mut self, index: usize, fade_out: Option<f32>) {
        let slot = &mut self.slots[index];
        let layer_name = slot.layer.name().to_string();
        let was_enabled = slot.layer.is_enabled();
        let previous = slot.layer.current_state().map(ToString::to_string);

        let duration = fade_out
            .or_else(|| {
                previous
                    .as_deref()
                    .and_then(|p| slot.layer.get_state(p))
                    .and_then(|d| d.fade_out)
            })
            .unwrap_or(self.settings.default_fade_duration)
            .max(0.0);

        let scheduled = self.mixer.scheduled_actions_of(&layer_name);
        for &handle in &scheduled {
            self.mixer.cancel_ramps_for(handle);
            if let Some(action) = self.mixer.get_mut(handle) {
                if duration > 0.0 {
                    action.fade_out(duration);
                } else {
                    action.stop();
                }
            }
        }

        slot.layer.disable();
        if !was_enabled && scheduled.is_empty() {
            return;
        }
        log::debug!("Layer '{layer_name}' disabled over {duration}s");

        let (_handle, _superseded) = slot.tracker.begin(Transition {
            track: layer_name.clone(),
            from_state: previous.clone(),
            to_state: None,
            start_time: self.clock,
            duration,
            elapsed: 0.0,
            crossfade: false,
        });
        let settled = !slot.tracker.is_in_transition();
        if settled {
            slot.tracker.reset();
        }

        if let Some(state) = previous.clone() {
            self.events.emit(&AnimationEvent::StateExit {
                layer: layer_name.clone(),
                state,
            });
        }
        self.events.emit(&AnimationEvent::TransitionStart {
            layer: layer_name.clone(),
            from: previous.clone(),
            to: None,
            duration,
        });
        if settled {
            self.events.emit(&AnimationEvent::TransitionEnd {
                layer: layer_name.clone(),
                from: previous,
                to: None,
            });
        }
        if was_enabled {
            self.events
                .emit(&AnimationEvent::LayerDisabled { layer: layer_name });
        }
    }

    /// Sets a layer's weight, clamped into `[0, 1]`, and applies it to the
    /// layer's actions right away.
    pub fn set_layer_weight(&mut self, name: &str, weight: f32) -> Result<()> {
        let index = self.require(name)?;
        let config = &mut self.slots[index].layer.core_mut().config;
        config.set_weight(weight);
        let weight = config.weight;
        for handle in self.mixer.actions_of(name) {
            if let Some(action) = self.mixer.get_mut(handle) {
                action.layer_weight = weight;
            }
        }
        Ok(())
    }

    /// Queues a one-shot on a trigger-driven layer and enables it at once.
    pub fn play_one_shot(&mut self, layer: &str, state: &str) -> Result<()> {
        let index = self.require(layer)?;
        if !self.slots[index].layer.trigger(state) {
            return Err(AnimatorError::UnknownState {
                layer: layer.to_string(),
                state: state.to_string(),
            });
        }
        let ctx = self.last_context.unwrap_or_default();
        if self.slots[index].layer.is_enabled() {
            let slot = &mut self.slots[index].layer;
            if let Some(target) = slot.update(0.0, &ctx) {
                let restart = slot.take_restart_request();
                self.transition_index(index, &target, None, restart)?;
            }
        } else {
            self.enable_index(index, EnableOptions::default(), Some(ctx));
        }
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn subscribe(
        &mut self,
        event_type: EventType,
        listener: impl FnMut(&AnimationEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(event_type, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn settings(&self) -> &AnimatorSettings {
        &self.settings
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Layer names in evaluation order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.layer.name()).collect()
    }

    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&dyn Layer> {
        self.index_of(name).map(|i| self.slots[i].layer.as_ref())
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut (dyn Layer + 'static)> {
        let index = self.index_of(name)?;
        Some(self.slots[index].layer.as_mut())
    }

    #[must_use]
    pub fn current_state(&self, layer: &str) -> Option<&str> {
        self.layer(layer).and_then(|l| l.current_state())
    }

    #[must_use]
    pub fn is_layer_enabled(&self, layer: &str) -> bool {
        self.layer(layer).is_some_and(|l| l.is_enabled())
    }

    #[must_use]
    pub fn is_layer_in_transition(&self, layer: &str) -> bool {
        self.index_of(layer)
            .is_some_and(|i| self.slots[i].tracker.is_in_transition())
    }

    #[must_use]
    pub fn layer_phase(&self, layer: &str) -> Option<TransitionPhase> {
        self.index_of(layer).map(|i| self.slots[i].tracker.phase())
    }

    #[must_use]
    pub fn active_transition(&self, layer: &str) -> Option<&Transition> {
        self.index_of(layer)
            .and_then(|i| self.slots[i].tracker.active())
    }

    /// Handle of the action a layer uses for `state`, once it has played.
    #[must_use]
    pub fn layer_action_handle(&self, layer: &str, state: &str) -> Option<ActionHandle> {
        self.mixer.existing_action(layer, state)
    }

    #[must_use]
    pub fn layer_action(&self, layer: &str, state: &str) -> Option<&AnimationAction> {
        self.layer_action_handle(layer, state)
            .and_then(|h| self.mixer.get(h))
    }

    /// The single layer allowed to drive root motion: the highest-priority
    /// enabled, visible layer configured for it.
    #[must_use]
    pub fn root_motion_owner(&self) -> Option<&str> {
        self.slots
            .iter()
            .rev()
            .map(|s| s.layer.as_ref())
            .find(|l| l.is_enabled() && l.config().root_motion && l.current_state().is_some())
            .map(|l| l.name())
    }

    /// The action whose clip drives root motion this tick.
    #[must_use]
    pub fn root_motion_action(&self) -> Option<ActionHandle> {
        let owner = self.root_motion_owner()?;
        let state = self.current_state(owner)?;
        self.layer_action_handle(owner, state)
    }

    /// Names of layers currently contributing weight to the pose.
    #[must_use]
    pub fn active_layers(&self) -> FxHashSet<&str> {
        self.mixer
            .iter()
            .filter(|(_, _, action)| action.effective_weight() > 0.0)
            .filter_map(|(_, key, _)| {
                self.slots
                    .iter()
                    .find(|s| s.layer.name() == key.owner)
                    .map(|s| s.layer.name())
            })
            .collect()
    }

    #[must_use]
    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut AnimationMixer {
        &mut self.mixer
    }

    /// Rate corrections applied during the last tick.
    #[must_use]
    pub fn last_corrections(&self) -> &[RateCorrection] {
        &self.last_corrections
    }

    #[must_use]
    pub fn total_corrections(&self) -> u64 {
        self.validator.total_corrections()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.layer.name() == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| {
            log::warn!("Unknown layer '{name}'");
            AnimatorError::UnknownLayer(name.to_string())
        })
    }
}

impl std::fmt::Debug for LayerComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerComposer")
            .field("layers", &self.layer_names())
            .field("actions", &self.mixer.iter().count())
            .field("time", &self.clock)
            .finish_non_exhaustive()
    }
}
