use serde::{Deserialize, Serialize};

use crate::animation::ClipLoader;
use crate::context::AnimationContext;
use crate::state::{StateDescriptor, StateRegistry, StateSpec};

/// Neutral state every layer falls back to.
pub const IDLE: &str = "IDLE";

/// Evaluation tier. Layers are updated in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerPriority {
    Base,
    Additive,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Unique across the composer.
    pub name: String,
    pub priority: LayerPriority,
    /// Always within `[0, 1]`.
    pub weight: f32,
    pub enabled: bool,
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Bones this layer is restricted to, for the renderer's masking. `None` is the full body.
    #[serde(default)]
    pub bone_mask: Option<Vec<String>>,
    /// State to show the instant the layer becomes visible, before its first decision.
    #[serde(default)]
    pub initial_state_hint: Option<String>,
    /// Whether this layer's clips may drive root motion.
    #[serde(default)]
    pub root_motion: bool,
}

impl LayerConfig {
    #[must_use]
    pub fn new(name: &str, priority: LayerPriority) -> Self {
        Self {
            name: name.to_string(),
            priority,
            weight: 1.0,
            enabled: true,
            blend_mode: BlendMode::Normal,
            bone_mask: None,
            initial_state_hint: None,
            root_motion: false,
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.set_weight(weight);
        self
    }

    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    #[must_use]
    pub fn with_bone_mask(mut self, bones: &[&str]) -> Self {
        self.bone_mask = Some(bones.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn with_initial_state(mut self, state: &str) -> Self {
        self.initial_state_hint = Some(state.to_string());
        self
    }

    #[must_use]
    pub fn with_root_motion(mut self) -> Self {
        self.root_motion = true;
        self
    }

    /// Clamps silently into `[0, 1]`; NaN becomes 0.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = if weight.is_nan() {
            0.0
        } else {
            weight.clamp(0.0, 1.0)
        };
    }
}

/// State shared by every layer variant: config, registry and current state.
#[derive(Debug, Clone)]
pub struct LayerCore {
    pub config: LayerConfig,
    pub states: StateRegistry,
    current_state: Option<String>,
    fallback: String,
}

impl LayerCore {
    #[must_use]
    pub fn new(config: LayerConfig) -> Self {
        Self {
            config,
            states: StateRegistry::new(),
            current_state: None,
            fallback: IDLE.to_string(),
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = fallback.to_string();
        self
    }

    /// Loads the layer's states. Always completes; missing clips are logged
    /// and their states become unselectable.
    pub async fn initialize<L: ClipLoader>(&mut self, specs: &[StateSpec], loader: &L) {
        self.states = StateRegistry::load(specs, loader).await;
        log::debug!(
            "Layer '{}' loaded {}/{} states",
            self.config.name,
            self.states.len(),
            specs.len()
        );
    }

    #[must_use]
    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn set_current_state(&mut self, state: Option<String>) {
        self.current_state = state;
    }

    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Maps a decided state onto the registry, falling back to the neutral key.
    ///
    /// The fallback is logged when it is about to be entered, not on every
    /// tick spent in it.
    #[must_use]
    pub fn resolve(&self, wanted: &str) -> Option<String> {
        let resolved = self.states.resolve(wanted, &self.fallback);
        if resolved != Some(wanted) && resolved != self.current_state() {
            match resolved {
                Some(fallback) => log::warn!(
                    "Layer '{}': state '{wanted}' not registered, using '{fallback}'",
                    self.config.name
                ),
                None => log::warn!(
                    "Layer '{}': neither '{wanted}' nor '{}' is registered",
                    self.config.name,
                    self.fallback
                ),
            }
        }
        resolved.map(ToString::to_string)
    }

    /// `Some(target)` only when it differs from the current state.
    #[must_use]
    pub fn settle(&self, target: Option<String>) -> Option<String> {
        target.filter(|t| self.current_state.as_deref() != Some(t.as_str()))
    }
}

/// An independently evaluated animation source composited onto one skeleton.
///
/// Implementors supply the decision function; the composer owns transitions,
/// fades and playback. `update` must be idempotent: with an unchanged context
/// it returns `None` once the current state equals the decided target.
pub trait Layer {
    fn core(&self) -> &LayerCore;

    fn core_mut(&mut self) -> &mut LayerCore;

    /// Decides the target state for this tick; `None` means no change.
    fn update(&mut self, dt: f32, ctx: &AnimationContext) -> Option<String>;

    /// State to show as soon as the layer becomes visible, before any tick.
    fn bootstrap_state(&self) -> Option<String> {
        let core = self.core();
        core.config
            .initial_state_hint
            .as_deref()
            .filter(|hint| core.states.contains(hint))
            .or_else(|| core.states.contains(core.fallback()).then_some(core.fallback()))
            .map(ToString::to_string)
    }

    /// Called for disabled layers each tick. Returning `true` asks the
    /// composer to enable the layer (one-shot triggers).
    fn poll_activation(&mut self, _ctx: &AnimationContext) -> bool {
        false
    }

    /// Polled after `update`; `true` asks the composer to disable the layer.
    fn take_disable_request(&mut self) -> bool {
        false
    }

    /// Polled after `update`; `true` means the returned state must restart
    /// even if it is already current.
    fn take_restart_request(&mut self) -> bool {
        false
    }

    /// Asks the layer to start `state` on its next decision. Only
    /// trigger-driven layers accept this.
    fn trigger(&mut self, _state: &str) -> bool {
        false
    }

    fn on_enable(&mut self) {}

    fn on_disable(&mut self) {}

    fn name(&self) -> &str {
        &self.core().config.name
    }

    fn config(&self) -> &LayerConfig {
        &self.core().config
    }

    fn get_state(&self, name: &str) -> Option<&StateDescriptor> {
        self.core().states.get(name)
    }

    fn all_states(&self) -> &StateRegistry {
        &self.core().states
    }

    fn current_state(&self) -> Option<&str> {
        self.core().current_state()
    }

    fn is_enabled(&self) -> bool {
        self.core().config.enabled
    }

    /// Marks the layer enabled. Fading is the composer's job.
    fn enable(&mut self) {
        self.core_mut().config.enabled = true;
        self.on_enable();
    }

    /// Marks the layer disabled and clears its current state so the next
    /// enable starts clean.
    fn disable(&mut self) {
        let core = self.core_mut();
        core.config.enabled = false;
        core.set_current_state(None);
        self.on_disable();
    }
}
