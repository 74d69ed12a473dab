use crate::animation::ClipLoader;
use crate::context::AnimationContext;
use crate::layers::core::{Layer, LayerConfig, LayerCore, LayerPriority};
use crate::state::StateSpec;

pub const SHOOT: &str = "SHOOT";
pub const RELOAD: &str = "RELOAD";

/// Time-bounded, non-looping actions such as firing or reloading.
///
/// A rising edge on `is_shooting` / `is_reloading` (or an explicit
/// [`trigger`](Self::trigger)) starts the action and enables the layer. Once
/// the clip's playback time has elapsed the layer asks the composer to
/// disable it, which clears its state.
#[derive(Debug, Clone)]
pub struct OneShotLayer {
    core: LayerCore,
    /// Seconds the current action has been playing.
    elapsed: f32,
    action_duration: f32,
    playing: Option<String>,
    pending: Option<String>,
    restart: bool,
    disable_requested: bool,
    was_shooting: bool,
    was_reloading: bool,
}

impl OneShotLayer {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_config(LayerConfig::new(name, LayerPriority::Override).disabled())
    }

    #[must_use]
    pub fn with_config(config: LayerConfig) -> Self {
        Self {
            core: LayerCore::new(config),
            elapsed: 0.0,
            action_duration: 0.0,
            playing: None,
            pending: None,
            restart: false,
            disable_requested: false,
            was_shooting: false,
            was_reloading: false,
        }
    }

    #[must_use]
    pub fn default_states() -> Vec<StateSpec> {
        vec![
            StateSpec::one_shot(SHOOT).with_fades(0.05, 0.1),
            StateSpec::one_shot(RELOAD).with_fades(0.1, 0.2),
        ]
    }

    pub async fn initialize<L: ClipLoader>(&mut self, loader: &L) {
        self.core.initialize(&Self::default_states(), loader).await;
    }

    #[must_use]
    pub fn playing(&self) -> Option<&str> {
        self.playing.as_deref()
    }

    /// Seconds left of the current action, 0 when idle.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        if self.playing.is_none() {
            return 0.0;
        }
        (self.action_duration - self.elapsed).max(0.0)
    }

    fn observe(&mut self, ctx: &AnimationContext) {
        if ctx.is_shooting && !self.was_shooting {
            self.trigger(SHOOT);
        } else if ctx.is_reloading && !self.was_reloading {
            self.trigger(RELOAD);
        }
        self.was_shooting = ctx.is_shooting;
        self.was_reloading = ctx.is_reloading;
    }

    fn start(&mut self, state: String) -> Option<String> {
        self.elapsed = 0.0;
        self.action_duration = self
            .core
            .states
            .get(&state)
            .map_or(0.0, |d| d.playback_duration());
        self.restart = self.core.current_state() == Some(state.as_str());
        self.disable_requested = false;
        self.core.config.enabled = true;
        self.playing = Some(state.clone());
        Some(state)
    }
}

impl Layer for OneShotLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn bootstrap_state(&self) -> Option<String> {
        self.pending.clone().or_else(|| self.playing.clone())
    }

    fn poll_activation(&mut self, ctx: &AnimationContext) -> bool {
        self.observe(ctx);
        self.pending.is_some()
    }

    fn update(&mut self, dt: f32, ctx: &AnimationContext) -> Option<String> {
        if self.playing.is_some() {
            self.elapsed += dt;
        }
        self.observe(ctx);

        if let Some(state) = self.pending.take() {
            return self.start(state);
        }

        let playing = self.playing.clone()?;
        if self.elapsed < self.action_duration {
            return self.core.settle(Some(playing));
        }

        // The composer clears the current state when it disables the layer.
        self.playing = None;
        self.disable_requested = true;
        None
    }

    /// Queues `state` to start on the next update. Returns `false` if the
    /// state is not registered.
    fn trigger(&mut self, state: &str) -> bool {
        if !self.core.states.contains(state) {
            log::warn!(
                "One-shot layer '{}': cannot trigger unknown state '{state}'",
                self.core.config.name
            );
            return false;
        }
        self.pending = Some(state.to_string());
        true
    }

    fn take_disable_request(&mut self) -> bool {
        std::mem::take(&mut self.disable_requested)
    }

    fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart)
    }

    fn on_disable(&mut self) {
        self.playing = None;
        self.pending = None;
        self.restart = false;
    }
}
