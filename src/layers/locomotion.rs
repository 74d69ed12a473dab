use crate::animation::ClipLoader;
use crate::context::AnimationContext;
use crate::layers::core::{IDLE, Layer, LayerConfig, LayerCore, LayerPriority};
use crate::state::StateSpec;

pub const RUN: &str = "RUN";
pub const SPRINT: &str = "SPRINT";
pub const FALL: &str = "FALL";

/// Full-body unarmed movement: idle, run, sprint and airborne.
#[derive(Debug, Clone)]
pub struct LocomotionLayer {
    core: LayerCore,
    pub sprint_enabled: bool,
}

impl LocomotionLayer {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_config(
            LayerConfig::new(name, LayerPriority::Base)
                .with_initial_state(IDLE)
                .with_root_motion(),
        )
    }

    #[must_use]
    pub fn with_config(config: LayerConfig) -> Self {
        Self {
            core: LayerCore::new(config),
            sprint_enabled: true,
        }
    }

    /// The state table this layer decides over.
    #[must_use]
    pub fn default_states() -> Vec<StateSpec> {
        vec![
            StateSpec::looping(IDLE),
            StateSpec::looping(RUN),
            StateSpec::looping(SPRINT),
            StateSpec::looping(FALL).with_fades(0.1, 0.15),
        ]
    }

    pub async fn initialize<L: ClipLoader>(&mut self, loader: &L) {
        self.core.initialize(&Self::default_states(), loader).await;
    }

    /// Airborne beats moving beats idle. Sprint needs ground, movement and
    /// the sprint switch.
    #[must_use]
    pub fn decide(&self, ctx: &AnimationContext) -> &'static str {
        if !ctx.is_grounded {
            FALL
        } else if ctx.is_moving {
            if ctx.is_sprinting && self.sprint_enabled {
                SPRINT
            } else {
                RUN
            }
        } else {
            IDLE
        }
    }
}

impl Layer for LocomotionLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn update(&mut self, _dt: f32, ctx: &AnimationContext) -> Option<String> {
        let target = self.core.resolve(self.decide(ctx));
        self.core.settle(target)
    }
}
