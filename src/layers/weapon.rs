//! Weapon stance overlays.
//!
//! While a weapon is wielded the equipment subsystem enables one of these
//! layers and disables plain locomotion. The decision is the same for every
//! weapon: airborne beats moving beats idle, and while moving the eight-way
//! direction is combined with the strongest active modifier:
//!
//! | Modifier  | Condition               | State              |
//! |-----------|-------------------------|--------------------|
//! | crouch    | `is_crouching`          | `CROUCH_<DIR>`     |
//! | aim walk  | `is_aiming`             | `AIM_WALK_<DIR>`   |
//! | sprint    | `is_sprinting`, fwd/bwd | `SPRINT_<DIR>`     |
//! | run       | otherwise               | `RUN_<DIR>`        |
//!
//! Opposing keys cancel before the direction is resolved: forward, backward
//! and left together resolve to `LEFT`, and forward plus backward alone is
//! treated as standing still (the idle variants).
//!
//! Sword-and-shield uses `BLOCK` where the rifle uses `AIM`.

use crate::animation::ClipLoader;
use crate::context::{AnimationContext, Direction};
use crate::layers::core::{IDLE, Layer, LayerConfig, LayerCore, LayerPriority};
use crate::layers::locomotion::FALL;
use crate::state::StateSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponStyle {
    Rifle,
    SwordShield,
}

impl WeaponStyle {
    /// State-name prefix of the aiming stance.
    #[must_use]
    pub fn aim_prefix(self) -> &'static str {
        match self {
            WeaponStyle::Rifle => "AIM",
            WeaponStyle::SwordShield => "BLOCK",
        }
    }

    /// Prefix of the clip keys this style loads.
    #[must_use]
    pub fn clip_prefix(self) -> &'static str {
        match self {
            WeaponStyle::Rifle => "rifle",
            WeaponStyle::SwordShield => "sword_shield",
        }
    }

    #[must_use]
    pub fn default_layer_name(self) -> &'static str {
        match self {
            WeaponStyle::Rifle => "rifle",
            WeaponStyle::SwordShield => "sword_shield",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeaponOverlayLayer {
    core: LayerCore,
    style: WeaponStyle,
}

impl WeaponOverlayLayer {
    /// A disabled overlay named after its style; the equipment subsystem enables it.
    #[must_use]
    pub fn new(style: WeaponStyle) -> Self {
        Self::with_config(
            style,
            LayerConfig::new(style.default_layer_name(), LayerPriority::Override)
                .with_initial_state(IDLE)
                .disabled(),
        )
    }

    #[must_use]
    pub fn with_config(style: WeaponStyle, config: LayerConfig) -> Self {
        Self {
            core: LayerCore::new(config),
            style,
        }
    }

    #[must_use]
    pub fn style(&self) -> WeaponStyle {
        self.style
    }

    /// Every state name the decision function can produce.
    #[must_use]
    pub fn state_names(style: WeaponStyle) -> Vec<String> {
        let aim = style.aim_prefix();
        let mut names = vec![
            IDLE.to_string(),
            FALL.to_string(),
            "CROUCH_IDLE".to_string(),
            format!("{aim}_IDLE"),
        ];
        for dir in Direction::ALL {
            names.push(format!("RUN_{dir}"));
            names.push(format!("CROUCH_{dir}"));
            names.push(format!("{aim}_WALK_{dir}"));
            if dir.is_longitudinal() {
                names.push(format!("SPRINT_{dir}"));
            }
        }
        names
    }

    /// Looping specs for every state, with clip keys prefixed by the style.
    #[must_use]
    pub fn default_states(style: WeaponStyle) -> Vec<StateSpec> {
        Self::state_names(style)
            .into_iter()
            .map(|name| {
                let clip = format!("{}_{}", style.clip_prefix(), name.to_lowercase());
                StateSpec::looping(&name).with_clip(&clip)
            })
            .collect()
    }

    pub async fn initialize<L: ClipLoader>(&mut self, loader: &L) {
        self.core
            .initialize(&Self::default_states(self.style), loader)
            .await;
    }

    /// Raw decision, before falling back to registered states.
    #[must_use]
    pub fn decide(&self, ctx: &AnimationContext) -> String {
        let aim = self.style.aim_prefix();
        if !ctx.is_grounded {
            return FALL.to_string();
        }

        let direction = ctx.is_moving.then(|| ctx.movement_input.direction()).flatten();
        let Some(dir) = direction else {
            return if ctx.is_crouching {
                "CROUCH_IDLE".to_string()
            } else if ctx.is_aiming {
                format!("{aim}_IDLE")
            } else {
                IDLE.to_string()
            };
        };

        if ctx.is_crouching {
            format!("CROUCH_{dir}")
        } else if ctx.is_aiming {
            format!("{aim}_WALK_{dir}")
        } else if ctx.is_sprinting && dir.is_longitudinal() {
            format!("SPRINT_{dir}")
        } else {
            format!("RUN_{dir}")
        }
    }
}

impl Layer for WeaponOverlayLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn update(&mut self, _dt: f32, ctx: &AnimationContext) -> Option<String> {
        let target = self.core.resolve(&self.decide(ctx));
        self.core.settle(target)
    }
}
