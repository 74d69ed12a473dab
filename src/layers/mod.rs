//! Layered Animation
//!
//! A character is animated by several independently evaluated layers, each
//! deciding its own state from the shared [`AnimationContext`](crate::context::AnimationContext):
//!
//! - [`LocomotionLayer`]: unarmed full-body movement (base priority)
//! - [`WeaponOverlayLayer`]: armed stances with eight-way movement (override priority)
//! - [`AimOffsetLayer`]: procedural spine pitch following the camera (additive)
//! - [`OneShotLayer`]: short non-looping actions such as firing (override)
//!
//! [`LayerComposer`] owns the layers and turns their decisions into
//! crossfades on one shared mixer.

pub mod aim;
pub mod composer;
pub mod core;
pub mod locomotion;
pub mod one_shot;
pub mod weapon;

pub use aim::{AimOffsetLayer, AimOffsetSettings};
pub use composer::{EnableOptions, LayerComposer};
pub use self::core::{BlendMode, IDLE, Layer, LayerConfig, LayerCore, LayerPriority};
pub use locomotion::{FALL, LocomotionLayer, RUN, SPRINT};
pub use one_shot::{OneShotLayer, RELOAD, SHOOT};
pub use weapon::{WeaponOverlayLayer, WeaponStyle};
