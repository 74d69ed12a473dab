#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Layered animation for a third-person character.
//!
//! Independent layers (locomotion, weapon overlays, aim offset, one-shot
//! actions) each pick a state from the frame's [`AnimationContext`]; the
//! [`LayerComposer`] crossfades those decisions on a shared
//! [`AnimationMixer`]. A single-track [`StateMachine`] is available for
//! characters that need no layering.

pub mod animation;
pub mod context;
pub mod errors;
pub mod events;
pub mod layers;
pub mod settings;
pub mod skeleton;
pub mod state;

pub use animation::{
    ActionHandle, AnimationAction, AnimationClip, AnimationMixer, ClipLoader, LoopMode,
    MemoryClipLoader, RateCorrection, RateValidator,
};
pub use context::{AnimationContext, Direction, MovementInput};
pub use errors::{AnimatorError, Result};
pub use events::{AnimationEvent, EventBus, EventType, SubscriptionId};
pub use layers::{
    AimOffsetLayer, AimOffsetSettings, EnableOptions, Layer, LayerComposer, LayerConfig,
    LayerPriority, LocomotionLayer, OneShotLayer, WeaponOverlayLayer, WeaponStyle,
};
pub use settings::{AnimatorSettings, ValidatorSettings};
pub use skeleton::{BoneMap, BoneProvider, BoneRef};
pub use state::{
    StateMachine, StateSpec, TransitionHandle, TransitionOutcome, TransitionPhase,
    TransitionRequest, TransitionRule,
};
