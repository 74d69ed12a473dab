//! Clip Player
//!
//! The low-level playback layer every higher-level track is built on:
//!
//! - [`AnimationClip`] / [`ClipLoader`]: clip metadata and its asynchronous source
//! - [`AnimationAction`]: one playing instance of a clip with time, rate and fades
//! - [`AnimationMixer`]: the per-character action registry, keyed by `(owner, state)`
//! - [`blend`]: stateless transition primitives over mixer actions
//! - [`RateValidator`]: the per-tick playback-rate repair pass

pub mod action;
pub mod blend;
pub mod clip;
pub mod mixer;
pub mod validator;

pub use action::{AnimationAction, LoopMode};
pub use blend::{
    CrossfadeOptions, crossfade, freeze_and_fade, instant_switch, synchronize, weighted_blend,
};
pub use clip::{AnimationClip, ClipLoader, MemoryClipLoader};
pub use mixer::{ActionHandle, ActionKey, AnimationMixer};
pub use validator::{RateCorrection, RateValidator};
