//! States and Transitions
//!
//! - [`StateRegistry`]: per-track mapping from symbolic state name to clip and playback parameters
//! - [`TransitionTracker`]: the single live transition of a track, with supersession
//! - [`StateMachine`]: a single-track machine with explicit and rule-driven transitions

pub mod machine;
pub mod registry;
pub mod transition;

pub use machine::{StateMachine, TransitionRequest, TransitionRule};
pub use registry::{StateDescriptor, StateRegistry, StateSpec};
pub use transition::{
    Transition, TransitionHandle, TransitionOutcome, TransitionPhase, TransitionTracker,
};
