//! Blend Primitives
//!
//! Stateless operations over actions in an [`AnimationMixer`]. Layers, the
//! composer and the single-track state machine build every transition out of
//! these five calls:
//!
//! - [`crossfade`]: overlap two actions with complementary fades
//! - [`freeze_and_fade`]: hold the outgoing pose still while the incoming fades in
//! - [`weighted_blend`]: drive N actions towards normalized target weights
//! - [`synchronize`]: match one action's phase to another's
//! - [`instant_switch`]: hard cut with no fade
//!
//! # Rate normalization
//!
//! The incoming action's rate, weight and warp are normalized *before* any
//! fade is scheduled. Starting the fade first and fixing the rate afterwards
//! lets a still-running warp from an earlier transition overwrite the rate,
//! which shows up as a clip playing two or three times too fast.

use crate::animation::action::AnimationAction;
use crate::animation::mixer::{ActionHandle, AnimationMixer};
use crate::errors::{AnimatorError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossfadeOptions {
    /// Start the incoming clip at the outgoing clip's normalized phase.
    pub match_pose: bool,
    /// Freeze the outgoing clip (rate 0) instead of letting it keep playing.
    pub freeze_from: bool,
    /// Warp both time scales towards each other's clip length during the fade.
    pub warp: bool,
}

/// Puts an action back at its declared rate and full weight, cancelling
/// anything that could still be rewriting either.
fn normalize(action: &mut AnimationAction) {
    action.stop_warping();
    action.frozen = false;
    action.time_scale = action.declared_rate;
    action.weight = 1.0;
}

fn live(mixer: &AnimationMixer, handle: ActionHandle) -> Result<()> {
    mixer.get(handle).map(|_| ()).ok_or(AnimatorError::StaleAction)
}

/// Crossfades from `from` (if any) to `to` over `duration` seconds.
///
/// A zero duration is an immediate cut. Crossfading an action into itself
/// only re-normalizes it and restores full fade.
pub fn crossfade(
    mixer: &mut AnimationMixer,
    from: Option<ActionHandle>,
    to: ActionHandle,
    duration: f32,
    options: CrossfadeOptions,
) -> Result<()> {
    live(mixer, to)?;
    let from = from.filter(|&h| h != to && mixer.get(h).is_some());
    let duration = duration.max(0.0);

    let (from_phase, from_length) = from
        .and_then(|h| mixer.get(h))
        .map_or((None, 0.0), |a| (Some(a.normalized_time()), a.clip().duration));

    mixer.cancel_ramps_for(to);
    let Some(incoming) = mixer.get_mut(to) else {
        return Err(AnimatorError::StaleAction);
    };
    normalize(incoming);

    let resumed = incoming.is_scheduled();
    if !resumed {
        incoming.reset();
    }
    if options.match_pose {
        if let Some(phase) = from_phase {
            incoming.set_normalized_time(phase);
        }
    }
    incoming.play();

    if duration <= 0.0 {
        incoming.fade_to(1.0, 0.0);
        if let Some(h) = from {
            if let Some(outgoing) = mixer.get_mut(h) {
                outgoing.stop();
            }
        }
        return Ok(());
    }

    if resumed {
        incoming.fade_to(1.0, duration);
    } else {
        incoming.fade_in(duration);
    }

    let to_length = incoming.clip().duration;
    if options.warp && from_length > 0.0 && to_length > 0.0 {
        let declared = incoming.declared_rate;
        incoming.warp(from_length / to_length * declared, declared, duration);
    }

    if let Some(h) = from {
        mixer.cancel_ramps_for(h);
        if let Some(outgoing) = mixer.get_mut(h) {
            if options.freeze_from {
                outgoing.stop_warping();
                outgoing.time_scale = 0.0;
                outgoing.frozen = true;
            } else if options.warp && from_length > 0.0 && to_length > 0.0 {
                outgoing.warp(outgoing.time_scale, to_length / from_length, duration);
            }
            outgoing.fade_out(duration);
        }
    }
    Ok(())
}

/// Freezes `from` in place while `to` fades in over it.
pub fn freeze_and_fade(
    mixer: &mut AnimationMixer,
    from: ActionHandle,
    to: ActionHandle,
    duration: f32,
) -> Result<()> {
    crossfade(
        mixer,
        Some(from),
        to,
        duration,
        CrossfadeOptions {
            freeze_from: true,
            ..Default::default()
        },
    )
}

/// Blends several actions towards `weights`, normalized to sum to 1.
///
/// Inputs of different lengths are rejected before anything is touched.
pub fn weighted_blend(
    mixer: &mut AnimationMixer,
    actions: &[ActionHandle],
    weights: &[f32],
    duration: f32,
) -> Result<()> {
    if actions.len() != weights.len() {
        log::error!(
            "weighted_blend: {} actions but {} weights, ignoring",
            actions.len(),
            weights.len()
        );
        return Err(AnimatorError::BlendInputMismatch {
            actions: actions.len(),
            weights: weights.len(),
        });
    }
    if actions.is_empty() {
        return Ok(());
    }
    for &handle in actions {
        live(mixer, handle)?;
    }

    let clamped: Vec<f32> = weights.iter().map(|w| w.max(0.0)).collect();
    let sum: f32 = clamped.iter().sum();
    let targets: Vec<(ActionHandle, f32)> = if sum > 0.0 {
        actions.iter().copied().zip(clamped.iter().map(|w| w / sum)).collect()
    } else {
        log::warn!("weighted_blend: all weights are zero, distributing evenly");
        let even = 1.0 / actions.len() as f32;
        actions.iter().map(|&h| (h, even)).collect()
    };

    for &handle in actions {
        if let Some(action) = mixer.get_mut(handle) {
            if !action.is_scheduled() {
                action.reset();
                action.stop_warping();
                action.time_scale = action.declared_rate;
                action.weight = 0.0;
                action.play();
            }
        }
    }
    mixer.ramp_weights(&targets, duration.max(0.0));
    Ok(())
}

/// Moves `target` to the same normalized phase as `source`.
pub fn synchronize(
    mixer: &mut AnimationMixer,
    source: ActionHandle,
    target: ActionHandle,
) -> Result<()> {
    let phase = mixer
        .get(source)
        .map(AnimationAction::normalized_time)
        .ok_or(AnimatorError::StaleAction)?;
    let target = mixer.get_mut(target).ok_or(AnimatorError::StaleAction)?;
    target.set_normalized_time(phase);
    Ok(())
}

/// Stops `from` and starts `to` at `time_offset` seconds with no fade.
pub fn instant_switch(
    mixer: &mut AnimationMixer,
    from: Option<ActionHandle>,
    to: ActionHandle,
    time_offset: f32,
) -> Result<()> {
    live(mixer, to)?;
    if let Some(h) = from.filter(|&h| h != to) {
        mixer.cancel_ramps_for(h);
        if let Some(outgoing) = mixer.get_mut(h) {
            outgoing.stop();
        }
    }
    mixer.cancel_ramps_for(to);
    let Some(incoming) = mixer.get_mut(to) else {
        return Err(AnimatorError::StaleAction);
    };
    incoming.stop();
    normalize(incoming);
    incoming.time = time_offset.clamp(0.0, incoming.clip().duration);
    incoming.play();
    Ok(())
}
