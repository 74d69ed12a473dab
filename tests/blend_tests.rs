//! Blend Primitive Tests
//!
//! Tests for:
//! - crossfade rate/weight normalization, immediate cuts, pose matching and warps
//! - freeze_and_fade keeping the outgoing pose visible
//! - weighted_blend normalization, convergence and input validation
//! - synchronize / instant_switch
//! - RateValidator repair of corrupted playback rates

use std::sync::Arc;

use myth_animator::animation::{
    ActionHandle, AnimationClip, AnimationMixer, CrossfadeOptions, RateValidator, crossfade,
    freeze_and_fade, instant_switch, synchronize, weighted_blend,
};
use myth_animator::errors::AnimatorError;
use myth_animator::settings::ValidatorSettings;

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn action(mixer: &mut AnimationMixer, state: &str, duration: f32) -> ActionHandle {
    let clip = Arc::new(AnimationClip::new(state, duration));
    mixer.clip_action("base", state, &clip)
}

fn playing(mixer: &mut AnimationMixer, state: &str, duration: f32) -> ActionHandle {
    let handle = action(mixer, state, duration);
    mixer.get_mut(handle).unwrap().play();
    handle
}

// ============================================================================
// crossfade
// ============================================================================

#[test]
fn crossfade_normalizes_incoming_before_fading() {
    let mut mixer = AnimationMixer::new();
    let idle = playing(&mut mixer, "IDLE", 1.0);
    let run = action(&mut mixer, "RUN", 1.0);
    {
        let incoming = mixer.get_mut(run).unwrap();
        incoming.time_scale = 2.6;
        incoming.weight = 0.3;
    }

    crossfade(&mut mixer, Some(idle), run, 0.25, CrossfadeOptions::default()).unwrap();

    let incoming = mixer.get(run).unwrap();
    assert!(approx(incoming.time_scale, 1.0), "rate must be reset before the fade");
    assert!(approx(incoming.weight, 1.0));
    assert!(approx(incoming.fade_factor(), 0.0));
    assert!(incoming.is_fading());
    assert!(mixer.get(idle).unwrap().is_fading());
}

#[test]
fn crossfade_completes_after_duration() {
    let mut mixer = AnimationMixer::new();
    let idle = playing(&mut mixer, "IDLE", 1.0);
    let run = action(&mut mixer, "RUN", 1.0);

    crossfade(&mut mixer, Some(idle), run, 0.25, CrossfadeOptions::default()).unwrap();

    mixer.update(0.125);
    assert!(approx(mixer.get(run).unwrap().effective_weight(), 0.5));
    assert!(approx(mixer.get(idle).unwrap().effective_weight(), 0.5));

    mixer.update(0.125);
    assert!(approx(mixer.get(run).unwrap().effective_weight(), 1.0));
    assert!(!mixer.get(idle).unwrap().is_scheduled());
}

#[test]
fn crossfade_zero_duration_is_a_cut() {
    let mut mixer = AnimationMixer::new();
    let idle = playing(&mut mixer, "IDLE", 1.0);
    let run = action(&mut mixer, "RUN", 1.0);

    crossfade(&mut mixer, Some(idle), run, 0.0, CrossfadeOptions::default()).unwrap();

    assert!(!mixer.get(idle).unwrap().is_scheduled());
    let incoming = mixer.get(run).unwrap();
    assert!(incoming.is_running());
    assert!(!incoming.is_fading());
    assert!(approx(incoming.effective_weight(), 1.0));
}

#[test]
fn crossfade_match_pose_aligns_normalized_time() {
    let mut mixer = AnimationMixer::new();
    let walk = playing(&mut mixer, "WALK", 1.0);
    let run = action(&mut mixer, "RUN", 2.0);
    mixer.get_mut(walk).unwrap().time = 0.5;

    let options = CrossfadeOptions {
        match_pose: true,
        ..CrossfadeOptions::default()
    };
    crossfade(&mut mixer, Some(walk), run, 0.2, options).unwrap();

    assert!(approx(mixer.get(run).unwrap().time, 1.0));
}

#[test]
fn crossfade_rejects_stale_handle() {
    let mut mixer = AnimationMixer::new();
    let run = action(&mut mixer, "RUN", 1.0);
    mixer.remove(run);

    let result = crossfade(&mut mixer, None, run, 0.2, CrossfadeOptions::default());
    assert!(matches!(result, Err(AnimatorError::StaleAction)));
}

#[test]
fn warped_crossfade_ends_at_declared_rate() {
    let mut mixer = AnimationMixer::new();
    let idle = playing(&mut mixer, "IDLE", 2.0);
    let run = action(&mut mixer, "RUN", 0.8);
    mixer.get_mut(run).unwrap().declared_rate = 1.5;

    let options = CrossfadeOptions {
        warp: true,
        ..CrossfadeOptions::default()
    };
    crossfade(&mut mixer, Some(idle), run, 0.25, options).unwrap();
    assert!(mixer.get(run).unwrap().is_warping());

    let mut validator = RateValidator::new(ValidatorSettings::default());
    for _ in 0..4 {
        mixer.update(0.125);
        assert!(validator.validate(&mut mixer).is_empty());
    }
    let incoming = mixer.get(run).unwrap();
    assert!(!incoming.is_warping());
    assert!(approx(incoming.time_scale, 1.5), "Expected 1.5, got {}", incoming.time_scale);
}

// ============================================================================
// freeze_and_fade
// ============================================================================

#[test]
fn freeze_and_fade_holds_outgoing_pose() {
    let mut mixer = AnimationMixer::new();
    let aim = playing(&mut mixer, "AIM", 1.0);
    let idle = action(&mut mixer, "IDLE", 1.0);
    mixer.get_mut(aim).unwrap().time = 0.4;

    freeze_and_fade(&mut mixer, aim, idle, 0.25).unwrap();

    mixer.update(0.125);
    let outgoing = mixer.get(aim).unwrap();
    assert!(outgoing.frozen);
    assert!(outgoing.is_scheduled(), "frozen actions keep playing their pose");
    assert!(approx(outgoing.time_scale, 0.0));
    assert!(approx(outgoing.time, 0.4));

    // A frozen action legitimately runs at rate zero.
    let mut validator = RateValidator::new(ValidatorSettings::default());
    assert!(validator.validate(&mut mixer).is_empty());
}

// ============================================================================
// weighted_blend
// ============================================================================

#[test]
fn weighted_blend_converges_to_normalized_ratio() {
    let mut mixer = AnimationMixer::new();
    let a = action(&mut mixer, "A", 1.0);
    let b = action(&mut mixer, "B", 1.0);

    weighted_blend(&mut mixer, &[a, b], &[3.0, 1.0], 0.1).unwrap();
    assert!(mixer.get(a).unwrap().is_running(), "blend ensures every action plays");
    assert!(approx(mixer.get(a).unwrap().effective_weight(), 0.0));

    for _ in 0..10 {
        mixer.update(0.05);
    }

    let wa = mixer.get(a).unwrap().effective_weight();
    let wb = mixer.get(b).unwrap().effective_weight();
    assert!(approx(wa, 0.75), "Expected 0.75, got {wa}");
    assert!(approx(wb, 0.25), "Expected 0.25, got {wb}");
    assert!(approx(wa + wb, 1.0));
}

#[test]
fn weighted_blend_mismatch_has_no_effect() {
    let mut mixer = AnimationMixer::new();
    let a = action(&mut mixer, "A", 1.0);
    let b = action(&mut mixer, "B", 1.0);

    let result = weighted_blend(&mut mixer, &[a, b], &[1.0], 0.1);
    assert!(matches!(
        result,
        Err(AnimatorError::BlendInputMismatch {
            actions: 2,
            weights: 1
        })
    ));
    assert!(!mixer.get(a).unwrap().is_scheduled());
    assert!(!mixer.get(b).unwrap().is_scheduled());
}

#[test]
fn weighted_blend_all_zero_weights_splits_evenly() {
    let mut mixer = AnimationMixer::new();
    let a = action(&mut mixer, "A", 1.0);
    let b = action(&mut mixer, "B", 1.0);

    weighted_blend(&mut mixer, &[a, b], &[0.0, 0.0], 0.0).unwrap();
    assert!(approx(mixer.get(a).unwrap().effective_weight(), 0.5));
    assert!(approx(mixer.get(b).unwrap().effective_weight(), 0.5));
}

// ============================================================================
// synchronize / instant_switch
// ============================================================================

#[test]
fn synchronize_matches_phase_across_lengths() {
    let mut mixer = AnimationMixer::new();
    let walk = playing(&mut mixer, "WALK", 1.0);
    let run = playing(&mut mixer, "RUN", 4.0);
    mixer.get_mut(walk).unwrap().time = 0.25;

    synchronize(&mut mixer, walk, run).unwrap();
    assert!(approx(mixer.get(run).unwrap().time, 1.0));
}

#[test]
fn instant_switch_stops_source_and_normalizes_target() {
    let mut mixer = AnimationMixer::new();
    let idle = playing(&mut mixer, "IDLE", 1.0);
    let reload = action(&mut mixer, "RELOAD", 2.0);
    {
        let target = mixer.get_mut(reload).unwrap();
        target.declared_rate = 1.5;
        target.time_scale = 3.0;
    }

    instant_switch(&mut mixer, Some(idle), reload, 0.5).unwrap();

    assert!(!mixer.get(idle).unwrap().is_scheduled());
    let target = mixer.get(reload).unwrap();
    assert!(approx(target.time, 0.5));
    assert!(approx(target.time_scale, 1.5));
    assert!(approx(target.effective_weight(), 1.0));
}

// ============================================================================
// RateValidator
// ============================================================================

#[test]
fn validator_corrects_corrupted_rate_once() {
    let mut mixer = AnimationMixer::new();
    let run = playing(&mut mixer, "RUN", 1.0);
    mixer.get_mut(run).unwrap().time_scale = 2.6;

    let mut validator = RateValidator::new(ValidatorSettings::default());
    let corrections = validator.validate(&mut mixer);

    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].handle, run);
    assert_eq!(corrections[0].key.to_string(), "base/RUN");
    assert!(approx(corrections[0].observed, 2.6));
    assert!(approx(corrections[0].corrected, 1.0));
    assert!(approx(mixer.get(run).unwrap().time_scale, 1.0));

    assert!(validator.validate(&mut mixer).is_empty());
    assert_eq!(validator.total_corrections(), 1);
}

#[test]
fn validator_holds_out_of_range_declared_rate_to_the_limit() {
    let mut mixer = AnimationMixer::new();
    let run = playing(&mut mixer, "RUN", 1.0);
    {
        let action = mixer.get_mut(run).unwrap();
        action.declared_rate = 5.0;
        action.time_scale = 5.0;
    }

    let mut validator = RateValidator::new(ValidatorSettings::default());
    let corrections = validator.validate(&mut mixer);
    assert_eq!(corrections.len(), 1);
    assert!(approx(corrections[0].corrected, 4.0));

    for _ in 0..5 {
        mixer.update(0.016);
        assert!(validator.validate(&mut mixer).is_empty());
    }
    assert_eq!(validator.total_corrections(), 1);
    assert!(approx(mixer.get(run).unwrap().time_scale, 4.0));
}

#[test]
fn validator_tolerates_small_drift_and_skips_warps() {
    let mut mixer = AnimationMixer::new();
    let walk = playing(&mut mixer, "WALK", 1.0);
    let run = playing(&mut mixer, "RUN", 1.0);
    mixer.get_mut(walk).unwrap().time_scale = 1.02;
    mixer.get_mut(run).unwrap().warp(2.0, 1.0, 0.5);

    let mut validator = RateValidator::new(ValidatorSettings::default());
    assert!(validator.validate(&mut mixer).is_empty());
}

#[test]
fn validator_can_be_disabled() {
    let mut mixer = AnimationMixer::new();
    let run = playing(&mut mixer, "RUN", 1.0);
    mixer.get_mut(run).unwrap().time_scale = 2.6;

    let mut validator = RateValidator::new(ValidatorSettings {
        enabled: false,
        ..ValidatorSettings::default()
    });
    assert!(validator.validate(&mut mixer).is_empty());
    assert!(approx(mixer.get(run).unwrap().time_scale, 2.6));
}
