//! Layer Decision Tests
//!
//! Tests for:
//! - Locomotion priorities (airborne > moving > idle, sprint gating)
//! - Weapon overlay 8-way resolution and modifier priority
//! - Idempotent `update` once the target is current
//! - Fallback to IDLE for states whose clips failed to load
//! - Aim offset bone pitch
//! - One-shot timing, restart and auto-disable requests

use std::f32::consts::FRAC_PI_8;
use std::rc::Rc;

use futures::executor::block_on;
use glam::Quat;

use myth_animator::animation::{AnimationClip, MemoryClipLoader};
use myth_animator::context::{AnimationContext, Direction, MovementInput};
use myth_animator::layers::{
    AimOffsetLayer, AimOffsetSettings, FALL, IDLE, Layer, LocomotionLayer, OneShotLayer, RUN,
    SHOOT, SPRINT, WeaponOverlayLayer, WeaponStyle,
};
use myth_animator::skeleton::BoneMap;

fn loader_with(names: &[&str]) -> MemoryClipLoader {
    let mut loader = MemoryClipLoader::new();
    for name in names {
        loader.insert(AnimationClip::new(*name, 1.0));
    }
    loader
}

fn weapon_loader(style: WeaponStyle) -> MemoryClipLoader {
    let mut loader = MemoryClipLoader::new();
    for spec in WeaponOverlayLayer::default_states(style) {
        loader.insert(AnimationClip::new(spec.clip_key(), 1.0));
    }
    loader
}

fn moving(input: MovementInput) -> AnimationContext {
    AnimationContext::grounded().with_input(input)
}

fn forward() -> MovementInput {
    MovementInput {
        forward: true,
        ..MovementInput::default()
    }
}

fn forward_left() -> MovementInput {
    MovementInput {
        forward: true,
        left: true,
        ..MovementInput::default()
    }
}

/// Applies a decision the way the composer would.
fn settle(layer: &mut dyn Layer, dt: f32, ctx: &AnimationContext) -> Option<String> {
    let target = layer.update(dt, ctx);
    if let Some(state) = &target {
        layer.core_mut().set_current_state(Some(state.clone()));
    }
    target
}

// ============================================================================
// Direction resolution
// ============================================================================

#[test]
fn diagonal_input_beats_cardinal() {
    assert_eq!(forward_left().direction(), Some(Direction::ForwardLeft));
    assert_eq!(forward_left().direction().unwrap().as_str(), "FORWARD_LEFT");
    assert_eq!(forward().direction().unwrap().as_str(), "FORWARD");
}

#[test]
fn opposing_keys_cancel() {
    let input = MovementInput {
        forward: true,
        backward: true,
        ..MovementInput::default()
    };
    assert_eq!(input.direction(), None);

    let input = MovementInput {
        forward: true,
        backward: true,
        right: true,
        ..MovementInput::default()
    };
    assert_eq!(input.direction(), Some(Direction::Right));
}

// ============================================================================
// Locomotion
// ============================================================================

fn locomotion() -> LocomotionLayer {
    let mut layer = LocomotionLayer::new("locomotion");
    block_on(layer.initialize(&loader_with(&[IDLE, RUN, SPRINT, FALL])));
    layer
}

#[test]
fn locomotion_priorities() {
    let layer = locomotion();
    let sprinting = AnimationContext {
        is_sprinting: true,
        ..moving(forward())
    };

    assert_eq!(layer.decide(&AnimationContext::grounded()), IDLE);
    assert_eq!(layer.decide(&moving(forward())), RUN);
    assert_eq!(layer.decide(&sprinting), SPRINT);
    assert_eq!(
        layer.decide(&AnimationContext {
            is_grounded: false,
            ..sprinting
        }),
        FALL
    );
}

#[test]
fn sprint_needs_movement_and_switch() {
    let mut layer = locomotion();
    let standing_sprint = AnimationContext {
        is_sprinting: true,
        ..AnimationContext::grounded()
    };
    assert_eq!(layer.decide(&standing_sprint), IDLE);

    layer.sprint_enabled = false;
    let sprinting = AnimationContext {
        is_sprinting: true,
        ..moving(forward())
    };
    assert_eq!(layer.decide(&sprinting), RUN);
}

#[test]
fn locomotion_update_is_idempotent() {
    let mut layer = locomotion();
    let ctx = moving(forward());

    assert_eq!(settle(&mut layer, 0.016, &ctx).as_deref(), Some(RUN));
    assert_eq!(settle(&mut layer, 0.016, &ctx), None);
    assert_eq!(settle(&mut layer, 0.016, &ctx), None);
    assert_eq!(layer.current_state(), Some(RUN));
}

#[test]
fn locomotion_target_sequence_idle_run_fall() {
    let mut layer = locomotion();
    let airborne = AnimationContext::default();

    let contexts = [AnimationContext::grounded(), moving(forward()), airborne];

    let sequence: Vec<Option<String>> = contexts
        .iter()
        .map(|ctx| settle(&mut layer, 0.016, ctx))
        .collect();

    assert_eq!(
        sequence,
        vec![Some(IDLE.into()), Some(RUN.into()), Some(FALL.into())]
    );
}

#[test]
fn missing_clip_falls_back_to_idle() {
    let mut layer = LocomotionLayer::new("locomotion");
    block_on(layer.initialize(&loader_with(&[IDLE, RUN, FALL])));

    assert!(layer.all_states().is_unavailable(SPRINT));
    assert!(layer.get_state(SPRINT).is_none());
    assert_eq!(layer.all_states().len(), 3);

    let sprinting = AnimationContext {
        is_sprinting: true,
        ..moving(forward())
    };
    assert_eq!(settle(&mut layer, 0.016, &sprinting).as_deref(), Some(IDLE));
    assert_eq!(settle(&mut layer, 0.016, &sprinting), None);
}

#[test]
fn locomotion_bootstraps_into_hint() {
    let layer = locomotion();
    assert_eq!(layer.bootstrap_state().as_deref(), Some(IDLE));
    assert!(layer.config().root_motion);
}

// ============================================================================
// Weapon Overlay
// ============================================================================

fn rifle() -> WeaponOverlayLayer {
    let mut layer = WeaponOverlayLayer::new(WeaponStyle::Rifle);
    block_on(layer.initialize(&weapon_loader(WeaponStyle::Rifle)));
    layer
}

#[test]
fn weapon_overlay_starts_disabled_with_every_state_loaded() {
    let layer = rifle();
    assert!(!layer.is_enabled());
    assert_eq!(layer.name(), "rifle");
    assert_eq!(
        layer.all_states().len(),
        WeaponOverlayLayer::state_names(WeaponStyle::Rifle).len()
    );
    assert!(layer.get_state("SPRINT_FORWARD").is_some());
    assert!(layer.get_state("SPRINT_LEFT").is_none());
}

#[test]
fn weapon_overlay_eight_way_resolution() {
    let layer = rifle();
    assert_eq!(layer.decide(&moving(forward_left())), "RUN_FORWARD_LEFT");
    assert_eq!(layer.decide(&moving(forward())), "RUN_FORWARD");

    let back_right = MovementInput {
        backward: true,
        right: true,
        ..MovementInput::default()
    };
    assert_eq!(layer.decide(&moving(back_right)), "RUN_BACKWARD_RIGHT");
}

#[test]
fn weapon_overlay_opposing_keys_cancel() {
    let layer = rifle();
    let strafe = MovementInput {
        forward: true,
        backward: true,
        left: true,
        ..MovementInput::default()
    };
    assert_eq!(layer.decide(&moving(strafe)), "RUN_LEFT");

    let stuck = MovementInput {
        forward: true,
        backward: true,
        ..MovementInput::default()
    };
    assert_eq!(layer.decide(&moving(stuck)), IDLE);
}

#[test]
fn weapon_overlay_modifier_priority() {
    let layer = rifle();
    let base = moving(forward());

    let all = AnimationContext {
        is_crouching: true,
        is_aiming: true,
        is_sprinting: true,
        ..base
    };
    assert_eq!(layer.decide(&all), "CROUCH_FORWARD");

    let aim_sprint = AnimationContext {
        is_aiming: true,
        is_sprinting: true,
        ..base
    };
    assert_eq!(layer.decide(&aim_sprint), "AIM_WALK_FORWARD");

    let sprint = AnimationContext {
        is_sprinting: true,
        ..base
    };
    assert_eq!(layer.decide(&sprint), "SPRINT_FORWARD");

    let sprint_diagonal = AnimationContext {
        is_sprinting: true,
        ..moving(forward_left())
    };
    assert_eq!(layer.decide(&sprint_diagonal), "RUN_FORWARD_LEFT");
}

#[test]
fn weapon_overlay_idle_variants_and_airborne() {
    let layer = rifle();
    let aiming = AnimationContext {
        is_aiming: true,
        ..AnimationContext::grounded()
    };
    let crouching = AnimationContext {
        is_crouching: true,
        ..AnimationContext::grounded()
    };
    assert_eq!(layer.decide(&AnimationContext::grounded()), IDLE);
    assert_eq!(layer.decide(&aiming), "AIM_IDLE");
    assert_eq!(layer.decide(&crouching), "CROUCH_IDLE");
    assert_eq!(
        layer.decide(&AnimationContext {
            is_grounded: false,
            ..moving(forward())
        }),
        FALL
    );
}

#[test]
fn sword_shield_blocks_instead_of_aiming() {
    let mut layer = WeaponOverlayLayer::new(WeaponStyle::SwordShield);
    block_on(layer.initialize(&weapon_loader(WeaponStyle::SwordShield)));

    let blocking = AnimationContext {
        is_aiming: true,
        ..moving(forward_left())
    };
    assert_eq!(
        settle(&mut layer, 0.016, &blocking).as_deref(),
        Some("BLOCK_WALK_FORWARD_LEFT")
    );
    assert!(layer.get_state("BLOCK_IDLE").is_some());
}

#[test]
fn weapon_overlay_unregistered_state_falls_back() {
    let mut loader = MemoryClipLoader::new();
    for spec in WeaponOverlayLayer::default_states(WeaponStyle::Rifle) {
        if spec.name != "RUN_FORWARD_LEFT" {
            loader.insert(AnimationClip::new(spec.clip_key(), 1.0));
        }
    }
    let mut layer = WeaponOverlayLayer::new(WeaponStyle::Rifle);
    block_on(layer.initialize(&loader));

    assert_eq!(
        settle(&mut layer, 0.016, &moving(forward_left())).as_deref(),
        Some(IDLE)
    );
    assert_eq!(
        settle(&mut layer, 0.016, &moving(forward())).as_deref(),
        Some("RUN_FORWARD")
    );
}

// ============================================================================
// Aim Offset
// ============================================================================

#[test]
fn aim_offset_pitches_bone_against_camera() {
    let mut bones = BoneMap::new();
    let spine = bones.add("spine_03");
    let mut layer =
        AimOffsetLayer::new("aim", AimOffsetSettings::default()).with_provider(Rc::new(bones));

    let ctx = AnimationContext {
        camera_pitch: std::f32::consts::FRAC_PI_6,
        ..AnimationContext::grounded()
    };
    assert_eq!(layer.update(0.016, &ctx), None);
    assert!((layer.pitch() + FRAC_PI_8).abs() < 1e-5);
    assert!(
        spine
            .local_rotation()
            .abs_diff_eq(Quat::from_rotation_x(-FRAC_PI_8), 1e-5)
    );

    let looking_up = AnimationContext {
        camera_pitch: 10.0,
        ..ctx
    };
    layer.update(0.016, &looking_up);
    assert!((layer.pitch() + std::f32::consts::FRAC_PI_4).abs() < 1e-5);

    layer.disable();
    assert!(spine.local_rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
}

#[test]
fn aim_offset_waits_for_bone() {
    let mut layer = AimOffsetLayer::new("aim", AimOffsetSettings::default());
    let ctx = AnimationContext {
        camera_pitch: 0.5,
        ..AnimationContext::grounded()
    };
    assert_eq!(layer.update(0.016, &ctx), None);
    assert!(layer.bone().is_none());
    assert!(layer.pitch().abs() < f32::EPSILON);

    let mut bones = BoneMap::new();
    let spine = bones.add("spine_03");
    layer.set_provider(Rc::new(bones));
    layer.update(0.016, &ctx);
    assert!(layer.bone().is_some());
    assert!(!spine.local_rotation().abs_diff_eq(Quat::IDENTITY, 1e-6));
    assert_eq!(layer.bootstrap_state(), None);
}

// ============================================================================
// One-Shot
// ============================================================================

fn one_shot() -> OneShotLayer {
    let mut loader = MemoryClipLoader::new();
    loader.insert(AnimationClip::new(SHOOT, 0.5));
    loader.insert(AnimationClip::new("RELOAD", 2.0));
    let mut layer = OneShotLayer::new("action");
    block_on(layer.initialize(&loader));
    layer
}

fn shooting(on: bool) -> AnimationContext {
    AnimationContext {
        is_shooting: on,
        ..AnimationContext::grounded()
    }
}

#[test]
fn one_shot_activates_on_rising_edge() {
    let mut layer = one_shot();
    assert!(!layer.is_enabled());
    assert!(!layer.poll_activation(&shooting(false)));
    assert!(layer.poll_activation(&shooting(true)));

    assert_eq!(settle(&mut layer, 0.0, &shooting(true)).as_deref(), Some(SHOOT));
    assert!(layer.is_enabled());
    assert_eq!(layer.playing(), Some(SHOOT));

    // Holding the trigger is not a new edge.
    assert_eq!(settle(&mut layer, 0.1, &shooting(true)), None);
    assert!(!layer.take_restart_request());
}

#[test]
fn one_shot_requests_disable_after_duration() {
    let mut layer = one_shot();
    layer.poll_activation(&shooting(true));
    settle(&mut layer, 0.0, &shooting(true));

    assert_eq!(settle(&mut layer, 0.25, &shooting(false)), None);
    assert!((layer.remaining() - 0.25).abs() < 1e-5);
    assert!(!layer.take_disable_request());

    assert_eq!(settle(&mut layer, 0.25, &shooting(false)), None);
    assert!(layer.take_disable_request());
    assert!(!layer.take_disable_request(), "request is consumed");
    assert_eq!(layer.playing(), None);
}

#[test]
fn one_shot_retrigger_restarts_timer() {
    let mut layer = one_shot();
    layer.poll_activation(&shooting(true));
    settle(&mut layer, 0.0, &shooting(true));
    settle(&mut layer, 0.4, &shooting(false));

    assert_eq!(settle(&mut layer, 0.05, &shooting(true)).as_deref(), Some(SHOOT));
    assert!(layer.take_restart_request());
    assert!((layer.remaining() - 0.5).abs() < 1e-5);
}

#[test]
fn one_shot_trigger_rejects_unknown_state() {
    let mut layer = one_shot();
    assert!(!layer.trigger("MELEE"));
    assert!(layer.trigger("RELOAD"));
    assert_eq!(layer.bootstrap_state().as_deref(), Some("RELOAD"));
}
