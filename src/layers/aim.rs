use std::f32::consts::{FRAC_PI_3, FRAC_PI_4};
use std::rc::Rc;

use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::context::AnimationContext;
use crate::layers::core::{BlendMode, Layer, LayerConfig, LayerCore, LayerPriority};
use crate::skeleton::{BoneProvider, BoneRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimOffsetSettings {
    /// Bone whose local pitch is driven, usually an upper spine bone.
    pub bone_name: String,
    /// Camera pitch at which the bone rests (radians).
    pub neutral_pitch: f32,
    /// Camera pitch delta that maps to full bone rotation (radians).
    pub max_pitch_delta: f32,
    /// Largest bone rotation either way (radians).
    pub max_bone_rotation: f32,
}

impl Default for AimOffsetSettings {
    fn default() -> Self {
        Self {
            bone_name: "spine_03".to_string(),
            neutral_pitch: 0.0,
            max_pitch_delta: FRAC_PI_3,
            max_bone_rotation: FRAC_PI_4,
        }
    }
}

impl AimOffsetSettings {
    /// Bone pitch for a camera pitch, clamped to `±max_bone_rotation`.
    #[must_use]
    pub fn bone_pitch(&self, camera_pitch: f32) -> f32 {
        if self.max_pitch_delta <= 0.0 {
            return 0.0;
        }
        let limit = self.max_bone_rotation.abs();
        let pitch = -(camera_pitch - self.neutral_pitch) / self.max_pitch_delta * limit;
        pitch.clamp(-limit, limit)
    }
}

/// Procedural upper-body pitch that follows the camera.
///
/// Has no named states: `update` always returns `None` and only writes the
/// bone. Until the skeleton can supply the bone the layer does nothing.
pub struct AimOffsetLayer {
    core: LayerCore,
    settings: AimOffsetSettings,
    provider: Option<Rc<dyn BoneProvider>>,
    bone: Option<BoneRef>,
    pitch: f32,
}

impl AimOffsetLayer {
    #[must_use]
    pub fn new(name: &str, settings: AimOffsetSettings) -> Self {
        let config = LayerConfig::new(name, LayerPriority::Additive)
            .with_blend_mode(BlendMode::Additive)
            .with_bone_mask(&[settings.bone_name.as_str()]);
        Self {
            core: LayerCore::new(config),
            settings,
            provider: None,
            bone: None,
            pitch: 0.0,
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Rc<dyn BoneProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn set_provider(&mut self, provider: Rc<dyn BoneProvider>) {
        self.provider = Some(provider);
        self.bone = None;
    }

    #[must_use]
    pub fn settings(&self) -> &AimOffsetSettings {
        &self.settings
    }

    /// Last pitch written to the bone (radians).
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[must_use]
    pub fn bone(&self) -> Option<&BoneRef> {
        self.bone.as_ref()
    }

    fn resolve_bone(&mut self) -> Option<&BoneRef> {
        if self.bone.is_none() {
            self.bone = self
                .provider
                .as_ref()
                .and_then(|p| p.bone(&self.settings.bone_name));
        }
        self.bone.as_ref()
    }
}

impl Layer for AimOffsetLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn bootstrap_state(&self) -> Option<String> {
        None
    }

    fn update(&mut self, _dt: f32, ctx: &AnimationContext) -> Option<String> {
        let pitch = self.settings.bone_pitch(ctx.camera_pitch);
        if let Some(bone) = self.resolve_bone() {
            bone.set_local_rotation(Quat::from_rotation_x(pitch));
            self.pitch = pitch;
        }
        None
    }

    fn on_disable(&mut self) {
        self.pitch = 0.0;
        if let Some(bone) = &self.bone {
            bone.set_local_rotation(Quat::IDENTITY);
        }
    }
}

impl std::fmt::Debug for AimOffsetLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AimOffsetLayer")
            .field("name", &self.core.config.name)
            .field("settings", &self.settings)
            .field("bone_resolved", &self.bone.is_some())
            .field("pitch", &self.pitch)
            .finish()
    }
}
