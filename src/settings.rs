//! Animator Settings
//!
//! Tunables shared by the composer, the single-track state machine, the blend
//! primitives and the rate validator. Everything has a sensible default, so
//! hosts usually override one or two fields:
//!
//! ```rust,ignore
//! use myth_animator::AnimatorSettings;
//!
//! let settings = AnimatorSettings {
//!     default_fade_duration: 0.3,
//!     ..Default::default()
//! };
//! ```
//!
//! Settings can also ship with content as JSON; missing fields fall back to
//! their defaults.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Tolerances for the per-tick playback-rate validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    pub enabled: bool,
    /// Maximum allowed `|actual - declared|` before a rate is corrected.
    pub tolerance: f32,
    /// Lowest absolute rate considered sane for a running (non-frozen) action.
    pub min_rate: f32,
    /// Highest absolute rate considered sane.
    pub max_rate: f32,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 0.05,
            min_rate: 0.01,
            max_rate: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorSettings {
    /// Fade used when a state descriptor does not specify one (seconds).
    pub default_fade_duration: f32,
    /// Step size of `weighted_blend` weight interpolation (seconds).
    pub blend_poll_interval: f32,
    /// Align the incoming clip's phase to the outgoing one on layer transitions.
    pub match_pose_on_crossfade: bool,
    pub validator: ValidatorSettings,
}

impl Default for AnimatorSettings {
    fn default() -> Self {
        Self {
            default_fade_duration: 0.2,
            blend_poll_interval: 1.0 / 60.0,
            match_pose_on_crossfade: false,
            validator: ValidatorSettings::default(),
        }
    }
}

impl AnimatorSettings {
    /// Parses settings from JSON. Unknown fields are ignored, missing ones defaulted.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Clamps values that would make the animator misbehave.
    pub fn sanitize(&mut self) {
        if self.default_fade_duration.is_nan() || self.default_fade_duration < 0.0 {
            log::warn!(
                "default_fade_duration {} is invalid, using 0",
                self.default_fade_duration
            );
            self.default_fade_duration = 0.0;
        }
        if self.blend_poll_interval.is_nan() || self.blend_poll_interval <= 0.0 {
            self.blend_poll_interval = Self::default().blend_poll_interval;
        }
        let v = &mut self.validator;
        v.tolerance = v.tolerance.abs();
        if v.min_rate > v.max_rate {
            std::mem::swap(&mut v.min_rate, &mut v.max_rate);
        }
    }
}
