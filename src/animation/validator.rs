use crate::animation::mixer::{ActionHandle, ActionKey, AnimationMixer};
use crate::settings::ValidatorSettings;

/// One rate repair performed by [`RateValidator::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RateCorrection {
    pub handle: ActionHandle,
    pub key: ActionKey,
    pub observed: f32,
    pub corrected: f32,
}

/// Per-tick pass that puts desynchronized playback rates back in line.
///
/// Every running action is compared against the rate its content declared.
/// Actions that are frozen or mid-warp run at a different rate on purpose
/// and are skipped.
#[derive(Debug, Clone, Default)]
pub struct RateValidator {
    settings: ValidatorSettings,
    total_corrections: u64,
}

impl RateValidator {
    #[must_use]
    pub fn new(settings: ValidatorSettings) -> Self {
        Self {
            settings,
            total_corrections: 0,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    /// Corrections made since construction.
    #[must_use]
    pub fn total_corrections(&self) -> u64 {
        self.total_corrections
    }

    /// The rate an action is held to: its declared rate, limited to the sane range.
    fn target_rate(&self, declared: f32) -> f32 {
        declared.max(self.settings.min_rate).min(self.settings.max_rate)
    }

    fn needs_correction(&self, actual: f32, declared: f32) -> bool {
        if !actual.is_finite() {
            return true;
        }
        let magnitude = actual.abs();
        (actual - self.target_rate(declared)).abs() > self.settings.tolerance
            || magnitude < self.settings.min_rate
            || magnitude > self.settings.max_rate
    }

    /// Scans all running actions and repairs their rates. Each repair is
    /// logged once and returned.
    pub fn validate(&mut self, mixer: &mut AnimationMixer) -> Vec<RateCorrection> {
        if !self.settings.enabled {
            return Vec::new();
        }

        let suspects: Vec<ActionHandle> = mixer
            .iter()
            .filter(|(_, _, a)| a.is_running() && !a.frozen && !a.is_warping())
            .filter(|(_, _, a)| self.needs_correction(a.time_scale, a.declared_rate))
            .map(|(h, ..)| h)
            .collect();

        let mut corrections = Vec::with_capacity(suspects.len());
        for handle in suspects {
            let Some(key) = mixer.key(handle).cloned() else {
                continue;
            };
            let Some(action) = mixer.get_mut(handle) else {
                continue;
            };
            let observed = action.time_scale;
            let corrected = self.target_rate(action.declared_rate);
            action.time_scale = corrected;

            log::warn!("Playback rate of {key} was {observed:.3}, corrected to {corrected:.3}");
            corrections.push(RateCorrection {
                handle,
                key,
                observed,
                corrected,
            });
        }
        self.total_corrections += corrections.len() as u64;
        corrections
    }
}
