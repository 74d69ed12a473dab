use std::sync::Arc;

use crate::animation::clip::AnimationClip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Loop,
    PingPong,
}

/// Linear ramp of the fade factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FadeEnvelope {
    pub from: f32,
    pub to: f32,
    pub elapsed: f32,
    pub duration: f32,
}

/// Linear ramp of the time scale, used by the legacy warped crossfade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WarpEnvelope {
    pub from: f32,
    pub to: f32,
    pub elapsed: f32,
    pub duration: f32,
}

/// One playing instance of a clip, owned by the [`AnimationMixer`].
///
/// [`AnimationMixer`]: crate::animation::AnimationMixer
#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: Arc<AnimationClip>,

    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    pub clamp_when_finished: bool,
    pub paused: bool,
    pub enabled: bool,

    /// Rate the content declared for this action. The validator compares
    /// `time_scale` against it.
    pub declared_rate: f32,
    /// Multiplier owned by the layer this action belongs to.
    pub layer_weight: f32,
    /// Set by `freeze_and_fade`; a frozen action legitimately runs at rate 0.
    pub frozen: bool,

    running: bool,
    fade_factor: f32,
    pub(crate) fade: Option<FadeEnvelope>,
    pub(crate) warp: Option<WarpEnvelope>,
}

impl AnimationAction {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::Loop,
            clamp_when_finished: false,
            paused: false,
            enabled: true,
            declared_rate: 1.0,
            layer_weight: 1.0,
            frozen: false,
            running: false,
            fade_factor: 1.0,
            fade: None,
            warp: None,
        }
    }

    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    /// Schedules the action on the mixer. Does not touch time or weight.
    pub fn play(&mut self) {
        self.running = true;
        self.enabled = true;
    }

    /// Removes the action from playback and clears every envelope.
    pub fn stop(&mut self) {
        self.running = false;
        self.fade = None;
        self.warp = None;
        self.frozen = false;
        self.reset();
    }

    /// Rewinds to the start, un-pauses and restores full fade.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.paused = false;
        self.enabled = true;
        self.fade_factor = 1.0;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running && self.enabled && !self.paused
    }

    /// Scheduled on the mixer, even if paused or finished.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    #[must_use]
    pub fn is_warping(&self) -> bool {
        self.warp.is_some()
    }

    /// Weight actually applied when the pose is sampled.
    #[must_use]
    pub fn effective_weight(&self) -> f32 {
        if !self.running || !self.enabled {
            return 0.0;
        }
        self.weight * self.fade_factor * self.layer_weight
    }

    #[must_use]
    pub fn fade_factor(&self) -> f32 {
        self.fade_factor
    }

    /// Local time divided by clip length, in `[0, 1]`.
    #[must_use]
    pub fn normalized_time(&self) -> f32 {
        let duration = self.clip.duration;
        if duration <= 0.0 {
            return 0.0;
        }
        (self.time / duration).clamp(0.0, 1.0)
    }

    pub fn set_normalized_time(&mut self, phase: f32) {
        self.time = phase.clamp(0.0, 1.0) * self.clip.duration;
    }

    pub fn fade_in(&mut self, duration: f32) {
        self.schedule_fade(0.0, 1.0, duration);
    }

    pub fn fade_out(&mut self, duration: f32) {
        self.fade_to(0.0, duration);
    }

    /// Ramps the fade factor from wherever it is now to `target`.
    pub fn fade_to(&mut self, target: f32, duration: f32) {
        self.schedule_fade(self.fade_factor, target, duration);
    }

    fn schedule_fade(&mut self, from: f32, to: f32, duration: f32) {
        if duration <= 0.0 {
            self.fade = None;
            self.fade_factor = to;
            return;
        }
        self.fade_factor = from;
        self.fade = Some(FadeEnvelope {
            from,
            to,
            elapsed: 0.0,
            duration,
        });
    }

    /// Ramps `time_scale` from `from` to `to` over `duration`.
    pub fn warp(&mut self, from: f32, to: f32, duration: f32) {
        self.time_scale = from;
        if duration <= 0.0 {
            self.time_scale = to;
            self.warp = None;
            return;
        }
        self.warp = Some(WarpEnvelope {
            from,
            to,
            elapsed: 0.0,
            duration,
        });
    }

    /// Cancels an in-flight warp, leaving `time_scale` wherever it got to.
    pub fn stop_warping(&mut self) {
        self.warp = None;
    }

    /// Core logic: advance time.
    pub fn update(&mut self, dt: f32) {
        if !self.is_running() {
            return;
        }

        let duration = self.clip.duration;
        if duration <= 0.0 {
            return;
        }

        self.time += dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Once => {
                if self.time >= duration || self.time < 0.0 {
                    self.time = self.time.clamp(0.0, duration);
                    self.paused = true;
                    if !self.clamp_when_finished {
                        self.enabled = false;
                    }
                }
            }
            LoopMode::Loop => {
                if self.time >= duration {
                    self.time %= duration;
                } else if self.time < 0.0 {
                    self.time = duration + (self.time % duration);
                }
            }
            LoopMode::PingPong => {
                let double_duration = duration * 2.0;
                let mut t = self.time % double_duration;
                if t < 0.0 {
                    t += double_duration;
                }
                if t > duration {
                    t = double_duration - t;
                }
                self.time = t;
            }
        }
    }

    /// Advances fade and warp envelopes. Returns `true` when a fade-out has
    /// just reached zero, meaning the mixer should stop the action.
    pub(crate) fn update_envelopes(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }

        if let Some(warp) = &mut self.warp {
            warp.elapsed += dt;
            let t = (warp.elapsed / warp.duration).min(1.0);
            self.time_scale = warp.from + (warp.to - warp.from) * t;
            if t >= 1.0 {
                self.warp = None;
            }
        }

        let mut faded_out = false;
        if let Some(fade) = &mut self.fade {
            fade.elapsed += dt;
            let t = (fade.elapsed / fade.duration).min(1.0);
            self.fade_factor = fade.from + (fade.to - fade.from) * t;
            if t >= 1.0 {
                faded_out = fade.to <= 0.0;
                self.fade = None;
            }
        }
        faded_out
    }
}
