use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::animation::action::AnimationAction;
use crate::animation::clip::AnimationClip;

new_key_type! {
    /// Handle to an action living in an [`AnimationMixer`].
    pub struct ActionHandle;
}

/// Identity of an action: the track that owns it plus the state it plays.
///
/// Actions are never keyed by clip alone, since several layers may play the
/// same clip at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub owner: String,
    pub state: String,
}

impl ActionKey {
    #[must_use]
    pub fn new(owner: &str, state: &str) -> Self {
        Self {
            owner: owner.to_string(),
            state: state.to_string(),
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.state)
    }
}

/// Pending `weighted_blend` job. Weights move in fixed steps of `poll`.
#[derive(Debug, Clone)]
struct WeightRamp {
    targets: SmallVec<[(ActionHandle, f32, f32); 4]>,
    elapsed: f32,
    duration: f32,
    pending: f32,
    poll: f32,
}

impl WeightRamp {
    /// Consumes whole poll steps from `dt`. Returns the progress in `[0, 1]`
    /// or `None` if no step elapsed.
    fn step(&mut self, dt: f32) -> Option<f32> {
        self.pending += dt;
        if self.pending < self.poll && self.elapsed + self.pending < self.duration {
            return None;
        }
        let steps = (self.pending / self.poll).floor();
        self.elapsed += steps * self.poll;
        self.pending -= steps * self.poll;
        if self.elapsed + self.pending >= self.duration {
            self.elapsed = self.duration;
        }
        Some((self.elapsed / self.duration).min(1.0))
    }
}

/// Shared action registry for one character.
///
/// The mixer only moves local time, fades and weights. Sampling the clips
/// into a pose is left to the rendering collaborator, which reads the actions
/// back through [`AnimationMixer::iter`].
pub struct AnimationMixer {
    actions: SlotMap<ActionHandle, AnimationAction>,
    keys: SecondaryMap<ActionHandle, ActionKey>,
    index: FxHashMap<ActionKey, ActionHandle>,
    ramps: Vec<WeightRamp>,
    poll_interval: f32,
    time: f64,
}

impl Default for AnimationMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationMixer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: SlotMap::with_key(),
            keys: SecondaryMap::new(),
            index: FxHashMap::default(),
            ramps: Vec::new(),
            poll_interval: 1.0 / 60.0,
            time: 0.0,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: f32) -> Self {
        if poll_interval > 0.0 {
            self.poll_interval = poll_interval;
        }
        self
    }

    /// Total time advanced through [`update`](Self::update).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the action for `(owner, state)`, creating it on first use.
    pub fn clip_action(
        &mut self,
        owner: &str,
        state: &str,
        clip: &Arc<AnimationClip>,
    ) -> ActionHandle {
        let key = ActionKey::new(owner, state);
        if let Some(&handle) = self.index.get(&key) {
            if Arc::ptr_eq(self.actions[handle].clip(), clip) {
                return handle;
            }
            // Same slot re-bound to a different clip (content reload).
            self.remove(handle);
        }
        let handle = self.actions.insert(AnimationAction::new(Arc::clone(clip)));
        self.keys.insert(handle, key.clone());
        self.index.insert(key, handle);
        handle
    }

    #[must_use]
    pub fn existing_action(&self, owner: &str, state: &str) -> Option<ActionHandle> {
        self.index.get(&ActionKey::new(owner, state)).copied()
    }

    #[must_use]
    pub fn get(&self, handle: ActionHandle) -> Option<&AnimationAction> {
        self.actions.get(handle)
    }

    pub fn get_mut(&mut self, handle: ActionHandle) -> Option<&mut AnimationAction> {
        self.actions.get_mut(handle)
    }

    #[must_use]
    pub fn key(&self, handle: ActionHandle) -> Option<&ActionKey> {
        self.keys.get(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionHandle, &ActionKey, &AnimationAction)> {
        self.actions
            .iter()
            .filter_map(|(h, a)| self.keys.get(h).map(|k| (h, k, a)))
    }

    /// Every action owned by `owner`, scheduled or not.
    #[must_use]
    pub fn actions_of(&self, owner: &str) -> SmallVec<[ActionHandle; 4]> {
        self.keys
            .iter()
            .filter(|(_, k)| k.owner == owner)
            .map(|(h, _)| h)
            .collect()
    }

    /// Scheduled actions owned by `owner`.
    #[must_use]
    pub fn scheduled_actions_of(&self, owner: &str) -> SmallVec<[ActionHandle; 4]> {
        self.actions_of(owner)
            .into_iter()
            .filter(|&h| self.actions.get(h).is_some_and(AnimationAction::is_scheduled))
            .collect()
    }

    pub fn stop_all(&mut self) {
        for action in self.actions.values_mut() {
            action.stop();
        }
        self.ramps.clear();
    }

    pub fn remove(&mut self, handle: ActionHandle) -> Option<AnimationAction> {
        if let Some(key) = self.keys.remove(handle) {
            self.index.remove(&key);
        }
        for ramp in &mut self.ramps {
            ramp.targets.retain(|(h, ..)| *h != handle);
        }
        self.actions.remove(handle)
    }

    /// Cancels any pending weight ramp touching `handle`.
    pub(crate) fn cancel_ramps_for(&mut self, handle: ActionHandle) {
        for ramp in &mut self.ramps {
            ramp.targets.retain(|(h, ..)| *h != handle);
        }
        self.ramps.retain(|r| !r.targets.is_empty());
    }

    /// Interpolates each action's `weight` from its current value to the
    /// paired target over `duration`, stepping every poll interval.
    pub(crate) fn ramp_weights(&mut self, targets: &[(ActionHandle, f32)], duration: f32) {
        for &(handle, _) in targets {
            self.cancel_ramps_for(handle);
        }
        if duration <= 0.0 {
            for &(handle, to) in targets {
                if let Some(action) = self.actions.get_mut(handle) {
                    action.weight = to;
                }
            }
            return;
        }
        let targets = targets
            .iter()
            .filter_map(|&(h, to)| self.actions.get(h).map(|a| (h, a.weight, to)))
            .collect();
        self.ramps.push(WeightRamp {
            targets,
            elapsed: 0.0,
            duration,
            pending: 0.0,
            poll: self.poll_interval,
        });
    }

    /// Advances every scheduled action by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.time += f64::from(dt);

        let actions = &mut self.actions;
        self.ramps.retain_mut(|ramp| {
            let Some(t) = ramp.step(dt) else {
                return true;
            };
            for &(handle, from, to) in &ramp.targets {
                if let Some(action) = actions.get_mut(handle) {
                    action.weight = from + (to - from) * t;
                }
            }
            t < 1.0
        });

        for (handle, action) in &mut self.actions {
            if action.update_envelopes(dt) {
                if let Some(key) = self.keys.get(handle) {
                    log::debug!("Action {key} faded out");
                }
                action.stop();
                continue;
            }
            action.update(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_clip_on_two_owners_gets_two_actions() {
        let clip = Arc::new(AnimationClip::new("idle", 1.0));
        let mut mixer = AnimationMixer::new();
        let a = mixer.clip_action("base", "IDLE", &clip);
        let b = mixer.clip_action("upper", "IDLE", &clip);
        assert_ne!(a, b);
        assert_eq!(mixer.clip_action("base", "IDLE", &clip), a);
        assert_eq!(mixer.actions_of("upper").as_slice(), &[b]);
    }

    #[test]
    fn faded_out_action_is_stopped() {
        let clip = Arc::new(AnimationClip::new("idle", 1.0));
        let mut mixer = AnimationMixer::new();
        let h = mixer.clip_action("base", "IDLE", &clip);
        let action = mixer.get_mut(h).unwrap();
        action.play();
        action.fade_out(0.25);
        mixer.update(0.125);
        assert!(mixer.get(h).unwrap().is_scheduled());
        mixer.update(0.125);
        assert!(!mixer.get(h).unwrap().is_scheduled());
        assert!(mixer.scheduled_actions_of("base").is_empty());
    }

    #[test]
    fn ramp_steps_at_poll_resolution() {
        let clip = Arc::new(AnimationClip::new("idle", 1.0));
        let mut mixer = AnimationMixer::new().with_poll_interval(0.25);
        let h = mixer.clip_action("base", "IDLE", &clip);
        mixer.get_mut(h).unwrap().play();
        mixer.get_mut(h).unwrap().weight = 0.0;
        mixer.ramp_weights(&[(h, 1.0)], 1.0);

        mixer.update(0.125);
        assert!(mixer.get(h).unwrap().weight.abs() < 1e-6);
        mixer.update(0.125);
        assert!((mixer.get(h).unwrap().weight - 0.25).abs() < 1e-6);
        mixer.update(2.0);
        assert!((mixer.get(h).unwrap().weight - 1.0).abs() < 1e-6);
    }
}
