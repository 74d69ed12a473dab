use std::sync::Arc;

use futures::future::join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::animation::{
    ActionHandle, AnimationAction, AnimationClip, AnimationMixer, ClipLoader, LoopMode,
};
use crate::errors::{AnimatorError, Result};

fn default_rate() -> f32 {
    1.0
}

fn default_loop() -> bool {
    true
}

/// Content-side description of a state, before its clip is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    /// Key handed to the [`ClipLoader`]. Defaults to the state name.
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default = "default_loop", rename = "loop")]
    pub looping: bool,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default)]
    pub fade_in: Option<f32>,
    #[serde(default)]
    pub fade_out: Option<f32>,
    #[serde(default)]
    pub clamp_when_finished: bool,
}

impl StateSpec {
    #[must_use]
    pub fn looping(name: &str) -> Self {
        Self {
            name: name.to_string(),
            clip: None,
            looping: true,
            rate: 1.0,
            fade_in: None,
            fade_out: None,
            clamp_when_finished: false,
        }
    }

    /// A non-looping state that holds its last frame.
    #[must_use]
    pub fn one_shot(name: &str) -> Self {
        Self {
            looping: false,
            clamp_when_finished: true,
            ..Self::looping(name)
        }
    }

    #[must_use]
    pub fn with_clip(mut self, clip: &str) -> Self {
        self.clip = Some(clip.to_string());
        self
    }

    #[must_use]
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    #[must_use]
    pub fn with_fades(mut self, fade_in: f32, fade_out: f32) -> Self {
        self.fade_in = Some(fade_in);
        self.fade_out = Some(fade_out);
        self
    }

    #[must_use]
    pub fn clip_key(&self) -> &str {
        self.clip.as_deref().unwrap_or(&self.name)
    }

    /// Parses a JSON array of specs.
    pub fn table_from_json(json: &str) -> Result<Vec<StateSpec>> {
        let table: Vec<StateSpec> = serde_json::from_str(json)?;
        let mut seen = FxHashSet::default();
        for spec in &table {
            if !seen.insert(spec.name.as_str()) {
                return Err(AnimatorError::InvalidStateTable(format!(
                    "duplicate state '{}'",
                    spec.name
                )));
            }
        }
        Ok(table)
    }
}

/// A loaded, selectable state.
#[derive(Debug, Clone)]
pub struct StateDescriptor {
    pub name: String,
    pub clip: Arc<AnimationClip>,
    pub looping: bool,
    /// Always positive.
    pub rate: f32,
    pub fade_in: Option<f32>,
    pub fade_out: Option<f32>,
    pub clamp_when_finished: bool,
}

impl StateDescriptor {
    /// Builds a descriptor, repairing values the animator cannot honour.
    #[must_use]
    pub fn new(spec: &StateSpec, clip: Arc<AnimationClip>) -> Self {
        let rate = if spec.rate.is_finite() && spec.rate > 0.0 {
            spec.rate
        } else {
            log::warn!(
                "State '{}' declares rate {}, using 1.0",
                spec.name,
                spec.rate
            );
            1.0
        };
        Self {
            name: spec.name.clone(),
            clip,
            looping: spec.looping,
            rate,
            fade_in: spec.fade_in.map(|f| f.max(0.0)),
            fade_out: spec.fade_out.map(|f| f.max(0.0)),
            clamp_when_finished: spec.clamp_when_finished,
        }
    }

    /// Copies the playback parameters onto an action.
    pub fn apply_to(&self, action: &mut AnimationAction) {
        action.declared_rate = self.rate;
        action.loop_mode = if self.looping {
            LoopMode::Loop
        } else {
            LoopMode::Once
        };
        action.clamp_when_finished = self.clamp_when_finished;
    }

    /// The `(owner, self)` action in `mixer`, configured from this descriptor.
    pub fn action_in(&self, mixer: &mut AnimationMixer, owner: &str) -> ActionHandle {
        let handle = mixer.clip_action(owner, &self.name, &self.clip);
        if let Some(action) = mixer.get_mut(handle) {
            self.apply_to(action);
        }
        handle
    }

    /// Length of one playthrough at the declared rate.
    #[must_use]
    pub fn playback_duration(&self) -> f32 {
        self.clip.duration / self.rate
    }
}

/// Symbolic state name to descriptor, for one layer or state machine.
#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    states: FxHashMap<String, StateDescriptor>,
    order: Vec<String>,
    unavailable: FxHashSet<String>,
}

impl StateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every spec's clip concurrently. Clips that fail to load leave
    /// their state permanently unselectable; the registry is still returned.
    pub async fn load<L: ClipLoader>(specs: &[StateSpec], loader: &L) -> Self {
        let results = join_all(specs.iter().map(|spec| loader.load(spec.clip_key()))).await;

        let mut registry = Self::new();
        for (spec, result) in specs.iter().zip(results) {
            match result {
                Ok(clip) => registry.insert(StateDescriptor::new(spec, clip)),
                Err(err) => {
                    log::warn!("State '{}' is unavailable: {err}", spec.name);
                    registry.mark_unavailable(&spec.name);
                }
            }
        }
        registry
    }

    pub fn insert(&mut self, descriptor: StateDescriptor) {
        self.unavailable.remove(&descriptor.name);
        if !self.states.contains_key(&descriptor.name) {
            self.order.push(descriptor.name.clone());
        }
        self.states.insert(descriptor.name.clone(), descriptor);
    }

    pub fn mark_unavailable(&mut self, name: &str) {
        if self.states.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
        self.unavailable.insert(name.to_string());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StateDescriptor> {
        self.states.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    #[must_use]
    pub fn is_unavailable(&self, name: &str) -> bool {
        self.unavailable.contains(name)
    }

    /// States in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StateDescriptor> {
        self.order.iter().filter_map(|n| self.states.get(n))
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// `name` if selectable, otherwise `fallback` if selectable.
    #[must_use]
    pub fn resolve<'a>(&'a self, name: &'a str, fallback: &'a str) -> Option<&'a str> {
        if self.contains(name) {
            Some(name)
        } else if self.contains(fallback) {
            Some(fallback)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::MemoryClipLoader;
    use futures::executor::block_on;

    #[test]
    fn missing_clip_makes_state_unavailable() {
        let loader = MemoryClipLoader::new().with_clip("IDLE", 1.0);
        let specs = [StateSpec::looping("IDLE"), StateSpec::looping("RUN")];
        let registry = block_on(StateRegistry::load(&specs, &loader));

        assert!(registry.contains("IDLE"));
        assert!(!registry.contains("RUN"));
        assert!(registry.is_unavailable("RUN"));
        assert_eq!(registry.resolve("RUN", "IDLE"), Some("IDLE"));
    }

    #[test]
    fn non_positive_rate_is_repaired() {
        let clip = Arc::new(AnimationClip::new("walk", 1.0));
        let d = StateDescriptor::new(&StateSpec::looping("WALK").with_rate(-2.0), clip);
        assert!((d.rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn table_from_json_defaults_and_duplicates() {
        let table = StateSpec::table_from_json(
            r#"[{ "name": "IDLE" }, { "name": "SHOOT", "loop": false, "rate": 1.5, "clip": "rifle_fire" }]"#,
        )
        .unwrap();
        assert!(table[0].looping);
        assert_eq!(table[1].clip_key(), "rifle_fire");

        let dup = StateSpec::table_from_json(r#"[{ "name": "IDLE" }, { "name": "IDLE" }]"#);
        assert!(matches!(dup, Err(AnimatorError::InvalidStateTable(_))));
    }
}
