use std::future::Future;
use std::sync::Arc;

use futures::future::ready;
use rustc_hash::FxHashMap;

use crate::errors::{AnimatorError, Result};

/// A playable clip as seen by the animator.
///
/// Keyframe data stays with the rendering collaborator; the animator only
/// needs the clip's length to drive local time, fades and phase matching.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    /// Whether the clip carries a root-motion track.
    pub root_motion: bool,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration: duration.max(0.0),
            root_motion: false,
        }
    }

    #[must_use]
    pub fn with_root_motion(mut self) -> Self {
        self.root_motion = true;
        self
    }
}

/// Source of clips, implemented by the content-loading collaborator.
///
/// Loading may span several frames; the animator awaits it only at layer
/// initialization time.
pub trait ClipLoader {
    fn load(&self, key: &str) -> impl Future<Output = Result<Arc<AnimationClip>>>;
}

/// In-memory loader, useful for hosts that decode clips up front.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipLoader {
    clips: FxHashMap<String, Arc<AnimationClip>>,
}

impl MemoryClipLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a clip under its own name.
    pub fn insert(&mut self, clip: AnimationClip) -> Arc<AnimationClip> {
        let clip = Arc::new(clip);
        self.clips.insert(clip.name.clone(), Arc::clone(&clip));
        clip
    }

    #[must_use]
    pub fn with_clip(mut self, name: &str, duration: f32) -> Self {
        self.insert(AnimationClip::new(name, duration));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.get(key)
    }
}

impl ClipLoader for MemoryClipLoader {
    fn load(&self, key: &str) -> impl Future<Output = Result<Arc<AnimationClip>>> {
        ready(self.clips.get(key).cloned().ok_or_else(|| AnimatorError::ClipLoad {
            key: key.to_string(),
            reason: "not found".to_string(),
        }))
    }
}
