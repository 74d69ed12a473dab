//! Bone access for procedural layers.
//!
//! The skeleton collaborator owns the bones. Procedural layers only need to
//! write a bone's local rotation, which they do through a shared [`BoneRef`]
//! resolved by name from a [`BoneProvider`].

use std::cell::Cell;
use std::rc::Rc;

use glam::Quat;
use rustc_hash::FxHashMap;

/// Shared handle to one bone's local rotation.
#[derive(Debug, Clone)]
pub struct BoneRef {
    name: Rc<str>,
    rotation: Rc<Cell<Quat>>,
}

impl BoneRef {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            rotation: Rc::new(Cell::new(Quat::IDENTITY)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn local_rotation(&self) -> Quat {
        self.rotation.get()
    }

    pub fn set_local_rotation(&self, rotation: Quat) {
        self.rotation.set(rotation);
    }
}

pub trait BoneProvider {
    /// Looks a bone up by name. `None` while the skeleton is not ready.
    fn bone(&self, name: &str) -> Option<BoneRef>;
}

/// Simple name-indexed provider.
#[derive(Debug, Default, Clone)]
pub struct BoneMap {
    bones: FxHashMap<String, BoneRef>,
}

impl BoneMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or returns the existing) bone named `name`.
    pub fn add(&mut self, name: &str) -> BoneRef {
        self.bones
            .entry(name.to_string())
            .or_insert_with(|| BoneRef::new(name))
            .clone()
    }
}

impl BoneProvider for BoneMap {
    fn bone(&self, name: &str) -> Option<BoneRef> {
        self.bones.get(name).cloned()
    }
}
