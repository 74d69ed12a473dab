//! Per-tick gameplay snapshot consumed by every layer's decision function.
//!
//! The gameplay/physics collaborator fills an [`AnimationContext`] once per
//! frame. Fields it does not know about stay at their defaults (false / zero).

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Digital movement intent, one flag per cardinal key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementInput {
    #[must_use]
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// Resolves the eight-way direction label.
    ///
    /// Diagonals win over single cardinals. Opposing keys cancel out, so
    /// `forward + backward` with nothing else yields `None`.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        let fwd = self.forward && !self.backward;
        let back = self.backward && !self.forward;
        let left = self.left && !self.right;
        let right = self.right && !self.left;

        match (fwd, back, left, right) {
            (true, _, true, _) => Some(Direction::ForwardLeft),
            (true, _, _, true) => Some(Direction::ForwardRight),
            (_, true, true, _) => Some(Direction::BackwardLeft),
            (_, true, _, true) => Some(Direction::BackwardRight),
            (true, ..) => Some(Direction::Forward),
            (_, true, ..) => Some(Direction::Backward),
            (_, _, true, _) => Some(Direction::Left),
            (_, _, _, true) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Eight-way movement direction relative to the character's facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::ForwardLeft,
        Direction::ForwardRight,
        Direction::BackwardLeft,
        Direction::BackwardRight,
    ];

    /// State-name label, e.g. `"FORWARD_LEFT"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Backward => "BACKWARD",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::ForwardLeft => "FORWARD_LEFT",
            Direction::ForwardRight => "FORWARD_RIGHT",
            Direction::BackwardLeft => "BACKWARD_LEFT",
            Direction::BackwardRight => "BACKWARD_RIGHT",
        }
    }

    /// Pure forward or backward (sprint is only allowed on these).
    #[must_use]
    pub fn is_longitudinal(self) -> bool {
        matches!(self, Direction::Forward | Direction::Backward)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationContext {
    pub is_grounded: bool,
    pub is_moving: bool,
    pub is_sprinting: bool,
    pub is_crouching: bool,
    pub is_aiming: bool,
    pub is_shooting: bool,
    pub is_reloading: bool,
    pub movement_input: MovementInput,
    pub velocity: Vec3,
    pub rotation: Quat,
    /// Camera pitch in radians, positive looking up.
    pub camera_pitch: f32,
}

impl Default for AnimationContext {
    fn default() -> Self {
        Self {
            is_grounded: false,
            is_moving: false,
            is_sprinting: false,
            is_crouching: false,
            is_aiming: false,
            is_shooting: false,
            is_reloading: false,
            movement_input: MovementInput::default(),
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            camera_pitch: 0.0,
        }
    }
}

impl AnimationContext {
    /// A character standing still on the ground.
    #[must_use]
    pub fn grounded() -> Self {
        Self {
            is_grounded: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: MovementInput) -> Self {
        self.movement_input = input;
        self.is_moving = input.any();
        self
    }

    /// Horizontal speed, ignoring the vertical velocity component.
    #[must_use]
    pub fn planar_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }
}
