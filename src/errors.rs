//! Error Types
//!
//! This module defines the error types used throughout the animator.
//!
//! # Overview
//!
//! The main error type [`AnimatorError`] covers the failure modes a caller
//! can act on:
//! - Lookups of layers or states that were never registered
//! - Clips that failed to load from the content collaborator
//! - Blend primitives called with inconsistent inputs
//! - Malformed settings or state tables
//!
//! None of these are fatal to the animation loop. Every producer of an error
//! also logs it, and the per-tick paths substitute a safe default (usually
//! the idle state) instead of propagating.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_animator::errors::{AnimatorError, Result};
//!
//! fn pick_state() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the animator.
#[derive(Error, Debug)]
pub enum AnimatorError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No layer with this name is registered on the composer.
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    /// A layer with this name is already registered.
    #[error("Duplicate layer: {0}")]
    DuplicateLayer(String),

    /// The state is not part of the track's registry (or its clip never loaded).
    #[error("Unknown state '{state}' on '{layer}'")]
    UnknownState {
        /// Layer or state machine name
        layer: String,
        /// Requested state name
        state: String,
    },

    // ========================================================================
    // Content Errors
    // ========================================================================
    /// A clip could not be supplied by the content loader.
    #[error("Failed to load clip '{key}': {reason}")]
    ClipLoad {
        /// Clip key as requested from the loader
        key: String,
        /// Loader-provided reason
        reason: String,
    },

    /// A state table failed validation.
    #[error("Invalid state table: {0}")]
    InvalidStateTable(String),

    // ========================================================================
    // Blend Errors
    // ========================================================================
    /// `weighted_blend` was given a different number of actions and weights.
    #[error("Blend input mismatch: {actions} actions vs {weights} weights")]
    BlendInputMismatch {
        /// Number of actions passed in
        actions: usize,
        /// Number of weights passed in
        weights: usize,
    },

    /// An action handle no longer refers to a live action.
    #[error("Stale action handle")]
    StaleAction,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings or state-table JSON could not be parsed.
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),
}

/// Alias for `Result<T, AnimatorError>`.
pub type Result<T> = std::result::Result<T, AnimatorError>;
