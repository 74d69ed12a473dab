//! Transition tracking for a single track (one layer, or a state machine).
//!
//! A track has at most one live transition. Starting another one while a
//! fade is still in flight supersedes the old one: its [`TransitionHandle`]
//! resolves with [`TransitionOutcome::Superseded`] and it never reports
//! completion, so stale timers cannot race the current transition.
//!
//! ```text
//!   Idle ──begin──▶ FadingIn / FadingOut ──elapsed ≥ duration──▶ Settled
//!                      │    ▲                                      │
//!                      └────┘ begin (supersedes)                   │
//!                           ▲──────────────── begin ───────────────┘
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// Nothing has been played on the track yet.
    Idle,
    /// The track is fading to nothing (layer being disabled).
    FadingOut,
    /// A new state is fading in.
    FadingIn,
    Settled,
}

/// How a transition ended, as reported through its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The fade ran its full duration.
    Completed,
    /// A newer transition on the same track replaced it mid-fade.
    Superseded,
    /// Nothing to fade: zero duration, or the target was already current.
    Immediate,
}

/// Ephemeral record of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub track: String,
    pub from_state: Option<String>,
    pub to_state: Option<String>,
    /// Track clock when the transition began. Informational only.
    pub start_time: f64,
    pub duration: f32,
    /// Seconds advanced since `start_time`.
    pub elapsed: f32,
    pub crossfade: bool,
}

impl Transition {
    /// Fraction of the fade completed, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

/// Resolves once the transition it was issued for settles or is superseded.
#[derive(Debug)]
#[must_use = "a transition handle does nothing unless awaited or polled"]
pub struct TransitionHandle {
    ready: Option<TransitionOutcome>,
    receiver: Option<oneshot::Receiver<TransitionOutcome>>,
}

impl TransitionHandle {
    pub(crate) fn resolved(outcome: TransitionOutcome) -> Self {
        Self {
            ready: Some(outcome),
            receiver: None,
        }
    }

    fn pending() -> (Self, oneshot::Sender<TransitionOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                ready: None,
                receiver: Some(receiver),
            },
            sender,
        )
    }

    /// Non-blocking check; `None` while the fade is still running.
    pub fn try_outcome(&mut self) -> Option<TransitionOutcome> {
        if let Some(outcome) = self.ready {
            return Some(outcome);
        }
        let receiver = self.receiver.as_mut()?;
        let outcome = match receiver.try_recv() {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return None,
            Err(oneshot::Canceled) => TransitionOutcome::Superseded,
        };
        self.ready = Some(outcome);
        self.receiver = None;
        Some(outcome)
    }
}

impl Future for TransitionHandle {
    type Output = TransitionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.ready {
            return Poll::Ready(outcome);
        }
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(TransitionOutcome::Superseded);
        };
        let outcome = match Pin::new(receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(outcome)) => outcome,
            Poll::Ready(Err(oneshot::Canceled)) => TransitionOutcome::Superseded,
        };
        self.ready = Some(outcome);
        self.receiver = None;
        Poll::Ready(outcome)
    }
}

struct ActiveTransition {
    transition: Transition,
    generation: u64,
    sender: Option<oneshot::Sender<TransitionOutcome>>,
}

/// Owns the single live transition of a track.
pub struct TransitionTracker {
    phase: TransitionPhase,
    active: Option<ActiveTransition>,
    generation: u64,
}

impl Default for TransitionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: TransitionPhase::Idle,
            active: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_in_transition(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active(&self) -> Option<&Transition> {
        self.active.as_ref().map(|a| &a.transition)
    }

    /// Generation of the most recently started transition.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts `transition`, superseding any live one (returned alongside).
    pub fn begin(&mut self, mut transition: Transition) -> (TransitionHandle, Option<Transition>) {
        let superseded = self.supersede();
        self.generation += 1;
        transition.elapsed = 0.0;

        if transition.duration <= 0.0 {
            self.phase = TransitionPhase::Settled;
            return (TransitionHandle::resolved(TransitionOutcome::Immediate), superseded);
        }

        self.phase = if transition.to_state.is_some() {
            TransitionPhase::FadingIn
        } else {
            TransitionPhase::FadingOut
        };
        let (handle, sender) = TransitionHandle::pending();
        self.active = Some(ActiveTransition {
            transition,
            generation: self.generation,
            sender: Some(sender),
        });
        (handle, superseded)
    }

    /// Advances the live transition by `dt` seconds and settles it once its
    /// duration has elapsed. Returns the completed transition and its generation.
    pub fn advance(&mut self, dt: f32) -> Option<(Transition, u64)> {
        let active = self.active.as_mut()?;
        active.transition.elapsed += dt.max(0.0);
        if active.transition.elapsed < active.transition.duration {
            return None;
        }
        let mut active = self.active.take()?;
        self.phase = TransitionPhase::Settled;
        if let Some(sender) = active.sender.take() {
            // The receiver may have been dropped; nobody is waiting then.
            let _ = sender.send(TransitionOutcome::Completed);
        }
        Some((active.transition, active.generation))
    }

    /// Drops the live transition, resolving its handle as superseded.
    pub fn supersede(&mut self) -> Option<Transition> {
        let mut active = self.active.take()?;
        if let Some(sender) = active.sender.take() {
            let _ = sender.send(TransitionOutcome::Superseded);
        }
        self.phase = TransitionPhase::Settled;
        Some(active.transition)
    }

    /// Back to `Idle`, e.g. after a layer was disabled and its fade-out finished.
    pub fn reset(&mut self) {
        self.supersede();
        self.phase = TransitionPhase::Idle;
    }
}
