//! Synchronous animation events.
//!
//! The composer broadcasts an [`AnimationEvent`] to every subscriber of its
//! [`EventType`] the moment it happens. Nothing is queued.

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct SubscriptionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    StateEnter,
    StateExit,
    TransitionStart,
    TransitionEnd,
    LayerEnabled,
    LayerDisabled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEvent {
    StateEnter {
        layer: String,
        state: String,
    },
    StateExit {
        layer: String,
        state: String,
    },
    TransitionStart {
        layer: String,
        from: Option<String>,
        to: Option<String>,
        duration: f32,
    },
    TransitionEnd {
        layer: String,
        from: Option<String>,
        to: Option<String>,
    },
    LayerEnabled {
        layer: String,
    },
    LayerDisabled {
        layer: String,
    },
}

impl AnimationEvent {
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            AnimationEvent::StateEnter { .. } => EventType::StateEnter,
            AnimationEvent::StateExit { .. } => EventType::StateExit,
            AnimationEvent::TransitionStart { .. } => EventType::TransitionStart,
            AnimationEvent::TransitionEnd { .. } => EventType::TransitionEnd,
            AnimationEvent::LayerEnabled { .. } => EventType::LayerEnabled,
            AnimationEvent::LayerDisabled { .. } => EventType::LayerDisabled,
        }
    }

    #[must_use]
    pub fn layer(&self) -> &str {
        match self {
            AnimationEvent::StateEnter { layer, .. }
            | AnimationEvent::StateExit { layer, .. }
            | AnimationEvent::TransitionStart { layer, .. }
            | AnimationEvent::TransitionEnd { layer, .. }
            | AnimationEvent::LayerEnabled { layer }
            | AnimationEvent::LayerDisabled { layer } => layer,
        }
    }
}

type Listener = Box<dyn FnMut(&AnimationEvent)>;

struct Subscription {
    event_type: EventType,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: SlotMap<SubscriptionId, Subscription>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        event_type: EventType,
        listener: impl FnMut(&AnimationEvent) + 'static,
    ) -> SubscriptionId {
        self.subscriptions.insert(Subscription {
            event_type,
            listener: Box::new(listener),
        })
    }

    /// Returns `false` if the id was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn emit(&mut self, event: &AnimationEvent) {
        let event_type = event.event_type();
        for subscription in self.subscriptions.values_mut() {
            if subscription.event_type == event_type {
                (subscription.listener)(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
