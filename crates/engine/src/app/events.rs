use thiserror::Error;
use tracing::{debug, info};

use super::context::{AnimationFinished, EngineContext};
use super::scene::{SceneBindings, SceneId};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent<C> {
    SceneActivated {
        scene: SceneId,
        bindings: SceneBindings,
    },
    AnimationFinished(AnimationFinished),
    Tick {
        dt_seconds: f32,
    },
    Command(C),
}

pub trait EventSubscriber<C> {
    fn on_event(&mut self, event: EngineEvent<C>, ctx: &mut EngineContext);

    fn on_shutdown(&mut self, _ctx: &mut EngineContext) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventBusError {
    #[error("event bus already has a subscriber")]
    AlreadySubscribed,
}

/// Delivers engine events to at most one subscriber, which the bus borrows
/// for as long as it stays registered.
pub struct EventBus<'a, C> {
    subscriber: Option<&'a mut dyn EventSubscriber<C>>,
    delivered: u64,
}

impl<'a, C> Default for EventBus<'a, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, C> EventBus<'a, C> {
    pub fn new() -> Self {
        Self {
            subscriber: None,
            delivered: 0,
        }
    }

    pub fn subscribe(
        &mut self,
        subscriber: &'a mut dyn EventSubscriber<C>,
    ) -> Result<(), EventBusError> {
        if self.subscriber.is_some() {
            return Err(EventBusError::AlreadySubscribed);
        }
        self.subscriber = Some(subscriber);
        debug!("event_bus_subscribed");
        Ok(())
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    pub fn publish(&mut self, event: EngineEvent<C>, ctx: &mut EngineContext) {
        match self.subscriber.as_mut() {
            Some(subscriber) => {
                self.delivered += 1;
                subscriber.on_event(event, ctx);
            }
            None => debug!("event_dropped_no_subscriber"),
        }
    }

    /// Calls the subscriber's shutdown hook and releases it.
    pub fn shutdown(&mut self, ctx: &mut EngineContext) {
        if let Some(subscriber) = self.subscriber.take() {
            subscriber.on_shutdown(ctx);
            info!(delivered = self.delivered, "event_bus_shutdown");
        }
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scene::SceneRegistry;

    #[derive(Default)]
    struct Recorder {
        ticks: u32,
        shut_down: bool,
    }

    impl EventSubscriber<()> for Recorder {
        fn on_event(&mut self, event: EngineEvent<()>, _ctx: &mut EngineContext) {
            if let EngineEvent::Tick { .. } = event {
                self.ticks += 1;
            }
        }

        fn on_shutdown(&mut self, _ctx: &mut EngineContext) {
            self.shut_down = true;
        }
    }

    #[test]
    fn second_subscriber_is_rejected() {
        let mut first = Recorder::default();
        let mut second = Recorder::default();
        let mut bus = EventBus::new();

        bus.subscribe(&mut first).expect("first");
        assert_eq!(
            bus.subscribe(&mut second),
            Err(EventBusError::AlreadySubscribed)
        );
    }

    #[test]
    fn shutdown_runs_hook_and_releases_subscriber() {
        let mut recorder = Recorder::default();
        let mut ctx = EngineContext::new(SceneRegistry::new());
        {
            let mut bus = EventBus::new();
            bus.subscribe(&mut recorder).expect("subscribe");
            bus.publish(EngineEvent::Tick { dt_seconds: 0.1 }, &mut ctx);
            bus.publish(EngineEvent::Tick { dt_seconds: 0.1 }, &mut ctx);
            bus.shutdown(&mut ctx);
            assert!(!bus.has_subscriber());
            assert_eq!(bus.delivered_count(), 2);
        }

        assert_eq!(recorder.ticks, 2);
        assert!(recorder.shut_down);
    }

    #[test]
    fn publish_without_subscriber_is_dropped() {
        let mut ctx = EngineContext::new(SceneRegistry::new());
        let mut bus: EventBus<'_, ()> = EventBus::new();

        bus.publish(EngineEvent::Tick { dt_seconds: 0.1 }, &mut ctx);

        assert_eq!(bus.delivered_count(), 0);
    }
}
