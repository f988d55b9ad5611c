use crate::domain_model::SessionEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out of session lifecycle changes to whoever drives navigation.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let events = SessionEvents::new();
        events.emit(SessionEvent::LoggedOut);

        let mut rx = events.subscribe();
        events.emit(SessionEvent::LoggedIn {
            user_id: "u1".into(),
        });
        events.emit(SessionEvent::Refreshed);
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::LoggedIn {
                user_id: "u1".into()
            }
        );
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Refreshed);
    }
}
