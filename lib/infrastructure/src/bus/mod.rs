use tokio::sync::broadcast::{self, error::RecvError};

/// Fan-out of domain events to any number of listeners.
///
/// Emitters are handed to producers, listeners to consumers. Nothing is global: whoever owns
/// the bus decides who gets to publish and who gets to listen.
pub struct EventBus<T> {
    tx: broadcast::Sender<T>,
}

pub struct EventListener<T> {
    rx: broadcast::Receiver<T>,
}

#[derive(Clone)]
pub struct EventEmitter<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + std::fmt::Debug> EventBus<T> {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventListener<T> {
        EventListener::new(self.tx.subscribe())
    }

    pub fn emitter(&self) -> EventEmitter<T> {
        EventEmitter::new(self.tx.clone())
    }
}

impl<T: Clone> EventListener<T> {
    fn new(rx: broadcast::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once every emitter is gone. A slow listener skips what it missed.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Closed) => {
                    tracing::debug!("Event bus for {} closed", std::any::type_name::<T>());
                    return None;
                }
                Err(RecvError::Lagged(count)) => {
                    tracing::warn!(
                        "Listener for {} lagged behind, skipped {} events",
                        std::any::type_name::<T>(),
                        count
                    );
                }
            }
        }
    }
}

impl<T: Clone + std::fmt::Debug> EventEmitter<T> {
    fn new(tx: broadcast::Sender<T>) -> Self {
        Self { tx }
    }

    //No listener is not an error, events are fire-and-forget
    pub fn send(&self, event: T) {
        if self.tx.receiver_count() == 0 {
            tracing::trace!("No listener for event {:?}", event);
            return;
        }

        if let Err(e) = self.tx.send(event) {
            tracing::error!("Error sending event {:?}", e.0);
        }
    }
}
