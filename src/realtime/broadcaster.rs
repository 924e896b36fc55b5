//! Best-effort fan-out of events to authenticated connections

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::{BroadcastEvent, ConnectionRegistry};

pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every authenticated, open connection. A full or
    /// closed queue only affects that connection. Returns the number of
    /// connections the event was queued for.
    pub async fn publish(&self, event: &BroadcastEvent) -> usize {
        let frame: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!("Failed to serialize {} event: {}", event.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        self.registry
            .for_each_authenticated(|id, identity, outbound| {
                match outbound.try_send(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            connection_id = %id,
                            "Outbound queue full for {}, dropping {} event",
                            identity.username,
                            event.kind()
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(connection_id = %id, "Connection closed during broadcast");
                    }
                }
            })
            .await;

        tracing::trace!("Broadcast {} to {} connections", event.kind(), delivered);
        delivered
    }
}
