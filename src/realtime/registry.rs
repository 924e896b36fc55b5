//! Connection registry - the single source of truth for broadcast recipients
//!
//! Every accepted WebSocket gets an entry keyed by a generated id. The entry
//! owns the sending half of the connection's outbound queue; the transport
//! task owns the receiving half and notifies the registry when it closes.
//!
//! Mutations take the write lock and iteration takes the read lock, so
//! accept, promote, remove and broadcast never interleave on the map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::{ConnectionSummary, Identity};

/// Sending half of a connection's outbound queue (pre-serialized frames)
pub type Outbound = mpsc::Sender<Arc<str>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection not registered")]
    NotFound,

    #[error("connection already authenticated")]
    AlreadyAuthenticated,
}

enum ConnectionState {
    Pending,
    Authenticated(Identity),
}

struct Connection {
    outbound: Outbound,
    state: ConnectionState,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unauthenticated entry for a freshly accepted transport
    pub async fn register(&self, outbound: Outbound) -> ConnectionId {
        let id = ConnectionId::new();
        self.entries.write().await.insert(
            id,
            Connection {
                outbound,
                state: ConnectionState::Pending,
            },
        );
        id
    }

    /// Attach an identity after a successful handshake. Identities are
    /// never replaced.
    pub async fn promote(&self, id: &ConnectionId, identity: Identity) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or(RegistryError::NotFound)?;

        match entry.state {
            ConnectionState::Authenticated(_) => Err(RegistryError::AlreadyAuthenticated),
            ConnectionState::Pending => {
                entry.state = ConnectionState::Authenticated(identity);
                Ok(())
            }
        }
    }

    /// Drop the entry in whatever state it is. Returns false if it was
    /// already gone.
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    /// Visit every authenticated connection whose transport is still open.
    /// Entries removed before the read lock was taken are simply not seen.
    pub async fn for_each_authenticated<F>(&self, mut f: F)
    where
        F: FnMut(&ConnectionId, &Identity, &Outbound),
    {
        let entries = self.entries.read().await;
        for (id, conn) in entries.iter() {
            if let ConnectionState::Authenticated(identity) = &conn.state {
                if !conn.outbound.is_closed() {
                    f(id, identity, &conn.outbound);
                }
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn authenticated_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|c| matches!(c.state, ConnectionState::Authenticated(_)))
            .count()
    }

    pub async fn summaries(&self) -> Vec<ConnectionSummary> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(id, conn)| match &conn.state {
                ConnectionState::Pending => ConnectionSummary {
                    id: id.to_string(),
                    authenticated: false,
                    username: None,
                },
                ConnectionState::Authenticated(identity) => ConnectionSummary {
                    id: id.to_string(),
                    authenticated: true,
                    username: Some(identity.username.clone()),
                },
            })
            .collect()
    }
}
