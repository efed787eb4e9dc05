//! Connection registry: the id → endpoint mapping and its locking discipline.

use crate::connection::Connection;
use crate::types::{RouterError, RouterResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Mutation-safe mapping from endpoint id to live connection.
///
/// Register/unregister take the write lock; the dispatcher only ever reads,
/// iterating over [`Registry::snapshot`] copies so a slow send never holds
/// the map locked. An id present here implies the router has not closed the
/// endpoint — the transport may still be dead until the next probe or send
/// notices.
#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<String, Arc<dyn Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an endpoint under `id`.
    ///
    /// Fails with [`RouterError::DuplicateId`] if the id is already live.
    /// The check and the insert happen under one write lock, so two
    /// registrations for the same id can never both succeed.
    pub async fn register(
        &self,
        id: impl Into<String>,
        connection: Arc<dyn Connection>,
    ) -> RouterResult<()> {
        let id = id.into();
        {
            let mut connections = self.connections.write().await;
            if connections.contains_key(&id) {
                return Err(RouterError::DuplicateId(id));
            }
            connections.insert(id.clone(), connection);
        }
        info!(%id, "registered endpoint");
        Ok(())
    }

    /// Remove the mapping for `id`, returning the endpoint if it was present.
    ///
    /// Removal does not close the endpoint; the facade's unregister path
    /// owns that, so a bare registry removal leaks the connection.
    pub async fn unregister(&self, id: &str) -> Option<Arc<dyn Connection>> {
        let removed = self.connections.write().await.remove(id);
        if removed.is_some() {
            info!(id, "unregistered endpoint");
        }
        removed
    }

    pub async fn lookup(&self, id: &str) -> Option<Arc<dyn Connection>> {
        self.connections.read().await.get(id).cloned()
    }

    /// Copy-on-read view for iteration (broadcast, probe, shutdown), not
    /// invalidated by concurrent register/unregister.
    pub async fn snapshot(&self) -> Vec<(String, Arc<dyn Connection>)> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(id, connection)| (id.clone(), Arc::clone(connection)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConnection;

    fn endpoint() -> Arc<dyn Connection> {
        Arc::new(RecordingConnection::new())
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn distinct_ids_all_register() {
        let registry = Registry::new();
        for id in ["a", "b", "c"] {
            registry.register(id, endpoint()).await.unwrap();
        }
        assert_eq!(registry.len().await, 3);
        assert!(registry.lookup("b").await.is_some());
        assert!(logs_contain("registered endpoint"));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let registry = Registry::new();
        registry.register("a", endpoint()).await.unwrap();

        let err = registry.register("a", endpoint()).await.unwrap_err();
        assert!(matches!(err, RouterError::DuplicateId(id) if id == "a"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn id_is_reusable_after_unregister() {
        let registry = Registry::new();
        registry.register("a", endpoint()).await.unwrap();
        assert!(registry.unregister("a").await.is_some());
        registry.register("a", endpoint()).await.unwrap();
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn unregister_missing_id_is_a_noop() {
        let registry = Registry::new();
        assert!(registry.unregister("ghost").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_is_stable_under_mutation() {
        let registry = Registry::new();
        registry.register("a", endpoint()).await.unwrap();
        registry.register("b", endpoint()).await.unwrap();

        let snapshot = registry.snapshot().await;
        registry.unregister("a").await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 1);
    }
}
