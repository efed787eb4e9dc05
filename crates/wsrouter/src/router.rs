//! Public facade: registration, submission, lifecycle.

use crate::config::RouterConfig;
use crate::connection::Connection;
use crate::dispatcher::{default_probe_hook, default_send_hook, Dispatcher, ErrorHook};
use crate::registry::Registry;
use crate::types::{Message, RouterError, RouterResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

/// Entry point for routing messages across registered endpoints.
///
/// An explicitly constructed value — whoever builds it owns its lifecycle;
/// there is no process-wide instance. [`Router::builder`] spawns the
/// dispatch loop, [`Router::shutdown`] stops it and closes every endpoint
/// exactly once.
pub struct Router {
    registry: Arc<Registry>,
    inbound: mpsc::Sender<Message>,
    closed: Arc<AtomicBool>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Register `connection` under `id`.
    ///
    /// Fails with [`RouterError::DuplicateId`] while another endpoint holds
    /// the id, and with [`RouterError::Closed`] after shutdown.
    pub async fn register(
        &self,
        id: impl Into<String>,
        connection: Arc<dyn Connection>,
    ) -> RouterResult<()> {
        if self.is_closed() {
            return Err(RouterError::Closed);
        }
        let id = id.into();
        self.registry
            .register(id.clone(), Arc::clone(&connection))
            .await?;

        // The loop flips `closed` before taking its shutdown snapshot. If it
        // is still unset here the insert made that snapshot and the loop
        // closes the endpoint; otherwise the insert may have slipped in
        // after the snapshot, so take the endpoint back out and close it.
        if self.is_closed() {
            self.registry.unregister(&id).await;
            connection.close().await;
            return Err(RouterError::Closed);
        }
        Ok(())
    }

    /// Remove and close the endpoint registered under `id`; no-op if absent.
    ///
    /// The router owns closing here: once an endpoint leaves the registry
    /// nothing else will ever close it, so unregister always does.
    pub async fn unregister(&self, id: &str) {
        if let Some(connection) = self.registry.unregister(id).await {
            connection.close().await;
        }
    }

    /// Queue a message for delivery by the dispatch loop.
    ///
    /// Waits when the bounded inbound queue is full. Fails with
    /// [`RouterError::Closed`] once the router has shut down. Messages are
    /// delivered in submission order.
    pub async fn submit(&self, message: Message) -> RouterResult<()> {
        if self.is_closed() {
            return Err(RouterError::Closed);
        }
        self.inbound
            .send(message)
            .await
            .map_err(|_| RouterError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn lookup(&self, id: &str) -> Option<Arc<dyn Connection>> {
        self.registry.lookup(id).await
    }

    /// Signal the dispatch loop once and wait until every endpoint has been
    /// closed. Idempotent; later calls return immediately.
    pub async fn shutdown(&self) {
        let sender = self.shutdown.lock().await.take();
        if let Some(sender) = sender {
            info!("router shutting down");
            let _ = sender.send(());
        }
        let handle = self.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            // JoinError only surfaces if the loop panicked
            let _ = handle.await;
        }
    }
}

/// Builder for a [`Router`]: configuration plus the two error hooks.
pub struct RouterBuilder {
    config: RouterConfig,
    on_send_error: ErrorHook,
    on_probe_error: ErrorHook,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            on_send_error: default_send_hook(),
            on_probe_error: default_probe_hook(),
        }
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Hook invoked from the dispatch loop for every failed delivery,
    /// including unicasts to unknown recipients. Must not block and must
    /// not call back into the router.
    pub fn on_send_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(RouterError) + Send + Sync + 'static,
    {
        self.on_send_error = Arc::new(hook);
        self
    }

    /// Hook invoked from the dispatch loop for every failed liveness probe.
    /// Same constraints as [`RouterBuilder::on_send_error`].
    pub fn on_probe_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(RouterError) + Send + Sync + 'static,
    {
        self.on_probe_error = Arc::new(hook);
        self
    }

    /// Construct the router and spawn its dispatch loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Router {
        let registry = Arc::new(Registry::new());
        let closed = Arc::new(AtomicBool::new(false));
        let (inbound_tx, inbound_rx) = mpsc::channel(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            inbound_rx,
            shutdown_rx,
            Arc::clone(&closed),
            self.on_send_error,
            self.on_probe_error,
            self.config,
        );
        let loop_handle = tokio::spawn(dispatcher.run());
        info!("router started");

        Router {
            registry,
            inbound: inbound_tx,
            closed,
            shutdown: Mutex::new(Some(shutdown_tx)),
            loop_handle: Mutex::new(Some(loop_handle)),
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
