//! The dispatch loop: serialized delivery, liveness probing, shutdown.

use crate::config::RouterConfig;
use crate::registry::Registry;
use crate::types::{Message, RouterError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Callback slot for delivery and probe failures.
///
/// Invoked inline from the dispatch loop: hooks must not block and must not
/// call back into the router synchronously.
pub type ErrorHook = Arc<dyn Fn(RouterError) + Send + Sync>;

pub(crate) fn default_send_hook() -> ErrorHook {
    Arc::new(|err| warn!(error = %err, "message delivery failed"))
}

pub(crate) fn default_probe_hook() -> ErrorHook {
    Arc::new(|err| warn!(error = %err, "liveness probe failed"))
}

/// Single consumer of the inbound queue and the only code path that
/// iterates the full endpoint set.
///
/// It never mutates the registry — registration flows through the facade —
/// and handles exactly one event (message, probe tick, shutdown) per
/// iteration, which is what serializes delivery against probing.
pub(crate) struct Dispatcher {
    registry: Arc<Registry>,
    inbound: mpsc::Receiver<Message>,
    shutdown: oneshot::Receiver<()>,
    closed: Arc<AtomicBool>,
    on_send_error: ErrorHook,
    on_probe_error: ErrorHook,
    config: RouterConfig,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<Registry>,
        inbound: mpsc::Receiver<Message>,
        shutdown: oneshot::Receiver<()>,
        closed: Arc<AtomicBool>,
        on_send_error: ErrorHook,
        on_probe_error: ErrorHook,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            inbound,
            shutdown,
            closed,
            on_send_error,
            on_probe_error,
            config,
        }
    }

    /// Run until the shutdown signal fires or every submitter is gone, then
    /// close all remaining endpoints and mark the router closed.
    pub(crate) async fn run(mut self) {
        let mut probe_ticker = interval(self.config.probe_period);
        // the first tick of an interval completes immediately
        probe_ticker.tick().await;

        loop {
            tokio::select! {
                message = self.inbound.recv() => match message {
                    Some(message) => self.deliver(message).await,
                    // every sender dropped; nothing can be submitted anymore
                    None => break,
                },
                _ = probe_ticker.tick() => self.probe_all().await,
                _ = &mut self.shutdown => break,
            }
        }

        self.closed.store(true, Ordering::SeqCst);
        self.close_all().await;
        info!("dispatcher stopped");
    }

    async fn deliver(&self, message: Message) {
        if message.is_broadcast() {
            self.broadcast(message).await;
        } else {
            self.unicast(message).await;
        }
    }

    async fn unicast(&self, message: Message) {
        let Some(connection) = self.registry.lookup(&message.recipient).await else {
            (self.on_send_error)(RouterError::NonExistentRecipient(message.recipient));
            return;
        };

        debug!(recipient = %message.recipient, bytes = message.content.len(), "unicast");
        if let Err(err) = connection.send(&message.content).await {
            (self.on_send_error)(err);
        }
    }

    /// Failures are reported per endpoint and never abort delivery to the
    /// remaining recipients.
    async fn broadcast(&self, message: Message) {
        let endpoints = self.registry.snapshot().await;
        debug!(endpoints = endpoints.len(), bytes = message.content.len(), "broadcast");

        for (id, connection) in endpoints {
            if let Err(err) = connection.send(&message.content).await {
                debug!(%id, error = %err, "broadcast delivery failed");
                (self.on_send_error)(err);
            }
        }
    }

    /// Probe failures flip the online flag inside the endpoint but never
    /// close it; a flapping peer recovers on a later successful probe
    /// without re-registration.
    async fn probe_all(&self) {
        for (id, connection) in self.registry.snapshot().await {
            if let Err(err) = connection.probe().await {
                debug!(%id, error = %err, "probe failed");
                (self.on_probe_error)(err);
            }
        }
    }

    async fn close_all(&self) {
        let endpoints = self.registry.snapshot().await;
        info!(endpoints = endpoints.len(), "closing all endpoints");
        for (_, connection) in endpoints {
            connection.close().await;
        }
    }
}
