//! Test doubles shared across unit tests.

use crate::connection::Connection;
use crate::types::{Frame, RouterError, RouterResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory endpoint that records every call made against it.
pub(crate) struct RecordingConnection {
    sent: Mutex<Vec<Vec<u8>>>,
    probe_calls: AtomicUsize,
    close_calls: AtomicUsize,
    online: AtomicBool,
    fail_sends: AtomicBool,
    fail_probes: AtomicBool,
}

impl RecordingConnection {
    pub(crate) fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            probe_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            online: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            fail_probes: AtomicBool::new(false),
        }
    }

    pub(crate) fn failing_sends() -> Self {
        let connection = Self::new();
        connection.fail_sends.store(true, Ordering::SeqCst);
        connection
    }

    pub(crate) fn failing_probes() -> Self {
        let connection = Self::new();
        connection.fail_probes.store(true, Ordering::SeqCst);
        connection
    }

    /// Make subsequent probes succeed again.
    pub(crate) fn heal(&self) {
        self.fail_probes.store(false, Ordering::SeqCst);
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Raw call count, deliberately not idempotent-gated, so tests can
    /// assert close happens exactly once.
    pub(crate) fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn send(&self, content: &[u8]) -> RouterResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RouterError::Transport("simulated send failure".into()));
        }
        self.sent.lock().unwrap().push(content.to_vec());
        Ok(())
    }

    async fn probe(&self) -> RouterResult<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probes.load(Ordering::SeqCst) {
            self.online.store(false, Ordering::SeqCst);
            Err(RouterError::Transport("simulated probe failure".into()))
        } else {
            self.online.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn recv(&self) -> RouterResult<Frame> {
        Err(RouterError::ConnectionClosed)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Give the spawned dispatch loop enough polls to drain what it was handed.
///
/// Each iteration sleeps as well as yields: sleeping parks the runtime so
/// the timer driver fires expired timers (the dispatcher's startup
/// `interval.tick()` among them), which bare yields never allow.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
}
