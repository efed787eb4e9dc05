//! # wsrouter
//!
//! Real-time message router for many concurrent WebSocket connections,
//! each identified by a stable string id.
//!
//! ## Features
//!
//! - **Registry**: mutation-safe id → endpoint mapping with unique ids
//! - **Serialized dispatch**: one loop delivers unicasts, broadcasts and
//!   liveness probes in submission order
//! - **Liveness probing**: periodic ping passes with flap recovery — an
//!   endpoint flagged offline heals on the next successful probe
//! - **Clean shutdown**: every endpoint closed exactly once
//! - **Pluggable transport**: anything implementing [`Connection`] can be
//!   registered; [`WsConnection`] covers tokio-tungstenite streams
//!
//! ## Quick start
//!
//! ```rust
//! use wsrouter::{Message, Router};
//!
//! # tokio_test::block_on(async {
//! let router = Router::builder()
//!     .on_send_error(|err| eprintln!("delivery failed: {err}"))
//!     .build();
//!
//! // endpoints produced by the accept path go into the registry:
//! // router.register("some-id", connection).await?;
//!
//! router
//!     .submit(Message::broadcast("server", "hello everyone"))
//!     .await
//!     .unwrap();
//!
//! router.shutdown().await;
//! # });
//! ```

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod registry;
pub mod router;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RouterConfig;
pub use connection::{Connection, WsConnection};
pub use dispatcher::ErrorHook;
pub use registry::Registry;
pub use router::{Router, RouterBuilder};
pub use types::{Frame, FrameKind, Message, RouterError, RouterResult, BROADCAST};
