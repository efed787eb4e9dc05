//! Minimal chat server wired through the router.
//!
//! Every accepted connection is registered under a generated id and greeted.
//! Clients exchange JSON messages shaped like
//! `{"sender":"...","recipient":"...","content":[...]}`; a recipient of
//! `"all"` broadcasts. Ctrl-C shuts the router down and closes every client.
//!
//! Run with: `cargo run --example chat_server`

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use wsrouter::{Connection, Message, Router, RouterConfig, WsConnection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let router = Arc::new(
        Router::builder()
            .on_send_error(|err| warn!(error = %err, "delivery failed"))
            .on_probe_error(|err| warn!(error = %err, "probe failed"))
            .build(),
    );

    let listener = TcpListener::bind("127.0.0.1:9001").await?;
    info!("listening on ws://127.0.0.1:9001");

    let mut next_id = 0u64;
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                next_id += 1;
                let id = format!("client-{next_id}");
                info!(%id, %addr, "inbound connection");
                tokio::spawn(serve_client(Arc::clone(&router), id, stream));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("shutting down");
    router.shutdown().await;
    Ok(())
}

async fn serve_client(router: Arc<Router>, id: String, stream: tokio::net::TcpStream) {
    let connection = match WsConnection::accept(&id, stream, &RouterConfig::default()).await {
        Ok(connection) => Arc::new(connection),
        Err(err) => {
            error!(%id, error = %err, "handshake failed");
            return;
        }
    };

    if let Err(err) = router
        .register(&id, Arc::clone(&connection) as Arc<dyn Connection>)
        .await
    {
        error!(%id, error = %err, "registration failed");
        return;
    }

    let _ = router.submit(Message::new("server", &id, "hello client")).await;

    loop {
        let mut inbound = Message::default();
        match connection.receive(&mut inbound).await {
            Ok(_) => {
                if router.submit(inbound).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                info!(%id, error = %err, "read loop ended");
                break;
            }
        }
    }

    router.unregister(&id).await;
}
