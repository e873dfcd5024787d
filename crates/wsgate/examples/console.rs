//! wsgate console client
//!
//! Opens one session once authorization arrives, sends each line typed on
//! stdin and prints whatever the server sends back. Typing while the session
//! is closed triggers a reconnect instead.
//!
//! Run with: cargo run -p wsgate --example console -- [ENDPOINT | SETTINGS.toml]
//!
//! The endpoint defaults to `ws://localhost:9999/echo`. `WSGATE_AUTH_TOKEN`
//! and `WSGATE_DEVICE_TOKEN` supply the handshake credentials; `RUST_LOG`
//! controls log output.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use wsgate::prelude::*;

const DEFAULT_ENDPOINT: &str = "ws://localhost:9999/echo";
const DEFAULT_CONTAINER_ID: &str = "local";

/// Build the session config from the first CLI argument.
fn load_config(arg: Option<String>) -> Result<SessionConfig, NetworkError> {
    match arg {
        Some(path) if path.ends_with(".toml") => SessionSettings::from_file(path)?.into_config(),
        Some(endpoint) => Ok(SessionConfig::new(endpoint)),
        None => Ok(SessionConfig::new(DEFAULT_ENDPOINT)),
    }
}

fn handshake_headers() -> SessionHeaders {
    let mut headers = SessionHeaders::new();
    if let Ok(token) = std::env::var("WSGATE_AUTH_TOKEN") {
        let token = AuthToken::new(token);
        tracing::info!(container = %token.container_id_or(DEFAULT_CONTAINER_ID), "auth token loaded");
        headers = headers.auth_token(token);
    }
    if let Ok(device) = std::env::var("WSGATE_DEVICE_TOKEN") {
        headers = headers.device_token(device);
    }
    headers
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(std::env::args().nth(1))?.session_headers(handshake_headers());
    let session = Arc::new(Session::new(config)?);

    session.opened.connect(|_| println!("Connected to server!"));
    session.closed.connect(|reason| match reason {
        Some(reason) => println!("Connection closed ({})", reason.code),
        None => println!("Connection closed"),
    });
    session.error.connect(|error| println!("Error: {error}"));
    session.set_observer(|payload| println!("Received: {payload}"));

    let gate = Arc::new(Gate::new());
    let deferred = session.clone();
    gate.when_authorized(move || deferred.connect());
    let on_revoke = session.clone();
    gate.revoked.connect(move |_| on_revoke.close());

    // Stands in for the management layer's asynchronous authorization callback.
    let authority = gate.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        authority.authorize();
    });

    println!("Type a message and press enter; 'quit' exits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "quit" {
            break;
        }
        if line.is_empty() {
            if let Some(last) = session.last_message() {
                println!("Last message: {last}");
            }
            continue;
        }

        if session.is_open() {
            // The peer may have closed the connection since the check.
            if let Err(error) = session.send_request(line) {
                println!("Send failed: {error}, reconnecting");
                session.reconnect();
            }
        } else if gate.is_authorized() {
            println!("Not connected ({}), reconnecting", session.state());
            session.reconnect();
        } else {
            println!("Waiting for authorization");
        }
    }

    gate.revoke();
    session.close();
    Ok(())
}
