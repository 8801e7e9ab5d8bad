//! Consultation chat client entry point
//!
//! Run with:
//! ```bash
//! CHAT_ROOM=42 cargo run -p consult-cli
//! ```
//!
//! Configuration is loaded from environment variables. `CHAT_EMAIL` and
//! `CHAT_PASSWORD` are used to log in when no stored session can be restored.
//! Every line typed on stdin is sent to the room.

use anyhow::{bail, Context};
use consult_common::{try_init_tracing, ClientConfig};
use consult_realtime::{ChatHandlers, ConnectionState, OutboundEvent, RealtimeManager};
use consult_session::{LoginRequest, SessionClient};
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Chat client failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("failed to load configuration")?;
    info!(
        env = ?config.app.env,
        api = %config.api.base_url,
        "Configuration loaded"
    );

    let room = env::var("CHAT_ROOM").context("CHAT_ROOM is required")?;

    let session = SessionClient::new(&config)?;
    if session.silent_restore().await {
        info!("Resumed previous session");
    } else {
        let (Ok(email), Ok(password)) = (env::var("CHAT_EMAIL"), env::var("CHAT_PASSWORD")) else {
            bail!("no stored session; set CHAT_EMAIL and CHAT_PASSWORD to log in");
        };
        session
            .login(&LoginRequest::new(email, password))
            .await
            .context("login failed")?;
    }

    let realtime = RealtimeManager::new(&config, session.tokens())?;
    let handlers = ChatHandlers::new()
        .on_message(|msg| {
            info!(
                sender = ?msg.sender,
                text = msg.text.as_deref().unwrap_or_default(),
                "Message"
            );
        })
        .on_typing(|typing| info!(user = ?typing.user_id, typing = typing.is_typing, "Typing"))
        .on_user_status(|status| info!(user = ?status.user_id, status = ?status.status, "Presence"));

    let socket = realtime.join(&room, handlers);
    let mut states = socket.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(state = %state, "Connection state");
                if state == ConnectionState::ClosedAuthRejected {
                    warn!("Socket rejected the token, reconnecting with a fresh one");
                    if session.silent_restore().await {
                        realtime.rotate_token();
                    } else {
                        bail!("session expired");
                    }
                } else if state == ConnectionState::ClosedExhausted {
                    bail!("chat server unreachable");
                }
            }
            line = lines.next_line() => match line? {
                Some(text) if !text.trim().is_empty() => {
                    if !realtime.send(&room, &OutboundEvent::chat_message(text)) {
                        warn!("Not connected, message dropped");
                    }
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    // The stored refresh token is kept so the next run can resume.
    realtime.close_all();
    Ok(())
}
