//! WebSocket session handling for live annotation sync.
//!
//! Each connected client holds one socket. It subscribes to any number of
//! (project, revision) pairs with `sync_request` and submits comments with
//! `add_comment`. The server answers with full-snapshot `points_updated`
//! frames: immediately to the requester after a sync request, and fanned out
//! through the [`SyncHub`] to every subscriber of a pair after a mutation.
//! NotFound/validation failures go back to the offending socket only.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use super::hub::PointsUpdate;
use super::routes::AppState;
use crate::error::ApiError;
use crate::models::Point;

/// Commands a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a (project, revision) pair and get an immediate snapshot.
    SyncRequest { project_id: Uuid, revision: usize },
    /// Attach a comment at (x, y), merging into a nearby point if one exists.
    AddComment {
        project_id: Uuid,
        revision: usize,
        x: f64,
        y: f64,
        author: String,
        text: String,
    },
}

/// Frames the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full ordered point snapshot for one (project, revision) pair.
    PointsUpdated {
        project_id: Uuid,
        revision: usize,
        points: Vec<Point>,
    },
    /// Command failure, reported to the requesting socket only.
    Error { code: &'static str, message: String },
}

impl ServerMessage {
    fn points_updated(update: PointsUpdate) -> Self {
        ServerMessage::PointsUpdated {
            project_id: update.project_id,
            revision: update.revision,
            points: update.points,
        }
    }

    fn error(e: &ApiError) -> Self {
        ServerMessage::Error {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

/// Runs one client's session until the socket closes.
async fn client_session(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Hub updates are forwarded into this queue by per-subscription tasks;
    // the session task owns the socket and does all the writing.
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);
    let mut subscribed: HashSet<(Uuid, usize)> = HashSet::new();

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket receive error: {}", e);
                        break;
                    }
                };

                let replies =
                    handle_client_message(text.as_str(), &state, &tx, &mut subscribed).await;
                let mut closed = false;
                for reply in replies {
                    if send_frame(&mut ws_tx, &reply).await.is_err() {
                        closed = true;
                        break;
                    }
                }
                if closed {
                    break;
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(msg) => {
                        if send_frame(&mut ws_tx, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
    // Dropping `tx` ends the forwarder tasks on their next send.
}

async fn send_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), ()> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize frame: {}", e);
            return Ok(());
        }
    };
    ws_tx.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Processes one inbound frame and returns the replies owed to this client.
async fn handle_client_message(
    text: &str,
    state: &AppState,
    tx: &mpsc::Sender<ServerMessage>,
    subscribed: &mut HashSet<(Uuid, usize)>,
) -> Vec<ServerMessage> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return vec![ServerMessage::Error {
                code: "validation",
                message: format!("Invalid message: {}", e),
            }];
        }
    };

    match message {
        ClientMessage::SyncRequest {
            project_id,
            revision,
        } => {
            if subscribed.contains(&(project_id, revision)) {
                // Already subscribed: just resend the current snapshot.
                return match state.registry.read().await.snapshot(project_id, revision) {
                    Ok(points) => vec![ServerMessage::PointsUpdated {
                        project_id,
                        revision,
                        points,
                    }],
                    Err(e) => vec![ServerMessage::error(&e)],
                };
            }

            // Validate the pair before the hub creates a channel for it.
            if let Err(e) = state.registry.read().await.seq(project_id, revision) {
                return vec![ServerMessage::error(&e)];
            }

            // Subscribe first, snapshot second: no mutation can slip between
            // unseen. The forwarder's baseline seq drops any queued update
            // the snapshot already contains.
            let updates = state.hub.subscribe(project_id, revision).await;
            match state
                .registry
                .read()
                .await
                .snapshot_with_seq(project_id, revision)
            {
                Ok((points, seq)) => {
                    subscribed.insert((project_id, revision));
                    spawn_forwarder(updates, tx.clone(), seq);
                    vec![ServerMessage::PointsUpdated {
                        project_id,
                        revision,
                        points,
                    }]
                }
                Err(e) => vec![ServerMessage::error(&e)],
            }
        }
        ClientMessage::AddComment {
            project_id,
            revision,
            x,
            y,
            author,
            text,
        } => {
            let result = state.registry.write().await.add_or_merge_comment(
                project_id, revision, x, y, &author, &text,
            );
            match result {
                Ok((_, points, seq)) => {
                    // Publish before persisting: the hub's seq guard keeps
                    // racing snapshots of the same pair in mutation order,
                    // and the disk write must not delay delivery.
                    state
                        .hub
                        .publish(PointsUpdate {
                            project_id,
                            revision,
                            points,
                            seq,
                        })
                        .await;
                    state.persist_project(project_id).await;
                    // The commenter hears back through their subscription.
                    Vec::new()
                }
                Err(e) => vec![ServerMessage::error(&e)],
            }
        }
    }
}

/// Forwards hub updates for one subscription into the session's queue.
///
/// `last_seq` starts at the seq of the snapshot the client was handed on
/// subscription; anything at or below it is already on their screen.
fn spawn_forwarder(
    mut updates: broadcast::Receiver<PointsUpdate>,
    tx: mpsc::Sender<ServerMessage>,
    mut last_seq: u64,
) {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    if update.seq <= last_seq {
                        continue;
                    }
                    last_seq = update.seq;
                    if tx.send(ServerMessage::points_updated(update)).await.is_err() {
                        break;
                    }
                }
                // Updates are full snapshots, so skipping stale ones is safe.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Slow subscriber skipped {} updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
