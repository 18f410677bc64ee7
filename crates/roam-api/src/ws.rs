//! WebSocket progress channel
//!
//! One socket per client. The client identifies itself, subscribes to job
//! identifiers (case-sensitive), and receives `job_update` messages until it
//! unsubscribes or disconnects. Subscriptions do not survive a reconnect -
//! the client re-subscribes.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use roam_jobs::{ClientId, JobEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::AppState;

/// Keepalive ping cadence
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Messages a client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientMessage {
    /// Who is connecting (informational)
    #[serde(rename_all = "camelCase")]
    Identify {
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Start receiving a job's events
    #[serde(rename_all = "camelCase")]
    Subscribe { job_id: String },
    /// Stop receiving a job's events
    #[serde(rename_all = "camelCase")]
    Unsubscribe { job_id: String },
}

/// The one message shape the server sends
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobUpdate<'a> {
    event: &'static str,
    job_id: &'a str,
    data: JobUpdateData,
}

#[derive(Debug, Serialize)]
struct JobUpdateData {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<roam_jobs::JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<roam_jobs::Progress>,
}

impl<'a> JobUpdate<'a> {
    fn from_event(event: &'a JobEvent) -> Self {
        Self {
            event: "job_update",
            job_id: &event.job_id,
            data: JobUpdateData {
                status: event.status,
                progress: event.progress,
            },
        }
    }
}

/// GET /ws - upgrade to the progress channel
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client = state.broadcaster.register_client();
    tracing::debug!(client, "websocket connected");

    let (mut sender, mut receiver) = socket.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<JobEvent>();

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // Forward job events to the client
            Some(event) = event_rx.recv() => {
                let update = JobUpdate::from_event(&event);
                let Ok(text) = serde_json::to_string(&update) else {
                    continue;
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            // Keepalive
            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            // Client traffic
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&state, client, &event_tx, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(client, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    state.broadcaster.disconnect(client);
    tracing::debug!(client, "websocket disconnected");
}

fn handle_client_message(
    state: &AppState,
    client: ClientId,
    event_tx: &mpsc::UnboundedSender<JobEvent>,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(client, error = %e, "unparseable websocket message");
            return;
        }
    };

    match message {
        ClientMessage::Identify { user_id } => {
            tracing::debug!(client, user_id = user_id.as_deref().unwrap_or(""), "client identified");
        }
        ClientMessage::Subscribe { job_id } => {
            state
                .broadcaster
                .subscribe(&job_id, client, event_tx.clone());
        }
        ClientMessage::Unsubscribe { job_id } => {
            state.broadcaster.unsubscribe(&job_id, client);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"event":"subscribe","jobId":"abc"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Subscribe { job_id } if job_id == "abc"));

        let message: ClientMessage =
            serde_json::from_str(r#"{"event":"identify","userId":"u1"}"#).unwrap();
        assert!(matches!(
            message,
            ClientMessage::Identify { user_id: Some(u) } if u == "u1"
        ));

        let message: ClientMessage =
            serde_json::from_str(r#"{"event":"unsubscribe","jobId":"abc"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Unsubscribe { .. }));
    }

    #[test]
    fn test_job_update_shape() {
        let event = JobEvent {
            job_id: "j1".into(),
            kind: roam_jobs::EventKind::Progress,
            progress: Some(roam_jobs::Progress {
                total: 10,
                processed: 4,
                successful: 3,
                failed: 1,
            }),
            status: Some(roam_jobs::JobStatus::Processing),
        };
        let value = serde_json::to_value(JobUpdate::from_event(&event)).unwrap();
        assert_eq!(value["event"], "job_update");
        assert_eq!(value["jobId"], "j1");
        assert_eq!(value["data"]["status"], "processing");
        assert_eq!(value["data"]["progress"]["processed"], 4);
    }
}
