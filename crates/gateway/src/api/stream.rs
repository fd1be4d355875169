//! WebSocket endpoint for live investigation streaming.
//!
//! Flow:
//! 1. Client connects to `GET /investigate/stream`
//! 2. Client sends `start_investigation {goal}` (or `attach` to rejoin
//!    an existing investigation)
//! 3. Gateway follows the worker's log stream and forwards each parsed
//!    event as an `agent_message` frame until the worker terminates
//!
//! Client disconnects detach silently: the worker keeps running and the
//! event sequence stays replayable via `GET /investigations/{id}/logs`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use oats_domain::event::Event;
use oats_domain::investigation::Investigation;

use crate::runtime::launcher::{self, CreateError, CreateRequest};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartInvestigation {
        goal: String,
        #[serde(default)]
        target_namespace: Option<String>,
        #[serde(default)]
        turn_budget: Option<u32>,
    },
    Attach {
        investigation_id: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AgentMessage {
        investigation_id: String,
        event: Event,
    },
    Error {
        message: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /investigate/stream — upgrade to WebSocket.
pub async fn investigate_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut inbound) = socket.split();

    // 1. The first text message opens the session.
    let opening = loop {
        match inbound.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => break message,
                    Err(e) => {
                        let _ = send_frame(
                            &mut sink,
                            &ServerFrame::Error {
                                message: format!("unrecognized message: {e}"),
                            },
                        )
                        .await;
                        return;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(_)) => return,
        }
    };

    // 2. Resolve it to an investigation.
    let investigation: Investigation = match opening {
        ClientMessage::StartInvestigation {
            goal,
            target_namespace,
            turn_budget,
        } => {
            let request = CreateRequest {
                goal,
                namespace: target_namespace,
                turn_budget,
            };
            match launcher::create_investigation(&state, request).await {
                Ok(investigation) => investigation,
                Err(CreateError::Invalid(detail)) | Err(CreateError::Rejected(detail)) => {
                    let _ = send_frame(&mut sink, &ServerFrame::Error { message: detail }).await;
                    return;
                }
            }
        }
        ClientMessage::Attach { investigation_id } => {
            match state.investigations.get(&investigation_id) {
                Some(investigation) => investigation,
                None => {
                    let _ = send_frame(
                        &mut sink,
                        &ServerFrame::Error {
                            message: format!("no investigation '{investigation_id}'"),
                        },
                    )
                    .await;
                    return;
                }
            }
        }
    };

    tracing::info!(id = %investigation.id, "stream session attached");

    // Announce the session. A synthesized status event keeps every frame
    // payload inside the declared event types.
    let hello = Event::Status {
        message: format!(
            "attached to investigation {} (job {})",
            investigation.id, investigation.job_name
        ),
    };
    if send_frame(
        &mut sink,
        &ServerFrame::AgentMessage {
            investigation_id: investigation.id.clone(),
            event: hello,
        },
    )
    .await
    .is_err()
    {
        return;
    }

    // 3. Follow the worker's log stream: replay retained lines, then
    // live-tail until the worker terminates.
    let mut logs = match state
        .orchestrator
        .follow_logs(&investigation.job_name)
        .await
    {
        Ok(logs) => logs,
        Err(e) => {
            let _ = send_frame(
                &mut sink,
                &ServerFrame::Error {
                    message: format!("log stream unavailable: {e}"),
                },
            )
            .await;
            return;
        }
    };

    loop {
        tokio::select! {
            line = logs.next() => match line {
                Some(Ok(line)) => {
                    // Shape-validate only; payloads are opaque here.
                    if let Some(event) = Event::parse_line(&line) {
                        let frame = ServerFrame::AgentMessage {
                            investigation_id: investigation.id.clone(),
                            event,
                        };
                        if send_frame(&mut sink, &frame).await.is_err() {
                            // Client gone; detach silently.
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(id = %investigation.id, error = %e, "log follow error");
                }
                None => break,
            },
            message = inbound.next() => match message {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                    tracing::debug!(id = %investigation.id, "client detached mid-stream");
                    return;
                }
                // Further client chatter is ignored for the session's lifetime.
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).unwrap_or_default();
    sink.send(Message::Text(text)).await
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse() {
        let start: ClientMessage = serde_json::from_str(
            r#"{"type": "start_investigation", "goal": "why is api slow", "turn_budget": 5}"#,
        )
        .unwrap();
        match start {
            ClientMessage::StartInvestigation {
                goal, turn_budget, ..
            } => {
                assert_eq!(goal, "why is api slow");
                assert_eq!(turn_budget, Some(5));
            }
            other => panic!("wrong variant: {other:?}"),
        }

        let attach: ClientMessage =
            serde_json::from_str(r#"{"type": "attach", "investigation_id": "abc"}"#).unwrap();
        assert!(matches!(attach, ClientMessage::Attach { .. }));
    }

    #[test]
    fn unknown_client_message_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "shutdown"}"#).is_err());
    }

    #[test]
    fn agent_message_frame_shape() {
        let frame = ServerFrame::AgentMessage {
            investigation_id: "abc".into(),
            event: Event::Finish {
                result: "done".into(),
                turns_used: 2,
            },
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "agent_message");
        assert_eq!(json["investigation_id"], "abc");
        assert_eq!(json["event"]["type"], "finish");
        assert_eq!(json["event"]["turns_used"], 2);
    }
}
