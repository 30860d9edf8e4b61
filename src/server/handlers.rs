//! Health endpoint and the WebSocket command session

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::AppState;
use crate::core::model::{ChangeEvent, FileMap, IncludeEdge};
use crate::error::MapError;

// ==================== Response Types ====================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Command envelope read off the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
enum Command {
    MapProject,
    MapFile(MapFileRequest),
    SaveFile(SaveFileRequest),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapFileRequest {
    filename: String,
    #[serde(default)]
    include_related: bool,
}

#[derive(Debug, Deserialize)]
struct SaveFileRequest {
    filename: String,
    content: String,
    pos: Option<usize>,
    end: Option<usize>,
}

/// Reply envelope, mirroring the command tagging. `projectContentChange`
/// is pushed without a preceding command.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
enum Reply {
    ProjectMap(Vec<IncludeEdge>),
    FileMaps(Vec<FileMap>),
    Saved { filename: String },
    Error(ErrorBody),
    ProjectContentChange(ChangeEvent),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

// ==================== Handlers ====================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Upgrade to a WebSocket command session
pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, state))
}

/// One connected client: answer commands, fan out change events.
///
/// A malformed or unrecognized command produces an `error` reply and the
/// connection stays open.
async fn session(mut socket: WebSocket, state: Arc<AppState>) {
    info!("session opened");
    let mut events = state.events.subscribe();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<Command>(&text) {
                            Ok(command) => dispatch(&state, command).await,
                            Err(e) => {
                                debug!("unrecognized command: {}", e);
                                protocol_error(format!("unrecognized command: {}", e))
                            }
                        };
                        if send_reply(&mut socket, &reply).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("session closed");
                        return;
                    }
                    Some(Ok(_)) => {
                        // binary, ping and pong frames carry no commands
                    }
                    Some(Err(e)) => {
                        warn!("socket error: {}", e);
                        return;
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let reply = Reply::ProjectContentChange(event);
                        if send_reply(&mut socket, &reply).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("session lagged behind {} change events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }
}

async fn dispatch(state: &AppState, command: Command) -> Reply {
    match command {
        Command::MapProject => match state.model.project_map().await {
            Ok(map) => Reply::ProjectMap((*map).clone()),
            Err(e) => error_reply(e),
        },
        Command::MapFile(req) => {
            match state.model.file_map(&req.filename, req.include_related).await {
                Ok(maps) => Reply::FileMaps(maps),
                Err(e) => error_reply(e),
            }
        }
        Command::SaveFile(req) => {
            let span = match (req.pos, req.end) {
                (Some(pos), Some(end)) => Some((pos, end)),
                (None, None) => None,
                _ => {
                    return protocol_error(
                        "saveFile takes both pos and end, or neither".to_string(),
                    )
                }
            };
            match state.model.save_file(&req.filename, &req.content, span).await {
                Ok(()) => Reply::Saved {
                    filename: req.filename,
                },
                Err(e) => error_reply(e),
            }
        }
    }
}

async fn send_reply(socket: &mut WebSocket, reply: &Reply) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(reply) {
        Ok(text) => text,
        Err(e) => {
            warn!("reply serialization failed: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(text)).await
}

fn protocol_error(message: String) -> Reply {
    error_reply(MapError::Protocol(message))
}

fn error_reply(e: MapError) -> Reply {
    let error = match &e {
        MapError::NotFound(_) => "not_found",
        MapError::Protocol(_) => "protocol_error",
        MapError::Resolution(_) => "resolution_error",
        MapError::Parse(_) | MapError::TraversalLimit(_) => "parse_error",
        _ => "internal_error",
    };
    Reply::Error(ErrorBody {
        error: error.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ChangeKind;

    #[test]
    fn map_project_needs_no_payload() {
        let command: Command = serde_json::from_str(r#"{"type":"mapProject"}"#).unwrap();
        assert!(matches!(command, Command::MapProject));
    }

    #[test]
    fn map_file_defaults_include_related_off() {
        let command: Command =
            serde_json::from_str(r#"{"type":"mapFile","payload":{"filename":"a.js"}}"#).unwrap();
        let Command::MapFile(req) = command else {
            panic!("wrong variant");
        };
        assert_eq!(req.filename, "a.js");
        assert!(!req.include_related);
    }

    #[test]
    fn save_file_span_fields_are_optional() {
        let command: Command = serde_json::from_str(
            r#"{"type":"saveFile","payload":{"filename":"a.js","content":"x","pos":3,"end":9}}"#,
        )
        .unwrap();
        let Command::SaveFile(req) = command else {
            panic!("wrong variant");
        };
        assert_eq!((req.pos, req.end), (Some(3), Some(9)));
    }

    #[test]
    fn unknown_command_type_is_rejected() {
        let parsed = serde_json::from_str::<Command>(r#"{"type":"dropTables"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn change_push_serializes_with_its_own_envelope() {
        let reply = Reply::ProjectContentChange(ChangeEvent {
            kind: ChangeKind::Change,
            path: "src/a.js".to_string(),
        });
        let text = serde_json::to_string(&reply).unwrap();
        assert_eq!(
            text,
            r#"{"type":"projectContentChange","payload":{"type":"change","path":"src/a.js"}}"#
        );
    }

    #[test]
    fn errors_keep_their_taxonomy_tag() {
        let reply = error_reply(MapError::NotFound("b.js".to_string()));
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["payload"]["error"], "not_found");
    }
}
