use crate::domain::model::ViewerId;
use crate::gateway::events::{ServerEvent, ViewerCommand};
use crate::gateway::http::AppState;
use crate::utils::error::Result;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::sync::broadcast;

pub async fn viewer_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let viewer = state.next_viewer_id();
    ws.on_upgrade(move |socket| viewer_session(socket, state, viewer))
}

async fn viewer_session(mut socket: WebSocket, state: AppState, viewer: ViewerId) {
    // 先訂閱再取快照，避免漏掉兩者之間的更新
    let mut events = state.sim.subscribe();
    tracing::info!(
        "🔌 Dashboard connected: viewer {} ({} connected)",
        viewer,
        state.sim.bus().viewer_count()
    );
    match state.sim.snapshot().await {
        Ok(snapshot) => {
            let initial = ServerEvent::EmergencyServicesStatus(snapshot);
            if send_event(&mut socket, &initial).await.is_err() {
                return;
            }
        }
        Err(err) => {
            tracing::warn!("Viewer {} could not load service status: {}", viewer, err);
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(frame))) => {
                        if let Err(err) = handle_frame(&state, viewer, frame.as_str()).await {
                            tracing::warn!("Viewer {} command not delivered: {}", viewer, err);
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = events.recv() => {
                match outgoing {
                    Ok(outbound) => {
                        if !outbound.audience.includes(viewer) {
                            continue;
                        }
                        if send_event(&mut socket, &outbound.event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Viewer {} lagged and skipped {} event(s)", viewer, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    tracing::info!("🔌 Dashboard disconnected: viewer {}", viewer);
}

/// Forwards one text frame to the simulation. Malformed frames and unknown
/// event names are logged and skipped; only a stopped simulation is an error.
pub(crate) async fn handle_frame(state: &AppState, viewer: ViewerId, frame: &str) -> Result<()> {
    match ViewerCommand::from_json(frame) {
        Ok(command) => state.sim.submit(Some(viewer), command).await,
        Err(err) => {
            tracing::warn!("Ignoring frame from viewer {}: {}", viewer, err);
            Ok(())
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> std::result::Result<(), axum::Error> {
    let payload = event.to_json().map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::core::simulation::spawn_simulation;
    use crate::domain::ports::NoTips;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_frames_reach_the_simulation() {
        let shutdown = CancellationToken::new();
        let (sim, _task) = spawn_simulation(&ConsoleConfig::default(), shutdown.clone());
        let state = AppState::new(sim.clone(), Arc::new(NoTips));
        let mut rx = sim.subscribe();

        handle_frame(&state, 1, r#"{"event":"simulate-call","data":{"scenario":"medical"}}"#)
            .await
            .unwrap();

        let outbound = rx.recv().await.unwrap();
        assert_eq!(outbound.event.name(), "new-call");
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_garbage_frames_are_ignored() {
        let shutdown = CancellationToken::new();
        let (sim, _task) = spawn_simulation(&ConsoleConfig::default(), shutdown.clone());
        let state = AppState::new(sim, Arc::new(NoTips));

        assert!(handle_frame(&state, 1, "not json").await.is_ok());
        assert!(handle_frame(&state, 1, r#"{"event":"self-destruct","data":{}}"#).await.is_ok());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_viewer_ids_are_unique() {
        let shutdown = CancellationToken::new();
        let (sim, _task) = spawn_simulation(&ConsoleConfig::default(), shutdown.clone());
        let state = AppState::new(sim, Arc::new(NoTips));

        let a = state.next_viewer_id();
        let b = state.clone().next_viewer_id();
        assert_ne!(a, b);
        shutdown.cancel();
    }
}
