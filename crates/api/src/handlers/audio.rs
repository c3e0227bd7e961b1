//! `GET /audio` – WebSocket mit einem Pegelwert pro Tick

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::Response;

use crate::error::ApiResult;
use crate::handlers::ws::verbindung_bedienen;
use crate::state::ApiState;

pub async fn audio_ws(
    State(state): State<ApiState>,
    verbindung: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let peer = verbindung.map(|ConnectInfo(addr)| addr.to_string());
    // Vor dem Upgrade registrieren, damit ein Shutdown sauber mit 503 antwortet
    let empfang = state.audio.hinzufuegen(peer)?;
    state.subscriber_metriken_aktualisieren();

    let registry = state.audio.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        verbindung_bedienen(socket, empfang, registry, None, Some).await;
        state.subscriber_metriken_aktualisieren();
    }))
}
