//! Waveform-Endpunkte
//!
//! - `GET /waveforms` – alle gespeicherten Waveforms
//! - `POST /waveforms` – Waveform anhaengen
//! - `GET /waveforms/ws` – initialer Stand, danach ein Update pro Anhaengen

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::{Json, Response};
use levelcast_library::LibraryError;
use levelcast_protocol::{OkResponse, WaveformRecord, WaveformUpdate, WaveformUpload};

use crate::error::ApiResult;
use crate::handlers::ws::verbindung_bedienen;
use crate::state::ApiState;

pub async fn list_waveforms(State(state): State<ApiState>) -> Json<Vec<WaveformRecord>> {
    Json(state.bibliothek.auflisten())
}

pub async fn create_waveform(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<Json<OkResponse>> {
    // Kein oder kaputtes JSON zaehlt wie fehlende Felder
    let upload = serde_json::from_slice::<WaveformUpload>(&body)
        .map_err(|_| LibraryError::FehlendeDaten)?;
    let erreicht = state.bibliothek.hinzufuegen(upload)?;
    tracing::debug!(erreicht, "Waveform-Update verteilt");
    Ok(Json(OkResponse::ok()))
}

pub async fn waveforms_ws(
    State(state): State<ApiState>,
    verbindung: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let peer = verbindung.map(|ConnectInfo(addr)| addr.to_string());
    let (empfang, initial) = state.bibliothek.abonnieren(peer)?;
    state.subscriber_metriken_aktualisieren();

    let registry = state.bibliothek.registry().clone();
    let initial = serde_json::to_string(&initial).ok();
    Ok(ws.on_upgrade(move |socket| async move {
        verbindung_bedienen(socket, empfang, registry, initial, |update: WaveformUpdate| {
            serde_json::to_string(&update).ok()
        })
        .await;
        state.subscriber_metriken_aktualisieren();
    }))
}
