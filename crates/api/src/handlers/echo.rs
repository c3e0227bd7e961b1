//! Bestaetigungen und Abschlussbericht
//!
//! - `POST /waveform_cross_time` – zaehlt eine Bestaetigung mit ihrer Dauer
//! - `POST /shutdown` – Abschlussbericht des Clients
//!
//! Beide Endpunkte antworten immer mit `{"ok": true}`; ein unbrauchbarer
//! Body wird nur geloggt.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use levelcast_protocol::{EchoRequest, OkResponse};

use crate::state::ApiState;

pub async fn waveform_cross_time(State(state): State<ApiState>, body: Bytes) -> Json<OkResponse> {
    match serde_json::from_slice::<EchoRequest>(&body) {
        Ok(EchoRequest {
            duration: Some(dauer),
        }) => {
            let ergebnis = state.koordinator.echo_erfassen(dauer);
            tracing::debug!(dauer, ergebnis = ?ergebnis, "Bestaetigung erfasst");
        }
        Ok(EchoRequest { duration: None }) => {
            tracing::warn!("Bestaetigung ohne duration ignoriert");
        }
        Err(e) => {
            tracing::warn!(
                body = %String::from_utf8_lossy(&body),
                "Unbrauchbare Bestaetigung ignoriert: {e}"
            );
        }
    }
    Json(OkResponse::ok())
}

pub async fn shutdown(State(state): State<ApiState>, body: Bytes) -> Json<OkResponse> {
    let inhalt = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or_else(|e| {
        tracing::warn!("Abschlussbericht ist kein JSON, wird als Text gespeichert: {e}");
        serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
    });
    state.koordinator.final_report_empfangen(inhalt);
    Json(OkResponse::ok())
}
