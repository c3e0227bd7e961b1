//! Status- und Diagnose-Endpunkte

use axum::extract::State;
use axum::response::Json;
use levelcast_protocol::{DiagnosticsResponse, StatusResponse};

use crate::state::ApiState;

/// `GET /`
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

/// `GET /diagnostics` – Subscriber, Zaehler und Shutdown-Phase
pub async fn diagnostics(State(state): State<ApiState>) -> Json<DiagnosticsResponse> {
    let waveform = state.bibliothek.registry();
    Json(DiagnosticsResponse {
        audio_clients: state.audio.anzahl(),
        waveform_clients: waveform.anzahl(),
        audio: state.audio.infos(),
        waveforms: waveform.infos(),
        echo: state.koordinator.zaehler().zusammenfassung(),
        phase: state.koordinator.phase(),
        final_report: state.koordinator.final_report(),
    })
}
