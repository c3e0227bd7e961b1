//! Route-Definitionen der HTTP-Schnittstelle

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::ApiState;

/// Erstellt den Router mit allen levelcast-Endpunkten
pub fn api_router() -> Router<ApiState> {
    Router::new()
        .route("/", get(handlers::status::root))
        .route("/diagnostics", get(handlers::status::diagnostics))
        // Pegel-Stream
        .route("/audio", get(handlers::audio::audio_ws))
        // Bestaetigungen und Shutdown
        .route(
            "/waveform_cross_time",
            post(handlers::echo::waveform_cross_time),
        )
        .route("/shutdown", post(handlers::echo::shutdown))
        // Waveform-Bibliothek
        .route(
            "/waveforms",
            get(handlers::waveforms::list_waveforms).post(handlers::waveforms::create_waveform),
        )
        .route("/waveforms/ws", get(handlers::waveforms::waveforms_ws))
}
