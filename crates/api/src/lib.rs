//! levelcast-api – HTTP- und WebSocket-Schnittstelle
//!
//! Endpunkte:
//! - `GET /` – Status
//! - `GET /audio` – WebSocket, ein `{"volume", "rms"}` pro Tick
//! - `POST /waveform_cross_time` – Bestaetigung mit Dauer
//! - `POST /shutdown` – Abschlussbericht
//! - `GET /diagnostics` – Subscriber, Zaehler, Shutdown-Phase
//! - `GET|POST /waveforms`, `GET /waveforms/ws` – Waveform-Bibliothek
//! - `GET /health`, `GET /metrics` – Observability

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::api_router;
pub use server::{app, cors_layer, ApiServer, ApiServerKonfig};
pub use state::ApiState;
