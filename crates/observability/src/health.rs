//! Health-Check-Endpunkt fuer levelcast
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und ob der Audio-Capture laeuft

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub capture_running: bool,
    pub shutting_down: bool,
}

impl HealthStatus {
    /// Degraded bleibt 200, damit Probes nur beim Herunterfahren anschlagen
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Healthy | Self::Degraded => StatusCode::OK,
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Geteilter Zustand fuer den Health-Check-Handler
///
/// Clone teilt den Zustand; Server-Verdrahtung und Handler sehen dieselben Flags.
#[derive(Clone)]
pub struct HealthState {
    inner: Arc<HealthInner>,
}

struct HealthInner {
    gestartet: Instant,
    capture_aktiv: AtomicBool,
    herunterfahren: AtomicBool,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(HealthInner {
                gestartet: Instant::now(),
                capture_aktiv: AtomicBool::new(false),
                herunterfahren: AtomicBool::new(false),
            }),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.gestartet.elapsed().as_secs()
    }

    pub fn capture_laeuft(&self) -> bool {
        self.inner.capture_aktiv.load(Ordering::Relaxed)
    }

    pub fn capture_status_setzen(&self, aktiv: bool) {
        self.inner.capture_aktiv.store(aktiv, Ordering::Relaxed);
    }

    pub fn faehrt_herunter(&self) -> bool {
        self.inner.herunterfahren.load(Ordering::Relaxed)
    }

    /// Einmal gesetzt bleibt der Zustand bis zum Prozessende
    pub fn herunterfahren_setzen(&self) {
        self.inner.herunterfahren.store(true, Ordering::Relaxed);
    }

    /// Leitet den Status aus Capture und Shutdown-Zustand ab
    pub fn status(&self) -> HealthStatus {
        match (self.faehrt_herunter(), self.capture_laeuft()) {
            (true, _) => HealthStatus::Unhealthy,
            (false, true) => HealthStatus::Healthy,
            (false, false) => HealthStatus::Degraded,
        }
    }

    pub fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: self.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            capture_running: self.capture_laeuft(),
            shutting_down: self.faehrt_herunter(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let antwort = state.antwort();
    (antwort.status.http_status(), Json(antwort))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn health_state_frisch_ohne_capture() {
        let state = HealthState::neu();
        assert!(state.uptime_seconds() < 5);
        assert!(!state.capture_laeuft());
        assert_eq!(state.status(), HealthStatus::Degraded);
    }

    #[test]
    fn health_state_uebergaenge() {
        let state = HealthState::neu();
        state.capture_status_setzen(true);
        assert_eq!(state.status(), HealthStatus::Healthy);
        state.herunterfahren_setzen();
        assert_eq!(state.status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            capture_running: true,
            shutting_down: false,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"capture_running\":true"));
    }

    #[test]
    fn degraded_bleibt_erreichbar() {
        assert_eq!(HealthStatus::Degraded.http_status(), StatusCode::OK);
        assert_eq!(
            HealthStatus::Unhealthy.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn klone_teilen_den_zustand() {
        let state = HealthState::neu();
        let klon = state.clone();
        klon.capture_status_setzen(true);
        assert!(state.antwort().capture_running);
    }

    #[tokio::test]
    async fn endpunkt_meldet_503_beim_herunterfahren() {
        let state = HealthState::neu();
        state.herunterfahren_setzen();
        let response = health_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
