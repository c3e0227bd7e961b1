//! Axum HTTP-Server fuer levelcast

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use levelcast_observability::{
    health_router, metrics_router, request_timing_layer, timing_middleware, HealthState,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::routes::api_router;
use crate::state::ApiState;

/// HTTP-Server-Konfiguration
#[derive(Debug, Clone)]
pub struct ApiServerKonfig {
    pub bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt.
    pub cors_origins: Vec<String>,
    /// Verzeichnis mit statischen Dateien (Frontend), optional
    pub static_dir: Option<PathBuf>,
}

impl Default for ApiServerKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origins: vec![],
            static_dir: None,
        }
    }
}

/// CORS konfigurieren: entweder spezifische Origins oder alle
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(h) => Some(h),
            Err(_) => {
                tracing::warn!(origin = %o, "Ungueltiger CORS-Origin ignoriert");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

/// Baut die vollstaendige Anwendung inklusive Health, Metriken und Layern
pub fn app(konfig: &ApiServerKonfig, state: ApiState, health: HealthState) -> Router {
    let metriken = state.metriken.clone();

    let mut app = api_router()
        .with_state(state)
        .merge(health_router(health))
        .merge(metrics_router(metriken.clone()));

    if let Some(dir) = &konfig.static_dir {
        tracing::info!(verzeichnis = %dir.display(), "Statische Dateien aktiviert");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(axum::middleware::from_fn_with_state(
        metriken,
        timing_middleware,
    ))
    .layer(request_timing_layer())
    .layer(cors_layer(&konfig.cors_origins))
}

/// Axum HTTP-Server fuer levelcast
pub struct ApiServer {
    konfig: ApiServerKonfig,
}

impl ApiServer {
    pub fn neu(konfig: ApiServerKonfig) -> Self {
        Self { konfig }
    }

    /// Bindet den Port und bedient Anfragen bis `shutdown` fertig ist
    pub async fn starten<F>(self, state: ApiState, health: HealthState, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = app(&self.konfig, state, health);

        let listener = tokio::net::TcpListener::bind(self.konfig.bind_addr)
            .await
            .with_context(|| format!("Port {} nicht verfuegbar", self.konfig.bind_addr))?;
        tracing::info!(addr = %self.konfig.bind_addr, "HTTP-Server gestartet");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        tracing::info!("HTTP-Server beendet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_konfig() {
        let konfig = ApiServerKonfig::default();
        assert_eq!(konfig.bind_addr.port(), 8000);
        assert!(konfig.cors_origins.is_empty());
        assert!(konfig.static_dir.is_none());
    }
}
