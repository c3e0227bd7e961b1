//! Prometheus-kompatible Metriken fuer levelcast
//!
//! Registrierte Metriken:
//! - `levelcast_ticks_total` – Counter: Verarbeitete Broadcast-Ticks
//! - `levelcast_frames_dropped` – Gauge: Verworfene Frames (Relay voll)
//! - `levelcast_events_fired_total` – Counter: Erfolgreich gesendete Pegel-Nachrichten
//! - `levelcast_events_echoed_total` – Counter: Eingegangene Bestaetigungen
//! - `levelcast_volume_level` – Gauge: Zuletzt gesendeter Pegel (0-500)
//! - `levelcast_subscribers` – Gauge: Verbundene Subscriber je Registry
//! - `levelcast_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `levelcast_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Alle levelcast-Prometheus-Metriken
///
/// Clone teilt die Registry; jede Instanz hat ihre eigene Registry,
/// damit mehrere Pipelines in einem Prozess nebeneinander laufen koennen.
#[derive(Clone)]
pub struct LevelcastMetrics {
    pub registry: Arc<Registry>,

    // Pipeline-Metriken
    pub ticks_total: IntCounter,
    pub frames_dropped: IntGauge,
    pub events_fired_total: IntCounter,
    pub events_echoed_total: IntCounter,
    pub volume_level: IntGauge,
    pub subscribers: IntGaugeVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl LevelcastMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let ticks_total = registrieren(
            &registry,
            IntCounter::new("levelcast_ticks_total", "Anzahl verarbeiteter Broadcast-Ticks")?,
        )?;
        let frames_dropped = registrieren(
            &registry,
            IntGauge::new(
                "levelcast_frames_dropped",
                "Anzahl verworfener Frames seit Start (Relay voll)",
            )?,
        )?;
        let events_fired_total = registrieren(
            &registry,
            IntCounter::new(
                "levelcast_events_fired_total",
                "Erfolgreich an Subscriber gesendete Pegel-Nachrichten",
            )?,
        )?;
        let events_echoed_total = registrieren(
            &registry,
            IntCounter::new(
                "levelcast_events_echoed_total",
                "Eingegangene Bestaetigungen von Subscribern",
            )?,
        )?;
        let volume_level = registrieren(
            &registry,
            IntGauge::new("levelcast_volume_level", "Zuletzt berechneter Pegel (0-500)")?,
        )?;
        let subscribers = registrieren(
            &registry,
            IntGaugeVec::new(
                Opts::new("levelcast_subscribers", "Aktuell verbundene Subscriber"),
                &["registry"],
            )?,
        )?;

        let http_requests_total = registrieren(
            &registry,
            IntCounterVec::new(
                Opts::new("levelcast_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
                &["method", "path", "status"],
            )?,
        )?;
        let http_request_duration_seconds = registrieren(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "levelcast_http_request_duration_seconds",
                    "HTTP-Antwortzeit in Sekunden",
                )
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
                &["method", "path"],
            )?,
        )?;

        // Prozess-Metriken (CPU, Speicher, Dateideskriptoren)
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry: Arc::new(registry),
            ticks_total,
            frames_dropped,
            events_fired_total,
            events_echoed_total,
            volume_level,
            subscribers,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Setzt die Subscriber-Anzahl einer Registry ("audio" oder "waveform")
    pub fn subscriber_setzen(&self, registry: &str, anzahl: usize) {
        self.subscribers
            .with_label_values(&[registry])
            .set(anzahl as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn registrieren<M>(registry: &Registry, metrik: M) -> Result<M>
where
    M: Collector + Clone + 'static,
{
    registry.register(Box::new(metrik.clone()))?;
    Ok(metrik)
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: LevelcastMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<LevelcastMetrics>) -> Response {
    match metriken.exportieren() {
        Ok(text) => ([(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())], text)
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
