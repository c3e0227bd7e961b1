//! Steuerungs-Nachrichten (HTTP)
//!
//! Echo-Bestaetigungen, Abschlussbericht, Diagnose und die Standard-Antworten
//! der REST-Endpunkte.

use chrono::{DateTime, Utc};
use levelcast_core::types::SubscriberId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Standard-Antworten
// ---------------------------------------------------------------------------

/// `{"ok": true}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn neu(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// `{"status": "OK"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Echo und Abschlussbericht
// ---------------------------------------------------------------------------

/// Echo-Bestaetigung eines Abonnenten (`POST /waveform_cross_time`)
///
/// `duration` ist die vom Client gemessene Laufzeit in Sekunden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchoRequest {
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Abschlussbericht des Clients (`POST /shutdown`)
///
/// Der Inhalt ist frei: der Client meldet seine eigenen Zaehlerstaende.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub inhalt: serde_json::Value,
    pub empfangen_um: DateTime<Utc>,
}

impl FinalReport {
    pub fn neu(inhalt: serde_json::Value) -> Self {
        Self {
            inhalt,
            empfangen_um: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown-Phase und Zaehler
// ---------------------------------------------------------------------------

/// Phase des gezaehlten Shutdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShutdownPhase {
    Running,
    Draining,
    AwaitingFinalReport,
    Terminated,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "RUNNING",
            Self::Draining => "DRAINING",
            Self::AwaitingFinalReport => "AWAITING_FINAL_REPORT",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

/// Momentaufnahme der Echo-Zaehler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoSummary {
    pub events_fired: u64,
    pub events_echoed: u64,
    /// Echos, die zum Zeitpunkt ihres Eintreffens ueber `events_fired` lagen
    pub excess_echoes: u64,
    pub first_echo: Option<DateTime<Utc>>,
    pub last_echo: Option<DateTime<Utc>>,
    /// Zeitspanne erstes bis letztes Echo in Sekunden
    pub echo_span_secs: Option<f64>,
    pub duration_avg: Option<f64>,
    pub duration_min: Option<f64>,
    pub duration_max: Option<f64>,
}

// ---------------------------------------------------------------------------
// Diagnose
// ---------------------------------------------------------------------------

/// Oeffentliche Sicht auf einen Abonnenten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    pub peer: Option<String>,
    pub connected_at: DateTime<Utc>,
}

/// Antwort von `GET /diagnostics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    pub audio_clients: usize,
    pub waveform_clients: usize,
    pub audio: Vec<SubscriberInfo>,
    pub waveforms: Vec<SubscriberInfo>,
    pub echo: EchoSummary,
    pub phase: ShutdownPhase,
    pub final_report: Option<FinalReport>,
}
