//! levelcast-protocol – Nachrichten zwischen Server und Abonnenten
//!
//! Alle Nachrichten werden als JSON uebertragen:
//! - `audio`: Pegel-Nachricht pro Tick (WebSocket `/audio`)
//! - `control`: Echo, Abschlussbericht, Diagnose, Standard-Antworten
//! - `waveform`: Waveform-Eintraege und Update-Benachrichtigungen

pub mod audio;
pub mod control;
pub mod waveform;

pub use audio::VolumeMessage;
pub use control::{
    DiagnosticsResponse, EchoRequest, EchoSummary, ErrorResponse, FinalReport, OkResponse,
    ShutdownPhase, StatusResponse, SubscriberInfo,
};
pub use waveform::{WaveformRecord, WaveformUpdate, WaveformUpload};
