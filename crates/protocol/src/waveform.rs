//! Waveform-Nachrichten
//!
//! Waveforms sind benannte Zahlenfolgen, die Clients hochladen und die an
//! alle Waveform-Abonnenten verteilt werden.

use serde::{Deserialize, Serialize};

/// Gespeicherte Waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformRecord {
    pub name: String,
    pub data: Vec<f64>,
}

/// Upload-Body fuer `POST /waveforms`
///
/// Beide Felder sind optional, damit fehlende Felder als Validierungsfehler
/// gemeldet werden statt als Deserialisierungsfehler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaveformUpload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<f64>>,
}

/// Benachrichtigung an Waveform-Abonnenten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformUpdate {
    /// Immer `"update"`
    #[serde(rename = "type")]
    pub typ: String,
    pub waveforms: Vec<WaveformRecord>,
}

impl WaveformUpdate {
    pub fn neu(waveforms: Vec<WaveformRecord>) -> Self {
        Self {
            typ: "update".to_string(),
            waveforms,
        }
    }
}
