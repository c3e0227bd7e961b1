//! Pegel-Nachricht fuer den Audio-WebSocket
//!
//! Pro Verarbeitungs-Tick wird genau eine `VolumeMessage` an jeden
//! Abonnenten gesendet. Der Client sendet auf diesem Kanal nichts.

use serde::{Deserialize, Serialize};

/// Abgeleiteter Pegel eines Ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeMessage {
    /// Lautstaerke-Stufe 0..=500 (0 = Stille bzw. unter Baseline)
    pub volume: u16,
    /// Geglaetteter RMS-Wert des normalisierten Signals
    pub rms: f32,
}

impl VolumeMessage {
    pub fn neu(volume: u16, rms: f32) -> Self {
        Self { volume, rms }
    }

    /// Serialisiert die Nachricht als JSON-Text
    pub fn als_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_message_json_format() {
        let msg = VolumeMessage::neu(42, 0.25);
        let json = msg.als_json();
        assert_eq!(json, r#"{"volume":42,"rms":0.25}"#);
    }

    #[test]
    fn volume_message_roundtrip() {
        let msg = VolumeMessage::neu(500, 1.0);
        let zurueck: VolumeMessage = serde_json::from_str(&msg.als_json()).unwrap();
        assert_eq!(zurueck, msg);
    }
}
