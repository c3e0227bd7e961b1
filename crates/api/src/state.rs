//! Geteilter Zustand aller Handler

use std::sync::Arc;

use levelcast_broadcast::{ShutdownCoordinator, SubscriberRegistry};
use levelcast_library::WaveformLibrary;
use levelcast_observability::LevelcastMetrics;

/// Axum-State der levelcast-API
///
/// Alle Felder sind Arc-geteilte Handles; Clone ist billig.
#[derive(Clone)]
pub struct ApiState {
    /// Registry der `/audio`-Verbindungen
    pub audio: SubscriberRegistry<String>,
    /// Waveform-Bibliothek inklusive Waveform-Registry
    pub bibliothek: Arc<WaveformLibrary>,
    /// Zaehlt Bestaetigungen und steuert den Shutdown
    pub koordinator: ShutdownCoordinator,
    pub metriken: LevelcastMetrics,
}

impl ApiState {
    pub fn neu(
        audio: SubscriberRegistry<String>,
        bibliothek: Arc<WaveformLibrary>,
        koordinator: ShutdownCoordinator,
        metriken: LevelcastMetrics,
    ) -> Self {
        Self {
            audio,
            bibliothek,
            koordinator,
            metriken,
        }
    }

    /// Aktualisiert die Subscriber-Gauges beider Registries
    pub fn subscriber_metriken_aktualisieren(&self) {
        self.metriken
            .subscriber_setzen(self.audio.name(), self.audio.anzahl());
        let waveform = self.bibliothek.registry();
        self.metriken
            .subscriber_setzen(waveform.name(), waveform.anzahl());
    }
}
