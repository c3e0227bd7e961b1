//! WaveformLibrary – Anhaengen, Auflisten und Abonnieren von Waveforms

use std::sync::Arc;

use levelcast_broadcast::{SubscriberEmpfang, SubscriberRegistry};
use levelcast_protocol::{WaveformRecord, WaveformUpdate, WaveformUpload};
use parking_lot::RwLock;

use crate::error::{LibraryError, LibraryResult};

/// Nur-anhaengende Liste von Waveforms mit Benachrichtigung der Abonnenten
///
/// Jedes Anhaengen verschickt die vollstaendige Liste als
/// `{"type": "update", ...}` an alle Abonnenten. Anhaengen und Verteilen
/// passieren unter derselben Schreibsperre, damit Abonnenten die Updates
/// in Anhaenge-Reihenfolge sehen.
pub struct WaveformLibrary {
    waveforms: RwLock<Vec<WaveformRecord>>,
    registry: SubscriberRegistry<WaveformUpdate>,
}

impl WaveformLibrary {
    /// Erstellt eine leere Bibliothek ueber der Waveform-Registry
    pub fn neu(registry: SubscriberRegistry<WaveformUpdate>) -> Arc<Self> {
        Arc::new(Self {
            waveforms: RwLock::new(Vec::new()),
            registry,
        })
    }

    pub fn registry(&self) -> &SubscriberRegistry<WaveformUpdate> {
        &self.registry
    }

    /// Alle Waveforms in Anhaenge-Reihenfolge
    pub fn auflisten(&self) -> Vec<WaveformRecord> {
        self.waveforms.read().clone()
    }

    pub fn anzahl(&self) -> usize {
        self.waveforms.read().len()
    }

    /// Validiert und haengt eine Waveform an
    ///
    /// Gibt die Anzahl der benachrichtigten Abonnenten zurueck.
    pub fn hinzufuegen(&self, upload: WaveformUpload) -> LibraryResult<usize> {
        let record = validieren(upload)?;

        let mut waveforms = self.waveforms.write();
        tracing::info!(
            name = %record.name,
            punkte = record.data.len(),
            gesamt = waveforms.len() + 1,
            "Waveform hinzugefuegt"
        );
        waveforms.push(record);

        let update = WaveformUpdate::neu(waveforms.clone());
        Ok(self.registry.an_alle_senden(&update))
    }

    /// Registriert einen Abonnenten
    ///
    /// Liefert die Empfangs-Seite und das initiale Update mit dem
    /// aktuellen Stand. Spaetere Anhaenge kommen ueber die Empfangs-Seite.
    pub fn abonnieren(
        &self,
        peer: Option<String>,
    ) -> LibraryResult<(SubscriberEmpfang<WaveformUpdate>, WaveformUpdate)> {
        let waveforms = self.waveforms.read();
        let empfang = self.registry.hinzufuegen(peer)?;
        Ok((empfang, WaveformUpdate::neu(waveforms.clone())))
    }
}

fn validieren(upload: WaveformUpload) -> LibraryResult<WaveformRecord> {
    match (upload.name, upload.data) {
        (Some(name), Some(data)) if !name.is_empty() && !data.is_empty() => {
            Ok(WaveformRecord { name, data })
        }
        _ => Err(LibraryError::FehlendeDaten),
    }
}
