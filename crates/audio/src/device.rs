//! Audio-Geraete-Enumeration und -Auswahl
//!
//! Listet die verfuegbaren Eingabegeraete auf und laedt das gewuenschte
//! cpal-Geraet fuer den Capture.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AudioError, AudioResult};

/// Gaengige Abtastraten, die bei der Auflistung geprueft werden
const GEPRUEFTE_RATEN: [u32; 6] = [8000, 16000, 22050, 24000, 44100, 48000];

/// Repraesentiert ein Eingabegeraet mit seinen Eigenschaften
#[derive(Debug, Clone, Serialize)]
pub struct AudioDevice {
    /// Anzeigename des Geraets
    pub name: String,
    /// Unterstuetzte Abtastraten (aus `GEPRUEFTE_RATEN`)
    pub sample_rates: Vec<u32>,
    /// Maximale Kanalanzahl
    pub channels: u16,
    /// Ob es das Standard-Eingabegeraet ist
    pub standard: bool,
}

/// Listet alle verfuegbaren Eingabegeraete auf
///
/// Geraete, deren Eigenschaften cpal nicht liefern kann, werden mit einer
/// Warnung uebersprungen.
pub fn list_input_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let standard_name = host.default_input_device().and_then(|d| d.name().ok());

    let geraete: Vec<AudioDevice> = host
        .input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .filter_map(|device| match beschreiben(&device) {
            Ok(mut geraet) => {
                geraet.standard = standard_name.as_deref() == Some(geraet.name.as_str());
                Some(geraet)
            }
            Err(e) => {
                warn!("Eingabegeraet nicht lesbar: {e}");
                None
            }
        })
        .collect();

    debug!(anzahl = geraete.len(), "Eingabegeraete aufgelistet");
    Ok(geraete)
}

/// Beschreibung des Standard-Eingabegeraets, falls vorhanden
pub fn get_default_input() -> Option<AudioDevice> {
    let device = cpal::default_host().default_input_device()?;
    let mut geraet = beschreiben(&device).ok()?;
    geraet.standard = true;
    Some(geraet)
}

/// Laedt ein cpal-Eingabegeraet anhand eines Namensteils (None = Standard)
///
/// Der erste Treffer gewinnt; Geraete ohne lesbaren Namen werden ignoriert.
pub fn load_cpal_input_device(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    let Some(teil) = name else {
        return host
            .default_input_device()
            .ok_or(AudioError::KeinStandardEingabegeraet);
    };

    host.input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|device| device.name().is_ok_and(|n| n.contains(teil)))
        .ok_or_else(|| AudioError::GeraetNichtGefunden(teil.to_string()))
}

fn beschreiben(device: &Device) -> AudioResult<AudioDevice> {
    let name = device
        .name()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    let mut sample_rates = Vec::new();
    let mut channels = 1u16;
    for bereich in device.supported_input_configs().into_iter().flatten() {
        let (min, max) = (bereich.min_sample_rate().0, bereich.max_sample_rate().0);
        sample_rates.extend(
            GEPRUEFTE_RATEN
                .iter()
                .copied()
                .filter(|rate| (min..=max).contains(rate)),
        );
        channels = channels.max(bereich.channels());
    }
    sample_rates.sort_unstable();
    sample_rates.dedup();

    Ok(AudioDevice {
        name,
        sample_rates,
        channels,
        standard: false,
    })
}
