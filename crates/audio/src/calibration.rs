//! Baseline-Kalibrierung
//!
//! Misst den Umgebungspegel als Mittelwert der Frame-RMS-Werte und
//! legt ihn als Klartext-Datei ab. Beim Start wird der Wert einmalig
//! geladen und bleibt danach unveraendert.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{AudioError, AudioResult};
use crate::frame::Frame;
use crate::processor::{normalisieren, rms};
use crate::relay::FrameConsumer;

/// Standard-Dateiname der Baseline
pub const STANDARD_BASELINE_DATEI: &str = "baseline_volume.txt";

/// Standard-Messdauer der Kalibrierung
pub const STANDARD_MESSDAUER: Duration = Duration::from_secs(60);

/// Laedt die Baseline aus einer Textdatei
///
/// Eine fehlende Datei ergibt 0.0. Ein unlesbarer oder nicht endlicher
/// Inhalt ist ein Fehler, den der Aufrufer entscheidet.
pub fn baseline_laden(pfad: &Path) -> AudioResult<f32> {
    let inhalt = match std::fs::read_to_string(pfad) {
        Ok(inhalt) => inhalt,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(pfad = %pfad.display(), "Keine Baseline-Datei, verwende 0.0");
            return Ok(0.0);
        }
        Err(e) => return Err(AudioError::Io(e)),
    };

    let wert: f32 = inhalt
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| AudioError::UngueltigeBaseline {
            pfad: pfad.display().to_string(),
            grund: e.to_string(),
        })?;

    if !wert.is_finite() {
        return Err(AudioError::UngueltigeBaseline {
            pfad: pfad.display().to_string(),
            grund: format!("Wert nicht endlich: {wert}"),
        });
    }

    info!(pfad = %pfad.display(), baseline = wert, "Baseline geladen");
    Ok(wert)
}

/// Schreibt die Baseline als Klartext
pub fn baseline_speichern(pfad: &Path, wert: f32) -> AudioResult<()> {
    std::fs::write(pfad, format!("{wert}\n"))?;
    info!(pfad = %pfad.display(), baseline = wert, "Baseline gespeichert");
    Ok(())
}

/// Sammelt Frame-RMS-Werte fuer die Baseline
#[derive(Debug, Default)]
pub struct BaselineMessung {
    summe: f64,
    frames: u64,
}

impl BaselineMessung {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalisiert den Frame und nimmt seinen RMS-Wert auf
    ///
    /// Nicht endliche Werte werden ignoriert.
    pub fn frame_erfassen(&mut self, frame: Frame) {
        let mut samples = frame.into_samples();
        normalisieren(&mut samples);
        let wert = rms(&samples);
        if wert.is_finite() {
            self.summe += f64::from(wert);
            self.frames += 1;
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mittelwert aller erfassten RMS-Werte (0.0 ohne Frames)
    pub fn ergebnis(&self) -> f32 {
        if self.frames == 0 {
            return 0.0;
        }
        (self.summe / self.frames as f64) as f32
    }
}

/// Misst fuer `dauer` alle eintreffenden Frames und liefert den Mittelwert
///
/// Endet frueher, wenn der Relay geschlossen wird.
pub async fn baseline_kalibrieren(consumer: &mut FrameConsumer, dauer: Duration) -> f32 {
    let mut messung = BaselineMessung::new();
    let ende = Instant::now() + dauer;

    loop {
        match tokio::time::timeout_at(ende, consumer.empfangen()).await {
            Ok(Some(frame)) => messung.frame_erfassen(frame),
            Ok(None) => {
                debug!("Frame-Relay geschlossen, Kalibrierung endet vorzeitig");
                break;
            }
            Err(_) => break,
        }
    }

    info!(
        frames = messung.frames(),
        baseline = messung.ergebnis(),
        "Kalibrierung abgeschlossen"
    );
    messung.ergebnis()
}
