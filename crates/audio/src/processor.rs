//! Pegel-Verarbeitung
//!
//! Pro Tick wird genau ein Frame verarbeitet:
//! 1. Peak-Normalisierung (entfaellt bei reiner Stille)
//! 2. RMS des normalisierten Frames
//! 3. Gleitender Mittelwert ueber die letzten `fenster` RMS-Werte
//! 4. Schwelle relativ zur Baseline -> Lautstaerke-Stufe 0..=500

use std::collections::VecDeque;

use crate::frame::Frame;

/// Standard-Groesse des Glaettungsfensters
pub const STANDARD_FENSTER: usize = 4;

/// Standard-Abstand zur Baseline, ab dem Signal als Pegel gilt
pub const STANDARD_SCHWELLE: f32 = 0.02;

/// Hoechste Lautstaerke-Stufe
pub const MAX_PEGEL: u16 = 500;

/// Konfiguration des Verarbeiters
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Anzahl RMS-Werte im gleitenden Mittelwert
    pub fenster: usize,
    /// Abstand ueber der Baseline, ab dem ein Pegel gemeldet wird
    pub schwelle_ueber_baseline: f32,
    /// Kalibrierter Umgebungspegel
    pub baseline: f32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            fenster: STANDARD_FENSTER,
            schwelle_ueber_baseline: STANDARD_SCHWELLE,
            baseline: 0.0,
        }
    }
}

/// Ergebnis eines Ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSample {
    pub raw_rms: f32,
    pub smoothed_rms: f32,
    pub volume_level: u16,
}

// ---------------------------------------------------------------------------
// SmoothingWindow
// ---------------------------------------------------------------------------

/// FIFO der letzten `kapazitaet` RMS-Werte
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    werte: VecDeque<f32>,
    kapazitaet: usize,
}

impl SmoothingWindow {
    pub fn new(kapazitaet: usize) -> Self {
        let kapazitaet = kapazitaet.max(1);
        Self {
            werte: VecDeque::with_capacity(kapazitaet),
            kapazitaet,
        }
    }

    /// Fuegt einen Wert hinzu und verdraengt bei Bedarf den aeltesten
    pub fn push(&mut self, wert: f32) {
        if self.werte.len() == self.kapazitaet {
            self.werte.pop_front();
        }
        self.werte.push_back(wert);
    }

    /// Arithmetisches Mittel der enthaltenen Werte (0.0 wenn leer)
    pub fn mittelwert(&self) -> f32 {
        if self.werte.is_empty() {
            return 0.0;
        }
        self.werte.iter().sum::<f32>() / self.werte.len() as f32
    }

    pub fn len(&self) -> usize {
        self.werte.len()
    }

    pub fn is_empty(&self) -> bool {
        self.werte.is_empty()
    }

    pub fn kapazitaet(&self) -> usize {
        self.kapazitaet
    }
}

// ---------------------------------------------------------------------------
// Reine Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Normalisiert die Samples auf Spitzenwert 1.0.
///
/// Gibt den urspruenglichen Spitzenwert zurueck. Bei Spitzenwert 0 bleiben
/// die Samples unveraendert.
pub fn normalisieren(samples: &mut [f32]) -> f32 {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
    peak
}

/// Root-Mean-Square; 0.0 fuer leere Eingabe
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Bildet den geglaetteten RMS auf die Stufe 0..=500 ab.
///
/// Gleichheit mit `baseline + schwelle` zaehlt als Stille.
pub fn pegel_berechnen(smoothed_rms: f32, baseline: f32, schwelle: f32) -> u16 {
    if !smoothed_rms.is_finite() || smoothed_rms <= baseline + schwelle {
        return 0;
    }
    let stufe = (smoothed_rms * MAX_PEGEL as f32).round();
    if !stufe.is_finite() {
        return 0;
    }
    stufe.clamp(1.0, MAX_PEGEL as f32) as u16
}

// ---------------------------------------------------------------------------
// SignalProcessor
// ---------------------------------------------------------------------------

/// Erzeugt pro Frame einen `DerivedSample`
///
/// Besitzt das Glaettungsfenster exklusiv; wird nur aus der Broadcast-Loop
/// heraus benutzt.
#[derive(Debug, Clone)]
pub struct SignalProcessor {
    config: ProcessorConfig,
    fenster: SmoothingWindow,
}

impl SignalProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        let fenster = SmoothingWindow::new(config.fenster);
        Self { config, fenster }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn fenster(&self) -> &SmoothingWindow {
        &self.fenster
    }

    /// Verarbeitet einen Frame zu einem `DerivedSample`
    pub fn process(&mut self, frame: Frame) -> DerivedSample {
        let mut samples = frame.into_samples();
        normalisieren(&mut samples);
        let raw = rms(&samples);

        // Nicht-endliche Werte (defekte Frames) duerfen das Fenster nicht vergiften
        if !raw.is_finite() {
            return DerivedSample {
                raw_rms: 0.0,
                smoothed_rms: self.fenster.mittelwert(),
                volume_level: 0,
            };
        }

        self.fenster.push(raw);
        let smoothed = self.fenster.mittelwert();
        let volume_level = pegel_berechnen(
            smoothed,
            self.config.baseline,
            self.config.schwelle_ueber_baseline,
        );

        DerivedSample {
            raw_rms: raw,
            smoothed_rms: smoothed,
            volume_level,
        }
    }
}
