//! Pegelanzeige fuer das Log
//!
//! Sammelt die Roh-RMS-Werte und liefert alle `intervall` eine Zeile aus
//! Punkten (mindestens einer, hoechstens 50), deren Laenge dem mittleren
//! Pegel entspricht.

use std::time::{Duration, Instant};

/// Standard-Intervall der Pegelanzeige
pub const STANDARD_INTERVALL: Duration = Duration::from_secs(5);

const MAX_PUNKTE: usize = 50;

#[derive(Debug)]
pub struct LevelMeter {
    intervall: Duration,
    start: Instant,
    summe: f64,
    anzahl: u64,
}

impl LevelMeter {
    pub fn new(intervall: Duration, jetzt: Instant) -> Self {
        Self {
            intervall,
            start: jetzt,
            summe: 0.0,
            anzahl: 0,
        }
    }

    /// Erfasst einen Wert; gibt nach Ablauf des Intervalls die Anzeigezeile zurueck
    pub fn erfassen(&mut self, raw_rms: f32, jetzt: Instant) -> Option<String> {
        if raw_rms.is_finite() {
            self.summe += raw_rms as f64;
            self.anzahl += 1;
        }
        if jetzt.duration_since(self.start) < self.intervall {
            return None;
        }
        let mittel = if self.anzahl > 0 {
            self.summe / self.anzahl as f64
        } else {
            0.0
        };
        self.start = jetzt;
        self.summe = 0.0;
        self.anzahl = 0;
        Some(balken(mittel))
    }
}

fn balken(mittel: f64) -> String {
    let punkte = ((mittel * 100.0) as usize).clamp(1, MAX_PUNKTE);
    ".".repeat(punkte)
}
