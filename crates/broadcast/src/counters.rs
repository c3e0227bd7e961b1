//! Echo-Zaehler – gesendete und bestaetigte Pegel-Nachrichten
//!
//! Alle Zaehler und die Shutdown-Phase liegen hinter einem Mutex. Der
//! Uebergang RUNNING -> DRAINING wird unter diesem Lock entschieden und
//! passiert damit genau einmal; die Folgeaktionen laufen ausserhalb.

use chrono::{DateTime, Utc};
use levelcast_protocol::{EchoSummary, ShutdownPhase};
use parking_lot::Mutex;

/// Ergebnis einer erfassten Bestaetigung
#[derive(Debug, Clone, PartialEq)]
pub enum EchoErgebnis {
    /// Gezaehlt, keine Schwelle erreicht
    Gezaehlt { echoed: u64 },
    /// Diese Bestaetigung hat die Schwelle erreicht; der Aufrufer leitet den Shutdown ein
    SchwelleErreicht(EchoSummary),
}

#[derive(Debug)]
struct Zaehlerstand {
    fired: u64,
    echoed: u64,
    excess: u64,
    first_echo: Option<DateTime<Utc>>,
    last_echo: Option<DateTime<Utc>>,
    dauer_summe: f64,
    dauer_anzahl: u64,
    dauer_min: Option<f64>,
    dauer_max: Option<f64>,
    phase: ShutdownPhase,
}

impl Default for Zaehlerstand {
    fn default() -> Self {
        Self {
            fired: 0,
            echoed: 0,
            excess: 0,
            first_echo: None,
            last_echo: None,
            dauer_summe: 0.0,
            dauer_anzahl: 0,
            dauer_min: None,
            dauer_max: None,
            phase: ShutdownPhase::Running,
        }
    }
}

impl Zaehlerstand {
    fn zusammenfassung(&self) -> EchoSummary {
        let echo_span_secs = match (self.first_echo, self.last_echo) {
            (Some(erstes), Some(letztes)) => {
                Some((letztes - erstes).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
            }
            _ => None,
        };
        let duration_avg =
            (self.dauer_anzahl > 0).then(|| self.dauer_summe / self.dauer_anzahl as f64);

        EchoSummary {
            events_fired: self.fired,
            events_echoed: self.echoed,
            excess_echoes: self.excess,
            first_echo: self.first_echo,
            last_echo: self.last_echo,
            echo_span_secs,
            duration_avg,
            duration_min: self.dauer_min,
            duration_max: self.dauer_max,
        }
    }
}

/// Gemeinsame Zaehler fuer Broadcast-Loop und Bestaetigungs-Handler
#[derive(Debug, Default)]
pub struct EchoCounters {
    stand: Mutex<Zaehlerstand>,
}

impl EchoCounters {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Addiert erfolgreiche Sendungen eines Ticks
    ///
    /// Als gesendet gilt eine Nachricht, sobald sie in der Send-Queue des
    /// Subscribers liegt. Wird der Subscriber danach getrennt, verwirft die
    /// Verbindung noch eingereihte Nachrichten; sie bleiben mitgezaehlt.
    pub fn fired_addieren(&self, anzahl: u64) {
        if anzahl > 0 {
            self.stand.lock().fired += anzahl;
        }
    }

    /// Erfasst eine gueltige Bestaetigung mit ihrer gemessenen Dauer
    ///
    /// Bei gesetzter `schwelle` meldet genau die Bestaetigung, mit der
    /// `events_echoed` die Schwelle erreicht, `SchwelleErreicht`; die Phase
    /// steht danach auf DRAINING.
    pub fn echo_erfassen(&self, dauer: f64, schwelle: Option<u64>) -> EchoErgebnis {
        let jetzt = Utc::now();
        let mut stand = self.stand.lock();

        stand.echoed += 1;
        if stand.first_echo.is_none() {
            stand.first_echo = Some(jetzt);
        }
        stand.last_echo = Some(jetzt);

        if dauer.is_finite() {
            stand.dauer_summe += dauer;
            stand.dauer_anzahl += 1;
            stand.dauer_min = Some(stand.dauer_min.map_or(dauer, |m| m.min(dauer)));
            stand.dauer_max = Some(stand.dauer_max.map_or(dauer, |m| m.max(dauer)));
        }

        if stand.echoed > stand.fired {
            stand.excess += 1;
            tracing::warn!(
                fired = stand.fired,
                echoed = stand.echoed,
                "Mehr Bestaetigungen als gesendete Nachrichten"
            );
        }

        let erreicht = schwelle.is_some_and(|s| stand.echoed >= s);
        if erreicht && stand.phase == ShutdownPhase::Running {
            stand.phase = ShutdownPhase::Draining;
            return EchoErgebnis::SchwelleErreicht(stand.zusammenfassung());
        }

        EchoErgebnis::Gezaehlt {
            echoed: stand.echoed,
        }
    }

    /// Setzt die Phase und gibt die vorherige zurueck
    pub fn phase_setzen(&self, phase: ShutdownPhase) -> ShutdownPhase {
        std::mem::replace(&mut self.stand.lock().phase, phase)
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.stand.lock().phase
    }

    pub fn fired(&self) -> u64 {
        self.stand.lock().fired
    }

    pub fn echoed(&self) -> u64 {
        self.stand.lock().echoed
    }

    pub fn zusammenfassung(&self) -> EchoSummary {
        self.stand.lock().zusammenfassung()
    }
}
