//! Shutdown-Koordinator – gezaehlter, geordneter Ablauf bis zum Prozessende
//!
//! ## Phasen
//! ```text
//! RUNNING --(Schwelle erreicht)--> DRAINING --> AWAITING_FINAL_REPORT --> TERMINATED
//! ```
//!
//! - DRAINING: alle Registries schliessen, Broadcast-Loop stoppen,
//!   Zusammenfassung loggen
//! - AWAITING_FINAL_REPORT: begrenzt auf den Abschlussbericht warten
//! - TERMINATED: Host-Anwendung ueber das Shutdown-Signal beenden

use std::sync::Arc;
use std::time::Duration;

use levelcast_observability::LevelcastMetrics;
use levelcast_protocol::{EchoSummary, FinalReport, ShutdownPhase};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::counters::{EchoCounters, EchoErgebnis};
use crate::registry::Schliessbar;

/// Standard-Zeitlimit fuer den Abschlussbericht
pub const STANDARD_REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Konfiguration des Shutdown-Koordinators
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Anzahl Bestaetigungen bis zum Shutdown (None = unbegrenzt laufen)
    pub echo_schwelle: Option<u64>,
    /// Wartezeit auf den Abschlussbericht
    pub report_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            echo_schwelle: None,
            report_timeout: STANDARD_REPORT_TIMEOUT,
        }
    }
}

/// Wie der Shutdown zu Ende gegangen ist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownAusgang {
    /// Abschlussbericht rechtzeitig eingegangen
    MitAbschlussbericht,
    /// Zeitlimit ohne Abschlussbericht abgelaufen
    OhneAbschlussbericht,
    /// Von aussen beendet (Signal), ohne Warten
    Abgebrochen,
}

/// Koordiniert den gezaehlten Shutdown
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: ShutdownConfig,
    zaehler: Arc<EchoCounters>,
    registries: Vec<Arc<dyn Schliessbar>>,
    /// Stop-Signal fuer den Broadcast-Loop
    stop_tx: watch::Sender<bool>,
    /// Abschlussbericht (None bis er eingeht)
    report_tx: watch::Sender<Option<FinalReport>>,
    /// Shutdown-Signal fuer die Host-Anwendung
    app_tx: watch::Sender<bool>,
    /// Spiegel der Phase fuer Beobachter (Health, Server)
    phase_tx: watch::Sender<ShutdownPhase>,
    ausgang: Mutex<Option<ShutdownAusgang>>,
    metriken: Option<LevelcastMetrics>,
}

impl ShutdownCoordinator {
    /// Erstellt einen Koordinator ueber den uebergebenen Registries
    pub fn neu(
        config: ShutdownConfig,
        zaehler: Arc<EchoCounters>,
        registries: Vec<Arc<dyn Schliessbar>>,
    ) -> Self {
        Self::erstellen(config, zaehler, registries, None)
    }

    /// Wie `neu`, zaehlt Bestaetigungen zusaetzlich in den Metriken
    pub fn mit_metriken(
        config: ShutdownConfig,
        zaehler: Arc<EchoCounters>,
        registries: Vec<Arc<dyn Schliessbar>>,
        metriken: LevelcastMetrics,
    ) -> Self {
        Self::erstellen(config, zaehler, registries, Some(metriken))
    }

    fn erstellen(
        config: ShutdownConfig,
        zaehler: Arc<EchoCounters>,
        registries: Vec<Arc<dyn Schliessbar>>,
        metriken: Option<LevelcastMetrics>,
    ) -> Self {
        let phase = zaehler.phase();
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                zaehler,
                registries,
                stop_tx: watch::channel(false).0,
                report_tx: watch::channel(None).0,
                app_tx: watch::channel(false).0,
                phase_tx: watch::channel(phase).0,
                ausgang: Mutex::new(None),
                metriken,
            }),
        }
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.inner.config
    }

    pub fn zaehler(&self) -> &Arc<EchoCounters> {
        &self.inner.zaehler
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.inner.zaehler.phase()
    }

    /// Empfaenger fuer das Stop-Signal des Broadcast-Loops
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.inner.stop_tx.subscribe()
    }

    /// Empfaenger fuer das Shutdown-Signal der Host-Anwendung
    pub fn app_signal(&self) -> watch::Receiver<bool> {
        self.inner.app_tx.subscribe()
    }

    pub fn phase_beobachten(&self) -> watch::Receiver<ShutdownPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Wartet bis die Host-Anwendung beendet werden soll
    ///
    /// Geeignet fuer `axum::serve(..).with_graceful_shutdown(..)`.
    pub async fn beendet(&self) {
        let mut rx = self.app_signal();
        // Sender lebt so lange wie der Koordinator
        let _ = rx.wait_for(|beendet| *beendet).await;
    }

    /// Erfasst eine gueltige Bestaetigung
    ///
    /// Erreicht sie die Schwelle, laeuft der restliche Shutdown in einer
    /// eigenen Task weiter; der Aufrufer wartet nicht darauf.
    pub fn echo_erfassen(&self, dauer: f64) -> EchoErgebnis {
        let ergebnis = self
            .inner
            .zaehler
            .echo_erfassen(dauer, self.inner.config.echo_schwelle);

        if let Some(m) = &self.inner.metriken {
            m.events_echoed_total.inc();
        }

        if let EchoErgebnis::SchwelleErreicht(zusammenfassung) = &ergebnis {
            tracing::info!(
                schwelle = ?self.inner.config.echo_schwelle,
                "Echo-Schwelle erreicht, Shutdown beginnt"
            );
            let koordinator = self.clone();
            let zusammenfassung = zusammenfassung.clone();
            tokio::spawn(async move {
                koordinator.abschalten(zusammenfassung).await;
            });
        }

        ergebnis
    }

    /// Nimmt den Abschlussbericht entgegen
    ///
    /// Ein spaeterer Bericht ersetzt einen frueheren.
    pub fn final_report_empfangen(&self, inhalt: serde_json::Value) {
        tracing::info!(phase = %self.phase(), "Abschlussbericht empfangen: {inhalt}");
        self.inner
            .report_tx
            .send_replace(Some(FinalReport::neu(inhalt)));
    }

    pub fn final_report(&self) -> Option<FinalReport> {
        self.inner.report_tx.borrow().clone()
    }

    /// Wie der Shutdown ausgegangen ist (None solange er nicht beendet ist)
    pub fn ausgang(&self) -> Option<ShutdownAusgang> {
        *self.inner.ausgang.lock()
    }

    /// Fuehrt DRAINING, AWAITING_FINAL_REPORT und TERMINATED aus
    ///
    /// Wird nach dem Erreichen der Schwelle aufgerufen. Fehler beim
    /// Schliessen halten den Ablauf nicht auf.
    pub async fn abschalten(&self, zusammenfassung: EchoSummary) {
        self.phase_wechseln(ShutdownPhase::Draining);
        self.abbauen();
        zusammenfassung_loggen(&zusammenfassung);

        self.phase_wechseln(ShutdownPhase::AwaitingFinalReport);
        let ausgang = self.auf_report_warten().await;
        self.beenden(ausgang);
    }

    /// Sofortiges Beenden von aussen (z.B. Ctrl-C), ohne auf den Bericht zu warten
    pub fn abbrechen(&self) {
        if self.phase() == ShutdownPhase::Terminated {
            return;
        }
        tracing::info!(phase = %self.phase(), "Shutdown von aussen angefordert");
        if self.phase() == ShutdownPhase::Running {
            self.phase_wechseln(ShutdownPhase::Draining);
        }
        self.abbauen();
        self.beenden(ShutdownAusgang::Abgebrochen);
    }

    fn abbauen(&self) {
        for registry in &self.inner.registries {
            let getrennt = registry.alle_schliessen();
            tracing::debug!(registry = registry.name(), getrennt, "Registry geschlossen");
        }
        self.inner.stop_tx.send_replace(true);
    }

    async fn auf_report_warten(&self) -> ShutdownAusgang {
        let mut rx = self.inner.report_tx.subscribe();
        let timeout = self.inner.config.report_timeout;
        // Der `Ref` aus `wait_for` darf `rx` nicht ueberleben
        let ergebnis = tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .map(|r| r.map(|_| ()));
        match ergebnis {
            Ok(Ok(())) => {
                tracing::info!("Abschlussbericht liegt vor");
                ShutdownAusgang::MitAbschlussbericht
            }
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Kein Abschlussbericht innerhalb des Zeitlimits"
                );
                ShutdownAusgang::OhneAbschlussbericht
            }
        }
    }

    /// TERMINATED setzen und die Host-Anwendung benachrichtigen (idempotent)
    fn beenden(&self, ausgang: ShutdownAusgang) {
        {
            let mut gesetzt = self.inner.ausgang.lock();
            if gesetzt.is_some() {
                return;
            }
            *gesetzt = Some(ausgang);
        }
        self.phase_wechseln(ShutdownPhase::Terminated);
        tracing::info!(ausgang = ?ausgang, "Shutdown abgeschlossen, beende Anwendung");
        self.inner.app_tx.send_replace(true);
    }

    fn phase_wechseln(&self, phase: ShutdownPhase) {
        self.inner.zaehler.phase_setzen(phase);
        self.phase_melden(phase);
    }

    fn phase_melden(&self, phase: ShutdownPhase) {
        self.inner.phase_tx.send_replace(phase);
    }
}

fn zusammenfassung_loggen(s: &EchoSummary) {
    tracing::info!(
        events_fired = s.events_fired,
        events_echoed = s.events_echoed,
        excess_echoes = s.excess_echoes,
        duration_avg = ?s.duration_avg,
        duration_min = ?s.duration_min,
        duration_max = ?s.duration_max,
        echo_span_secs = ?s.echo_span_secs,
        "Zusammenfassung der Echo-Messung"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriberRegistry;

    fn koordinator(schwelle: Option<u64>) -> (ShutdownCoordinator, SubscriberRegistry<String>) {
        let registry = SubscriberRegistry::<String>::neu("audio");
        let koordinator = ShutdownCoordinator::neu(
            ShutdownConfig {
                echo_schwelle: schwelle,
                report_timeout: Duration::from_secs(5),
            },
            Arc::new(EchoCounters::neu()),
            vec![Arc::new(registry.clone())],
        );
        (koordinator, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn bericht_beendet_wartephase() {
        let (k, registry) = koordinator(Some(1));
        let _empfang = registry.hinzufuegen(None).unwrap();
        k.zaehler().fired_addieren(1);

        let task = {
            let k = k.clone();
            tokio::spawn(async move { k.abschalten(EchoSummary::default()).await })
        };
        tokio::task::yield_now().await;
        k.final_report_empfangen(serde_json::json!({"received": 3}));
        task.await.unwrap();

        assert!(registry.ist_leer());
        assert!(*k.stop_signal().borrow());

        assert_eq!(k.ausgang(), Some(ShutdownAusgang::MitAbschlussbericht));
        assert_eq!(k.phase(), ShutdownPhase::Terminated);
        assert!(*k.app_signal().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn ohne_bericht_nach_timeout_beendet() {
        let (k, _registry) = koordinator(Some(1));
        let start = tokio::time::Instant::now();
        k.abschalten(EchoSummary::default()).await;

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(k.ausgang(), Some(ShutdownAusgang::OhneAbschlussbericht));
        assert!(k.final_report().is_none());
    }

    #[tokio::test]
    async fn abbrechen_ist_idempotent() {
        let (k, registry) = koordinator(None);
        let _empfang = registry.hinzufuegen(None).unwrap();
        k.abbrechen();
        k.abbrechen();

        assert_eq!(k.ausgang(), Some(ShutdownAusgang::Abgebrochen));
        assert!(registry.ist_geschlossen());
        k.beendet().await;
    }

    #[tokio::test]
    async fn ohne_schwelle_kein_shutdown() {
        let (k, _registry) = koordinator(None);
        k.zaehler().fired_addieren(100);
        for _ in 0..50 {
            k.echo_erfassen(0.1);
        }
        assert_eq!(k.phase(), ShutdownPhase::Running);
        assert!(!*k.stop_signal().borrow());
    }
}
