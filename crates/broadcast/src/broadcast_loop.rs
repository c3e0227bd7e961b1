//! Broadcast-Loop – Tick-getriebene Pegel-Verteilung
//!
//! Pro Tick: Frame aus dem Relay holen, Pegel berechnen, Snapshot der
//! Audio-Registry ziehen und die Nachricht an jeden Subscriber senden.
//! Der Loop besitzt den Capture-Handle; beim Verlassen (auch bei Abbruch
//! der Task oder Panic) wird der Capture ueber `Drop` gestoppt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use levelcast_audio::{
    CaptureHandle, DerivedSample, Frame, FrameConsumer, LevelMeter, SignalProcessor,
};
use levelcast_observability::LevelcastMetrics;
use levelcast_protocol::VolumeMessage;
use tokio::sync::watch;

use crate::counters::EchoCounters;
use crate::registry::SubscriberRegistry;

/// Standard-Tickdauer
pub const STANDARD_TICK: Duration = Duration::from_millis(250);
/// Standard-Wartezeit auf einen Frame, bevor Stille verwendet wird
///
/// Groessere Werte werden im Loop auf eine Tick-Periode gekappt.
pub const STANDARD_POP_TIMEOUT: Duration = STANDARD_TICK;

/// Konfiguration des Broadcast-Loops
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Periode eines Ticks
    pub tick: Duration,
    /// Maximale Wartezeit auf einen Frame
    pub pop_timeout: Duration,
    /// Intervall der Pegel-Anzeige im Log
    pub meter_intervall: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick: STANDARD_TICK,
            pop_timeout: STANDARD_POP_TIMEOUT,
            meter_intervall: levelcast_audio::meter::STANDARD_INTERVALL,
        }
    }
}

/// Ergebnis eines einzelnen Ticks
#[derive(Debug, Clone, Copy)]
pub struct TickErgebnis {
    pub sample: DerivedSample,
    pub gesendet: usize,
}

/// Statistik nach Ende des Loops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatistik {
    pub ticks: u64,
    pub gesendet: u64,
}

/// Tick-getriebener Broadcast der Pegelwerte
pub struct BroadcastLoop {
    config: BroadcastConfig,
    consumer: FrameConsumer,
    processor: SignalProcessor,
    registry: SubscriberRegistry<String>,
    zaehler: Arc<EchoCounters>,
    stop_rx: watch::Receiver<bool>,
    meter: LevelMeter,
    capture: Option<CaptureHandle>,
    metriken: Option<LevelcastMetrics>,
    statistik: LoopStatistik,
}

impl BroadcastLoop {
    pub fn neu(
        config: BroadcastConfig,
        consumer: FrameConsumer,
        processor: SignalProcessor,
        registry: SubscriberRegistry<String>,
        zaehler: Arc<EchoCounters>,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        let meter = LevelMeter::new(config.meter_intervall, Instant::now());
        Self {
            config,
            consumer,
            processor,
            registry,
            zaehler,
            stop_rx,
            meter,
            capture: None,
            metriken: None,
            statistik: LoopStatistik::default(),
        }
    }

    /// Uebergibt den laufenden Capture; er lebt so lange wie der Loop
    pub fn mit_capture(mut self, capture: CaptureHandle) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn mit_metriken(mut self, metriken: LevelcastMetrics) -> Self {
        self.metriken = Some(metriken);
        self
    }

    pub fn statistik(&self) -> LoopStatistik {
        self.statistik
    }

    fn soll_stoppen(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Wartezeit auf einen Frame, begrenzt auf eine Tick-Periode
    fn wartezeit(&self) -> Duration {
        self.config.pop_timeout.min(self.config.tick)
    }

    /// Fuehrt genau einen Tick aus
    pub async fn tick(&mut self) -> TickErgebnis {
        let frame = self.consumer.pop(self.wartezeit()).await;
        self.verteilen(frame)
    }

    fn verteilen(&mut self, frame: Frame) -> TickErgebnis {
        let sample = self.processor.process(frame);

        let nachricht = VolumeMessage::neu(sample.volume_level, sample.smoothed_rms).als_json();
        let gesendet = self.registry.an_alle_senden(&nachricht);
        self.zaehler.fired_addieren(gesendet as u64);

        self.statistik.ticks += 1;
        self.statistik.gesendet += gesendet as u64;

        if let Some(m) = &self.metriken {
            m.ticks_total.inc();
            m.events_fired_total.inc_by(gesendet as u64);
            m.volume_level.set(i64::from(sample.volume_level));
            m.frames_dropped.set(self.consumer.verworfen() as i64);
            m.subscriber_setzen(self.registry.name(), self.registry.anzahl());
        }

        if let Some(balken) = self.meter.erfassen(sample.raw_rms, Instant::now()) {
            tracing::info!(
                verworfen = self.consumer.verworfen(),
                subscriber = self.registry.anzahl(),
                "Pegel {balken}"
            );
        }

        TickErgebnis { sample, gesendet }
    }

    /// Laeuft bis das Stop-Signal gesetzt ist
    ///
    /// Das Signal unterbricht sowohl das Warten auf einen Frame als auch
    /// das Warten auf den naechsten Tick. Ein haengender Capture verlaengert
    /// die Tick-Periode nicht, es wird dann Stille gesendet.
    pub async fn starten(mut self) -> LoopStatistik {
        tracing::info!(
            tick_ms = self.config.tick.as_millis() as u64,
            capture = ?self.capture.as_ref().map(CaptureHandle::beschreibung),
            "Broadcast-Loop gestartet"
        );

        while !self.soll_stoppen() {
            let start = tokio::time::Instant::now();
            let wartezeit = self.wartezeit();
            let frame = tokio::select! {
                frame = self.consumer.pop(wartezeit) => Some(frame),
                geaendert = self.stop_rx.changed() => {
                    if geaendert.is_err() {
                        tracing::debug!("Stop-Sender entfernt, Broadcast-Loop endet");
                        break;
                    }
                    None
                }
            };
            let Some(frame) = frame else {
                continue;
            };
            self.verteilen(frame);

            let rest = self.config.tick.saturating_sub(start.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(rest) => {}
                geaendert = self.stop_rx.changed() => {
                    if geaendert.is_err() {
                        tracing::debug!("Stop-Sender entfernt, Broadcast-Loop endet");
                        break;
                    }
                }
            }
        }

        if let Some(capture) = self.capture.take() {
            capture.abschliessen().await;
        }
        tracing::info!(
            ticks = self.statistik.ticks,
            gesendet = self.statistik.gesendet,
            "Broadcast-Loop beendet"
        );
        self.statistik
    }
}
