//! levelcast-server – Bibliotheks-Root
//!
//! Verdrahtet Capture, Broadcast-Loop, Registries, Shutdown-Koordinator
//! und HTTP-Server. Die Subcommands `calibrate` und `devices` liegen
//! ebenfalls hier, damit sie ohne Binary testbar sind.

pub mod cli;
pub mod config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::ServerConfig;
use levelcast_api::{ApiServer, ApiState};
use levelcast_audio::{
    baseline_kalibrieren, baseline_laden, baseline_speichern, frame_relay, list_input_devices,
    quelle_auswaehlen, AudioDevice, SignalProcessor,
};
use levelcast_broadcast::{
    BroadcastLoop, EchoCounters, Schliessbar, ShutdownCoordinator, SubscriberRegistry,
};
use levelcast_library::WaveformLibrary;
use levelcast_observability::{HealthState, LevelcastMetrics};
use levelcast_protocol::{ShutdownPhase, WaveformUpdate};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Ende des Shutdowns
    ///
    /// Reihenfolge:
    /// 1. Baseline laden
    /// 2. Capture-Quelle waehlen und starten
    /// 3. Registries, Zaehler und Koordinator anlegen
    /// 4. Broadcast-Loop starten
    /// 5. HTTP-Server bis zum Shutdown-Signal bedienen
    pub async fn starten(self) -> Result<()> {
        let config = self.config;

        let baseline = baseline_oder_null(&config.verarbeitung.baseline_datei);
        tracing::info!(
            baseline,
            datei = %config.verarbeitung.baseline_datei.display(),
            "Baseline geladen"
        );

        let capture_config = config.capture_config();
        let quelle = quelle_auswaehlen(config.audio.quelle, &capture_config)
            .context("Capture-Quelle nicht verfuegbar")?;
        let (producer, consumer) =
            frame_relay(config.audio.relay_kapazitaet, capture_config.frame_size);
        let capture = quelle
            .starten(producer)
            .context("Capture konnte nicht gestartet werden")?;

        let metriken = LevelcastMetrics::neu()?;
        let audio = SubscriberRegistry::<String>::neu("audio");
        let waveform = SubscriberRegistry::<WaveformUpdate>::neu("waveform");
        let zaehler = Arc::new(EchoCounters::neu());
        let registries: Vec<Arc<dyn Schliessbar>> =
            vec![Arc::new(audio.clone()), Arc::new(waveform.clone())];
        let koordinator = ShutdownCoordinator::mit_metriken(
            config.shutdown_config(),
            Arc::clone(&zaehler),
            registries,
            metriken.clone(),
        );

        let health = HealthState::neu();
        health.capture_status_setzen(capture.laeuft());
        health_an_phase_koppeln(&koordinator, health.clone());

        tracing::info!(
            quelle = %capture.beschreibung(),
            schwelle = ?config.shutdown.echo_schwelle,
            tick_ms = config.verarbeitung.tick_ms,
            "Pipeline startet"
        );

        let broadcast = BroadcastLoop::neu(
            config.broadcast_config(),
            consumer,
            SignalProcessor::new(config.processor_config(baseline)),
            audio.clone(),
            zaehler,
            koordinator.stop_signal(),
        )
        .mit_capture(capture)
        .mit_metriken(metriken.clone());
        let loop_task = tokio::spawn(broadcast.starten());

        {
            let koordinator = koordinator.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    koordinator.abbrechen();
                }
            });
        }

        let state = ApiState::neu(
            audio,
            WaveformLibrary::neu(waveform),
            koordinator.clone(),
            metriken,
        );
        let beendet = {
            let koordinator = koordinator.clone();
            async move { koordinator.beendet().await }
        };
        let server = ApiServer::neu(config.api_konfig()?);
        if let Err(e) = server.starten(state, health, beendet).await {
            // Loop und Capture trotzdem sauber beenden
            koordinator.abbrechen();
            let _ = loop_task.await;
            return Err(e);
        }

        match loop_task.await {
            Ok(statistik) => tracing::info!(
                ticks = statistik.ticks,
                gesendet = statistik.gesendet,
                "Broadcast-Loop abgeschlossen"
            ),
            Err(e) => tracing::error!("Broadcast-Loop abgebrochen: {e}"),
        }
        tracing::info!(ausgang = ?koordinator.ausgang(), "levelcast beendet");
        Ok(())
    }
}

/// Laedt die Baseline; jeder Fehler faellt mit Warnung auf 0.0 zurueck
pub fn baseline_oder_null(pfad: &Path) -> f32 {
    match baseline_laden(pfad) {
        Ok(wert) => wert,
        Err(e) => {
            tracing::warn!(pfad = %pfad.display(), "Baseline unbrauchbar, verwende 0.0: {e}");
            0.0
        }
    }
}

/// Setzt den Health-Zustand, sobald der Shutdown beginnt bzw. endet
fn health_an_phase_koppeln(koordinator: &ShutdownCoordinator, health: HealthState) {
    let mut phase = koordinator.phase_beobachten();
    tokio::spawn(async move {
        if phase
            .wait_for(|p| *p != ShutdownPhase::Running)
            .await
            .is_ok()
        {
            health.herunterfahren_setzen();
        }
        if phase
            .wait_for(|p| *p == ShutdownPhase::Terminated)
            .await
            .is_ok()
        {
            health.capture_status_setzen(false);
        }
    });
}

/// Misst den Umgebungspegel der konfigurierten Quelle und speichert ihn
pub async fn kalibrieren(config: &ServerConfig, dauer: Duration, ausgabe: &Path) -> Result<f32> {
    let capture_config = config.capture_config();
    let quelle = quelle_auswaehlen(config.audio.quelle, &capture_config)
        .context("Capture-Quelle nicht verfuegbar")?;
    let (producer, mut consumer) =
        frame_relay(config.audio.relay_kapazitaet, capture_config.frame_size);
    let capture = quelle
        .starten(producer)
        .context("Capture konnte nicht gestartet werden")?;

    tracing::info!(
        quelle = %capture.beschreibung(),
        sekunden = dauer.as_secs_f32(),
        "Kalibrierung laeuft, bitte Ruhe"
    );
    let baseline = baseline_kalibrieren(&mut consumer, dauer).await;
    capture.abschliessen().await;

    baseline_speichern(ausgabe, baseline)
        .with_context(|| format!("Baseline nicht speicherbar: {}", ausgabe.display()))?;
    tracing::info!(baseline, datei = %ausgabe.display(), "Baseline gespeichert");
    Ok(baseline)
}

/// Formatiert die Eingabegeraete fuer die Konsole
pub fn geraete_formatieren(geraete: &[AudioDevice]) -> String {
    if geraete.is_empty() {
        return "Keine Eingabegeraete gefunden\n".into();
    }
    geraete
        .iter()
        .map(|g| {
            let raten: Vec<String> = g.sample_rates.iter().map(u32::to_string).collect();
            format!(
                "{}{} ({} Kanaele, {} Hz)\n",
                if g.standard { "* " } else { "  " },
                g.name,
                g.channels,
                raten.join("/")
            )
        })
        .collect()
}

/// Listet die Eingabegeraete auf stdout
pub fn geraete_auflisten() -> Result<()> {
    let geraete = list_input_devices().context("Geraeteliste nicht verfuegbar")?;
    print!("{}", geraete_formatieren(&geraete));
    Ok(())
}
