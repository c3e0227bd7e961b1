//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use levelcast_api::ApiServerKonfig;
use levelcast_audio::{
    CaptureConfig, ProcessorConfig, QuellenArt, FRAME_SIZE, SAMPLE_RATE, STANDARD_BASELINE_DATEI,
    STANDARD_KAPAZITAET,
};
use levelcast_broadcast::{BroadcastConfig, ShutdownConfig};
use levelcast_observability::logging;
use serde::{Deserialize, Serialize};

/// Standard-Pfad der Konfigurationsdatei
pub const STANDARD_CONFIG_DATEI: &str = "levelcast.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Capture-Einstellungen
    pub audio: AudioEinstellungen,
    /// Pegel-Verarbeitung und Broadcast-Takt
    pub verarbeitung: VerarbeitungEinstellungen,
    /// Gezaehlter Shutdown
    pub shutdown: ShutdownEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse des HTTP-Servers
    pub bind_adresse: String,
    /// Port des HTTP-Servers
    pub port: u16,
    /// CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
    /// Verzeichnis mit statischen Dateien (optional)
    pub static_dir: Option<PathBuf>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec![],
            static_dir: None,
        }
    }
}

/// Capture-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Samples pro Frame
    pub frame_size: usize,
    /// Plaetze im Frame-Relay
    pub relay_kapazitaet: usize,
    /// Wartezeit auf einen Frame in Millisekunden, danach Stille;
    /// hoechstens `verarbeitung.tick_ms`
    pub pop_timeout_ms: u64,
    /// Quelle: "auto", "device" oder "sine"
    pub quelle: QuellenArt,
    /// Name (oder Namensteil) des Eingabegeraets
    pub geraet: Option<String>,
    pub sinus_frequenz: f32,
    pub sinus_amplitude: f32,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frame_size: FRAME_SIZE,
            relay_kapazitaet: STANDARD_KAPAZITAET,
            pop_timeout_ms: 250,
            quelle: QuellenArt::Auto,
            geraet: None,
            sinus_frequenz: 440.0,
            sinus_amplitude: 0.5,
        }
    }
}

/// Pegel-Verarbeitung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerarbeitungEinstellungen {
    /// Anzahl RMS-Werte im gleitenden Mittelwert
    pub fenster: usize,
    /// Abstand ueber der Baseline, ab dem ein Pegel gemeldet wird
    pub schwelle_ueber_baseline: f32,
    /// Broadcast-Periode in Millisekunden
    pub tick_ms: u64,
    /// Datei mit dem kalibrierten Umgebungspegel
    pub baseline_datei: PathBuf,
}

impl Default for VerarbeitungEinstellungen {
    fn default() -> Self {
        Self {
            fenster: levelcast_audio::processor::STANDARD_FENSTER,
            schwelle_ueber_baseline: levelcast_audio::processor::STANDARD_SCHWELLE,
            tick_ms: 250,
            baseline_datei: PathBuf::from(STANDARD_BASELINE_DATEI),
        }
    }
}

/// Gezaehlter Shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownEinstellungen {
    /// Bestaetigungen bis zum Shutdown (fehlt = unbegrenzt laufen)
    pub echo_schwelle: Option<u64>,
    /// Wartezeit auf den Abschlussbericht in Millisekunden
    pub report_timeout_ms: u64,
}

impl Default for ShutdownEinstellungen {
    fn default() -> Self {
        Self {
            echo_schwelle: None,
            report_timeout_ms: 5000,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level bzw. Filter-Direktive
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &Path) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{}'", pfad.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = %pfad.display(),
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow!(
                "Konfigurationsdatei '{}' nicht lesbar: {e}",
                pfad.display()
            )),
        }
    }

    /// Prueft Werte, mit denen die Pipeline nicht laufen kann
    pub fn validieren(&self) -> Result<()> {
        if self.audio.frame_size == 0 {
            bail!("audio.frame_size muss groesser als 0 sein");
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate muss groesser als 0 sein");
        }
        if self.audio.relay_kapazitaet == 0 {
            bail!("audio.relay_kapazitaet muss groesser als 0 sein");
        }
        if self.verarbeitung.fenster == 0 {
            bail!("verarbeitung.fenster muss groesser als 0 sein");
        }
        if self.verarbeitung.tick_ms == 0 {
            bail!("verarbeitung.tick_ms muss groesser als 0 sein");
        }
        if self.audio.pop_timeout_ms > self.verarbeitung.tick_ms {
            bail!(
                "audio.pop_timeout_ms ({}) darf verarbeitung.tick_ms ({}) nicht uebersteigen",
                self.audio.pop_timeout_ms,
                self.verarbeitung.tick_ms
            );
        }
        if self.shutdown.echo_schwelle == Some(0) {
            bail!("shutdown.echo_schwelle muss groesser als 0 sein");
        }
        if !logging::log_filter_gueltig(&self.logging.level) {
            bail!("logging.level '{}' ist keine gueltige Filter-Direktive", self.logging.level);
        }
        if !logging::log_format_gueltig(&self.logging.format) {
            bail!("logging.format '{}' unbekannt", self.logging.format);
        }
        self.bind_adresse()?;
        Ok(())
    }

    /// Gibt die Bind-Adresse fuer den HTTP-Server zurueck
    pub fn bind_adresse(&self) -> Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{adresse}'"))
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            frame_size: self.audio.frame_size,
            geraet: self.audio.geraet.clone(),
            sinus_frequenz: self.audio.sinus_frequenz,
            sinus_amplitude: self.audio.sinus_amplitude,
        }
    }

    pub fn processor_config(&self, baseline: f32) -> ProcessorConfig {
        ProcessorConfig {
            fenster: self.verarbeitung.fenster,
            schwelle_ueber_baseline: self.verarbeitung.schwelle_ueber_baseline,
            baseline,
        }
    }

    pub fn broadcast_config(&self) -> BroadcastConfig {
        BroadcastConfig {
            tick: Duration::from_millis(self.verarbeitung.tick_ms),
            pop_timeout: Duration::from_millis(self.audio.pop_timeout_ms),
            ..BroadcastConfig::default()
        }
    }

    pub fn shutdown_config(&self) -> ShutdownConfig {
        ShutdownConfig {
            echo_schwelle: self.shutdown.echo_schwelle,
            report_timeout: Duration::from_millis(self.shutdown.report_timeout_ms),
        }
    }

    pub fn api_konfig(&self) -> Result<ApiServerKonfig> {
        Ok(ApiServerKonfig {
            bind_addr: self.bind_adresse()?,
            cors_origins: self.netzwerk.cors_origins.clone(),
            static_dir: self.netzwerk.static_dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        cfg.validieren().unwrap();
        assert_eq!(cfg.netzwerk.port, 8000);
        assert_eq!(cfg.audio.quelle, QuellenArt::Auto);
        assert_eq!(cfg.verarbeitung.tick_ms, 250);
        assert_eq!(cfg.shutdown.echo_schwelle, None);
        assert_eq!(cfg.shutdown.report_timeout_ms, 5000);
        assert_eq!(
            cfg.verarbeitung.baseline_datei,
            PathBuf::from("baseline_volume.txt")
        );
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse().unwrap().to_string(), "0.0.0.0:8000");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            port = 9000
            cors_origins = ["http://localhost:3000"]

            [audio]
            quelle = "sine"

            [shutdown]
            echo_schwelle = 3
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.netzwerk.port, 9000);
        assert_eq!(cfg.netzwerk.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(cfg.audio.quelle, QuellenArt::Sine);
        assert_eq!(cfg.shutdown_config().echo_schwelle, Some(3));
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert_eq!(cfg.verarbeitung.fenster, 4);
        assert_eq!(cfg.shutdown.report_timeout_ms, 5000);
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServerConfig::laden(&dir.path().join("fehlt.toml")).unwrap();
        assert_eq!(cfg.netzwerk.port, 8000);
    }

    #[test]
    fn datei_wird_geladen() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("levelcast.toml");
        std::fs::write(&pfad, "[verarbeitung]\ntick_ms = 100\n").unwrap();

        let cfg = ServerConfig::laden(&pfad).unwrap();
        assert_eq!(cfg.broadcast_config().tick, Duration::from_millis(100));
    }

    #[test]
    fn kaputte_datei_ist_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("levelcast.toml");
        std::fs::write(&pfad, "[netzwerk\nport = ").unwrap();
        assert!(ServerConfig::laden(&pfad).is_err());
    }

    #[test]
    fn unbekannte_quelle_ist_fehler() {
        let toml = "[audio]\nquelle = \"mikrofon\"\n";
        assert!(toml::from_str::<ServerConfig>(toml).is_err());
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.audio.frame_size = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.shutdown.echo_schwelle = Some(0);
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.netzwerk.bind_adresse = "kein host".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.logging.level = "levelcast=lautlos".into();
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn frame_wartezeit_hoechstens_ein_tick() {
        let mut cfg = ServerConfig::default();
        cfg.audio.pop_timeout_ms = 1000;
        cfg.verarbeitung.tick_ms = 250;
        let fehler = cfg.validieren().unwrap_err();
        assert!(fehler.to_string().contains("pop_timeout_ms"));

        cfg.audio.pop_timeout_ms = 250;
        cfg.validieren().unwrap();
    }

    #[test]
    fn abgeleitete_konfigurationen() {
        let mut cfg = ServerConfig::default();
        cfg.audio.geraet = Some("USB".into());
        cfg.netzwerk.static_dir = Some(PathBuf::from("static"));

        assert_eq!(cfg.capture_config().geraet.as_deref(), Some("USB"));
        assert_eq!(cfg.processor_config(0.1).baseline, 0.1);
        let api = cfg.api_konfig().unwrap();
        assert_eq!(api.bind_addr.port(), 8000);
        assert_eq!(api.static_dir, Some(PathBuf::from("static")));
    }
}
