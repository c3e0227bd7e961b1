//! Kommandozeile
//!
//! Argumente ueberschreiben die Werte aus der Konfigurationsdatei.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use levelcast_audio::{QuellenArt, STANDARD_BASELINE_DATEI, STANDARD_MESSDAUER};

use crate::config::{ServerConfig, STANDARD_CONFIG_DATEI};

#[derive(Debug, Parser)]
#[command(name = "levelcast")]
#[command(version, about = "Pegel-Broadcast per WebSocket mit gezaehltem Shutdown", long_about = None)]
pub struct Cli {
    /// Pfad zur TOML-Konfiguration
    #[arg(long, env = "LEVELCAST_CONFIG", default_value = STANDARD_CONFIG_DATEI, global = true)]
    pub config: PathBuf,

    /// Anzahl Bestaetigungen bis zum Shutdown
    #[arg(long, global = true)]
    pub threshold: Option<u64>,

    /// Datei mit dem kalibrierten Umgebungspegel
    #[arg(long, global = true)]
    pub baseline_file: Option<PathBuf>,

    /// HTTP-Port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Capture-Quelle: auto, device oder sine
    #[arg(long, global = true)]
    pub source: Option<QuellenArt>,

    /// Log-Level bzw. Filter-Direktive
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Befehl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Befehl {
    /// Server starten (Standard)
    Serve,
    /// Umgebungspegel messen und als Baseline speichern
    Calibrate {
        /// Messdauer in Sekunden
        #[arg(long, default_value_t = STANDARD_MESSDAUER.as_secs())]
        seconds: u64,
        /// Zieldatei der Baseline
        #[arg(long, default_value = STANDARD_BASELINE_DATEI)]
        output: PathBuf,
    },
    /// Eingabegeraete auflisten
    Devices,
}

impl Cli {
    pub fn befehl(&self) -> Befehl {
        self.command.clone().unwrap_or(Befehl::Serve)
    }

    /// Uebertraegt gesetzte Argumente in die Konfiguration
    pub fn anwenden(&self, config: &mut ServerConfig) {
        if let Some(schwelle) = self.threshold {
            config.shutdown.echo_schwelle = Some(schwelle);
        }
        if let Some(datei) = &self.baseline_file {
            config.verarbeitung.baseline_datei = datei.clone();
        }
        if let Some(port) = self.port {
            config.netzwerk.port = port;
        }
        if let Some(quelle) = self.source {
            config.audio.quelle = quelle;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
