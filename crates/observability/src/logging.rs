//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (ueberschreibt die Konfiguration):
//! - `LC_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder `levelcast_broadcast=debug`)
//! - `LC_LOG_FORMAT`: Format (text/json)

use std::str::FromStr;

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Level
pub const ENV_LOG_LEVEL: &str = "LC_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "LC_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => Err(anyhow!("Unbekanntes Log-Format: {andere}")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `LC_LOG_LEVEL` und `LC_LOG_FORMAT` haben Vorrang vor den uebergebenen
/// Werten. Ein ungueltiger Filter faellt auf `info` zurueck, ein
/// unbekanntes Format auf Text. Ein bereits gesetzter globaler Subscriber
/// wird nicht ersetzt.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(ENV_LOG_FORMAT)
        .unwrap_or_else(|_| format.to_string())
        .parse::<LogFormat>()
        .unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if let Err(e) = ergebnis {
        tracing::debug!("Logging bereits initialisiert: {e}");
    }
}

/// Validiert ob ein Level bzw. eine Filter-Direktive gueltig ist.
pub fn log_filter_gueltig(level: &str) -> bool {
    EnvFilter::try_new(level).is_ok()
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_filter_gueltig(level));
        }
        assert!(log_filter_gueltig("info,levelcast_broadcast=debug"));
    }

    #[test]
    fn log_filter_ungueltige_werte() {
        assert!(!log_filter_gueltig("levelcast=lautlos"));
    }

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn doppelte_initialisierung_paniked_nicht() {
        logging_initialisieren("debug", "text");
        logging_initialisieren("info", "json");
    }
}
