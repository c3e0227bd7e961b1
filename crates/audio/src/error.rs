//! Fehlertypen fuer die Audio-Seite

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Seite
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Ungueltige Baseline in '{pfad}': {grund}")]
    UngueltigeBaseline { pfad: String, grund: String },

    #[error("Capture-Thread konnte nicht gestartet werden: {0}")]
    Thread(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
