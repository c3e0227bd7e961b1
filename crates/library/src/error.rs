//! Fehlertypen fuer die Waveform-Bibliothek

use levelcast_broadcast::BroadcastError;
use thiserror::Error;

/// Fehlertypen der Waveform-Bibliothek
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Name oder Daten fehlen bzw. sind leer
    #[error("Missing name or data")]
    FehlendeDaten,

    #[error("Broadcast-Fehler: {0}")]
    Broadcast(#[from] BroadcastError),
}

pub type LibraryResult<T> = Result<T, LibraryError>;
