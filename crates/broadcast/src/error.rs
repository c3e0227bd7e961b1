//! Fehlertypen fuer Registry, Broadcast-Loop und Shutdown

use thiserror::Error;

/// Fehlertyp fuer den Broadcast-Crate
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Subscriber wurde entfernt oder seine Verbindung ist zu
    #[error("Subscriber getrennt")]
    Getrennt,

    /// Send-Queue des Subscribers ist voll
    #[error("Send-Queue voll")]
    QueueVoll,

    /// Registry nimmt keine neuen Subscriber mehr an (Shutdown laeuft)
    #[error("Registry '{0}' ist geschlossen")]
    RegistryGeschlossen(String),
}

/// Result-Typ fuer den Broadcast-Crate
pub type BroadcastResult<T> = Result<T, BroadcastError>;
