//! levelcast-library – Waveform-Bibliothek
//!
//! Nur im Speicher gehaltene, nur-anhaengende Liste benannter Waveforms.
//! Jede neue Waveform wird an alle Abonnenten der Waveform-Registry
//! verteilt.

pub mod error;
pub mod service;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use error::{LibraryError, LibraryResult};
pub use service::WaveformLibrary;
