//! levelcast-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Bausteine bereit, die von mehreren
//! levelcast-Crates gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::SubscriberId;
