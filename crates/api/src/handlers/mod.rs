//! Handler-Module der HTTP-Schnittstelle

pub mod audio;
pub mod echo;
pub mod status;
pub mod waveforms;
pub mod ws;
