//! levelcast-audio – Audio-Seite von levelcast
//!
//! - Capture vom Eingabegeraet (cpal) oder synthetischer Sinus-Quelle
//! - Begrenzter Frame-Relay zwischen Capture-Thread und Verarbeitung
//! - Pegel-Verarbeitung: Normalisierung, RMS, Glaettung, Baseline-Schwelle
//! - Baseline-Kalibrierung und Pegel-Anzeige im Log

pub mod calibration;
pub mod capture;
pub mod device;
pub mod error;
pub mod frame;
pub mod meter;
pub mod processor;
pub mod relay;
pub mod synthetic;

// Bequeme Re-Exporte der wichtigsten Typen
pub use calibration::{
    baseline_kalibrieren, baseline_laden, baseline_speichern, BaselineMessung,
    STANDARD_BASELINE_DATEI, STANDARD_MESSDAUER,
};
pub use capture::{quelle_auswaehlen, CaptureConfig, CaptureHandle, CaptureSource, QuellenArt};
pub use device::{get_default_input, list_input_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use frame::{Frame, FRAME_SIZE, SAMPLE_RATE};
pub use meter::LevelMeter;
pub use processor::{DerivedSample, ProcessorConfig, SignalProcessor, SmoothingWindow};
pub use relay::{frame_relay, FrameConsumer, FrameProducer, STANDARD_KAPAZITAET};
pub use synthetic::{SineGenerator, SineSource};
