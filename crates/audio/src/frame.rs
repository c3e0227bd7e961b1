//! Audio-Frame
//!
//! Ein Frame ist ein Block fester Laenge aus Mono-Samples, so wie ihn ein
//! Capture-Tick liefert. Nach dem Erzeugen wird er nicht mehr veraendert;
//! nur der Verarbeiter, der ihn besitzt, normalisiert seine eigene Kopie.

/// Abtastrate der Capture-Quelle in Hz
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples pro Frame
pub const FRAME_SIZE: usize = 1024;

/// Block aus Mono-Samples fester Laenge
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    samples: Box<[f32]>,
}

impl Frame {
    /// Erstellt einen Frame aus einer Kopie der gegebenen Samples
    pub fn aus_slice(samples: &[f32]) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Stille: Frame der erwarteten Form, nur Nullen
    pub fn stille(len: usize) -> Self {
        Self {
            samples: vec![0.0; len].into_boxed_slice(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Gibt die Samples zur exklusiven Weiterverarbeitung heraus
    pub fn into_samples(self) -> Box<[f32]> {
        self.samples
    }
}

impl From<Vec<f32>> for Frame {
    fn from(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stille_hat_erwartete_form() {
        let frame = Frame::stille(FRAME_SIZE);
        assert_eq!(frame.len(), FRAME_SIZE);
        assert!(frame.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn aus_slice_kopiert() {
        let quelle = [0.1f32, -0.2, 0.3];
        let frame = Frame::aus_slice(&quelle);
        assert_eq!(frame.samples(), &quelle);
    }
}
