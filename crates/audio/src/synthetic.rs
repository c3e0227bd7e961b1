//! Synthetische Sinus-Quelle
//!
//! Ersatz fuer das Mikrofon, wenn kein Eingabegeraet vorhanden ist oder
//! explizit `sine` gewaehlt wurde. Ein eigener Thread erzeugt Frames im
//! selben Takt, den ein Geraet mit gleicher Abtastrate liefern wuerde.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, info};

use crate::capture::{CaptureCommand, CaptureConfig, CaptureHandle, CaptureSource};
use crate::error::{AudioError, AudioResult};
use crate::frame::Frame;
use crate::relay::FrameProducer;

/// Sinus-Generator mit fortlaufender Phase
#[derive(Debug, Clone)]
pub struct SineGenerator {
    frequenz: f32,
    amplitude: f32,
    sample_rate: u32,
    phase: f32,
}

impl SineGenerator {
    pub fn new(frequenz: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            frequenz,
            amplitude,
            sample_rate: sample_rate.max(1),
            phase: 0.0,
        }
    }

    /// Fuellt `puffer` mit den naechsten Samples
    pub fn fuellen(&mut self, puffer: &mut [f32]) {
        let delta = TAU * self.frequenz / self.sample_rate as f32;
        for s in puffer.iter_mut() {
            *s = self.amplitude * self.phase.sin();
            self.phase += delta;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
    }
}

/// Capture-Quelle ohne Hardware
pub struct SineSource {
    generator: SineGenerator,
    frame_size: usize,
    frame_dauer: Duration,
}

impl SineSource {
    pub fn new(config: &CaptureConfig) -> Self {
        let frame_size = config.frame_size.max(1);
        let sample_rate = config.sample_rate.max(1);
        Self {
            generator: SineGenerator::new(config.sinus_frequenz, config.sinus_amplitude, sample_rate),
            frame_size,
            frame_dauer: Duration::from_secs_f64(frame_size as f64 / sample_rate as f64),
        }
    }

    /// Zeitabstand zwischen zwei Frames
    pub fn frame_dauer(&self) -> Duration {
        self.frame_dauer
    }
}

impl CaptureSource for SineSource {
    fn beschreibung(&self) -> String {
        format!(
            "Sinus {} Hz (Amplitude {})",
            self.generator.frequenz, self.generator.amplitude
        )
    }

    fn starten(self: Box<Self>, producer: FrameProducer) -> AudioResult<CaptureHandle> {
        let beschreibung = self.beschreibung();
        let (cmd_tx, cmd_rx) = bounded::<CaptureCommand>(1);
        let quelle = *self;

        let thread = std::thread::Builder::new()
            .name("levelcast-sine".to_string())
            .spawn(move || quelle.generator_thread(producer, cmd_rx))
            .map_err(|e| AudioError::Thread(e.to_string()))?;

        info!(quelle = %beschreibung, "Synthetische Quelle gestartet");
        Ok(CaptureHandle::neu(cmd_tx, thread, beschreibung))
    }
}

impl SineSource {
    fn generator_thread(mut self, producer: FrameProducer, cmd_rx: Receiver<CaptureCommand>) {
        let mut puffer = vec![0.0f32; self.frame_size];
        let mut naechster = Instant::now() + self.frame_dauer;

        loop {
            let warten = naechster.saturating_duration_since(Instant::now());
            match cmd_rx.recv_timeout(warten) {
                Err(RecvTimeoutError::Timeout) => {
                    self.generator.fuellen(&mut puffer);
                    producer.push(Frame::aus_slice(&puffer));
                    naechster += self.frame_dauer;
                }
                Ok(CaptureCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("Sinus-Generator beendet");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::normalisieren;
    use crate::relay::frame_relay;

    #[test]
    fn generator_amplitude_eingehalten() {
        let mut gen = SineGenerator::new(440.0, 0.5, 44_100);
        let mut puffer = vec![0.0f32; 4096];
        gen.fuellen(&mut puffer);
        let max = puffer.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(max <= 0.5 + 1e-6);
        assert!(max > 0.49);
    }

    #[test]
    fn generator_phase_laeuft_weiter() {
        let mut gen = SineGenerator::new(1000.0, 1.0, 48_000);
        let mut a = vec![0.0f32; 7];
        let mut b = vec![0.0f32; 7];
        gen.fuellen(&mut a);
        gen.fuellen(&mut b);
        assert_ne!(a, b, "Zweiter Block muss an der Phase weitermachen");
    }

    #[test]
    fn normalisierter_sinus_hat_rms_wurzel_halb() {
        let mut gen = SineGenerator::new(441.0, 0.3, 44_100);
        // 441 Hz bei 44100 Hz: genau 100 Samples pro Periode
        let mut puffer = vec![0.0f32; 1000];
        gen.fuellen(&mut puffer);
        normalisieren(&mut puffer);
        let rms = crate::processor::rms(&puffer);
        assert!((rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn frame_dauer_aus_abtastrate() {
        let quelle = SineSource::new(&CaptureConfig::default());
        let erwartet = 1024.0 / 44_100.0;
        assert!((quelle.frame_dauer().as_secs_f64() - erwartet).abs() < 1e-9);
    }

    #[tokio::test]
    async fn quelle_liefert_frames_und_stoppt() {
        let (producer, mut consumer) = frame_relay(10, 1024);
        let quelle: Box<dyn CaptureSource> = Box::new(SineSource::new(&CaptureConfig::default()));
        let mut handle = quelle.starten(producer).unwrap();
        assert!(handle.laeuft());

        let frame = tokio::time::timeout(Duration::from_secs(2), consumer.empfangen())
            .await
            .expect("Frame innerhalb von 2s erwartet")
            .expect("Quelle darf nicht beendet sein");
        assert_eq!(frame.len(), 1024);

        handle.stoppen();
        assert!(!handle.laeuft());
        // Mehrfaches Stoppen ist harmlos
        handle.stoppen();
    }

    #[tokio::test]
    async fn abschliessen_beendet_quelle_im_blocking_pool() {
        let (producer, mut consumer) = frame_relay(10, 1024);
        let quelle: Box<dyn CaptureSource> = Box::new(SineSource::new(&CaptureConfig::default()));
        let handle = quelle.starten(producer).unwrap();

        handle.abschliessen().await;
        // Der Producer ist mit dem Thread verschwunden, das Relay laeuft leer
        let ende = tokio::time::timeout(Duration::from_secs(2), async {
            while consumer.empfangen().await.is_some() {}
        })
        .await;
        assert!(ende.is_ok());
    }
}
