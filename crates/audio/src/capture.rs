//! Capture-Quellen
//!
//! Eine `CaptureSource` liefert Frames fester Laenge in ein Frame-Relay.
//! Es gibt zwei Implementierungen:
//! - `DeviceSource`: Mikrofon via cpal
//! - `SineSource` (siehe `synthetic`): synthetischer Sinus ohne Hardware
//!
//! Die Auswahl erfolgt einmal beim Start (`quelle_auswaehlen`).
//!
//! Der cpal-Stream ist nicht `Send`. Er lebt deshalb in einem eigenen
//! Thread, der ueber crossbeam-channel gesteuert wird. `CaptureHandle`
//! stoppt und schliesst den Stream beim Drop.

use std::str::FromStr;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::device::{get_default_input, load_cpal_input_device};
use crate::error::{AudioError, AudioResult};
use crate::frame::{Frame, FRAME_SIZE, SAMPLE_RATE};
use crate::relay::FrameProducer;
use crate::synthetic::SineSource;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration fuer den Audio-Capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Samples pro Frame
    pub frame_size: usize,
    /// Name (oder Namensteil) des Eingabegeraets; None = Standardgeraet
    pub geraet: Option<String>,
    /// Frequenz der synthetischen Quelle in Hz
    pub sinus_frequenz: f32,
    /// Amplitude der synthetischen Quelle
    pub sinus_amplitude: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frame_size: FRAME_SIZE,
            geraet: None,
            sinus_frequenz: 440.0,
            sinus_amplitude: 0.5,
        }
    }
}

/// Welche Quelle beim Start gewaehlt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuellenArt {
    /// Geraet wenn vorhanden, sonst Sinus
    #[default]
    Auto,
    /// Nur Geraet; fehlt es, schlaegt der Start fehl
    Device,
    /// Nur Sinus
    Sine,
}

impl FromStr for QuellenArt {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "device" => Ok(Self::Device),
            "sine" => Ok(Self::Sine),
            anders => Err(AudioError::Konfiguration(format!(
                "Unbekannte Quelle '{anders}' (erwartet: auto, device, sine)"
            ))),
        }
    }
}

impl std::fmt::Display for QuellenArt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Device => "device",
            Self::Sine => "sine",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// CaptureSource / CaptureHandle
// ---------------------------------------------------------------------------

/// Eine Quelle, die Frames in ein Relay schreibt
pub trait CaptureSource: Send {
    /// Menschenlesbare Beschreibung fuer das Log
    fn beschreibung(&self) -> String;

    /// Startet die Quelle. Die Frames landen in `producer`.
    ///
    /// Schlaegt fehl, wenn die Quelle nicht geoeffnet werden kann.
    fn starten(self: Box<Self>, producer: FrameProducer) -> AudioResult<CaptureHandle>;
}

/// Kommandos an den Capture-Thread
#[derive(Debug)]
pub(crate) enum CaptureCommand {
    Stop,
}

/// Laufende Quelle
///
/// Beim Drop wird der Capture-Thread gestoppt und der Stream geschlossen.
#[derive(Debug)]
pub struct CaptureHandle {
    cmd_tx: Sender<CaptureCommand>,
    thread: Option<JoinHandle<()>>,
    beschreibung: String,
}

impl CaptureHandle {
    pub(crate) fn neu(
        cmd_tx: Sender<CaptureCommand>,
        thread: JoinHandle<()>,
        beschreibung: String,
    ) -> Self {
        Self {
            cmd_tx,
            thread: Some(thread),
            beschreibung,
        }
    }

    pub fn beschreibung(&self) -> &str {
        &self.beschreibung
    }

    /// Ob der Capture-Thread noch laeuft
    pub fn laeuft(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stoppt die Quelle; mehrfacher Aufruf ist harmlos
    pub fn stoppen(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Schlaegt fehl wenn der Thread schon beendet ist
        let _ = self.cmd_tx.send(CaptureCommand::Stop);
        if thread.join().is_err() {
            error!(quelle = %self.beschreibung, "Capture-Thread ist abgestuerzt");
        } else {
            info!(quelle = %self.beschreibung, "Capture gestoppt");
        }
    }
}

impl CaptureHandle {
    /// Stoppt die Quelle aus einem async Kontext
    ///
    /// Das Join auf den Capture-Thread laeuft im Blocking-Pool und haelt
    /// keinen Runtime-Worker fest.
    pub async fn abschliessen(mut self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.stoppen()).await {
            error!("Stoppen des Captures fehlgeschlagen: {}", e);
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stoppen();
    }
}

// ---------------------------------------------------------------------------
// Auswahl
// ---------------------------------------------------------------------------

/// Waehlt die Capture-Quelle einmalig beim Start
pub fn quelle_auswaehlen(
    art: QuellenArt,
    config: &CaptureConfig,
) -> AudioResult<Box<dyn CaptureSource>> {
    match art {
        QuellenArt::Sine => Ok(Box::new(SineSource::new(config))),
        QuellenArt::Device => {
            // Existenz pruefen, damit der Fehler schon hier auftritt
            load_cpal_input_device(config.geraet.as_deref())?;
            Ok(Box::new(DeviceSource::new(config.clone())))
        }
        QuellenArt::Auto => {
            let vorhanden = match config.geraet.as_deref() {
                Some(name) => load_cpal_input_device(Some(name)).is_ok(),
                None => get_default_input().is_some(),
            };
            if vorhanden {
                Ok(Box::new(DeviceSource::new(config.clone())))
            } else {
                warn!("Kein Eingabegeraet gefunden – verwende synthetischen Sinus");
                Ok(Box::new(SineSource::new(config)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FrameAssembler
// ---------------------------------------------------------------------------

/// Setzt Callback-Puffer beliebiger Laenge zu Frames fester Laenge zusammen.
///
/// Laeuft im Audio-Callback: kein Locking, kein I/O, die einzige Allokation
/// ist die Kopie eines fertigen Frames.
pub struct FrameAssembler {
    puffer: Vec<f32>,
    frame_size: usize,
    kanaele: usize,
    producer: FrameProducer,
}

impl FrameAssembler {
    pub fn new(frame_size: usize, kanaele: u16, producer: FrameProducer) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            puffer: Vec::with_capacity(frame_size),
            frame_size,
            kanaele: usize::from(kanaele.max(1)),
            producer,
        }
    }

    /// Nimmt interleavte Samples entgegen; verwendet wird nur der erste Kanal
    pub fn einspeisen<T: Copy>(&mut self, data: &[T], konvertieren: impl Fn(T) -> f32) {
        for &s in data.iter().step_by(self.kanaele) {
            self.puffer.push(konvertieren(s));
            if self.puffer.len() == self.frame_size {
                // Bei vollem Relay wird der Frame verworfen und gezaehlt
                self.producer.push(Frame::aus_slice(&self.puffer));
                self.puffer.clear();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceSource
// ---------------------------------------------------------------------------

/// Mikrofon-Quelle via cpal
pub struct DeviceSource {
    config: CaptureConfig,
}

impl DeviceSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl CaptureSource for DeviceSource {
    fn beschreibung(&self) -> String {
        match &self.config.geraet {
            Some(name) => format!("Geraet '{name}'"),
            None => "Standard-Eingabegeraet".to_string(),
        }
    }

    fn starten(self: Box<Self>, producer: FrameProducer) -> AudioResult<CaptureHandle> {
        let beschreibung = self.beschreibung();
        let (cmd_tx, cmd_rx) = bounded::<CaptureCommand>(1);
        let (bereit_tx, bereit_rx) = bounded::<AudioResult<()>>(1);
        let config = self.config;

        let thread = std::thread::Builder::new()
            .name("levelcast-capture".to_string())
            .spawn(move || geraete_thread(config, producer, cmd_rx, bereit_tx))
            .map_err(|e| AudioError::Thread(e.to_string()))?;

        // Warten bis der Stream laeuft oder das Oeffnen fehlschlaegt
        match bereit_rx.recv() {
            Ok(Ok(())) => {
                info!(quelle = %beschreibung, "Capture gestartet");
                Ok(CaptureHandle::neu(cmd_tx, thread, beschreibung))
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::Thread(
                    "Capture-Thread ohne Rueckmeldung beendet".to_string(),
                ))
            }
        }
    }
}

/// Besitzt den cpal-Stream bis zum Stop-Kommando
fn geraete_thread(
    config: CaptureConfig,
    producer: FrameProducer,
    cmd_rx: Receiver<CaptureCommand>,
    bereit_tx: Sender<AudioResult<()>>,
) {
    let stream = match open_capture_stream(&config, producer) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = bereit_tx.send(Err(e));
            return;
        }
    };
    let _ = bereit_tx.send(Ok(()));

    // Blockiert bis Stop kommt oder das Handle verschwindet
    let _ = cmd_rx.recv();

    if let Err(e) = stream.pause() {
        warn!("Capture-Stream konnte nicht pausiert werden: {}", e);
    }
    drop(stream);
    debug!("Capture-Stream geschlossen");
}

/// Oeffnet den cpal-Eingabestream und verbindet ihn mit einem `FrameAssembler`
fn open_capture_stream(config: &CaptureConfig, producer: FrameProducer) -> AudioResult<Stream> {
    let device = load_cpal_input_device(config.geraet.as_deref())?;

    // Gewuenschte Rate bevorzugen, sonst Geraete-Standard
    let supported = device
        .supported_input_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= config.sample_rate
                && c.max_sample_rate().0 >= config.sample_rate
        })
        .map(|c| c.with_sample_rate(cpal::SampleRate(config.sample_rate)));

    let supported = match supported {
        Some(c) => c,
        None => {
            let standard = device
                .default_input_config()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            warn!(
                gewuenscht = config.sample_rate,
                verwendet = standard.sample_rate().0,
                "Abtastrate nicht unterstuetzt, verwende Geraete-Standard"
            );
            standard
        }
    };

    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.config();
    let assembler = FrameAssembler::new(config.frame_size, stream_config.channels, producer);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, assembler)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, assembler)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, assembler)?,
        SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, assembler)?,
        SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, assembler)?,
        _ => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {:?}",
                sample_format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!(
        "Capture-Stream geoeffnet: {}Hz {}ch {:?}",
        stream_config.sample_rate.0, stream_config.channels, sample_format
    );

    Ok(stream)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut assembler: FrameAssembler,
) -> AudioResult<Stream>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let err_fn = |err| error!("Capture-Fehler: {}", err);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                assembler.einspeisen(data, |s| s.to_sample::<f32>());
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamFehler(e.to_string()))
}
