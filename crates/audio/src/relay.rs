//! Frame-Relay – begrenzte Uebergabe vom Capture- zum Verarbeitungs-Kontext
//!
//! Der Capture-Callback darf nie blockieren. `FrameProducer::push` ist daher
//! nicht-blockierend und verwirft den neuen Frame, wenn das Relay voll ist.
//! `FrameConsumer::pop` wartet hoechstens `timeout` und liefert danach einen
//! Stille-Frame, damit der Verarbeitungs-Takt gleichmaessig bleibt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::frame::Frame;

/// Standard-Kapazitaet des Relays in Frames
pub const STANDARD_KAPAZITAET: usize = 10;

/// Erstellt ein Relay mit `kapazitaet` Plaetzen fuer Frames der Laenge `frame_size`
pub fn frame_relay(kapazitaet: usize, frame_size: usize) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = mpsc::channel(kapazitaet.max(1));
    let verworfen = Arc::new(AtomicU64::new(0));
    (
        FrameProducer {
            tx,
            verworfen: Arc::clone(&verworfen),
        },
        FrameConsumer {
            rx,
            frame_size,
            verworfen,
        },
    )
}

/// Schreib-Seite des Relays (lebt im Capture-Kontext)
#[derive(Clone, Debug)]
pub struct FrameProducer {
    tx: mpsc::Sender<Frame>,
    verworfen: Arc<AtomicU64>,
}

impl FrameProducer {
    /// Reiht einen Frame ein, ohne zu blockieren.
    ///
    /// Gibt `false` zurueck und verwirft den Frame, wenn das Relay voll ist
    /// oder die Lese-Seite nicht mehr existiert.
    pub fn push(&self, frame: Frame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                self.verworfen.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Anzahl seit dem Start verworfener Frames
    pub fn verworfen(&self) -> u64 {
        self.verworfen.load(Ordering::Relaxed)
    }
}

/// Lese-Seite des Relays (gehoert der Broadcast-Loop)
#[derive(Debug)]
pub struct FrameConsumer {
    rx: mpsc::Receiver<Frame>,
    frame_size: usize,
    verworfen: Arc<AtomicU64>,
}

impl FrameConsumer {
    /// Holt den naechsten Frame oder liefert nach `timeout` Stille.
    ///
    /// Ist die Schreib-Seite geschlossen, kommt sofort Stille zurueck.
    pub async fn pop(&mut self, timeout: Duration) -> Frame {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(frame)) => frame,
            Ok(None) | Err(_) => Frame::stille(self.frame_size),
        }
    }

    /// Wartet auf den naechsten echten Frame; `None` wenn die Quelle beendet ist
    pub async fn empfangen(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Erwartete Laenge eines Frames
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Anzahl seit dem Start verworfener Frames
    pub fn verworfen(&self) -> u64 {
        self.verworfen.load(Ordering::Relaxed)
    }
}
