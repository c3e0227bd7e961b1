//! Subscriber-Registry – Menge der aktiven Verbindungen einer Nachrichtenart
//!
//! Jede Verbindung bekommt beim Beitritt eine eigene Send-Queue und ein
//! Abbruch-Token. Die Registry haelt die Sende-Seite, die Verbindungs-Task
//! die Empfangs-Seite (`SubscriberEmpfang`).
//!
//! ## Garantien
//! - `snapshot` liefert eine Kopie in Beitrittsreihenfolge; die Registry
//!   bleibt dabei nicht gesperrt.
//! - `entfernen` bricht das Token ab. Ein Handle aus einem aelteren
//!   Snapshot sendet danach nichts mehr, und die Empfangs-Seite liefert
//!   nach dem Abbruch keine Nachricht mehr aus.
//! - `alle_schliessen` leert die Registry und weist neue Beitritte ab.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use levelcast_core::SubscriberId;
use levelcast_protocol::SubscriberInfo;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{BroadcastError, BroadcastResult};

/// Standard-Groesse der Send-Queue pro Subscriber
pub const SEND_QUEUE_GROESSE: usize = 32;

// ---------------------------------------------------------------------------
// Subscriber (Sende-Seite)
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Subscribers
pub struct Subscriber<M> {
    id: SubscriberId,
    seq: u64,
    peer: Option<String>,
    verbunden_seit: DateTime<Utc>,
    tx: mpsc::Sender<M>,
    abbruch: CancellationToken,
}

impl<M> Clone for Subscriber<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            seq: self.seq,
            peer: self.peer.clone(),
            verbunden_seit: self.verbunden_seit,
            tx: self.tx.clone(),
            abbruch: self.abbruch.clone(),
        }
    }
}

impl<M> std::fmt::Debug for Subscriber<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("getrennt", &self.ist_getrennt())
            .finish()
    }
}

impl<M> Subscriber<M> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Ob der Subscriber entfernt wurde oder seine Verbindung zu ist
    pub fn ist_getrennt(&self) -> bool {
        self.abbruch.is_cancelled() || self.tx.is_closed()
    }

    /// Sendet eine Nachricht nicht-blockierend an den Subscriber
    pub fn senden(&self, nachricht: M) -> BroadcastResult<()> {
        if self.abbruch.is_cancelled() {
            return Err(BroadcastError::Getrennt);
        }
        match self.tx.try_send(nachricht) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(BroadcastError::QueueVoll),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BroadcastError::Getrennt),
        }
    }

    pub fn info(&self) -> SubscriberInfo {
        SubscriberInfo {
            id: self.id,
            peer: self.peer.clone(),
            connected_at: self.verbunden_seit,
        }
    }
}

// ---------------------------------------------------------------------------
// SubscriberEmpfang (Empfangs-Seite)
// ---------------------------------------------------------------------------

/// Empfangs-Seite eines Subscribers, gehalten von der Verbindungs-Task
#[derive(Debug)]
pub struct SubscriberEmpfang<M> {
    id: SubscriberId,
    rx: mpsc::Receiver<M>,
    abbruch: CancellationToken,
}

impl<M> SubscriberEmpfang<M> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Naechste Nachricht fuer diese Verbindung
    ///
    /// `None` sobald der Subscriber entfernt oder die Registry geschlossen
    /// wurde. Der Abbruch hat Vorrang vor noch eingereihten Nachrichten.
    pub async fn naechste(&mut self) -> Option<M> {
        tokio::select! {
            biased;
            _ = self.abbruch.cancelled() => None,
            nachricht = self.rx.recv() => nachricht,
        }
    }

    /// Ob der Subscriber von der Registry abgemeldet wurde
    pub fn ist_abgebrochen(&self) -> bool {
        self.abbruch.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// SubscriberRegistry
// ---------------------------------------------------------------------------

/// Nebenlaeufig nutzbare Menge aktiver Subscriber
///
/// Clone teilt den inneren Zustand.
pub struct SubscriberRegistry<M> {
    inner: Arc<RegistryInner<M>>,
}

struct RegistryInner<M> {
    name: String,
    queue_groesse: usize,
    subscribers: DashMap<SubscriberId, Subscriber<M>>,
    naechste_seq: AtomicU64,
    geschlossen: AtomicBool,
}

impl<M> Clone for SubscriberRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> SubscriberRegistry<M> {
    /// Erstellt eine leere Registry mit Standard-Queue-Groesse
    pub fn neu(name: impl Into<String>) -> Self {
        Self::mit_queue_groesse(name, SEND_QUEUE_GROESSE)
    }

    pub fn mit_queue_groesse(name: impl Into<String>, queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                name: name.into(),
                queue_groesse: queue_groesse.max(1),
                subscribers: DashMap::new(),
                naechste_seq: AtomicU64::new(0),
                geschlossen: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Nimmt einen neuen Subscriber auf und gibt seine Empfangs-Seite zurueck
    pub fn hinzufuegen(&self, peer: Option<String>) -> BroadcastResult<SubscriberEmpfang<M>> {
        if self.ist_geschlossen() {
            return Err(BroadcastError::RegistryGeschlossen(self.inner.name.clone()));
        }

        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        let id = SubscriberId::new();
        let abbruch = CancellationToken::new();
        let subscriber = Subscriber {
            id,
            seq: self.inner.naechste_seq.fetch_add(1, Ordering::Relaxed),
            peer,
            verbunden_seit: Utc::now(),
            tx,
            abbruch: abbruch.clone(),
        };
        self.inner.subscribers.insert(id, subscriber);

        // alle_schliessen kann zwischen Pruefung und Einfuegen gelaufen sein
        if self.ist_geschlossen() {
            self.entfernen(&id);
            return Err(BroadcastError::RegistryGeschlossen(self.inner.name.clone()));
        }

        tracing::debug!(registry = %self.inner.name, subscriber = %id, "Subscriber registriert");
        Ok(SubscriberEmpfang { id, rx, abbruch })
    }

    /// Entfernt einen Subscriber und bricht seine Verbindung ab
    ///
    /// Gibt `true` zurueck wenn der Subscriber noch registriert war.
    pub fn entfernen(&self, id: &SubscriberId) -> bool {
        match self.inner.subscribers.remove(id) {
            Some((_, subscriber)) => {
                subscriber.abbruch.cancel();
                tracing::debug!(registry = %self.inner.name, subscriber = %id, "Subscriber entfernt");
                true
            }
            None => false,
        }
    }

    /// Kopie aller aktuellen Subscriber in Beitrittsreihenfolge
    pub fn snapshot(&self) -> Vec<Subscriber<M>> {
        let mut liste: Vec<Subscriber<M>> = self
            .inner
            .subscribers
            .iter()
            .map(|eintrag| eintrag.value().clone())
            .collect();
        liste.sort_by_key(|s| s.seq);
        liste
    }

    pub fn anzahl(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.inner.subscribers.is_empty()
    }

    pub fn enthaelt(&self, id: &SubscriberId) -> bool {
        self.inner.subscribers.contains_key(id)
    }

    /// Diagnose-Infos aller Subscriber in Beitrittsreihenfolge
    pub fn infos(&self) -> Vec<SubscriberInfo> {
        self.snapshot().iter().map(Subscriber::info).collect()
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.inner.geschlossen.load(Ordering::Acquire)
    }

    /// Schliesst die Registry: entfernt und trennt alle Subscriber
    ///
    /// Gibt die Anzahl getrennter Subscriber zurueck. Danach werden neue
    /// Beitritte abgewiesen.
    pub fn alle_schliessen(&self) -> usize {
        self.inner.geschlossen.store(true, Ordering::Release);
        let ids: Vec<SubscriberId> = self
            .inner
            .subscribers
            .iter()
            .map(|eintrag| *eintrag.key())
            .collect();
        let getrennt = ids.iter().filter(|id| self.entfernen(id)).count();
        tracing::info!(registry = %self.inner.name, getrennt, "Alle Subscriber getrennt");
        getrennt
    }
}

impl<M: Clone> SubscriberRegistry<M> {
    /// Sendet eine Nachricht an alle Subscriber des aktuellen Snapshots
    ///
    /// Subscriber, bei denen das Senden scheitert, werden entfernt und
    /// nicht erneut versucht. Gibt die Anzahl erfolgreicher Sendungen zurueck.
    pub fn an_alle_senden(&self, nachricht: &M) -> usize {
        let mut gesendet = 0;
        for subscriber in self.snapshot() {
            match subscriber.senden(nachricht.clone()) {
                Ok(()) => gesendet += 1,
                Err(e) => {
                    if self.entfernen(&subscriber.id()) {
                        tracing::info!(
                            registry = %self.inner.name,
                            subscriber = %subscriber.id(),
                            grund = %e,
                            "Senden fehlgeschlagen, Subscriber entfernt"
                        );
                    }
                }
            }
        }
        gesendet
    }
}

// ---------------------------------------------------------------------------
// Schliessbar
// ---------------------------------------------------------------------------

/// Gemeinsame Sicht des Shutdown-Koordinators auf alle Registries
pub trait Schliessbar: Send + Sync {
    fn name(&self) -> &str;
    fn anzahl(&self) -> usize;
    fn alle_schliessen(&self) -> usize;
}

impl<M: Send + 'static> Schliessbar for SubscriberRegistry<M> {
    fn name(&self) -> &str {
        SubscriberRegistry::name(self)
    }

    fn anzahl(&self) -> usize {
        SubscriberRegistry::anzahl(self)
    }

    fn alle_schliessen(&self) -> usize {
        SubscriberRegistry::alle_schliessen(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_in_beitrittsreihenfolge() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let a = registry.hinzufuegen(Some("a".into())).unwrap();
        let b = registry.hinzufuegen(Some("b".into())).unwrap();
        let c = registry.hinzufuegen(None).unwrap();

        let ids: Vec<_> = registry.snapshot().iter().map(Subscriber::id).collect();
        assert_eq!(ids, vec![a.id(), b.id(), c.id()]);
        assert_eq!(registry.anzahl(), 3);
    }

    #[test]
    fn ids_sind_eindeutig() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let a = registry.hinzufuegen(None).unwrap();
        registry.entfernen(&a.id());
        let b = registry.hinzufuegen(None).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn an_alle_senden_erreicht_jeden() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let mut a = registry.hinzufuegen(None).unwrap();
        let mut b = registry.hinzufuegen(None).unwrap();

        assert_eq!(registry.an_alle_senden(&7), 2);
        assert_eq!(a.naechste().await, Some(7));
        assert_eq!(b.naechste().await, Some(7));
    }

    #[tokio::test]
    async fn entfernter_subscriber_aus_altem_snapshot_bekommt_nichts() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let mut empfang = registry.hinzufuegen(None).unwrap();
        let snapshot = registry.snapshot();

        assert!(registry.entfernen(&empfang.id()));
        assert!(matches!(
            snapshot[0].senden(1),
            Err(BroadcastError::Getrennt)
        ));
        assert_eq!(empfang.naechste().await, None);
        assert!(empfang.ist_abgebrochen());
    }

    #[tokio::test]
    async fn eingereihte_nachricht_nach_entfernen_wird_nicht_ausgeliefert() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let mut empfang = registry.hinzufuegen(None).unwrap();
        assert_eq!(registry.an_alle_senden(&1), 1);

        registry.entfernen(&empfang.id());
        assert_eq!(empfang.naechste().await, None);
    }

    #[test]
    fn getrennte_verbindung_wird_beim_senden_entfernt() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let a = registry.hinzufuegen(None).unwrap();
        let _b = registry.hinzufuegen(None).unwrap();
        drop(a);

        assert_eq!(registry.an_alle_senden(&1), 1);
        assert_eq!(registry.anzahl(), 1);
    }

    #[test]
    fn volle_queue_entfernt_subscriber() {
        let registry = SubscriberRegistry::<u32>::mit_queue_groesse("test", 1);
        let _empfang = registry.hinzufuegen(None).unwrap();

        assert_eq!(registry.an_alle_senden(&1), 1);
        assert_eq!(registry.an_alle_senden(&2), 0);
        assert!(registry.ist_leer());
    }

    #[tokio::test]
    async fn alle_schliessen_trennt_und_sperrt() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let mut a = registry.hinzufuegen(None).unwrap();
        let mut b = registry.hinzufuegen(None).unwrap();

        assert_eq!(registry.alle_schliessen(), 2);
        assert!(registry.ist_leer());
        assert_eq!(a.naechste().await, None);
        assert_eq!(b.naechste().await, None);
        assert!(matches!(
            registry.hinzufuegen(None),
            Err(BroadcastError::RegistryGeschlossen(_))
        ));
        assert_eq!(registry.alle_schliessen(), 0);
    }

    #[test]
    fn entfernen_unbekannter_id_ist_harmlos() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        assert!(!registry.entfernen(&SubscriberId::new()));

        let empfang = registry.hinzufuegen(None).unwrap();
        assert!(registry.enthaelt(&empfang.id()));
        assert!(registry.entfernen(&empfang.id()));
        assert!(!registry.enthaelt(&empfang.id()));
        assert!(!registry.entfernen(&empfang.id()));
    }

    #[test]
    fn nebenlaeufiges_entfernen_waehrend_fanout() {
        let registry = SubscriberRegistry::<u32>::neu("test");
        let empfaenger: Vec<_> = (0..50).map(|_| registry.hinzufuegen(None).unwrap()).collect();
        let ids: Vec<_> = empfaenger.iter().map(|e| e.id()).collect();

        std::thread::scope(|s| {
            let r = registry.clone();
            s.spawn(move || {
                for id in &ids {
                    r.entfernen(id);
                }
            });
            for i in 0..20 {
                registry.an_alle_senden(&i);
            }
        });

        assert!(registry.ist_leer());
        drop(empfaenger);
    }
}
