//! Gemeinsame Identifikationstypen fuer levelcast
//!
//! IDs verwenden das Newtype-Pattern, damit sie zur Compilezeit nicht mit
//! anderen UUIDs verwechselt werden koennen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige ID einer Abonnenten-Verbindung
///
/// Jede Verbindung bekommt eine frische ID. IDs werden nie wiederverwendet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Erstellt eine neue zufaellige SubscriberId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_id_eindeutig() {
        let a = SubscriberId::new();
        let b = SubscriberId::new();
        assert_ne!(a, b, "Zwei neue SubscriberIds muessen verschieden sein");
    }

    #[test]
    fn subscriber_id_display() {
        let id = SubscriberId(Uuid::nil());
        assert!(id.to_string().starts_with("sub:"));
    }

    #[test]
    fn subscriber_id_serialisiert_als_uuid() {
        let id = SubscriberId(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let zurueck: SubscriberId = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, id);
    }
}
