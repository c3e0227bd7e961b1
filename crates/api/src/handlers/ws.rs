//! Gemeinsame WebSocket-Schleife fuer Registry-Verbindungen
//!
//! Leitet Nachrichten aus der Send-Queue eines Subscribers an den Socket
//! weiter, bis der Client trennt oder die Registry den Subscriber entfernt.
//! Eingehende Nachrichten des Clients werden ignoriert.

use axum::extract::ws::{Message, WebSocket};
use levelcast_broadcast::{SubscriberEmpfang, SubscriberRegistry};

/// Bedient eine Verbindung bis zur Trennung und meldet sie danach ab
///
/// `kodieren` wandelt eine Registry-Nachricht in den Text-Frame um;
/// `None` ueberspringt die Nachricht.
pub async fn verbindung_bedienen<M, F>(
    mut socket: WebSocket,
    mut empfang: SubscriberEmpfang<M>,
    registry: SubscriberRegistry<M>,
    initial: Option<String>,
    kodieren: F,
) where
    M: Send + 'static,
    F: Fn(M) -> Option<String>,
{
    let id = empfang.id();
    tracing::info!(registry = registry.name(), subscriber = %id, "WebSocket verbunden");

    let mut offen = match initial {
        Some(text) => socket.send(Message::Text(text)).await.is_ok(),
        None => true,
    };

    while offen {
        tokio::select! {
            nachricht = empfang.naechste() => match nachricht {
                Some(nachricht) => {
                    if let Some(text) = kodieren(nachricht) {
                        offen = socket.send(Message::Text(text)).await.is_ok();
                    }
                }
                None => {
                    // Von der Registry getrennt (Shutdown oder Sendefehler)
                    let _ = socket.send(Message::Close(None)).await;
                    offen = false;
                }
            },
            eingang = socket.recv() => match eingang {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => offen = false,
                Some(Ok(_)) => {}
            },
        }
    }

    registry.entfernen(&id);
    tracing::info!(registry = registry.name(), subscriber = %id, "WebSocket getrennt");
}
