//! levelcast-broadcast – Verteilung der Pegelwerte und gezaehlter Shutdown
//!
//! ## Architektur
//!
//! ```text
//! FrameConsumer --> BroadcastLoop (ein Tick alle 250 ms)
//!                       |
//!                       v
//!              SubscriberRegistry<String>  --> WebSocket-Tasks
//!                       |
//!                  EchoCounters  <-- Bestaetigungen (HTTP)
//!                       |
//!              ShutdownCoordinator --> Stop-Signal, App-Shutdown
//! ```

pub mod broadcast_loop;
pub mod counters;
pub mod error;
pub mod registry;
pub mod shutdown;

// Bequeme Re-Exporte
pub use broadcast_loop::{BroadcastConfig, BroadcastLoop, LoopStatistik, TickErgebnis};
pub use counters::{EchoCounters, EchoErgebnis};
pub use error::{BroadcastError, BroadcastResult};
pub use registry::{Schliessbar, Subscriber, SubscriberEmpfang, SubscriberRegistry};
pub use shutdown::{ShutdownAusgang, ShutdownConfig, ShutdownCoordinator};
