//! levelcast – Einstiegspunkt
//!
//! Liest Kommandozeile und Konfiguration, initialisiert das Logging und
//! fuehrt den gewaehlten Befehl aus.

use anyhow::Result;
use clap::Parser;
use levelcast_observability::logging_initialisieren;
use levelcast_server::cli::{Befehl, Cli};
use levelcast_server::config::ServerConfig;
use levelcast_server::{geraete_auflisten, kalibrieren, Server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::laden(&cli.config)?;
    cli.anwenden(&mut config);

    logging_initialisieren(&config.logging.level, &config.logging.format);
    config.validieren()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "levelcast wird initialisiert"
    );

    match cli.befehl() {
        Befehl::Serve => Server::neu(config).starten().await,
        Befehl::Calibrate { seconds, output } => {
            let dauer = std::time::Duration::from_secs(seconds);
            let baseline = kalibrieren(&config, dauer, &output).await?;
            println!("{baseline}");
            Ok(())
        }
        Befehl::Devices => geraete_auflisten(),
    }
}
