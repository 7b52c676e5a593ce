//! Gateway console binary.
//!
//! Connects the configured transport and logs every payload received from
//! the swarm as hex. Mostly useful for bring-up and link debugging.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mira_gateway::{GatewayConfig, MqttConfig, SerialConfig, TransportConfig};

#[derive(Parser)]
#[command(name = "mira-gateway")]
#[command(about = "Bridge payloads between the mira swarm and this host")]
struct Cli {
    /// YAML configuration file (ignored when a transport subcommand is given).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    transport: Option<TransportCommand>,
}

#[derive(Subcommand)]
enum TransportCommand {
    /// Connect through a serial-attached gateway board.
    Serial {
        /// Device path of the gateway board.
        #[arg(long, default_value = "/dev/ttyACM0")]
        port: String,
        /// Baud rate of the gateway UART.
        #[arg(long, default_value_t = 1_000_000)]
        baudrate: u32,
    },
    /// Connect through an MQTT broker.
    Mqtt {
        /// Broker hostname.
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Broker port.
        #[arg(long, default_value_t = 1883)]
        port: u16,
        /// Username for authentication.
        #[arg(long)]
        username: Option<String>,
        /// Password for authentication.
        #[arg(long)]
        password: Option<String>,
    },
}

impl TransportCommand {
    fn into_transport(self) -> TransportConfig {
        match self {
            TransportCommand::Serial { port, baudrate } => {
                TransportConfig::Serial(SerialConfig { port, baudrate })
            }
            TransportCommand::Mqtt {
                host,
                port,
                username,
                password,
            } => TransportConfig::Mqtt(MqttConfig {
                host,
                port,
                username,
                password,
                ..MqttConfig::default()
            }),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = if let Some(command) = cli.transport {
        GatewayConfig {
            transport: command.into_transport(),
        }
    } else if let Some(path) = cli.config {
        match GatewayConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        error!("specify a transport subcommand or --config <file>");
        std::process::exit(1);
    };

    let mut adapter = config.build_adapter();
    let on_payload = Box::new(|payload: Vec<u8>| {
        info!("payload ({} bytes): {}", payload.len(), hex::encode(&payload));
    });
    if let Err(e) = adapter.init(on_payload) {
        error!("failed to start transport: {}", e);
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::Relaxed)) {
            error!("failed to install signal handler: {}", e);
        }
    }

    info!("gateway running, press Ctrl-C to stop");
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutting down");
    if let Err(e) = adapter.close() {
        error!("shutdown error: {}", e);
    }
}
