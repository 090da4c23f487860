mod capture;
mod console;
mod listener;
mod mock_meter;
mod publishers;
use clap::{Parser, Subcommand};
use listener::{ListenerArgs, DEFAULT_GROUP, DEFAULT_PORT};
use log::{error, info};
use mock_meter::{run_mock_meter, MockMeterConfig};
use sma2mqtt_core::speedwire::decode;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tokio::io;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "sma2mqtt")]
#[command(
    about = "Listen to SMA Speedwire broadcast traffic and republish changed meter values",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Join the meter multicast group and publish changed values
    Listen(ListenerArgs),
    /// Decode a captured datagram (raw bytes or hex dump) and print it as JSON
    Decode {
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Broadcast simulated energy meter frames
    MockMeter {
        #[arg(long, default_value_t = DEFAULT_GROUP)]
        group: Ipv4Addr,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value_t = 1.0)]
        interval: f64,
        #[arg(long, default_value_t = 2000.0)]
        max_phase_w: f64,
        #[arg(long, default_value_t = 3015229995)]
        serial: u32,
        #[arg(long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    // Initialize logging early to ensure all log messages are captured
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    match args.command {
        Commands::Listen(listener_args) => {
            if let Err(e) = listener::run_listener(listener_args).await {
                error!("Speedwire listener error: {}", e);
                return Err(e);
            }
        }
        Commands::Decode { file, pretty } => {
            let datagram = capture::read_capture(&file)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            info!("Decoding {} bytes from {}", datagram.len(), file.display());

            match decode(&datagram) {
                Ok(set) => {
                    let json = if pretty {
                        serde_json::to_string_pretty(&set)
                    } else {
                        serde_json::to_string(&set)
                    }
                    .map_err(io::Error::other)?;
                    println!("{}", json);
                }
                Err(e) => {
                    error!("Datagram rejected ({}): {}", e.kind(), e);
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string()));
                }
            }
        }
        Commands::MockMeter {
            group,
            port,
            interval,
            max_phase_w,
            serial,
            count,
        } => {
            let config = MockMeterConfig::new(group, port, interval, max_phase_w, serial, count)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            run_mock_meter(config).await?;
        }
    }
    Ok(())
}
