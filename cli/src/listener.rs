// This file contains the implementation of the Speedwire listener.
//
// The listener joins the energy meter multicast group and feeds every datagram
// through the core pipeline:
// - Datagrams from other devices or frame types on the group are skipped quietly.
// - Frames that fail validation (incomplete, missing fields, implausible values)
//   are skipped and counted.
// - Accepted frames are printed as a one-line summary and the changed values are
//   handed to the configured publisher.
// - Every N seconds it reports how many datagrams were accepted and rejected.
// - It warns when nothing was received for the configured timeout.
// - Ctrl-C stops the loop between two datagrams.
//
// The software aims to never panic and gracefully handle errors.

use crate::console::Console;
use crate::publishers::{make_publisher, OutputFormat};

use clap::Args;
use log::{error, info, warn};
use sma2mqtt_core::config::{
    Bounds, CoreConfig, GateConfig, DEFAULT_MAX_ENERGY_KWH, DEFAULT_MAX_POWER_W,
    DEFAULT_REPUBLISH_THRESHOLD,
};
use sma2mqtt_core::pipeline::Pipeline;
use sma2mqtt_core::publisher::Publisher;
use sma2mqtt_core::speedwire::common::MAX_DATAGRAM_LEN;
use sma2mqtt_core::speedwire::RejectKind;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout, MissedTickBehavior};

pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 12, 255, 254);
pub const DEFAULT_PORT: u16 = 9522;

// One byte more than the largest frame, so oversized datagrams are detected
// instead of being cut down to a valid looking length.
const RECV_BUFFER_LEN: usize = MAX_DATAGRAM_LEN + 1;

#[derive(Debug, Clone, Args)]
pub struct ListenerArgs {
    /// Multicast group the meter broadcasts to
    #[arg(long, default_value_t = DEFAULT_GROUP)]
    pub group: Ipv4Addr,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Local interface address used to join the group
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub interface: Ipv4Addr,

    /// Topic prefix, values are published to <topic>/<field>
    #[arg(long, default_value = "sma")]
    pub topic: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Discrete)]
    pub format: OutputFormat,

    /// Accepted datagrams after which all fields are published again
    #[arg(long, default_value_t = DEFAULT_REPUBLISH_THRESHOLD)]
    pub republish_threshold: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_POWER_W)]
    pub max_power_w: f64,

    #[arg(long, default_value_t = DEFAULT_MAX_ENERGY_KWH)]
    pub max_energy_kwh: f64,

    /// Seconds without any datagram before a warning is logged
    #[arg(long, default_value_t = 30.0)]
    pub timeout: f64,

    #[arg(long, default_value_t = 60.0)]
    pub stats_interval: f64,

    /// Do not print the summary line for every frame
    #[arg(long, default_value_t = false)]
    pub quiet: bool,

    #[arg(long, default_value_t = false)]
    pub no_color: bool,
}

impl ListenerArgs {
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            bounds: Bounds {
                max_power_w: self.max_power_w,
                max_energy_kwh: self.max_energy_kwh,
            },
            gate: GateConfig {
                republish_threshold: self.republish_threshold,
            },
        }
    }
}

/// Receive counters, reset after every report except for the totals.
#[derive(Debug, Default)]
pub struct Stats {
    pub received: usize,
    pub accepted: usize,
    pub published: usize,
    pub rejected: HashMap<RejectKind, usize>,
    pub total_accepted: usize,
}

impl Stats {
    pub fn accept(&mut self, published: usize) {
        self.received += 1;
        self.accepted += 1;
        self.total_accepted += 1;
        self.published += published;
    }

    pub fn reject(&mut self, kind: RejectKind) {
        self.received += 1;
        *self.rejected.entry(kind).or_insert(0) += 1;
    }

    pub fn rejected(&self, kind: RejectKind) -> usize {
        self.rejected.get(&kind).copied().unwrap_or(0)
    }

    pub fn report(&mut self, interval_secs: f64) -> String {
        let line = format!(
            "Stats ~ Frames: {:.2}/s, Published: {}, Not SMA: {}, Incomplete: {}, Missing Fields: {}, Out of Bounds: {}",
            self.accepted as f64 / interval_secs,
            self.published,
            self.rejected(RejectKind::NotThisProtocol),
            self.rejected(RejectKind::IncompleteFrame),
            self.rejected(RejectKind::FieldMissing),
            self.rejected(RejectKind::OutOfBounds),
        );
        self.received = 0;
        self.accepted = 0;
        self.published = 0;
        self.rejected.clear();
        line
    }
}

/// Loop settings that do not concern the core.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub timeout: Duration,
    pub stats_interval: Duration,
    /// Stop after this many received datagrams.
    pub max_datagrams: Option<usize>,
}

impl LoopSettings {
    pub fn new(timeout_secs: f64, stats_interval_secs: f64) -> io::Result<Self> {
        for (name, secs) in [("timeout", timeout_secs), ("stats interval", stats_interval_secs)] {
            if !(secs > 0.0 && secs.is_finite()) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} must be a positive number of seconds, got {}", name, secs),
                ));
            }
        }
        Ok(LoopSettings {
            timeout: Duration::from_secs_f64(timeout_secs),
            stats_interval: Duration::from_secs_f64(stats_interval_secs),
            max_datagrams: None,
        })
    }
}

pub async fn run_listener(args: ListenerArgs) -> io::Result<()> {
    info!("Starting Speedwire listener with args: {:?}", args);
    let settings = LoopSettings::new(args.timeout, args.stats_interval)?;

    let socket = bind_multicast(args.group, args.port, args.interface)?;
    let mut pipeline = Pipeline::new(args.core_config());
    let mut publisher = make_publisher(args.format, &args.topic);
    let console = if args.quiet {
        None
    } else {
        Some(Console::new(!args.no_color))
    };
    listen(
        &socket,
        &mut pipeline,
        publisher.as_mut(),
        console.as_ref(),
        &settings,
    )
    .await
    .map(|_| ())
}

fn bind_multicast(group: Ipv4Addr, port: u16, interface: Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = bind_reusable(port)?;

    info!("Joining multicast group {} on {}", group, interface);
    if let Err(e) = socket.join_multicast_v4(&group, &interface) {
        error!("Failed to join multicast group {}: {}", group, e);
        return Err(e);
    }

    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket)
}

/// Binds the port with SO_REUSEADDR so other Speedwire consumers on the same
/// host can share it.
fn bind_reusable(port: u16) -> io::Result<std::net::UdpSocket> {
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    info!("Binding to UDP {}", address);
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.into())?;
    Ok(socket.into())
}

/// Receives and processes datagrams until Ctrl-C or `max_datagrams`.
///
/// Returns the statistics of the last, unreported interval.
pub async fn listen(
    socket: &UdpSocket,
    pipeline: &mut Pipeline,
    publisher: &mut dyn Publisher,
    console: Option<&Console>,
    settings: &LoopSettings,
) -> io::Result<Stats> {
    let mut stats = Stats::default();
    let mut received = 0usize;
    let mut buffer = [0u8; RECV_BUFFER_LEN];
    let mut last_data_time = Instant::now();

    let mut stats_timer = interval(settings.stats_interval);
    stats_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    stats_timer.tick().await;

    loop {
        if let Some(max) = settings.max_datagrams {
            if received >= max {
                break;
            }
        }

        tokio::select! {
            result = timeout(settings.timeout, socket.recv_from(&mut buffer)) => {
                match result {
                    Ok(Ok((bytes_read, _addr))) => {
                        received += 1;
                        last_data_time = Instant::now();
                        match pipeline.process(&buffer[..bytes_read], publisher) {
                            Ok(processed) => {
                                stats.accept(processed.changed.len());
                                if let Some(console) = console {
                                    console.print(&processed.measurements);
                                }
                            }
                            Err(e) => {
                                e.log();
                                stats.reject(e.kind());
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        error!("UDP receive error: {}", e);
                        return Err(e);
                    }
                    Err(_) => {
                        warn!(
                            "No datagram received for {:.0} seconds",
                            last_data_time.elapsed().as_secs_f64()
                        );
                    }
                }
            }
            _ = stats_timer.tick() => {
                info!("{}", stats.report(settings.stats_interval.as_secs_f64()));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down Speedwire listener");
                break;
            }
        }
    }

    Ok(stats)
}
