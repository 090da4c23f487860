use log::{error, info};
use sma2mqtt_core::speedwire::synthetic::{FrameBuilder, MeterSimulation};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time;

#[derive(Debug, Clone)]
pub struct MockMeterConfig {
    pub target: SocketAddrV4,
    pub interval: Duration,
    pub max_phase_w: f64,
    pub serial: u32,
    pub ttl: u32,
    /// Stop after this many frames.
    pub count: Option<u64>,
}

impl MockMeterConfig {
    pub fn new(
        group: Ipv4Addr,
        port: u16,
        interval_secs: f64,
        max_phase_w: f64,
        serial: u32,
        count: Option<u64>,
    ) -> Result<Self, String> {
        if !(interval_secs > 0.0 && interval_secs.is_finite()) {
            return Err(format!("Interval must be positive, got {}", interval_secs));
        }
        if !(max_phase_w.is_finite() && max_phase_w >= 0.0) {
            return Err(format!(
                "Maximum phase power must be a finite, non-negative number, got {}",
                max_phase_w
            ));
        }
        Ok(MockMeterConfig {
            target: SocketAddrV4::new(group, port),
            interval: Duration::from_secs_f64(interval_secs),
            max_phase_w,
            serial,
            ttl: 1,
            count,
        })
    }
}

/// Broadcasts simulated energy meter frames to the configured target.
pub async fn run_mock_meter(config: MockMeterConfig) -> io::Result<()> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
    if config.target.ip().is_multicast() {
        socket.set_multicast_ttl_v4(config.ttl)?;
    }
    info!("Mock meter sending to {}", config.target);
    info!(
        "Mock meter interval {:?}, up to {} W per phase",
        config.interval, config.max_phase_w
    );

    let builder = FrameBuilder::new().serial(config.serial);
    let mut meter = MeterSimulation::new(config.max_phase_w);
    let started = Instant::now();
    let mut ticker = time::interval(config.interval);
    let mut sent = 0u64;

    loop {
        if let Some(count) = config.count {
            if sent >= count {
                break;
            }
        }

        tokio::select! {
            _ = ticker.tick() => {
                let readings = meter.next_readings(config.interval);
                let frame = builder
                    .clone()
                    .ticker_ms(started.elapsed().as_millis() as u32)
                    .build(&readings);
                if let Err(e) = socket.send_to(&frame, config.target).await {
                    error!("MOCK METER: Error sending frame: {}", e);
                    return Err(e);
                }
                sent += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("MOCK METER: Shutting down after {} frames", sent);
                break;
            }
        }
    }

    Ok(())
}
