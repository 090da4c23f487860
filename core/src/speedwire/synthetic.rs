// This module builds Speedwire frames from raw register values.
// The frames are used by tests, benchmarks and the mock meter. A simulated
// meter produces plausible random readings and integrates them into the
// energy counters so that consecutive frames look like a real installation.
//
use super::common::ValueWidth;
use super::markers::FrameLayout;
use super::measurement::Field;

use rand::Rng;
use std::time::Duration;

const DEFAULT_SUSY_ID: u16 = 0x0174;
const DEFAULT_SERIAL: u32 = 0xB3B8_C22B;
const DEFAULT_VERSION: [u8; 3] = [0x02, 0x00, 0x12];

// Speedwire tags between the magic and the channel data
const TAG_GROUP: [u8; 4] = [0x00, 0x04, 0x02, 0xA0];
const GROUP_DEFAULT: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
const TAG_SMA_NET2: [u8; 2] = [0x00, 0x10];
const PROTOCOL_EMETER: [u8; 2] = [0x60, 0x69];
const END_TAG: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

/// Register values as they appear on the wire, before scaling.
///
/// Power is in tenths of a watt, energy in watt-seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReadings {
    pub l1_buy: u32,
    pub l1_sell: u32,
    pub l2_buy: u32,
    pub l2_sell: u32,
    pub l3_buy: u32,
    pub l3_sell: u32,
    pub total_buy: u32,
    pub total_sell: u32,
    pub energy_buy: u64,
    pub energy_sell: u64,
}

impl RawReadings {
    /// Raw register value of a transmitted field, `None` for derived ones.
    pub fn get(&self, field: Field) -> Option<u64> {
        let value = match field {
            Field::L1WBuy => self.l1_buy as u64,
            Field::L1WSell => self.l1_sell as u64,
            Field::L2WBuy => self.l2_buy as u64,
            Field::L2WSell => self.l2_sell as u64,
            Field::L3WBuy => self.l3_buy as u64,
            Field::L3WSell => self.l3_sell as u64,
            Field::TotalWBuy => self.total_buy as u64,
            Field::TotalWSell => self.total_sell as u64,
            Field::TotalKwhBuy => self.energy_buy,
            Field::TotalKwhSell => self.energy_sell,
            Field::L1W | Field::L2W | Field::L3W | Field::TotalW => return None,
        };
        Some(value)
    }
}

/// Serializes [`RawReadings`] into a complete energy meter datagram.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    layout: FrameLayout,
    susy_id: u16,
    serial: u32,
    ticker_ms: u32,
    version: [u8; 3],
}

impl Default for FrameBuilder {
    fn default() -> Self {
        FrameBuilder::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        FrameBuilder::with_layout(FrameLayout::default())
    }

    pub fn with_layout(layout: FrameLayout) -> Self {
        FrameBuilder {
            layout,
            susy_id: DEFAULT_SUSY_ID,
            serial: DEFAULT_SERIAL,
            ticker_ms: 0,
            version: DEFAULT_VERSION,
        }
    }

    pub fn serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    pub fn ticker_ms(mut self, ticker_ms: u32) -> Self {
        self.ticker_ms = ticker_ms;
        self
    }

    /// Major, minor and build bytes written between the end marker and the
    /// sentinel when the layout places the sentinel further out.
    pub fn version(mut self, version: [u8; 3]) -> Self {
        self.version = version;
        self
    }

    pub fn build(&self, readings: &RawReadings) -> Vec<u8> {
        let layout = &self.layout;

        let mut channels = Vec::new();
        for marker in &layout.markers {
            let value = readings.get(marker.field).unwrap_or(0);
            channels.extend_from_slice(&marker.marker);
            match marker.width {
                ValueWidth::U32 => channels.extend_from_slice(&(value as u32).to_be_bytes()),
                ValueWidth::U64 => channels.extend_from_slice(&value.to_be_bytes()),
            }
        }

        // Software version, revision letter last.
        channels.extend_from_slice(&layout.end_marker);
        let mut version = self.version.to_vec();
        version.resize(layout.sentinel_offset, 0);
        channels.extend_from_slice(&version);
        channels.push(layout.sentinel);

        let mut frame = Vec::with_capacity(channels.len() + 32);
        frame.extend_from_slice(&layout.magic);
        frame.push(0x00);
        frame.resize(layout.header_offset, 0x00);
        frame.extend_from_slice(&TAG_GROUP);
        frame.extend_from_slice(&GROUP_DEFAULT);

        // Length counts the protocol id, susy id, serial, ticker and channels.
        let data_len = (2 + 2 + 4 + 4 + channels.len()) as u16;
        frame.extend_from_slice(&data_len.to_be_bytes());
        frame.extend_from_slice(&TAG_SMA_NET2);
        frame.extend_from_slice(&PROTOCOL_EMETER);
        frame.extend_from_slice(&self.susy_id.to_be_bytes());
        frame.extend_from_slice(&self.serial.to_be_bytes());
        frame.extend_from_slice(&self.ticker_ms.to_be_bytes());
        frame.extend_from_slice(&channels);
        frame.extend_from_slice(&END_TAG);
        frame
    }
}

/// A random but self-consistent household meter.
///
/// Each phase either imports or exports, the total is the sum of the phase
/// balances and the energy counters integrate the total over time.
#[derive(Debug, Clone, Default)]
pub struct MeterSimulation {
    energy_buy_ws: f64,
    energy_sell_ws: f64,
    max_phase_w: f64,
}

impl MeterSimulation {
    pub fn new(max_phase_w: f64) -> Self {
        let mut rng = rand::rng();
        MeterSimulation {
            // Start from a used meter rather than from zero.
            energy_buy_ws: rng.random_range(1_000.0..50_000.0) * 3_600_000.0,
            energy_sell_ws: rng.random_range(1_000.0..50_000.0) * 3_600_000.0,
            max_phase_w,
        }
    }

    /// Produces the next readings, `elapsed` after the previous ones.
    pub fn next_readings(&mut self, elapsed: Duration) -> RawReadings {
        let mut rng = rand::rng();
        let max = self.max_phase_w;
        let mut phase = || -> f64 {
            if !(max.is_finite() && max > 0.0) {
                return 0.0;
            }
            rng.random_range(-max..max)
        };
        let (p1, p2, p3) = (phase(), phase(), phase());
        let total = p1 + p2 + p3;

        let secs = elapsed.as_secs_f64();
        if total < 0.0 {
            self.energy_buy_ws += -total * secs;
        } else {
            self.energy_sell_ws += total * secs;
        }

        let (l1_buy, l1_sell) = split(p1);
        let (l2_buy, l2_sell) = split(p2);
        let (l3_buy, l3_sell) = split(p3);
        let (total_buy, total_sell) = split(total);
        RawReadings {
            l1_buy,
            l1_sell,
            l2_buy,
            l2_sell,
            l3_buy,
            l3_sell,
            total_buy,
            total_sell,
            energy_buy: self.energy_buy_ws as u64,
            energy_sell: self.energy_sell_ws as u64,
        }
    }
}

// Signed watts into (buy, sell) tenths of a watt.
fn split(watts: f64) -> (u32, u32) {
    let tenths = (watts.abs() * 10.0).round() as u32;
    if watts < 0.0 {
        (tenths, 0)
    } else {
        (0, tenths)
    }
}
