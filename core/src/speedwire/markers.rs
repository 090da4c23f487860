//! OBIS channel markers of the energy meter frame.
//!
//! A marker is the 4 byte OBIS identifier (channel, index, type, tariff) that
//! precedes a measurement. Index 4 is an instantaneous 32 bit value, index 8
//! a 64 bit counter.

use super::common::{ValueWidth, END_MARKER, END_SENTINEL, HEADER_OFFSET, MAGIC};
use super::measurement::Field;

use serde::{Deserialize, Serialize};

/// Watt-seconds per kilowatt-hour.
pub const ENERGY_SCALE: f64 = 3600.0 * 1000.0;

/// Power values are transmitted in tenths of a watt.
pub const POWER_SCALE: f64 = 10.0;

/// Decimal places kept for energy counters.
pub const ENERGY_DECIMALS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldMarker {
    pub marker: [u8; 4],
    pub width: ValueWidth,
    pub scale: f64,
    /// Decimal places the scaled value is rounded to, if any.
    pub round: Option<u32>,
    pub field: Field,
}

impl FieldMarker {
    pub const fn power(channel: u8, field: Field) -> Self {
        FieldMarker {
            marker: [0x00, channel, 0x04, 0x00],
            width: ValueWidth::U32,
            scale: POWER_SCALE,
            round: None,
            field,
        }
    }

    pub const fn energy(channel: u8, field: Field) -> Self {
        FieldMarker {
            marker: [0x00, channel, 0x08, 0x00],
            width: ValueWidth::U64,
            scale: ENERGY_SCALE,
            round: Some(ENERGY_DECIMALS),
            field,
        }
    }
}

/// Default marker table of the energy meter / home manager frame.
pub const DEFAULT_MARKERS: [FieldMarker; 10] = [
    FieldMarker::power(0x01, Field::TotalWBuy),
    FieldMarker::power(0x02, Field::TotalWSell),
    FieldMarker::energy(0x01, Field::TotalKwhBuy),
    FieldMarker::energy(0x02, Field::TotalKwhSell),
    FieldMarker::power(0x15, Field::L1WBuy),
    FieldMarker::power(0x16, Field::L1WSell),
    FieldMarker::power(0x29, Field::L2WBuy),
    FieldMarker::power(0x2A, Field::L2WSell),
    FieldMarker::power(0x3D, Field::L3WBuy),
    FieldMarker::power(0x3E, Field::L3WSell),
];

/// Where to look for things inside a datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub magic: [u8; 3],
    pub header_offset: usize,
    pub end_marker: [u8; 4],
    /// Distance from the end of `end_marker` to the sentinel byte.
    pub sentinel_offset: usize,
    pub sentinel: u8,
    pub markers: Vec<FieldMarker>,
}

impl Default for FrameLayout {
    fn default() -> Self {
        FrameLayout {
            magic: MAGIC,
            header_offset: HEADER_OFFSET,
            end_marker: END_MARKER,
            sentinel_offset: 0,
            sentinel: END_SENTINEL,
            markers: DEFAULT_MARKERS.to_vec(),
        }
    }
}

impl FrameLayout {
    pub fn marker_for(&self, field: Field) -> Option<&FieldMarker> {
        self.markers.iter().find(|m| m.field == field)
    }

    /// Transmitted fields that have no marker in this layout.
    pub fn uncovered_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !f.is_derived() && self.marker_for(*f).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::common::Quantity;
    use super::*;

    #[test]
    fn test_default_markers_cover_schema() {
        let layout = FrameLayout::default();
        assert!(layout.uncovered_fields().is_empty());

        for marker in &layout.markers {
            assert!(!marker.field.is_derived());
            assert_eq!(
                marker.width,
                match marker.field.quantity() {
                    Quantity::Power => ValueWidth::U32,
                    Quantity::Energy => ValueWidth::U64,
                }
            );
        }

        // markers are unique
        for (i, a) in layout.markers.iter().enumerate() {
            for b in &layout.markers[i + 1..] {
                assert_ne!(a.marker, b.marker);
            }
        }
    }

    #[test]
    fn test_marker_bytes() {
        let layout = FrameLayout::default();
        assert_eq!(
            layout.marker_for(Field::TotalWBuy).unwrap().marker,
            [0x00, 0x01, 0x04, 0x00]
        );
        assert_eq!(
            layout.marker_for(Field::TotalKwhSell).unwrap().marker,
            [0x00, 0x02, 0x08, 0x00]
        );
        assert_eq!(
            layout.marker_for(Field::L3WSell).unwrap().marker,
            [0x00, 0x3E, 0x04, 0x00]
        );
        assert!(layout.marker_for(Field::TotalW).is_none());
    }

    #[test]
    fn test_layout_from_json() {
        let mut layout = FrameLayout::default();
        layout.sentinel_offset = 3;
        let json = serde_json::to_string(&layout).unwrap();
        let loaded: FrameLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, layout);

        let marker: FieldMarker = serde_json::from_str(
            r#"{"marker":[0,21,4,0],"width":"U32","scale":10.0,"round":null,"field":"l1_w_buy"}"#,
        )
        .unwrap();
        assert_eq!(marker, FieldMarker::power(0x15, Field::L1WBuy));
    }

    #[test]
    fn test_uncovered_fields() {
        let mut layout = FrameLayout::default();
        layout.markers.retain(|m| m.field != Field::L2WSell);
        assert_eq!(layout.uncovered_fields(), vec![Field::L2WSell]);
    }
}
