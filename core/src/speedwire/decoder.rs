//! Turns one Speedwire datagram into a [`MeasurementSet`].
//!
//! A datagram is accepted only as a whole: the magic tag, the end marker and
//! every field marker must be present and every value must lie within the
//! configured bounds. Anything else is reported as a [`DecodeError`].

use super::common::{DecodeError, Quantity, MAX_DATAGRAM_LEN};
use super::markers::FrameLayout;
use super::measurement::{Field, MeasurementSet, PhaseReading};
use super::utils::{find_marker, round_to, value_after_marker};
use crate::config::Bounds;

#[derive(Debug, Clone, Default)]
pub struct Decoder {
    layout: FrameLayout,
    bounds: Bounds,
}

impl Decoder {
    pub fn new(layout: FrameLayout, bounds: Bounds) -> Self {
        let uncovered = layout.uncovered_fields();
        if !uncovered.is_empty() {
            log::warn!(
                "Frame layout has no marker for {:?}, every datagram will be rejected",
                uncovered
            );
        }
        Decoder { layout, bounds }
    }

    pub fn with_bounds(bounds: Bounds) -> Self {
        Decoder::new(FrameLayout::default(), bounds)
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Decodes a datagram, failing rather than returning partial data.
    pub fn decode(&self, datagram: &[u8]) -> Result<MeasurementSet, DecodeError> {
        self.check_magic(datagram)?;
        if datagram.len() > MAX_DATAGRAM_LEN {
            return Err(DecodeError::IncompleteFrame {
                message: format!(
                    "datagram of {} bytes exceeds {} bytes",
                    datagram.len(),
                    MAX_DATAGRAM_LEN
                ),
            });
        }
        self.check_complete(datagram)?;

        let mut raw = [None; Field::COUNT];
        for marker in &self.layout.markers {
            let value = match value_after_marker(
                datagram,
                &marker.marker,
                self.layout.header_offset,
                marker.width,
            ) {
                Some(Some(value)) => value,
                Some(None) => {
                    return Err(DecodeError::IncompleteFrame {
                        message: format!("value of {} truncated", marker.field),
                    })
                }
                None => {
                    log::debug!("Marker {:02X?} not found", marker.marker);
                    return Err(DecodeError::FieldMissing {
                        field: marker.field.name(),
                    });
                }
            };

            let scaled = value as f64 / marker.scale;
            raw[marker.field.index()] = Some(match marker.round {
                Some(places) => round_to(scaled, places),
                None => scaled,
            });
        }

        let get = |field: Field| {
            raw[field.index()].ok_or(DecodeError::FieldMissing {
                field: field.name(),
            })
        };
        let set = MeasurementSet {
            l1: PhaseReading::new(get(Field::L1WBuy)?, get(Field::L1WSell)?),
            l2: PhaseReading::new(get(Field::L2WBuy)?, get(Field::L2WSell)?),
            l3: PhaseReading::new(get(Field::L3WBuy)?, get(Field::L3WSell)?),
            total: PhaseReading::new(get(Field::TotalWBuy)?, get(Field::TotalWSell)?),
            energy_buy_kwh: get(Field::TotalKwhBuy)?,
            energy_sell_kwh: get(Field::TotalKwhSell)?,
        };

        self.check_bounds(&set)?;
        Ok(set)
    }

    fn check_magic(&self, datagram: &[u8]) -> Result<(), DecodeError> {
        if !datagram.starts_with(&self.layout.magic) {
            return Err(DecodeError::NotThisProtocol {
                prefix: datagram.iter().take(self.layout.magic.len()).copied().collect(),
            });
        }
        Ok(())
    }

    fn check_complete(&self, datagram: &[u8]) -> Result<(), DecodeError> {
        let layout = &self.layout;
        let pos = find_marker(datagram, &layout.end_marker, layout.header_offset).ok_or_else(
            || DecodeError::IncompleteFrame {
                message: "end marker not found".to_string(),
            },
        )?;

        let at = pos + layout.end_marker.len() + layout.sentinel_offset;
        match datagram.get(at) {
            Some(&byte) if byte == layout.sentinel => Ok(()),
            Some(&byte) => Err(DecodeError::IncompleteFrame {
                message: format!(
                    "sentinel mismatch: expected {}, found {}",
                    layout.sentinel, byte
                ),
            }),
            None => Err(DecodeError::IncompleteFrame {
                message: "frame ends before sentinel".to_string(),
            }),
        }
    }

    fn check_bounds(&self, set: &MeasurementSet) -> Result<(), DecodeError> {
        for (field, value) in set.iter() {
            let limit = match field.quantity() {
                Quantity::Power => self.bounds.max_power_w,
                Quantity::Energy => self.bounds.max_energy_kwh,
            };
            if value.abs() > limit {
                return Err(DecodeError::OutOfBounds {
                    field: field.name(),
                    value,
                    limit,
                });
            }
        }
        Ok(())
    }
}

/// Decodes with the default frame layout and bounds.
pub fn decode(datagram: &[u8]) -> Result<MeasurementSet, DecodeError> {
    Decoder::default().decode(datagram)
}
