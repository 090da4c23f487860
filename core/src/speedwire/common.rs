use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Every Speedwire frame starts with the ASCII tag "SMA" (followed by a NUL byte).
pub const MAGIC: [u8; 3] = *b"SMA";

/// Marker searches start after the "SMA\0" tag.
pub const HEADER_OFFSET: usize = 4;

/// Largest datagram the meter emits; receive buffers are sized to this.
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Software version channel, used to validate that a frame is complete.
pub const END_MARKER: [u8; 4] = [0x90, 0x00, 0x00, 0x00];

/// ASCII 'R' (release) revision byte expected after the end marker.
pub const END_SENTINEL: u8 = 82;

/// Represents the reasons a datagram is rejected.
///
/// All variants are per-datagram conditions. The receive loop skips the
/// datagram and keeps going; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("not a Speedwire frame (prefix {prefix:02X?})")]
    NotThisProtocol { prefix: Vec<u8> },

    #[error("incomplete frame: {message}")]
    IncompleteFrame { message: String },

    #[error("field {field} missing from frame")]
    FieldMissing { field: &'static str },

    #[error("{field} = {value} exceeds bound of {limit}")]
    OutOfBounds {
        field: &'static str,
        value: f64,
        limit: f64,
    },
}

/// Fieldless classification of a [`DecodeError`], used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectKind {
    NotThisProtocol,
    IncompleteFrame,
    FieldMissing,
    OutOfBounds,
}

impl DecodeError {
    pub fn kind(&self) -> RejectKind {
        match self {
            DecodeError::NotThisProtocol { .. } => RejectKind::NotThisProtocol,
            DecodeError::IncompleteFrame { .. } => RejectKind::IncompleteFrame,
            DecodeError::FieldMissing { .. } => RejectKind::FieldMissing,
            DecodeError::OutOfBounds { .. } => RejectKind::OutOfBounds,
        }
    }

    /// Logs the rejection at a level matching how unusual it is.
    ///
    /// Foreign traffic on the multicast group is routine, while a missing
    /// marker in an otherwise valid frame points at a firmware format change.
    pub fn log(&self) {
        match self.kind() {
            RejectKind::NotThisProtocol => log::trace!("Skipping datagram: {}", self),
            RejectKind::IncompleteFrame => log::debug!("Skipping datagram: {}", self),
            RejectKind::FieldMissing => log::warn!("Skipping datagram: {}", self),
            RejectKind::OutOfBounds => log::info!("Skipping datagram: {}", self),
        }
    }
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectKind::NotThisProtocol => write!(f, "not this protocol"),
            RejectKind::IncompleteFrame => write!(f, "incomplete frame"),
            RejectKind::FieldMissing => write!(f, "field missing"),
            RejectKind::OutOfBounds => write!(f, "out of bounds"),
        }
    }
}

/// Byte width of the big-endian unsigned integer following a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueWidth {
    U32, // instantaneous values
    U64, // counters
}

impl ValueWidth {
    pub fn len(&self) -> usize {
        match self {
            ValueWidth::U32 => 4,
            ValueWidth::U64 => 8,
        }
    }
}

/// Whether a value is a power reading (W) or an energy counter (kWh).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    Power,
    Energy,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Power => write!(f, "W"),
            Quantity::Energy => write!(f, "kWh"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_kind() {
        let err = DecodeError::FieldMissing {
            field: "total_w_buy",
        };
        assert_eq!(err.kind(), RejectKind::FieldMissing);
        assert_eq!(err.to_string(), "field total_w_buy missing from frame");

        let err = DecodeError::OutOfBounds {
            field: "l1_w_buy",
            value: 150000.0,
            limit: 100000.0,
        };
        assert_eq!(err.kind(), RejectKind::OutOfBounds);
        assert_eq!(err.to_string(), "l1_w_buy = 150000 exceeds bound of 100000");
    }

    #[test]
    fn test_value_width() {
        assert_eq!(ValueWidth::U32.len(), 4);
        assert_eq!(ValueWidth::U64.len(), 8);
    }
}
