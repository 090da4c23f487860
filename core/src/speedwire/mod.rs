pub mod common;
pub mod decoder;
pub mod markers;
pub mod measurement;
pub mod synthetic;
pub mod utils;

pub use common::{DecodeError, RejectKind};
pub use decoder::{decode, Decoder};
pub use measurement::{Field, MeasurementSet};
