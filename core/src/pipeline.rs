use crate::config::CoreConfig;
use crate::gate::{ChangeSet, ChangeTracker};
use crate::publisher::Publisher;
use crate::speedwire::common::DecodeError;
use crate::speedwire::decoder::Decoder;
use crate::speedwire::markers::FrameLayout;
use crate::speedwire::measurement::MeasurementSet;

/// Result of one accepted datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    pub measurements: MeasurementSet,
    pub changed: ChangeSet,
}

/// Decoder and change tracker driven as one unit.
///
/// Each call handles one datagram completely. A rejected datagram leaves the
/// tracker untouched, so the loop can stop between any two calls.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    decoder: Decoder,
    tracker: ChangeTracker,
}

impl Pipeline {
    pub fn new(config: CoreConfig) -> Self {
        Pipeline::with_layout(FrameLayout::default(), config)
    }

    pub fn with_layout(layout: FrameLayout, config: CoreConfig) -> Self {
        Pipeline {
            decoder: Decoder::new(layout, config.bounds),
            tracker: ChangeTracker::new(config.gate),
        }
    }

    /// Decodes `datagram`, gates it and publishes the changed fields.
    pub fn process<P: Publisher + ?Sized>(
        &mut self,
        datagram: &[u8],
        publisher: &mut P,
    ) -> Result<Processed, DecodeError> {
        let measurements = self.decoder.decode(datagram)?;
        let changed = self.tracker.should_publish(&measurements);
        for (field, value) in &changed {
            publisher.publish(*field, *value);
        }
        publisher.flush();
        Ok(Processed {
            measurements,
            changed,
        })
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }
}
