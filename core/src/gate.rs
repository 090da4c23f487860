//! Change tracking between the decoder and the publisher.
//!
//! The tracker remembers the last value sent for every field and lets a value
//! through only when it differs. After `republish_threshold` accepted
//! datagrams it forgets everything, so every field is sent again and
//! consumers that treat silence as a dead meter stay satisfied.
//!
//! The state is owned by a single processing loop. Sharing one tracker
//! between sockets needs a `Mutex` around it (or one tracker per source),
//! since the compare-then-store step must not interleave.

use crate::config::GateConfig;
use crate::speedwire::measurement::{Field, MeasurementSet};

use std::collections::BTreeMap;

/// Fields to publish for one datagram, in schema order.
pub type ChangeSet = BTreeMap<Field, f64>;

#[derive(Debug, Clone)]
pub struct ChangeTracker {
    last: [Option<f64>; Field::COUNT],
    samples: u32,
    threshold: u32,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        ChangeTracker::new(GateConfig::default())
    }
}

impl ChangeTracker {
    pub fn new(config: GateConfig) -> Self {
        ChangeTracker {
            last: [None; Field::COUNT],
            samples: 0,
            threshold: config.republish_threshold,
        }
    }

    /// Returns the fields of `set` that changed or are due for a refresh,
    /// and records them as published.
    pub fn should_publish(&mut self, set: &MeasurementSet) -> ChangeSet {
        self.samples = self.samples.saturating_add(1);
        if self.samples > self.threshold {
            log::debug!(
                "Republishing all fields after {} samples",
                self.samples - 1
            );
            self.reset();
        }

        let mut changed = ChangeSet::new();
        for (field, value) in set.iter() {
            let last = &mut self.last[field.index()];
            if *last != Some(value) {
                *last = Some(value);
                changed.insert(field, value);
            }
        }
        changed
    }

    /// Forgets every published value; the next datagram is sent in full.
    pub fn reset(&mut self) {
        self.last = [None; Field::COUNT];
        self.samples = 0;
    }

    pub fn samples_since_refresh(&self) -> u32 {
        self.samples
    }

    pub fn last_published(&self, field: Field) -> Option<f64> {
        self.last[field.index()]
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
