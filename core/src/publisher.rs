use crate::speedwire::measurement::Field;

/// Sink for changed values.
///
/// Implementations own the outbound connection. Calls are fire-and-forget:
/// a failed send is the publisher's business and never reaches the decoder.
pub trait Publisher {
    fn publish(&mut self, field: Field, value: f64);

    /// Called once after all changed fields of a datagram were published.
    fn flush(&mut self) {}
}

/// Topic under which a field is published.
pub fn topic_for(prefix: &str, field: Field) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        field.name().to_string()
    } else {
        format!("{}/{}", prefix, field.name())
    }
}

/// Keeps everything it is given, for tests and diagnostics.
#[derive(Debug, Default, Clone)]
pub struct RecordingPublisher {
    pub published: Vec<(Field, f64)>,
    pub flushes: usize,
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, field: Field, value: f64) {
        self.published.push((field, value));
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
