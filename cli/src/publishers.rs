// Publishers used by the listener.
//
// All of them write line oriented text so that an MQTT client (for example
// `mosquitto_pub -l`) or any other transport can carry the values onwards.
// Write failures are logged and otherwise ignored; a broken pipe must not stop
// the receive loop.

use clap::ValueEnum;
use log::{info, warn};
use serde_json::{json, Map, Value};
use sma2mqtt_core::publisher::{topic_for, Publisher};
use sma2mqtt_core::speedwire::Field;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `<topic> <value>` line per changed field
    Discrete,
    /// One JSON object per changed field
    Json,
    /// One JSON object per datagram holding all changed fields
    Bundle,
    /// Log the values only
    Log,
}

pub fn make_publisher(format: OutputFormat, prefix: &str) -> Box<dyn Publisher> {
    let stdout = io::stdout();
    match format {
        OutputFormat::Discrete => Box::new(DiscretePublisher::new(prefix, stdout)),
        OutputFormat::Json => Box::new(JsonPublisher::new(prefix, stdout)),
        OutputFormat::Bundle => Box::new(BundlePublisher::new(prefix, stdout)),
        OutputFormat::Log => Box::new(LogPublisher::new(prefix)),
    }
}

fn report_write_error(result: io::Result<()>) {
    if let Err(e) = result {
        warn!("Failed to publish: {}", e);
    }
}

pub struct DiscretePublisher<W: Write> {
    prefix: String,
    out: W,
}

impl<W: Write> DiscretePublisher<W> {
    pub fn new(prefix: &str, out: W) -> Self {
        DiscretePublisher {
            prefix: prefix.to_string(),
            out,
        }
    }
}

impl<W: Write> Publisher for DiscretePublisher<W> {
    fn publish(&mut self, field: Field, value: f64) {
        let topic = topic_for(&self.prefix, field);
        report_write_error(writeln!(self.out, "{} {}", topic, value));
    }

    fn flush(&mut self) {
        report_write_error(self.out.flush());
    }
}

pub struct JsonPublisher<W: Write> {
    prefix: String,
    out: W,
}

impl<W: Write> JsonPublisher<W> {
    pub fn new(prefix: &str, out: W) -> Self {
        JsonPublisher {
            prefix: prefix.to_string(),
            out,
        }
    }
}

impl<W: Write> Publisher for JsonPublisher<W> {
    fn publish(&mut self, field: Field, value: f64) {
        let message = json!({
            "topic": topic_for(&self.prefix, field),
            "value": value,
        });
        report_write_error(writeln!(self.out, "{}", message));
    }

    fn flush(&mut self) {
        report_write_error(self.out.flush());
    }
}

/// Collects the changed fields of a datagram into a single message.
pub struct BundlePublisher<W: Write> {
    prefix: String,
    payload: Map<String, Value>,
    out: W,
}

impl<W: Write> BundlePublisher<W> {
    pub fn new(prefix: &str, out: W) -> Self {
        BundlePublisher {
            prefix: prefix.trim_end_matches('/').to_string(),
            payload: Map::new(),
            out,
        }
    }
}

impl<W: Write> Publisher for BundlePublisher<W> {
    fn publish(&mut self, field: Field, value: f64) {
        self.payload.insert(field.name().to_string(), json!(value));
    }

    fn flush(&mut self) {
        if self.payload.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut self.payload);
        let message = json!({
            "topic": self.prefix,
            "payload": Value::Object(payload),
        });
        report_write_error(writeln!(self.out, "{}", message).and_then(|_| self.out.flush()));
    }
}

pub struct LogPublisher {
    prefix: String,
}

impl LogPublisher {
    pub fn new(prefix: &str) -> Self {
        LogPublisher {
            prefix: prefix.to_string(),
        }
    }
}

impl Publisher for LogPublisher {
    fn publish(&mut self, field: Field, value: f64) {
        info!("{} = {}", topic_for(&self.prefix, field), value);
    }
}
