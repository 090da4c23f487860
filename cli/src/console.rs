use chrono::Local;
use colored::Colorize;
use sma2mqtt_core::speedwire::MeasurementSet;
use sma2mqtt_core::summary::{format_summary, Tone};

/// Prints the per-datagram summary line to stderr, keeping stdout free for
/// the publishers.
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Console { color }
    }

    pub fn line(&self, set: &MeasurementSet) -> String {
        let summary = format_summary(set, |text, tone| {
            if !self.color {
                return text.to_string();
            }
            match tone {
                Tone::Negative => text.red().to_string(),
                Tone::Positive => text.green().to_string(),
                Tone::Neutral => text.white().to_string(),
            }
        });
        format!("{} {}", Local::now().format("%H:%M:%S"), summary)
    }

    pub fn print(&self, set: &MeasurementSet) {
        eprintln!("{}", self.line(set));
    }
}
