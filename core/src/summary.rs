//! One-line console summary of a measurement set.
//!
//! Layout: `L1 + L2 + L3 = TOTAL | sell kWh  buy kWh`, every value right
//! aligned. Colouring is left to the caller through [`Tone`] so this crate
//! stays free of terminal handling.

use crate::speedwire::measurement::MeasurementSet;

pub const POWER_WIDTH: usize = 9;
pub const ENERGY_WIDTH: usize = 14;

/// Shown instead of an exact zero.
pub const ZERO_PLACEHOLDER: &str = "-------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Negative,
    Positive,
    Neutral,
}

impl Tone {
    pub fn of(value: f64) -> Tone {
        if value < 0.0 {
            Tone::Negative
        } else if value > 0.0 {
            Tone::Positive
        } else {
            Tone::Neutral
        }
    }
}

/// Right-aligns `value` to `width`, or the placeholder for zero.
pub fn cell(value: f64, width: usize) -> (String, Tone) {
    let tone = Tone::of(value);
    let text = match tone {
        Tone::Neutral => format!("{:>width$}", ZERO_PLACEHOLDER, width = width),
        _ => format!("{:>width$}", value, width = width),
    };
    (text, tone)
}

/// Formats the summary line, passing every padded cell through `paint`.
pub fn format_summary<F>(set: &MeasurementSet, mut paint: F) -> String
where
    F: FnMut(&str, Tone) -> String,
{
    let mut power = |value: f64| {
        let (text, tone) = cell(value, POWER_WIDTH);
        paint(&text, tone)
    };
    let l1 = power(set.l1.net);
    let l2 = power(set.l2.net);
    let l3 = power(set.l3.net);
    let total = power(set.total.net);

    let (sell, sell_tone) = cell(set.energy_sell_kwh, ENERGY_WIDTH);
    let (buy, buy_tone) = cell(set.energy_buy_kwh, ENERGY_WIDTH);
    format!(
        "{} + {} + {} = {} | {} {}",
        l1,
        l2,
        l3,
        total,
        paint(&sell, sell_tone),
        paint(&buy, buy_tone)
    )
}

/// Summary without any colouring.
pub fn plain_summary(set: &MeasurementSet) -> String {
    format_summary(set, |text, _| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedwire::measurement::PhaseReading;

    #[test]
    fn test_cell() {
        assert_eq!(cell(-7.3, 9), ("     -7.3".to_string(), Tone::Negative));
        assert_eq!(cell(12.5, 9), ("     12.5".to_string(), Tone::Positive));
        assert_eq!(cell(0.0, 9), ("  -------".to_string(), Tone::Neutral));
        assert_eq!(cell(-0.0, 9).1, Tone::Neutral);
    }

    #[test]
    fn test_plain_summary() {
        let set = MeasurementSet {
            l1: PhaseReading::new(0.0, 12.5),
            l2: PhaseReading::new(7.3, 0.0),
            l3: PhaseReading::new(0.0, 0.0),
            total: PhaseReading::new(0.0, 5.2),
            energy_buy_kwh: 1234.5,
            energy_sell_kwh: 0.0,
        };
        assert_eq!(
            plain_summary(&set),
            "     12.5 +      -7.3 +   ------- =       5.2 |        -------         1234.5"
        );
    }

    #[test]
    fn test_paint_receives_tones() {
        let set = MeasurementSet {
            l1: PhaseReading::new(3.0, 0.0),
            ..Default::default()
        };
        let mut tones = Vec::new();
        format_summary(&set, |text, tone| {
            tones.push(tone);
            text.to_string()
        });
        assert_eq!(
            tones,
            vec![
                Tone::Negative,
                Tone::Neutral,
                Tone::Neutral,
                Tone::Neutral,
                Tone::Neutral,
                Tone::Neutral
            ]
        );
    }
}
