use super::common::Quantity;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The fixed schema of published values.
///
/// Declaration order is the publish order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    L1WBuy,
    L1WSell,
    L1W,
    L2WBuy,
    L2WSell,
    L2W,
    L3WBuy,
    L3WSell,
    L3W,
    TotalWBuy,
    TotalWSell,
    TotalW,
    TotalKwhBuy,
    TotalKwhSell,
}

impl Field {
    pub const COUNT: usize = 14;

    pub const ALL: [Field; Field::COUNT] = [
        Field::L1WBuy,
        Field::L1WSell,
        Field::L1W,
        Field::L2WBuy,
        Field::L2WSell,
        Field::L2W,
        Field::L3WBuy,
        Field::L3WSell,
        Field::L3W,
        Field::TotalWBuy,
        Field::TotalWSell,
        Field::TotalW,
        Field::TotalKwhBuy,
        Field::TotalKwhSell,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::L1WBuy => "l1_w_buy",
            Field::L1WSell => "l1_w_sell",
            Field::L1W => "l1_w",
            Field::L2WBuy => "l2_w_buy",
            Field::L2WSell => "l2_w_sell",
            Field::L2W => "l2_w",
            Field::L3WBuy => "l3_w_buy",
            Field::L3WSell => "l3_w_sell",
            Field::L3W => "l3_w",
            Field::TotalWBuy => "total_w_buy",
            Field::TotalWSell => "total_w_sell",
            Field::TotalW => "total_w",
            Field::TotalKwhBuy => "total_kwh_buy",
            Field::TotalKwhSell => "total_kwh_sell",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Position of the field in [`Field::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            Field::TotalKwhBuy | Field::TotalKwhSell => Quantity::Energy,
            _ => Quantity::Power,
        }
    }

    /// Net fields are derived from the buy/sell pair and never transmitted.
    pub fn is_derived(&self) -> bool {
        matches!(self, Field::L1W | Field::L2W | Field::L3W | Field::TotalW)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Merges the two directional readings of one phase into a signed value.
///
/// Exporting is positive and importing is negative. When nothing flows the
/// result is a plain zero rather than a negative zero.
pub fn merge_direction(buy: f64, sell: f64) -> f64 {
    if sell > buy {
        sell
    } else if buy == 0.0 {
        0.0
    } else {
        -buy
    }
}

/// Buy, sell and net power of one phase (or of the sum over all phases).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseReading {
    pub buy: f64,
    pub sell: f64,
    pub net: f64,
}

impl PhaseReading {
    pub fn new(buy: f64, sell: f64) -> Self {
        PhaseReading {
            buy,
            sell,
            net: merge_direction(buy, sell),
        }
    }
}

/// One decoded datagram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementSet {
    pub l1: PhaseReading,
    pub l2: PhaseReading,
    pub l3: PhaseReading,
    pub total: PhaseReading,
    pub energy_buy_kwh: f64,
    pub energy_sell_kwh: f64,
}

impl MeasurementSet {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::L1WBuy => self.l1.buy,
            Field::L1WSell => self.l1.sell,
            Field::L1W => self.l1.net,
            Field::L2WBuy => self.l2.buy,
            Field::L2WSell => self.l2.sell,
            Field::L2W => self.l2.net,
            Field::L3WBuy => self.l3.buy,
            Field::L3WSell => self.l3.sell,
            Field::L3W => self.l3.net,
            Field::TotalWBuy => self.total.buy,
            Field::TotalWSell => self.total.sell,
            Field::TotalW => self.total.net,
            Field::TotalKwhBuy => self.energy_buy_kwh,
            Field::TotalKwhSell => self.energy_sell_kwh,
        }
    }

    /// All fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        Field::ALL.into_iter().map(move |field| (field, self.get(field)))
    }
}

impl Serialize for MeasurementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.name(), &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_direction() {
        assert_eq!(merge_direction(0.0, 12.5), 12.5);
        assert_eq!(merge_direction(7.3, 0.0), -7.3);

        let idle = merge_direction(0.0, 0.0);
        assert_eq!(idle, 0.0);
        assert!(idle.is_sign_positive());

        // Equal readings count as importing.
        assert_eq!(merge_direction(5.0, 5.0), -5.0);
    }

    #[test]
    fn test_field_names() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
            assert_eq!(Field::from_name(field.name()), Some(*field));
            // serde naming matches the published topic names
            let json = serde_json::to_string(field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.name()));
        }
        assert_eq!(Field::from_name("l4_w"), None);
    }

    #[test]
    fn test_field_classification() {
        let derived: Vec<Field> = Field::ALL.into_iter().filter(|f| f.is_derived()).collect();
        assert_eq!(derived, vec![Field::L1W, Field::L2W, Field::L3W, Field::TotalW]);
        assert_eq!(Field::TotalKwhSell.quantity(), Quantity::Energy);
        assert_eq!(Field::L2WSell.quantity(), Quantity::Power);
    }

    #[test]
    fn test_measurement_set_serialization() {
        let set = MeasurementSet {
            total: PhaseReading::new(123.4, 0.0),
            energy_buy_kwh: 1.5,
            ..Default::default()
        };
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["total_w_buy"], 123.4);
        assert_eq!(value["total_w"], -123.4);
        assert_eq!(value["total_kwh_buy"], 1.5);
        assert_eq!(value.as_object().unwrap().len(), Field::COUNT);
    }
}
