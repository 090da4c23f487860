// End-to-end tests for the sma2mqtt core library.
//
// TEST #1
// Read a captured energy meter frame from the test data directory, decode it
// and check every value against the register contents.
//
// TEST #2
// Push a synthetic frame through the pipeline twice and check that only the
// first pass publishes, then keep feeding it until the forced republish.
//
// TEST #3
// Foreign and damaged datagrams never reach the publisher.

use std::fs;
use std::path::Path;

use sma2mqtt_core::config::{CoreConfig, GateConfig};
use sma2mqtt_core::gate::ChangeTracker;
use sma2mqtt_core::pipeline::Pipeline;
use sma2mqtt_core::publisher::{topic_for, RecordingPublisher};
use sma2mqtt_core::speedwire::synthetic::{FrameBuilder, RawReadings};
use sma2mqtt_core::speedwire::{decode, DecodeError, Field, RejectKind};

// Helper function to read test data files
fn read_hex_file(file_name: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let path = Path::new("tests/test_data").join(file_name);
    let content = fs::read_to_string(path)?;

    // Remove any whitespace and newlines
    let hex_string: String = content.chars().filter(|c| !c.is_whitespace()).collect();

    // Ensure we have an even number of hex characters
    if hex_string.len() % 2 != 0 {
        return Err("Invalid hex string: odd number of characters".into());
    }

    let mut result = Vec::with_capacity(hex_string.len() / 2);
    for i in (0..hex_string.len()).step_by(2) {
        result.push(u8::from_str_radix(&hex_string[i..i + 2], 16)?);
    }

    Ok(result)
}

#[test]
fn test_decode_captured_frame() {
    let frame = read_hex_file("em_frame.hex").unwrap();
    let set = decode(&frame).unwrap();

    assert_eq!(set.total.buy, 123.4);
    assert_eq!(set.total.sell, 0.0);
    assert_eq!(set.total.net, -123.4);
    assert_eq!(set.l1.net, -50.0);
    assert_eq!(set.l2.net, -73.4);
    assert_eq!(set.l3.net, 0.0);

    // 8 byte counters at the marker offset, divided by 3.6e6
    let at = frame
        .windows(4)
        .position(|w| w == [0x00, 0x01, 0x08, 0x00])
        .unwrap()
        + 4;
    let raw = u64::from_be_bytes(frame[at..at + 8].try_into().unwrap());
    assert!((set.energy_buy_kwh - raw as f64 / 3_600_000.0).abs() < 1e-8);
    assert_eq!(set.energy_buy_kwh, 12500.0);
    assert_eq!(set.energy_sell_kwh, 3429.35525);
}

#[test]
fn test_discovery_request_is_rejected() {
    let frame = read_hex_file("discovery_request.hex").unwrap();
    let err = decode(&frame).unwrap_err();
    assert_eq!(err.kind(), RejectKind::IncompleteFrame);
}

#[test]
fn test_synthetic_frame_through_pipeline() {
    let frame = FrameBuilder::new().build(&RawReadings {
        total_buy: 1234,
        total_sell: 0,
        ..Default::default()
    });

    let mut pipeline = Pipeline::new(CoreConfig::default());
    let mut publisher = RecordingPublisher::default();

    let first = pipeline.process(&frame, &mut publisher).unwrap();
    assert_eq!(first.measurements.total.net, -123.4);
    assert_eq!(first.changed.get(&Field::TotalWBuy), Some(&123.4));
    assert_eq!(first.changed.get(&Field::TotalW), Some(&-123.4));
    assert_eq!(
        topic_for("sma", Field::TotalWBuy),
        "sma/total_w_buy".to_string()
    );

    let second = pipeline.process(&frame, &mut publisher).unwrap();
    assert!(second.changed.is_empty());
    assert_eq!(publisher.published.len(), Field::COUNT);
}

#[test]
fn test_forced_republish_cycle() {
    let frame = read_hex_file("em_frame.hex").unwrap();
    let mut pipeline = Pipeline::new(CoreConfig::default());
    let mut publisher = RecordingPublisher::default();

    for _ in 0..50 {
        pipeline.process(&frame, &mut publisher).unwrap();
    }
    assert_eq!(publisher.published.len(), Field::COUNT);

    let refresh = pipeline.process(&frame, &mut publisher).unwrap();
    assert_eq!(refresh.changed.len(), Field::COUNT);
    assert_eq!(pipeline.tracker().samples_since_refresh(), 0);
    assert_eq!(publisher.published.len(), 2 * Field::COUNT);
}

#[test]
fn test_rejections_do_not_publish() {
    let good = read_hex_file("em_frame.hex").unwrap();
    let mut pipeline = Pipeline::new(CoreConfig {
        gate: GateConfig {
            republish_threshold: 1000,
        },
        ..Default::default()
    });
    let mut publisher = RecordingPublisher::default();

    let mut truncated = good.clone();
    truncated.truncate(good.len() - 10);

    let mut spiked = good.clone();
    let at = good
        .windows(4)
        .position(|w| w == [0x00, 0x01, 0x04, 0x00])
        .unwrap()
        + 4;
    spiked[at..at + 4].copy_from_slice(&1_500_000u32.to_be_bytes());

    let rejected: Vec<RejectKind> = [&b"\x01\x02\x03"[..], &truncated[..], &spiked[..]]
        .iter()
        .map(|d| pipeline.process(d, &mut publisher).unwrap_err().kind())
        .collect();
    assert_eq!(
        rejected,
        vec![
            RejectKind::NotThisProtocol,
            RejectKind::IncompleteFrame,
            RejectKind::OutOfBounds
        ]
    );
    assert!(publisher.published.is_empty());
    assert_eq!(pipeline.tracker().samples_since_refresh(), 0);

    pipeline.process(&good, &mut publisher).unwrap();
    assert_eq!(publisher.published.len(), Field::COUNT);
}

#[test]
fn test_out_of_bounds_value() {
    let frame = FrameBuilder::new().build(&RawReadings {
        total_sell: 1_500_000,
        ..Default::default()
    });
    match decode(&frame) {
        Err(DecodeError::OutOfBounds { field, value, .. }) => {
            assert_eq!(field, "total_w_sell");
            assert_eq!(value, 150000.0);
        }
        other => panic!("expected OutOfBounds, got {:?}", other),
    }

    let frame = FrameBuilder::new().build(&RawReadings {
        total_sell: 999_990,
        ..Default::default()
    });
    assert_eq!(decode(&frame).unwrap().total.net, 99999.0);
}

#[test]
fn test_tracker_standalone() {
    let set = decode(&read_hex_file("em_frame.hex").unwrap()).unwrap();
    let mut tracker = ChangeTracker::new(GateConfig::default());
    assert_eq!(tracker.should_publish(&set).len(), Field::COUNT);
    assert!(tracker.should_publish(&set).is_empty());
}
