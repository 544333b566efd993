//! Sensor feed listener
//!
//! Decodes inbound sensor-status messages, keeps the latest timing snapshot,
//! and raises a capture trigger once every Nth successfully parsed message.
//! Runs on the MQTT event-loop task; the only way it talks to the rest of
//! the system is the single-slot trigger channel, so message decoding never
//! blocks on a capture in progress.

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Immutable timing snapshot taken when a sensor message is parsed.
///
/// The listener overwrites its latest snapshot on every valid message; a
/// capture run works from the copy pinned into its [`CaptureRequest`] at
/// trigger time, so a reading arriving mid-run never tears the timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSnapshot {
    /// Sender-supplied time (ms since epoch, from the `"t"` field)
    pub arduino_time_ms: i64,
    /// Local clock at receipt (ms since epoch)
    pub received_at_ms: i64,
}

/// A pending capture request, pinned at trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Trigger generation, monotonically increasing
    pub seq: u64,
    /// Timing snapshot frozen when the trigger fired
    pub snapshot: SensorSnapshot,
}

/// Listens to the sensor-status topic and decides when a capture should fire.
pub struct SensorFeedListener {
    /// Messages between automatic captures
    threshold: u64,
    /// Successfully parsed messages so far; never resets
    counter: u64,
    /// Latest snapshot, overwritten per valid message
    latest: Option<SensorSnapshot>,
    /// Trigger generation counter
    seq: u64,
    trigger_tx: watch::Sender<Option<CaptureRequest>>,
}

impl SensorFeedListener {
    /// Create a listener that fires a trigger every `threshold` valid messages.
    ///
    /// A `threshold` of 0 is treated as 1 (trigger on every message).
    pub fn new(threshold: u64, trigger_tx: watch::Sender<Option<CaptureRequest>>) -> Self {
        Self {
            threshold: threshold.max(1),
            counter: 0,
            latest: None,
            seq: 0,
            trigger_tx,
        }
    }

    /// Number of successfully parsed messages seen so far.
    pub fn message_count(&self) -> u64 {
        self.counter
    }

    /// Latest timing snapshot, if any valid message has arrived.
    pub fn latest_snapshot(&self) -> Option<SensorSnapshot> {
        self.latest
    }

    /// Handle one inbound sensor message.
    ///
    /// Malformed payloads (missing `"t"` field, missing comma delimiter,
    /// non-numeric value) are logged and dropped with no state change.
    pub fn handle_message(&mut self, payload: &[u8]) {
        let text = match std::str::from_utf8(payload) {
            Ok(t) => t,
            Err(_) => {
                debug!("Sensor message is not valid UTF-8, ignoring");
                return;
            }
        };

        let arduino_time_ms = match parse_sensor_time(text) {
            Some(t) => t,
            None => {
                debug!(payload = %text, "No parsable \"t\" field in sensor message, ignoring");
                return;
            }
        };

        let snapshot = SensorSnapshot {
            arduino_time_ms,
            received_at_ms: Utc::now().timestamp_millis(),
        };
        self.latest = Some(snapshot);
        self.counter += 1;

        debug!(
            arduino_time_ms,
            count = self.counter,
            "Received sensor reading"
        );

        if self.counter % self.threshold == 0 {
            self.seq += 1;
            let request = CaptureRequest {
                seq: self.seq,
                snapshot,
            };
            // Overwrite-on-full: a trigger raised while one is still pending
            // coalesces into the same slot. The send only fails when the
            // dispatcher is gone, which means we are shutting down.
            if self.trigger_tx.send(Some(request)).is_err() {
                warn!("Trigger channel closed, dropping capture request");
            }
        }
    }
}

/// Extract the sender timestamp from a sensor payload.
///
/// The payload is text containing a `"t":<integer>,` field; any well-formed
/// integer before the next comma is accepted. Returns `None` when the field
/// or its closing comma is absent, or the value does not parse.
pub fn parse_sensor_time(text: &str) -> Option<i64> {
    let start = text.find("\"t\":")? + 4;
    let rest = &text[start..];
    let end = rest.find(',')?;
    rest[..end].trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::trigger_channel;

    #[test]
    fn parses_time_field() {
        assert_eq!(parse_sensor_time(r#"{"t":1699999999999,"s":1}"#), Some(1699999999999));
        assert_eq!(parse_sensor_time(r#"{"s":1,"t":42,"x":2}"#), Some(42));
        assert_eq!(parse_sensor_time(r#"{"t":-5,"s":1}"#), Some(-5));
        assert_eq!(parse_sensor_time(r#"{"t": 17 ,"s":1}"#), Some(17));
    }

    #[test]
    fn rejects_malformed_time_field() {
        // No "t" field at all
        assert_eq!(parse_sensor_time(r#"{"s":1}"#), None);
        // Missing comma delimiter
        assert_eq!(parse_sensor_time(r#"{"t":123}"#), None);
        // Not an integer
        assert_eq!(parse_sensor_time(r#"{"t":abc,"s":1}"#), None);
        assert_eq!(parse_sensor_time(r#"{"t":,"s":1}"#), None);
        // Empty payload
        assert_eq!(parse_sensor_time(""), None);
    }

    #[test]
    fn twelve_valid_messages_fire_two_triggers() {
        let (tx, mut rx) = trigger_channel();
        let mut listener = SensorFeedListener::new(5, tx);

        let mut fired = Vec::new();
        for i in 1..=12 {
            let msg = format!(r#"{{"t":{},"s":1}}"#, 1000 + i);
            listener.handle_message(msg.as_bytes());
            if rx.has_changed().unwrap() {
                let req = (*rx.borrow_and_update()).expect("trigger slot populated");
                fired.push((i, req));
            }
        }

        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].0, 5);
        assert_eq!(fired[1].0, 10);
        assert_eq!(fired[0].1.seq, 1);
        assert_eq!(fired[1].1.seq, 2);
        // Snapshot pinned at the triggering message
        assert_eq!(fired[0].1.snapshot.arduino_time_ms, 1005);
        assert_eq!(fired[1].1.snapshot.arduino_time_ms, 1010);
        assert_eq!(listener.message_count(), 12);
    }

    #[test]
    fn malformed_messages_do_not_count_or_trigger() {
        let (tx, mut rx) = trigger_channel();
        let mut listener = SensorFeedListener::new(5, tx);

        for _ in 0..4 {
            listener.handle_message(br#"{"t":100,"s":1}"#);
        }
        // These must not advance the counter past the threshold
        listener.handle_message(br#"{"s":1}"#);
        listener.handle_message(br#"{"t":oops,"s":1}"#);
        listener.handle_message(b"\xff\xfe");

        assert_eq!(listener.message_count(), 4);
        assert!(!rx.has_changed().unwrap());

        // The 5th valid message fires
        listener.handle_message(br#"{"t":105,"s":1}"#);
        assert!(rx.has_changed().unwrap());
        let req = (*rx.borrow_and_update()).unwrap();
        assert_eq!(req.snapshot.arduino_time_ms, 105);
    }

    #[test]
    fn threshold_one_triggers_every_message() {
        let (tx, mut rx) = trigger_channel();
        let mut listener = SensorFeedListener::new(1, tx);

        for i in 0..3 {
            listener.handle_message(format!(r#"{{"t":{},"s":1}}"#, i).as_bytes());
            assert!(rx.has_changed().unwrap());
            rx.borrow_and_update();
        }
    }

    #[test]
    fn triggers_coalesce_while_unserviced() {
        let (tx, mut rx) = trigger_channel();
        let mut listener = SensorFeedListener::new(2, tx);

        // Two trigger points (messages 2 and 4) without the dispatcher draining
        for i in 1..=4 {
            listener.handle_message(format!(r#"{{"t":{},"s":1}}"#, i).as_bytes());
        }

        // Only the latest request is visible; the earlier one was absorbed
        assert!(rx.has_changed().unwrap());
        let req = (*rx.borrow_and_update()).unwrap();
        assert_eq!(req.seq, 2);
        assert_eq!(req.snapshot.arduino_time_ms, 4);
        assert!(!rx.has_changed().unwrap());
    }
}
