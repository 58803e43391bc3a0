use super::PointSink;
use crate::{Point, WriteError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct State {
    points: BTreeMap<(String, i64), Point>,
    attempts: usize,
    failing: HashMap<String, Option<u32>>,
}

/// In-process sink keyed by (series key, timestamp), like a time-series store.
///
/// Fields can be scripted to fail, which is how delivery failures are exercised in tests
/// and dry runs.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<State>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write of `field`.
    pub fn fail_field(self, field: &str) -> Self {
        self.state.lock().failing.insert(field.to_string(), None);
        self
    }

    /// Reject the next `times` writes of `field`.
    pub fn fail_field_times(self, field: &str, times: u32) -> Self {
        self.state
            .lock()
            .failing
            .insert(field.to_string(), Some(times));
        self
    }

    /// Stored points ordered by series key, then timestamp.
    pub fn points(&self) -> Vec<Point> {
        self.state.lock().points.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write calls received, accepted or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }
}

#[async_trait]
impl PointSink for MemorySink {
    async fn write_point(&self, point: &Point) -> Result<(), WriteError> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if let Some(remaining) = state.failing.get_mut(&point.field) {
            let fail = match remaining {
                None => true,
                Some(0) => false,
                Some(n) => {
                    *n -= 1;
                    true
                }
            };
            if fail {
                return Err(WriteError::Transport(format!(
                    "connection reset writing {}",
                    point.field
                )));
            }
        }
        state
            .points
            .insert((point.series_key(), point.timestamp_nanos), point.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64, ts: i64) -> Point {
        Point {
            measurement: "energy_data".into(),
            tags: BTreeMap::new(),
            field: "voltage".into(),
            value,
            timestamp_nanos: ts,
        }
    }

    #[tokio::test]
    async fn test_redelivery_is_one_logical_point() {
        let sink = MemorySink::new();
        sink.write_point(&point(230.1, 7)).await.unwrap();
        sink.write_point(&point(230.1, 7)).await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.attempts(), 2);
        sink.write_point(&point(230.1, 8)).await.unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_fail_field_times() {
        let sink = MemorySink::new().fail_field_times("voltage", 1);
        assert!(sink.write_point(&point(1.0, 1)).await.is_err());
        assert!(sink.write_point(&point(1.0, 1)).await.is_ok());
    }
}
