use crate::ReadError;
use serde::Serialize;
use time::OffsetDateTime;

/// Result of reading one register during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReading {
    pub name: String,
    pub outcome: Result<f64, ReadError>,
}

impl FieldReading {
    pub fn ok(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok(value),
        }
    }

    pub fn failed(name: &str, error: ReadError) -> Self {
        Self {
            name: name.to_string(),
            outcome: Err(error),
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&ReadError> {
        self.outcome.as_ref().err()
    }
}

/// Every reading of one tick, captured at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub captured_at: OffsetDateTime,
    pub readings: Vec<FieldReading>,
}

impl Sample {
    /// Capture instant as Unix nanoseconds, the precision points are written with.
    pub fn timestamp_nanos(&self) -> i64 {
        // i64 nanoseconds cover dates up to 2262
        i64::try_from(self.captured_at.unix_timestamp_nanos()).unwrap_or(i64::MAX)
    }

    pub fn successes(&self) -> usize {
        self.readings.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.readings.len() - self.successes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Ok,
    SkippedInvalid,
    WriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub name: String,
    pub status: DeliveryStatus,
}

/// Per-field delivery results of one Sample, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub timestamp_nanos: i64,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl WriteReport {
    pub fn count(&self, status: DeliveryStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn statuses(&self) -> Vec<DeliveryStatus> {
        self.outcomes.iter().map(|o| o.status).collect()
    }

    /// No field of the Sample reached the sink.
    pub fn is_degraded(&self) -> bool {
        !self.outcomes.is_empty() && self.count(DeliveryStatus::Ok) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_timestamp_nanos() {
        let sample = Sample {
            captured_at: datetime!(2024-01-01 00:00:00.000000123 UTC),
            readings: vec![],
        };
        assert_eq!(sample.timestamp_nanos(), 1_704_067_200_000_000_123);
    }

    #[test]
    fn test_failed_reading_has_no_value() {
        let r = FieldReading::failed("current", ReadError::Timeout);
        assert_eq!(r.value(), None);
        assert_eq!(r.error(), Some(&ReadError::Timeout));
        // A real zero stays distinguishable from a failure.
        assert_eq!(FieldReading::ok("current", 0.0).value(), Some(0.0));
    }

    #[test]
    fn test_degraded_when_nothing_delivered() {
        let report = WriteReport {
            timestamp_nanos: 0,
            outcomes: vec![
                DeliveryOutcome {
                    name: "a".into(),
                    status: DeliveryStatus::WriteFailed,
                },
                DeliveryOutcome {
                    name: "b".into(),
                    status: DeliveryStatus::SkippedInvalid,
                },
            ],
        };
        assert!(report.is_degraded());
        assert!(!WriteReport::default().is_degraded());
    }
}
