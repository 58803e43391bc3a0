use crate::sink::PointSink;
use crate::{
    DeliveryOutcome, DeliveryStatus, Point, RetryPolicy, Sample, Shutdown, WriteError, WriteReport,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a Sample into per-field points and delivers them one by one.
pub struct IngestionWriter {
    sink: Arc<dyn PointSink>,
    measurement: String,
    tags: BTreeMap<String, String>,
    retry: RetryPolicy,
}

impl IngestionWriter {
    pub fn new(sink: Arc<dyn PointSink>, measurement: &str, retry: RetryPolicy) -> Self {
        Self {
            sink,
            measurement: measurement.to_string(),
            tags: BTreeMap::new(),
            retry,
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn sink(&self) -> &Arc<dyn PointSink> {
        &self.sink
    }

    /// Deliver every valid reading of `sample` at its capture instant.
    ///
    /// Failed or non-finite readings produce no point. A field that cannot be delivered is
    /// reported and dropped; it never affects the other fields.
    ///
    /// After `shutdown` fires, a failed point is not retried, and once one point has failed
    /// the remaining points are reported as failed without contacting the sink.
    pub async fn write(&self, sample: Sample, shutdown: &Shutdown) -> WriteReport {
        let timestamp_nanos = sample.timestamp_nanos();
        let mut outcomes = Vec::with_capacity(sample.readings.len());
        let mut abandoned = false;

        for reading in sample.readings {
            let status = match reading.outcome {
                Ok(value) if value.is_finite() && abandoned => {
                    debug!(field = %reading.name, "shutting down, sink failing, not writing field");
                    DeliveryStatus::WriteFailed
                }
                Ok(value) if value.is_finite() => {
                    let point = Point {
                        measurement: self.measurement.clone(),
                        tags: self.tags.clone(),
                        field: reading.name.clone(),
                        value,
                        timestamp_nanos,
                    };
                    match self.deliver(&point, shutdown).await {
                        Ok(()) => DeliveryStatus::Ok,
                        Err(reason) => {
                            warn!(field = %reading.name, %reason, "point not delivered, dropping");
                            abandoned = shutdown.is_stopped();
                            DeliveryStatus::WriteFailed
                        }
                    }
                }
                Ok(value) => {
                    info!(field = %reading.name, value, "non-finite value, not writing field");
                    DeliveryStatus::SkippedInvalid
                }
                Err(reason) => {
                    info!(field = %reading.name, %reason, "no reading, not writing field");
                    DeliveryStatus::SkippedInvalid
                }
            };
            outcomes.push(DeliveryOutcome {
                name: reading.name,
                status,
            });
        }

        let report = WriteReport {
            timestamp_nanos,
            outcomes,
        };
        if report.is_degraded() {
            warn!(
                fields = report.outcomes.len(),
                skipped = report.count(DeliveryStatus::SkippedInvalid),
                failed = report.count(DeliveryStatus::WriteFailed),
                "degraded tick: no field reached the sink"
            );
        } else {
            debug!(
                written = report.count(DeliveryStatus::Ok),
                skipped = report.count(DeliveryStatus::SkippedInvalid),
                failed = report.count(DeliveryStatus::WriteFailed),
                "sample written"
            );
        }
        report
    }

    async fn deliver(&self, point: &Point, shutdown: &Shutdown) -> Result<(), WriteError> {
        let mut stop = shutdown.clone();
        let mut attempt = 1;
        loop {
            let err = match self.sink.write_point(point).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            // Configuration problems do not heal by retrying.
            if attempt >= self.retry.attempts()
                || matches!(err, WriteError::Config(_))
                || stop.is_stopped()
            {
                return Err(err);
            }
            debug!(field = %point.field, attempt, reason = %err, "retrying point write");
            attempt += 1;
            if !self.retry.backoff.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.retry.backoff) => {}
                    _ = stop.stopped() => return Err(err),
                }
            }
        }
    }
}
