use crate::ReadError;
use meter_registry::RegisterSpec;
use meter_transport::RegisterBus;
use std::time::Duration;

/// Reads one register value at a time over an exclusively owned bus.
///
/// Every read is bounded by `timeout`, whatever the bus does internally. There is no retry
/// here; see [`crate::SampleAssembler`].
pub struct DeviceReader {
    bus: Box<dyn RegisterBus>,
    timeout: Duration,
}

impl DeviceReader {
    pub fn new(bus: Box<dyn RegisterBus>, timeout: Duration) -> Self {
        Self { bus, timeout }
    }

    pub fn describe(&self) -> String {
        self.bus.describe()
    }

    pub async fn read(&mut self, spec: &RegisterSpec) -> Result<f64, ReadError> {
        let count = spec.encoding.register_count();
        let request = self.bus.read_registers(spec.access, spec.address, count);
        let words = match tokio::time::timeout(self.timeout, request).await {
            Ok(words) => words?,
            Err(_) => return Err(ReadError::Timeout),
        };
        let value = meter_registry::decode(spec, &words)?;
        Ok(value)
    }

    /// Release the transport handle.
    pub fn close(self) {
        tracing::info!(bus = %self.bus.describe(), "closing device transport");
        drop(self.bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_registry::{encode_f32, WordOrder};
    use meter_transport::{AccessKind, MockBus, MockFault};

    fn reader(bus: MockBus) -> DeviceReader {
        DeviceReader::new(Box::new(bus), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_reads_and_decodes_float() {
        let bus = MockBus::new("m").with_words(
            AccessKind::Input,
            12,
            &encode_f32(966.4, WordOrder::BigEndian),
        );
        let mut r = reader(bus);
        let v = r.read(&RegisterSpec::input_f32("power", 12)).await.unwrap();
        assert_eq!(v, f64::from(966.4_f32));
    }

    #[tokio::test]
    async fn test_uses_access_kind_of_spec() {
        let bus = MockBus::new("m").with_words(
            AccessKind::Holding,
            40,
            &encode_f32(1.5, WordOrder::BigEndian),
        );
        let log = bus.request_log();
        let mut r = reader(bus);
        assert_eq!(
            r.read(&RegisterSpec::holding_f32("setpoint", 40)).await,
            Ok(1.5)
        );
        let req = log.requests()[0];
        assert_eq!(req.kind, AccessKind::Holding);
        assert_eq!(req.count, 2);
    }

    #[tokio::test]
    async fn test_exception_maps_to_read_error() {
        let bus = MockBus::new("m").fail_always(6, MockFault::Exception(0x04));
        let mut r = reader(bus);
        let err = r.read(&RegisterSpec::input_f32("current", 6)).await.unwrap_err();
        assert!(matches!(err, ReadError::Exception(_)));
    }

    #[tokio::test]
    async fn test_invalid_frame_is_malformed() {
        let bus = MockBus::new("m").fail_always(6, MockFault::InvalidFrame);
        let mut r = reader(bus);
        let err = r.read(&RegisterSpec::input_f32("current", 6)).await.unwrap_err();
        assert!(matches!(err, ReadError::Malformed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_device_is_bounded_by_timeout() {
        let bus = MockBus::new("m").fail_always(6, MockFault::Hang);
        let mut r = reader(bus);
        let started = tokio::time::Instant::now();
        let err = r.read(&RegisterSpec::input_f32("current", 6)).await.unwrap_err();
        assert_eq!(err, ReadError::Timeout);
        assert!(started.elapsed() <= Duration::from_secs(2));
    }
}
