use crate::{DeviceReader, FieldReading, ReadError, RetryPolicy, Sample, Shutdown};
use meter_registry::{RegisterMap, RegisterSpec};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

/// Hands out capture instants that strictly increase, even if the wall clock steps back.
#[derive(Debug, Default)]
pub struct CaptureClock {
    last: Option<OffsetDateTime>,
}

impl CaptureClock {
    pub fn next(&mut self) -> OffsetDateTime {
        self.next_from(OffsetDateTime::now_utc())
    }

    fn next_from(&mut self, now: OffsetDateTime) -> OffsetDateTime {
        let at = match self.last {
            Some(last) if now <= last => last + TimeDuration::nanoseconds(1),
            _ => now,
        };
        self.last = Some(at);
        at
    }
}

/// Drives a [`DeviceReader`] across the whole register map once per call.
pub struct SampleAssembler {
    map: RegisterMap,
    retry: RetryPolicy,
    clock: CaptureClock,
}

impl SampleAssembler {
    pub fn new(map: RegisterMap, retry: RetryPolicy) -> Self {
        Self {
            map,
            retry,
            clock: CaptureClock::default(),
        }
    }

    pub fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    /// Produce one Sample. Never fails as a whole: every register yields a reading, in map
    /// order, whether or not the device answered. Once `shutdown` fires, registers not yet
    /// read are recorded as [`ReadError::Cancelled`].
    pub async fn assemble(&mut self, reader: &mut DeviceReader, shutdown: &Shutdown) -> Sample {
        let captured_at = self.clock.next();
        let mut readings = Vec::with_capacity(self.map.len());
        for spec in self.map.iter() {
            if shutdown.is_stopped() {
                readings.push(FieldReading::failed(&spec.name, ReadError::Cancelled));
                continue;
            }
            let outcome = read_with_retry(reader, spec, self.retry, shutdown).await;
            match &outcome {
                Ok(value) => debug!(field = %spec.name, value, "register read"),
                Err(reason) => warn!(
                    field = %spec.name,
                    address = spec.address,
                    %reason,
                    "register read failed, skipping field"
                ),
            }
            readings.push(FieldReading {
                name: spec.name.clone(),
                outcome,
            });
        }
        Sample {
            captured_at,
            readings,
        }
    }
}

async fn read_with_retry(
    reader: &mut DeviceReader,
    spec: &RegisterSpec,
    retry: RetryPolicy,
    shutdown: &Shutdown,
) -> Result<f64, ReadError> {
    let mut attempt = 1;
    loop {
        let err = match reader.read(spec).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= retry.attempts() || shutdown.is_stopped() {
            return Err(err);
        }
        debug!(field = %spec.name, attempt, reason = %err, "retrying register read");
        attempt += 1;
        if !retry.backoff.is_zero() {
            tokio::time::sleep(retry.backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown_channel;
    use meter_registry::{encode_f32, WordOrder};
    use meter_transport::{AccessKind, MockBus, MockFault};
    use std::time::Duration;
    use time::macros::datetime;

    fn three_register_map() -> RegisterMap {
        RegisterMap::new(vec![
            RegisterSpec::input_f32("voltage", 30000),
            RegisterSpec::input_f32("current", 30006),
            RegisterSpec::input_f32("power", 30012),
        ])
        .unwrap()
    }

    fn meter() -> MockBus {
        MockBus::new("sdm")
            .with_words(AccessKind::Input, 30000, &encode_f32(230.1, WordOrder::BigEndian))
            .with_words(AccessKind::Input, 30006, &encode_f32(4.2, WordOrder::BigEndian))
            .with_words(AccessKind::Input, 30012, &encode_f32(966.4, WordOrder::BigEndian))
    }

    fn reader(bus: MockBus) -> DeviceReader {
        DeviceReader::new(Box::new(bus), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_full_pass_in_map_order() {
        let mut assembler = SampleAssembler::new(three_register_map(), RetryPolicy::none());
        let mut r = reader(meter());
        let sample = assembler.assemble(&mut r, &Shutdown::never()).await;

        let names: Vec<&str> = sample.readings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["voltage", "current", "power"]);
        assert_eq!(sample.readings[0].value(), Some(f64::from(230.1_f32)));
        assert_eq!(sample.readings[1].value(), Some(f64::from(4.2_f32)));
        assert_eq!(sample.readings[2].value(), Some(f64::from(966.4_f32)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_does_not_abort_pass() {
        let bus = meter().fail_always(30006, MockFault::Hang);
        let log = bus.request_log();
        let mut assembler = SampleAssembler::new(three_register_map(), RetryPolicy::none());
        let mut r = reader(bus);
        let sample = assembler.assemble(&mut r, &Shutdown::never()).await;

        assert_eq!(sample.readings.len(), 3);
        assert!(sample.readings[0].value().is_some());
        assert_eq!(sample.readings[1].error(), Some(&ReadError::Timeout));
        assert!(sample.readings[2].value().is_some());
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_successes_is_still_a_sample() {
        let mut assembler = SampleAssembler::new(three_register_map(), RetryPolicy::none());
        let mut r = reader(MockBus::new("empty"));
        let sample = assembler.assemble(&mut r, &Shutdown::never()).await;
        assert_eq!(sample.readings.len(), 3);
        assert_eq!(sample.successes(), 0);
        assert_eq!(sample.failures(), 3);
    }

    #[tokio::test]
    async fn test_bounded_retry_recovers_transient_failure() {
        let bus = meter().fail_times(30006, MockFault::Timeout, 1);
        let log = bus.request_log();
        let mut assembler = SampleAssembler::new(
            three_register_map(),
            RetryPolicy::new(1, Duration::ZERO),
        );
        let mut r = reader(bus);
        let sample = assembler.assemble(&mut r, &Shutdown::never()).await;
        assert_eq!(sample.successes(), 3);
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_limit() {
        let bus = meter().fail_always(30006, MockFault::Exception(0x02));
        let log = bus.request_log();
        let mut assembler = SampleAssembler::new(
            three_register_map(),
            RetryPolicy::new(2, Duration::ZERO),
        );
        let mut r = reader(bus);
        let sample = assembler.assemble(&mut r, &Shutdown::never()).await;
        assert!(sample.readings[1].error().is_some());
        let current_reads = log
            .requests()
            .iter()
            .filter(|req| req.address == 30006)
            .count();
        assert_eq!(current_reads, 3);
    }

    #[tokio::test]
    async fn test_stop_cancels_remaining_reads() {
        let (trigger, shutdown) = shutdown_channel();
        trigger.stop();
        let bus = meter();
        let log = bus.request_log();
        let mut assembler = SampleAssembler::new(three_register_map(), RetryPolicy::none());
        let mut r = reader(bus);
        let sample = assembler.assemble(&mut r, &shutdown).await;
        assert!(log.is_empty());
        assert!(sample
            .readings
            .iter()
            .all(|r| r.error() == Some(&ReadError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_pass_cancels_unread_registers() {
        let (trigger, shutdown) = shutdown_channel();
        let bus = meter().fail_always(30006, MockFault::Hang);
        let log = bus.request_log();
        let mut assembler = SampleAssembler::new(three_register_map(), RetryPolicy::none());
        let mut r = reader(bus);
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.stop();
        };
        let (sample, ()) = tokio::join!(assembler.assemble(&mut r, &shutdown), stopper);

        assert_eq!(sample.readings[0].value(), Some(f64::from(230.1_f32)));
        assert_eq!(sample.readings[1].error(), Some(&ReadError::Timeout));
        assert_eq!(sample.readings[2].error(), Some(&ReadError::Cancelled));
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_capture_instants_strictly_increase() {
        let mut assembler = SampleAssembler::new(three_register_map(), RetryPolicy::none());
        let mut r = reader(meter());
        let first = assembler.assemble(&mut r, &Shutdown::never()).await;
        let second = assembler.assemble(&mut r, &Shutdown::never()).await;
        assert!(second.captured_at > first.captured_at);
    }

    #[test]
    fn test_clock_never_steps_back() {
        let mut clock = CaptureClock::default();
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        assert_eq!(clock.next_from(t0), t0);
        let repeat = clock.next_from(t0);
        assert_eq!(repeat, t0 + TimeDuration::nanoseconds(1));
        let earlier = clock.next_from(t0 - TimeDuration::seconds(5));
        assert!(earlier > repeat);
    }
}
