use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct MeterMetrics {
    pub ticks: IntCounter,
    pub reads_ok: IntCounter,
    pub reads_failed: IntCounter,
    pub points_written: IntCounter,
    pub points_skipped: IntCounter,
    pub points_failed: IntCounter,
    pub registers: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub meter: MeterMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let meter = MeterMetrics {
            ticks: IntCounter::new("meter_ticks", "Completed poll ticks")?,
            reads_ok: IntCounter::new("meter_reads_ok", "Register reads that returned a value")?,
            reads_failed: IntCounter::new("meter_reads_failed", "Register reads that failed")?,
            points_written: IntCounter::new("meter_points_written", "Points accepted by the sink")?,
            points_skipped: IntCounter::new(
                "meter_points_skipped",
                "Fields not written because the reading was invalid",
            )?,
            points_failed: IntCounter::new("meter_points_failed", "Points the sink did not accept")?,
            registers: IntGauge::new("meter_registers", "Registers in the active register map")?,
        };
        registry.register(Box::new(meter.ticks.clone()))?;
        registry.register(Box::new(meter.reads_ok.clone()))?;
        registry.register(Box::new(meter.reads_failed.clone()))?;
        registry.register(Box::new(meter.points_written.clone()))?;
        registry.register(Box::new(meter.points_skipped.clone()))?;
        registry.register(Box::new(meter.points_failed.clone()))?;
        registry.register(Box::new(meter.registers.clone()))?;
        Ok(Self { registry, meter })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_text_output() {
        let hub = MetricsHub::new().unwrap();
        hub.meter.reads_ok.inc_by(3);
        hub.meter.registers.set(11);
        let text = hub.encode_text();
        assert!(text.contains("meter_reads_ok 3"));
        assert!(text.contains("meter_registers 11"));
    }
}
