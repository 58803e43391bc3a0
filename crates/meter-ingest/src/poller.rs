use crate::{
    DeliveryStatus, DeviceReader, IngestionWriter, SampleAssembler, Shutdown, StartupError,
    WriteReport,
};
use meter_registry::MetricsHub;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between the end of one tick and the start of the next.
    pub interval: Duration,
    /// Stop after this many ticks; `None` polls until shutdown.
    pub max_ticks: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Stopped,
}

/// Summary of one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub reads_ok: usize,
    pub reads_failed: usize,
    pub write: WriteReport,
}

/// Fixed-delay poll loop: one assemble + write pass per tick, ticks never overlap.
pub struct Poller {
    config: PollerConfig,
    reader: DeviceReader,
    assembler: SampleAssembler,
    writer: IngestionWriter,
    metrics: Option<MetricsHub>,
    state: watch::Sender<PollerState>,
    ticks: u64,
    shutdown: Shutdown,
}

impl Poller {
    pub fn new(
        config: PollerConfig,
        reader: DeviceReader,
        assembler: SampleAssembler,
        writer: IngestionWriter,
    ) -> Result<Self, StartupError> {
        if config.interval.is_zero() {
            return Err(StartupError::InvalidInterval);
        }
        Ok(Self {
            config,
            reader,
            assembler,
            writer,
            metrics: None,
            state: watch::Sender::new(PollerState::Idle),
            ticks: 0,
            shutdown: Shutdown::never(),
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsHub) -> Self {
        metrics
            .meter
            .registers
            .set(i64::try_from(self.assembler.register_map().len()).unwrap_or(i64::MAX));
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Follow state changes from outside, including while [`Poller::run`] owns the poller.
    pub fn state_watch(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run exactly one tick. Always returns, whatever failed inside it.
    pub async fn tick(&mut self) -> TickReport {
        self.state.send_replace(PollerState::Polling);
        self.ticks += 1;
        let sample = self
            .assembler
            .assemble(&mut self.reader, &self.shutdown)
            .await;
        let reads_ok = sample.successes();
        let reads_failed = sample.failures();
        let write = self.writer.write(sample, &self.shutdown).await;
        self.state.send_replace(PollerState::Idle);

        if let Some(m) = &self.metrics {
            m.meter.ticks.inc();
            m.meter.reads_ok.inc_by(reads_ok as u64);
            m.meter.reads_failed.inc_by(reads_failed as u64);
            m.meter
                .points_written
                .inc_by(write.count(DeliveryStatus::Ok) as u64);
            m.meter
                .points_skipped
                .inc_by(write.count(DeliveryStatus::SkippedInvalid) as u64);
            m.meter
                .points_failed
                .inc_by(write.count(DeliveryStatus::WriteFailed) as u64);
        }

        info!(
            tick = self.ticks,
            reads_ok,
            reads_failed,
            written = write.count(DeliveryStatus::Ok),
            "tick complete"
        );
        TickReport {
            tick: self.ticks,
            reads_ok,
            reads_failed,
            write,
        }
    }

    /// Poll until `shutdown` fires or the tick limit is reached, then release the
    /// transport. A stop observed while sleeping ends the loop without starting another tick.
    pub async fn run(mut self, shutdown: Shutdown) -> Vec<TickReport> {
        self.shutdown = shutdown.clone();
        let mut stop = shutdown;
        let mut reports = Vec::new();
        info!(
            bus = %self.reader.describe(),
            sink = %self.writer.sink().describe(),
            interval_ms = self.config.interval.as_millis() as u64,
            registers = self.assembler.register_map().len(),
            "poller started"
        );

        loop {
            if stop.is_stopped() {
                break;
            }
            let report = self.tick().await;
            if report.write.is_degraded() {
                warn!(tick = report.tick, "tick delivered nothing, continuing");
            }
            // Bounded runs keep every report; unbounded runs keep none.
            if self.config.max_ticks.is_some() {
                reports.push(report);
            }
            if self.config.max_ticks.is_some_and(|max| self.ticks >= max) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = stop.stopped() => break,
            }
        }

        self.state.send_replace(PollerState::Stopped);
        info!(ticks = self.ticks, "poller stopped");
        if let Some(m) = &self.metrics {
            tracing::debug!("final metrics:\n{}", m.encode_text());
        }
        self.reader.close();
        reports
    }
}
