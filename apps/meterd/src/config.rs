use anyhow::{Context, Result};
use meter_ingest::{InfluxSettings, PollerConfig, RetryPolicy, StartupError};
use meter_registry::{load_register_map_file, Preset, RegisterMap, RegisterSpec};
use meter_transport::{Parity, RtuSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub path: String,
    pub baud_rate: u32,
    pub slave: u8,
    pub parity: Parity,
    pub two_stop_bits: bool,
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let rtu = RtuSettings::default();
        Self {
            path: rtu.device,
            baud_rate: rtu.baud_rate,
            slave: rtu.slave,
            parity: rtu.parity,
            two_stop_bits: rtu.two_stop_bits,
            timeout_ms: rtu.timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub url: String,
    pub token: Option<String>,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: None,
            org: String::new(),
            bucket: String::new(),
            measurement: "energy_data".to_string(),
            tags: BTreeMap::new(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub read_retries: u32,
    pub read_backoff_ms: u64,
    pub write_retries: u32,
    pub write_backoff_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            read_retries: 0,
            read_backoff_ms: 0,
            write_retries: 2,
            write_backoff_ms: 500,
        }
    }
}

/// Everything the daemon needs, read once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub device: DeviceConfig,
    pub influx: InfluxConfig,
    pub poll: PollConfig,
    pub preset: Preset,
    /// Separate YAML register map; takes precedence over `preset`.
    pub register_file: Option<PathBuf>,
    /// Inline register map; takes precedence over `register_file` and `preset`.
    pub registers: Vec<RegisterSpec>,
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config: DaemonConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings that would leave the poller unable to do anything useful.
    pub fn validate(&self) -> std::result::Result<(), StartupError> {
        if self.device.timeout_ms == 0 {
            return Err(StartupError::InvalidReadTimeout);
        }
        if self.poll.interval_ms == 0 {
            return Err(StartupError::InvalidInterval);
        }
        Ok(())
    }

    pub fn register_map(&self) -> Result<RegisterMap> {
        if !self.registers.is_empty() {
            return RegisterMap::new(self.registers.clone()).context("inline register map");
        }
        if let Some(path) = &self.register_file {
            return load_register_map_file(path);
        }
        Ok(self.preset.register_map())
    }

    pub fn rtu_settings(&self) -> RtuSettings {
        RtuSettings {
            device: self.device.path.clone(),
            baud_rate: self.device.baud_rate,
            slave: self.device.slave,
            parity: self.device.parity,
            two_stop_bits: self.device.two_stop_bits,
            timeout: Duration::from_millis(self.device.timeout_ms),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    pub fn influx_settings(&self) -> InfluxSettings {
        InfluxSettings {
            url: self.influx.url.clone(),
            token: self.influx.token.clone(),
            org: self.influx.org.clone(),
            bucket: self.influx.bucket.clone(),
            timeout: Duration::from_millis(self.influx.timeout_ms),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll.interval_ms),
            max_ticks: None,
        }
    }

    pub fn read_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.poll.read_retries,
            Duration::from_millis(self.poll.read_backoff_ms),
        )
    }

    pub fn write_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.poll.write_retries,
            Duration::from_millis(self.poll.write_backoff_ms),
        )
    }
}
