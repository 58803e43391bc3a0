use crate::config::DaemonConfig;
use clap::{ArgAction, Parser, ValueEnum};
use meter_registry::Preset;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PresetArg {
    /// voltage, current and power
    Basic,
    /// all SDM120 input registers
    Sdm120,
}

impl From<PresetArg> for Preset {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::Basic => Preset::Sdm120Basic,
            PresetArg::Sdm120 => Preset::Sdm120,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "meterd",
    version,
    about = "Poll an energy meter over Modbus RTU and write readings to InfluxDB"
)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, env = "METERD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serial device the meter is attached to
    #[arg(long)]
    pub device: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Modbus slave address of the meter
    #[arg(long)]
    pub slave: Option<u8>,

    /// Delay between polls in milliseconds (must be > 0)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Built-in register map
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// YAML register map file
    #[arg(long)]
    pub registers: Option<PathBuf>,

    #[arg(long, env = "INFLUXDB_URL")]
    pub influx_url: Option<String>,

    #[arg(long, env = "INFLUXDB_TOKEN", hide_env_values = true)]
    pub influx_token: Option<String>,

    #[arg(long, env = "INFLUXDB_ORG")]
    pub influx_org: Option<String>,

    #[arg(long, env = "INFLUXDB_BUCKET")]
    pub influx_bucket: Option<String>,

    /// Value of the `location` tag on every point
    #[arg(long)]
    pub location: Option<String>,

    /// Use an in-process simulated meter instead of the serial port
    #[arg(long, action = ArgAction::SetTrue)]
    pub mock: bool,

    /// Keep points in memory and print them instead of writing to InfluxDB
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Run a single tick, print its report as JSON and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,

    /// List serial ports and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub list_ports: bool,
}

impl Cli {
    /// Flags win over the configuration file.
    pub fn apply_to(&self, config: &mut DaemonConfig) {
        if let Some(device) = &self.device {
            config.device.path = device.clone();
        }
        if let Some(baud) = self.baud {
            config.device.baud_rate = baud;
        }
        if let Some(slave) = self.slave {
            config.device.slave = slave;
        }
        if let Some(interval) = self.interval_ms {
            config.poll.interval_ms = interval;
        }
        if let Some(preset) = self.preset {
            config.preset = preset.into();
            config.registers.clear();
            config.register_file = None;
        }
        if let Some(path) = &self.registers {
            config.register_file = Some(path.clone());
            config.registers.clear();
        }
        if let Some(url) = &self.influx_url {
            config.influx.url = url.clone();
        }
        if let Some(token) = &self.influx_token {
            config.influx.token = Some(token.clone());
        }
        if let Some(org) = &self.influx_org {
            config.influx.org = org.clone();
        }
        if let Some(bucket) = &self.influx_bucket {
            config.influx.bucket = bucket.clone();
        }
        if let Some(location) = &self.location {
            config
                .influx
                .tags
                .insert("location".to_string(), location.clone());
        }
    }
}
