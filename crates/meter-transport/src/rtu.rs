use crate::{AccessKind, PortInfo, RegisterBus, Result, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_modbus::client::{rtu, Context, Reader};
use tokio_modbus::Slave;
use tokio_serial::{SerialPortType, SerialStream};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Serial line settings for a Modbus RTU slave.
#[derive(Clone, Debug)]
pub struct RtuSettings {
    pub device: String,
    pub baud_rate: u32,
    pub slave: u8,
    pub parity: Parity,
    pub two_stop_bits: bool,
    /// Upper bound for a single request/response exchange.
    pub timeout: Duration,
}

impl Default for RtuSettings {
    fn default() -> Self {
        // SDM120 factory defaults: 2400 baud, 8N1, slave 1
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 2400,
            slave: 1,
            parity: Parity::None,
            two_stop_bits: false,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Modbus RTU master over a serial port.
pub struct RtuBus {
    device: String,
    slave: u8,
    timeout: Duration,
    ctx: Context,
}

impl RtuBus {
    /// Open the serial device and attach to the configured slave.
    pub fn open(settings: &RtuSettings) -> Result<Self> {
        let stop_bits = if settings.two_stop_bits {
            tokio_serial::StopBits::Two
        } else {
            tokio_serial::StopBits::One
        };
        let builder = tokio_serial::new(settings.device.as_str(), settings.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(settings.parity.into())
            .stop_bits(stop_bits)
            .timeout(settings.timeout);
        let port = SerialStream::open(&builder).map_err(|e| TransportError::Open {
            path: settings.device.clone(),
            reason: e.to_string(),
        })?;
        let ctx = rtu::attach_slave(port, Slave(settings.slave));
        tracing::info!(
            device = %settings.device,
            baud = settings.baud_rate,
            slave = settings.slave,
            "opened modbus rtu bus"
        );
        Ok(Self {
            device: settings.device.clone(),
            slave: settings.slave,
            timeout: settings.timeout,
            ctx,
        })
    }
}

#[async_trait]
impl RegisterBus for RtuBus {
    async fn read_registers(
        &mut self,
        kind: AccessKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        tracing::trace!(fc = kind.function_code(), address, count, "modbus request");
        let ctx = &mut self.ctx;
        let exchange = async move {
            match kind {
                AccessKind::Input => ctx.read_input_registers(address, count).await,
                AccessKind::Holding => ctx.read_holding_registers(address, count).await,
            }
        };
        let response = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(response) => response,
            Err(_) => return Err(TransportError::Timeout),
        };
        match response {
            Ok(Ok(words)) if words.len() == count as usize => Ok(words),
            Ok(Ok(words)) => Err(TransportError::InvalidFrame(format!(
                "expected {count} registers, got {}",
                words.len()
            ))),
            Ok(Err(code)) => Err(TransportError::Exception(format!("{code:?}"))),
            Err(tokio_modbus::Error::Transport(e)) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(TransportError::Timeout)
            }
            Err(tokio_modbus::Error::Transport(e)) => Err(TransportError::Io(e.to_string())),
            Err(other) => Err(TransportError::InvalidFrame(other.to_string())),
        }
    }

    fn describe(&self) -> String {
        format!("rtu:{}#{}", self.device, self.slave)
    }
}

/// Enumerate serial ports a meter adapter could be attached to.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let mut out = Vec::new();
    for p in tokio_serial::available_ports().map_err(|e| TransportError::Io(e.to_string()))? {
        let driver = match p.port_type {
            SerialPortType::UsbPort(_) => "usb-serial",
            _ => "serial",
        };
        out.push(PortInfo {
            name: p.port_name,
            driver: driver.to_string(),
        });
    }
    Ok(out)
}
