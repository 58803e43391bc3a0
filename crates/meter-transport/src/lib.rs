//! meter-transport: register bus abstractions for energy meters
//!
//! This crate provides the [`RegisterBus`] trait and feature-gated backends. The default build
//! enables a `mock` backend so binaries and tests run on any host without a serial adapter;
//! the `rtu` feature adds a Modbus RTU master over a serial port.

mod types;
pub use types::{AccessKind, PortInfo, RegisterRequest};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::RegisterBus;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBus, MockFault, RequestLog};

#[cfg(feature = "rtu")]
mod rtu;

#[cfg(feature = "rtu")]
pub use rtu::{list_ports, Parity, RtuBus, RtuSettings};
