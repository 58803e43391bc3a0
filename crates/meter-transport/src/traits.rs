use crate::{AccessKind, Result};
use async_trait::async_trait;

/// A register-addressed device bus.
///
/// Implementations own the underlying connection for their whole lifetime.
/// Requests take `&mut self`, so a bus never has more than one request in
/// flight; half-duplex serial lines rely on that.
#[async_trait]
pub trait RegisterBus: Send {
    /// Read `count` consecutive 16-bit registers starting at `address`.
    async fn read_registers(
        &mut self,
        kind: AccessKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    /// Human readable name of the bus, used in logs.
    fn describe(&self) -> String;
}
