//! Point sinks: where assembled samples end up.

use crate::{Point, WriteError};
use async_trait::async_trait;

mod influx;
pub use influx::{InfluxSettings, InfluxSink};

mod memory;
pub use memory::MemorySink;

/// A time-series destination that accepts single points.
///
/// Sinks must treat a repeated (series key, timestamp) pair as the same logical point.
#[async_trait]
pub trait PointSink: Send + Sync {
    async fn write_point(&self, point: &Point) -> Result<(), WriteError>;

    /// Check the sink is reachable. Called once at startup.
    async fn ping(&self) -> Result<(), WriteError> {
        Ok(())
    }

    fn describe(&self) -> String;
}
