//! meter-ingest: the acquisition and ingestion pipeline
//!
//! One [`Poller`] tick runs the [`SampleAssembler`] over the register map through a
//! [`DeviceReader`], then hands the resulting [`Sample`] to the [`IngestionWriter`], which
//! delivers one point per valid field to a [`PointSink`]. Failures are isolated per field on
//! both sides of the tick; only [`StartupError`] is fatal.

mod error;
pub use error::{ReadError, StartupError, WriteError};

mod types;
pub use types::{DeliveryOutcome, DeliveryStatus, FieldReading, Sample, WriteReport};

mod retry;
pub use retry::RetryPolicy;

mod shutdown;
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};

mod reader;
pub use reader::DeviceReader;

mod assembler;
pub use assembler::{CaptureClock, SampleAssembler};

mod point;
pub use point::Point;

pub mod sink;
pub use sink::{InfluxSettings, InfluxSink, MemorySink, PointSink};

mod writer;
pub use writer::IngestionWriter;

mod poller;
pub use poller::{Poller, PollerConfig, PollerState, TickReport};
