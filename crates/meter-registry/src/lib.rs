//! meter-registry: register maps for energy meters and their value decoding

mod types;
pub use types::*;

mod loader;
pub use loader::{load_register_map_file, parse_register_map, RegisterMapFile};

mod presets;
pub use presets::Preset;

mod metrics;
pub use metrics::{MeterMetrics, MetricsHub};

mod encode;
pub use encode::encode_f32;

mod decode;
pub use decode::{decode, decode_f32, DecodeError};

pub use meter_transport::AccessKind;
