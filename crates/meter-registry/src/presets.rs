use crate::types::{RegisterMap, RegisterSpec};
use serde::{Deserialize, Serialize};

/// Built-in register maps for meters we ship defaults for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Eastron SDM120: voltage, current and active power only.
    #[default]
    Sdm120Basic,
    /// Eastron SDM120: the full set of instantaneous and energy registers.
    Sdm120,
}

impl Preset {
    pub fn register_map(self) -> RegisterMap {
        match self {
            Preset::Sdm120Basic => RegisterMap::sdm120_basic(),
            Preset::Sdm120 => RegisterMap::sdm120(),
        }
    }
}

impl RegisterMap {
    pub fn sdm120_basic() -> Self {
        Self {
            specs: vec![
                RegisterSpec::input_f32("voltage", 0x0000).with_unit("V"),
                RegisterSpec::input_f32("current", 0x0006).with_unit("A"),
                RegisterSpec::input_f32("power", 0x000C).with_unit("W"),
            ],
        }
    }

    pub fn sdm120() -> Self {
        Self {
            specs: vec![
                RegisterSpec::input_f32("voltage", 0x0000).with_unit("V"),
                RegisterSpec::input_f32("current", 0x0006).with_unit("A"),
                RegisterSpec::input_f32("power", 0x000C).with_unit("W"),
                RegisterSpec::input_f32("apparent_power", 0x0012).with_unit("VA"),
                RegisterSpec::input_f32("reactive_power", 0x0018).with_unit("VAr"),
                RegisterSpec::input_f32("power_factor", 0x001E),
                RegisterSpec::input_f32("phase_angle", 0x0024).with_unit("deg"),
                RegisterSpec::input_f32("frequency", 0x0046).with_unit("Hz"),
                RegisterSpec::input_f32("import_active_energy", 0x0048).with_unit("kWh"),
                RegisterSpec::input_f32("export_active_energy", 0x004A).with_unit("kWh"),
                RegisterSpec::input_f32("total_active_energy", 0x0156).with_unit("kWh"),
            ],
        }
    }
}
