use crate::types::{RegisterMap, RegisterSpec};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk form of a register map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterMapFile {
    pub registers: Vec<RegisterSpec>,
}

pub fn parse_register_map(raw: &str) -> anyhow::Result<RegisterMap> {
    let file: RegisterMapFile = serde_yaml::from_str(raw).context("parsing register map yaml")?;
    let map = RegisterMap::new(file.registers)?;
    Ok(map)
}

pub fn load_register_map_file(path: impl AsRef<Path>) -> anyhow::Result<RegisterMap> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading register map: {}", path.display()))?;
    let map = parse_register_map(&raw)
        .with_context(|| format!("loading register map: {}", path.display()))?;
    tracing::debug!(path = %path.display(), registers = map.len(), "loaded register map");
    Ok(map)
}
