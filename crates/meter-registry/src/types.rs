use meter_transport::AccessKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// How a register block encodes its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// IEEE-754 single precision spread over two registers.
    #[default]
    Float32,
}

impl Encoding {
    /// Number of 16-bit registers one value occupies.
    pub fn register_count(self) -> u16 {
        match self {
            Encoding::Float32 => 2,
        }
    }
}

/// Order of the 16-bit words inside a multi-register value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordOrder {
    /// High word first (Eastron, most meters).
    #[default]
    BigEndian,
    LittleEndian,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSpec {
    pub name: String,
    pub address: u16,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub access: AccessKind,
    #[serde(default)]
    pub word_order: WordOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl RegisterSpec {
    /// Input register holding a big-endian float32, the common meter layout.
    pub fn input_f32(name: &str, address: u16) -> Self {
        Self {
            name: name.to_string(),
            address,
            encoding: Encoding::Float32,
            access: AccessKind::Input,
            word_order: WordOrder::BigEndian,
            unit: None,
        }
    }

    pub fn holding_f32(name: &str, address: u16) -> Self {
        Self {
            access: AccessKind::Holding,
            ..Self::input_f32(name, address)
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("register map is empty")]
    Empty,
    #[error("duplicate register name: {0}")]
    DuplicateName(String),
    #[error("register name must not be empty (address {0})")]
    BlankName(u16),
}

/// Ordered, validated set of registers. Order is read order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterMap {
    pub(crate) specs: Vec<RegisterSpec>,
}

impl RegisterMap {
    pub fn new(specs: Vec<RegisterSpec>) -> Result<Self, RegistryError> {
        if specs.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.name.trim().is_empty() {
                return Err(RegistryError::BlankName(spec.address));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateName(spec.name.clone()));
            }
        }
        Ok(Self { specs })
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RegisterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a RegisterMap {
    type Item = &'a RegisterSpec;
    type IntoIter = std::slice::Iter<'a, RegisterSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_declaration_order() {
        let map = RegisterMap::new(vec![
            RegisterSpec::input_f32("power", 12),
            RegisterSpec::input_f32("voltage", 0),
            RegisterSpec::input_f32("current", 6),
        ])
        .unwrap();
        assert_eq!(map.names(), vec!["power", "voltage", "current"]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = RegisterMap::new(vec![
            RegisterSpec::input_f32("voltage", 0),
            RegisterSpec::input_f32("voltage", 6),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("voltage".into()));
    }

    #[test]
    fn test_empty_map_rejected() {
        assert_eq!(RegisterMap::new(vec![]).unwrap_err(), RegistryError::Empty);
    }

    #[test]
    fn test_shared_addresses_are_allowed() {
        // Only names must be unique; two views of one register are legitimate.
        let map = RegisterMap::new(vec![
            RegisterSpec::input_f32("a", 0),
            RegisterSpec::holding_f32("b", 0),
        ]);
        assert!(map.is_ok());
    }

    #[test]
    fn test_register_count() {
        assert_eq!(Encoding::Float32.register_count(), 2);
    }
}
