use core::fmt;
use serde::{Deserialize, Serialize};

/// Register table a read is addressed to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    /// Read-only input registers (function code 0x04).
    #[default]
    Input,
    /// Read/write holding registers (function code 0x03).
    Holding,
}

impl AccessKind {
    pub fn function_code(self) -> u8 {
        match self {
            AccessKind::Input => 0x04,
            AccessKind::Holding => 0x03,
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Input => f.write_str("input"),
            AccessKind::Holding => f.write_str("holding"),
        }
    }
}

/// One register block request as seen on the bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegisterRequest {
    pub kind: AccessKind,
    pub address: u16,
    pub count: u16,
}

impl fmt::Display for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{kind}@{address}+{count}",
            kind = self.kind,
            address = self.address,
            count = self.count
        )
    }
}

#[derive(Clone, Debug)]
pub struct PortInfo {
    pub name: String,
    pub driver: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_codes() {
        assert_eq!(AccessKind::Input.function_code(), 0x04);
        assert_eq!(AccessKind::Holding.function_code(), 0x03);
    }

    #[test]
    fn test_request_display() {
        let req = RegisterRequest {
            kind: AccessKind::Input,
            address: 12,
            count: 2,
        };
        assert_eq!(req.to_string(), "input@12+2");
    }
}
