use crate::{AccessKind, RegisterBus, RegisterRequest, Result, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted failure for a register address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MockFault {
    /// Report a transport timeout.
    Timeout,
    /// Reply with a Modbus exception code.
    Exception(u8),
    /// Reply with a frame that cannot be decoded.
    InvalidFrame,
    /// Never answer. Callers are expected to bound the wait themselves.
    Hang,
}

#[derive(Clone, Copy, Debug)]
struct ScriptedFault {
    fault: MockFault,
    remaining: Option<u32>,
}

/// Shared view of every request a [`MockBus`] has served, in order.
#[derive(Clone, Debug, Default)]
pub struct RequestLog(Arc<Mutex<Vec<RegisterRequest>>>);

impl RequestLog {
    pub fn requests(&self) -> Vec<RegisterRequest> {
        match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.requests().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, req: RegisterRequest) {
        if let Ok(mut guard) = self.0.lock() {
            guard.push(req);
        }
    }
}

/// An in-process register bus backed by a word table.
///
/// Unknown addresses answer with exception 0x02 (illegal data address), the way a real
/// meter does.
pub struct MockBus {
    name: String,
    words: HashMap<(AccessKind, u16), u16>,
    faults: HashMap<u16, ScriptedFault>,
    log: RequestLog,
}

impl MockBus {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            words: HashMap::new(),
            faults: HashMap::new(),
            log: RequestLog::default(),
        }
    }

    /// Store consecutive register words starting at `address`.
    pub fn with_words(mut self, kind: AccessKind, address: u16, words: &[u16]) -> Self {
        self.set_words(kind, address, words);
        self
    }

    pub fn set_words(&mut self, kind: AccessKind, address: u16, words: &[u16]) {
        for (offset, word) in words.iter().enumerate() {
            let Some(addr) = u16::try_from(offset)
                .ok()
                .and_then(|o| address.checked_add(o))
            else {
                break;
            };
            self.words.insert((kind, addr), *word);
        }
    }

    /// Fail every request that starts at `address`.
    pub fn fail_always(mut self, address: u16, fault: MockFault) -> Self {
        self.faults.insert(
            address,
            ScriptedFault {
                fault,
                remaining: None,
            },
        );
        self
    }

    /// Fail the next `times` requests that start at `address`, then answer normally.
    pub fn fail_times(mut self, address: u16, fault: MockFault, times: u32) -> Self {
        self.faults.insert(
            address,
            ScriptedFault {
                fault,
                remaining: Some(times),
            },
        );
        self
    }

    pub fn request_log(&self) -> RequestLog {
        self.log.clone()
    }

    fn take_fault(&mut self, address: u16) -> Option<MockFault> {
        let scripted = self.faults.get_mut(&address)?;
        match scripted.remaining {
            None => Some(scripted.fault),
            Some(0) => None,
            Some(n) => {
                scripted.remaining = Some(n - 1);
                Some(scripted.fault)
            }
        }
    }
}

#[async_trait]
impl RegisterBus for MockBus {
    async fn read_registers(
        &mut self,
        kind: AccessKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        self.log.push(RegisterRequest {
            kind,
            address,
            count,
        });

        if let Some(fault) = self.take_fault(address) {
            return match fault {
                MockFault::Timeout => Err(TransportError::Timeout),
                MockFault::Exception(code) => {
                    Err(TransportError::Exception(format!("code 0x{code:02X}")))
                }
                MockFault::InvalidFrame => Err(TransportError::InvalidFrame(
                    "crc mismatch".to_string(),
                )),
                MockFault::Hang => {
                    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                    Err(TransportError::Timeout)
                }
            };
        }

        let mut out = Vec::with_capacity(count as usize);
        for offset in 0..count {
            let addr = address
                .checked_add(offset)
                .ok_or_else(|| TransportError::InvalidFrame("address overflow".to_string()))?;
            match self.words.get(&(kind, addr)) {
                Some(word) => out.push(*word),
                None => return Err(TransportError::Exception("code 0x02".to_string())),
            }
        }
        Ok(out)
    }

    fn describe(&self) -> String {
        format!("mock:{}", self.name)
    }
}
