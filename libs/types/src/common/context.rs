//! Per-call execution context

use ethers_core::types::{Address, U256};

/// Who is calling, who started the transaction and how much native value rides along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Immediate caller
    pub sender: Address,
    /// Externally-owned account that initiated the transaction
    pub origin: Address,
    /// Native currency attached to the call
    pub value: U256,
}

impl CallContext {
    /// A call made directly by an external account
    pub fn external(account: Address) -> Self {
        Self {
            sender: account,
            origin: account,
            value: U256::zero(),
        }
    }

    /// Attach native value to the call
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Context for a nested call issued by contract `sender`, keeping the origin
    pub fn forwarded(&self, sender: Address) -> Self {
        Self {
            sender,
            origin: self.origin,
            value: U256::zero(),
        }
    }
}
