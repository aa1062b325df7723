//! Fee collectors swept into the converter during conversion

use feeflow_ledger::Chain;
use feeflow_types::{Address, Bytes, CallContext, Revert};
use std::fmt::Debug;
use tracing::debug;

/// External contract holding protocol fees, exposing one sweep entry point
pub trait FeeCollector: Debug + Send + Sync {
    fn address(&self) -> Address;

    /// Move collected fees to their destination; `payload` is collector-specific
    fn sweep(&self, chain: &mut Chain, ctx: &CallContext, payload: &Bytes) -> Result<(), Revert>;
}

/// Collector for market-maker fees paid in native currency or wrapped native
///
/// Sweeping wraps any native balance and forwards the whole wrapped balance to
/// the converter. The payload is ignored.
#[derive(Debug, Clone)]
pub struct WrappedNativeFeeCollector {
    address: Address,
    wrapped_native: Address,
    converter: Address,
}

impl WrappedNativeFeeCollector {
    pub fn new(address: Address, wrapped_native: Address, converter: Address) -> Self {
        Self {
            address,
            wrapped_native,
            converter,
        }
    }

    pub fn converter(&self) -> Address {
        self.converter
    }
}

impl FeeCollector for WrappedNativeFeeCollector {
    fn address(&self) -> Address {
        self.address
    }

    fn sweep(&self, chain: &mut Chain, ctx: &CallContext, _payload: &Bytes) -> Result<(), Revert> {
        chain.atomic(|chain| {
            let native = chain.native_balance(self.address);
            if !native.is_zero() {
                chain.wrap_native(self.address, native)?;
            }

            let wrapped = chain.balance_of(self.wrapped_native, self.address);
            if !wrapped.is_zero() {
                chain.safe_transfer(self.wrapped_native, self.address, self.converter, wrapped)?;
            }
            debug!(
                collector = ?self.address,
                caller = ?ctx.sender,
                %wrapped,
                "fees swept to converter"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeflow_types::U256;

    #[test]
    fn test_sweep_wraps_and_forwards_everything() {
        let weth = Address::from_low_u64_be(0xeeee);
        let converter = Address::from_low_u64_be(0xc0);
        let collector =
            WrappedNativeFeeCollector::new(Address::from_low_u64_be(0xf01), weth, converter);
        let mut chain = Chain::new(weth);
        chain.fund_native(collector.address(), U256::from(3u64)).unwrap();
        chain.fund_native(collector.address(), U256::from(2u64)).unwrap();
        chain.wrap_native(collector.address(), U256::from(2u64)).unwrap();

        collector
            .sweep(
                &mut chain,
                &CallContext::external(converter),
                &Bytes::default(),
            )
            .unwrap();

        assert_eq!(chain.balance_of(weth, converter), U256::from(5u64));
        assert!(chain.native_balance(collector.address()).is_zero());
        assert!(chain.balance_of(weth, collector.address()).is_zero());
    }

    #[test]
    fn test_sweep_of_empty_collector_is_a_no_op() {
        let weth = Address::from_low_u64_be(0xeeee);
        let converter = Address::from_low_u64_be(0xc0);
        let collector =
            WrappedNativeFeeCollector::new(Address::from_low_u64_be(0xf01), weth, converter);
        let mut chain = Chain::new(weth);

        collector
            .sweep(&mut chain, &CallContext::external(converter), &Bytes::default())
            .unwrap();
        assert!(chain.balance_of(weth, converter).is_zero());
    }
}
