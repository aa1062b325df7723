//! Batch calls executed by the fee converter's `multicall`

use crate::fee_converter::{ConversionRequest, DistributionReport, SingleConversion};
use feeflow_ledger::Chain;
use feeflow_types::{Address, CallContext, Revert, U256};
use std::fmt::Debug;
use std::sync::Arc;

/// Auxiliary contract entry point callable from a converter batch
pub trait BatchTarget: Debug + Send + Sync {
    fn address(&self) -> Address;

    /// Run the target's batch entry point; `ctx.sender` is the converter
    fn invoke(&self, chain: &mut Chain, ctx: &CallContext) -> Result<(), Revert>;
}

/// Converter entry points available inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterCall {
    WrapNative,
    Convert(ConversionRequest),
    ConvertSingle(SingleConversion),
    Distribute,
}

/// One step of a batch
#[derive(Debug, Clone)]
pub enum Call {
    Converter(ConverterCall),
    External(Arc<dyn BatchTarget>),
}

impl Call {
    /// Address the call is dispatched to
    pub fn target(&self, converter: Address) -> Address {
        match self {
            Call::Converter(_) => converter,
            Call::External(target) => target.address(),
        }
    }
}

impl From<ConverterCall> for Call {
    fn from(call: ConverterCall) -> Self {
        Call::Converter(call)
    }
}

/// Result of one successful batch step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Wrapped(U256),
    Distributed(DistributionReport),
    Executed { target: Address },
}

