//! Exchange venue interface consumed by adapters and vaults

use crate::router::PairInfo;
use feeflow_ledger::Chain;
use feeflow_types::{Address, CallContext, Revert, U256};
use std::fmt::Debug;

/// Deadline value meaning "no deadline"
pub const NO_DEADLINE: u64 = u64::MAX;

/// Parameters for supplying both legs of a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityRequest {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
}

/// Amounts actually consumed and LP tokens minted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityReceipt {
    pub amount_a: U256,
    pub amount_b: U256,
    pub liquidity: U256,
}

/// Unified venue interface: exact-input swaps and liquidity provision
pub trait Exchange: Debug + Send + Sync {
    /// Address callers approve before swapping
    fn address(&self) -> Address;

    /// Pair metadata for two tokens, in either order
    fn pair(&self, token_a: Address, token_b: Address) -> Result<PairInfo, Revert>;

    fn has_pair(&self, token_a: Address, token_b: Address) -> bool {
        self.pair(token_a, token_b).is_ok()
    }

    /// Current reserves ordered as `(token_a, token_b)`
    fn get_reserves(
        &self,
        chain: &Chain,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256), Revert>;

    /// Amounts along `path` for an exact input
    fn get_amounts_out(
        &self,
        chain: &Chain,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, Revert>;

    /// Swap an exact input along `path`, pulling from `ctx.sender`
    #[allow(clippy::too_many_arguments)]
    fn swap_exact_tokens_for_tokens(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>, Revert>;

    /// Supply both legs of a pair, pulling from `ctx.sender`
    fn add_liquidity(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        request: LiquidityRequest,
    ) -> Result<LiquidityReceipt, Revert>;
}
