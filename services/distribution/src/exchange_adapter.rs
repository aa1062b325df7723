//! Exchange Adapter
//!
//! Thin, swappable wrapper over the constant-product venue. Pulls inputs from
//! the caller, wraps native currency, routes each leg directly or through the
//! wrapped-native token and settles proceeds in one transfer.

use feeflow_amm::{Exchange, NO_DEADLINE};
use feeflow_ledger::Chain;
use feeflow_types::{Address, CallContext, Revert, NATIVE_CURRENCY, U256};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

/// Multi-input swap into one output token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSwap {
    /// Input tokens; [`NATIVE_CURRENCY`] stands for attached native value
    pub input_tokens: Vec<Address>,
    pub amounts: Vec<U256>,
    pub min_outputs: Vec<U256>,
    pub output_token: Address,
}

/// Swap capability consumed by the fee converter and compounding vaults
pub trait ExchangeAdapter: Debug + Send + Sync {
    /// Address callers approve before swapping
    fn address(&self) -> Address;

    /// Token produced by [`ExchangeAdapter::swap`]
    fn output_token(&self) -> Address;

    /// Swap `amount` of `input_token` into the output token, paying `recipient`
    fn swap(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        input_token: Address,
        amount: U256,
        min_output: U256,
        recipient: Address,
    ) -> Result<U256, Revert>;

    /// Swap every input into `output_token` and pay the combined proceeds to the caller
    fn batch_swap(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        request: &BatchSwap,
    ) -> Result<U256, Revert>;
}

/// Map a venue failure to the adapter's swap failure
pub(crate) fn swap_failed(err: Revert) -> Revert {
    match err {
        Revert::SwapFailed { .. } => err,
        other => Revert::SwapFailed {
            reason: other.to_string(),
        },
    }
}

/// Adapter over a constant-product router
#[derive(Debug, Clone)]
pub struct ConstantProductAdapter {
    address: Address,
    exchange: Arc<dyn Exchange>,
    output_token: Address,
}

impl ConstantProductAdapter {
    pub fn new(address: Address, exchange: Arc<dyn Exchange>, output_token: Address) -> Self {
        Self {
            address,
            exchange,
            output_token,
        }
    }

    pub fn exchange(&self) -> &Arc<dyn Exchange> {
        &self.exchange
    }

    /// Direct pair when one exists, otherwise one hop through wrapped native
    pub fn route(&self, chain: &Chain, input: Address, output: Address) -> Vec<Address> {
        let weth = chain.wrapped_native();
        if input == weth || output == weth || self.exchange.has_pair(input, output) {
            vec![input, output]
        } else {
            vec![input, weth, output]
        }
    }

    /// Bring one input leg into the adapter's balance, returning the token now held
    fn take_input(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        token: Address,
        amount: U256,
    ) -> Result<Address, Revert> {
        if token == NATIVE_CURRENCY {
            chain.wrap_native(self.address, amount)?;
            Ok(chain.wrapped_native())
        } else {
            chain.safe_transfer_from(token, self.address, ctx.sender, self.address, amount)?;
            Ok(token)
        }
    }

    /// Swap a leg already held by the adapter
    #[allow(clippy::too_many_arguments)]
    fn swap_held(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        token: Address,
        amount: U256,
        min_output: U256,
        output: Address,
        recipient: Address,
    ) -> Result<U256, Revert> {
        if token == output {
            if amount < min_output {
                return Err(Revert::SwapFailed {
                    reason: Revert::InsufficientOutput {
                        amount_out: amount,
                        min_out: min_output,
                    }
                    .to_string(),
                });
            }
            if recipient != self.address {
                chain.safe_transfer(token, self.address, recipient, amount)?;
            }
            return Ok(amount);
        }

        chain.ensure_allowance(token, self.address, self.exchange.address(), amount)?;
        let path = self.route(chain, token, output);
        let amounts = self
            .exchange
            .swap_exact_tokens_for_tokens(
                chain,
                &ctx.forwarded(self.address),
                amount,
                min_output,
                &path,
                recipient,
                NO_DEADLINE,
            )
            .map_err(swap_failed)?;
        let out = amounts.last().copied().unwrap_or_default();
        debug!(input = ?token, output = ?output, hops = path.len() - 1, %amount, %out, "adapter leg swapped");
        Ok(out)
    }
}

impl ExchangeAdapter for ConstantProductAdapter {
    fn address(&self) -> Address {
        self.address
    }

    fn output_token(&self) -> Address {
        self.output_token
    }

    fn swap(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        input_token: Address,
        amount: U256,
        min_output: U256,
        recipient: Address,
    ) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            if input_token == self.output_token {
                return Err(Revert::InvalidOutputToken { token: input_token });
            }
            if input_token == NATIVE_CURRENCY {
                if ctx.value != amount {
                    return Err(Revert::ValueMismatch {
                        declared: amount,
                        attached: ctx.value,
                    });
                }
            } else if !ctx.value.is_zero() {
                return Err(Revert::UnexpectedValue {
                    attached: ctx.value,
                });
            }
            chain.receive_value(ctx, self.address)?;

            if amount.is_zero() {
                return Ok(U256::zero());
            }

            let held = self.take_input(chain, ctx, input_token, amount)?;
            let out = self.swap_held(
                chain,
                ctx,
                held,
                amount,
                min_output,
                self.output_token,
                recipient,
            )?;
            info!(
                adapter = ?self.address,
                input = ?input_token,
                output = ?self.output_token,
                %amount,
                %out,
                "swap settled"
            );
            Ok(out)
        })
    }

    fn batch_swap(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        request: &BatchSwap,
    ) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            let output = request.output_token;
            if request.input_tokens.contains(&output) {
                return Err(Revert::InvalidOutputToken { token: output });
            }
            let expected = request.input_tokens.len();
            if request.amounts.len() != expected {
                return Err(Revert::InputLengthMismatch {
                    list: "inputAmounts",
                    expected,
                    actual: request.amounts.len(),
                });
            }
            if request.min_outputs.len() != expected {
                return Err(Revert::InputLengthMismatch {
                    list: "minOutputs",
                    expected,
                    actual: request.min_outputs.len(),
                });
            }
            let mut native_legs = 0usize;
            let mut declared = U256::zero();
            for (token, amount) in request.input_tokens.iter().zip(&request.amounts) {
                if *token == NATIVE_CURRENCY {
                    native_legs += 1;
                    declared = declared.checked_add(*amount).ok_or(Revert::Overflow)?;
                }
            }
            if native_legs == 0 && !ctx.value.is_zero() {
                return Err(Revert::UnexpectedValue {
                    attached: ctx.value,
                });
            }
            if native_legs > 0 && declared != ctx.value {
                return Err(Revert::ValueMismatch {
                    declared,
                    attached: ctx.value,
                });
            }
            chain.receive_value(ctx, self.address)?;

            let mut total = U256::zero();
            for ((token, amount), min_output) in request
                .input_tokens
                .iter()
                .zip(&request.amounts)
                .zip(&request.min_outputs)
            {
                if amount.is_zero() {
                    continue;
                }
                let held = self.take_input(chain, ctx, *token, *amount)?;
                let out = self.swap_held(
                    chain,
                    ctx,
                    held,
                    *amount,
                    *min_output,
                    output,
                    self.address,
                )?;
                total = total.checked_add(out).ok_or(Revert::Overflow)?;
            }

            if !total.is_zero() {
                chain.safe_transfer(output, self.address, ctx.sender, total)?;
            }
            info!(
                adapter = ?self.address,
                legs = expected,
                output = ?output,
                %total,
                "batch swap settled"
            );
            Ok(total)
        })
    }
}
