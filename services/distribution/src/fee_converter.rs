//! Fee Converter - collect, convert, incentivize, distribute
//!
//! ## Purpose
//!
//! Turns whatever revenue the protocol has gathered (native currency and
//! arbitrary tokens) into the controller's reward token, pays the keeper that
//! triggered the run and splits the rest across the weighted receivers.
//!
//! ## Pipeline
//!
//! ```text
//! wrap_native ─┐
//! collectors ──┼→ convert ──→ adapter.batch_swap ──→ reward balance
//!              │                                          │
//!              └──────────────────────── distribute ←─────┘
//!                                           │
//!                          incentive → ctx.origin, remainder → receivers
//! ```
//!
//! Every step reads a fresh [`ControllerSnapshot`] and fails with `Forbidden`
//! while the controller is paused. [`FeeConverter::multicall`] runs any mix of
//! steps and external batch targets (vault compounding) as one atomic unit,
//! and is refused as a whole while paused.
//!
//! ## Distribution Rules
//!
//! - `incentive = floor(balance * rate / HUNDRED_PERCENT)`, carved out first
//! - Each receiver gets `remaining * weight / sum(weights)`; the last receiver
//!   takes the rounding dust so the converter ends with no reward token
//! - With no receivers, or a zero weight sum, the remainder stays put

use crate::batch::{BatchTarget, Call, CallOutcome, ConverterCall};
use crate::controller::{ControllerSnapshot, SharedController};
use crate::exchange_adapter::{BatchSwap, ExchangeAdapter};
use crate::fee_collector::FeeCollector;
use feeflow_ledger::Chain;
use feeflow_types::{
    mul_div, percent_of, Address, Bytes, CallContext, Revert, NATIVE_CURRENCY, U256,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Per-collector instruction supplied with a conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorCall {
    pub should_call: bool,
    pub payload: Bytes,
}

impl CollectorCall {
    pub fn call(payload: Bytes) -> Self {
        Self {
            should_call: true,
            payload,
        }
    }

    pub fn skip() -> Self {
        Self::default()
    }
}

/// Multi-input conversion into the reward token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Input tokens; [`NATIVE_CURRENCY`] converts native balance, a trailing
    /// reward token is passed through unswapped
    pub tokens: Vec<Address>,
    pub amounts: Vec<U256>,
    pub min_outputs: Vec<U256>,
    /// One instruction per configured fee collector, in order
    pub collector_calls: Vec<CollectorCall>,
}

/// Single-path conversion through `ExchangeAdapter::swap`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleConversion {
    pub token: Address,
    pub amount: U256,
    pub min_output: U256,
    /// Must be the reward token when given
    pub output_token: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub receiver: Address,
    pub amount: U256,
}

/// What one distribution moved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    pub reward_token: Address,
    /// Reward balance found in the converter
    pub balance: U256,
    pub incentive: U256,
    /// Account paid the incentive
    pub keeper: Address,
    pub payouts: Vec<Payout>,
    /// Left in the converter because no receiver could take it
    pub retained: U256,
}

impl DistributionReport {
    pub fn distributed(&self) -> U256 {
        self.payouts
            .iter()
            .fold(U256::zero(), |total, payout| total + payout.amount)
    }
}

#[derive(Debug, Clone)]
pub struct FeeConverter {
    address: Address,
    controller: SharedController,
}

impl FeeConverter {
    pub fn new(address: Address, controller: SharedController) -> Self {
        Self {
            address,
            controller,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Address of the controller this converter obeys
    pub fn controller(&self) -> Address {
        self.controller.read().address()
    }

    pub fn controller_handle(&self) -> &SharedController {
        &self.controller
    }

    fn active_policy(&self) -> Result<ControllerSnapshot, Revert> {
        let snapshot = self.controller.read().snapshot();
        snapshot.ensure_active()?;
        Ok(snapshot)
    }

    /// Accept native currency sent to the converter
    pub fn deposit_native(&self, chain: &mut Chain, ctx: &CallContext) -> Result<(), Revert> {
        chain.receive_value(ctx, self.address)
    }

    /// Wrap the converter's whole native balance; returns the amount wrapped
    pub fn wrap_native(&self, chain: &mut Chain, ctx: &CallContext) -> Result<U256, Revert> {
        chain.atomic(|chain| {
            self.active_policy()?;
            chain.receive_value(ctx, self.address)?;
            let native = chain.native_balance(self.address);
            if !native.is_zero() {
                chain.wrap_native(self.address, native)?;
                info!(converter = ?self.address, amount = %native, "wrapped native balance");
            }
            Ok(native)
        })
    }

    /// Sweep collectors, swap every input into the reward token and distribute
    pub fn convert(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        request: &ConversionRequest,
    ) -> Result<DistributionReport, Revert> {
        chain.atomic(|chain| {
            let policy = self.active_policy()?;
            chain.receive_value(ctx, self.address)?;

            self.collect(chain, ctx, &policy, &request.collector_calls)?;

            let expected = request.tokens.len();
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

            // A trailing reward token is already converted
            let legs = match request.tokens.last() {
                Some(last) if *last == policy.reward_token => expected - 1,
                _ => expected,
            };

            if legs > 0 {
                let swap = BatchSwap {
                    input_tokens: request.tokens[..legs].to_vec(),
                    amounts: request.amounts[..legs].to_vec(),
                    min_outputs: request.min_outputs[..legs].to_vec(),
                    output_token: policy.reward_token,
                };
                let adapter = &policy.exchange_adapter;

                let mut native = U256::zero();
                for (token, amount) in swap.input_tokens.iter().zip(&swap.amounts) {
                    if *token == NATIVE_CURRENCY {
                        native = *amount;
                    } else if chain.ensure_allowance(*token, self.address, adapter.address(), *amount)? {
                        debug!(converter = ?self.address, token = ?token, %amount, "approved adapter");
                    }
                }

                let out = adapter.batch_swap(
                    chain,
                    &ctx.forwarded(self.address).with_value(native),
                    &swap,
                )?;
                info!(
                    converter = ?self.address,
                    legs,
                    reward = ?policy.reward_token,
                    converted = %out,
                    "converted fees"
                );
            }

            self.distribute_with(chain, ctx, &policy)
        })
    }

    /// Swap one input into the reward token through the adapter's single path
    pub fn convert_single(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        request: &SingleConversion,
    ) -> Result<DistributionReport, Revert> {
        chain.atomic(|chain| {
            let policy = self.active_policy()?;
            chain.receive_value(ctx, self.address)?;

            if let Some(token) = request.output_token {
                if token != policy.reward_token {
                    return Err(Revert::InvalidOutputToken { token });
                }
            }
            let adapter = &policy.exchange_adapter;
            if adapter.output_token() != policy.reward_token {
                return Err(Revert::InvalidOutputToken {
                    token: adapter.output_token(),
                });
            }

            if request.token != policy.reward_token && !request.amount.is_zero() {
                let forwarded = if request.token == NATIVE_CURRENCY {
                    ctx.forwarded(self.address).with_value(request.amount)
                } else {
                    chain.ensure_allowance(request.token, self.address, adapter.address(), request.amount)?;
                    ctx.forwarded(self.address)
                };
                let out = adapter.swap(
                    chain,
                    &forwarded,
                    request.token,
                    request.amount,
                    request.min_output,
                    self.address,
                )?;
                info!(
                    converter = ?self.address,
                    input = ?request.token,
                    amount = %request.amount,
                    converted = %out,
                    "converted single input"
                );
            }

            self.distribute_with(chain, ctx, &policy)
        })
    }

    /// Pay the keeper incentive and split the reward balance across receivers
    pub fn distribute(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
    ) -> Result<DistributionReport, Revert> {
        chain.atomic(|chain| {
            let policy = self.active_policy()?;
            chain.receive_value(ctx, self.address)?;
            self.distribute_with(chain, ctx, &policy)
        })
    }

    /// Run a sequence of calls as one atomic unit
    ///
    /// Refused outright while paused. Attached value is received once up
    /// front; inner steps run with none. The first failure restores the world
    /// and is reported with its index.
    pub fn multicall(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        calls: Vec<Call>,
    ) -> Result<Vec<CallOutcome>, Revert> {
        chain.atomic(|chain| {
            self.active_policy()?;
            chain.receive_value(ctx, self.address)?;
            let inner = CallContext {
                value: U256::zero(),
                ..*ctx
            };

            let mut outcomes = Vec::with_capacity(calls.len());
            for (index, call) in calls.iter().enumerate() {
                let outcome = self
                    .dispatch(chain, &inner, call)
                    .map_err(|source| Revert::CallFailed {
                        index,
                        source: Box::new(source),
                    })?;
                debug!(converter = ?self.address, index, target = ?call.target(self.address), "batch step done");
                outcomes.push(outcome);
            }

            info!(converter = ?self.address, caller = ?ctx.sender, steps = outcomes.len(), "multicall executed");
            Ok(outcomes)
        })
    }

    fn dispatch(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        call: &Call,
    ) -> Result<CallOutcome, Revert> {
        match call {
            Call::Converter(ConverterCall::WrapNative) => {
                self.wrap_native(chain, ctx).map(CallOutcome::Wrapped)
            }
            Call::Converter(ConverterCall::Convert(request)) => {
                self.convert(chain, ctx, request).map(CallOutcome::Distributed)
            }
            Call::Converter(ConverterCall::ConvertSingle(request)) => self
                .convert_single(chain, ctx, request)
                .map(CallOutcome::Distributed),
            Call::Converter(ConverterCall::Distribute) => {
                self.distribute(chain, ctx).map(CallOutcome::Distributed)
            }
            Call::External(target) => {
                target.invoke(chain, &ctx.forwarded(self.address))?;
                Ok(CallOutcome::Executed {
                    target: target.address(),
                })
            }
        }
    }

    fn collect(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        policy: &ControllerSnapshot,
        calls: &[CollectorCall],
    ) -> Result<(), Revert> {
        if calls.len() != policy.fee_collectors.len() {
            return Err(Revert::ParameterCountMismatch {
                expected: policy.fee_collectors.len(),
                actual: calls.len(),
            });
        }
        let forwarded = ctx.forwarded(self.address);
        for (collector, call) in policy.fee_collectors.iter().zip(calls) {
            if !call.should_call {
                continue;
            }
            collector.sweep(chain, &forwarded, &call.payload)?;
            debug!(converter = ?self.address, collector = ?collector.address(), "collector swept");
        }
        Ok(())
    }

    fn distribute_with(
        &self,
        chain: &mut Chain,
        ctx: &CallContext,
        policy: &ControllerSnapshot,
    ) -> Result<DistributionReport, Revert> {
        let reward = policy.reward_token;
        let balance = chain.balance_of(reward, self.address);
        let mut report = DistributionReport {
            reward_token: reward,
            balance,
            keeper: ctx.origin,
            ..DistributionReport::default()
        };
        if balance.is_zero() {
            debug!(converter = ?self.address, "nothing to distribute");
            return Ok(report);
        }

        let incentive = percent_of(balance, policy.fee_conversion_incentive)?;
        if !incentive.is_zero() {
            chain.safe_transfer(reward, self.address, ctx.origin, incentive)?;
        }
        report.incentive = incentive;
        let remaining = balance.checked_sub(incentive).ok_or(Revert::Overflow)?;

        let weight_sum = policy
            .reward_receivers
            .iter()
            .try_fold(U256::zero(), |sum, r| sum.checked_add(r.weight))
            .ok_or(Revert::Overflow)?;
        if weight_sum.is_zero() {
            warn!(
                converter = ?self.address,
                receivers = policy.reward_receivers.len(),
                retained = %remaining,
                "no weighted receivers, reward kept in converter"
            );
            report.retained = remaining;
            return Ok(report);
        }

        let last = policy.reward_receivers.len() - 1;
        let mut paid = U256::zero();
        for (i, receiver) in policy.reward_receivers.iter().enumerate() {
            let amount = if i == last {
                remaining - paid
            } else {
                mul_div(remaining, receiver.weight, weight_sum)?
            };
            if !amount.is_zero() {
                chain.safe_transfer(reward, self.address, receiver.receiver, amount)?;
            }
            paid += amount;
            report.payouts.push(Payout {
                receiver: receiver.receiver,
                amount,
            });
        }

        info!(
            converter = ?self.address,
            keeper = ?ctx.origin,
            %balance,
            %incentive,
            receivers = report.payouts.len(),
            "distributed rewards"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, ControllerParams, RewardReceiver};
    use crate::exchange_adapter::ConstantProductAdapter;
    use crate::fee_collector::WrappedNativeFeeCollector;
    use feeflow_amm::{ConstantProductRouter, Exchange, LiquidityRequest};
    use feeflow_ledger::TokenSpec;
    use feeflow_types::WAD;
    use std::sync::Arc;

    const WETH: u64 = 0xeeee;
    const METRIC: u64 = 0x100;
    const USDC: u64 = 0x200;
    const CONVERTER: u64 = 0xc0;
    const OWNER: u64 = 0x01;
    const KEEPER: u64 = 0x07;
    const R1: u64 = 0xa01;
    const R2: u64 = 0xa02;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn units(n: u64) -> U256 {
        U256::from(n) * U256::exp10(18)
    }

    fn seed(chain: &mut Chain, router: &ConstantProductRouter, token: Address, amount: U256) {
        let seeder = addr(0x50);
        chain.mint(token, seeder, seeder, amount).unwrap();
        chain.fund_native(seeder, units(100)).unwrap();
        chain.wrap_native(seeder, units(100)).unwrap();
        chain.approve(token, seeder, router.address(), U256::MAX).unwrap();
        chain.approve(addr(WETH), seeder, router.address(), U256::MAX).unwrap();
        router
            .add_liquidity(
                chain,
                &CallContext::external(seeder),
                LiquidityRequest {
                    token_a: token,
                    token_b: addr(WETH),
                    amount_a_desired: amount,
                    amount_b_desired: units(100),
                    amount_a_min: U256::zero(),
                    amount_b_min: U256::zero(),
                    to: seeder,
                },
            )
            .unwrap();
    }

    fn setup(incentive: U256, collectors: Vec<Arc<dyn FeeCollector>>) -> (Chain, FeeConverter) {
        let mut chain = Chain::new(addr(WETH));
        chain.create_token(addr(METRIC), TokenSpec::open("Metric", "METRIC")).unwrap();
        chain.create_token(addr(USDC), TokenSpec::open("USD Coin", "USDC")).unwrap();
        let mut router = ConstantProductRouter::new(addr(0xa0));
        router.create_pair(&mut chain, addr(METRIC), addr(WETH), addr(0x301), 30).unwrap();
        router.create_pair(&mut chain, addr(USDC), addr(WETH), addr(0x302), 30).unwrap();
        seed(&mut chain, &router, addr(METRIC), units(400_000));
        seed(&mut chain, &router, addr(USDC), units(250_000));

        let exchange: Arc<dyn Exchange> = Arc::new(router);
        let adapter = Arc::new(ConstantProductAdapter::new(addr(0xad), exchange, addr(METRIC)));
        let controller = Controller::new(
            addr(0xcc),
            addr(OWNER),
            ControllerParams {
                reward_receivers: vec![
                    RewardReceiver::new(addr(R1), units(40)),
                    RewardReceiver::new(addr(R2), units(60)),
                ],
                fee_collectors: collectors,
                exchange_adapter: adapter,
                fee_conversion_incentive: incentive,
                reward_token: addr(METRIC),
            },
        )
        .into_shared();
        (chain, FeeConverter::new(addr(CONVERTER), controller))
    }

    fn keeper() -> CallContext {
        CallContext::external(addr(KEEPER))
    }

    #[test]
    fn test_distribute_splits_by_weight() {
        let (mut chain, converter) = setup(U256::zero(), vec![]);
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), U256::from(100u64)).unwrap();

        let report = converter.distribute(&mut chain, &keeper()).unwrap();

        assert_eq!(chain.balance_of(addr(METRIC), addr(R1)), U256::from(40u64));
        assert_eq!(chain.balance_of(addr(METRIC), addr(R2)), U256::from(60u64));
        assert!(chain.balance_of(addr(METRIC), addr(CONVERTER)).is_zero());
        assert_eq!(report.distributed(), U256::from(100u64));
        assert!(report.incentive.is_zero());
    }

    #[test]
    fn test_last_receiver_takes_dust() {
        let (mut chain, converter) = setup(U256::zero(), vec![]);
        converter
            .controller_handle()
            .write()
            .set_reward_receivers(
                &CallContext::external(addr(OWNER)),
                vec![
                    RewardReceiver::new(addr(R1), WAD),
                    RewardReceiver::new(addr(R2), WAD),
                    RewardReceiver::new(addr(0xa03), WAD),
                ],
            )
            .unwrap();
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), U256::from(100u64)).unwrap();

        let report = converter.distribute(&mut chain, &keeper()).unwrap();

        let amounts: Vec<U256> = report.payouts.iter().map(|p| p.amount).collect();
        assert_eq!(
            amounts,
            vec![U256::from(33u64), U256::from(33u64), U256::from(34u64)]
        );
        assert!(chain.balance_of(addr(METRIC), addr(CONVERTER)).is_zero());
    }

    #[test]
    fn test_incentive_goes_to_origin() {
        let (mut chain, converter) = setup(WAD, vec![]);
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), units(100)).unwrap();

        // Relayed through a contract: the originating account is paid
        let relayed = CallContext::external(addr(KEEPER)).forwarded(addr(0x999));
        let report = converter.distribute(&mut chain, &relayed).unwrap();

        assert_eq!(report.incentive, units(1));
        assert_eq!(chain.balance_of(addr(METRIC), addr(KEEPER)), units(1));
        assert!(chain.balance_of(addr(METRIC), addr(0x999)).is_zero());
        assert_eq!(report.distributed(), units(99));
    }

    #[test]
    fn test_empty_receivers_retain_remainder() {
        let (mut chain, converter) = setup(WAD, vec![]);
        converter
            .controller_handle()
            .write()
            .set_reward_receivers(&CallContext::external(addr(OWNER)), vec![])
            .unwrap();
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), units(100)).unwrap();

        let report = converter.distribute(&mut chain, &keeper()).unwrap();

        assert_eq!(report.retained, units(99));
        assert_eq!(chain.balance_of(addr(METRIC), addr(CONVERTER)), units(99));
    }

    #[test]
    fn test_paused_steps_are_forbidden() {
        let (mut chain, converter) = setup(WAD, vec![]);
        converter
            .controller_handle()
            .write()
            .pause(&CallContext::external(addr(OWNER)))
            .unwrap();
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), units(100)).unwrap();
        chain.fund_native(addr(CONVERTER), units(1)).unwrap();

        assert_eq!(converter.wrap_native(&mut chain, &keeper()), Err(Revert::Forbidden));
        assert_eq!(converter.distribute(&mut chain, &keeper()), Err(Revert::Forbidden));
        assert_eq!(
            converter.convert(&mut chain, &keeper(), &ConversionRequest::default()),
            Err(Revert::Forbidden)
        );
        assert_eq!(chain.balance_of(addr(METRIC), addr(CONVERTER)), units(100));
        assert_eq!(chain.native_balance(addr(CONVERTER)), units(1));
    }

    #[test]
    fn test_wrap_native_is_a_no_op_when_empty() {
        let (mut chain, converter) = setup(WAD, vec![]);
        assert!(converter.wrap_native(&mut chain, &keeper()).unwrap().is_zero());

        chain.fund_native(addr(CONVERTER), units(2)).unwrap();
        assert_eq!(converter.wrap_native(&mut chain, &keeper()).unwrap(), units(2));
        assert_eq!(chain.balance_of(addr(WETH), addr(CONVERTER)), units(2));
    }

    #[test]
    fn test_convert_checks_list_lengths() {
        let (mut chain, converter) = setup(WAD, vec![]);
        let err = converter
            .convert(
                &mut chain,
                &keeper(),
                &ConversionRequest {
                    tokens: vec![addr(USDC)],
                    amounts: vec![],
                    min_outputs: vec![U256::zero()],
                    collector_calls: vec![],
                },
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "inputAmounts list length 0 must match tokens list length 1"
        );

        let err = converter
            .convert(
                &mut chain,
                &keeper(),
                &ConversionRequest {
                    tokens: vec![addr(USDC)],
                    amounts: vec![units(1)],
                    min_outputs: vec![],
                    collector_calls: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Revert::InputLengthMismatch { list: "minOutputs", .. }
        ));
    }

    #[test]
    fn test_convert_requires_one_instruction_per_collector() {
        let collector: Arc<dyn FeeCollector> = Arc::new(WrappedNativeFeeCollector::new(
            addr(0xf01),
            addr(WETH),
            addr(CONVERTER),
        ));
        let (mut chain, converter) = setup(WAD, vec![collector]);

        let err = converter
            .convert(&mut chain, &keeper(), &ConversionRequest::default())
            .unwrap_err();
        assert_eq!(err, Revert::ParameterCountMismatch { expected: 1, actual: 0 });

        // Skipped collectors keep their fees
        chain.fund_native(addr(0xf01), units(1)).unwrap();
        converter
            .convert(
                &mut chain,
                &keeper(),
                &ConversionRequest {
                    collector_calls: vec![CollectorCall::skip()],
                    ..ConversionRequest::default()
                },
            )
            .unwrap();
        assert_eq!(chain.native_balance(addr(0xf01)), units(1));
    }

    #[test]
    fn test_convert_native_and_token_leaves_nothing_behind() {
        let (mut chain, converter) = setup(WAD, vec![]);
        chain.fund_native(addr(CONVERTER), units(1)).unwrap();
        chain.mint(addr(USDC), addr(CONVERTER), addr(CONVERTER), units(500)).unwrap();

        let report = converter
            .convert(
                &mut chain,
                &keeper(),
                &ConversionRequest {
                    tokens: vec![NATIVE_CURRENCY, addr(USDC)],
                    amounts: vec![units(1), units(500)],
                    min_outputs: vec![U256::zero(); 2],
                    collector_calls: vec![],
                },
            )
            .unwrap();

        assert_eq!(report.incentive, percent_of(report.balance, WAD).unwrap());
        assert_eq!(chain.balance_of(addr(METRIC), addr(KEEPER)), report.incentive);
        let r1 = chain.balance_of(addr(METRIC), addr(R1));
        let r2 = chain.balance_of(addr(METRIC), addr(R2));
        assert_eq!(r1 + r2 + report.incentive, report.balance);
        assert_eq!(r1, mul_div(report.balance - report.incentive, units(40), units(100)).unwrap());
        assert!(chain.native_balance(addr(CONVERTER)).is_zero());
        for token in [addr(METRIC), addr(USDC), addr(WETH)] {
            assert!(chain.balance_of(token, addr(CONVERTER)).is_zero());
        }
    }

    #[test]
    fn test_trailing_reward_token_passes_through() {
        let (mut chain, converter) = setup(U256::zero(), vec![]);
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), U256::from(100u64)).unwrap();

        let report = converter
            .convert(
                &mut chain,
                &keeper(),
                &ConversionRequest {
                    tokens: vec![addr(METRIC)],
                    amounts: vec![U256::from(100u64)],
                    min_outputs: vec![U256::zero()],
                    collector_calls: vec![],
                },
            )
            .unwrap();
        assert_eq!(report.balance, U256::from(100u64));
        assert_eq!(chain.balance_of(addr(METRIC), addr(R1)), U256::from(40u64));
    }

    #[test]
    fn test_convert_approves_lazily() {
        let (mut chain, converter) = setup(WAD, vec![]);
        let (converter_addr, adapter) = (addr(CONVERTER), addr(0xad));
        chain.mint(addr(USDC), converter_addr, converter_addr, units(10)).unwrap();
        chain.approve(addr(USDC), converter_addr, adapter, units(50)).unwrap();

        let request = ConversionRequest {
            tokens: vec![addr(USDC)],
            amounts: vec![units(10)],
            min_outputs: vec![U256::zero()],
            collector_calls: vec![],
        };
        converter.convert(&mut chain, &keeper(), &request).unwrap();
        // Existing allowance covered the leg and was only spent down
        assert_eq!(chain.allowance(addr(USDC), converter_addr, adapter), units(40));

        chain.mint(addr(USDC), converter_addr, converter_addr, units(60)).unwrap();
        let request = ConversionRequest {
            amounts: vec![units(60)],
            ..request
        };
        converter.convert(&mut chain, &keeper(), &request).unwrap();
        assert!(chain.allowance(addr(USDC), converter_addr, adapter).is_zero());
    }

    #[test]
    fn test_convert_single_rejects_foreign_output() {
        let (mut chain, converter) = setup(WAD, vec![]);
        let err = converter
            .convert_single(
                &mut chain,
                &keeper(),
                &SingleConversion {
                    token: addr(USDC),
                    amount: units(1),
                    min_output: U256::zero(),
                    output_token: Some(addr(WETH)),
                },
            )
            .unwrap_err();
        assert_eq!(err, Revert::InvalidOutputToken { token: addr(WETH) });
    }

    #[test]
    fn test_convert_single_swaps_and_distributes() {
        let (mut chain, converter) = setup(U256::zero(), vec![]);
        chain.mint(addr(USDC), addr(CONVERTER), addr(CONVERTER), units(100)).unwrap();

        let report = converter
            .convert_single(
                &mut chain,
                &keeper(),
                &SingleConversion {
                    token: addr(USDC),
                    amount: units(100),
                    min_output: U256::one(),
                    output_token: Some(addr(METRIC)),
                },
            )
            .unwrap();
        assert!(!report.balance.is_zero());
        assert_eq!(report.distributed(), report.balance);
        assert!(chain.balance_of(addr(USDC), addr(CONVERTER)).is_zero());
    }

    #[test]
    fn test_multicall_reverts_everything_on_failure() {
        let (mut chain, converter) = setup(WAD, vec![]);
        chain.fund_native(addr(CONVERTER), units(1)).unwrap();
        chain.mint(addr(METRIC), addr(CONVERTER), addr(CONVERTER), units(10)).unwrap();

        let err = converter
            .multicall(
                &mut chain,
                &keeper(),
                vec![
                    ConverterCall::WrapNative.into(),
                    ConverterCall::Distribute.into(),
                    ConverterCall::ConvertSingle(SingleConversion {
                        token: addr(USDC),
                        amount: units(1),
                        min_output: U256::zero(),
                        output_token: Some(addr(USDC)),
                    })
                    .into(),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, Revert::CallFailed { index: 2, .. }));
        assert_eq!(err.root_cause(), &Revert::InvalidOutputToken { token: addr(USDC) });
        assert_eq!(chain.native_balance(addr(CONVERTER)), units(1));
        assert_eq!(chain.balance_of(addr(METRIC), addr(CONVERTER)), units(10));
        assert!(chain.balance_of(addr(METRIC), addr(KEEPER)).is_zero());
    }

    #[derive(Debug)]
    struct Minter(Address);

    impl BatchTarget for Minter {
        fn address(&self) -> Address {
            self.0
        }

        fn invoke(&self, chain: &mut Chain, _ctx: &CallContext) -> Result<(), Revert> {
            chain.mint(addr(METRIC), self.0, self.0, units(1))
        }
    }

    #[test]
    fn test_paused_multicall_runs_no_external_step() {
        let (mut chain, converter) = setup(WAD, vec![]);
        converter
            .controller_handle()
            .write()
            .pause(&CallContext::external(addr(OWNER)))
            .unwrap();
        let minter = addr(0xd0);

        let err = converter
            .multicall(
                &mut chain,
                &keeper(),
                vec![Call::External(Arc::new(Minter(minter)))],
            )
            .unwrap_err();

        assert_eq!(err, Revert::Forbidden);
        assert!(chain.balance_of(addr(METRIC), minter).is_zero());
    }

    #[test]
    fn test_multicall_runs_steps_in_order() {
        let (mut chain, converter) = setup(U256::zero(), vec![]);
        chain.fund_native(addr(CONVERTER), units(1)).unwrap();

        let outcomes = converter
            .multicall(
                &mut chain,
                &keeper(),
                vec![
                    ConverterCall::WrapNative.into(),
                    ConverterCall::Convert(ConversionRequest {
                        tokens: vec![addr(WETH)],
                        amounts: vec![units(1)],
                        min_outputs: vec![U256::zero()],
                        collector_calls: vec![],
                    })
                    .into(),
                ],
            )
            .unwrap();

        assert_eq!(outcomes[0], CallOutcome::Wrapped(units(1)));
        match &outcomes[1] {
            CallOutcome::Distributed(report) => {
                assert!(!report.balance.is_zero());
                assert_eq!(report.distributed(), report.balance);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(chain.balance_of(addr(WETH), addr(CONVERTER)).is_zero());
    }

    #[test]
    fn test_adapter_output_must_be_reward_token() {
        let (mut chain, converter) = setup(WAD, vec![]);
        let adapter_output = converter.controller_handle().read().snapshot().exchange_adapter.output_token();
        assert_eq!(adapter_output, addr(METRIC));

        converter
            .controller_handle()
            .write()
            .set_reward_token(&CallContext::external(addr(OWNER)), addr(USDC))
            .unwrap();
        let err = converter
            .convert_single(
                &mut chain,
                &keeper(),
                &SingleConversion {
                    token: addr(WETH),
                    amount: U256::zero(),
                    min_output: U256::zero(),
                    output_token: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, Revert::InvalidOutputToken { token: addr(METRIC) });
    }
}
