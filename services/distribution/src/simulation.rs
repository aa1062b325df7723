//! Simulated deployment built from a [`DeploymentConfig`]
//!
//! Stands up the whole system on an in-memory [`Chain`]: tokens, seeded
//! venue pairs, adapters, receiver pools and vaults, funded fee collectors,
//! the controller and the converter. [`Deployment::run`] then plays one keeper
//! round as a single converter multicall:
//!
//! ```text
//! multicall [ convert(native, tokens.., reward) , compound(vault)* ]
//! ```

use crate::batch::{BatchTarget, Call, CallOutcome, ConverterCall};
use crate::compounding_vault::CompoundingVault;
use crate::controller::{Controller, ControllerParams, RewardReceiver, SharedController};
use crate::exchange_adapter::{ConstantProductAdapter, ExchangeAdapter};
use crate::fee_collector::{FeeCollector, WrappedNativeFeeCollector};
use crate::fee_converter::{CollectorCall, ConversionRequest, DistributionReport, FeeConverter};
use crate::share_pool::SharePool;
use anyhow::{anyhow, bail, Context, Result};
use feeflow_amm::{ConstantProductRouter, Exchange, LiquidityRequest, V2Math};
use feeflow_config::{wad, DeploymentConfig, ReceiverKind};
use feeflow_ledger::{Chain, TokenBehavior, TokenSpec};
use feeflow_types::{wad_to_decimal, Address, Bytes, CallContext, NATIVE_CURRENCY, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// One receiver's share of a keeper round
#[derive(Debug, Clone, Serialize)]
pub struct ReceiverPayout {
    pub receiver: Address,
    pub kind: ReceiverKind,
    pub amount: Decimal,
}

/// Vault position after the round
#[derive(Debug, Clone, Serialize)]
pub struct VaultState {
    pub vault: Address,
    /// LP tokens held for depositors
    pub liquidity: Decimal,
    /// Revenue left over from pair balancing
    pub revenue_dust: Decimal,
}

/// Outcome of [`Deployment::run`], in whole-token units
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub keeper: Address,
    pub reward_token: Address,
    pub converted: Decimal,
    pub incentive: Decimal,
    pub payouts: Vec<ReceiverPayout>,
    pub vaults: Vec<VaultState>,
    /// Reward token spot price in wrapped native after the round
    pub reward_price: Option<Decimal>,
    /// Reward token still held by the converter
    pub converter_residual: Decimal,
}

fn units(value: U256) -> Result<Decimal> {
    wad_to_decimal(value).ok_or_else(|| anyhow!("amount {value} exceeds decimal range"))
}

/// Give `account` `amount` of `token`, wrapping native for the wrapped-native token
fn fund(chain: &mut Chain, token: Address, account: Address, amount: U256) -> Result<()> {
    if amount.is_zero() {
        return Ok(());
    }
    if token == chain.wrapped_native() {
        chain.fund_native(account, amount)?;
        chain.wrap_native(account, amount)?;
    } else {
        chain.mint(token, account, account, amount)?;
    }
    Ok(())
}

/// Everything deployed for one configuration
#[derive(Debug)]
pub struct Deployment {
    pub chain: Chain,
    pub converter: FeeConverter,
    pub exchange: Arc<dyn Exchange>,
    pub share_pools: Vec<SharePool>,
    pub vaults: Vec<Arc<CompoundingVault>>,
    pub collectors: Vec<Arc<WrappedNativeFeeCollector>>,
    receivers: Vec<(Address, ReceiverKind)>,
    keeper: Address,
}

impl Deployment {
    pub fn build(config: &DeploymentConfig) -> Result<Self> {
        let weth = config.chain.wrapped_native;
        let owner = config.controller.owner;
        let reward_token = config.controller.reward_token;
        let converter_address = config.controller.converter;
        let mut chain = Chain::new(weth);

        for token in &config.chain.tokens {
            let mut spec = TokenSpec::open(&token.name, &token.symbol);
            if token.returns_false {
                spec = spec.with_behavior(TokenBehavior::ReturnsFalse);
            }
            chain
                .create_token(token.address, spec)
                .with_context(|| format!("Failed to deploy token {}", token.symbol))?;
        }

        let mut router = ConstantProductRouter::new(config.venue.router);
        for pair in &config.venue.pairs {
            router.create_pair(
                &mut chain,
                pair.token_a,
                pair.token_b,
                pair.address,
                config.venue.fee_bps,
            )?;
            let amount_a = wad("venue.pairs.reserve_a", pair.reserve_a)?;
            let amount_b = wad("venue.pairs.reserve_b", pair.reserve_b)?;
            fund(&mut chain, pair.token_a, owner, amount_a)?;
            fund(&mut chain, pair.token_b, owner, amount_b)?;
            chain.approve(pair.token_a, owner, router.address(), U256::MAX)?;
            chain.approve(pair.token_b, owner, router.address(), U256::MAX)?;
            let receipt = router
                .add_liquidity(
                    &mut chain,
                    &CallContext::external(owner),
                    LiquidityRequest {
                        token_a: pair.token_a,
                        token_b: pair.token_b,
                        amount_a_desired: amount_a,
                        amount_b_desired: amount_b,
                        amount_a_min: U256::zero(),
                        amount_b_min: U256::zero(),
                        to: owner,
                    },
                )
                .with_context(|| format!("Failed to seed pair {:?}", pair.address))?;
            debug!(pair = ?pair.address, liquidity = %receipt.liquidity, "pair seeded");
        }
        let exchange: Arc<dyn Exchange> = Arc::new(router);

        let adapter: Arc<dyn ExchangeAdapter> = Arc::new(ConstantProductAdapter::new(
            config.controller.adapter,
            Arc::clone(&exchange),
            reward_token,
        ));
        let vault_adapter: Option<Arc<dyn ExchangeAdapter>> = config.venue.vault_adapter.map(|a| {
            Arc::new(ConstantProductAdapter::new(a, Arc::clone(&exchange), weth))
                as Arc<dyn ExchangeAdapter>
        });

        let symbol = chain
            .token(reward_token)
            .map(|t| t.spec().symbol.clone())
            .unwrap_or_default();
        let mut share_pools = Vec::new();
        let mut vaults = Vec::new();
        let mut reward_receivers = Vec::with_capacity(config.controller.receivers.len());
        for receiver in &config.controller.receivers {
            match receiver.kind {
                ReceiverKind::Account => {}
                ReceiverKind::SharePool => {
                    share_pools.push(SharePool::deploy(
                        &mut chain,
                        receiver.address,
                        reward_token,
                        &format!("{symbol} Share"),
                        &format!("x{symbol}"),
                    )?);
                }
                ReceiverKind::CompoundingVault => {
                    let vault_adapter = vault_adapter
                        .clone()
                        .context("Compounding vault needs venue.vault_adapter")?;
                    let vault = CompoundingVault::deploy(
                        &mut chain,
                        receiver.address,
                        reward_token,
                        vault_adapter,
                        Arc::clone(&exchange),
                        &format!("{symbol} Revenue LP Share"),
                        &format!("lrs{symbol}"),
                    )
                    .with_context(|| format!("Failed to deploy vault {:?}", receiver.address))?;
                    vaults.push(Arc::new(vault));
                }
            }
            reward_receivers.push(RewardReceiver::new(receiver.address, receiver.weight()?));
        }

        let mut collectors = Vec::with_capacity(config.controller.collectors.len());
        for settings in &config.controller.collectors {
            let collector = Arc::new(WrappedNativeFeeCollector::new(
                settings.address,
                weth,
                converter_address,
            ));
            chain.fund_native(
                settings.address,
                wad("controller.collectors.native_balance", settings.native_balance)?,
            )?;
            fund(
                &mut chain,
                weth,
                settings.address,
                wad("controller.collectors.wrapped_balance", settings.wrapped_balance)?,
            )?;
            collectors.push(collector);
        }

        let controller: SharedController = Controller::new(
            config.controller.address,
            owner,
            ControllerParams {
                reward_receivers,
                fee_collectors: collectors
                    .iter()
                    .map(|c| Arc::clone(c) as Arc<dyn FeeCollector>)
                    .collect(),
                exchange_adapter: adapter,
                fee_conversion_incentive: config.controller.incentive_rate()?,
                reward_token,
            },
        )
        .into_shared();
        let converter = FeeConverter::new(converter_address, controller);

        chain.fund_native(
            converter_address,
            wad("simulation.native_balance", config.simulation.native_balance)?,
        )?;
        for balance in &config.simulation.balances {
            fund(
                &mut chain,
                balance.token,
                converter_address,
                wad("simulation.balances.amount", balance.amount)?,
            )?;
        }

        info!(
            converter = ?converter_address,
            pools = share_pools.len(),
            vaults = vaults.len(),
            collectors = collectors.len(),
            "🏗️ deployment ready"
        );
        Ok(Self {
            chain,
            converter,
            exchange,
            share_pools,
            vaults,
            collectors,
            receivers: config
                .controller
                .receivers
                .iter()
                .map(|r| (r.address, r.kind))
                .collect(),
            keeper: config.simulation.keeper,
        })
    }

    pub fn controller(&self) -> &SharedController {
        self.converter.controller_handle()
    }

    /// Conversion covering the converter's holdings plus pending collector fees
    ///
    /// Native goes first, the reward token last so it passes through unswapped.
    pub fn conversion_request(&self, payload: &Bytes) -> ConversionRequest {
        let chain = &self.chain;
        let converter = self.converter.address();
        let policy = self.controller().read().snapshot();
        let weth = chain.wrapped_native();

        let mut legs: Vec<(Address, U256)> = Vec::new();
        let native = chain.native_balance(converter);
        if !native.is_zero() {
            legs.push((NATIVE_CURRENCY, native));
        }

        let swept = self
            .collectors
            .iter()
            .fold(U256::zero(), |total, c| {
                total + chain.native_balance(c.address()) + chain.balance_of(weth, c.address())
            });
        for token in chain.tokens().filter(|token| *token != policy.reward_token) {
            let mut amount = chain.balance_of(token, converter);
            if token == weth {
                amount += swept;
            }
            if !amount.is_zero() {
                legs.push((token, amount));
            }
        }

        let reward = chain.balance_of(policy.reward_token, converter);
        if !reward.is_zero() {
            legs.push((policy.reward_token, reward));
        }

        ConversionRequest {
            tokens: legs.iter().map(|(token, _)| *token).collect(),
            amounts: legs.iter().map(|(_, amount)| *amount).collect(),
            min_outputs: vec![U256::zero(); legs.len()],
            collector_calls: vec![CollectorCall::call(payload.clone()); policy.fee_collectors.len()],
        }
    }

    /// One keeper round: convert and distribute, then compound every vault
    pub fn run(&mut self, payload: &Bytes) -> Result<SimulationReport> {
        let request = self.conversion_request(payload);
        let mut calls: Vec<Call> = vec![ConverterCall::Convert(request).into()];
        calls.extend(
            self.vaults
                .iter()
                .map(|vault| Call::External(Arc::clone(vault) as Arc<dyn BatchTarget>)),
        );

        let ctx = CallContext::external(self.keeper);
        let outcomes = self
            .converter
            .multicall(&mut self.chain, &ctx, calls)
            .context("Keeper multicall reverted")?;
        let report = match outcomes.first() {
            Some(CallOutcome::Distributed(report)) => report.clone(),
            other => bail!("unexpected conversion outcome {other:?}"),
        };
        self.report(&report)
    }

    fn report(&self, distribution: &DistributionReport) -> Result<SimulationReport> {
        let payouts = distribution
            .payouts
            .iter()
            .map(|payout| -> Result<ReceiverPayout> {
                let kind = self
                    .receivers
                    .iter()
                    .find(|(address, _)| *address == payout.receiver)
                    .map(|(_, kind)| *kind)
                    .unwrap_or_default();
                Ok(ReceiverPayout {
                    receiver: payout.receiver,
                    kind,
                    amount: units(payout.amount)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let vaults = self
            .vaults
            .iter()
            .map(|vault| -> Result<VaultState> {
                Ok(VaultState {
                    vault: vault.address(),
                    liquidity: units(vault.pool().balance_underlying(&self.chain))?,
                    revenue_dust: units(self.chain.balance_of(vault.revenue_token(), vault.address()))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let reward_price = self
            .exchange
            .get_reserves(&self.chain, distribution.reward_token, self.chain.wrapped_native())
            .ok()
            .and_then(|(reward, native)| V2Math::spot_price(reward, native));

        let report = SimulationReport {
            keeper: distribution.keeper,
            reward_token: distribution.reward_token,
            converted: units(distribution.balance)?,
            incentive: units(distribution.incentive)?,
            payouts,
            vaults,
            reward_price,
            converter_residual: units(
                self.chain
                    .balance_of(distribution.reward_token, self.converter.address()),
            )?,
        };
        info!(
            converted = %report.converted,
            incentive = %report.incentive,
            receivers = report.payouts.len(),
            "✅ keeper round complete"
        );
        Ok(report)
    }
}
