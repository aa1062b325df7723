//! Deployment Configuration Module
//!
//! Describes one fee-distribution deployment: the simulated chain's tokens,
//! the controller policy, the exchange venue and the simulation seed state.
//! Loaded from TOML with environment-specific overlays and `FEEFLOW_`
//! environment variable overrides.

use crate::error::ConfigError;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use feeflow_types::{wad_from_decimal, Address, HUNDRED_PERCENT, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Prefix for environment variable overrides (`FEEFLOW_CONTROLLER__INCENTIVE_PERCENT`)
pub const ENV_PREFIX: &str = "FEEFLOW";

const DEFAULT_FEE_BPS: u32 = 30;

fn default_fee_bps() -> u32 {
    DEFAULT_FEE_BPS
}

/// Main deployment configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeploymentConfig {
    pub chain: ChainSettings,
    pub controller: ControllerSettings,
    pub venue: VenueSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Ledger-level settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChainSettings {
    pub wrapped_native: Address,
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenSettings {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    /// Token signals failure by returning `false` instead of reverting
    #[serde(default)]
    pub returns_false: bool,
}

/// Distribution policy and contract addresses
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ControllerSettings {
    /// Where the controller itself is deployed
    pub address: Address,
    pub owner: Address,
    pub converter: Address,
    pub adapter: Address,
    pub reward_token: Address,
    /// Keeper incentive as a percentage of converted proceeds
    #[serde(default)]
    pub incentive_percent: Decimal,
    pub receivers: Vec<ReceiverSettings>,
    #[serde(default)]
    pub collectors: Vec<CollectorSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReceiverSettings {
    pub address: Address,
    /// Relative weight; weights need not sum to 100
    pub weight_percent: Decimal,
    #[serde(default)]
    pub kind: ReceiverKind,
}

/// What is deployed at a receiver address
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverKind {
    /// Plain account
    #[default]
    Account,
    /// Share pool over the reward token
    SharePool,
    /// Compounding vault over the reward/wrapped-native liquidity position
    CompoundingVault,
}

/// Wrapped-native fee collector and the fees it starts out holding
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CollectorSettings {
    pub address: Address,
    #[serde(default)]
    pub native_balance: Decimal,
    #[serde(default)]
    pub wrapped_balance: Decimal,
}

/// Constant-product venue settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VenueSettings {
    pub router: Address,
    /// Adapter swapping revenue into the paired leg for compounding vaults
    #[serde(default)]
    pub vault_adapter: Option<Address>,
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,
    #[serde(default)]
    pub pairs: Vec<PairSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PairSettings {
    pub address: Address,
    pub token_a: Address,
    pub token_b: Address,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
}

/// State seeded before the simulated conversion run
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SimulationSettings {
    pub keeper: Address,
    /// Native currency already sitting in the converter
    pub native_balance: Decimal,
    /// Token balances already sitting in the converter
    pub balances: Vec<BalanceSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BalanceSettings {
    pub token: Address,
    pub amount: Decimal,
}

/// Scale a human-readable amount to 18-decimal fixed point
pub fn wad(field: &str, value: Decimal) -> Result<U256, ConfigError> {
    wad_from_decimal(value).map_err(|source| ConfigError::InvalidAmount {
        field: field.to_string(),
        source,
    })
}

impl ControllerSettings {
    /// Incentive rate against the 100% reference (1e20)
    pub fn incentive_rate(&self) -> Result<U256, ConfigError> {
        wad("controller.incentive_percent", self.incentive_percent)
    }
}

impl ReceiverSettings {
    pub fn weight(&self) -> Result<U256, ConfigError> {
        wad("controller.receivers.weight_percent", self.weight_percent)
    }
}

impl DeploymentConfig {
    /// Load configuration from files with environment overrides
    ///
    /// `environment` selects `<base dir>/environments/<name>.toml` as an overlay.
    pub fn load(base_path: &Path, environment: Option<&str>) -> Result<Self> {
        Self::load_with_prefix(base_path, environment, ENV_PREFIX)
    }

    /// Same as [`DeploymentConfig::load`] with a custom environment prefix
    pub fn load_with_prefix(
        base_path: &Path,
        environment: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base_path).required(true));

        if let Some(env) = environment {
            let env_file = base_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: DeploymentConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .validate()
            .context("Invalid deployment configuration")?;
        debug!(
            receivers = config.controller.receivers.len(),
            pairs = config.venue.pairs.len(),
            "deployment configuration loaded"
        );
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.receivers.is_empty() {
            return Err(ConfigError::NoReceivers);
        }
        if self.controller.incentive_rate()? > HUNDRED_PERCENT {
            return Err(ConfigError::IncentiveTooHigh {
                percent: self.controller.incentive_percent,
            });
        }
        for receiver in &self.controller.receivers {
            receiver.weight()?;
        }
        if self.venue.fee_bps >= 10_000 {
            return Err(ConfigError::FeeOutOfRange {
                fee_bps: self.venue.fee_bps,
            });
        }

        let declared: BTreeSet<Address> = self
            .chain
            .tokens
            .iter()
            .map(|t| t.address)
            .chain(std::iter::once(self.chain.wrapped_native))
            .collect();
        let referenced = std::iter::once(self.controller.reward_token)
            .chain(
                self.venue
                    .pairs
                    .iter()
                    .flat_map(|p| [p.token_a, p.token_b]),
            )
            .chain(self.simulation.balances.iter().map(|b| b.token));
        for token in referenced {
            if !declared.contains(&token) {
                return Err(ConfigError::UndeclaredToken { token });
            }
        }

        let mut deployed = BTreeSet::new();
        let contracts = [
            self.controller.address,
            self.controller.converter,
            self.controller.adapter,
            self.venue.router,
        ]
        .into_iter()
        .chain(declared.iter().copied())
        .chain(self.venue.vault_adapter)
        .chain(self.venue.pairs.iter().map(|p| p.address))
        .chain(self.controller.collectors.iter().map(|c| c.address))
        .chain(
            self.controller
                .receivers
                .iter()
                .filter(|r| r.kind != ReceiverKind::Account)
                .map(|r| r.address),
        );
        for address in contracts {
            if !deployed.insert(address) {
                return Err(ConfigError::DuplicateAddress { address });
            }
        }

        let has_vault = self
            .controller
            .receivers
            .iter()
            .any(|r| r.kind == ReceiverKind::CompoundingVault);
        if has_vault && self.venue.vault_adapter.is_none() {
            return Err(ConfigError::MissingVaultAdapter);
        }

        Ok(())
    }
}
