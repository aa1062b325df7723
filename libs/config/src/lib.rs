//! # Feeflow Deployment Configuration
//!
//! Loads the description of one fee-distribution deployment: which tokens
//! exist, how revenue is split, which venue converts it and what the
//! simulated world starts out holding.
//!
//! ## Features
//!
//! - **Layered Sources**: base TOML, optional `environments/<name>.toml`
//!   overlay, then `FEEFLOW_`-prefixed environment variables
//! - **Human Units**: percentages and amounts are written as decimals
//!   (`"40"`, `"1.5"`) and scaled to 18-decimal fixed point on use
//! - **Validation**: receiver lists, incentive bounds, token declarations and
//!   address collisions are checked at load time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use feeflow_config::DeploymentConfig;
//! use std::path::Path;
//!
//! let config = DeploymentConfig::load(Path::new("config/deployment.toml"), None)?;
//! let incentive = config.controller.incentive_rate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod deployment;
pub mod error;

pub use deployment::{
    wad, BalanceSettings, ChainSettings, CollectorSettings, ControllerSettings, DeploymentConfig,
    PairSettings, ReceiverKind, ReceiverSettings, SimulationSettings, TokenSettings,
    VenueSettings, ENV_PREFIX,
};
pub use error::ConfigError;
