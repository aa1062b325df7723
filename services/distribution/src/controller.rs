//! Distribution Controller - owner-gated fee distribution policy
//!
//! ## Purpose
//!
//! Holds the authoritative configuration the fee converter reads on every
//! call: weighted reward receivers, fee collectors, the exchange adapter, the
//! keeper incentive, the reward token and the pause flag. It never moves funds.
//!
//! ## Rules
//!
//! - Every mutation requires the owner and replaces a whole value or list
//! - Reads are always available, paused or not
//! - The incentive is a fixed-point percentage of `HUNDRED_PERCENT` (1e20);
//!   receiver weights are normalised by their live sum instead
//!
//! ## Sharing
//!
//! Deployments share one controller as [`SharedController`]; converters take a
//! [`ControllerSnapshot`] at the start of each call so a single call never
//! sees two different policies.

use crate::exchange_adapter::ExchangeAdapter;
use crate::fee_collector::FeeCollector;
use feeflow_types::{Address, CallContext, Revert, U256};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Controller shared between converters and operators
pub type SharedController = Arc<RwLock<Controller>>;

/// A weighted destination for distributed rewards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardReceiver {
    pub receiver: Address,
    /// Fixed-point weight (1e18 = 1 unit); normalised by the sum of all weights
    pub weight: U256,
}

impl RewardReceiver {
    pub fn new(receiver: Address, weight: U256) -> Self {
        Self { receiver, weight }
    }
}

/// Initial controller configuration
#[derive(Debug, Clone)]
pub struct ControllerParams {
    pub reward_receivers: Vec<RewardReceiver>,
    pub fee_collectors: Vec<Arc<dyn FeeCollector>>,
    pub exchange_adapter: Arc<dyn ExchangeAdapter>,
    pub fee_conversion_incentive: U256,
    pub reward_token: Address,
}

/// Policy as seen by one converter call
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub reward_receivers: Vec<RewardReceiver>,
    pub fee_collectors: Vec<Arc<dyn FeeCollector>>,
    pub exchange_adapter: Arc<dyn ExchangeAdapter>,
    pub fee_conversion_incentive: U256,
    pub reward_token: Address,
    pub paused: bool,
}

impl ControllerSnapshot {
    /// Fails with `Forbidden` while paused
    pub fn ensure_active(&self) -> Result<(), Revert> {
        if self.paused {
            Err(Revert::Forbidden)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
pub struct Controller {
    address: Address,
    owner: Address,
    reward_receivers: Vec<RewardReceiver>,
    fee_collectors: Vec<Arc<dyn FeeCollector>>,
    exchange_adapter: Arc<dyn ExchangeAdapter>,
    fee_conversion_incentive: U256,
    reward_token: Address,
    paused: bool,
}

impl Controller {
    /// Deploy a controller owned by `deployer`
    pub fn new(address: Address, deployer: Address, params: ControllerParams) -> Self {
        info!(
            controller = ?address,
            owner = ?deployer,
            receivers = params.reward_receivers.len(),
            collectors = params.fee_collectors.len(),
            "controller deployed"
        );
        Self {
            address,
            owner: deployer,
            reward_receivers: params.reward_receivers,
            fee_collectors: params.fee_collectors,
            exchange_adapter: params.exchange_adapter,
            fee_conversion_incentive: params.fee_conversion_incentive,
            reward_token: params.reward_token,
            paused: false,
        }
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(RwLock::new(self))
    }

    fn only_owner(&self, ctx: &CallContext) -> Result<(), Revert> {
        if ctx.sender == self.owner {
            Ok(())
        } else {
            Err(Revert::Unauthorized { caller: ctx.sender })
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn get_reward_receivers(&self) -> &[RewardReceiver] {
        &self.reward_receivers
    }

    pub fn get_fee_collectors(&self) -> Vec<Address> {
        self.fee_collectors.iter().map(|c| c.address()).collect()
    }

    pub fn exchange_adapter(&self) -> Address {
        self.exchange_adapter.address()
    }

    pub fn fee_conversion_incentive(&self) -> U256 {
        self.fee_conversion_incentive
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            reward_receivers: self.reward_receivers.clone(),
            fee_collectors: self.fee_collectors.clone(),
            exchange_adapter: Arc::clone(&self.exchange_adapter),
            fee_conversion_incentive: self.fee_conversion_incentive,
            reward_token: self.reward_token,
            paused: self.paused,
        }
    }

    // ---------------------------------------------------------------------
    // Owner operations
    // ---------------------------------------------------------------------

    pub fn set_reward_receivers(
        &mut self,
        ctx: &CallContext,
        receivers: Vec<RewardReceiver>,
    ) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        info!(controller = ?self.address, count = receivers.len(), "reward receivers replaced");
        self.reward_receivers = receivers;
        Ok(())
    }

    pub fn set_fee_collectors(
        &mut self,
        ctx: &CallContext,
        collectors: Vec<Arc<dyn FeeCollector>>,
    ) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        info!(controller = ?self.address, count = collectors.len(), "fee collectors replaced");
        self.fee_collectors = collectors;
        Ok(())
    }

    pub fn set_fee_conversion_incentive(
        &mut self,
        ctx: &CallContext,
        incentive: U256,
    ) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        info!(controller = ?self.address, %incentive, "conversion incentive updated");
        self.fee_conversion_incentive = incentive;
        Ok(())
    }

    pub fn set_reward_token(&mut self, ctx: &CallContext, token: Address) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        info!(controller = ?self.address, token = ?token, "reward token updated");
        self.reward_token = token;
        Ok(())
    }

    pub fn set_exchange_adapter(
        &mut self,
        ctx: &CallContext,
        adapter: Arc<dyn ExchangeAdapter>,
    ) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        info!(controller = ?self.address, adapter = ?adapter.address(), "exchange adapter updated");
        self.exchange_adapter = adapter;
        Ok(())
    }

    pub fn pause(&mut self, ctx: &CallContext) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        if self.paused {
            return Err(Revert::AlreadyPaused);
        }
        self.paused = true;
        info!(controller = ?self.address, "⏸️ distribution paused");
        Ok(())
    }

    pub fn unpause(&mut self, ctx: &CallContext) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        if !self.paused {
            return Err(Revert::NotPaused);
        }
        self.paused = false;
        info!(controller = ?self.address, "▶️ distribution resumed");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<(), Revert> {
        self.only_owner(ctx)?;
        info!(controller = ?self.address, previous = ?self.owner, owner = ?new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange_adapter::BatchSwap;
    use crate::fee_collector::WrappedNativeFeeCollector;
    use feeflow_ledger::Chain;
    use feeflow_types::WAD;

    #[derive(Debug)]
    struct NullAdapter(Address);

    impl ExchangeAdapter for NullAdapter {
        fn address(&self) -> Address {
            self.0
        }

        fn output_token(&self) -> Address {
            Address::zero()
        }

        fn swap(
            &self,
            _chain: &mut Chain,
            _ctx: &CallContext,
            _input_token: Address,
            _amount: U256,
            _min_output: U256,
            _recipient: Address,
        ) -> Result<U256, Revert> {
            Ok(U256::zero())
        }

        fn batch_swap(
            &self,
            _chain: &mut Chain,
            _ctx: &CallContext,
            _request: &BatchSwap,
        ) -> Result<U256, Revert> {
            Ok(U256::zero())
        }
    }

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn controller() -> Controller {
        Controller::new(
            addr(0xcc),
            addr(1),
            ControllerParams {
                reward_receivers: vec![
                    RewardReceiver::new(addr(0x11), U256::from(40u64) * WAD),
                    RewardReceiver::new(addr(0x12), U256::from(60u64) * WAD),
                ],
                fee_collectors: vec![],
                exchange_adapter: Arc::new(NullAdapter(addr(0xad))),
                fee_conversion_incentive: WAD,
                reward_token: addr(0x100),
            },
        )
    }

    #[test]
    fn test_deployment_state() {
        let controller = controller();
        assert_eq!(controller.owner(), addr(1));
        assert_eq!(controller.get_reward_receivers().len(), 2);
        assert!(controller.get_fee_collectors().is_empty());
        assert_eq!(controller.exchange_adapter(), addr(0xad));
        assert_eq!(controller.fee_conversion_incentive(), WAD);
        assert_eq!(controller.reward_token(), addr(0x100));
        assert!(!controller.paused());
    }

    #[test]
    fn test_setters_require_owner() {
        let mut controller = controller();
        let stranger = CallContext::external(addr(2));
        let unauthorized = Revert::Unauthorized { caller: addr(2) };

        assert_eq!(controller.set_reward_receivers(&stranger, vec![]), Err(unauthorized.clone()));
        assert_eq!(controller.set_fee_collectors(&stranger, vec![]), Err(unauthorized.clone()));
        assert_eq!(
            controller.set_fee_conversion_incentive(&stranger, U256::zero()),
            Err(unauthorized.clone())
        );
        assert_eq!(controller.set_reward_token(&stranger, addr(5)), Err(unauthorized.clone()));
        assert_eq!(
            controller.set_exchange_adapter(&stranger, Arc::new(NullAdapter(addr(6)))),
            Err(unauthorized.clone())
        );
        assert_eq!(controller.pause(&stranger), Err(unauthorized.clone()));
        assert_eq!(controller.unpause(&stranger), Err(unauthorized.clone()));
        assert_eq!(controller.transfer_ownership(&stranger, addr(2)), Err(unauthorized));
        assert_eq!(controller.get_reward_receivers().len(), 2);
    }

    #[test]
    fn test_setters_replace_whole_lists() {
        let mut controller = controller();
        let owner = CallContext::external(addr(1));
        controller
            .set_reward_receivers(&owner, vec![RewardReceiver::new(addr(0x13), WAD)])
            .unwrap();
        assert_eq!(
            controller.get_reward_receivers(),
            &[RewardReceiver::new(addr(0x13), WAD)]
        );

        let collector = WrappedNativeFeeCollector::new(addr(0xf01), addr(0xeeee), addr(0xc0));
        controller
            .set_fee_collectors(&owner, vec![Arc::new(collector) as Arc<dyn FeeCollector>])
            .unwrap();
        assert_eq!(controller.get_fee_collectors(), vec![addr(0xf01)]);

        controller
            .set_exchange_adapter(&owner, Arc::new(NullAdapter(addr(0xae))))
            .unwrap();
        assert_eq!(controller.exchange_adapter(), addr(0xae));
    }

    #[test]
    fn test_pause_cycle() {
        let mut controller = controller();
        let owner = CallContext::external(addr(1));

        assert_eq!(controller.unpause(&owner), Err(Revert::NotPaused));
        controller.pause(&owner).unwrap();
        assert!(controller.paused());
        assert_eq!(controller.snapshot().ensure_active(), Err(Revert::Forbidden));
        assert_eq!(controller.pause(&owner), Err(Revert::AlreadyPaused));
        // Reads stay available while paused
        assert_eq!(controller.get_reward_receivers().len(), 2);
        controller.unpause(&owner).unwrap();
        assert!(controller.snapshot().ensure_active().is_ok());
    }

    #[test]
    fn test_ownership_transfer() {
        let mut controller = controller();
        controller
            .transfer_ownership(&CallContext::external(addr(1)), addr(2))
            .unwrap();
        assert_eq!(controller.owner(), addr(2));
        assert!(controller.pause(&CallContext::external(addr(1))).is_err());
        controller.pause(&CallContext::external(addr(2))).unwrap();
    }
}
