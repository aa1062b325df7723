//! Router integration: multi-hop swaps and proportional liquidity

use feeflow_amm::{
    ConstantProductRouter, Exchange, LiquidityRequest, V2Math, MINIMUM_LIQUIDITY, NO_DEADLINE,
};
use feeflow_ledger::{Chain, TokenSpec};
use feeflow_types::{Address, CallContext, U256};

const WETH: u64 = 0xeeee;
const METRIC: u64 = 0x100;
const USDC: u64 = 0x200;
const SEEDER: u64 = 0x50;

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn units(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

fn seed(
    chain: &mut Chain,
    router: &ConstantProductRouter,
    token_a: Address,
    amount_a: U256,
    token_b: Address,
    amount_b: U256,
) {
    let seeder = addr(SEEDER);
    for (token, amount) in [(token_a, amount_a), (token_b, amount_b)] {
        if token == chain.wrapped_native() {
            chain.fund_native(seeder, amount).unwrap();
            chain.wrap_native(seeder, amount).unwrap();
        } else {
            chain.mint(token, seeder, seeder, amount).unwrap();
        }
        chain.approve(token, seeder, router.address(), U256::MAX).unwrap();
    }
    router
        .add_liquidity(
            chain,
            &CallContext::external(seeder),
            LiquidityRequest {
                token_a,
                token_b,
                amount_a_desired: amount_a,
                amount_b_desired: amount_b,
                amount_a_min: U256::zero(),
                amount_b_min: U256::zero(),
                to: seeder,
            },
        )
        .unwrap();
}

fn world() -> (Chain, ConstantProductRouter) {
    let mut chain = Chain::new(addr(WETH));
    let mut router = ConstantProductRouter::new(addr(0xa0));
    chain
        .create_token(addr(METRIC), TokenSpec::open("Metric", "METRIC"))
        .unwrap();
    chain
        .create_token(addr(USDC), TokenSpec::open("USD Coin", "USDC"))
        .unwrap();
    router
        .create_pair(&mut chain, addr(METRIC), addr(WETH), addr(0x301), 30)
        .unwrap();
    router
        .create_pair(&mut chain, addr(USDC), addr(WETH), addr(0x302), 30)
        .unwrap();
    seed(&mut chain, &router, addr(METRIC), units(40_000), addr(WETH), units(10));
    seed(&mut chain, &router, addr(USDC), units(20_000), addr(WETH), units(10));
    (chain, router)
}

#[test]
fn test_two_hop_swap_through_wrapped_native() {
    let (mut chain, router) = world();
    let trader = addr(7);
    let path = [addr(USDC), addr(WETH), addr(METRIC)];
    chain.mint(addr(USDC), trader, trader, units(200)).unwrap();
    chain
        .approve(addr(USDC), trader, router.address(), units(200))
        .unwrap();

    let amounts = router
        .swap_exact_tokens_for_tokens(
            &mut chain,
            &CallContext::external(trader),
            units(200),
            U256::zero(),
            &path,
            trader,
            NO_DEADLINE,
        )
        .unwrap();

    assert_eq!(amounts.len(), 3);
    assert_eq!(chain.balance_of(addr(METRIC), trader), amounts[2]);
    // Intermediate WETH never rests with the trader or the router
    assert!(chain.balance_of(addr(WETH), trader).is_zero());
    assert!(chain.balance_of(addr(WETH), router.address()).is_zero());
    // The second pair received exactly the first hop's output
    assert_eq!(
        chain.balance_of(addr(WETH), addr(0x301)),
        units(10) + amounts[1]
    );
}

#[test]
fn test_second_deposit_is_proportional() {
    let (mut chain, router) = world();
    let lp = addr(0x301);
    let supply_before = chain.total_supply(lp);
    let provider = addr(9);

    chain.mint(addr(METRIC), provider, provider, units(4_000)).unwrap();
    chain.fund_native(provider, units(5)).unwrap();
    chain.wrap_native(provider, units(5)).unwrap();
    chain.approve(addr(METRIC), provider, router.address(), U256::MAX).unwrap();
    chain.approve(addr(WETH), provider, router.address(), U256::MAX).unwrap();

    let receipt = router
        .add_liquidity(
            &mut chain,
            &CallContext::external(provider),
            LiquidityRequest {
                token_a: addr(METRIC),
                token_b: addr(WETH),
                amount_a_desired: units(4_000),
                amount_b_desired: units(5),
                amount_a_min: U256::zero(),
                amount_b_min: U256::zero(),
                to: provider,
            },
        )
        .unwrap();

    // Ratio 4000:1 caps the WETH leg at 1 unit
    assert_eq!(receipt.amount_a, units(4_000));
    assert_eq!(receipt.amount_b, units(1));
    assert_eq!(chain.balance_of(addr(WETH), provider), units(4));
    assert_eq!(receipt.liquidity, supply_before / 10);
    assert_eq!(chain.balance_of(lp, provider), receipt.liquidity);
    assert_eq!(
        chain.balance_of(lp, Address::zero()),
        U256::from(MINIMUM_LIQUIDITY)
    );
}

#[test]
fn test_quoted_zap_fits_the_pool() {
    let (chain, router) = world();
    let (reserve_in, reserve_out) = router
        .get_reserves(&chain, addr(METRIC), addr(WETH))
        .unwrap();
    let amount = units(1_000);
    let swap = V2Math::optimal_zap_amount(amount, reserve_in, 30).unwrap();
    let out = V2Math::get_amount_out(swap, reserve_in, reserve_out, 30).unwrap();

    let quoted = V2Math::quote(
        amount - swap,
        reserve_in + swap,
        reserve_out - out,
    )
    .unwrap();
    // Proceeds cover the remaining leg to within rounding
    assert!(quoted <= out + U256::from(1_000u64));
    assert!(out <= quoted + U256::from(1_000u64));
}
