//! Conditional Order Automation Simulation.
//!
//! Walks the full keeper lifecycle: order creation, the trigger predicate,
//! execution through a mock router, a stop-limit spawning a bracket order,
//! and the refund path when a swap goes bad.

use rust_decimal_macros::dec;
use trigger_core::*;

const OWNER: Address = Address(1);
const BOB: Address = Address(2);
const MASTER_ADDR: Address = Address(100);
const LIMIT_ESCROW: Address = Address(101);
const STOP_LIMIT_ESCROW: Address = Address(102);
const BRACKET_ESCROW: Address = Address(103);
const ORACLE_LESS_ESCROW: Address = Address(104);
const ROUTER: Address = Address(200);
const WETH: Address = Address(301);
const USDC: Address = Address(302);

const ONE_WETH: u128 = 1_000_000_000_000_000_000;

fn main() {
    println!("Conditional Order Automation Engine Simulation");
    println!("Limit fill, stop-limit cascade, failed-fill refund\n");

    scenario_1_limit_fill();
    scenario_2_stop_limit_cascade();
    scenario_3_failed_fill_refund();

    println!("\nAll simulations completed successfully.");
}

struct World {
    master: AutomationMaster,
    ledger: Ledger,
    router: MockRouter,
    weth_price: PriceHandle,
}

fn setup() -> World {
    let mut ledger = Ledger::new();
    ledger.register_token(WETH, "WETH", 18);
    ledger.register_token(USDC, "USDC", 6);

    let mut master = AutomationMaster::new(MASTER_ADDR, OWNER, MasterConfig::default());
    master.register_registry(OWNER, OrderFlavor::StopLimit, STOP_LIMIT_ESCROW).unwrap();
    master.register_registry(OWNER, OrderFlavor::Bracket, BRACKET_ESCROW).unwrap();
    master.register_registry(OWNER, OrderFlavor::Limit, LIMIT_ESCROW).unwrap();
    master.register_registry(OWNER, OrderFlavor::OracleLess, ORACLE_LESS_ESCROW).unwrap();

    let (weth_oracle, weth_price) = PlaceholderOracle::new(dec!(3000));
    let (usdc_oracle, _) = PlaceholderOracle::new(dec!(1));
    master.register_oracle(OWNER, WETH, Box::new(weth_oracle)).unwrap();
    master.register_oracle(OWNER, USDC, Box::new(usdc_oracle)).unwrap();
    master.whitelist_targets(OWNER, &[ROUTER], true).unwrap();

    let mut router = MockRouter::new(ROUTER);
    router.set_quote(WETH, USDC, dec!(3000));
    router.set_quote(USDC, WETH, dec!(0.000333));
    ledger.mint(USDC, ROUTER, 1_000_000_000_000).unwrap();
    ledger.mint(WETH, ROUTER, 1_000 * ONE_WETH).unwrap();

    // Bob funds
    ledger.mint(WETH, BOB, 10 * ONE_WETH).unwrap();

    World { master, ledger, router, weth_price }
}

fn keeper_run(world: &mut World) -> Option<UpkeepOutcome> {
    let descriptor_bytes = world.master.check_upkeep().unwrap()?;
    let descriptor = UpkeepDescriptor::decode(&descriptor_bytes).unwrap();

    let min_out = min_amount_received(
        world.master.oracles(),
        &world.ledger,
        descriptor.amount_in,
        descriptor.token_in,
        descriptor.token_out,
        descriptor.slippage,
    )
    .unwrap();

    let instruction = SwapInstruction {
        target: ROUTER,
        calldata: RouterCall {
            token_in: descriptor.token_in,
            token_out: descriptor.token_out,
            amount_in: descriptor.amount_in,
            amount_out_min: min_out,
            recipient: descriptor.registry,
        }
        .encode(),
        min_amount_out: min_out,
    };

    let outcome = world
        .master
        .perform_upkeep(&mut world.ledger, &mut world.router, &descriptor_bytes, &instruction)
        .unwrap();
    Some(outcome)
}

/// A limit order rides the price down to its strike and fills.
fn scenario_1_limit_fill() {
    println!("Scenario 1: Limit Order Fill\n");
    let mut world = setup();

    world.ledger.approve(WETH, BOB, LIMIT_ESCROW, ONE_WETH);
    let order_id = world
        .master
        .create_limit_order(
            &mut world.ledger,
            BOB,
            0,
            LimitOrderRequest {
                strike: dec!(2900),
                amount_in: ONE_WETH,
                token_in: WETH,
                token_out: USDC,
                recipient: BOB,
                slippage: Bps::new(100),
            },
        )
        .unwrap();
    println!("  Bob escrows 1 WETH, sell at 2900 (spot 3000), order {order_id}");

    assert!(world.master.check_upkeep().unwrap().is_none());
    println!("  Keeper polls: nothing to do at 3000");

    world.weth_price.set(dec!(2890));
    world.router.set_quote(WETH, USDC, dec!(2890));
    println!("  Price drops to 2890, strike crossed");

    let outcome = keeper_run(&mut world).expect("order should be ready");
    println!("  Keeper executes: {outcome:?}");

    println!(
        "  Bob's USDC: {}, pending orders left: {}\n",
        world.ledger.balance_of(USDC, BOB),
        world.master.pending_orders(OrderFlavor::Limit).len()
    );
}

/// A stop-limit crosses its stop and spawns a bracket order, which later
/// fills on its take-profit leg.
fn scenario_2_stop_limit_cascade() {
    println!("Scenario 2: Stop-Limit -> Bracket Cascade\n");
    let mut world = setup();

    world.ledger.approve(WETH, BOB, STOP_LIMIT_ESCROW, ONE_WETH);
    let order_id = world
        .master
        .create_stop_limit_order(
            &mut world.ledger,
            BOB,
            0,
            StopLimitOrderRequest {
                stop: dec!(2800),
                take_profit: dec!(3100),
                stop_loss: dec!(2500),
                amount_in: ONE_WETH,
                token_in: WETH,
                token_out: USDC,
                recipient: BOB,
                take_profit_slippage: Bps::new(100),
                stop_slippage: Bps::new(500),
                swap_on_fill: false,
                swap_slippage: Bps::new(0),
            },
        )
        .unwrap();
    println!("  Bob's stop-limit {order_id}: stop 2800, bracket 3100/2500");

    world.weth_price.set(dec!(2790));
    let outcome = keeper_run(&mut world).expect("stop should be crossed");
    println!("  Price 2790 crosses the stop: {outcome:?}");
    println!(
        "  Stop-limit pending: {}, bracket pending: {}",
        world.master.pending_orders(OrderFlavor::StopLimit).len(),
        world.master.pending_orders(OrderFlavor::Bracket).len()
    );

    world.weth_price.set(dec!(3150));
    world.router.set_quote(WETH, USDC, dec!(3150));
    let outcome = keeper_run(&mut world).expect("take profit should be crossed");
    println!("  Price 3150 crosses the bracket take-profit: {outcome:?}");
    println!("  Bob's USDC: {}\n", world.ledger.balance_of(USDC, BOB));
}

/// The router under-delivers; the order terminates with a full refund and the
/// keeper's call still succeeds.
fn scenario_3_failed_fill_refund() {
    println!("Scenario 3: Failed Fill Refund\n");
    let mut world = setup();

    world.ledger.approve(WETH, BOB, LIMIT_ESCROW, ONE_WETH);
    world
        .master
        .create_limit_order(
            &mut world.ledger,
            BOB,
            0,
            LimitOrderRequest {
                strike: dec!(2900),
                amount_in: ONE_WETH,
                token_in: WETH,
                token_out: USDC,
                recipient: BOB,
                slippage: Bps::new(100),
            },
        )
        .unwrap();
    let weth_before = world.ledger.balance_of(WETH, BOB);

    // oracle says 2890 but the router's market is far worse
    world.weth_price.set(dec!(2890));
    world.router.set_quote(WETH, USDC, dec!(2500));
    println!("  Strike crossed at 2890, but the router only pays 2500");

    let outcome = keeper_run(&mut world).expect("order should be ready");
    println!("  Keeper executes: {outcome:?}");

    assert!(matches!(outcome, UpkeepOutcome::FillFailed { .. }));
    println!(
        "  Bob's WETH back: {} -> {}, pending left: {}",
        weth_before,
        world.ledger.balance_of(WETH, BOB),
        world.master.pending_orders(OrderFlavor::Limit).len()
    );
}
