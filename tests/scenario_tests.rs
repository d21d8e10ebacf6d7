//! End-to-end keeper scenarios: the check/execute protocol across all four
//! order flavors, the stop-limit cascade, the cancellation race, access
//! control, pause behavior, and the order-size / pending-cap policy.

use rust_decimal_macros::dec;
use trigger_core::*;

const OWNER: Address = Address(1);
const BOB: Address = Address(2);
const CHARLES: Address = Address(4);
const FILLER: Address = Address(5);
const MASTER_ADDR: Address = Address(100);
const LIMIT_ESCROW: Address = Address(101);
const STOP_LIMIT_ESCROW: Address = Address(102);
const BRACKET_ESCROW: Address = Address(103);
const ORACLE_LESS_ESCROW: Address = Address(104);
const ROUTER: Address = Address(200);
const WETH: Address = Address(301);
const USDC: Address = Address(302);

const ONE_WETH: u128 = 1_000_000_000_000_000_000;

struct Harness {
    master: AutomationMaster,
    ledger: Ledger,
    router: MockRouter,
    weth_price: PriceHandle,
}

fn harness() -> Harness {
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
    master
        .whitelist_oracle_less_tokens(OWNER, &[WETH, USDC], true)
        .unwrap();

    let mut router = MockRouter::new(ROUTER);
    router.set_quote(WETH, USDC, dec!(3000));
    router.set_quote(USDC, WETH, dec!(0.00033333));
    ledger.mint(USDC, ROUTER, 10_000_000_000_000).unwrap();
    ledger.mint(WETH, ROUTER, 1_000 * ONE_WETH).unwrap();

    for user in [BOB, CHARLES] {
        ledger.mint(WETH, user, 100 * ONE_WETH).unwrap();
        ledger.mint(USDC, user, 1_000_000_000_000).unwrap();
        for escrow in [LIMIT_ESCROW, STOP_LIMIT_ESCROW, BRACKET_ESCROW, ORACLE_LESS_ESCROW] {
            ledger.approve(WETH, user, escrow, u128::MAX);
            ledger.approve(USDC, user, escrow, u128::MAX);
        }
    }

    Harness { master, ledger, router, weth_price }
}

fn limit_req(recipient: Address, strike: rust_decimal::Decimal, amount: u128) -> LimitOrderRequest {
    LimitOrderRequest {
        strike,
        amount_in: amount,
        token_in: WETH,
        token_out: USDC,
        recipient,
        slippage: Bps::new(100),
    }
}

fn stop_limit_req(recipient: Address) -> StopLimitOrderRequest {
    StopLimitOrderRequest {
        stop: dec!(2800),
        take_profit: dec!(3100),
        stop_loss: dec!(2500),
        amount_in: ONE_WETH,
        token_in: WETH,
        token_out: USDC,
        recipient,
        take_profit_slippage: Bps::new(100),
        stop_slippage: Bps::new(500),
        swap_on_fill: false,
        swap_slippage: Bps::new(0),
    }
}

fn keeper_instruction(h: &Harness, descriptor: &UpkeepDescriptor) -> SwapInstruction {
    let min_out = min_amount_received(
        h.master.oracles(),
        &h.ledger,
        descriptor.amount_in,
        descriptor.token_in,
        descriptor.token_out,
        descriptor.slippage,
    )
    .unwrap();
    SwapInstruction {
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
    }
}

fn keeper_run(h: &mut Harness) -> Option<UpkeepOutcome> {
    let bytes = h.master.check_upkeep().unwrap()?;
    let descriptor = UpkeepDescriptor::decode(&bytes).unwrap();
    let instruction = keeper_instruction(h, &descriptor);
    let outcome = h
        .master
        .perform_upkeep(&mut h.ledger, &mut h.router, &bytes, &instruction)
        .unwrap();
    Some(outcome)
}

#[test]
fn limit_order_happy_path() {
    let mut h = harness();

    let id = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();
    assert_eq!(id, OrderId(1));
    assert_eq!(h.master.pending_orders(OrderFlavor::Limit).len(), 1);
    assert_eq!(h.ledger.balance_of(WETH, LIMIT_ESCROW), ONE_WETH);

    // no upkeep above the strike
    assert!(h.master.check_upkeep().unwrap().is_none());

    h.weth_price.set(dec!(2890));
    h.router.set_quote(WETH, USDC, dec!(2890));
    let outcome = keeper_run(&mut h).expect("strike crossed");
    assert!(matches!(outcome, UpkeepOutcome::Filled { order_id, .. } if order_id == id));

    // proceeds with the user, nothing left behind, nothing more to do
    assert_eq!(h.ledger.balance_of(USDC, BOB), 1_000_000_000_000 + 2_890_000_000);
    assert_eq!(h.ledger.balance_of(WETH, LIMIT_ESCROW), 0);
    assert_eq!(h.ledger.balance_of(USDC, LIMIT_ESCROW), 0);
    assert!(h.master.pending_orders(OrderFlavor::Limit).is_empty());
    assert!(h.master.check_upkeep().unwrap().is_none());

    let processed = h.master.events().iter().any(|e| {
        matches!(
            &e.payload,
            EventPayload::OrderProcessed(p) if p.order_id == id && p.success
        )
    });
    assert!(processed, "fill event emitted");
}

#[test]
fn stop_limit_spawns_bracket_holding_same_deposit() {
    let mut h = harness();

    let parent = h.master
        .create_stop_limit_order(&mut h.ledger, BOB, 0, stop_limit_req(BOB))
        .unwrap();
    assert!(h.master.check_upkeep().unwrap().is_none());

    // drive the price down through the stop
    h.weth_price.set(dec!(2790));
    let outcome = keeper_run(&mut h).expect("stop crossed");
    let UpkeepOutcome::Spawned { order_id, bracket_order_id, amount_in } = outcome else {
        panic!("expected a spawn, got {outcome:?}");
    };
    assert_eq!(order_id, parent);
    assert_eq!(amount_in, ONE_WETH);

    // parent gone, child pending with the same deposit in the bracket escrow
    assert!(h.master.pending_orders(OrderFlavor::StopLimit).is_empty());
    assert_eq!(h.master.pending_orders(OrderFlavor::Bracket), &[bracket_order_id]);
    assert_eq!(h.ledger.balance_of(WETH, STOP_LIMIT_ESCROW), 0);
    assert_eq!(h.ledger.balance_of(WETH, BRACKET_ESCROW), ONE_WETH);

    let child = h.master.registry(OrderFlavor::Bracket).unwrap().get(bracket_order_id).unwrap();
    assert_eq!(child.recipient, BOB);
    assert_eq!((child.token_in, child.token_out), (WETH, USDC));

    // the bracket then fills on its take-profit leg
    h.weth_price.set(dec!(3150));
    h.router.set_quote(WETH, USDC, dec!(3150));
    let outcome = keeper_run(&mut h).expect("take profit crossed");
    assert!(matches!(outcome, UpkeepOutcome::Filled { order_id, .. } if order_id == bracket_order_id));
    assert!(h.master.pending_orders(OrderFlavor::Bracket).is_empty());
}

#[test]
fn bracket_stop_loss_leg_uses_its_own_slippage() {
    let mut h = harness();

    h.master
        .create_bracket_order(
            &mut h.ledger, BOB, 0,
            BracketOrderRequest {
                take_profit: dec!(3100),
                stop_loss: dec!(2900),
                amount_in: ONE_WETH,
                token_in: WETH,
                token_out: USDC,
                recipient: BOB,
                take_profit_slippage: Bps::new(100),
                stop_slippage: Bps::new(800),
            },
        )
        .unwrap();

    // crash through the stop-loss; the loose stop slippage still fills
    h.weth_price.set(dec!(2850));
    h.router.set_quote(WETH, USDC, dec!(2700));

    let bytes = h.master.check_upkeep().unwrap().unwrap();
    let descriptor = UpkeepDescriptor::decode(&bytes).unwrap();
    assert_eq!(descriptor.slippage, Bps::new(800));

    let instruction = keeper_instruction(&h, &descriptor);
    let outcome = h.master
        .perform_upkeep(&mut h.ledger, &mut h.router, &bytes, &instruction)
        .unwrap();
    // 2700 >= 2850 * (1 - 8%) so the stop leg tolerates the bad market
    assert!(matches!(outcome, UpkeepOutcome::Filled { .. }));
}

#[test]
fn stop_limit_swap_on_fill_spawns_reverse_pair_bracket() {
    let mut h = harness();

    let mut req = stop_limit_req(BOB);
    req.swap_on_fill = true;
    req.swap_slippage = Bps::new(500);
    // thresholds priced on the child's USDC/WETH pair
    req.take_profit = dec!(0.00040000);
    req.stop_loss = dec!(0.00025000);
    let parent = h.master
        .create_stop_limit_order(&mut h.ledger, BOB, 0, req)
        .unwrap();

    h.weth_price.set(dec!(2790));
    h.router.set_quote(WETH, USDC, dec!(2790));
    let outcome = keeper_run(&mut h).expect("stop crossed");
    let UpkeepOutcome::Spawned { order_id, bracket_order_id, amount_in } = outcome else {
        panic!("expected a spawn, got {outcome:?}");
    };
    assert_eq!(order_id, parent);
    assert_eq!(amount_in, 2_790_000_000);

    // the child escrows the swapped USDC and runs on the reverse pair
    let child = h.master.registry(OrderFlavor::Bracket).unwrap().get(bracket_order_id).unwrap();
    assert_eq!((child.token_in, child.token_out), (USDC, WETH));
    assert_eq!(h.ledger.balance_of(USDC, BRACKET_ESCROW), 2_790_000_000);
    assert_eq!(h.ledger.balance_of(WETH, STOP_LIMIT_ESCROW), 0);
}

#[test]
fn bracket_create_with_swap_escrows_the_swap_output() {
    let mut h = harness();

    let deposit: u128 = 3_000_000_000; // 3000 USDC
    let min_weth = min_amount_received(
        h.master.oracles(), &h.ledger, deposit, USDC, WETH, Bps::new(500),
    )
    .unwrap();

    let instruction = SwapInstruction {
        target: ROUTER,
        calldata: RouterCall {
            token_in: USDC,
            token_out: WETH,
            amount_in: deposit,
            amount_out_min: min_weth,
            recipient: BRACKET_ESCROW,
        }
        .encode(),
        min_amount_out: min_weth,
    };

    let id = h.master
        .create_bracket_order_with_swap(
            &mut h.ledger,
            &mut h.router,
            BOB,
            0,
            SwapOnCreate { token_in: USDC, amount_in: deposit, slippage: Bps::new(500) },
            instruction,
            BracketOrderRequest {
                take_profit: dec!(3100),
                stop_loss: dec!(2500),
                amount_in: 0, // ignored; escrow is the swap output
                token_in: WETH,
                token_out: USDC,
                recipient: BOB,
                take_profit_slippage: Bps::new(100),
                stop_slippage: Bps::new(500),
            },
        )
        .unwrap();

    let order = h.master.registry(OrderFlavor::Bracket).unwrap().get(id).unwrap();
    assert_eq!(order.amount_in, h.ledger.balance_of(WETH, BRACKET_ESCROW));
    assert!(order.amount_in > 0);
    assert_eq!(h.ledger.balance_of(USDC, BRACKET_ESCROW), 0);
}

#[test]
fn oracle_less_direct_fill() {
    let mut h = harness();

    let id = h.master
        .create_oracle_less_order(
            &mut h.ledger, BOB, 0,
            OracleLessOrderRequest {
                token_in: WETH,
                token_out: USDC,
                amount_in: ONE_WETH,
                min_amount_out: 2_950_000_000,
                recipient: BOB,
            },
        )
        .unwrap();

    // never oracle-ready: the keeper scan skips it entirely
    assert!(h.master.check_upkeep().unwrap().is_none());

    // a filler quotes below the order's floor and is rejected
    let low = SwapInstruction {
        target: ROUTER,
        calldata: Vec::new(),
        min_amount_out: 2_900_000_000,
    };
    let err = h.master
        .fill_oracle_less(&mut h.ledger, &mut h.router, 0, id, &low)
        .unwrap_err();
    assert!(matches!(err, MasterError::InsufficientMinOut { required, .. } if required == 2_950_000_000));

    // an honest filler succeeds
    let instruction = SwapInstruction {
        target: ROUTER,
        calldata: RouterCall {
            token_in: WETH,
            token_out: USDC,
            amount_in: ONE_WETH,
            amount_out_min: 2_950_000_000,
            recipient: ORACLE_LESS_ESCROW,
        }
        .encode(),
        min_amount_out: 2_950_000_000,
    };
    let outcome = h.master
        .fill_oracle_less(&mut h.ledger, &mut h.router, 0, id, &instruction)
        .unwrap();
    assert!(matches!(outcome, UpkeepOutcome::Filled { amount_out, .. } if amount_out == 3_000_000_000));
    assert_eq!(h.ledger.balance_of(USDC, BOB), 1_000_000_000_000 + 3_000_000_000);

    // a second attempt at the same slot is stale
    let replay = h.master
        .fill_oracle_less(&mut h.ledger, &mut h.router, 0, id, &instruction)
        .unwrap();
    assert_eq!(replay, UpkeepOutcome::Stale);
}

#[test]
fn oracle_less_requires_whitelisted_tokens() {
    let mut h = harness();
    h.master
        .whitelist_oracle_less_tokens(OWNER, &[USDC], false)
        .unwrap();

    let err = h.master
        .create_oracle_less_order(
            &mut h.ledger, BOB, 0,
            OracleLessOrderRequest {
                token_in: WETH,
                token_out: USDC,
                amount_in: ONE_WETH,
                min_amount_out: 1,
                recipient: BOB,
            },
        )
        .unwrap_err();
    assert_eq!(err, MasterError::TokenNotWhitelisted(USDC));
}

#[test]
fn cancellation_race_does_not_execute_the_wrong_order() {
    let mut h = harness();

    // both orders ready at once so the stale slot still holds a ready order
    let first = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();
    let second = h.master
        .create_limit_order(&mut h.ledger, CHARLES, 0, limit_req(CHARLES, dec!(2950), 2 * ONE_WETH))
        .unwrap();

    h.weth_price.set(dec!(2890));
    h.router.set_quote(WETH, USDC, dec!(2890));

    // keeper snapshots a descriptor for index 0 (first's slot)
    let bytes = h.master.check_upkeep().unwrap().unwrap();
    let descriptor = UpkeepDescriptor::decode(&bytes).unwrap();
    assert_eq!((descriptor.pending_idx, descriptor.order_id), (0, first));
    let instruction = keeper_instruction(&h, &descriptor);

    // bob cancels in between; second's id swaps into slot 0
    h.master.cancel_order(&mut h.ledger, BOB, OrderFlavor::Limit, first).unwrap();
    assert_eq!(h.master.pending_orders(OrderFlavor::Limit), &[second]);

    // the captured descriptor must not execute against the new occupant
    let outcome = h.master
        .perform_upkeep(&mut h.ledger, &mut h.router, &bytes, &instruction)
        .unwrap();
    assert_eq!(outcome, UpkeepOutcome::Stale);
    assert_eq!(h.master.pending_orders(OrderFlavor::Limit), &[second]);
    assert_eq!(h.ledger.balance_of(WETH, LIMIT_ESCROW), 2 * ONE_WETH);

    // a fresh check services the survivor correctly
    let outcome = keeper_run(&mut h).expect("second is ready");
    assert!(matches!(outcome, UpkeepOutcome::Filled { order_id, .. } if order_id == second));
}

#[test]
fn only_recipient_may_cancel_or_modify() {
    let mut h = harness();
    let id = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();

    assert_eq!(
        h.master.cancel_order(&mut h.ledger, CHARLES, OrderFlavor::Limit, id),
        Err(MasterError::OnlyOrderOwner)
    );
    assert_eq!(
        h.master.modify_order(
            &mut h.ledger, CHARLES, OrderFlavor::Limit, id, 0,
            OrderUpdate { strike: Some(dec!(2000)), ..Default::default() },
        ),
        Err(MasterError::OnlyOrderOwner)
    );

    // the owner override works and refunds the recipient, not the owner
    let bob_before = h.ledger.balance_of(WETH, BOB);
    h.master.admin_cancel_order(&mut h.ledger, OWNER, OrderFlavor::Limit, id).unwrap();
    assert_eq!(h.ledger.balance_of(WETH, BOB), bob_before + ONE_WETH);
}

#[test]
fn admin_cancel_requires_owner() {
    let mut h = harness();
    let id = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();
    assert_eq!(
        h.master.admin_cancel_order(&mut h.ledger, CHARLES, OrderFlavor::Limit, id),
        Err(MasterError::NotOwner)
    );
}

#[test]
fn pause_blocks_entry_points_but_not_exits() {
    let mut h = harness();
    let id = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();

    h.weth_price.set(dec!(2890));
    let bytes = h.master.check_upkeep().unwrap().unwrap();
    let descriptor = UpkeepDescriptor::decode(&bytes).unwrap();
    let instruction = keeper_instruction(&h, &descriptor);

    h.master.pause_all(OWNER, true).unwrap();

    // predicate goes quiet, create and execute are rejected
    assert!(h.master.check_upkeep().unwrap().is_none());
    assert_eq!(
        h.master.create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2000), ONE_WETH)),
        Err(MasterError::Paused)
    );
    assert_eq!(
        h.master.perform_upkeep(&mut h.ledger, &mut h.router, &bytes, &instruction),
        Err(MasterError::Paused)
    );

    // users can still get out
    h.master.cancel_order(&mut h.ledger, BOB, OrderFlavor::Limit, id).unwrap();
    assert_eq!(h.ledger.balance_of(WETH, LIMIT_ESCROW), 0);

    h.master.pause_all(OWNER, false).unwrap();
    assert!(h.master.check_upkeep().unwrap().is_none());
}

#[test]
fn order_size_floor_is_priced_in_usd() {
    let mut h = harness();
    // 0.001 WETH at $3000 is $3, under the $10 default floor
    let err = h.master
        .create_limit_order(
            &mut h.ledger, BOB, 0,
            limit_req(BOB, dec!(2900), ONE_WETH / 1000),
        )
        .unwrap_err();
    assert!(matches!(err, MasterError::OrderTooSmall { usd, .. } if usd == dec!(3)));

    // 0.01 WETH is $30: fine
    h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH / 100))
        .unwrap();
}

#[test]
fn pending_cap_bounds_the_backlog() {
    let mut h = harness();
    h.master.set_max_pending_orders(OWNER, 2).unwrap();

    h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();
    h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2800), ONE_WETH))
        .unwrap();
    let err = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2700), ONE_WETH))
        .unwrap_err();
    assert_eq!(err, MasterError::MaxPendingOrders { cap: 2 });
}

#[test]
fn modify_rethresholds_and_retriggers() {
    let mut h = harness();
    let id = h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();

    // move the strike above spot: the side flips to a sell-into-strength
    h.master
        .modify_order(
            &mut h.ledger, BOB, OrderFlavor::Limit, id, 0,
            OrderUpdate { strike: Some(dec!(3200)), ..Default::default() },
        )
        .unwrap();

    assert!(h.master.check_upkeep().unwrap().is_none());
    h.weth_price.set(dec!(3250));
    h.router.set_quote(WETH, USDC, dec!(3250));
    let outcome = keeper_run(&mut h).expect("new strike crossed upward");
    assert!(matches!(outcome, UpkeepOutcome::Filled { order_id, .. } if order_id == id));
}

#[test]
fn unwhitelisted_swap_target_is_rejected() {
    let mut h = harness();
    h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();

    h.weth_price.set(dec!(2890));
    h.router.set_quote(WETH, USDC, dec!(2890));
    let bytes = h.master.check_upkeep().unwrap().unwrap();
    let descriptor = UpkeepDescriptor::decode(&bytes).unwrap();

    let instruction = keeper_instruction(&h, &descriptor);
    h.master.whitelist_targets(OWNER, &[ROUTER], false).unwrap();

    let err = h.master
        .perform_upkeep(&mut h.ledger, &mut h.router, &bytes, &instruction)
        .unwrap_err();
    assert_eq!(err, MasterError::Swap(SwapError::TargetNotWhitelisted(ROUTER)));

    // re-whitelisting lets the same instruction through
    h.master.whitelist_targets(OWNER, &[ROUTER], true).unwrap();
    let outcome = h.master
        .perform_upkeep(&mut h.ledger, &mut h.router, &bytes, &instruction)
        .unwrap();
    assert!(matches!(outcome, UpkeepOutcome::Filled { .. }));
}

#[test]
fn deregistered_oracle_fails_the_scan_loudly() {
    let mut h = harness();
    h.master
        .create_limit_order(&mut h.ledger, BOB, 0, limit_req(BOB, dec!(2900), ONE_WETH))
        .unwrap();

    h.master.deregister_oracle(OWNER, USDC).unwrap();
    let err = h.master.check_upkeep().unwrap_err();
    assert_eq!(
        err,
        MasterError::Rate(RateError::Oracle(OracleError::OracleNotRegistered(USDC)))
    );
}

#[test]
fn filler_identity_is_irrelevant_for_oracle_less() {
    let mut h = harness();
    h.ledger.mint(WETH, FILLER, ONE_WETH).unwrap();

    let id = h.master
        .create_oracle_less_order(
            &mut h.ledger, BOB, 0,
            OracleLessOrderRequest {
                token_in: WETH,
                token_out: USDC,
                amount_in: ONE_WETH,
                min_amount_out: 2_900_000_000,
                recipient: BOB,
            },
        )
        .unwrap();

    // stale index from a racing filler no-ops
    let instruction = SwapInstruction {
        target: ROUTER,
        calldata: RouterCall {
            token_in: WETH,
            token_out: USDC,
            amount_in: ONE_WETH,
            amount_out_min: 2_900_000_000,
            recipient: ORACLE_LESS_ESCROW,
        }
        .encode(),
        min_amount_out: 2_900_000_000,
    };
    let stale = h.master
        .fill_oracle_less(&mut h.ledger, &mut h.router, 5, id, &instruction)
        .unwrap();
    assert_eq!(stale, UpkeepOutcome::Stale);

    let outcome = h.master
        .fill_oracle_less(&mut h.ledger, &mut h.router, 0, id, &instruction)
        .unwrap();
    assert!(matches!(outcome, UpkeepOutcome::Filled { .. }));
}
