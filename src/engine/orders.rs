//! Order entry points: create, cancel, modify.
//!
//! All four flavors funnel through the same validation battery: pause flags,
//! exact creation fee, nonzero amount, slippage bounds, the per-registry
//! pending cap, and the USD order-size floor (token whitelist instead for
//! oracle-less orders, which never consult an oracle). Deposits are pulled
//! into the flavor registry's escrow address via allowance.

use rust_decimal::Decimal;

use super::core::AutomationMaster;
use super::results::MasterError;
use crate::events::{
    EventPayload, FeeCollectedEvent, OrderCancelledEvent, OrderCreatedEvent, OrderModifiedEvent,
};
use crate::ledger::Ledger;
use crate::order::{OrderKind, TriggerSide};
use crate::rate::{exchange_rate, min_amount_received, usd_value};
use crate::swap::{execute_swap, SwapInstruction, SwapVenue};
use crate::types::{Address, Bps, OrderFlavor, OrderId};

#[derive(Debug, Clone)]
pub struct LimitOrderRequest {
    pub strike: Decimal,
    pub amount_in: u128,
    pub token_in: Address,
    pub token_out: Address,
    pub recipient: Address,
    pub slippage: Bps,
}

#[derive(Debug, Clone)]
pub struct StopLimitOrderRequest {
    pub stop: Decimal,
    /// Thresholds for the bracket order spawned when the stop crosses,
    /// priced on the bracket's own pair.
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    pub amount_in: u128,
    pub token_in: Address,
    pub token_out: Address,
    pub recipient: Address,
    pub take_profit_slippage: Bps,
    pub stop_slippage: Bps,
    /// Convert the deposit into `token_out` when the stop crosses; the
    /// spawned bracket then runs on the reverse pair.
    pub swap_on_fill: bool,
    pub swap_slippage: Bps,
}

#[derive(Debug, Clone)]
pub struct BracketOrderRequest {
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    /// Ignored by `create_bracket_order_with_swap`, where the escrowed amount
    /// is whatever the creation-time swap delivers.
    pub amount_in: u128,
    pub token_in: Address,
    pub token_out: Address,
    pub recipient: Address,
    pub take_profit_slippage: Bps,
    pub stop_slippage: Bps,
}

#[derive(Debug, Clone)]
pub struct OracleLessOrderRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: u128,
    pub min_amount_out: u128,
    pub recipient: Address,
}

/// Creation-time swap leg: the caller deposits `token_in` and the order is
/// escrowed in whatever the swap delivers.
#[derive(Debug, Clone)]
pub struct SwapOnCreate {
    pub token_in: Address,
    pub amount_in: u128,
    pub slippage: Bps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmountDelta {
    #[default]
    Unchanged,
    Increase(u128),
    Decrease(u128),
}

/// Field-wise order modification. Fields that do not apply to the order's
/// flavor are ignored; trigger sides are recomputed from the live rate, and
/// the whole order is re-validated as if created.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub strike: Option<Decimal>,
    pub stop: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub min_amount_out: Option<u128>,
    pub slippage: Option<Bps>,
    pub take_profit_slippage: Option<Bps>,
    pub stop_slippage: Option<Bps>,
    pub recipient: Option<Address>,
    pub token_out: Option<Address>,
    pub amount_delta: AmountDelta,
}

impl AutomationMaster {
    /// Run `f` behind the call guard with transactional ledger semantics:
    /// any error restores the ledger to its state at entry.
    pub(super) fn guarded<T>(
        &mut self,
        ledger: &mut Ledger,
        f: impl FnOnce(&mut Self, &mut Ledger) -> Result<T, MasterError>,
    ) -> Result<T, MasterError> {
        self.guard.enter()?;
        let snapshot = ledger.clone();
        let result = f(self, ledger);
        if result.is_err() {
            *ledger = snapshot;
        }
        self.guard.exit();
        result
    }

    fn validate_order_basics(
        &self,
        flavor: OrderFlavor,
        amount_in: u128,
        legs: &[Bps],
    ) -> Result<(), MasterError> {
        if self.is_paused(flavor) {
            return Err(MasterError::Paused);
        }
        if amount_in == 0 {
            return Err(MasterError::ZeroAmount);
        }
        if legs.iter().any(|b| !b.is_valid()) {
            return Err(MasterError::InvalidSlippage);
        }
        let registry = self.registry(flavor)?;
        if registry.pending_count() >= self.config.max_pending_orders {
            return Err(MasterError::MaxPendingOrders { cap: self.config.max_pending_orders });
        }
        Ok(())
    }

    fn check_min_order_size(
        &self,
        ledger: &Ledger,
        token: Address,
        amount: u128,
    ) -> Result<(), MasterError> {
        let usd = usd_value(&self.oracles, ledger, token, amount)?;
        if usd < self.config.min_order_size_usd {
            return Err(MasterError::OrderTooSmall {
                usd,
                min: self.config.min_order_size_usd,
            });
        }
        Ok(())
    }

    /// Exact-fee check plus the native transfer. Counter and event are
    /// settled only once the order is final.
    fn pull_fee(
        &self,
        ledger: &mut Ledger,
        payer: Address,
        fee_paid: u128,
    ) -> Result<(), MasterError> {
        if fee_paid != self.config.order_fee {
            return Err(MasterError::IncorrectFee {
                paid: fee_paid,
                required: self.config.order_fee,
            });
        }
        if fee_paid > 0 {
            ledger.transfer_native(payer, self.address, fee_paid)?;
        }
        Ok(())
    }

    fn settle_fee(&mut self, payer: Address, fee_paid: u128) {
        if fee_paid > 0 {
            self.fees_collected += fee_paid;
            self.emit_event(EventPayload::FeeCollected(FeeCollectedEvent {
                payer,
                amount: fee_paid,
            }));
        }
    }

    fn finish_create(
        &mut self,
        flavor: OrderFlavor,
        recipient: Address,
        token_in: Address,
        token_out: Address,
        amount_in: u128,
        kind: OrderKind,
        caller: Address,
        fee_paid: u128,
    ) -> Result<OrderId, MasterError> {
        let now = self.current_time;
        let order_id =
            self.registry_mut(flavor)?
                .open(recipient, token_in, token_out, amount_in, kind, now)?;
        self.settle_fee(caller, fee_paid);
        self.emit_event(EventPayload::OrderCreated(OrderCreatedEvent {
            flavor,
            order_id,
            recipient,
            token_in,
            token_out,
            amount_in,
        }));
        Ok(order_id)
    }

    // --- create ---

    pub fn create_limit_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        fee_paid: u128,
        req: LimitOrderRequest,
    ) -> Result<OrderId, MasterError> {
        self.guarded(ledger, |master, ledger| {
            master.validate_order_basics(OrderFlavor::Limit, req.amount_in, &[req.slippage])?;
            let rate = exchange_rate(&master.oracles, req.token_in, req.token_out)?;
            master.check_min_order_size(ledger, req.token_in, req.amount_in)?;
            master.pull_fee(ledger, caller, fee_paid)?;

            let escrow = master.registry(OrderFlavor::Limit)?.address();
            ledger.transfer_from(req.token_in, escrow, caller, escrow, req.amount_in)?;

            let kind = OrderKind::Limit {
                strike: req.strike,
                side: TriggerSide::from_current(rate, req.strike),
                slippage: req.slippage,
            };
            master.finish_create(
                OrderFlavor::Limit,
                req.recipient,
                req.token_in,
                req.token_out,
                req.amount_in,
                kind,
                caller,
                fee_paid,
            )
        })
    }

    pub fn create_stop_limit_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        fee_paid: u128,
        req: StopLimitOrderRequest,
    ) -> Result<OrderId, MasterError> {
        self.guarded(ledger, |master, ledger| {
            master.validate_order_basics(
                OrderFlavor::StopLimit,
                req.amount_in,
                &[req.take_profit_slippage, req.stop_slippage, req.swap_slippage],
            )?;
            let rate = exchange_rate(&master.oracles, req.token_in, req.token_out)?;
            master.check_min_order_size(ledger, req.token_in, req.amount_in)?;
            master.pull_fee(ledger, caller, fee_paid)?;

            let escrow = master.registry(OrderFlavor::StopLimit)?.address();
            ledger.transfer_from(req.token_in, escrow, caller, escrow, req.amount_in)?;

            let kind = OrderKind::StopLimit {
                stop: req.stop,
                side: TriggerSide::from_current(rate, req.stop),
                take_profit: req.take_profit,
                stop_loss: req.stop_loss,
                take_profit_slippage: req.take_profit_slippage,
                stop_slippage: req.stop_slippage,
                swap_on_fill: req.swap_on_fill,
                swap_slippage: req.swap_slippage,
            };
            master.finish_create(
                OrderFlavor::StopLimit,
                req.recipient,
                req.token_in,
                req.token_out,
                req.amount_in,
                kind,
                caller,
                fee_paid,
            )
        })
    }

    pub fn create_bracket_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        fee_paid: u128,
        req: BracketOrderRequest,
    ) -> Result<OrderId, MasterError> {
        self.guarded(ledger, |master, ledger| {
            master.validate_order_basics(
                OrderFlavor::Bracket,
                req.amount_in,
                &[req.take_profit_slippage, req.stop_slippage],
            )?;
            let rate = exchange_rate(&master.oracles, req.token_in, req.token_out)?;
            master.check_min_order_size(ledger, req.token_in, req.amount_in)?;
            master.pull_fee(ledger, caller, fee_paid)?;

            let escrow = master.registry(OrderFlavor::Bracket)?.address();
            ledger.transfer_from(req.token_in, escrow, caller, escrow, req.amount_in)?;

            let kind = OrderKind::Bracket {
                take_profit: req.take_profit,
                stop_loss: req.stop_loss,
                tp_side: TriggerSide::from_current(rate, req.take_profit),
                take_profit_slippage: req.take_profit_slippage,
                stop_slippage: req.stop_slippage,
            };
            master.finish_create(
                OrderFlavor::Bracket,
                req.recipient,
                req.token_in,
                req.token_out,
                req.amount_in,
                kind,
                caller,
                fee_paid,
            )
        })
    }

    /// Bracket creation with an immediate swap: the caller deposits
    /// `swap.token_in`, the swap converts it to `req.token_in`, and the order
    /// escrows what the swap delivered. Any swap failure rejects the whole
    /// call; nothing is escrowed and nothing is kept.
    #[allow(clippy::too_many_arguments)]
    pub fn create_bracket_order_with_swap(
        &mut self,
        ledger: &mut Ledger,
        venue: &mut dyn SwapVenue,
        caller: Address,
        fee_paid: u128,
        swap: SwapOnCreate,
        instruction: SwapInstruction,
        req: BracketOrderRequest,
    ) -> Result<OrderId, MasterError> {
        self.guarded(ledger, |master, ledger| {
            master.validate_order_basics(
                OrderFlavor::Bracket,
                swap.amount_in,
                &[req.take_profit_slippage, req.stop_slippage, swap.slippage],
            )?;
            let rate = exchange_rate(&master.oracles, req.token_in, req.token_out)?;
            master.pull_fee(ledger, caller, fee_paid)?;

            let escrow = master.registry(OrderFlavor::Bracket)?.address();
            ledger.transfer_from(swap.token_in, escrow, caller, escrow, swap.amount_in)?;

            let required = min_amount_received(
                &master.oracles,
                ledger,
                swap.amount_in,
                swap.token_in,
                req.token_in,
                swap.slippage,
            )?;
            if instruction.min_amount_out < required {
                return Err(MasterError::InsufficientMinOut {
                    declared: instruction.min_amount_out,
                    required,
                });
            }

            let receipt = execute_swap(
                ledger,
                venue,
                &master.whitelisted_targets,
                escrow,
                swap.token_in,
                req.token_in,
                swap.amount_in,
                &instruction,
            )?;
            // unspent deposit goes straight back to the caller
            let leftover = swap.amount_in - receipt.amount_spent;
            if leftover > 0 {
                ledger.transfer(swap.token_in, escrow, caller, leftover)?;
            }

            let amount_in = receipt.amount_out;
            master.check_min_order_size(ledger, req.token_in, amount_in)?;

            let kind = OrderKind::Bracket {
                take_profit: req.take_profit,
                stop_loss: req.stop_loss,
                tp_side: TriggerSide::from_current(rate, req.take_profit),
                take_profit_slippage: req.take_profit_slippage,
                stop_slippage: req.stop_slippage,
            };
            master.finish_create(
                OrderFlavor::Bracket,
                req.recipient,
                req.token_in,
                req.token_out,
                amount_in,
                kind,
                caller,
                fee_paid,
            )
        })
    }

    pub fn create_oracle_less_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        fee_paid: u128,
        req: OracleLessOrderRequest,
    ) -> Result<OrderId, MasterError> {
        self.guarded(ledger, |master, ledger| {
            master.validate_order_basics(OrderFlavor::OracleLess, req.amount_in, &[])?;
            for token in [req.token_in, req.token_out] {
                if !master.oracle_less_tokens.contains(&token) {
                    return Err(MasterError::TokenNotWhitelisted(token));
                }
            }
            master.pull_fee(ledger, caller, fee_paid)?;

            let escrow = master.registry(OrderFlavor::OracleLess)?.address();
            ledger.transfer_from(req.token_in, escrow, caller, escrow, req.amount_in)?;

            master.finish_create(
                OrderFlavor::OracleLess,
                req.recipient,
                req.token_in,
                req.token_out,
                req.amount_in,
                OrderKind::OracleLess { min_amount_out: req.min_amount_out },
                caller,
                fee_paid,
            )
        })
    }

    // --- cancel ---

    /// Recipient-only cancellation with an exact refund of the escrowed
    /// deposit. Deliberately works while paused so users can always exit.
    pub fn cancel_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        flavor: OrderFlavor,
        order_id: OrderId,
    ) -> Result<(), MasterError> {
        self.guarded(ledger, |master, ledger| {
            let registry = master.registry(flavor)?;
            let order = registry
                .get(order_id)
                .ok_or(MasterError::OrderNotPending(order_id))?;
            if order.recipient != caller {
                return Err(MasterError::OnlyOrderOwner);
            }
            master.remove_with_refund(ledger, flavor, order_id, false)
        })
    }

    /// Owner override; refunds the recipient, not the owner.
    pub fn admin_cancel_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        flavor: OrderFlavor,
        order_id: OrderId,
    ) -> Result<(), MasterError> {
        self.guarded(ledger, |master, ledger| {
            master.roles.require_owner(caller)?;
            master
                .registry(flavor)?
                .get(order_id)
                .ok_or(MasterError::OrderNotPending(order_id))?;
            master.remove_with_refund(ledger, flavor, order_id, true)
        })
    }

    fn remove_with_refund(
        &mut self,
        ledger: &mut Ledger,
        flavor: OrderFlavor,
        order_id: OrderId,
        by_admin: bool,
    ) -> Result<(), MasterError> {
        let registry = self.registry(flavor)?;
        let escrow = registry.address();
        let order = registry
            .get(order_id)
            .ok_or(MasterError::OrderNotPending(order_id))?;
        let (token_in, recipient, amount) = (order.token_in, order.recipient, order.amount_in);

        ledger.transfer(token_in, escrow, recipient, amount)?;
        self.registry_mut(flavor)?.close(order_id)?;
        self.emit_event(EventPayload::OrderCancelled(OrderCancelledEvent {
            flavor,
            order_id,
            refunded: amount,
            by_admin,
        }));
        Ok(())
    }

    // --- modify ---

    /// Recipient-only. Re-runs creation validation against the updated order;
    /// amount increases pull additional deposit from the caller, decreases
    /// refund the caller.
    pub fn modify_order(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        flavor: OrderFlavor,
        order_id: OrderId,
        fee_paid: u128,
        update: OrderUpdate,
    ) -> Result<(), MasterError> {
        self.guarded(ledger, |master, ledger| {
            if master.is_paused(flavor) {
                return Err(MasterError::Paused);
            }
            let registry = master.registry(flavor)?;
            let escrow = registry.address();
            let order = registry
                .get(order_id)
                .ok_or(MasterError::OrderNotPending(order_id))?
                .clone();
            if order.recipient != caller {
                return Err(MasterError::OnlyOrderOwner);
            }

            master.pull_fee(ledger, caller, fee_paid)?;

            let recipient = update.recipient.unwrap_or(order.recipient);
            let token_out = update.token_out.unwrap_or(order.token_out);

            let amount_in = match update.amount_delta {
                AmountDelta::Unchanged => order.amount_in,
                AmountDelta::Increase(extra) => {
                    ledger.transfer_from(order.token_in, escrow, caller, escrow, extra)?;
                    order.amount_in + extra
                }
                AmountDelta::Decrease(cut) => {
                    if cut >= order.amount_in {
                        return Err(MasterError::ZeroAmount);
                    }
                    ledger.transfer(order.token_in, escrow, caller, cut)?;
                    order.amount_in - cut
                }
            };

            let kind = master.rebuild_kind(&order.kind, order.token_in, token_out, &update)?;
            if kind.slippage_legs().iter().any(|b| !b.is_valid()) {
                return Err(MasterError::InvalidSlippage);
            }

            if matches!(kind, OrderKind::OracleLess { .. }) {
                if !master.oracle_less_tokens.contains(&token_out) {
                    return Err(MasterError::TokenNotWhitelisted(token_out));
                }
            } else {
                master.check_min_order_size(ledger, order.token_in, amount_in)?;
            }

            let entry = master
                .registry_mut(flavor)?
                .get_mut(order_id)
                .ok_or(MasterError::OrderNotPending(order_id))?;
            entry.recipient = recipient;
            entry.token_out = token_out;
            entry.amount_in = amount_in;
            entry.kind = kind;

            master.settle_fee(caller, fee_paid);
            master.emit_event(EventPayload::OrderModified(OrderModifiedEvent {
                flavor,
                order_id,
                new_amount_in: amount_in,
            }));
            Ok(())
        })
    }

    /// Apply the update on top of the existing kind, recomputing trigger
    /// sides from the live rate. The variant never changes.
    fn rebuild_kind(
        &self,
        kind: &OrderKind,
        token_in: Address,
        token_out: Address,
        update: &OrderUpdate,
    ) -> Result<OrderKind, MasterError> {
        Ok(match kind.clone() {
            OrderKind::Limit { strike, slippage, .. } => {
                let strike = update.strike.unwrap_or(strike);
                let rate = exchange_rate(&self.oracles, token_in, token_out)?;
                OrderKind::Limit {
                    strike,
                    side: TriggerSide::from_current(rate, strike),
                    slippage: update.slippage.unwrap_or(slippage),
                }
            }
            OrderKind::StopLimit {
                stop,
                take_profit,
                stop_loss,
                take_profit_slippage,
                stop_slippage,
                swap_on_fill,
                swap_slippage,
                ..
            } => {
                let stop = update.stop.unwrap_or(stop);
                let rate = exchange_rate(&self.oracles, token_in, token_out)?;
                OrderKind::StopLimit {
                    stop,
                    side: TriggerSide::from_current(rate, stop),
                    take_profit: update.take_profit.unwrap_or(take_profit),
                    stop_loss: update.stop_loss.unwrap_or(stop_loss),
                    take_profit_slippage: update
                        .take_profit_slippage
                        .unwrap_or(take_profit_slippage),
                    stop_slippage: update.stop_slippage.unwrap_or(stop_slippage),
                    swap_on_fill,
                    swap_slippage,
                }
            }
            OrderKind::Bracket {
                take_profit,
                stop_loss,
                take_profit_slippage,
                stop_slippage,
                ..
            } => {
                let take_profit = update.take_profit.unwrap_or(take_profit);
                let rate = exchange_rate(&self.oracles, token_in, token_out)?;
                OrderKind::Bracket {
                    take_profit,
                    stop_loss: update.stop_loss.unwrap_or(stop_loss),
                    tp_side: TriggerSide::from_current(rate, take_profit),
                    take_profit_slippage: update
                        .take_profit_slippage
                        .unwrap_or(take_profit_slippage),
                    stop_slippage: update.stop_slippage.unwrap_or(stop_slippage),
                }
            }
            OrderKind::OracleLess { min_amount_out } => OrderKind::OracleLess {
                min_amount_out: update.min_amount_out.unwrap_or(min_amount_out),
            },
        })
    }
}
