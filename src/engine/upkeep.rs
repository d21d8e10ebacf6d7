//! The keeper-facing predicate/execute pair.
//!
//! `check_upkeep` scans registries in priority order and hands back the first
//! ready order as an opaque descriptor (lowest surviving index wins; ties are
//! broken by scan order, never by price or age). `perform_upkeep` takes that
//! descriptor plus the keeper's swap instruction, re-validates the occupant
//! by id, re-evaluates the trigger against the live rate, and only then lets
//! the swap adapter loose. One order per call, by design.

use super::core::AutomationMaster;
use super::results::{MasterError, UpkeepOutcome};
use crate::descriptor::UpkeepDescriptor;
use crate::events::{EventPayload, OrderCreatedEvent, OrderProcessedEvent, StopTriggeredEvent};
use crate::ledger::Ledger;
use crate::order::{ConditionalOrder, OrderKind, TriggerSide};
use crate::rate::{exchange_rate, min_amount_received};
use crate::swap::{execute_swap, SwapInstruction, SwapVenue};
use crate::types::{Address, Bps, OrderFlavor, OrderId};

impl AutomationMaster {
    /// Zero-argument read-only trigger check. Returns the encoded execution
    /// descriptor for the first ready order, if any. Unregistered or broken
    /// oracles fail the scan loudly rather than skipping an order silently.
    pub fn check_upkeep(&self) -> Result<Option<Vec<u8>>, MasterError> {
        if self.paused_global {
            return Ok(None);
        }
        for flavor in &self.priority {
            if self.is_paused(*flavor) {
                continue;
            }
            let registry = self.registry(*flavor)?;
            for (idx, oid) in registry.pending_ids().iter().enumerate() {
                let Some(order) = registry.get(*oid) else {
                    continue;
                };
                if matches!(order.kind, OrderKind::OracleLess { .. }) {
                    continue;
                }
                let rate = exchange_rate(&self.oracles, order.token_in, order.token_out)?;
                if order.kind.ready(rate) {
                    let descriptor = UpkeepDescriptor {
                        flavor: *flavor,
                        registry: registry.address(),
                        target_hint: Address::ZERO,
                        pending_idx: idx,
                        order_id: *oid,
                        token_in: order.token_in,
                        token_out: order.token_out,
                        amount_in: order.amount_in,
                        exchange_rate: rate,
                        slippage: descriptor_slippage(order, rate),
                    };
                    return Ok(Some(descriptor.encode()?));
                }
            }
        }
        Ok(None)
    }

    /// Execute against a previously returned descriptor. A descriptor whose
    /// index no longer holds the expected order id is a benign no-op, not an
    /// error: cancellations between check and execute reorder the index.
    pub fn perform_upkeep(
        &mut self,
        ledger: &mut Ledger,
        venue: &mut dyn SwapVenue,
        descriptor_bytes: &[u8],
        instruction: &SwapInstruction,
    ) -> Result<UpkeepOutcome, MasterError> {
        self.guarded(ledger, |master, ledger| {
            let descriptor = UpkeepDescriptor::decode(descriptor_bytes)?;
            if master.is_paused(descriptor.flavor) {
                return Err(MasterError::Paused);
            }

            let registry = master.registry(descriptor.flavor)?;
            if !registry.occupant_matches(descriptor.pending_idx, descriptor.order_id) {
                return Ok(UpkeepOutcome::Stale);
            }
            let order = registry
                .get(descriptor.order_id)
                .ok_or(MasterError::OrderNotPending(descriptor.order_id))?
                .clone();

            match order.kind {
                // oracle-less orders only fill through the direct path
                OrderKind::OracleLess { .. } => Err(MasterError::OrderNotReady(order.id)),
                OrderKind::StopLimit { .. } => master.spawn_bracket(ledger, venue, order, instruction),
                OrderKind::Limit { .. } | OrderKind::Bracket { .. } => {
                    master.fill_order(ledger, venue, descriptor.flavor, order, instruction)
                }
            }
        })
    }

    /// Direct fill path for oracle-less orders: any filler, any whitelisted
    /// venue, judged against the order's own declared minimum output.
    pub fn fill_oracle_less(
        &mut self,
        ledger: &mut Ledger,
        venue: &mut dyn SwapVenue,
        pending_idx: usize,
        order_id: OrderId,
        instruction: &SwapInstruction,
    ) -> Result<UpkeepOutcome, MasterError> {
        self.guarded(ledger, |master, ledger| {
            if master.is_paused(OrderFlavor::OracleLess) {
                return Err(MasterError::Paused);
            }
            let registry = master.registry(OrderFlavor::OracleLess)?;
            if !registry.occupant_matches(pending_idx, order_id) {
                return Ok(UpkeepOutcome::Stale);
            }
            let escrow = registry.address();
            let order = registry
                .get(order_id)
                .ok_or(MasterError::OrderNotPending(order_id))?
                .clone();
            let OrderKind::OracleLess { min_amount_out } = order.kind else {
                return Err(MasterError::OrderNotReady(order_id));
            };
            if instruction.min_amount_out < min_amount_out {
                return Err(MasterError::InsufficientMinOut {
                    declared: instruction.min_amount_out,
                    required: min_amount_out,
                });
            }
            master.settle_swap(ledger, venue, OrderFlavor::OracleLess, order, escrow, instruction)
        })
    }

    /// Oracle-priced fill: re-check the trigger, hold the keeper's declared
    /// minimum to the oracle-implied floor, then swap.
    fn fill_order(
        &mut self,
        ledger: &mut Ledger,
        venue: &mut dyn SwapVenue,
        flavor: OrderFlavor,
        order: ConditionalOrder,
        instruction: &SwapInstruction,
    ) -> Result<UpkeepOutcome, MasterError> {
        let rate = exchange_rate(&self.oracles, order.token_in, order.token_out)?;
        if !order.kind.ready(rate) {
            return Err(MasterError::OrderNotReady(order.id));
        }
        let slippage = order
            .kind
            .fill_slippage(rate)
            .ok_or(MasterError::OrderNotReady(order.id))?;
        let required = min_amount_received(
            &self.oracles,
            ledger,
            order.amount_in,
            order.token_in,
            order.token_out,
            slippage,
        )?;
        if instruction.min_amount_out < required {
            return Err(MasterError::InsufficientMinOut {
                declared: instruction.min_amount_out,
                required,
            });
        }
        let escrow = self.registry(flavor)?.address();
        self.settle_swap(ledger, venue, flavor, order, escrow, instruction)
    }

    /// Run the swap adapter and finalize. Success pays the recipient and
    /// returns any unspent deposit; market failure refunds the deposit and
    /// terminates the order on its first attempt. Either way the id leaves
    /// the pending index exactly once.
    fn settle_swap(
        &mut self,
        ledger: &mut Ledger,
        venue: &mut dyn SwapVenue,
        flavor: OrderFlavor,
        order: ConditionalOrder,
        escrow: Address,
        instruction: &SwapInstruction,
    ) -> Result<UpkeepOutcome, MasterError> {
        match execute_swap(
            ledger,
            venue,
            &self.whitelisted_targets,
            escrow,
            order.token_in,
            order.token_out,
            order.amount_in,
            instruction,
        ) {
            Ok(receipt) => {
                ledger.transfer(order.token_out, escrow, order.recipient, receipt.amount_out)?;
                let leftover = order.amount_in - receipt.amount_spent;
                if leftover > 0 {
                    ledger.transfer(order.token_in, escrow, order.recipient, leftover)?;
                }
                self.registry_mut(flavor)?.close(order.id)?;
                self.emit_event(EventPayload::OrderProcessed(OrderProcessedEvent {
                    flavor,
                    order_id: order.id,
                    success: true,
                    amount_out: receipt.amount_out,
                }));
                Ok(UpkeepOutcome::Filled {
                    flavor,
                    order_id: order.id,
                    amount_out: receipt.amount_out,
                })
            }
            Err(e) if e.is_market_failure() => {
                ledger.transfer(order.token_in, escrow, order.recipient, order.amount_in)?;
                self.registry_mut(flavor)?.close(order.id)?;
                self.emit_event(EventPayload::OrderProcessed(OrderProcessedEvent {
                    flavor,
                    order_id: order.id,
                    success: false,
                    amount_out: 0,
                }));
                Ok(UpkeepOutcome::FillFailed {
                    flavor,
                    order_id: order.id,
                    refunded: order.amount_in,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop-limit servicing: no swap of its own (unless `swap_on_fill`), the
    /// deposit moves to the bracket registry and a bracket order is born with
    /// a fresh trigger side.
    fn spawn_bracket(
        &mut self,
        ledger: &mut Ledger,
        venue: &mut dyn SwapVenue,
        order: ConditionalOrder,
        instruction: &SwapInstruction,
    ) -> Result<UpkeepOutcome, MasterError> {
        let OrderKind::StopLimit {
            take_profit,
            stop_loss,
            take_profit_slippage,
            stop_slippage,
            swap_on_fill,
            swap_slippage,
            ..
        } = order.kind.clone()
        else {
            return Err(MasterError::OrderNotReady(order.id));
        };

        let rate = exchange_rate(&self.oracles, order.token_in, order.token_out)?;
        if !order.kind.ready(rate) {
            return Err(MasterError::OrderNotReady(order.id));
        }

        let parent_escrow = self.registry(OrderFlavor::StopLimit)?.address();
        let bracket_escrow = self.registry(OrderFlavor::Bracket)?.address();
        if self.registry(OrderFlavor::Bracket)?.pending_count() >= self.config.max_pending_orders {
            return Err(MasterError::MaxPendingOrders { cap: self.config.max_pending_orders });
        }

        let (child_token_in, child_token_out, child_amount) = if swap_on_fill {
            let required = min_amount_received(
                &self.oracles,
                ledger,
                order.amount_in,
                order.token_in,
                order.token_out,
                swap_slippage,
            )?;
            if instruction.min_amount_out < required {
                return Err(MasterError::InsufficientMinOut {
                    declared: instruction.min_amount_out,
                    required,
                });
            }
            match execute_swap(
                ledger,
                venue,
                &self.whitelisted_targets,
                parent_escrow,
                order.token_in,
                order.token_out,
                order.amount_in,
                instruction,
            ) {
                Ok(receipt) => {
                    ledger.transfer(
                        order.token_out,
                        parent_escrow,
                        bracket_escrow,
                        receipt.amount_out,
                    )?;
                    let leftover = order.amount_in - receipt.amount_spent;
                    if leftover > 0 {
                        ledger.transfer(order.token_in, parent_escrow, order.recipient, leftover)?;
                    }
                    // the child runs on the reverse pair
                    (order.token_out, order.token_in, receipt.amount_out)
                }
                Err(e) if e.is_market_failure() => {
                    ledger.transfer(order.token_in, parent_escrow, order.recipient, order.amount_in)?;
                    self.registry_mut(OrderFlavor::StopLimit)?.close(order.id)?;
                    self.emit_event(EventPayload::OrderProcessed(OrderProcessedEvent {
                        flavor: OrderFlavor::StopLimit,
                        order_id: order.id,
                        success: false,
                        amount_out: 0,
                    }));
                    return Ok(UpkeepOutcome::FillFailed {
                        flavor: OrderFlavor::StopLimit,
                        order_id: order.id,
                        refunded: order.amount_in,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            ledger.transfer(order.token_in, parent_escrow, bracket_escrow, order.amount_in)?;
            (order.token_in, order.token_out, order.amount_in)
        };

        let child_rate = exchange_rate(&self.oracles, child_token_in, child_token_out)?;
        let kind = OrderKind::Bracket {
            take_profit,
            stop_loss,
            tp_side: TriggerSide::from_current(child_rate, take_profit),
            take_profit_slippage,
            stop_slippage,
        };
        let now = self.current_time;
        let child_id = self.registry_mut(OrderFlavor::Bracket)?.open(
            order.recipient,
            child_token_in,
            child_token_out,
            child_amount,
            kind,
            now,
        )?;
        self.registry_mut(OrderFlavor::StopLimit)?.close(order.id)?;

        self.emit_event(EventPayload::StopTriggered(StopTriggeredEvent {
            order_id: order.id,
            bracket_order_id: child_id,
            amount_in: child_amount,
        }));
        self.emit_event(EventPayload::OrderCreated(OrderCreatedEvent {
            flavor: OrderFlavor::Bracket,
            order_id: child_id,
            recipient: order.recipient,
            token_in: child_token_in,
            token_out: child_token_out,
            amount_in: child_amount,
        }));

        Ok(UpkeepOutcome::Spawned {
            order_id: order.id,
            bracket_order_id: child_id,
            amount_in: child_amount,
        })
    }
}

fn descriptor_slippage(order: &ConditionalOrder, rate: rust_decimal::Decimal) -> Bps {
    order.kind.fill_slippage(rate).unwrap_or(match &order.kind {
        OrderKind::StopLimit { swap_slippage, .. } => *swap_slippage,
        _ => Bps::new(0),
    })
}
