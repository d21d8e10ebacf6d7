// 3.0 registry.rs: per-flavor order registry. an arena (id -> record) plus a
// separate live-id list with swap-and-pop removal. list positions are never
// stable identifiers across calls; anyone holding an index must re-check the
// occupant's id before acting on it.

use std::collections::HashMap;

use crate::order::{ConditionalOrder, OrderKind};
use crate::types::{Address, OrderFlavor, OrderId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("order kind {got} does not belong in the {expected} registry")]
    MismatchedKind { expected: OrderFlavor, got: OrderFlavor },

    #[error("order {0} is not pending")]
    OrderNotPending(OrderId),
}

#[derive(Debug)]
pub struct OrderRegistry {
    flavor: OrderFlavor,
    /// Escrow account on the ledger. All deposits for this registry's pending
    /// orders sit at this address and nowhere else.
    address: Address,
    orders: HashMap<OrderId, ConditionalOrder>,
    pending: Vec<OrderId>,
    next_id: u64,
}

impl OrderRegistry {
    pub fn new(flavor: OrderFlavor, address: Address) -> Self {
        Self {
            flavor,
            address,
            orders: HashMap::new(),
            pending: Vec::new(),
            next_id: 1,
        }
    }

    pub fn flavor(&self) -> OrderFlavor {
        self.flavor
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Mint an id, store the record, append to the pending index.
    pub fn open(
        &mut self,
        recipient: Address,
        token_in: Address,
        token_out: Address,
        amount_in: u128,
        kind: OrderKind,
        created_at: Timestamp,
    ) -> Result<OrderId, RegistryError> {
        if kind.flavor() != self.flavor {
            return Err(RegistryError::MismatchedKind {
                expected: self.flavor,
                got: kind.flavor(),
            });
        }
        let id = OrderId(self.next_id);
        self.next_id += 1;

        self.orders.insert(
            id,
            ConditionalOrder {
                id,
                recipient,
                token_in,
                token_out,
                amount_in,
                kind,
                created_at,
            },
        );
        self.pending.push(id);
        Ok(id)
    }

    /// Remove a pending order: swap-and-pop on the index, drop from the arena.
    /// Terminal; the id is never reinserted.
    pub fn close(&mut self, id: OrderId) -> Result<ConditionalOrder, RegistryError> {
        let pos = self
            .position_of(id)
            .ok_or(RegistryError::OrderNotPending(id))?;
        self.pending.swap_remove(pos);
        self.orders
            .remove(&id)
            .ok_or(RegistryError::OrderNotPending(id))
    }

    pub fn get(&self, id: OrderId) -> Option<&ConditionalOrder> {
        self.orders.get(&id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut ConditionalOrder> {
        self.orders.get_mut(&id)
    }

    pub fn pending_ids(&self) -> &[OrderId] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn id_at(&self, idx: usize) -> Option<OrderId> {
        self.pending.get(idx).copied()
    }

    pub fn position_of(&self, id: OrderId) -> Option<usize> {
        self.pending.iter().position(|&oid| oid == id)
    }

    /// True iff the slot still holds the order the caller thinks it does.
    pub fn occupant_matches(&self, idx: usize, id: OrderId) -> bool {
        self.id_at(idx) == Some(id)
    }

    /// Sum of pending deposits in `token`. Conservation demands this equals
    /// the ledger balance of the registry's escrow address at all times.
    pub fn pending_escrow(&self, token: Address) -> u128 {
        self.pending
            .iter()
            .filter_map(|id| self.orders.get(id))
            .filter(|o| o.token_in == token)
            .map(|o| o.amount_in)
            .sum()
    }
}
