// 4.0 descriptor.rs: the opaque payload handed to the keeper by the trigger
// check and handed back unmodified to execute. carries the pending index AND
// the order id: execute re-validates id-at-position, so a descriptor that went
// stale between the two calls degrades to a no-op instead of acting on
// whatever order got swapped into the slot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Bps, OrderFlavor, OrderId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed upkeep descriptor")]
pub struct DescriptorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepDescriptor {
    pub flavor: OrderFlavor,
    pub registry: Address,
    /// Suggested swap destination; the keeper is free to route elsewhere as
    /// long as the final target is whitelisted.
    pub target_hint: Address,
    pub pending_idx: usize,
    pub order_id: OrderId,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: u128,
    /// Cross rate observed at check time, for the keeper's own routing math.
    pub exchange_rate: Decimal,
    /// Slippage of the leg that made the order ready.
    pub slippage: Bps,
}

impl UpkeepDescriptor {
    pub fn encode(&self) -> Result<Vec<u8>, DescriptorError> {
        serde_json::to_vec(self).map_err(|_| DescriptorError)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        serde_json::from_slice(bytes).map_err(|_| DescriptorError)
    }
}
