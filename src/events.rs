// 8.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying keepers. the EventPayload enum lists all
// event types.

use serde::{Deserialize, Serialize};

use crate::types::{Address, OrderFlavor, OrderId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self { id, timestamp, payload }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // lifecycle
    OrderCreated(OrderCreatedEvent),
    OrderProcessed(OrderProcessedEvent),
    OrderCancelled(OrderCancelledEvent),
    OrderModified(OrderModifiedEvent),
    StopTriggered(StopTriggeredEvent),

    // admin
    OracleRegistered(OracleRegisteredEvent),
    OracleRemoved(OracleRemovedEvent),
    TargetsWhitelisted(TargetsWhitelistedEvent),
    TokensWhitelisted(TokensWhitelistedEvent),
    PauseSet(PauseSetEvent),
    FeeCollected(FeeCollectedEvent),
    Swept(SweptEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub flavor: OrderFlavor,
    pub order_id: OrderId,
    pub recipient: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: u128,
}

/// Emitted once per execution attempt. `success: false` means the swap failed
/// or under-delivered and the deposit went back to the recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProcessedEvent {
    pub flavor: OrderFlavor,
    pub order_id: OrderId,
    pub success: bool,
    pub amount_out: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub flavor: OrderFlavor,
    pub order_id: OrderId,
    pub refunded: u128,
    pub by_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderModifiedEvent {
    pub flavor: OrderFlavor,
    pub order_id: OrderId,
    pub new_amount_in: u128,
}

/// A stop-limit crossed its stop and spawned a bracket order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTriggeredEvent {
    pub order_id: OrderId,
    pub bracket_order_id: OrderId,
    pub amount_in: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRegisteredEvent {
    pub token: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRemovedEvent {
    pub token: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsWhitelistedEvent {
    pub targets: Vec<Address>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensWhitelistedEvent {
    pub tokens: Vec<Address>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseSetEvent {
    /// None means the global flag.
    pub flavor: Option<OrderFlavor>,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeCollectedEvent {
    pub payer: Address,
    pub amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweptEvent {
    /// None means the native asset.
    pub token: Option<Address>,
    pub to: Address,
    pub amount: u128,
}
