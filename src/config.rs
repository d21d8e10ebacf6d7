// 7.0 config.rs: all master-level settings in one place. fee, order-size floor,
// pending cap, event log behavior.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Flat creation fee in native base units, charged on create and modify.
    pub order_fee: u128,
    /// Minimum order value in USD. A $25 floor means $25 regardless of which
    /// token or how many decimals it has.
    pub min_order_size_usd: Decimal,
    /// Per-registry pending cap. Bounds worst-case keeper backlog since only
    /// one order is serviced per execute call.
    pub max_pending_orders: usize,
    /// Print events as they are emitted.
    pub verbose: bool,
    /// Event log retention.
    pub max_events: usize,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            order_fee: 0,
            min_order_size_usd: Decimal::new(10, 0),
            max_pending_orders: 25,
            verbose: false,
            max_events: 10_000,
        }
    }
}

impl MasterConfig {
    /// Settings in the shape a mainnet deployment runs with.
    pub fn production() -> Self {
        Self {
            order_fee: 1_000_000_000_000_000, // 0.001 native
            min_order_size_usd: Decimal::new(25, 0),
            max_pending_orders: 150,
            verbose: false,
            max_events: 10_000,
        }
    }
}
