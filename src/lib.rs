// trigger-core: conditional order automation engine.
// keeper-first architecture: a cheap read-only predicate decides which single
// pending order to service, and execution defends every invariant again.
// all computation is deterministic with no external I/O.
//
// file map:
//   1.x  types.rs: primitives: Address, OrderId, OrderFlavor, Bps, Timestamp
//   2.x  rate.rs: oracle cross rates, min-received math, decimal rescaling
//   3.x  registry.rs: per-flavor order arena + swap-and-pop pending index
//   4.x  descriptor.rs: opaque keeper descriptor, id-revalidated on execute
//   5.x  order.rs: ConditionalOrder, OrderKind trigger predicates
//   6.x  engine/: automation master: admin, order entry points, upkeep
//   7.x  config.rs: fee, order-size floor, pending cap
//   8.x  events.rs: state transition events for audit
//   9.x  ledger.rs: token world (mocked): balances, allowances, native asset
//   9.1  oracle.rs: price source trait + registry (mocked sources)
//   9.2  swap.rs: swap venue boundary, whitelist + balance-delta checks

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod order;
pub mod rate;
pub mod registry;
pub mod swap;
pub mod types;

pub use config::MasterConfig;
pub use descriptor::{DescriptorError, UpkeepDescriptor};
pub use engine::{
    AmountDelta, AutomationMaster, BracketOrderRequest, LimitOrderRequest, MasterError,
    OracleLessOrderRequest, OrderUpdate, Roles, StopLimitOrderRequest, SwapOnCreate, UpkeepOutcome,
};
pub use events::{Event, EventId, EventPayload};
pub use ledger::{Ledger, LedgerError};
pub use oracle::{OracleError, OracleRegistry, PlaceholderOracle, PriceHandle, PriceSource};
pub use order::{BracketLeg, ConditionalOrder, OrderKind, TriggerSide};
pub use rate::{exchange_rate, min_amount_received, usd_value, RateError};
pub use registry::{OrderRegistry, RegistryError};
pub use swap::{
    execute_swap, MockRouter, RouterCall, SwapError, SwapInstruction, SwapReceipt, SwapVenue,
    VenueError,
};
pub use types::{Address, Bps, OrderFlavor, OrderId, Timestamp, MAX_BIPS};
