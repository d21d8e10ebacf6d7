// 6.x engine/: the automation master, split by concern:
//   core.rs    - state, roles, pause, whitelists, admin ops, events
//   orders.rs  - create / cancel / modify entry points
//   upkeep.rs  - keeper predicate and execute dispatch
//   results.rs - error taxonomy and execute outcomes

mod core;
mod orders;
mod results;
mod upkeep;

pub use self::core::{AutomationMaster, Roles};
pub use orders::{
    AmountDelta, BracketOrderRequest, LimitOrderRequest, OracleLessOrderRequest, OrderUpdate,
    StopLimitOrderRequest, SwapOnCreate,
};
pub use results::{MasterError, UpkeepOutcome};
