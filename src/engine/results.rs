// 6.0.2: result types and errors for master operations.
//
// the split that matters: `MasterError` is the synchronous-rejection taxonomy
// (validation, authorization, oracle, ledger, guard) where state is unchanged,
// while execution-time market failures come back as a successful call with an
// `UpkeepOutcome` describing the refund.

use rust_decimal::Decimal;

use crate::descriptor::DescriptorError;
use crate::ledger::LedgerError;
use crate::rate::RateError;
use crate::registry::RegistryError;
use crate::swap::SwapError;
use crate::types::{Address, OrderFlavor, OrderId, MAX_BIPS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MasterError {
    // validation
    #[error("order value ${usd} below the ${min} minimum")]
    OrderTooSmall { usd: Decimal, min: Decimal },

    #[error("registry already holds the maximum of {cap} pending orders")]
    MaxPendingOrders { cap: usize },

    #[error("order amount must be nonzero")]
    ZeroAmount,

    #[error("slippage above {MAX_BIPS} bips")]
    InvalidSlippage,

    #[error("incorrect fee: paid {paid}, required {required}")]
    IncorrectFee { paid: u128, required: u128 },

    #[error("order {0} is not pending")]
    OrderNotPending(OrderId),

    #[error("order {0} does not satisfy its trigger")]
    OrderNotReady(OrderId),

    #[error("declared minimum output {declared} below the oracle-implied {required}")]
    InsufficientMinOut { declared: u128, required: u128 },

    #[error(transparent)]
    BadDescriptor(#[from] DescriptorError),

    #[error("no {0} registry registered")]
    RegistryNotRegistered(OrderFlavor),

    #[error("{0} registry already registered")]
    RegistryAlreadyRegistered(OrderFlavor),

    // authorization
    #[error("caller is not the owner")]
    NotOwner,

    #[error("caller is not the order owner")]
    OnlyOrderOwner,

    #[error("caller is not authorized")]
    NotAuthorized,

    #[error("token {0} is not whitelisted for oracle-less orders")]
    TokenNotWhitelisted(Address),

    // oracle / rate math
    #[error(transparent)]
    Rate(#[from] RateError),

    // token ledger
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // registry bookkeeping
    #[error(transparent)]
    Registry(#[from] RegistryError),

    // swap boundary (non-market failures only; market failures refund)
    #[error(transparent)]
    Swap(#[from] SwapError),

    // guard / pause
    #[error("operations are paused")]
    Paused,

    #[error("reentrant call rejected")]
    ReentrantCall,
}

/// What a keeper's execute call actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpkeepOutcome {
    /// Swap succeeded; proceeds (and any unspent input) went to the recipient.
    Filled {
        flavor: OrderFlavor,
        order_id: OrderId,
        amount_out: u128,
    },
    /// Swap reverted or under-delivered; the deposit went back to the
    /// recipient and the order is terminal. The keeper's call still succeeds.
    FillFailed {
        flavor: OrderFlavor,
        order_id: OrderId,
        refunded: u128,
    },
    /// A stop-limit crossed its stop and spawned a bracket order.
    Spawned {
        order_id: OrderId,
        bracket_order_id: OrderId,
        amount_in: u128,
    },
    /// The descriptor no longer matches the index occupant. Benign no-op.
    Stale,
}
