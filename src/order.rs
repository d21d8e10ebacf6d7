//! Conditional order records and trigger predicates.
//!
//! One `ConditionalOrder` shape serves all four flavors; the flavor-specific
//! trigger data lives in the `OrderKind` tagged union so the lifecycle
//! invariants only exist in one place. Thresholds are priced in the same
//! 8-decimal cross-rate unit the oracle engine produces, on the order's own
//! token pair.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Bps, OrderFlavor, OrderId, Timestamp};

/// Which side of a threshold the rate has to reach. Captured at creation from
/// the then-current rate so the trigger fires on a cross, not on a level the
/// market already sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSide {
    /// Fires when the rate rises to or above the threshold.
    Above,
    /// Fires when the rate falls to or below the threshold.
    Below,
}

impl TriggerSide {
    pub fn from_current(current: Decimal, threshold: Decimal) -> Self {
        if current > threshold {
            TriggerSide::Below
        } else {
            TriggerSide::Above
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            TriggerSide::Above => TriggerSide::Below,
            TriggerSide::Below => TriggerSide::Above,
        }
    }

    pub fn crossed(&self, rate: Decimal, threshold: Decimal) -> bool {
        match self {
            TriggerSide::Above => rate >= threshold,
            TriggerSide::Below => rate <= threshold,
        }
    }
}

/// Which bracket leg a trigger landed on. Decides which slippage applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketLeg {
    TakeProfit,
    StopLoss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Market swap once the strike rate is crossed.
    Limit {
        strike: Decimal,
        side: TriggerSide,
        slippage: Bps,
    },
    /// Once the stop rate is crossed, spawns a bracket order instead of
    /// swapping. `take_profit`/`stop_loss` are the thresholds for the spawned
    /// bracket, priced on the bracket's own pair (the reverse pair when
    /// `swap_on_fill` converts the deposit at spawn time).
    StopLimit {
        stop: Decimal,
        side: TriggerSide,
        take_profit: Decimal,
        stop_loss: Decimal,
        take_profit_slippage: Bps,
        stop_slippage: Bps,
        swap_on_fill: bool,
        swap_slippage: Bps,
    },
    /// Take-profit / stop-loss pair; either leg crossing triggers a swap.
    Bracket {
        take_profit: Decimal,
        stop_loss: Decimal,
        tp_side: TriggerSide,
        take_profit_slippage: Bps,
        stop_slippage: Bps,
    },
    /// Counterparty-less order filled at a caller-quoted price. Never
    /// oracle-ready; fills only through the direct fill path against its own
    /// declared minimum output.
    OracleLess { min_amount_out: u128 },
}

impl OrderKind {
    pub fn flavor(&self) -> OrderFlavor {
        match self {
            OrderKind::Limit { .. } => OrderFlavor::Limit,
            OrderKind::StopLimit { .. } => OrderFlavor::StopLimit,
            OrderKind::Bracket { .. } => OrderFlavor::Bracket,
            OrderKind::OracleLess { .. } => OrderFlavor::OracleLess,
        }
    }

    /// Flavor-specific trigger predicate against the current cross rate.
    pub fn ready(&self, rate: Decimal) -> bool {
        match self {
            OrderKind::Limit { strike, side, .. } => side.crossed(rate, *strike),
            OrderKind::StopLimit { stop, side, .. } => side.crossed(rate, *stop),
            OrderKind::Bracket {
                take_profit,
                stop_loss,
                tp_side,
                ..
            } => {
                tp_side.crossed(rate, *take_profit)
                    || tp_side.opposite().crossed(rate, *stop_loss)
            }
            OrderKind::OracleLess { .. } => false,
        }
    }

    /// Which bracket leg the rate satisfies. Take-profit wins when both would.
    pub fn bracket_leg(&self, rate: Decimal) -> Option<BracketLeg> {
        match self {
            OrderKind::Bracket {
                take_profit,
                stop_loss,
                tp_side,
                ..
            } => {
                if tp_side.crossed(rate, *take_profit) {
                    Some(BracketLeg::TakeProfit)
                } else if tp_side.opposite().crossed(rate, *stop_loss) {
                    Some(BracketLeg::StopLoss)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Slippage tolerance for an immediate fill at the given rate.
    pub fn fill_slippage(&self, rate: Decimal) -> Option<Bps> {
        match self {
            OrderKind::Limit { slippage, .. } => Some(*slippage),
            OrderKind::Bracket {
                take_profit_slippage,
                stop_slippage,
                ..
            } => match self.bracket_leg(rate)? {
                BracketLeg::TakeProfit => Some(*take_profit_slippage),
                BracketLeg::StopLoss => Some(*stop_slippage),
            },
            // stop-limits spawn rather than swap; oracle-less orders carry a
            // fixed minimum output instead of a slippage leg
            OrderKind::StopLimit { .. } | OrderKind::OracleLess { .. } => None,
        }
    }

    /// Every slippage leg this kind carries, for creation-time validation.
    pub fn slippage_legs(&self) -> Vec<Bps> {
        match self {
            OrderKind::Limit { slippage, .. } => vec![*slippage],
            OrderKind::StopLimit {
                take_profit_slippage,
                stop_slippage,
                swap_slippage,
                ..
            } => vec![*take_profit_slippage, *stop_slippage, *swap_slippage],
            OrderKind::Bracket {
                take_profit_slippage,
                stop_slippage,
                ..
            } => vec![*take_profit_slippage, *stop_slippage],
            OrderKind::OracleLess { .. } => Vec::new(),
        }
    }
}

/// One escrowed order. `amount_in` is the exact balance the order is entitled
/// to spend; registry accounting keeps the sum over pending orders equal to
/// the registry's actual token balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOrder {
    pub id: OrderId,
    pub recipient: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: u128,
    pub kind: OrderKind,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limit(strike: Decimal, side: TriggerSide) -> OrderKind {
        OrderKind::Limit {
            strike,
            side,
            slippage: Bps::new(100),
        }
    }

    #[test]
    fn trigger_side_from_current() {
        // waiting for the rate to fall to 3000
        assert_eq!(
            TriggerSide::from_current(dec!(3100), dec!(3000)),
            TriggerSide::Below
        );
        // waiting for the rate to rise to 3000
        assert_eq!(
            TriggerSide::from_current(dec!(2900), dec!(3000)),
            TriggerSide::Above
        );
    }

    #[test]
    fn limit_triggers_on_cross_only() {
        let falling = limit(dec!(3000), TriggerSide::Below);
        assert!(!falling.ready(dec!(3100)));
        assert!(falling.ready(dec!(3000)));
        assert!(falling.ready(dec!(2950)));

        let rising = limit(dec!(3000), TriggerSide::Above);
        assert!(!rising.ready(dec!(2900)));
        assert!(rising.ready(dec!(3000)));
    }

    #[test]
    fn bracket_triggers_on_either_leg() {
        let kind = OrderKind::Bracket {
            take_profit: dec!(3100),
            stop_loss: dec!(2900),
            tp_side: TriggerSide::Above,
            take_profit_slippage: Bps::new(100),
            stop_slippage: Bps::new(500),
        };

        assert!(!kind.ready(dec!(3000)));
        assert!(kind.ready(dec!(3100)));
        assert!(kind.ready(dec!(2900)));

        assert_eq!(kind.bracket_leg(dec!(3150)), Some(BracketLeg::TakeProfit));
        assert_eq!(kind.bracket_leg(dec!(2850)), Some(BracketLeg::StopLoss));
        assert_eq!(kind.bracket_leg(dec!(3000)), None);

        assert_eq!(kind.fill_slippage(dec!(3150)), Some(Bps::new(100)));
        assert_eq!(kind.fill_slippage(dec!(2850)), Some(Bps::new(500)));
    }

    #[test]
    fn stop_limit_fires_on_stop_not_bracket_levels() {
        let kind = OrderKind::StopLimit {
            stop: dec!(2900),
            side: TriggerSide::Below,
            take_profit: dec!(3200),
            stop_loss: dec!(2700),
            take_profit_slippage: Bps::new(100),
            stop_slippage: Bps::new(500),
            swap_on_fill: false,
            swap_slippage: Bps::new(0),
        };

        assert!(!kind.ready(dec!(3200))); // bracket levels are for the child
        assert!(!kind.ready(dec!(2950)));
        assert!(kind.ready(dec!(2900)));
        assert!(kind.fill_slippage(dec!(2900)).is_none());
    }

    #[test]
    fn oracle_less_is_never_oracle_ready() {
        let kind = OrderKind::OracleLess { min_amount_out: 100 };
        assert!(!kind.ready(dec!(0.0001)));
        assert!(!kind.ready(dec!(1000000)));
        assert!(kind.fill_slippage(dec!(1)).is_none());
    }
}
