//! Swap execution boundary.
//!
//! The engine never constructs DEX calldata for execution; it receives an
//! opaque instruction from the keeper, checks the target against the
//! whitelist, and judges the call purely by token balance deltas afterwards.
//! Every enforcement lives here, in the adapter, not in the order flavors.
//!
//! The venue is approved for exactly the triggering order's deposit and the
//! adapter still asserts the spent delta against that bound afterwards, so a
//! dishonest calldata payload cannot reach other pending orders' escrow.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;

use crate::ledger::{Ledger, LedgerError};
use crate::rate::{denormalize, normalize};
use crate::types::{Address, MAX_BIPS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    #[error("venue rejected calldata")]
    BadCalldata,

    #[error("venue reverted: {0}")]
    Reverted(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// An external swap destination. Untrusted: it runs against the ledger with
/// whatever the calldata says, and the adapter audits the damage afterwards.
pub trait SwapVenue: Debug {
    fn address(&self) -> Address;

    fn execute(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        calldata: &[u8],
    ) -> Result<(), VenueError>;
}

/// Keeper-supplied swap instructions: `(router, raw calldata)` plus the
/// minimum output the caller is willing to accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapInstruction {
    pub target: Address,
    pub calldata: Vec<u8>,
    pub min_amount_out: u128,
}

#[derive(Debug, Clone)]
pub struct SwapReceipt {
    pub amount_out: u128,
    pub amount_spent: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapError {
    #[error("swap target {0} is not whitelisted")]
    TargetNotWhitelisted(Address),

    #[error("venue {got} does not match instruction target {expected}")]
    VenueMismatch { expected: Address, got: Address },

    #[error("swap call failed: {0}")]
    VenueFailed(VenueError),

    #[error("swap delivered {received}, below declared minimum {declared}")]
    UnderDelivered { received: u128, declared: u128 },

    #[error("swap spent {spent} of the input token, above the order's {cap}")]
    Overspend { spent: u128, cap: u128 },
}

impl SwapError {
    /// Market failures terminate the order with a refund; everything else is
    /// a synchronous rejection of the keeper's call.
    pub fn is_market_failure(&self) -> bool {
        matches!(self, SwapError::VenueFailed(_) | SwapError::UnderDelivered { .. })
    }
}

/// Attempt a swap on behalf of `holder`, spending at most `amount_cap` of
/// `token_in`. The ledger is rolled back to its pre-call state on every
/// failure path, so a rejected swap leaves no trace.
pub fn execute_swap(
    ledger: &mut Ledger,
    venue: &mut dyn SwapVenue,
    whitelist: &HashSet<Address>,
    holder: Address,
    token_in: Address,
    token_out: Address,
    amount_cap: u128,
    instruction: &SwapInstruction,
) -> Result<SwapReceipt, SwapError> {
    if !whitelist.contains(&instruction.target) {
        return Err(SwapError::TargetNotWhitelisted(instruction.target));
    }
    if venue.address() != instruction.target {
        return Err(SwapError::VenueMismatch {
            expected: instruction.target,
            got: venue.address(),
        });
    }

    let snapshot = ledger.clone();
    ledger.approve(token_in, holder, instruction.target, amount_cap);

    let in_before = ledger.balance_of(token_in, holder);
    let out_before = ledger.balance_of(token_out, holder);

    if let Err(e) = venue.execute(ledger, holder, &instruction.calldata) {
        *ledger = snapshot;
        return Err(SwapError::VenueFailed(e));
    }

    let spent = in_before.saturating_sub(ledger.balance_of(token_in, holder));
    let received = ledger.balance_of(token_out, holder).saturating_sub(out_before);

    if spent > amount_cap {
        *ledger = snapshot;
        return Err(SwapError::Overspend { spent, cap: amount_cap });
    }
    if received < instruction.min_amount_out {
        *ledger = snapshot;
        return Err(SwapError::UnderDelivered {
            received,
            declared: instruction.min_amount_out,
        });
    }

    // clear whatever approval the venue left unspent
    ledger.approve(token_in, holder, instruction.target, 0);

    Ok(SwapReceipt { amount_out: received, amount_spent: spent })
}

/// Calldata understood by the mock router: the shape of a single-hop
/// exact-input swap. Must round-trip exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterCall {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: u128,
    pub amount_out_min: u128,
    pub recipient: Address,
}

impl RouterCall {
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, VenueError> {
        serde_json::from_slice(bytes).map_err(|_| VenueError::BadCalldata)
    }
}

/// Test/simulation router. Pulls the input via allowance, pays out of its own
/// inventory at a configured quote, and can be forced to misbehave.
#[derive(Debug)]
pub struct MockRouter {
    address: Address,
    // (token_in, token_out) -> whole-token output per whole-token input
    quotes: std::collections::HashMap<(Address, Address), rust_decimal::Decimal>,
    fee_bips: u32,
    failing: bool,
}

impl MockRouter {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            quotes: std::collections::HashMap::new(),
            fee_bips: 0,
            failing: false,
        }
    }

    pub fn set_quote(
        &mut self,
        token_in: Address,
        token_out: Address,
        rate: rust_decimal::Decimal,
    ) {
        self.quotes.insert((token_in, token_out), rate);
    }

    pub fn set_fee_bips(&mut self, bips: u32) {
        self.fee_bips = bips;
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl SwapVenue for MockRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn execute(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        calldata: &[u8],
    ) -> Result<(), VenueError> {
        if self.failing {
            return Err(VenueError::Reverted("router offline".to_string()));
        }
        let call = RouterCall::decode(calldata)?;

        let quote = self
            .quotes
            .get(&(call.token_in, call.token_out))
            .copied()
            .ok_or_else(|| VenueError::Reverted("no liquidity".to_string()))?;

        ledger.transfer_from(call.token_in, self.address, caller, self.address, call.amount_in)?;

        let gross = normalize(ledger, call.token_in, call.amount_in)
            .ok()
            .and_then(|amount| amount.checked_mul(quote))
            .and_then(|out| denormalize(ledger, call.token_out, out).ok())
            .ok_or_else(|| VenueError::Reverted("quote overflow".to_string()))?;
        let out = gross * (MAX_BIPS - self.fee_bips) as u128 / MAX_BIPS as u128;

        if out < call.amount_out_min {
            return Err(VenueError::Reverted("too little received".to_string()));
        }
        ledger.transfer(call.token_out, self.address, call.recipient, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const WETH: Address = Address(1);
    const USDC: Address = Address(2);
    const ROUTER: Address = Address(50);
    const ESCROW: Address = Address(100);

    fn setup() -> (Ledger, MockRouter, HashSet<Address>) {
        let mut ledger = Ledger::new();
        ledger.register_token(WETH, "WETH", 18);
        ledger.register_token(USDC, "USDC", 6);
        ledger.mint(WETH, ESCROW, 2_000_000_000_000_000_000).unwrap();
        ledger.mint(USDC, ROUTER, 100_000_000_000).unwrap();

        let mut router = MockRouter::new(ROUTER);
        router.set_quote(WETH, USDC, dec!(3000));

        let mut whitelist = HashSet::new();
        whitelist.insert(ROUTER);
        (ledger, router, whitelist)
    }

    fn instruction(amount_in: u128, min_out: u128) -> SwapInstruction {
        SwapInstruction {
            target: ROUTER,
            calldata: RouterCall {
                token_in: WETH,
                token_out: USDC,
                amount_in,
                amount_out_min: 0,
                recipient: ESCROW,
            }
            .encode(),
            min_amount_out: min_out,
        }
    }

    #[test]
    fn swap_delivers_and_clears_allowance() {
        let (mut ledger, mut router, whitelist) = setup();
        let one_weth = 1_000_000_000_000_000_000;

        let receipt = execute_swap(
            &mut ledger, &mut router, &whitelist, ESCROW, WETH, USDC, one_weth,
            &instruction(one_weth, 2_900_000_000),
        )
        .unwrap();

        assert_eq!(receipt.amount_out, 3_000_000_000);
        assert_eq!(receipt.amount_spent, one_weth);
        assert_eq!(ledger.balance_of(USDC, ESCROW), 3_000_000_000);
        assert_eq!(ledger.allowance(WETH, ESCROW, ROUTER), 0);
    }

    #[test]
    fn non_whitelisted_target_rejected() {
        let (mut ledger, mut router, _) = setup();
        let empty = HashSet::new();
        let err = execute_swap(
            &mut ledger, &mut router, &empty, ESCROW, WETH, USDC, 1,
            &instruction(1, 0),
        )
        .unwrap_err();
        assert_eq!(err, SwapError::TargetNotWhitelisted(ROUTER));
    }

    #[test]
    fn venue_failure_rolls_back() {
        let (mut ledger, mut router, whitelist) = setup();
        router.set_failing(true);
        let before = ledger.balance_of(WETH, ESCROW);

        let err = execute_swap(
            &mut ledger, &mut router, &whitelist, ESCROW, WETH, USDC,
            1_000_000_000_000_000_000,
            &instruction(1_000_000_000_000_000_000, 0),
        )
        .unwrap_err();

        assert!(err.is_market_failure());
        assert_eq!(ledger.balance_of(WETH, ESCROW), before);
        assert_eq!(ledger.allowance(WETH, ESCROW, ROUTER), 0);
    }

    #[test]
    fn under_delivery_rolls_back() {
        let (mut ledger, mut router, whitelist) = setup();
        // market moved: router pays well under what the caller declared
        router.set_quote(WETH, USDC, dec!(2500));
        let one_weth = 1_000_000_000_000_000_000;

        let err = execute_swap(
            &mut ledger, &mut router, &whitelist, ESCROW, WETH, USDC, one_weth,
            &instruction(one_weth, 2_900_000_000),
        )
        .unwrap_err();

        assert_eq!(
            err,
            SwapError::UnderDelivered { received: 2_500_000_000, declared: 2_900_000_000 }
        );
        assert_eq!(ledger.balance_of(WETH, ESCROW), 2_000_000_000_000_000_000);
        assert_eq!(ledger.balance_of(USDC, ESCROW), 0);
    }

    #[test]
    fn overspending_venue_is_caught_and_rolled_back() {
        // a venue that ignores its calldata and raids the whole escrow balance
        #[derive(Debug)]
        struct EvilRouter {
            address: Address,
        }

        impl SwapVenue for EvilRouter {
            fn address(&self) -> Address {
                self.address
            }

            fn execute(
                &mut self,
                ledger: &mut Ledger,
                caller: Address,
                _calldata: &[u8],
            ) -> Result<(), VenueError> {
                let all = ledger.balance_of(WETH, caller);
                ledger.transfer(WETH, caller, self.address, all)?;
                ledger.transfer(USDC, self.address, caller, 10_000_000_000)?;
                Ok(())
            }
        }

        let (mut ledger, _, _) = setup();
        let evil_addr = Address(66);
        ledger.mint(USDC, evil_addr, 10_000_000_000).unwrap();
        let mut evil = EvilRouter { address: evil_addr };
        let mut whitelist = HashSet::new();
        whitelist.insert(evil_addr);

        let one_weth = 1_000_000_000_000_000_000;
        let err = execute_swap(
            &mut ledger, &mut evil, &whitelist, ESCROW, WETH, USDC, one_weth,
            &SwapInstruction { target: evil_addr, calldata: Vec::new(), min_amount_out: 0 },
        )
        .unwrap_err();

        assert_eq!(err, SwapError::Overspend { spent: 2_000_000_000_000_000_000, cap: one_weth });
        assert!(!err.is_market_failure());
        // full rollback: escrow untouched, no stolen output kept
        assert_eq!(ledger.balance_of(WETH, ESCROW), 2_000_000_000_000_000_000);
        assert_eq!(ledger.balance_of(USDC, ESCROW), 0);
    }

    #[test]
    fn router_calldata_round_trips() {
        let call = RouterCall {
            token_in: WETH,
            token_out: USDC,
            amount_in: u128::MAX,
            amount_out_min: 42,
            recipient: ESCROW,
        };
        let decoded = RouterCall::decode(&call.encode()).unwrap();
        assert_eq!(decoded.amount_in, u128::MAX);
        assert_eq!(decoded.recipient, ESCROW);
        assert!(RouterCall::decode(b"garbage").is_err());
    }
}
