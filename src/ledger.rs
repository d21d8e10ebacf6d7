// 9.0 ledger.rs: MOCKED. the token world the engine runs against: fungible-token
// balances with transfer/approve/transferFrom semantics, a native asset for fees,
// and per-token decimals. just balance changes, no real chain.
//
// amounts are raw base units (u128), the same way the contracts this models hold
// uint256 wei amounts. the rate engine owns all decimal conversions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("unknown token {0}")]
    UnknownToken(Address),

    #[error("insufficient balance of {token}: have {have}, need {need}")]
    InsufficientBalance { token: Address, have: u128, need: u128 },

    #[error("insufficient allowance on {token}: have {have}, need {need}")]
    InsufficientAllowance { token: Address, have: u128, need: u128 },

    #[error("insufficient native balance: have {have}, need {need}")]
    InsufficientNative { have: u128, need: u128 },
}

/// Full chain state. Cloneable so callers can snapshot before an untrusted
/// external call and restore if it misbehaves.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    tokens: HashMap<Address, TokenInfo>,
    // (token, holder) -> balance
    balances: HashMap<(Address, Address), u128>,
    // (token, owner, spender) -> allowance
    allowances: HashMap<(Address, Address, Address), u128>,
    native: HashMap<Address, u128>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fungible token. Decimals above 18 are not supported anywhere
    /// in the engine's rescaling math.
    pub fn register_token(&mut self, token: Address, symbol: &str, decimals: u32) {
        assert!(decimals <= 18, "token decimals above 18 unsupported");
        self.tokens.insert(
            token,
            TokenInfo {
                symbol: symbol.to_string(),
                decimals,
            },
        );
    }

    pub fn token_info(&self, token: Address) -> Result<&TokenInfo, LedgerError> {
        self.tokens.get(&token).ok_or(LedgerError::UnknownToken(token))
    }

    pub fn decimals(&self, token: Address) -> Result<u32, LedgerError> {
        Ok(self.token_info(token)?.decimals)
    }

    pub fn mint(&mut self, token: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.token_info(token)?;
        *self.balances.entry((token, to)).or_insert(0) += amount;
        Ok(())
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> u128 {
        self.balances.get(&(token, holder)).copied().unwrap_or(0)
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let have = self.balance_of(token, from);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { token, have, need: amount });
        }
        self.balances.insert((token, from), have - amount);
        *self.balances.entry((token, to)).or_insert(0) += amount;
        Ok(())
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128) {
        self.allowances.insert((token, owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.allowances.get(&(token, owner, spender)).copied().unwrap_or(0)
    }

    /// Spender moves `amount` of `from`'s tokens, consuming allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance { token, have: allowed, need: amount });
        }
        self.transfer(token, from, to, amount)?;
        self.allowances.insert((token, from, spender), allowed - amount);
        Ok(())
    }

    pub fn mint_native(&mut self, to: Address, amount: u128) {
        *self.native.entry(to).or_insert(0) += amount;
    }

    pub fn native_balance(&self, holder: Address) -> u128 {
        self.native.get(&holder).copied().unwrap_or(0)
    }

    pub fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let have = self.native_balance(from);
        if have < amount {
            return Err(LedgerError::InsufficientNative { have, need: amount });
        }
        self.native.insert(from, have - amount);
        *self.native.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WETH: Address = Address(1);
    const ALICE: Address = Address(10);
    const BOB: Address = Address(11);

    fn ledger() -> Ledger {
        let mut l = Ledger::new();
        l.register_token(WETH, "WETH", 18);
        l
    }

    #[test]
    fn transfer_moves_balance() {
        let mut l = ledger();
        l.mint(WETH, ALICE, 1000).unwrap();
        l.transfer(WETH, ALICE, BOB, 400).unwrap();
        assert_eq!(l.balance_of(WETH, ALICE), 600);
        assert_eq!(l.balance_of(WETH, BOB), 400);
    }

    #[test]
    fn transfer_rejects_overdraft() {
        let mut l = ledger();
        l.mint(WETH, ALICE, 100).unwrap();
        let err = l.transfer(WETH, ALICE, BOB, 101).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(l.balance_of(WETH, ALICE), 100);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut l = ledger();
        l.mint(WETH, ALICE, 1000).unwrap();
        l.approve(WETH, ALICE, BOB, 500);

        l.transfer_from(WETH, BOB, ALICE, BOB, 300).unwrap();
        assert_eq!(l.allowance(WETH, ALICE, BOB), 200);
        assert_eq!(l.balance_of(WETH, BOB), 300);

        let err = l.transfer_from(WETH, BOB, ALICE, BOB, 300).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));
    }

    #[test]
    fn unknown_token_fails_loudly() {
        let mut l = ledger();
        assert!(matches!(
            l.mint(Address(99), ALICE, 1),
            Err(LedgerError::UnknownToken(_))
        ));
        assert!(l.decimals(Address(99)).is_err());
    }

    #[test]
    fn native_transfers() {
        let mut l = ledger();
        l.mint_native(ALICE, 100);
        l.transfer_native(ALICE, BOB, 40).unwrap();
        assert_eq!(l.native_balance(ALICE), 60);
        assert_eq!(l.native_balance(BOB), 40);
        assert!(l.transfer_native(ALICE, BOB, 61).is_err());
    }
}
