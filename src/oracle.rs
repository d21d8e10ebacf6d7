//! Price oracle integration.
//!
//! The engine is agnostic to where USD prices come from. Each token has at most
//! one registered source behind the `PriceSource` trait; deregistering a token
//! removes the source entirely, and any rate computation touching that token
//! fails loudly rather than substituting a stale value.

use rust_decimal::Decimal;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("no oracle registered for token {0}")]
    OracleNotRegistered(Address),

    #[error("oracle for token {0} returned a non-positive price")]
    InvalidPrice(Address),
}

/// A single external price source: current USD price per whole token,
/// 8-decimal fixed point. Read fresh on every call, never cached.
pub trait PriceSource: Debug {
    fn usd_price(&self) -> Decimal;
}

/// token -> price source. Owned by the master; mutated only by admin calls.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    sources: HashMap<Address, Box<dyn PriceSource>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, token: Address, source: Box<dyn PriceSource>) {
        self.sources.insert(token, source);
    }

    /// Removal is the "none" sentinel: subsequent price reads fail.
    pub fn deregister(&mut self, token: Address) -> bool {
        self.sources.remove(&token).is_some()
    }

    pub fn is_registered(&self, token: Address) -> bool {
        self.sources.contains_key(&token)
    }

    pub fn usd_price(&self, token: Address) -> Result<Decimal, OracleError> {
        let source = self
            .sources
            .get(&token)
            .ok_or(OracleError::OracleNotRegistered(token))?;
        let price = source.usd_price();
        if price <= Decimal::ZERO {
            return Err(OracleError::InvalidPrice(token));
        }
        Ok(price)
    }
}

/// Shared handle for moving a placeholder oracle's price mid-scenario.
#[derive(Debug, Clone)]
pub struct PriceHandle(Rc<Cell<Decimal>>);

impl PriceHandle {
    pub fn set(&self, price: Decimal) {
        self.0.set(price);
    }

    pub fn get(&self) -> Decimal {
        self.0.get()
    }
}

/// Test/simulation oracle with an externally settable price.
#[derive(Debug)]
pub struct PlaceholderOracle {
    price: Rc<Cell<Decimal>>,
}

impl PlaceholderOracle {
    pub fn new(initial: Decimal) -> (Self, PriceHandle) {
        let cell = Rc::new(Cell::new(initial));
        let handle = PriceHandle(Rc::clone(&cell));
        (Self { price: cell }, handle)
    }
}

impl PriceSource for PlaceholderOracle {
    fn usd_price(&self) -> Decimal {
        self.price.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const WETH: Address = Address(1);

    #[test]
    fn registered_price_reads_fresh() {
        let mut registry = OracleRegistry::new();
        let (oracle, handle) = PlaceholderOracle::new(dec!(3000));
        registry.register(WETH, Box::new(oracle));

        assert_eq!(registry.usd_price(WETH).unwrap(), dec!(3000));
        handle.set(dec!(2500));
        assert_eq!(registry.usd_price(WETH).unwrap(), dec!(2500));
    }

    #[test]
    fn unregistered_token_fails() {
        let registry = OracleRegistry::new();
        assert_eq!(
            registry.usd_price(WETH),
            Err(OracleError::OracleNotRegistered(WETH))
        );
    }

    #[test]
    fn deregister_removes_source() {
        let mut registry = OracleRegistry::new();
        let (oracle, _handle) = PlaceholderOracle::new(dec!(1));
        registry.register(WETH, Box::new(oracle));
        assert!(registry.deregister(WETH));
        assert!(!registry.is_registered(WETH));
        assert!(registry.usd_price(WETH).is_err());
    }

    #[test]
    fn non_positive_price_rejected() {
        let mut registry = OracleRegistry::new();
        let (oracle, handle) = PlaceholderOracle::new(dec!(0));
        registry.register(WETH, Box::new(oracle));
        assert_eq!(registry.usd_price(WETH), Err(OracleError::InvalidPrice(WETH)));

        handle.set(dec!(-1));
        assert_eq!(registry.usd_price(WETH), Err(OracleError::InvalidPrice(WETH)));
    }
}
