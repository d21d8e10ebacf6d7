// 6.0 engine/core.rs: the automation master. owns the oracle set, the order
// registries in priority order, the whitelists, the fee/pause state and the
// event log. every mutating entry point runs behind the call guard.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use super::results::MasterError;
use crate::config::MasterConfig;
use crate::events::{
    Event, EventId, EventPayload, OracleRegisteredEvent, OracleRemovedEvent, PauseSetEvent,
    SweptEvent, TargetsWhitelistedEvent, TokensWhitelistedEvent,
};
use crate::ledger::Ledger;
use crate::oracle::{OracleRegistry, PriceSource};
use crate::registry::OrderRegistry;
use crate::types::{Address, OrderFlavor, OrderId, Timestamp};

/// Capability check consulted at the top of each mutating entry point.
/// The owner can do everything; target setters may only edit the swap-target
/// whitelist.
#[derive(Debug)]
pub struct Roles {
    owner: Address,
    target_setters: HashSet<Address>,
}

impl Roles {
    fn new(owner: Address) -> Self {
        Self {
            owner,
            target_setters: HashSet::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn require_owner(&self, caller: Address) -> Result<(), MasterError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(MasterError::NotOwner)
        }
    }

    pub fn can_set_targets(&self, caller: Address) -> bool {
        caller == self.owner || self.target_setters.contains(&caller)
    }
}

/// Call-depth guard. Execution performs an external call before finalizing
/// bookkeeping, so every state-mutating entry point takes the lock first.
#[derive(Debug, Default)]
pub(super) struct CallGuard {
    depth: u32,
}

impl CallGuard {
    pub(super) fn enter(&mut self) -> Result<(), MasterError> {
        if self.depth > 0 {
            return Err(MasterError::ReentrantCall);
        }
        self.depth += 1;
        Ok(())
    }

    pub(super) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// 6.1: master struct. all automation state lives here; the token ledger is
/// the host chain and is passed into each call instead.
#[derive(Debug)]
pub struct AutomationMaster {
    pub(super) config: MasterConfig,
    pub(super) roles: Roles,
    /// The master's own ledger account: collected fees and swept strays.
    pub(super) address: Address,
    pub(super) oracles: OracleRegistry,
    pub(super) registries: HashMap<OrderFlavor, OrderRegistry>,
    /// Scan order for the trigger check; registration order.
    pub(super) priority: Vec<OrderFlavor>,
    pub(super) whitelisted_targets: HashSet<Address>,
    pub(super) oracle_less_tokens: HashSet<Address>,
    pub(super) paused_global: bool,
    pub(super) paused_flavors: HashSet<OrderFlavor>,
    pub(super) fees_collected: u128,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) guard: CallGuard,
    pub(super) current_time: Timestamp,
}

impl AutomationMaster {
    pub fn new(address: Address, owner: Address, config: MasterConfig) -> Self {
        Self {
            config,
            roles: Roles::new(owner),
            address,
            oracles: OracleRegistry::new(),
            registries: HashMap::new(),
            priority: Vec::new(),
            whitelisted_targets: HashSet::new(),
            oracle_less_tokens: HashSet::new(),
            paused_global: false,
            paused_flavors: HashSet::new(),
            fees_collected: 0,
            events: Vec::new(),
            next_event_id: 1,
            guard: CallGuard::default(),
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    // --- registries ---

    /// Register a flavor's registry. Registration order is trigger-scan
    /// priority order.
    pub fn register_registry(
        &mut self,
        caller: Address,
        flavor: OrderFlavor,
        escrow: Address,
    ) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        if self.registries.contains_key(&flavor) {
            return Err(MasterError::RegistryAlreadyRegistered(flavor));
        }
        self.registries.insert(flavor, OrderRegistry::new(flavor, escrow));
        self.priority.push(flavor);
        Ok(())
    }

    pub fn registry(&self, flavor: OrderFlavor) -> Result<&OrderRegistry, MasterError> {
        self.registries
            .get(&flavor)
            .ok_or(MasterError::RegistryNotRegistered(flavor))
    }

    pub(super) fn registry_mut(
        &mut self,
        flavor: OrderFlavor,
    ) -> Result<&mut OrderRegistry, MasterError> {
        self.registries
            .get_mut(&flavor)
            .ok_or(MasterError::RegistryNotRegistered(flavor))
    }

    pub fn pending_orders(&self, flavor: OrderFlavor) -> &[OrderId] {
        self.registries
            .get(&flavor)
            .map(|r| r.pending_ids())
            .unwrap_or(&[])
    }

    // --- oracles ---

    pub fn register_oracle(
        &mut self,
        caller: Address,
        token: Address,
        source: Box<dyn PriceSource>,
    ) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        self.oracles.register(token, source);
        self.emit_event(EventPayload::OracleRegistered(OracleRegisteredEvent { token }));
        Ok(())
    }

    pub fn deregister_oracle(&mut self, caller: Address, token: Address) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        if self.oracles.deregister(token) {
            self.emit_event(EventPayload::OracleRemoved(OracleRemovedEvent { token }));
        }
        Ok(())
    }

    pub fn oracles(&self) -> &OracleRegistry {
        &self.oracles
    }

    // --- policy knobs ---

    pub fn set_order_fee(&mut self, caller: Address, fee: u128) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        self.config.order_fee = fee;
        Ok(())
    }

    pub fn set_min_order_size(
        &mut self,
        caller: Address,
        min_usd: Decimal,
    ) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        self.config.min_order_size_usd = min_usd;
        Ok(())
    }

    pub fn set_max_pending_orders(&mut self, caller: Address, cap: usize) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        self.config.max_pending_orders = cap;
        Ok(())
    }

    // --- whitelists ---

    pub fn whitelist_target_setter(
        &mut self,
        caller: Address,
        setter: Address,
        enabled: bool,
    ) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        if enabled {
            self.roles.target_setters.insert(setter);
        } else {
            self.roles.target_setters.remove(&setter);
        }
        Ok(())
    }

    pub fn whitelist_targets(
        &mut self,
        caller: Address,
        targets: &[Address],
        enabled: bool,
    ) -> Result<(), MasterError> {
        if !self.roles.can_set_targets(caller) {
            return Err(MasterError::NotAuthorized);
        }
        for target in targets {
            if enabled {
                self.whitelisted_targets.insert(*target);
            } else {
                self.whitelisted_targets.remove(target);
            }
        }
        self.emit_event(EventPayload::TargetsWhitelisted(TargetsWhitelistedEvent {
            targets: targets.to_vec(),
            enabled,
        }));
        Ok(())
    }

    pub fn is_target_whitelisted(&self, target: Address) -> bool {
        self.whitelisted_targets.contains(&target)
    }

    /// Tokens allowed in oracle-less orders, which bypass the USD minimum
    /// because no oracle is consulted for them.
    pub fn whitelist_oracle_less_tokens(
        &mut self,
        caller: Address,
        tokens: &[Address],
        enabled: bool,
    ) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        for token in tokens {
            if enabled {
                self.oracle_less_tokens.insert(*token);
            } else {
                self.oracle_less_tokens.remove(token);
            }
        }
        self.emit_event(EventPayload::TokensWhitelisted(TokensWhitelistedEvent {
            tokens: tokens.to_vec(),
            enabled,
        }));
        Ok(())
    }

    // --- pause ---

    pub fn pause(
        &mut self,
        caller: Address,
        flavor: Option<OrderFlavor>,
        paused: bool,
    ) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        match flavor {
            Some(flavor) => {
                if paused {
                    self.paused_flavors.insert(flavor);
                } else {
                    self.paused_flavors.remove(&flavor);
                }
            }
            None => self.paused_global = paused,
        }
        self.emit_event(EventPayload::PauseSet(PauseSetEvent { flavor, paused }));
        Ok(())
    }

    /// Global flag plus every registered flavor at once.
    pub fn pause_all(&mut self, caller: Address, paused: bool) -> Result<(), MasterError> {
        self.roles.require_owner(caller)?;
        self.paused_global = paused;
        let flavors: Vec<OrderFlavor> = self.priority.clone();
        for flavor in flavors {
            if paused {
                self.paused_flavors.insert(flavor);
            } else {
                self.paused_flavors.remove(&flavor);
            }
        }
        self.emit_event(EventPayload::PauseSet(PauseSetEvent { flavor: None, paused }));
        Ok(())
    }

    pub fn is_paused(&self, flavor: OrderFlavor) -> bool {
        self.paused_global || self.paused_flavors.contains(&flavor)
    }

    // --- sweeping ---

    /// Move stray token balance off the master's own account. Registry escrow
    /// lives at the registries' addresses and is out of reach by construction.
    pub fn sweep(
        &mut self,
        caller: Address,
        ledger: &mut Ledger,
        token: Address,
        to: Address,
    ) -> Result<u128, MasterError> {
        self.roles.require_owner(caller)?;
        let amount = ledger.balance_of(token, self.address);
        if amount > 0 {
            ledger.transfer(token, self.address, to, amount)?;
        }
        self.emit_event(EventPayload::Swept(SweptEvent { token: Some(token), to, amount }));
        Ok(amount)
    }

    /// Collected fees and any stray native balance.
    pub fn sweep_native(
        &mut self,
        caller: Address,
        ledger: &mut Ledger,
        to: Address,
    ) -> Result<u128, MasterError> {
        self.roles.require_owner(caller)?;
        let amount = ledger.native_balance(self.address);
        if amount > 0 {
            ledger.transfer_native(self.address, to, amount)?;
        }
        self.emit_event(EventPayload::Swept(SweptEvent { token: None, to, amount }));
        Ok(amount)
    }

    /// Total fees ever collected, in native base units.
    pub fn fees_collected(&self) -> u128 {
        self.fees_collected
    }

    // --- events ---

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    /// Conservation audit: every registry's escrow balance must equal the sum
    /// of its pending orders' deposits, for every token involved.
    pub fn escrow_balanced(&self, ledger: &Ledger, tokens: &[Address]) -> bool {
        self.registries.values().all(|registry| {
            tokens.iter().all(|token| {
                registry.pending_escrow(*token) == ledger.balance_of(*token, registry.address())
            })
        })
    }
}
