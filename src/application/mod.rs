//! Application layer containing the core business logic orchestration.
//!
//! `FundsEngine` moves money under a unit of work. `AccountService` opens
//! accounts and serves history listings. `Bank` wires both onto one set of
//! storage ports.

pub mod accounts;
pub mod engine;

use crate::config::BankConfig;
use crate::domain::ports::Ports;
use accounts::AccountService;
use engine::FundsEngine;

/// Both application services wired to the same storage backend.
pub struct Bank {
    pub engine: FundsEngine,
    pub accounts: AccountService,
}

impl Bank {
    pub fn new(ports: Ports, config: &BankConfig) -> Self {
        Self {
            engine: FundsEngine::new(ports.accounts.clone(), ports.units, config),
            accounts: AccountService::new(ports.accounts, ports.ledger, config),
        }
    }
}
