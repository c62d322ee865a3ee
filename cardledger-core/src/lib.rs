//! CardLedger Core - card issuance, balance custody and atomic transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Card, CardBalance, Transaction, money rules)
//! - **ports**: Trait definitions for external dependencies (Repository, SecureRandom, Notifier)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, OS randomness, mail gateway)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use adapters::notifier::{NullNotifier, WebhookNotifier};
use adapters::random::OsRandom;
use config::Config;
use ports::{Notifier, Repository, SecureRandom};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult};
pub use domain::{Card, CardBalance, CardStatus, CardType, Currency, Transaction, User, UserId};

/// Main context for CardLedger operations
///
/// Holds the storage handle, configuration, log store and all services.
pub struct BankContext {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    pub logger: Arc<LoggingService>,
    pub identity_service: IdentityService,
    pub card_service: CardService,
    pub availability_service: Arc<AvailabilityService>,
    pub balance_service: BalanceService,
    pub transfer_service: TransferService,
}

impl BankContext {
    /// Open the ledger in `data_dir`. PIN notices go to the configured
    /// mail gateway, or nowhere when none is configured.
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        Self::with_fallback_notifier(data_dir, entry_point, Arc::new(NullNotifier))
    }

    /// Like [`new`](Self::new), with `fallback` receiving PIN notices when
    /// no mail gateway is configured
    pub fn with_fallback_notifier(
        data_dir: &Path,
        entry_point: EntryPoint,
        fallback: Arc<dyn Notifier>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join("cardledger.duckdb"))?);
        repository.ensure_schema()?;

        let logger = Arc::new(LoggingService::new(
            data_dir,
            entry_point,
            env!("CARGO_PKG_VERSION"),
        )?);

        let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url, config.notifications.timeout_secs)?),
            None => fallback,
        };

        Ok(Self::from_parts(
            config,
            repository,
            Arc::new(OsRandom),
            notifier,
            logger,
        )?)
    }

    /// Assemble a context from already built collaborators
    pub fn from_parts(
        config: Config,
        repository: Arc<dyn Repository>,
        random: Arc<dyn SecureRandom>,
        notifier: Arc<dyn Notifier>,
        logger: Arc<LoggingService>,
    ) -> domain::result::Result<Self> {
        let hasher = PinHasher::new(&config.pin_hash)?;
        let availability_service = Arc::new(AvailabilityService::new(Arc::clone(&repository)));

        let identity_service = IdentityService::new(Arc::clone(&repository));
        let card_service = CardService::new(
            Arc::clone(&repository),
            random,
            notifier,
            Arc::clone(&logger),
            hasher,
            config.issuance.clone(),
        );
        let balance_service = BalanceService::new(
            Arc::clone(&repository),
            Arc::clone(&availability_service),
            Arc::clone(&logger),
        );
        let transfer_service = TransferService::new(
            Arc::clone(&repository),
            Arc::clone(&availability_service),
            Arc::clone(&logger),
        );

        Ok(Self {
            config,
            repository,
            logger,
            identity_service,
            card_service,
            availability_service,
            balance_service,
            transfer_service,
        })
    }

    /// Resolve the caller for a raw user id
    pub fn caller(&self, user_id: i64) -> domain::result::Result<Caller> {
        self.identity_service.resolve(user_id)
    }

    /// Convert a service result for the outside world, logging hidden causes
    pub fn guard<T>(&self, operation: &str, result: domain::result::Result<T>) -> OperationResult<T> {
        guarded(&self.logger, operation, result)
    }
}
