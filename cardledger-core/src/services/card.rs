//! Card service - issuance and status management

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::{NaiveDate, Utc};

use crate::config::IssuanceSettings;
use crate::domain::card_number::{self, SUFFIX_MAX, SUFFIX_MIN};
use crate::domain::result::{Error, Result};
use crate::domain::{Card, CardStatus, CardType, User, UserId};
use crate::ports::{Notifier, PinNotice, Repository, SecureRandom, UnitOfWork};
use crate::services::identity::Caller;
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::pin::PinHasher;

/// Whole-issuance retries when a concurrent issuer took the same number
/// between the probe and the commit
const COMMIT_ATTEMPTS: u32 = 3;

const VERIFICATION_CODE_LEN: usize = 3;
const PIN_LEN: usize = 4;

pub struct CardService {
    repository: Arc<dyn Repository>,
    random: Arc<dyn SecureRandom>,
    notifier: Arc<dyn Notifier>,
    logger: Arc<LoggingService>,
    hasher: PinHasher,
    settings: IssuanceSettings,
    deliveries: Mutex<Vec<JoinHandle<()>>>,
}

impl CardService {
    pub fn new(
        repository: Arc<dyn Repository>,
        random: Arc<dyn SecureRandom>,
        notifier: Arc<dyn Notifier>,
        logger: Arc<LoggingService>,
        hasher: PinHasher,
        settings: IssuanceSettings,
    ) -> Self {
        Self {
            repository,
            random,
            notifier,
            logger,
            hasher,
            settings,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Issue a new card to the caller.
    ///
    /// The card and the caller's new PIN hash are committed together. The
    /// plaintext PIN leaves only through the notifier, on a background
    /// thread started after the commit; the card is returned without waiting
    /// for delivery.
    pub fn issue(&self, caller: &Caller, card_type: CardType) -> Result<Card> {
        let owner = caller.id();
        let limit = self.settings.max_cards_per_user;
        if self.repository.count_active_cards(owner)? >= limit {
            return Err(Error::IssuanceLimitReached(limit));
        }
        let user = self.repository.find_user(owner)?.ok_or(Error::UserNotFound)?;

        let mut attempt = 1;
        loop {
            let number = self.allocate_number(owner)?;
            let verification_code = self.random.digits(VERIFICATION_CODE_LEN);
            let pin = self.random.digits(PIN_LEN);
            let pin_hash = self.hasher.hash(&pin, self.random.as_ref())?;

            let card = Card::issue(
                number,
                card_type,
                verification_code,
                owner,
                Utc::now(),
                self.settings.validity_months,
            );

            let mut uow = UnitOfWork::begin(self.repository.as_ref());
            uow.insert_card(&card);
            uow.set_user_pin(owner, pin_hash);

            match uow.commit() {
                Ok(()) => {
                    let _ = self.logger.log(
                        LogEvent::new("card_issued")
                            .with_operation("issue_card")
                            .with_user(owner)
                            .with_card(&card.number),
                    );
                    self.send_pin(&user, &card, pin);
                    return Ok(card);
                }
                Err(e) if e.is_unique_violation() && attempt < COMMIT_ATTEMPTS => {
                    let _ = self.logger.log(
                        LogEvent::new("card_number_collision")
                            .with_operation("issue_card")
                            .with_user(owner)
                            .with_card(&card.number),
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Probe for a number no card holds yet
    fn allocate_number(&self, owner: UserId) -> Result<String> {
        let attempts = self.settings.number_attempts;
        for _ in 0..attempts {
            let suffix = self.random.in_range(SUFFIX_MIN, SUFFIX_MAX);
            let number = card_number::compose(suffix, owner);
            if !self.repository.card_number_exists(&number)? {
                return Ok(number);
            }
        }
        Err(Error::CardNumberSpaceExhausted(attempts))
    }

    /// Start best-effort delivery of the PIN notice off the caller's thread
    fn send_pin(&self, user: &User, card: &Card, pin: String) {
        let notice = PinNotice {
            user_id: user.id,
            email: user.email.clone(),
            masked_number: card_number::mask(&card.number),
            pin,
        };
        let notifier = Arc::clone(&self.notifier);
        let logger = Arc::clone(&self.logger);
        let number = card.number.clone();

        let spawned = thread::Builder::new()
            .name("pin-notice".to_string())
            .spawn(move || deliver_pin(notifier.as_ref(), &logger, &notice, &number));

        match spawned {
            Ok(handle) => {
                let mut deliveries = self.deliveries.lock().unwrap_or_else(PoisonError::into_inner);
                deliveries.retain(|pending| !pending.is_finished());
                deliveries.push(handle);
            }
            Err(e) => log_pin_failure(&self.logger, user.id, &card.number, e.to_string()),
        }
    }

    /// Block until every PIN notice started so far has been handed to the
    /// notifier. Short-lived processes call this before exiting.
    pub fn wait_for_notifications(&self) {
        let pending: Vec<_> = self
            .deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in pending {
            let _ = handle.join();
        }
    }

    pub fn list_cards(&self, caller: &Caller) -> Result<Vec<Card>> {
        self.repository.list_cards(caller.id())
    }

    /// Change the status of one of the caller's cards.
    ///
    /// `Expired` is never accepted as a target, and an expired card stays
    /// expired.
    pub fn set_status(&self, caller: &Caller, number: &str, status: CardStatus) -> Result<Card> {
        if status == CardStatus::Expired {
            return Err(Error::InvalidTargetStatus);
        }

        let mut card = self
            .repository
            .find_card(number, caller.id())?
            .ok_or(Error::CardNotOwnedOrInvalid)?;

        if card.status == CardStatus::Expired {
            return Err(Error::CardExpired);
        }
        if card.status == status {
            return Ok(card);
        }

        let mut uow = UnitOfWork::begin(self.repository.as_ref());
        uow.set_card_status(card.id, status);
        uow.commit()?;

        let _ = self.logger.log(
            LogEvent::new("card_status_changed")
                .with_operation(format!("set_status:{}", status))
                .with_user(caller.id())
                .with_card(&card.number),
        );

        card.status = status;
        Ok(card)
    }

    /// Mark every card whose expire date is before `today` as Expired, in
    /// one unit of work. Returns how many cards changed.
    pub fn expire_overdue(&self, today: NaiveDate) -> Result<usize> {
        let overdue = self.repository.cards_expiring_before(today)?;
        if overdue.is_empty() {
            return Ok(0);
        }

        let mut uow = UnitOfWork::begin(self.repository.as_ref());
        for card in &overdue {
            uow.set_card_status(card.id, CardStatus::Expired);
        }
        uow.commit()?;

        let _ = self.logger.log(
            LogEvent::new("cards_expired")
                .with_operation("expire_overdue")
                .with_error_details(format!("{} card(s) before {}", overdue.len(), today)),
        );
        Ok(overdue.len())
    }

    /// Check a PIN against the caller's stored hash
    pub fn verify_pin(&self, caller: &Caller, pin: &str) -> Result<bool> {
        let user = self
            .repository
            .find_user(caller.id())?
            .ok_or(Error::UserNotFound)?;
        match user.pin_hash {
            Some(phc) => self.hasher.verify(pin, &phc),
            None => Ok(false),
        }
    }
}

/// Failure is logged and never undoes issuance
fn deliver_pin(notifier: &dyn Notifier, logger: &LoggingService, notice: &PinNotice, number: &str) {
    if let Err(e) = notifier.notify_pin_issued(notice) {
        log_pin_failure(logger, notice.user_id, number, e.to_string());
    }
}

fn log_pin_failure(logger: &LoggingService, user_id: UserId, number: &str, error: String) {
    let _ = logger.log(
        LogEvent::new("pin_notification_failed")
            .with_operation("issue_card")
            .with_user(user_id)
            .with_card(number)
            .with_error(error),
    );
}
