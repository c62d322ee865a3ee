//! PIN notification adapters
//!
//! The webhook notifier hands a mail envelope to an HTTP mail gateway.
//! Delivery is best-effort: callers log failures and carry on.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::{Notifier, PinNotice};

/// Default request timeout for the mail gateway
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// JSON body posted to the mail gateway
#[derive(Debug, Serialize)]
struct MailEnvelope<'a> {
    to: &'a str,
    subject: &'a str,
    body: String,
}

/// Posts PIN notices to an HTTP mail gateway
#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: Url,
}

impl WebhookNotifier {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("Invalid notification URL: {}", e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Notification URL must use http or https, got {}",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Notification(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Notification(format!("Mail gateway timed out: {}", self.endpoint))
        } else if error.is_connect() {
            Error::Notification(format!("Unable to connect to mail gateway: {}", self.endpoint))
        } else {
            Error::Notification(format!("Mail gateway request failed: {}", error))
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify_pin_issued(&self, notice: &PinNotice) -> Result<()> {
        let envelope = MailEnvelope {
            to: &notice.email,
            subject: "Your new card PIN",
            body: format!(
                "A new card {} has been issued. Your PIN code is {}.",
                notice.masked_number, notice.pin
            ),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&envelope)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(Error::Notification(format!(
                "Mail gateway answered HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

/// Drops every notice
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify_pin_issued(&self, _notice: &PinNotice) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn notice() -> PinNotice {
        PinNotice {
            user_id: UserId::new(3).unwrap(),
            email: "owner@example.com".to_string(),
            masked_number: "25••••••••••421".to_string(),
            pin: "0420".to_string(),
        }
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(WebhookNotifier::new("not a url", 5), Err(Error::Config(_))));
        assert!(matches!(
            WebhookNotifier::new("ftp://mail.example.com/send", 5),
            Err(Error::Config(_))
        ));
        assert!(WebhookNotifier::new("https://mail.example.com/send", 5).is_ok());
    }

    #[test]
    fn test_unreachable_gateway_is_notification_error() {
        // port 9 (discard) is closed on test machines
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/send", 2).unwrap();
        let err = notifier.notify_pin_issued(&notice()).unwrap_err();
        assert!(matches!(err, Error::Notification(_)));
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_notice_debug_hides_pin() {
        let rendered = format!("{:?}", notice());
        assert!(!rendered.contains("0420"));
    }

    #[test]
    fn test_null_notifier() {
        assert!(NullNotifier.notify_pin_issued(&notice()).is_ok());
    }
}
