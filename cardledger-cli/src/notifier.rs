//! Terminal delivery of issued PINs when no mail gateway is configured

use colored::Colorize;

use cardledger_core::domain::result::Result;
use cardledger_core::ports::{Notifier, PinNotice};

/// Shows the PIN once on stderr, so it stays out of `--json` output
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_pin_issued(&self, notice: &PinNotice) -> Result<()> {
        eprintln!(
            "{} PIN for card {} ({}): {}",
            "!".yellow().bold(),
            notice.masked_number,
            notice.email,
            notice.pin.bold()
        );
        eprintln!("{}", "  This PIN is shown only once.".dimmed());
        Ok(())
    }
}
