//! User commands - register users and check PINs

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;

use cardledger_core::{CardStatus, User};

use super::{get_context, report, require_user};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Email address
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the acting user
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a PIN against the acting user's current PIN
    VerifyPin {
        /// Four digit PIN
        pin: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct UserSummary {
    #[serde(flatten)]
    user: User,
    cards: usize,
    active_cards: usize,
    has_pin: bool,
}

pub fn run(user: Option<i64>, command: UserCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        UserCommands::Create { email, json } => {
            let result = ctx.identity_service.register(&email);
            report(&ctx, "user_create", result, json, |user| {
                output::success(&format!("Registered user {} ({})", user.id, user.email));
                output::info(&format!(
                    "Act as this user with --user {} or CARDLEDGER_USER={}",
                    user.id, user.id
                ));
            })
        }
        UserCommands::Show { json } => {
            let user_id = require_user(user)?;
            let result = ctx.caller(user_id).and_then(|caller| {
                let cards = ctx.card_service.list_cards(&caller)?;
                Ok(UserSummary {
                    active_cards: cards
                        .iter()
                        .filter(|c| c.status == CardStatus::Active)
                        .count(),
                    cards: cards.len(),
                    has_pin: caller.user().pin_hash.is_some(),
                    user: caller.user().clone(),
                })
            });
            report(&ctx, "user_show", result, json, |summary| {
                println!("{}", format!("User {}", summary.user.id).bold());
                println!("  Email: {}", summary.user.email);
                println!(
                    "  Registered: {}",
                    output::format_time(&summary.user.created_at)
                );
                println!("  Cards: {} ({} active)", summary.cards, summary.active_cards);
                if !summary.has_pin {
                    output::warning("  No PIN yet. One is issued with the first card.");
                }
            })
        }
        UserCommands::VerifyPin { pin, json } => {
            let user_id = require_user(user)?;
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.card_service.verify_pin(&caller, &pin));
            report(&ctx, "user_verify_pin", result, json, |matches| {
                if *matches {
                    output::success("PIN is correct");
                } else {
                    output::error("PIN does not match");
                }
            })
        }
    }
}
