//! Card commands - issue, list and change card status

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use cardledger_core::{CardStatus, CardType};

use super::{get_context, report, require_user};
use crate::output;

#[derive(Subcommand)]
pub enum CardCommands {
    /// Issue a new card to the acting user
    Issue {
        /// Card type (debit, credit)
        #[arg(long = "type", default_value = "debit")]
        card_type: CardType,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the acting user's cards
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the status of one of your cards (active, limited, blocked)
    Status {
        /// Card number
        card: String,
        /// New status
        status: CardStatus,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark every card past its expiry date as expired
    ExpireOverdue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(user: Option<i64>, command: CardCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        CardCommands::Issue { card_type, json } => {
            let user_id = require_user(user)?;
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.card_service.issue(&caller, card_type));
            report(&ctx, "card_issue", result, json, |card| {
                output::success(&format!("Issued {} card {}", card.card_type, card.number));
                println!("  CVV: {}", card.verification_code);
                println!("  Expires: {}", card.expire_date);
            })?;
            ctx.card_service.wait_for_notifications();
            Ok(())
        }
        CardCommands::List { json } => {
            let user_id = require_user(user)?;
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.card_service.list_cards(&caller));
            report(&ctx, "card_list", result, json, |cards| {
                if cards.is_empty() {
                    println!("No cards yet. Issue one with: cardledger card issue");
                    return;
                }
                let mut table = output::create_table();
                table.set_header(vec!["Number", "Type", "Status", "Expires", "Issued"]);
                for card in cards {
                    table.add_row(vec![
                        comfy_table::Cell::new(&card.number),
                        comfy_table::Cell::new(card.card_type.as_str()),
                        output::status_cell(card.status),
                        comfy_table::Cell::new(card.expire_date.to_string()),
                        comfy_table::Cell::new(output::format_time(&card.created_at)),
                    ]);
                }
                println!("{}", table);
            })
        }
        CardCommands::Status { card, status, json } => {
            let user_id = require_user(user)?;
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.card_service.set_status(&caller, &card, status));
            report(&ctx, "card_status", result, json, |card| {
                output::success(&format!("Card {} is now {}", card.number, card.status));
            })
        }
        CardCommands::ExpireOverdue { json } => {
            let today = Utc::now().date_naive();
            let result = ctx
                .card_service
                .expire_overdue(today)
                .map(|expired| json!({ "expired": expired, "asOf": today }));
            report(&ctx, "card_expire_overdue", result, json, |summary| {
                match summary["expired"].as_u64().unwrap_or(0) {
                    0 => output::info("No overdue cards"),
                    n => output::success(&format!("Expired {} card(s)", n)),
                }
            })
        }
    }
}
