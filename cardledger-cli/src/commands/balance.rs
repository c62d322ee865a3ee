//! Balance commands - per-currency balances on a card

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;
use serde_json::json;

use cardledger_core::{CardBalance, Currency};

use super::{get_context, report, require_user};
use crate::output;

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Open an empty balance in a currency
    Add {
        /// Card number
        card: String,
        /// Currency (UAH, USD, PLN)
        currency: Currency,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List balances of a card
    List {
        /// Card number
        card: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an empty balance
    Remove {
        /// Card number
        card: String,
        /// Currency (UAH, USD, PLN)
        currency: Currency,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_balance(card: &str, balance: &CardBalance) {
    output::success(&format!(
        "{} {} on card {}",
        output::format_amount(balance.amount),
        balance.currency,
        card
    ));
}

pub fn run(user: Option<i64>, command: BalanceCommands) -> Result<()> {
    let ctx = get_context()?;
    let user_id = require_user(user)?;

    match command {
        BalanceCommands::Add { card, currency, json } => {
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.balance_service.open_balance(&caller, &card, currency));
            report(&ctx, "balance_add", result, json, |balance| {
                output::success(&format!("Opened {} balance on card {}", balance.currency, card));
            })
        }
        BalanceCommands::List { card, json } => {
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.balance_service.list_balances(&caller, &card));
            report(&ctx, "balance_list", result, json, |balances| {
                if balances.is_empty() {
                    println!("No balances on this card. Open one with: cardledger balance add");
                    return;
                }
                let mut table = output::create_table();
                table.set_header(vec!["Currency", "Amount"]);
                for balance in balances {
                    table.add_row(vec![
                        Cell::new(balance.currency.code()),
                        Cell::new(output::format_amount(balance.amount))
                            .set_alignment(CellAlignment::Right),
                    ]);
                }
                println!("{}", table);
            })
        }
        BalanceCommands::Remove { card, currency, json } => {
            let result = ctx
                .caller(user_id)
                .and_then(|caller| ctx.balance_service.close_balance(&caller, &card, currency))
                .map(|()| json!({ "card": card, "currency": currency, "removed": true }));
            report(&ctx, "balance_remove", result, json, |_| {
                output::success(&format!("Removed {} balance", currency));
            })
        }
    }
}

pub fn run_deposit(
    user: Option<i64>,
    card: &str,
    currency: Currency,
    amount: Decimal,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let user_id = require_user(user)?;
    let result = ctx
        .caller(user_id)
        .and_then(|caller| ctx.balance_service.deposit(&caller, card, currency, amount));
    report(&ctx, "deposit", result, json, |balance| print_balance(card, balance))
}

pub fn run_withdraw(
    user: Option<i64>,
    card: &str,
    currency: Currency,
    amount: Decimal,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let user_id = require_user(user)?;
    let result = ctx
        .caller(user_id)
        .and_then(|caller| ctx.balance_service.withdraw(&caller, card, currency, amount));
    report(&ctx, "withdraw", result, json, |balance| print_balance(card, balance))
}
