//! Transfer commands - card-to-card transfers and history

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;

use cardledger_core::services::TransferRequest;
use cardledger_core::Currency;

use super::{get_context, report, require_user};
use crate::output;

pub fn run(
    user: Option<i64>,
    from: String,
    to: String,
    currency: Currency,
    amount: Decimal,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let user_id = require_user(user)?;
    let request = TransferRequest {
        sender: from,
        receiver: to,
        currency,
        amount,
    };

    let result = ctx
        .caller(user_id)
        .and_then(|caller| ctx.transfer_service.transfer(&caller, &request));
    report(&ctx, "transfer", result, json, |tx| {
        output::success(&format!(
            "{} Sent {} {} to {}",
            "✓".green(),
            output::format_amount(tx.amount),
            tx.sender_currency,
            request.receiver
        ));
        println!("  Transaction: {}", tx.id);
    })
}

pub fn run_history(user: Option<i64>, card: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = require_user(user)?;

    let lookup = ctx.caller(user_id).and_then(|caller| {
        let history = ctx.transfer_service.history(&caller, card)?;
        let card_id = ctx
            .card_service
            .list_cards(&caller)?
            .into_iter()
            .find(|c| c.number == card)
            .map(|c| c.id);
        Ok((card_id, history))
    });
    let (card_id, result) = match lookup {
        Ok((card_id, history)) => (card_id, Ok(history)),
        Err(e) => (None, Err(e)),
    };

    report(&ctx, "history", result, json, |history| {
        if history.is_empty() {
            println!("No transactions for this card.");
            return;
        }
        let mut table = output::create_table();
        table.set_header(vec!["Time", "Direction", "Amount", "Currency", "Description"]);
        for tx in history {
            let amount = output::format_amount(tx.amount);
            let (direction, signed) = if Some(tx.sender_card_id) == card_id {
                ("out".red().to_string(), format!("-{}", amount))
            } else {
                ("in".green().to_string(), format!("+{}", amount))
            };
            table.add_row(vec![
                Cell::new(output::format_time(&tx.occurred_at)),
                Cell::new(direction),
                Cell::new(signed).set_alignment(CellAlignment::Right),
                Cell::new(tx.sender_currency.code()),
                Cell::new(&tx.description),
            ]);
        }
        println!("{}", table);
    })
}
