//! CardLedger CLI - cards, balances and transfers in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use cardledger_core::Currency;

mod commands;
mod notifier;
mod output;

use commands::{balance, card, logs, transfer, user};

/// CardLedger - card issuance and transfers
#[derive(Parser)]
#[command(name = "cardledger", version, about, long_about = None)]
struct Cli {
    /// Acting user id
    #[arg(long, short, global = true, env = "CARDLEDGER_USER")]
    user: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register and inspect users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Issue and manage cards
    Card {
        #[command(subcommand)]
        command: card::CardCommands,
    },

    /// Open, list and remove card balances
    Balance {
        #[command(subcommand)]
        command: balance::BalanceCommands,
    },

    /// Put money onto a card balance
    Deposit {
        /// Card number
        card: String,
        /// Balance currency (UAH, USD, PLN)
        currency: Currency,
        /// Amount, at most two decimal places
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take money off a card balance
    Withdraw {
        /// Card number
        card: String,
        /// Balance currency (UAH, USD, PLN)
        currency: Currency,
        /// Amount, at most two decimal places
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send money from one of your cards to another card
    Transfer {
        /// Sender card number (must be yours)
        from: String,
        /// Receiver card number
        to: String,
        /// Currency both balances hold
        currency: Currency,
        /// Amount, at most two decimal places
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show transactions of one of your cards
    History {
        /// Card number
        card: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let user = cli.user;
    match cli.command {
        Commands::User { command } => user::run(user, command),
        Commands::Card { command } => card::run(user, command),
        Commands::Balance { command } => balance::run(user, command),
        Commands::Deposit { card, currency, amount, json } => {
            balance::run_deposit(user, &card, currency, amount, json)
        }
        Commands::Withdraw { card, currency, amount, json } => {
            balance::run_withdraw(user, &card, currency, amount, json)
        }
        Commands::Transfer { from, to, currency, amount, json } => {
            transfer::run(user, from, to, currency, amount, json)
        }
        Commands::History { card, json } => transfer::run_history(user, &card, json),
        Commands::Logs { command } => logs::run(user, command),
    }
}
