use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{AppError, BankService};
use crate::domain::{
    format_cents, format_signed_cents, format_total_cents, parse_cents, Account, AccountId,
    AccountRole, AccountStatus, Transaction, TransferPolicy, TransferRequest,
};

/// Poco Ledger - accounts and transfers for the Poco banking demo
#[derive(Parser)]
#[command(name = "poco-ledger")]
#[command(about = "Account ledger with atomic transfers and an append-only history")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "poco.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Let admin accounts send money whatever their status
    #[arg(long, global = true)]
    pub admin_override: bool,

    /// Accept transfers into suspended or pending accounts
    #[arg(long, global = true)]
    pub allow_inactive_recipient: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Transfer money between accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account id
        #[arg(long)]
        from: String,

        /// Destination account id
        #[arg(long)]
        to: String,

        /// Description of the transfer
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show an account statement, newest first
    History {
        /// Account id
        account: String,

        /// Maximum number of lines to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the most recent activity of an account
    Recent {
        /// Account id
        account: String,

        /// Number of transactions
        #[arg(short, default_value = "3")]
        n: usize,
    },

    /// List the whole transaction log, newest first
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show ledger totals
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, accounts, snapshot
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Provision the sample admin and user accounts
    Demo,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Provision a new account
    Open {
        /// Account id (generated if omitted)
        #[arg(long)]
        id: Option<String>,

        /// Opening balance (e.g., "1500.00")
        #[arg(short, long, default_value = "0")]
        balance: String,

        /// Role: admin, user
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Status: active, suspended, pending
        #[arg(short, long, default_value = "active")]
        status: String,
    },

    /// List all accounts
    List,

    /// Show detailed account information
    Show {
        /// Account id
        id: String,
    },

    /// Change an account's status
    Status {
        /// Account id
        id: String,

        /// New status: active, suspended, pending
        status: String,
    },
}

impl Cli {
    fn policy(&self) -> TransferPolicy {
        TransferPolicy::default()
            .with_admin_override(self.admin_override)
            .with_recipient_must_be_active(!self.allow_inactive_recipient)
    }

    pub async fn run(self) -> Result<()> {
        let policy = self.policy();

        if let Commands::Init = self.command {
            let service = BankService::init(&self.database, policy).await?;
            service.shutdown().await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = BankService::connect(&self.database, policy)
            .await
            .with_context(|| format!("Failed to open ledger at {}", self.database))?;

        let outcome = match self.command {
            Commands::Init => Ok(()),

            Commands::Account(account_cmd) => run_account_command(&service, account_cmd).await,

            Commands::Transfer {
                amount,
                from,
                to,
                description,
            } => run_transfer_command(&service, &amount, &from, &to, description).await,

            Commands::History { account, limit } => {
                run_history_command(&service, &account, limit)
            }

            Commands::Recent { account, n } => run_recent_command(&service, &account, n),

            Commands::Transactions { limit } => run_transactions_command(&service, limit),

            Commands::Check => run_check_command(&service),

            Commands::Export {
                export_type,
                output,
            } => run_export_command(&service, &export_type, output.as_deref()),

            Commands::Demo => run_demo_command(&service).await,
        };

        // Flush even when the command failed; rejected commands leave state unchanged.
        service.shutdown().await?;
        outcome
    }
}

fn parse_account_id(input: &str) -> Result<AccountId, AppError> {
    Uuid::parse_str(input.trim()).map_err(|_| AppError::InvalidAccountId(input.to_string()))
}

fn parse_amount(input: &str) -> Result<i64, AppError> {
    parse_cents(input).map_err(|source| AppError::InvalidAmount {
        input: input.to_string(),
        source,
    })
}

async fn run_account_command(service: &BankService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Open {
            id,
            balance,
            role,
            status,
        } => {
            let id = match id {
                Some(id) => parse_account_id(&id)?,
                None => Uuid::new_v4(),
            };
            let balance = parse_amount(&balance)?;
            let role = AccountRole::parse(&role).ok_or(AppError::InvalidRole(role))?;
            let status = AccountStatus::parse(&status).ok_or(AppError::InvalidStatus(status))?;

            let account = service
                .open_account(Account::new(id, balance, role).with_status(status))
                .await?;
            println!(
                "Opened {} account {} with balance {}",
                account.role,
                account.id,
                format_cents(account.balance())
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts()?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<38} {:<6} {:<10} {:>14}",
                    "ID", "ROLE", "STATUS", "BALANCE"
                );
                println!("{}", "-".repeat(71));
                for account in accounts {
                    println!(
                        "{:<38} {:<6} {:<10} {:>14}",
                        account.id,
                        account.role,
                        account.status,
                        format_cents(account.balance())
                    );
                }
            }
        }

        AccountCommands::Show { id } => {
            let id = parse_account_id(&id)?;
            let account = service.get_account(id)?;
            let summary = service.history().activity_summary(id)?;

            println!("Account: {}", account.id);
            println!("  Role:           {}", account.role);
            println!("  Status:         {}", account.status);
            println!(
                "  Opened:         {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Balance:        {}", format_cents(summary.balance));
            println!(
                "  Transactions:   {} ({} in, {} out)",
                summary.incoming_count + summary.outgoing_count,
                summary.incoming_count,
                summary.outgoing_count
            );
            println!("  Received:       {}", format_cents(summary.total_in));
            println!("  Sent:           {}", format_cents(summary.total_out));
            if let Some(last) = summary.last_activity {
                println!("  Last activity:  {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        AccountCommands::Status { id, status } => {
            let id = parse_account_id(&id)?;
            let status = AccountStatus::parse(&status).ok_or(AppError::InvalidStatus(status))?;
            let account = service.set_status(id, status).await?;
            println!("Account {} is now {}", account.id, account.status);
        }
    }
    Ok(())
}

async fn run_transfer_command(
    service: &BankService,
    amount: &str,
    from: &str,
    to: &str,
    description: Option<String>,
) -> Result<()> {
    let from = parse_account_id(from)?;
    let to = parse_account_id(to)?;
    let request = TransferRequest::parse(from, to, amount, description)
        .map_err(AppError::from)
        .context("Use an amount like '50.00' or '50'")?;

    let transaction = service.transfer(request).await?;

    println!(
        "Transferred {} {} -> {} (#{})",
        format_cents(transaction.amount),
        short_id(&transaction.from_account_id),
        short_id(&transaction.to_account_id),
        transaction.id
    );
    Ok(())
}

fn run_history_command(service: &BankService, account: &str, limit: Option<usize>) -> Result<()> {
    let account_id = parse_account_id(account)?;
    let lines = service.history().statement(account_id, limit)?;

    if lines.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<17} {:<7} {:>12} {:>14} {:<9} DESCRIPTION",
        "#", "DATE", "TYPE", "AMOUNT", "BALANCE", "WITH"
    );
    println!("{}", "-".repeat(86));
    for line in lines {
        let counterparty = line
            .transaction
            .counterparty(account_id)
            .map(|id| short_id(&id))
            .unwrap_or_default();
        println!(
            "{:<6} {:<17} {:<7} {:>12} {:>14} {:<9} {}",
            line.transaction.id,
            line.transaction.timestamp.format("%Y-%m-%d %H:%M"),
            line.direction,
            format_signed_cents(line.signed_amount),
            format_cents(line.balance_after),
            counterparty,
            truncate(&line.transaction.description, 30)
        );
    }
    Ok(())
}

fn run_recent_command(service: &BankService, account: &str, n: usize) -> Result<()> {
    let account_id = parse_account_id(account)?;
    let recent = service.history().recent_activity(account_id, n)?;

    if recent.is_empty() {
        println!("No recent transactions");
        return Ok(());
    }

    for transaction in recent {
        let label = match transaction.direction_for(account_id) {
            Some(crate::domain::Direction::Debit) => "Sent to",
            _ => "Received from",
        };
        let counterparty = transaction
            .counterparty(account_id)
            .map(|id| short_id(&id))
            .unwrap_or_default();
        println!(
            "{:<14} {:<9} {:>12}  {}",
            label,
            counterparty,
            format_signed_cents(transaction.signed_amount(account_id).unwrap_or_default()),
            transaction.timestamp.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn run_transactions_command(service: &BankService, limit: Option<usize>) -> Result<()> {
    let transactions = service.list_transactions(limit)?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<17} {:>12} {:<9} {:<9} DESCRIPTION",
        "#", "DATE", "AMOUNT", "FROM", "TO"
    );
    println!("{}", "-".repeat(76));
    for transaction in &transactions {
        print_transaction(transaction);
    }
    Ok(())
}

fn print_transaction(transaction: &Transaction) {
    println!(
        "{:<6} {:<17} {:>12} {:<9} {:<9} {}",
        transaction.id,
        transaction.timestamp.format("%Y-%m-%d %H:%M"),
        format_cents(transaction.amount),
        short_id(&transaction.from_account_id),
        short_id(&transaction.to_account_id),
        truncate(&transaction.description, 30)
    );
}

fn run_check_command(service: &BankService) -> Result<()> {
    let store = service.store();
    let snapshot = store.snapshot()?;

    println!("Accounts:      {}", snapshot.accounts.len());
    println!("Transactions:  {}", snapshot.transactions.len());
    println!("Total balance: {}", format_total_cents(snapshot.total_balance()));

    let by_status = |status: AccountStatus| {
        snapshot
            .accounts
            .iter()
            .filter(|a| a.status == status)
            .count()
    };
    println!();
    println!("  active:    {}", by_status(AccountStatus::Active));
    println!("  suspended: {}", by_status(AccountStatus::Suspended));
    println!("  pending:   {}", by_status(AccountStatus::Pending));
    Ok(())
}

fn run_export_command(service: &BankService, export_type: &str, output: Option<&str>) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service.store());

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "accounts" => {
            let count = exporter.export_accounts_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} accounts", count);
            }
        }
        "snapshot" => {
            let export = exporter.export_snapshot_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported snapshot: {} accounts, {} transactions",
                    export.snapshot.accounts.len(),
                    export.snapshot.transactions.len()
                );
            }
        }
        other => {
            anyhow::bail!(
                "Unknown export type '{}'. Use transactions, accounts or snapshot",
                other
            );
        }
    }
    Ok(())
}

async fn run_demo_command(service: &BankService) -> Result<()> {
    match service.seed_demo().await? {
        Some(seed) => {
            println!(
                "Admin: {} ({})",
                seed.admin.id,
                format_cents(seed.admin.balance())
            );
            println!(
                "User:  {} ({})",
                seed.user.id,
                format_cents(seed.user.balance())
            );
            print_transaction(&seed.transaction);
        }
        None => println!("Ledger already has accounts; demo data not added."),
    }
    Ok(())
}

fn short_id(id: &AccountId) -> String {
    let mut text = id.to_string();
    text.truncate(8);
    text
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
