//! MoneyWise CLI - a command-line client for the MoneyWise personal finance API.
//!
//! Logs in, keeps the session tokens in the configured credential store, and
//! reads or updates savings goals, incomes and expenses.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moneywise_core::models::{
    AmountUpdate, NewExpense, NewGoal, NewIncome, RegisterData, TransactionKind,
};
use moneywise_core::{ApiError, Config, IdentityError, SessionClient};

#[derive(Debug, Parser)]
#[command(name = "moneywise", version, about = "MoneyWise personal finance client")]
struct Cli {
    /// API base URL (overrides config and MONEYWISE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session tokens
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        lastname: String,
        #[arg(long)]
        email: String,
    },
    /// End the session and forget the stored tokens
    Logout,
    /// Show who is logged in
    Status,
    /// Savings goals
    #[command(subcommand)]
    Goals(GoalCommand),
    /// Incomes and expenses
    #[command(subcommand)]
    Finances(FinanceCommand),
    /// Ask the finance assistant
    Ask {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum GoalCommand {
    List,
    Add {
        name: String,
        target: f64,
        #[arg(long, default_value_t = 0.0)]
        current: f64,
        #[arg(long)]
        deadline: String,
    },
    Deposit {
        id: i64,
        amount: f64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum FinanceCommand {
    List,
    Income {
        name: String,
        amount: f64,
        #[arg(long, default_value = "")]
        icon: String,
    },
    Expense {
        name: String,
        amount: f64,
        #[arg(long, default_value = "")]
        icon: String,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let session_lost = err
                .downcast_ref::<ApiError>()
                .map(ApiError::requires_login)
                .unwrap_or(false);
            if session_lost {
                eprintln!("Session expired, run `moneywise login`");
            } else {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    debug!(api_url = %config.api_url, store = ?config.store, "Configuration loaded");

    let client = SessionClient::from_config(&config)?;

    match cli.command {
        Command::Login { email } => login(&client, &mut config, email).await,
        Command::Register {
            name,
            lastname,
            email,
        } => {
            let password = rpassword::prompt_password("Password: ")?;
            let data = RegisterData {
                name,
                lastname,
                email,
                password,
            };
            if !client.register(&data).await? {
                bail!("Registration was rejected");
            }
            println!("Account created");
            Ok(())
        }
        Command::Logout => {
            client.logout().await;
            println!("Logged out");
            Ok(())
        }
        Command::Status => status(&client),
        Command::Goals(command) => goals(&client, command).await,
        Command::Finances(command) => finances(&client, command).await,
        Command::Ask { prompt } => {
            let reply = client.ask_assistant(&prompt.join(" ")).await?;
            println!("{}", reply.text());
            Ok(())
        }
    }
}

async fn login(client: &SessionClient, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    if !client.login(&email, &password).await? {
        bail!("Invalid email or password");
    }
    info!("Logged in");

    config.last_email = Some(email.clone());
    if let Err(e) = config.save() {
        debug!(error = %e, "Could not remember email");
    }
    println!("Logged in as {}", email);
    Ok(())
}

fn status(client: &SessionClient) -> Result<()> {
    if client.session().credentials().map_err(ApiError::Store)?.is_none() {
        println!("Not logged in");
        return Ok(());
    }
    match client.identity() {
        Ok(Some(identity)) => {
            println!("Logged in as {} (user {})", identity.email, identity.id);
            if let Some(expires_at) = identity.expires_at {
                let state = if identity.is_expired() { "expired" } else { "expires" };
                println!("Access token {} {}", state, expires_at.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        Ok(None) => println!("Logged in"),
        Err(IdentityError::Store(e)) => return Err(ApiError::Store(e).into()),
        Err(IdentityError::Token(e)) => println!("Logged in (token unreadable: {})", e),
    }
    Ok(())
}

async fn goals(client: &SessionClient, command: GoalCommand) -> Result<()> {
    match command {
        GoalCommand::List => {
            let goals = client.fetch_goals(current_user_id(client)?).await?;
            if goals.is_empty() {
                println!("No goals yet");
            }
            for goal in goals {
                println!(
                    "{:>5}  {:<24} {:>10.2} / {:<10.2} {:>3}%  {}",
                    goal.id_goal.map(|id| id.to_string()).unwrap_or_default(),
                    goal.goal_name,
                    goal.current_amount,
                    goal.target_amount,
                    goal.progress_percent(),
                    goal.deadline.as_deref().unwrap_or("-"),
                );
            }
        }
        GoalCommand::Add {
            name,
            target,
            current,
            deadline,
        } => {
            if target <= 0.0 || current < 0.0 || current > target {
                bail!("Amounts must satisfy 0 <= current <= target and target > 0");
            }
            let goal = NewGoal {
                id_user: current_user_id(client)?,
                goal_name: name,
                target_amount: target,
                current_amount: current,
                deadline,
            };
            let created = client.create_goal(&goal).await?;
            println!("Created goal {}", created.goal_name);
        }
        GoalCommand::Deposit { id, amount } => {
            if amount <= 0.0 {
                bail!("Deposit must be positive");
            }
            let res = client
                .deposit_to_goal(&AmountUpdate {
                    id_goal: id,
                    new_amount: amount,
                })
                .await?;
            if !res.success {
                bail!(res.message.unwrap_or_else(|| "Deposit failed".to_string()));
            }
            println!("Deposited {:.2}", amount);
        }
        GoalCommand::Delete { id } => {
            let res = client.delete_goal(id).await?;
            if !res.success {
                bail!(res.message.unwrap_or_else(|| "Delete failed".to_string()));
            }
            println!("Deleted goal {}", id);
        }
    }
    Ok(())
}

async fn finances(client: &SessionClient, command: FinanceCommand) -> Result<()> {
    let finance = client.fetch_finance(current_user_id(client)?).await?;

    match command {
        FinanceCommand::List => {
            for (kind, name, amount) in finance.transactions() {
                let sign = match kind {
                    TransactionKind::Income => '+',
                    TransactionKind::Expense => '-',
                };
                println!("{}{:>10.2}  {}", sign, amount, name);
            }
            println!(
                "Income {:.2}  Expenses {:.2}  Balance {:.2}",
                finance.total_income(),
                finance.total_expenses(),
                finance.balance()
            );
        }
        FinanceCommand::Income { name, amount, icon } => {
            client
                .create_income(&NewIncome {
                    id_finance: finance.id_finance,
                    income_name: name,
                    amount,
                    icon,
                })
                .await?;
            println!("Income added");
        }
        FinanceCommand::Expense { name, amount, icon } => {
            client
                .create_expense(&NewExpense {
                    id_finance: finance.id_finance,
                    expense_name: name,
                    amount,
                    icon,
                })
                .await?;
            println!("Expense added");
        }
    }
    Ok(())
}

/// User id from the stored access token; data requests are scoped by it.
fn current_user_id(client: &SessionClient) -> Result<i64> {
    match client.identity() {
        Ok(Some(identity)) => Ok(identity.id),
        Ok(None) => Err(ApiError::Unauthorized.into()),
        Err(IdentityError::Store(e)) => Err(ApiError::Store(e).into()),
        Err(e @ IdentityError::Token(_)) => Err(e.into()),
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
