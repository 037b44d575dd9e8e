use clap::{Parser, Subcommand, ValueEnum};
use fininvest::application::ledger::ContributionLedger;
use fininvest::domain::money::Amount;
use fininvest::domain::ports::{DueStoreBox, SettlementStoreBox};
use fininvest::infrastructure::in_memory::InMemoryLedgerStore;
use fininvest::interfaces::csv::due_reader::DueReader;
use fininvest::interfaces::csv::payment_reader::PaymentReader;
use fininvest::interfaces::csv::writer::{LedgerWriter, write_plan_json};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load dues, settle every payment in order and print the final dues
    Settle {
        /// Input dues CSV file
        dues: PathBuf,

        /// Input payments CSV file
        payments: PathBuf,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long, env = "FININVEST_DB_PATH")]
        db_path: Option<PathBuf>,

        /// Also write bank account balances to this CSV file
        #[arg(long, env = "FININVEST_ACCOUNTS_OUT")]
        accounts_out: Option<PathBuf>,
    },
    /// Show how a payment would be distributed without recording it
    Preview {
        /// Input dues CSV file
        dues: PathBuf,

        #[arg(long)]
        member: u32,

        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,

        /// Restrict the payment to these due ids (repeatable)
        #[arg(long = "due")]
        due: Vec<u32>,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Settle {
            dues,
            payments,
            db_path,
            accounts_out,
        } => settle(&dues, &payments, db_path, accounts_out).await,
        Command::Preview {
            dues,
            member,
            amount,
            due,
            format,
        } => preview(&dues, member, amount, &due, format).await,
    }
}

async fn settle(
    dues: &Path,
    payments: &Path,
    db_path: Option<PathBuf>,
    accounts_out: Option<PathBuf>,
) -> Result<()> {
    let ledger = open_ledger(db_path)?;
    load_dues(&ledger, dues).await?;

    let file = File::open(payments).into_diagnostic()?;
    let reader = PaymentReader::new(file);
    for request in reader.payments() {
        match request {
            Ok(request) => {
                if let Err(e) = ledger.pay(request).await {
                    warn!("Error processing payment: {}", e);
                }
            }
            Err(e) => {
                warn!("Error reading payment: {}", e);
            }
        }
    }

    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    writer
        .write_dues(&ledger.dues().await.into_diagnostic()?)
        .into_diagnostic()?;

    if let Some(path) = accounts_out {
        let file = File::create(&path).into_diagnostic()?;
        LedgerWriter::new(file)
            .write_bank_accounts(&ledger.bank_accounts().await.into_diagnostic()?)
            .into_diagnostic()?;
        info!(path = %path.display(), "bank balances written");
    }

    Ok(())
}

async fn preview(
    dues: &Path,
    member: u32,
    amount: Decimal,
    selection: &[u32],
    format: Format,
) -> Result<()> {
    let amount = Amount::new(amount).into_diagnostic()?;
    let ledger = open_ledger(None)?;
    load_dues(&ledger, dues).await?;

    let plan = ledger
        .preview(member, amount, (!selection.is_empty()).then_some(selection))
        .await
        .into_diagnostic()?;

    let stdout = io::stdout();
    match format {
        Format::Csv => LedgerWriter::new(stdout.lock()).write_plan(&plan),
        Format::Json => write_plan_json(stdout.lock(), &plan),
    }
    .into_diagnostic()
}

async fn load_dues(ledger: &ContributionLedger, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let mut loaded = 0usize;
    for due in DueReader::new(file).dues() {
        match due {
            Ok(due) => match ledger.register_due(due).await {
                Ok(()) => loaded += 1,
                Err(e) => warn!("Skipping due: {}", e),
            },
            Err(e) => {
                warn!("Error reading due: {}", e);
            }
        }
    }
    info!(loaded, "dues loaded");
    Ok(())
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<ContributionLedger> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        use fininvest::infrastructure::rocksdb::RocksDBStore;

        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        let dues: DueStoreBox = Box::new(store.clone());
        let settlements: SettlementStoreBox = Box::new(store);
        return Ok(ContributionLedger::new(dues, settlements));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }

    let store = InMemoryLedgerStore::new();
    let dues: DueStoreBox = Box::new(store.clone());
    let settlements: SettlementStoreBox = Box::new(store);
    Ok(ContributionLedger::new(dues, settlements))
}
