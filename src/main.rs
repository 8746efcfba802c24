use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pixkeys::PixKeyRegistrationCoordinator;
use pixkeys::config::CoordinatorConfig;
use pixkeys::domain::account::BankAccount;
use pixkeys::domain::ports::{BankAccountLookupBox, LocalKeyStoreBox};
use pixkeys::infrastructure::diagnostics::route_panics_through_tracing;
use pixkeys::infrastructure::in_memory::{
    InMemoryBankAccounts, InMemoryDirectory, InMemoryPixKeyStore,
};
use pixkeys::interfaces::csv::outcome_writer::OutcomeWriter;
use pixkeys::interfaces::csv::request_reader::{AccountReader, RequestReader};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Create-key requests CSV file (account,kind,key)
    input: PathBuf,

    /// Bank accounts CSV file (account,status)
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "PIXKEYS_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Timeout for each directory call, in milliseconds
    #[arg(long, env = "PIXKEYS_DIRECTORY_TIMEOUT_MS", default_value_t = 5000)]
    directory_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    route_panics_through_tracing();

    let cli = Cli::parse();

    let accounts = match &cli.accounts {
        Some(path) => read_accounts(path)?,
        None => Vec::new(),
    };
    let (account_lookup, key_store) = local_stores(cli.db_path.as_deref(), accounts)?;

    // The directory is simulated in-process; it starts empty on every run.
    let config = CoordinatorConfig::default()
        .with_directory_timeout(Duration::from_millis(cli.directory_timeout_ms));
    let coordinator = PixKeyRegistrationCoordinator::new(
        account_lookup,
        Box::new(InMemoryDirectory::new()),
        key_store,
    )
    .with_config(config);

    let file = File::open(&cli.input).into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    for request in RequestReader::new(file).requests() {
        match request {
            Ok(request) => {
                let outcome = coordinator
                    .create_key_raw(request.account, &request.key, &request.kind)
                    .await;
                writer.write_outcome(&request, &outcome).into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading request: {}", e);
            }
        }
    }

    Ok(())
}

fn read_accounts(path: &Path) -> Result<Vec<BankAccount>> {
    let file = File::open(path).into_diagnostic()?;
    let mut accounts = Vec::new();
    for account in AccountReader::new(file).accounts() {
        match account {
            Ok(account) => accounts.push(account),
            Err(e) => eprintln!("Error reading account: {}", e),
        }
    }
    Ok(accounts)
}

fn in_memory_stores(accounts: Vec<BankAccount>) -> (BankAccountLookupBox, LocalKeyStoreBox) {
    (
        Box::new(InMemoryBankAccounts::with_accounts(accounts)),
        Box::new(InMemoryPixKeyStore::new()),
    )
}

#[cfg(feature = "storage-rocksdb")]
fn local_stores(
    db_path: Option<&Path>,
    accounts: Vec<BankAccount>,
) -> Result<(BankAccountLookupBox, LocalKeyStoreBox)> {
    use pixkeys::infrastructure::rocksdb::RocksDBStore;

    let Some(db_path) = db_path else {
        return Ok(in_memory_stores(accounts));
    };
    let store = RocksDBStore::open(db_path).into_diagnostic()?;
    for account in &accounts {
        store.put_account(account).into_diagnostic()?;
    }
    Ok((Box::new(store.clone()), Box::new(store)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn local_stores(
    db_path: Option<&Path>,
    accounts: Vec<BankAccount>,
) -> Result<(BankAccountLookupBox, LocalKeyStoreBox)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores(accounts))
}
