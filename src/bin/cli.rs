//! utxostore CLI
//!
//! Thin command-line shell over a store directory. Every subcommand opens
//! the store, calls the public API, and closes it again.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use utxostore::{make_outpoint, Config, Outpoint, UtxoStore, TXID_SIZE};

/// utxostore CLI
#[derive(Parser, Debug)]
#[command(name = "utxostore-cli")]
#[command(about = "CLI for the utxostore embedded UTXO store")]
struct Args {
    /// Store data directory
    #[arg(short, long, default_value = "./utxostore_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find a UTXO by outpoint
    Get {
        /// Transaction id (64 hex chars)
        txid: String,
        /// Output index
        index: u32,
    },

    /// Insert a UTXO
    Put {
        /// Transaction id (64 hex chars)
        txid: String,
        /// Output index
        index: u32,
        /// Creation block height
        height: u32,
        /// Payload (UTF-8 bytes)
        value: String,
    },

    /// Erase a UTXO (deferred if not in an active store)
    Del {
        /// Transaction id (64 hex chars)
        txid: String,
        /// Output index
        index: u32,
    },

    /// Process queued deferred deletions
    FlushPending {
        /// Maximum deletions to process
        #[arg(short, long, default_value_t = 1024)]
        batch_size: usize,
    },

    /// Compact all containers
    Compact,

    /// Print the sizing report
    Report,
}

fn parse_outpoint(txid: &str, index: u32) -> Result<Outpoint, String> {
    if txid.len() != TXID_SIZE * 2 {
        return Err(format!("txid must be {} hex chars", TXID_SIZE * 2));
    }
    let mut bytes = [0u8; TXID_SIZE];
    for (i, chunk) in txid.as_bytes().chunks(2).enumerate() {
        let hex = std::str::from_utf8(chunk).map_err(|_| "invalid txid".to_string())?;
        bytes[i] = u8::from_str_radix(hex, 16).map_err(|_| "invalid txid hex".to_string())?;
    }
    Ok(make_outpoint(&bytes, index))
}

fn main() {
    // Initialize tracing/logging
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut store = match UtxoStore::open(Config::builder().data_dir(&args.data_dir).build()) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let result = run(&mut store, &args.command);

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(store: &mut UtxoStore, command: &Commands) -> Result<(), String> {
    match command {
        Commands::Get { txid, index } => {
            let key = parse_outpoint(txid, *index)?;
            match store.find(&key).map_err(|e| e.to_string())? {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => println!("(not found)"),
            }
        }
        Commands::Put {
            txid,
            index,
            height,
            value,
        } => {
            let key = parse_outpoint(txid, *index)?;
            store
                .insert(&key, value.as_bytes(), *height)
                .map_err(|e| e.to_string())?;
            println!("OK");
        }
        Commands::Del { txid, index } => {
            let key = parse_outpoint(txid, *index)?;
            if store.erase(&key) {
                println!("erased");
            } else {
                println!("deferred ({} pending)", store.pending_deletions());
            }
        }
        Commands::FlushPending { batch_size } => {
            let outcome = store
                .process_pending_deletions(*batch_size)
                .map_err(|e| e.to_string())?;
            println!(
                "{} deleted, {} not found, {} still pending",
                outcome.deleted,
                outcome.not_found.len(),
                store.pending_deletions()
            );
        }
        Commands::Compact => {
            store.compact_all().map_err(|e| e.to_string())?;
            println!("compaction complete");
        }
        Commands::Report => {
            let report = store.get_sizing_report().map_err(|e| e.to_string())?;
            print!("{}", report);
        }
    }
    Ok(())
}
