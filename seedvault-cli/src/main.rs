//! SeedVault CLI
//!
//! Operator front end for the seed vault. Secrets and PINs are read from
//! stdin, one per line, so they never show up in the process list or shell
//! history:
//!
//! ```text
//! printf '%s\n%s\n' "$SEED" "$PIN" | seedvault save
//! printf '%s\n' "$PIN" | seedvault load
//! ```
//!
//! # Stores
//!
//! By default the seed goes into the OS keyring and the failed-attempt
//! counter into `<data-dir>/lockout.json`. With `--ephemeral` both live in
//! memory and disappear when the process exits.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seedvault_core::vault::INVALID_PIN_MESSAGE;
use seedvault_core::{
    load_config, JsonFileLockoutStore, MemoryLockoutStore, VaultConfig, VaultError, VaultManager,
};
use seedvault_securestore::MemoryStore;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// SeedVault - PIN-protected storage for a wallet recovery seed
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding config.json and the lockout state
    #[arg(long, global = true, default_value = ".seedvault")]
    data_dir: PathBuf,

    /// Keep everything in memory instead of the OS keyring
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a seed is stored and whether PIN entry is locked
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a seed. Reads the seed, then the PIN, from stdin
    Save,
    /// Print the seed. Reads the PIN from stdin
    Load,
    /// Delete the seed and its biometric escrow
    Delete,
    /// Replace the PIN. Reads the old PIN, then the new PIN, from stdin
    ChangePin,
    /// Manage biometric unlock
    Biometric {
        #[command(subcommand)]
        action: BiometricAction,
    },
    /// Clear the failed-attempt counter
    ResetAttempts,
}

#[derive(Subcommand, Debug)]
enum BiometricAction {
    /// Escrow the PIN behind biometrics. Reads the PIN from stdin
    Enable,
    /// Remove the escrowed PIN
    Disable,
    /// Print the seed after a biometric prompt
    Unlock,
}

fn main() {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seedvault=info,seedvault_core=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        debug!("{:?}", e);
        eprintln!("{}", user_message(&e));
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut vault = open_vault(&args.data_dir, args.ephemeral)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    match args.command {
        Command::Status { json } => {
            let status = vault.status()?;
            if json {
                println!("{}", serde_json::to_string(&status)?);
            } else {
                let storage = vault.storage_status()?;
                println!("Status:            {}", status);
                println!(
                    "Storage:           {}",
                    storage
                        .method
                        .map(|m| format!("{:?}", m))
                        .unwrap_or_else(|| "unavailable".into())
                );
                println!("Failed attempts:   {}", vault.failed_attempts());
                println!("Biometric unlock:  {}", vault.has_biometric_enabled()?);
            }
        }
        Command::Save => {
            let seed = read_secret(&mut input, "Seed phrase")?;
            let pin = read_secret(&mut input, "PIN")?;
            vault
                .save_secret(&seed, &pin)
                .context("Failed to save seed")?;
            println!("Seed saved.");
        }
        Command::Load => {
            let pin = read_secret(&mut input, "PIN")?;
            let seed = unlock(&mut vault, &pin)?;
            println!("{}", seed.as_str());
        }
        Command::Delete => {
            vault.delete_secret().context("Failed to delete seed")?;
            println!("Seed deleted.");
        }
        Command::ChangePin => {
            let old_pin = read_secret(&mut input, "Current PIN")?;
            let new_pin = read_secret(&mut input, "New PIN")?;
            if !vault.change_pin(&old_pin, &new_pin)? {
                bail!(INVALID_PIN_MESSAGE);
            }
            println!("PIN changed.");
        }
        Command::Biometric { action } => match action {
            BiometricAction::Enable => {
                let pin = read_secret(&mut input, "PIN")?;
                // Only escrow a PIN that actually opens the vault
                unlock(&mut vault, &pin)?;
                vault
                    .enable_biometric(&pin)
                    .context("Failed to enable biometric unlock")?;
                println!("Biometric unlock enabled.");
            }
            BiometricAction::Disable => {
                vault
                    .disable_biometric()
                    .context("Failed to disable biometric unlock")?;
                println!("Biometric unlock disabled.");
            }
            BiometricAction::Unlock => {
                let Some(pin) = vault.retrieve_via_biometric()? else {
                    bail!("Biometric unlock unavailable. Use `seedvault load` with your PIN.");
                };
                let seed = unlock(&mut vault, &pin)?;
                println!("{}", seed.as_str());
            }
        },
        Command::ResetAttempts => {
            vault.reset_failed_attempts()?;
            println!("Failed attempts reset.");
        }
    }

    Ok(())
}

fn open_vault(data_dir: &Path, ephemeral: bool) -> Result<VaultManager> {
    let config = load_config(data_dir)
        .with_context(|| format!("Failed to load config from {:?}", data_dir))?;

    if ephemeral {
        info!("Using in-memory store; nothing will be persisted");
        return Ok(VaultManager::new(
            &config,
            MemoryStore::new(),
            MemoryLockoutStore::new(),
        )?);
    }

    let store = keyring_store(&config)?;
    Ok(VaultManager::new(
        &config,
        store,
        JsonFileLockoutStore::in_dir(data_dir),
    )?)
}

#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux"))]
fn keyring_store(config: &VaultConfig) -> Result<seedvault_securestore::KeyringStore> {
    debug!("Using OS keyring service {}", config.keyring_service);
    Ok(seedvault_securestore::KeyringStore::new(
        config.keyring_service.clone(),
    ))
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
fn keyring_store(_config: &VaultConfig) -> Result<MemoryStore> {
    bail!("No OS keyring on this platform; run with --ephemeral")
}

fn unlock(vault: &mut VaultManager, pin: &str) -> Result<Zeroizing<String>> {
    match vault.load_secret(pin)? {
        Some(seed) => Ok(seed),
        None => bail!(INVALID_PIN_MESSAGE),
    }
}

/// Read one line from `input`. The prompt goes to stderr so it never mixes
/// with command output.
fn read_secret(input: &mut impl BufRead, label: &str) -> Result<Zeroizing<String>> {
    eprint!("{}: ", label);
    io::stderr().flush().ok();

    let mut line = Zeroizing::new(String::new());
    let read = input
        .read_line(&mut line)
        .with_context(|| format!("Failed to read {} from stdin", label))?;
    if read == 0 {
        bail!("Missing {} on stdin", label);
    }

    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    if line.is_empty() {
        bail!("{} must not be empty", label);
    }
    Ok(line)
}

/// Text shown for a failed command. Vault errors get their user-facing
/// wording; everything else prints its context chain.
fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<VaultError>() {
        Some(vault_err) => vault_err.user_message(),
        None => format!("{:#}", err),
    }
}
