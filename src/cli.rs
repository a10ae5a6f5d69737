//! Command-line interface definitions and dispatch.
//!
//! # Example
//!
//! ```bash
//! # List every account in the configured keystore
//! keydex list
//!
//! # Look up one account by address, disambiguating by file name
//! keydex find --address 0x48b6...7a0e --path UTC--2019-07-04T12-36-09.633463400Z--48b6...
//!
//! # Keep printing the account list as the directory changes
//! keydex -v watch --keystore ~/.keydex/keystore
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::account::{Account, AccountQuery, Address};
use crate::cache::AccountCache;
use crate::config::Config;
use crate::watcher::NullWatcher;

/// Live index of encrypted account key files.
#[derive(Debug, Parser)]
#[command(name = "keydex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Keystore directory (defaults to the configured or platform data dir)
    #[arg(short, long, value_name = "DIR", global = true, env = "KEYDEX_KEYSTORE")]
    pub keystore: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all accounts in the keystore
    List,
    /// Look up a single account by address and/or key file path
    Find(FindArgs),
    /// Watch the keystore and print the account list on every change
    Watch,
}

/// Arguments for the find subcommand.
#[derive(Debug, Args)]
pub struct FindArgs {
    /// Hex-encoded account address (with or without 0x prefix)
    #[arg(short, long, value_name = "HEX")]
    pub address: Option<String>,

    /// Key file path; relative paths resolve against the keystore directory
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,
}

/// Run the selected subcommand to completion.
pub fn run_app(cli: Cli) -> Result<()> {
    let keydir = resolve_keydir(&cli)?;
    log::debug!("using keystore directory {}", keydir.display());
    match cli.command {
        Commands::List => cmd_list(keydir),
        Commands::Find(args) => cmd_find(keydir, &args),
        Commands::Watch => cmd_watch(keydir),
    }
}

fn resolve_keydir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.keystore {
        return Ok(dir.clone());
    }
    Config::load().keystore_dir()
}

fn cmd_list(keydir: PathBuf) -> Result<()> {
    let (cache, _notifications) = AccountCache::with_watcher(keydir, Box::new(NullWatcher));
    cache
        .reload()
        .context("could not read the keystore directory")?;
    print_accounts(&cache.accounts());
    Ok(())
}

fn cmd_find(keydir: PathBuf, args: &FindArgs) -> Result<()> {
    let mut query = AccountQuery::default();
    if let Some(hex) = &args.address {
        let address: Address = hex
            .parse()
            .with_context(|| format!("invalid address {hex:?}"))?;
        query.address = Some(address);
    }
    query.path = args.path.clone();
    if query.address.is_none() && query.path.is_none() {
        bail!("specify --address and/or --path");
    }

    let (cache, _notifications) = AccountCache::with_watcher(keydir, Box::new(NullWatcher));
    cache
        .reload()
        .context("could not read the keystore directory")?;
    let account = cache.find(&query)?;
    println!("{}\t{}", account.address, account.url.path.display());
    Ok(())
}

fn cmd_watch(keydir: PathBuf) -> Result<()> {
    let (cache, notifications) = AccountCache::new(keydir);
    cache
        .reload()
        .context("could not read the keystore directory")?;
    print_accounts(&cache.accounts());

    let (stop_sender, stop) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = stop_sender.try_send(());
    })
    .context("failed to install the interrupt handler")?;

    loop {
        crossbeam_channel::select! {
            recv(notifications) -> message => {
                if message.is_err() {
                    break;
                }
                println!("keystore changed");
                print_accounts(&cache.accounts());
            }
            recv(stop) -> _ => break,
        }
    }
    cache.close();
    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    if accounts.is_empty() {
        println!("no accounts");
        return;
    }
    for account in accounts {
        println!("{}\t{}", account.address, account.url.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["keydex", "list"]);
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::parse_from(["keydex", "-vv", "find", "--address", "0xab"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Find(args) => assert_eq!(args.address.as_deref(), Some("0xab")),
            other => panic!("expected find, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_keystore_flag_is_global() {
        let cli = Cli::parse_from(["keydex", "watch", "--keystore", "/keys"]);
        assert_eq!(cli.keystore, Some(PathBuf::from("/keys")));
    }

    #[test]
    fn test_find_requires_some_criterion() {
        let args = FindArgs {
            address: None,
            path: None,
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_find(dir.path().to_path_buf(), &args).is_err());
    }
}
