//! assetcrypt - decrypts a keyed asset store into a plaintext mirror.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use assetcrypt::config::loader::validate_config;
use assetcrypt::{load_config, Config, Orchestrator, RunOutcome, FATAL_EXIT_CODE};

#[derive(Parser, Debug)]
#[command(
    name = "assetcrypt",
    version,
    about = "Decrypts a keyed metadata catalog and its encrypted asset tree"
)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct KeyArgs {
    /// Catalog key as hex (0x, spaces and hyphens are ignored)
    #[arg(short, long, value_name = "HEX")]
    key: Option<String>,

    /// Cipher index of the catalog store (1-6)
    #[arg(long, value_name = "ID")]
    cipher: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mirror a full input directory (meta, master/, dat/)
    Mirror {
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Output directory [default: <INPUT_DIR>/decrypted]
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        key: KeyArgs,

        /// Maximum number of decryption workers
        #[arg(short, long, value_name = "NUM")]
        threads: Option<usize>,

        /// Overwrite files that already exist in the output
        #[arg(long)]
        overwrite: bool,

        /// Show input statistics only, without writing anything
        #[arg(long)]
        info: bool,
    },

    /// Decrypt a single catalog database into a plaintext copy
    DecryptDb {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// Decrypt an asset tree using keys from a catalog
    DecryptAssets {
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT_DIR")]
        output: PathBuf,

        /// Metadata catalog holding the file keys
        #[arg(short, long, value_name = "FILE")]
        meta: PathBuf,

        #[command(flatten)]
        key: KeyArgs,

        #[arg(short, long, value_name = "NUM")]
        threads: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    let code = match run(cli) {
        Ok(outcome) => {
            if outcome == RunOutcome::CompletedWithFailures {
                info!("Completed with failures");
            }
            outcome.exit_code()
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            FATAL_EXIT_CODE
        }
    };

    std::process::exit(code);
}

fn run(cli: Cli) -> Result<RunOutcome> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Mirror {
            input,
            output,
            key,
            threads,
            overwrite,
            info,
        } => {
            apply_overrides(&mut config, &key, threads)?;
            let orchestrator = Orchestrator::new(config)?;

            if info {
                let summary = orchestrator.inspect(&input)?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(RunOutcome::Success);
            }

            let report = orchestrator
                .mirror(&input, output.as_deref(), overwrite)
                .context("Mirror failed")?;
            Ok(report.outcome())
        }
        Command::DecryptDb { input, output, key } => {
            apply_overrides(&mut config, &key, None)?;
            let report = Orchestrator::new(config)?
                .decrypt_database(&input, &output)
                .context("Catalog decryption failed")?;
            info!(
                "Catalog written to {} ({} tables, {} rows)",
                output.display(),
                report.rebuild.tables_written,
                report.rebuild.rows_written
            );
            Ok(report.outcome())
        }
        Command::DecryptAssets {
            input,
            output,
            meta,
            key,
            threads,
        } => {
            apply_overrides(&mut config, &key, threads)?;
            let report = Orchestrator::new(config)?
                .decrypt_assets(&input, &output, &meta)
                .context("Asset decryption failed")?;
            Ok(report.outcome())
        }
    }
}

/// Command line values take precedence over the config file.
fn apply_overrides(config: &mut Config, key: &KeyArgs, threads: Option<usize>) -> Result<()> {
    if let Some(ref hex) = key.key {
        config.database_key = Some(hex.clone());
    }
    if let Some(cipher) = key.cipher {
        config.cipher_id = cipher;
    }
    if threads.is_some() {
        config.max_concurrency = threads;
    }
    validate_config(config).context("Invalid configuration")?;
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("assetcrypt=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assetcrypt=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to initialize logging")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mirror() {
        let cli = Cli::parse_from([
            "assetcrypt",
            "mirror",
            "/data",
            "--key",
            "AABB",
            "--cipher",
            "4",
            "-t",
            "8",
            "--overwrite",
        ]);
        match cli.command {
            Command::Mirror {
                input,
                output,
                key,
                threads,
                overwrite,
                info,
            } => {
                assert_eq!(input, PathBuf::from("/data"));
                assert!(output.is_none());
                assert_eq!(key.key.as_deref(), Some("AABB"));
                assert_eq!(key.cipher, Some(4));
                assert_eq!(threads, Some(8));
                assert!(overwrite);
                assert!(!info);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config {
            cipher_id: 1,
            ..Config::default()
        };
        let key = KeyArgs {
            key: Some("0011".to_string()),
            cipher: Some(5),
        };
        apply_overrides(&mut config, &key, Some(2)).unwrap();

        assert_eq!(config.cipher_id, 5);
        assert_eq!(config.database_key.as_deref(), Some("0011"));
        assert_eq!(config.max_concurrency, Some(2));
    }

    #[test]
    fn test_invalid_cipher_override() {
        let mut config = Config::default();
        let key = KeyArgs {
            key: None,
            cipher: Some(0),
        };
        assert!(apply_overrides(&mut config, &key, None).is_err());
    }
}
