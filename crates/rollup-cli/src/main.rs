//! Rollup Verify CLI - command-line front end for batch verification
//!
//! This tool provides commands for:
//! - Verifying a single batch witness
//! - Verifying a chain of batches that must continue from one another
//! - Inspecting the operations and chunks of a batch file
//! - Writing valid sample batches for experimentation
//!
//! Log output goes to stderr and is controlled by `RUST_LOG` (default
//! `info`); `--verbose` raises it to `debug` and enables per-chunk tracing.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rollup_batch::{
    BatchInput, BatchVerificationResult, BatchVerifier, SerializableBatch, VerifierOptions,
};
use rollup_witness::Scenario;

/// Sample batch to generate
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    /// Deposit, partial exit and full exit
    #[value(name = "deposit-exit")]
    DepositExit,
    /// Transfers, transfer to a new account, order fill and noop
    Transfers,
    /// Subaccount creation, close and escalation
    Subaccounts,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::DepositExit => Scenario::DepositExit,
            ScenarioArg::Transfers => Scenario::Transfers,
            ScenarioArg::Subaccounts => Scenario::Subaccounts,
        }
    }
}

/// Rollup Verify - deterministic rollup state-transition verification
#[derive(Parser)]
#[command(name = "rollup-verify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify rollup batch witnesses against their claimed roots", long_about = None)]
struct Cli {
    /// Log at debug level and trace every chunk
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Verifier options shared by the verification commands
#[derive(Args, Debug)]
struct OptionArgs {
    /// TOML file with verifier options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate validators and batches in parallel
    #[arg(long)]
    parallel: bool,

    /// Size of the worker pool used for parallel work
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify one batch
    Verify {
        /// Path to the batch JSON file
        batch: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        /// Print the verification result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify consecutive batches, each continuing from the previous one
    #[command(name = "verify-chain")]
    VerifyChain {
        /// Batch JSON files, in chain order
        #[arg(required = true)]
        batches: Vec<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// List the operations and chunks of a batch
    Inspect {
        /// Path to the batch JSON file
        batch: PathBuf,
    },

    /// Write a valid sample batch
    Demo {
        #[arg(short, long, value_enum, default_value = "deposit-exit")]
        scenario: ScenarioArg,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Verify {
            batch,
            options,
            json,
        } => verify(&batch, &options, cli.verbose, json),
        Commands::VerifyChain { batches, options } => {
            verify_chain(&batches, &options, cli.verbose)
        }
        Commands::Inspect { batch } => inspect(&batch),
        Commands::Demo { scenario, output } => demo(scenario.into(), output),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// File options first, then command-line overrides
fn load_options(args: &OptionArgs, verbose: bool) -> Result<VerifierOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            VerifierOptions::from_toml_str(&contents)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => VerifierOptions::default(),
    };

    if args.parallel {
        options.parallel_validators = true;
        options.parallel_batches = true;
    }
    if args.threads.is_some() {
        options.worker_threads = args.threads;
    }
    if verbose {
        options.trace_chunks = true;
    }
    options.validate()?;
    debug!(?options, "verifier options");
    Ok(options)
}

fn read_batch(path: &Path) -> Result<BatchInput> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
    let batch = SerializableBatch::from_json(&contents)
        .with_context(|| format!("Failed to parse batch file: {}", path.display()))?;
    Ok(batch.into_batch())
}

fn verify(path: &Path, args: &OptionArgs, verbose: bool, json: bool) -> Result<()> {
    let verifier = BatchVerifier::with_options(load_options(args, verbose)?)?;
    let batch = read_batch(path)?;

    eprintln!("Verifying batch...");
    eprintln!("  File: {}", path.display());
    eprintln!("  Chunks: {}", batch.operations.len());
    eprintln!("  Prior root: {}", batch.prior_root);

    let result = verifier.verify(&batch);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn print_result(result: &BatchVerificationResult) {
    if result.valid {
        eprintln!(
            "Batch VALID (verified in {} ms)",
            result.verification_time_ms
        );
        eprintln!("  Operations: {}", result.num_operations);
        eprintln!("  Final root: {}", result.final_root);
        eprintln!("  Pubdata commitment: {}", result.pubdata_commitment);
        println!("VALID");
    } else {
        let category = result
            .category
            .map_or_else(|| "unknown".to_string(), |c| c.to_string());
        let error = result.error.as_deref().unwrap_or("unknown error");
        eprintln!("Batch INVALID: {}", error);
        if let Some(index) = result.failed_operation {
            eprintln!("  Failed record: {}", index);
        }
        println!("INVALID: {}", category);
    }
}

fn verify_chain(paths: &[PathBuf], args: &OptionArgs, verbose: bool) -> Result<()> {
    let verifier = BatchVerifier::with_options(load_options(args, verbose)?)?;
    let batches = paths
        .iter()
        .map(|path| read_batch(path))
        .collect::<Result<Vec<_>>>()?;

    eprintln!("Verifying chain of {} batches...", batches.len());
    let start = Instant::now();

    match verifier.verify_chain(&batches) {
        Ok(summaries) => {
            eprintln!("Chain VALID (verified in {:?})", start.elapsed());
            for (path, summary) in paths.iter().zip(&summaries) {
                eprintln!(
                    "  {}: {} operations, root {}",
                    path.display(),
                    summary.num_operations,
                    summary.final_root
                );
            }
            println!("VALID");
            Ok(())
        }
        Err(err) => {
            eprintln!("Chain INVALID: {}", err);
            println!("INVALID: {}", err);
            std::process::exit(1);
        }
    }
}

fn inspect(path: &Path) -> Result<()> {
    let batch = read_batch(path)?;

    println!("Batch Inspection:");
    println!("  Prior root: {}", batch.prior_root);
    println!("  Final root: {}", batch.final_root);
    println!("  Pubdata commitment: {}", batch.pubdata_commitment);
    println!("  Chunks: {}", batch.operations.len());
    println!();
    println!("  {:>5}  {:<18} {:>5}  {:<4} {:>8}  pubdata", "rec", "type", "chunk", "side", "account");

    for (index, op) in batch.operations.iter().enumerate() {
        let side = op.tx_type.side_for_chunk(op.chunk);
        println!(
            "  {:>5}  {:<18} {:>5}  {:<4} {:>8}  {}",
            index,
            op.tx_type.name(),
            op.chunk,
            side,
            op.branch(side).account,
            op.pubdata_chunk.to_hex()
        );
    }
    Ok(())
}

fn demo(scenario: Scenario, output: Option<PathBuf>) -> Result<()> {
    let batch = scenario
        .build()
        .with_context(|| format!("Failed to build {} scenario", scenario.name()))?;
    info!(
        scenario = scenario.name(),
        chunks = batch.operations.len(),
        final_root = %batch.final_root,
        "sample batch built"
    );

    let json = SerializableBatch::new(batch).to_json()?;
    if let Some(path) = output {
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        eprintln!("Batch written to: {}", path.display());
    } else {
        println!("{}", json);
    }
    Ok(())
}
