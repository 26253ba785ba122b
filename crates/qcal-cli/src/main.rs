//! qcal Command-Line Interface
//!
//! The main entry point for the qcal CLI tool: initialise a calibration
//! store from a backend, run calibration experiments against it, inspect
//! parameters and their history, and benchmark the calibrated gates.
//!
//! ```text
//! qcal init --backend sim --qubits 5
//! qcal calibrate --experiment rough_amp --qubit 0 --option num_amps=41
//! qcal show --qubit 0 --history amp --schedule x12
//! qcal rb --mode polar --qubit 0
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{calibrate, init, rb, show, version};
use config::CalibrationConfig;

/// qcal - qutrit gate calibration and benchmarking
#[derive(Parser)]
#[command(name = "qcal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Calibration store file (overrides config and QCAL_STORE)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a calibration store from backend defaults
    Init {
        /// Backend to read defaults from
        #[arg(short, long, default_value = "sim")]
        backend: String,

        /// Number of qubits (defaults to the configured simulator)
        #[arg(short, long)]
        qubits: Option<u32>,

        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },

    /// Run a calibration experiment and update the store
    Calibrate {
        /// Experiment name (rough_amp, fine_amp_x12, rough_drag_x12, rough_freq, ...)
        #[arg(short, long)]
        experiment: String,

        /// Physical qubit
        #[arg(short, long, default_value = "0")]
        qubit: u32,

        /// Experiment option as name=value (repeatable)
        #[arg(short, long = "option")]
        options: Vec<String>,

        /// YAML file of experiment options
        #[arg(long)]
        options_file: Option<PathBuf>,

        /// Fit and report without writing the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current parameters or the history of one parameter
    Show {
        /// Only parameters of this qubit (and defaults)
        #[arg(short, long)]
        qubit: Option<u32>,

        /// Parameter name whose history to show
        #[arg(long)]
        history: Option<String>,

        /// Owning schedule of the parameter (x12, sx12)
        #[arg(long)]
        schedule: Option<String>,
    },

    /// Run randomized benchmarking of the 1–2 gates
    Rb {
        /// Sampling mode (standard, polar)
        #[arg(short, long, default_value = "standard")]
        mode: String,

        /// Physical qubit
        #[arg(short, long, default_value = "0")]
        qubit: u32,

        /// Sequence lengths, comma separated
        #[arg(long, value_delimiter = ',')]
        lengths: Option<Vec<u32>>,

        /// Random sequences per length
        #[arg(long)]
        samples: Option<u32>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show version information
    Version,
}

/// Log filter from the -v count, falling back to the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

async fn dispatch(cli: Cli, config: CalibrationConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init {
            backend,
            qubits,
            force,
        } => init::execute(&config, &backend, qubits, &config.store, force),

        Commands::Calibrate {
            experiment,
            qubit,
            options,
            options_file,
            dry_run,
        } => {
            calibrate::execute(
                &config,
                &experiment,
                qubit,
                &options,
                options_file.as_deref(),
                dry_run,
            )
            .await
        }

        Commands::Show {
            qubit,
            history,
            schedule,
        } => show::execute(&config, qubit, history.as_deref(), schedule.as_deref()),

        Commands::Rb {
            mode,
            qubit,
            lengths,
            samples,
            seed,
        } => rb::execute(&config, &mode, qubit, lengths, samples, seed).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = match CalibrationConfig::load(cli.config.as_deref()) {
        Ok(mut config) => {
            if let Some(store) = &cli.store {
                config.store = store.clone();
            }

            // Setup logging
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(log_filter(cli.verbose, &config.log_level)))
                .with_target(false)
                .init();

            dispatch(cli, config).await
        }
        Err(e) => Err(e.into()),
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_calibrate() {
        let cli = Cli::try_parse_from([
            "qcal",
            "calibrate",
            "-e",
            "rough_drag_x12",
            "-q",
            "2",
            "-o",
            "num_betas=31",
            "-o",
            "reps=[1,3]",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Calibrate {
                experiment,
                qubit,
                options,
                dry_run,
                ..
            } => {
                assert_eq!(experiment, "rough_drag_x12");
                assert_eq!(qubit, 2);
                assert_eq!(options, vec!["num_betas=31", "reps=[1,3]"]);
                assert!(dry_run);
            }
            _ => panic!("expected calibrate"),
        }
    }

    #[test]
    fn test_parse_rb_lengths() {
        let cli = Cli::try_parse_from(["qcal", "-vv", "rb", "--mode", "polar", "--lengths", "1,10,50"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Rb { mode, lengths, .. } => {
                assert_eq!(mode, "polar");
                assert_eq!(lengths, Some(vec![1, 10, 50]));
            }
            _ => panic!("expected rb"),
        }
    }

    #[test]
    fn test_global_store_flag() {
        let cli = Cli::try_parse_from(["qcal", "show", "--store", "/tmp/s.json", "-q", "1"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn test_calibrate_requires_experiment() {
        assert!(Cli::try_parse_from(["qcal", "calibrate"]).is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, "error"), "error");
        assert_eq!(log_filter(1, "error"), "info");
        assert_eq!(log_filter(5, "warn"), "trace");
    }
}
