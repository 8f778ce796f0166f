//! MOLS command-line interface.
//!
//! Design interpolators from TOML configuration files:
//! ```sh
//! mols-cli run job.toml
//! mols-cli validate job.toml
//! mols-cli example > job.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mols-cli")]
#[command(about = "MOLS: mean-square optimal NUFFT interpolator design")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a design from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the design.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Print an example job configuration.
    Example,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("MOLS Interpolator Design");
            println!("========================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_design(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_csv {
                runner::write_csv(&result, &out_dir)?;
            }

            if job.output.save_json {
                runner::write_json(&result, &out_dir.join("design.json"))?;
            }

            println!("Design complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let _job = config::load_config(&config)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Example => {
            print!("{}", config::EXAMPLE_JOB);
            Ok(())
        }
    }
}
