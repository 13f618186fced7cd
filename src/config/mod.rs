pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "cohort-cea")]
#[command(about = "Cohort Markov model cost-effectiveness analysis")]
pub struct CliConfig {
    /// Path to the model TOML file
    #[arg(short, long, default_value = "model.toml")]
    pub config: String,

    /// Override the number of simulated cycles
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Validate the model and print a summary without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Emit JSON logs instead of the compact format
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("--config", &self.config)?;
        if let Some(output) = &self.output {
            validation::validate_path("--output", output)?;
        }
        if let Some(cycles) = self.cycles {
            validation::validate_positive_number("--cycles", cycles, 1)?;
        }
        Ok(())
    }
}
