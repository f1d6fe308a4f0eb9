//! Configuration management commands.

use clap::{Args, Subcommand};

use super::{get_config, output_result, print_info, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Configuration is stored in ~/.faceid/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = get_config(cli)?;
                if cfg.path().exists() {
                    print_info(&format!("config: {}", cfg.path().display()));
                } else {
                    print_info(&format!(
                        "config: {} (not found, showing defaults)",
                        cfg.path().display()
                    ));
                }
                output_result(&cfg, cli.json)
            }

            ConfigSubcommand::Init { force } => {
                let cfg = get_config(cli)?;
                if cfg.path().exists() && !force {
                    anyhow::bail!(
                        "{} already exists, use --force to overwrite",
                        cfg.path().display()
                    );
                }
                let fresh = cfg.with_defaults(cli.store.as_deref())?;
                fresh.save()?;
                print_success(&format!("Wrote {}", fresh.path().display()));
                Ok(())
            }
        }
    }
}
